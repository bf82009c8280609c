use super::*;
use crate::foundation::core::BoundingBox;

const GREEN: [u8; 4] = [40, 90, 40, 255];

fn solid(w: u32, h: u32, px: [u8; 4]) -> DecodedImage {
    let data: Vec<u8> = std::iter::repeat_n(px, (w * h) as usize).flatten().collect();
    DecodedImage::from_premul_rgba8(w, h, &data).unwrap()
}

fn painted(outcome: RenderOutcome) -> RenderedFrame {
    outcome.into_frame().expect("expected a painted frame")
}

fn assert_close(actual: [u8; 4], expected: [u8; 4], tol: u8) {
    for (a, e) in actual.iter().zip(expected.iter()) {
        assert!(
            a.abs_diff(*e) <= tol,
            "pixel {actual:?} not within {tol} of {expected:?}"
        );
    }
}

#[test]
fn absent_image_is_a_no_op() {
    let mut r = OverlayRenderer::default();
    let boxes = DetectionSet::from(vec![BoundingBox::new(0.0, 0.0, 10.0, 10.0)]);
    assert!(matches!(
        r.render(None, &boxes, 600).unwrap(),
        RenderOutcome::Skipped
    ));
    assert!(r.surface.is_none());
}

#[test]
fn concrete_scenario_geometry() {
    let img = solid(1200, 800, GREEN);
    let boxes = DetectionSet::from(vec![
        BoundingBox::new(100.0, 100.0, 300.0, 300.0),
        BoundingBox::new(0.0, 0.0, 1200.0, 800.0),
    ]);
    let out = painted(
        OverlayRenderer::default()
            .render(Some(&img), &boxes, 600)
            .unwrap(),
    );
    assert_eq!(out.layout.scale, 0.5);
    assert_eq!((out.frame.width, out.frame.height), (600, 400));
    assert_eq!(out.frame.data.len(), 600 * 400 * 4);
    assert!(out.frame.premultiplied);
    assert_eq!(
        out.rects,
        vec![
            Rect::new(50.0, 50.0, 150.0, 150.0),
            Rect::new(0.0, 0.0, 600.0, 400.0)
        ]
    );
}

#[test]
fn two_pass_stroke_and_fill_land_on_expected_pixels() {
    let img = solid(1200, 800, GREEN);
    let boxes = DetectionSet::from(vec![BoundingBox::new(100.0, 100.0, 300.0, 300.0)]);
    let f = painted(
        OverlayRenderer::default()
            .render(Some(&img), &boxes, 600)
            .unwrap(),
    )
    .frame;

    // Outside every stroke: untouched base image.
    assert_close(f.pixel(10, 10).unwrap(), GREEN, 2);
    assert_close(f.pixel(46, 100).unwrap(), GREEN, 2);
    // Shadow only (x in [47.5, 52.5], highlight starts at 49).
    assert_close(f.pixel(48, 100).unwrap(), [20, 45, 20, 255], 3);
    // Highlight on top of the shadow, outside the fill.
    assert_close(f.pixel(49, 100).unwrap(), [255, 193, 7, 255], 3);
    // Interior: 15% accent over the base.
    assert_close(f.pixel(100, 100).unwrap(), [72, 105, 35, 255], 3);
}

#[test]
fn render_is_idempotent() {
    let img = solid(300, 200, GREEN);
    let boxes = DetectionSet::from(vec![
        BoundingBox::new(10.0, 20.0, 110.0, 90.0),
        BoundingBox::new(50.0, 50.0, 250.0, 180.0),
    ]);
    let mut r = OverlayRenderer::default();
    let a = painted(r.render(Some(&img), &boxes, 450).unwrap());
    let b = painted(r.render(Some(&img), &boxes, 450).unwrap());
    assert_eq!(a.frame, b.frame);
    assert_eq!(a.frame.digest(), b.frame.digest());
}

#[test]
fn empty_detection_set_paints_base_only() {
    let img = solid(120, 80, GREEN);
    let out = painted(
        OverlayRenderer::default()
            .render(Some(&img), &DetectionSet::empty(), 60)
            .unwrap(),
    );
    assert!(out.rects.is_empty());
    assert_eq!((out.frame.width, out.frame.height), (60, 40));
    for px in out.frame.data.chunks_exact(4) {
        assert_close([px[0], px[1], px[2], px[3]], GREEN, 2);
    }
}

#[test]
fn box_order_does_not_change_geometry() {
    let img = solid(1200, 800, GREEN);
    let a = BoundingBox::new(100.0, 100.0, 300.0, 300.0);
    let b = BoundingBox::new(600.0, 200.0, 900.0, 700.0);
    let mut r = OverlayRenderer::default();
    let fwd = painted(r.render(Some(&img), &DetectionSet::from(vec![a, b]), 600).unwrap());
    let rev = painted(r.render(Some(&img), &DetectionSet::from(vec![b, a]), 600).unwrap());
    assert_eq!(fwd.rects[0], rev.rects[1]);
    assert_eq!(fwd.rects[1], rev.rects[0]);
}

#[test]
fn resize_repaints_from_scratch() {
    let img = solid(1200, 800, GREEN);
    let boxes = DetectionSet::from(vec![BoundingBox::new(100.0, 100.0, 300.0, 300.0)]);
    let mut r = OverlayRenderer::default();
    let wide = painted(r.render(Some(&img), &boxes, 600).unwrap());
    let narrow = painted(r.render(Some(&img), &boxes, 300).unwrap());
    assert_eq!((narrow.frame.width, narrow.frame.height), (300, 200));
    assert_eq!(narrow.rects[0], Rect::new(25.0, 25.0, 75.0, 75.0));

    let again = painted(r.render(Some(&img), &boxes, 600).unwrap());
    assert_eq!(wide.frame, again.frame);
}

#[test]
fn zero_container_width_yields_empty_paint() {
    let img = solid(1200, 800, GREEN);
    let boxes = DetectionSet::from(vec![BoundingBox::new(100.0, 100.0, 300.0, 300.0)]);
    let out = painted(
        OverlayRenderer::default()
            .render(Some(&img), &boxes, 0)
            .unwrap(),
    );
    assert!(out.frame.is_empty());
    assert!(out.rects.is_empty());
    assert_eq!((out.frame.width, out.frame.height), (0, 0));
}

#[test]
fn oversized_surface_is_a_render_error() {
    let img = solid(1, 2, GREEN);
    let err = OverlayRenderer::default()
        .render(Some(&img), &DetectionSet::empty(), 40_000)
        .unwrap_err();
    assert!(matches!(err, TimberlensError::Render(_)));
}

#[test]
fn non_finite_boxes_are_skipped() {
    let img = solid(100, 100, GREEN);
    let boxes = DetectionSet::from(vec![
        BoundingBox::new(f64::NAN, 0.0, 10.0, 10.0),
        BoundingBox::new(10.0, 10.0, 20.0, 20.0),
    ]);
    let out = painted(
        OverlayRenderer::default()
            .render(Some(&img), &boxes, 100)
            .unwrap(),
    );
    assert_eq!(out.rects, vec![Rect::new(10.0, 10.0, 20.0, 20.0)]);
}

#[test]
fn style_json_overrides_and_validates() {
    let style = OverlayStyle::from_json_str(r##"{"accent":"#00FF00","highlight_width":3}"##).unwrap();
    assert_eq!(style.accent, Rgba8::new(0, 255, 0, 255));
    assert_eq!(style.highlight_width, 3.0);
    assert_eq!(style.shadow_width, 5.0);
    assert_eq!(style.shadow, Rgba8::new(0, 0, 0, 128));

    assert!(OverlayStyle::from_json_str(r#"{"fill_opacity":2.0}"#).is_err());
    assert!(OverlayStyle::from_json_str(r#"{"shadow_width":-1}"#).is_err());
    assert!(matches!(
        OverlayStyle::from_json_str("{not json"),
        Err(TimberlensError::Serde(_))
    ));
}
