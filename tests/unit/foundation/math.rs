use super::*;

#[test]
fn fnv_is_streaming_and_matches_reference() {
    let mut a = Fnv1a64::new_default();
    a.write_bytes(b"timberlens");
    let mut b = Fnv1a64::new_default();
    b.write_bytes(b"timber");
    b.write_bytes(b"lens");
    assert_eq!(a.finish(), b.finish());

    let mut c = Fnv1a64::new_default();
    c.write_bytes(b"a");
    assert_eq!(c.finish(), 0xaf63_dc4c_8601_ec8c);
}

#[test]
fn mul_div255_variants_align() {
    for x in [0u16, 1, 127, 255] {
        for y in [0u16, 1, 127, 255] {
            assert_eq!(u16::from(mul_div255_u8(x, y)), mul_div255_u16(x, y));
        }
    }
}

#[test]
fn premultiply_scales_color_by_alpha() {
    let mut px = [100u8, 50, 200, 128, 10, 20, 30, 255, 90, 90, 90, 0];
    premultiply_rgba8_in_place(&mut px);
    assert_eq!(
        &px[..4],
        &[
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128
        ]
    );
    assert_eq!(&px[4..8], &[10, 20, 30, 255]);
    assert_eq!(&px[8..], &[0, 0, 0, 0]);
}

#[test]
fn unpremultiply_restores_opaque_and_clears_transparent() {
    let mut px = [10u8, 20, 30, 255, 7, 7, 7, 0];
    unpremultiply_rgba8_in_place(&mut px);
    assert_eq!(px, [10, 20, 30, 255, 0, 0, 0, 0]);

    let mut half = [64u8, 0, 128, 128];
    unpremultiply_rgba8_in_place(&mut half);
    assert_eq!(half, [128, 0, 255, 128]);
}
