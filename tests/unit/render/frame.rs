use super::*;

fn frame_2x1() -> FrameRGBA {
    FrameRGBA {
        width: 2,
        height: 1,
        data: vec![10, 20, 30, 255, 64, 0, 0, 128],
        premultiplied: true,
    }
}

#[test]
fn pixel_reads_row_major_and_bounds_checks() {
    let f = frame_2x1();
    assert_eq!(f.pixel(0, 0), Some([10, 20, 30, 255]));
    assert_eq!(f.pixel(1, 0), Some([64, 0, 0, 128]));
    assert_eq!(f.pixel(2, 0), None);
    assert_eq!(f.pixel(0, 1), None);
    assert_eq!(FrameRGBA::empty(0, 0).pixel(0, 0), None);
}

#[test]
fn digest_tracks_pixels_and_dimensions() {
    let a = frame_2x1();
    let mut b = frame_2x1();
    assert_eq!(a.digest(), b.digest());
    b.data[0] = 11;
    assert_ne!(a.digest(), b.digest());

    let mut c = frame_2x1();
    c.width = 1;
    c.height = 2;
    assert_ne!(a.digest(), c.digest());
}

#[test]
fn straight_conversion_unpremultiplies() {
    let f = frame_2x1();
    assert_eq!(f.to_straight_rgba8(), vec![10, 20, 30, 255, 128, 0, 0, 128]);

    let straight = FrameRGBA {
        premultiplied: false,
        ..frame_2x1()
    };
    assert_eq!(straight.to_straight_rgba8(), straight.data);
}
