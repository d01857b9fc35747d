use super::*;

#[test]
fn clamp_keeps_inside_part() {
    let r = PixelRect::new(-5, 90, 20, 20).clamp_to(100, 100).unwrap();
    assert_eq!(r, PixelRect::new(0, 90, 15, 10));
}

#[test]
fn clamp_outside_is_none() {
    assert!(PixelRect::new(100, 0, 5, 5).clamp_to(100, 100).is_none());
    assert!(PixelRect::new(0, 0, 0, 5).clamp_to(100, 100).is_none());
}

#[test]
fn union_ignores_empty() {
    let a = PixelRect::new(1, 1, 2, 2);
    assert_eq!(a.union(PixelRect::default()), a);
    assert_eq!(
        a.union(PixelRect::new(4, 0, 1, 1)),
        PixelRect::new(1, 0, 4, 3)
    );
}

#[test]
fn align4_rounds_up() {
    assert_eq!(align4(0), 0);
    assert_eq!(align4(1), 4);
    assert_eq!(align4(100), 100);
    assert_eq!(align4(101), 104);
}

#[test]
fn color_mode_tags_round_trip() {
    for m in [ColorMode::Rgb, ColorMode::Grayscale, ColorMode::Cmyk] {
        assert_eq!(ColorMode::from_u8(m.to_u8()), Some(m));
    }
    assert_eq!(ColorMode::from_u8(9), None);
}

#[test]
fn channels_bounds() {
    assert!(check_channels(0).is_err());
    assert!(check_channels(4).is_ok());
    assert!(check_channels(5).is_err());
}
