use super::*;
use crate::foundation::core::PixelRect;

fn source() -> (LayerStore, [LayerId; 4]) {
    let mut s = LayerStore::new();
    let a = s
        .create_layer(NewLayer::empty_raster("a", PixelRect::from_size(4, 4), 4).unwrap(), None)
        .unwrap();
    let b = s
        .create_layer(NewLayer::empty_raster("b", PixelRect::from_size(4, 4), 4).unwrap(), Some(a))
        .unwrap();
    let c = s
        .create_layer(NewLayer::empty_raster("c", PixelRect::from_size(4, 4), 4).unwrap(), Some(b))
        .unwrap();
    let g = s
        .create_layer(NewLayer::group("g", PixelRect::from_size(4, 4)), Some(c))
        .unwrap();
    (s, [a, b, c, g])
}

fn names(s: &LayerStore) -> Vec<String> {
    s.iter().map(|l| l.name().to_string()).collect()
}

#[test]
fn open_mirrors_in_source_order() {
    let (s, [a, _b, c, _g]) = source();
    let m = FocalMirror::open(&s, &[c, a]).unwrap();
    assert_eq!(names(m.local()), ["a", "c"]);
    let la = m.local_of(a).unwrap();
    assert_eq!(m.source_of(la), Some(a));
}

#[test]
fn groups_cannot_be_mirrored() {
    let (s, [_a, _b, _c, g]) = source();
    assert!(FocalMirror::open(&s, &[g]).is_err());
    assert!(FocalMirror::open(&s, &[]).is_err());
}

#[test]
fn visibility_propagates_by_handle_after_rename() {
    let (mut s, [a, b, _c, _g]) = source();
    let mut m = FocalMirror::open(&s, &[a, b]).unwrap();
    s.rename(a, "renamed").unwrap();
    let la = m.local_of(a).unwrap();
    m.set_hidden(&mut s, la, true).unwrap();
    assert!(!s.layer(a).unwrap().is_visible());
    assert!(!m.local().layer(la).unwrap().is_visible());
}

#[test]
fn local_reorder_propagates_to_source() {
    let (mut s, [a, _b, c, _g]) = source();
    let mut m = FocalMirror::open(&s, &[a, c]).unwrap();
    let la = m.local_of(a).unwrap();
    let lc = m.local_of(c).unwrap();
    m.move_local(&mut s, la, Some(lc)).unwrap();
    assert_eq!(names(m.local()), ["c", "a"]);
    assert_eq!(names(&s), ["c", "a", "b", "g"]);
    s.validate().unwrap();
}

#[test]
fn pull_follows_source_order_and_pixels() {
    let (mut s, [a, b, _c, _g]) = source();
    let mut m = FocalMirror::open(&s, &[a, b]).unwrap();
    s.change_order(a, Some(b)).unwrap();
    s.get_mut(b).unwrap().pixels_mut().unwrap().bytes_mut()[0] = 200;
    m.pull_from_source(&s).unwrap();
    assert_eq!(names(m.local()), ["b", "a"]);
    let lb = m.local_of(b).unwrap();
    assert_eq!(m.local().layer(lb).unwrap().pixels().unwrap().as_bytes()[0], 200);
    m.local().validate().unwrap();
}

#[test]
fn push_copies_edited_pixels() {
    let (mut s, [a, _b, _c, _g]) = source();
    let mut m = FocalMirror::open(&s, &[a]).unwrap();
    let la = m.local_of(a).unwrap();
    m.local_pixels_mut(la).unwrap().bytes_mut()[3] = 255;
    // Source is untouched until pushed.
    assert_eq!(s.layer(a).unwrap().pixels().unwrap().as_bytes()[3], 0);
    m.push_to_source(&mut s).unwrap();
    let layer = s.layer(a).unwrap();
    assert_eq!(layer.pixels().unwrap().as_bytes()[3], 255);
    assert!(layer.flags().contains(LayerFlags::MODIFIED));
}
