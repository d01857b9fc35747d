use super::*;

fn gradient() -> PixelBuffer {
    let data = (0..8u8 * 6).flat_map(|i| [i, i, i]).collect();
    PixelBuffer::from_raw(8, 6, 3, data).unwrap()
}

#[test]
fn swap_twice_restores_both_states() {
    let mut px = gradient();
    let before = px.clone();
    let mut patch = RegionPatch::capture(LayerId(0), &px, PixelRect::new(2, 1, 3, 4)).unwrap();
    assert_eq!(patch.byte_len(), 3 * 4 * 3);

    RegionMut::new(&mut px, patch.rect()).fill(&[7, 7, 7]).unwrap();
    let after = px.clone();
    assert_ne!(before, after);

    patch.swap(&mut px).unwrap();
    assert_eq!(px, before);
    patch.swap(&mut px).unwrap();
    assert_eq!(px, after);
}

#[test]
fn capture_clamps_to_the_layer() {
    let px = gradient();
    let patch = RegionPatch::capture(LayerId(1), &px, PixelRect::new(-3, 4, 5, 10)).unwrap();
    assert_eq!(patch.rect(), PixelRect::new(0, 4, 2, 2));
    assert!(RegionPatch::capture(LayerId(1), &px, PixelRect::new(8, 0, 4, 4)).is_none());
    assert!(RegionPatch::capture(LayerId(1), &px, PixelRect::new(0, 0, 0, 4)).is_none());
}

#[test]
fn swap_detaches_shared_storage() {
    let mut px = gradient();
    let snapshot = px.clone();
    let mut patch = RegionPatch::capture(LayerId(0), &px, PixelRect::new(0, 0, 1, 1)).unwrap();
    RegionMut::new(&mut px, patch.rect()).fill(&[200, 0, 0]).unwrap();
    patch.swap(&mut px).unwrap();
    assert!(!px.shares_storage_with(&snapshot));
    assert_eq!(snapshot, gradient());
}

#[test]
fn region_view_is_relative_and_bounded() {
    let mut px = gradient();
    let mut region = RegionMut::new(&mut px, PixelRect::new(4, 2, 2, 2));
    region.pixel_mut(1, 1).unwrap().copy_from_slice(&[1, 2, 3]);
    assert!(region.pixel_mut(2, 0).is_none());
    assert!(region.row_mut(2).is_none());
    assert!(region.fill(&[1]).is_err());
    assert_eq!(px.pixel(5, 3), Some(&[1u8, 2, 3][..]));
}

#[test]
fn swap_rejects_mismatched_buffers() {
    let px = gradient();
    let mut patch = RegionPatch::capture(LayerId(0), &px, PixelRect::new(4, 4, 4, 2)).unwrap();
    let mut small = PixelBuffer::new(4, 4, 3).unwrap();
    assert!(patch.swap(&mut small).is_err());
    let mut rgba = PixelBuffer::new(8, 6, 4).unwrap();
    assert!(patch.swap(&mut rgba).is_err());
}
