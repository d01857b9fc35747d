use super::*;

#[test]
fn filled_buffer_repeats_pixel() {
    let px = PixelBuffer::filled(3, 2, 4, &[1, 2, 3, 4]).unwrap();
    assert_eq!(px.as_bytes().len(), 24);
    assert_eq!(px.pixel(2, 1), Some(&[1u8, 2, 3, 4][..]));
    assert_eq!(px.pixel(3, 0), None);
    assert_eq!(px.stride(), 12);
}

#[test]
fn buffer_rejects_bad_shapes() {
    assert!(PixelBuffer::new(0, 4, 4).is_err());
    assert!(PixelBuffer::new(4, 4, 5).is_err());
    assert!(PixelBuffer::from_raw(2, 2, 1, vec![0; 3]).is_err());
    assert!(PixelBuffer::filled(2, 2, 3, &[0, 0]).is_err());
}

#[test]
fn bytes_mut_detaches_shared_storage() {
    let a = PixelBuffer::filled(2, 2, 1, &[7]).unwrap();
    let mut b = a.clone();
    assert!(a.shares_storage_with(&b));
    b.bytes_mut()[0] = 9;
    assert!(!a.shares_storage_with(&b));
    assert_eq!(a.as_bytes()[0], 7);
    assert_eq!(b.as_bytes()[0], 9);
}

#[test]
fn tags_round_trip() {
    for k in [
        LayerKind::Raster,
        LayerKind::VectorPath,
        LayerKind::Text,
        LayerKind::Adjustment,
        LayerKind::Group,
    ] {
        assert_eq!(LayerKind::from_u8(k.to_u8()), Some(k));
    }
    assert_eq!(BlendMode::from_u8(BlendMode::Luminosity.to_u8()), Some(BlendMode::Luminosity));
    assert_eq!(BlendMode::from_u8(17), None);
    assert_eq!(PathShape::from_u8(3), None);
    assert_eq!(BalloonShape::from_u8(3), Some(BalloonShape::Cloud));
}

#[test]
fn raster_layer_takes_size_from_pixels() {
    let px = PixelBuffer::new(8, 6, 4).unwrap();
    let spec = NewLayer::raster("a", px, 3, -2);
    let layer = Layer::from_new(LayerId(0), spec).unwrap();
    assert_eq!(layer.bounds(), PixelRect::new(3, -2, 8, 6));
    assert_eq!(layer.kind(), LayerKind::Raster);
    assert_eq!(layer.channels(), 4);
}

#[test]
fn from_new_validates() {
    let g = NewLayer::group("", PixelRect::from_size(4, 4));
    assert!(Layer::from_new(LayerId(0), g).is_err());
    let g = NewLayer::group("g", PixelRect::from_size(4, 4)).opacity(101);
    assert!(Layer::from_new(LayerId(0), g).is_err());
}

#[test]
fn extras_are_bounded_and_replaced_by_name() {
    let mut layer = Layer::from_new(LayerId(0), NewLayer::group("g", PixelRect::default())).unwrap();
    layer.set_extra("k", vec![1]).unwrap();
    layer.set_extra("k", vec![2]).unwrap();
    assert_eq!(layer.extra("k"), Some(&[2u8][..]));
    for i in 1..MAX_EXTRA_BLOBS {
        layer.set_extra(format!("k{i}"), vec![]).unwrap();
    }
    assert!(layer.set_extra("overflow", vec![]).is_err());
    assert!(layer.set_extra("k", vec![0; MAX_EXTRA_BYTES + 1]).is_err());
    assert_eq!(layer.extra("k"), Some(&[2u8][..]));
}

#[test]
fn raster_side_is_bounded() {
    let wide = PixelBuffer::new(MAX_LAYER_SIDE + 1, 1, 1).unwrap();
    let err = Layer::from_new(LayerId(0), NewLayer::raster("wide", wide, 0, 0)).unwrap_err();
    assert!(matches!(err, LayerdocError::Validation(_)));

    let edge = PixelBuffer::new(MAX_LAYER_SIDE, 1, 1).unwrap();
    assert!(Layer::from_new(LayerId(0), NewLayer::raster("edge", edge, 0, 0)).is_ok());
}

#[test]
fn params_round_trip() {
    let mut layer = Layer::from_new(LayerId(0), NewLayer::group("g", PixelRect::default())).unwrap();
    let mut p = layer.params();
    p.name = "renamed".into();
    p.opacity = 40;
    p.flags = LayerFlags::HIDDEN;
    p.x = 9;
    layer.apply_params(p.clone());
    assert_eq!(layer.params(), p);
    assert!(!layer.is_visible());
}
