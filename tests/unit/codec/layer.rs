use super::*;
use crate::layers::layer::{LayerId, PixelBuffer};

fn opts() -> EncodeOpts {
    EncodeOpts {
        png: PngCompression::Fast,
        vector_level: 6,
    }
}

fn layer(spec: NewLayer) -> Layer {
    Layer::from_new(LayerId(3), spec).unwrap()
}

fn round_trip(l: &Layer, depth: u16) -> DecodedLayer {
    let bytes = encode_record(l, depth, opts()).unwrap();
    decode_record(&bytes, RecordLimits::checked()).unwrap()
}

fn vector() -> VectorLayer {
    let point = |x, y| VectorPoint {
        pos: Point::new(x, y),
        pressure: 0.5,
        size: 3.0,
        color: [10, 20, 30, 255],
    };
    VectorLayer {
        paths: vec![
            VectorPath {
                shape: PathShape::Bezier,
                flags: 1,
                line_width: 2.5,
                blur: 0.0,
                hardness: 1.0,
                points: vec![point(0.0, 0.0), point(10.5, 3.25), point(20.0, 8.0)],
            },
            VectorPath::default(),
        ],
    }
}

#[test]
fn raster_record_keeps_pixels_and_base() {
    let px = PixelBuffer::filled(6, 5, 4, &[1, 2, 3, 4]).unwrap();
    let mut l = layer(
        NewLayer::raster("paint", px.clone(), -2, 7)
            .blend(BlendMode::Multiply)
            .opacity(55)
            .flags(LayerFlags::LOCK_OPACITY | LayerFlags::HIDDEN),
    );
    l.set_extra("note", b"hello".to_vec()).unwrap();

    let d = round_trip(&l, 2);
    assert_eq!(d.name, "paint");
    assert_eq!(d.base.kind, LayerKind::Raster);
    assert_eq!(d.base.blend, BlendMode::Multiply);
    assert_eq!(d.base.bounds, PixelRect::new(-2, 7, 6, 5));
    assert_eq!(d.base.flags, LayerFlags::LOCK_OPACITY | LayerFlags::HIDDEN);
    assert_eq!(d.base.opacity, 55);
    assert_eq!(d.base.depth, 2);
    assert_eq!(d.content, LayerContent::Raster(px));
    assert_eq!(d.extras, vec![ExtraBlob { name: "note".into(), data: b"hello".to_vec() }]);
}

#[test]
fn vector_record_is_one_compressed_block() {
    let l = layer(NewLayer::with_content(
        "strokes",
        LayerContent::Vector(vector()),
        PixelRect::from_size(64, 64),
    ));
    let payload = encode_payload(l.content(), opts()).unwrap();
    let mut r = ByteReader::new(&payload);
    let packed = r.u32().unwrap() as usize;
    let _raw = r.u32().unwrap();
    assert_eq!(r.remaining(), packed);

    assert_eq!(round_trip(&l, 0).content, LayerContent::Vector(vector()));
}

#[test]
fn text_record_round_trips_including_empty_text() {
    let text = TextLayer {
        origin: Point::new(4.0, 5.0),
        box_width: 30.0,
        box_height: 12.0,
        font_size: 11.5,
        color: [0, 0, 0, 255],
        style: 0b101,
        balloon: Balloon {
            shape: BalloonShape::Ellipse,
            line_width: 1.5,
            line_color: [1, 1, 1, 255],
            fill_color: [255, 255, 255, 255],
            tail: Point::new(2.0, 40.0),
        },
        font_name: "Sans".into(),
        text: "こんにちは".into(),
    };
    let l = layer(NewLayer::with_content(
        "caption",
        LayerContent::Text(text.clone()),
        PixelRect::from_size(64, 64),
    ));
    assert_eq!(round_trip(&l, 1).content, LayerContent::Text(text));

    let empty = TextLayer::default();
    let l = layer(NewLayer::with_content(
        "blank",
        LayerContent::Text(empty.clone()),
        PixelRect::from_size(64, 64),
    ));
    assert_eq!(round_trip(&l, 0).content, LayerContent::Text(empty));
}

#[test]
fn adjustment_and_group_records() {
    let adj = Adjustment::HueSaturation {
        hue: -30,
        saturation: 12,
        value: 4,
    };
    let l = layer(NewLayer::with_content(
        "hsv",
        LayerContent::Adjustment(adj),
        PixelRect::from_size(64, 64),
    ));
    assert_eq!(round_trip(&l, 0).content, LayerContent::Adjustment(adj));

    let g = layer(NewLayer::group("folder", PixelRect::from_size(64, 64)));
    assert!(encode_payload(g.content(), opts()).unwrap().is_empty());
    let d = round_trip(&g, 0);
    assert_eq!(d.content, LayerContent::Group);
    assert_eq!(d.base.kind, LayerKind::Group);
}

#[test]
fn implausible_payload_length_is_rejected() {
    let g = layer(NewLayer::group("folder", PixelRect::from_size(4, 4)));
    let mut bytes = encode_record(&g, 0, opts()).unwrap();
    // marker(4) + name(2 + 6) + base(26) is where the payload length sits.
    let at = 4 + 2 + 6 + 26;
    bytes[at..at + 4].copy_from_slice(&u32::MAX.to_le_bytes());
    let err = decode_record(&bytes, RecordLimits::checked()).unwrap_err();
    assert!(matches!(err, LayerdocError::Codec(_)));
}

#[test]
fn payload_bound_follows_declared_geometry() {
    let data = (0..300 * 200 * 3).map(|i: usize| (i * 7919 % 251) as u8).collect();
    let px = PixelBuffer::from_raw(300, 200, 3, data).unwrap();
    let l = layer(NewLayer::raster("wide", px, 0, 0));
    assert_eq!(&round_trip(&l, 0).content, l.content());

    let g = layer(NewLayer::group("folder", PixelRect::from_size(4, 4)));
    let mut bytes = encode_record(&g, 0, opts()).unwrap();
    // Redeclare the group as a raster wider than any layer may be.
    bytes[4 + 2 + 6] = LayerKind::Raster.to_u8();
    let width_at = 4 + 2 + 6 + 2 + 8;
    bytes[width_at..width_at + 4].copy_from_slice(&(MAX_LAYER_SIDE + 1).to_le_bytes());
    assert!(decode_record(&bytes, RecordLimits::checked()).is_err());
}

#[test]
fn oversized_text_is_refused_by_the_writer() {
    let text = TextLayer {
        text: "x".repeat(MAX_TEXT_BYTES + 1),
        ..TextLayer::default()
    };
    let l = layer(NewLayer::with_content(
        "essay",
        LayerContent::Text(text),
        PixelRect::from_size(4, 4),
    ));
    let err = encode_record(&l, 0, opts()).unwrap_err();
    assert!(matches!(err, LayerdocError::Codec(_)));
}

#[test]
fn missing_marker_and_bad_tags_are_rejected() {
    let g = layer(NewLayer::group("folder", PixelRect::from_size(4, 4)));
    let good = encode_record(&g, 0, opts()).unwrap();

    let mut no_marker = good.clone();
    no_marker[0] = b'X';
    assert!(decode_record(&no_marker, RecordLimits::trusted()).is_err());

    let mut bad_kind = good.clone();
    bad_kind[4 + 2 + 6] = 99;
    assert!(decode_record(&bad_kind, RecordLimits::trusted()).is_err());
}
