use super::*;

fn gradient(w: u32, h: u32, channels: u8) -> PixelBuffer {
    let len = (w * h) as usize * usize::from(channels);
    let data = (0..len).map(|i| (i * 7 % 251) as u8).collect();
    PixelBuffer::from_raw(w, h, channels, data).unwrap()
}

#[test]
fn png_keeps_bytes_for_every_channel_layout() {
    for channels in 1..=4u8 {
        let px = gradient(5, 3, channels);
        let png = encode_buffer(&px, PngCompression::Fast).unwrap();
        let back = decode_buffer(&png, 5, 3, channels).unwrap();
        assert_eq!(back.as_bytes(), px.as_bytes(), "channels={channels}");
    }
}

#[test]
fn strided_input_is_repacked() {
    // 2x2 RGBA with 4 bytes of row padding.
    let mut data = vec![0u8; 12 * 2];
    data[..8].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
    data[12..20].copy_from_slice(&[9, 10, 11, 12, 13, 14, 15, 16]);
    let png = encode_pixels(&data, 2, 2, 12, 4, PngCompression::Default).unwrap();
    let img = decode_pixels(&png).unwrap();
    assert_eq!(img.stride, 8);
    assert_eq!(img.data, (1..=16).collect::<Vec<u8>>());
}

#[test]
fn size_mismatch_is_a_codec_error() {
    let png = encode_buffer(&gradient(2, 2, 4), PngCompression::Fast).unwrap();
    let err = decode_buffer(&png, 3, 2, 4).unwrap_err();
    assert!(matches!(err, LayerdocError::Codec(_)));
    assert!(decode_pixels(b"not a png").is_err());
}

#[test]
fn fit_within_scales_uniformly() {
    let src = ImagePixels::from_buffer(&gradient(400, 100, 3));
    let thumb = fit_within(&src, 100).unwrap();
    assert_eq!((thumb.width, thumb.height, thumb.channels), (100, 25, 4));
    assert_eq!(thumb.data.len(), 100 * 25 * 4);

    let small = ImagePixels::from_buffer(&gradient(10, 20, 4));
    assert_eq!(fit_within(&small, 100).unwrap(), small);
}

#[test]
fn into_buffer_drops_row_padding() {
    let img = ImagePixels {
        width: 1,
        height: 2,
        stride: 3,
        channels: 1,
        data: vec![1, 0, 0, 2, 0, 0],
    };
    assert_eq!(img.into_buffer().unwrap().as_bytes(), &[1, 2]);
}
