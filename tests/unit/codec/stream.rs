use super::*;

#[test]
fn incompressible_data_fits_the_bound() {
    // xorshift noise does not compress.
    let mut x = 0x2545_f491u32;
    let noise: Vec<u8> = (0..50_000)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            x as u8
        })
        .collect();
    let packed = compress(&noise, 9).unwrap();
    assert!(packed.len() > noise.len() / 2);
    assert!(packed.len() <= compress_bound(noise.len()));
    assert_eq!(decompress(&packed, noise.len()).unwrap(), noise);
}

#[test]
fn empty_input_round_trips() {
    let packed = compress(&[], 6).unwrap();
    assert!(decompress(&packed, 0).unwrap().is_empty());
}

#[test]
fn wrong_declared_size_is_rejected() {
    let packed = compress(&[1u8; 100], 6).unwrap();
    assert!(matches!(
        decompress(&packed, 99).unwrap_err(),
        LayerdocError::Codec(_)
    ));
    assert!(decompress(&packed, 101).is_err());
}

#[test]
fn block_framing_and_limit() {
    let mut w = ByteWriter::new();
    write_block(&mut w, &[7u8; 300], 6).unwrap();
    let bytes = w.into_bytes();
    assert_eq!(read_block(&mut ByteReader::new(&bytes), 1000).unwrap(), vec![7u8; 300]);
    assert!(read_block(&mut ByteReader::new(&bytes), 100).is_err());
}
