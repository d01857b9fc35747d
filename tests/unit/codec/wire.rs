use super::*;

#[test]
fn primitives_are_little_endian() {
    let mut w = ByteWriter::new();
    w.u16(0x0102);
    w.i32(-2);
    w.str16("hé").unwrap();
    let bytes = w.into_bytes();
    assert_eq!(&bytes[..2], &[0x02, 0x01]);

    let mut r = ByteReader::new(&bytes);
    assert_eq!(r.u16().unwrap(), 0x0102);
    assert_eq!(r.i32().unwrap(), -2);
    assert_eq!(r.str16().unwrap(), "hé");
    assert!(r.is_empty());
}

#[test]
fn reads_past_end_fail_without_moving() {
    let mut r = ByteReader::new(&[1, 2, 3]);
    assert!(r.u32().is_err());
    assert_eq!(r.pos(), 0);
    assert_eq!(r.u8().unwrap(), 1);
}

#[test]
fn blob_limit_is_enforced() {
    let mut w = ByteWriter::new();
    w.blob32(&[9; 10]).unwrap();
    let bytes = w.into_bytes();
    assert!(ByteReader::new(&bytes).blob32(4).is_err());
    assert_eq!(ByteReader::new(&bytes).blob32(10).unwrap(), &[9; 10]);
}

#[test]
fn find_any_scans_from_cursor() {
    let data = b"xxLAYRyyCHNK";
    let mut r = ByteReader::new(data);
    assert_eq!(r.find_any(&[b"LAYR", b"CHNK"]), Some(2));
    r.seek(3);
    assert_eq!(r.find_any(&[b"LAYR", b"CHNK"]), Some(8));
    r.seek(9);
    assert_eq!(r.find_any(&[b"LAYR"]), None);
}
