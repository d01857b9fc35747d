use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        LayerdocError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        LayerdocError::format("x")
            .to_string()
            .contains("format error:")
    );
    assert!(LayerdocError::codec("x").to_string().contains("codec error:"));
    assert!(
        LayerdocError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = LayerdocError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
