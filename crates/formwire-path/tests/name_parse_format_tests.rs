use formwire_path::{decode, encode, PathError, PathKey};

#[test]
fn decodes_checkbox_group_and_multi_index_names() {
    assert_eq!(
        decode("profile.addresses[1].street").expect("decode"),
        vec![
            PathKey::field("profile"),
            PathKey::field("addresses"),
            PathKey::index(1),
            PathKey::field("street"),
        ]
    );
    assert_eq!(
        decode("grid[0][1]").expect("decode"),
        vec![
            PathKey::field("grid"),
            PathKey::index(0),
            PathKey::index(1),
        ]
    );
}

#[test]
fn index_larger_than_usize_is_rejected_not_wrapped() {
    let err = decode("a[99999999999999999999999999]").expect_err("should error");
    let PathError::Invalid { message, .. } = err;
    assert!(message.contains("out of range"), "message={message}");
}

#[test]
fn trailing_separators_fail_explicitly() {
    assert!(decode("a.").is_err());
    assert!(decode("a[0].").is_err());
    assert!(decode("a[0][").is_err());
}

#[test]
fn field_characters_are_permissive_outside_the_reserved_set() {
    // Form field names in the wild carry dashes, colons, unicode. Only `.`,
    // `[` and `]` are structural.
    let path = decode("x-ray:βeta").expect("decode");
    assert_eq!(path, vec![PathKey::field("x-ray:βeta")]);
    assert_eq!(encode(&path), "x-ray:βeta");
}
