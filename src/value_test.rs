use super::*;

#[test]
fn test_render_scalar_values() {
    assert_eq!(Value::Null.render().unwrap(), b"null");
    assert_eq!(Value::Boolean(true).render().unwrap(), b"true");
    assert_eq!(Value::Number(3.5).render().unwrap(), b"3.5");
    assert_eq!(Value::Atom("Person".into()).render().unwrap(), b"Person");
}

#[test]
fn test_render_string_escapes_special_characters() {
    let v = Value::String(b"a\"b\\c\nd".to_vec());
    assert_eq!(v.render().unwrap(), b"\"a\\\"b\\\\c\\nd\"");
}

#[test]
fn test_render_string_passes_non_ascii_bytes_through_unchanged() {
    // 0xC3 0xA9 is the UTF-8 encoding of 'e'-acute; a byte-unsafe escaper
    // that widens each byte to a `char` would double-encode it.
    let v = Value::String(vec![0xC3, 0xA9]);
    assert_eq!(v.render().unwrap(), vec![b'"', 0xC3, 0xA9, b'"']);
}

#[test]
fn test_render_list_uses_parentheses() {
    let v = Value::List(vec![Value::Atom("name".into()), Value::String(b"Alice".to_vec())]);
    assert_eq!(v.render().unwrap(), b"(name \"Alice\")");
}

#[test]
fn test_render_sequence_has_no_punctuation() {
    let v = Value::Sequence(vec![Value::Number(1.0), Value::Number(2.0)]);
    assert_eq!(v.render().unwrap(), b"1 2");
}

#[test]
fn test_render_rejects_unresolved_deferred() {
    assert!(Value::Deferred(7).render().is_err());
}

#[test]
fn test_render_rejects_unresolved_records() {
    assert!(Value::Records { start: 0, end: 10 }.render().is_err());
}
