use super::*;

#[test]
fn test_observe_raises_watermark_only() {
    let mut d = Dateline::new();
    d.observe(1, 10);
    d.observe(1, 5);
    assert_eq!(d.max_id_of(1), 10);
    d.observe(1, 20);
    assert_eq!(d.max_id_of(1), 20);
}

#[test]
fn test_covers_requires_every_partition_dominated() {
    let mut a = Dateline::new();
    a.observe(1, 10);
    a.observe(2, 5);
    let mut b = Dateline::new();
    b.observe(1, 8);
    assert!(a.covers(&b));
    b.observe(2, 9);
    assert!(!a.covers(&b));
}

#[test]
fn test_serialize_parse_round_trip() {
    let mut d = Dateline::new();
    d.observe(2, 7);
    d.observe(1, 3);
    let text = d.serialize();
    assert_eq!(text, "1.3,2.7");
    let parsed = Dateline::parse(&text).unwrap();
    assert_eq!(parsed, d);
}

#[test]
fn test_parse_empty_is_empty_dateline() {
    let d = Dateline::parse("").unwrap();
    assert_eq!(d, Dateline::new());
}

#[test]
fn test_parse_rejects_malformed_entry() {
    assert!(Dateline::parse("nodot").is_err());
}
