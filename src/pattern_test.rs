use super::*;

fn field(f: PrimitiveField) -> Pattern {
    Pattern::new(PatternKind::Field(f))
}

fn agg(a: Aggregate) -> Pattern {
    Pattern::new(PatternKind::Aggregate(a))
}

fn list(items: Vec<Pattern>) -> Pattern {
    Pattern::new(PatternKind::List(items))
}

#[test]
fn test_flat_list_is_valid() {
    let p = list(vec![field(PrimitiveField::Name), field(PrimitiveField::Value)]);
    assert!(p.validate().is_ok());
    assert_eq!(p.depth(), 1);
}

#[test]
fn test_one_level_of_nesting_is_valid() {
    let p = list(vec![field(PrimitiveField::Name), list(vec![field(PrimitiveField::Value)])]);
    assert!(p.validate().is_ok());
    assert_eq!(p.depth(), 2);
}

#[test]
fn test_two_nested_lists_at_same_level_is_rejected() {
    let p = list(vec![list(vec![field(PrimitiveField::Name)]), list(vec![field(PrimitiveField::Value)])]);
    assert!(p.validate().is_err());
}

#[test]
fn test_depth_exceeding_two_is_rejected() {
    let p = list(vec![list(vec![list(vec![field(PrimitiveField::Name)])])]);
    assert!(p.validate().is_err());
}

#[test]
fn test_duplicate_contents_at_one_level_is_rejected() {
    let p = list(vec![agg(Aggregate::Contents), agg(Aggregate::Contents)]);
    assert!(p.validate().is_err());
}

#[test]
fn test_duplicate_count_at_one_level_is_rejected() {
    let p = list(vec![agg(Aggregate::Count), agg(Aggregate::Count)]);
    assert!(p.validate().is_err());
}

#[test]
fn test_single_count_and_single_contents_is_valid() {
    let p = list(vec![agg(Aggregate::Count), agg(Aggregate::Contents)]);
    assert!(p.validate().is_ok());
}
