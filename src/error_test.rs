use super::*;

fn fallible(ok: bool) -> result::Result<u32, std::num::ParseIntError> {
    if ok {
        Ok(7)
    } else {
        "not-a-number".parse::<u32>()
    }
}

#[test]
fn test_err_at_wraps_ok() {
    let r: Result<u32> = err_at!(System, fallible(true));
    assert_eq!(r.unwrap(), 7);
}

#[test]
fn test_err_at_wraps_err() {
    let r: Result<u32> = err_at!(System, fallible(false));
    let err = r.unwrap_err();
    assert_eq!(err.keyword(), "SYSTEM");
    assert!(format!("{}", err).contains("System"));
}

#[test]
fn test_err_at_msg_form() {
    let r: Result<()> = err_at!(Semantics, msg: "result= not allowed inside or-branch {}", 3);
    let err = r.unwrap_err();
    assert_eq!(err.keyword(), "SEMANTICS");
    assert!(format!("{}", err).contains("or-branch"));
}

#[test]
fn test_err_at_extra_context() {
    let r: Result<u32> = err_at!(InvalidFile, fallible(false), "loading partition {}", 4);
    let err = r.unwrap_err();
    assert_eq!(err.keyword(), "SYSTEM");
    assert!(format!("{}", err).contains("loading partition"));
}

#[test]
fn test_keywords() {
    assert_eq!(Error::Empty("l".into(), "m".into()).keyword(), "EMPTY");
    assert_eq!(Error::Timeout("l".into(), "m".into()).keyword(), "TIMEOUT");
    assert_eq!(
        Error::NotReplica("l".into(), "m".into()).keyword(),
        "NOTREPLICA"
    );
}
