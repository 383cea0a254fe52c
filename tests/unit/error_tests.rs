//! Unit tests for error display and conversions.

use chat_herald::AppError;

#[test]
fn display_prefixes_the_category() {
    assert_eq!(AppError::Config("bad".into()).to_string(), "config: bad");
    assert!(AppError::Speech("no audio".into())
        .to_string()
        .contains("no audio"));
}

#[test]
fn io_error_converts() {
    let err: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
    assert!(matches!(err, AppError::Io(_)));
}

#[test]
fn toml_error_converts_to_config() {
    let parse = toml::from_str::<toml::Value>("= nope").expect_err("invalid toml");
    let err: AppError = parse.into();
    assert!(matches!(err, AppError::Config(_)));
}
