use std::time::Duration;

use mimir::{MimirError, Result, SelectionMode};

#[test]
fn test_error_display() {
    let err = MimirError::InvalidArgument("tag must not be empty".to_string());
    assert!(err.to_string().contains("tag must not be empty"));
}

#[test]
fn test_unsupported() {
    let err = MimirError::Unsupported("tagged kanye.rest quotes");
    assert!(err.to_string().contains("does not support"));
}

#[test]
fn test_result_alias() {
    fn returns_error() -> Result<()> {
        Err(MimirError::NoSource)
    }
    assert!(returns_error().is_err());
}

#[test]
fn test_json_error_converts() {
    fn parse() -> Result<serde_json::Value> {
        Ok(serde_json::from_str("{")?)
    }
    assert!(matches!(parse(), Err(MimirError::Json(_))));
}

// ============================================================================
// Transient error classification
// ============================================================================

#[test]
fn transient_errors() {
    assert!(MimirError::Http("reset".into()).is_transient());
    assert!(MimirError::RateLimited { retry_after: None }.is_transient());
    assert!(
        MimirError::Api {
            status: 500,
            message: String::new()
        }
        .is_transient()
    );
}

#[test]
fn permanent_errors() {
    let permanent = [
        MimirError::Api {
            status: 404,
            message: String::new(),
        },
        MimirError::InvalidArgument("x".into()),
        MimirError::OutOfRange("x".into()),
        MimirError::InvalidState("x".into()),
        MimirError::SourceMismatch("x".into()),
        MimirError::EmptyResponse,
        MimirError::Unsupported("x"),
        MimirError::NoSource,
        MimirError::Configuration("x".into()),
    ];
    for err in permanent {
        assert!(!err.is_transient(), "{err} should be permanent");
    }
}

#[test]
fn retry_after_only_from_rate_limit() {
    let err = MimirError::RateLimited {
        retry_after: Some(Duration::from_secs(3)),
    };
    assert_eq!(err.retry_after(), Some(Duration::from_secs(3)));
    assert_eq!(MimirError::Http("x".into()).retry_after(), None);
}

#[test]
fn selection_mode_parse_errors_are_invalid_argument() {
    let err = "sometimes".parse::<SelectionMode>().unwrap_err();
    assert!(matches!(err, MimirError::InvalidArgument(_)));
    assert_eq!("cache".parse::<SelectionMode>().unwrap(), SelectionMode::Cached);
}
