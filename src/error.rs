//! Ошибки маршрутизатора событий.
//!
//! Политика распространения: ничего из подписчика не выходит за границу
//! диспетчера. Ошибки регистрации и сбои вызова обработчиков уходят в
//! подключаемый приёмник (`ErrorSink`), а не возвращаются вызывающему —
//! маршрутизация остаётся best-effort от начала до конца.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("invalid topic pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("async subscriber for topic '{topic}' must declare a typed payload parameter")]
    UntypedAsyncHandler { topic: String },

    #[error("handler binding does not match the delivered owner or payload type for topic '{topic}'")]
    HandlerTypeMismatch { topic: String },

    #[error("subscriber handler for topic '{topic}' panicked: {reason}")]
    HandlerPanic { topic: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RouterError::UntypedAsyncHandler {
            topic: "ORDER.CREATED".into(),
        };
        assert_eq!(
            err.to_string(),
            "async subscriber for topic 'ORDER.CREATED' must declare a typed payload parameter"
        );

        let err = RouterError::HandlerPanic {
            topic: "ORDER.CREATED".into(),
            reason: "boom".into(),
        };
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_invalid_pattern_keeps_source() {
        use std::error::Error;

        let source = globset::Glob::new("[").unwrap_err();
        let err = RouterError::InvalidPattern {
            pattern: "[".into(),
            source,
        };
        assert!(err.source().is_some());
    }
}
