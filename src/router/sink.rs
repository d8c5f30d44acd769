//! Подключаемый приёмник ошибок.
//!
//! Сбой подписчика никогда не роняет издателя и не прерывает раздачу:
//! единственный канал, по которому об этих сбоях можно узнать — приёмник
//! ошибок маршрутизатора.

use std::error::Error;

/// Внешний коллаборатор логирования.
pub trait ErrorSink: Send + Sync {
    /// Сообщает о внутреннем сбое: отказ регистрации, ошибка вызова
    /// обработчика, паника подписчика.
    fn log_error(&self, message: &str, cause: Option<&(dyn Error + 'static)>);
}

/// Приёмник по умолчанию: пишет в `tracing`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn log_error(&self, message: &str, cause: Option<&(dyn Error + 'static)>) {
        match cause {
            Some(cause) => tracing::error!(%cause, "{message}"),
            None => tracing::error!("{message}"),
        }
    }
}
