//! Инициализация логирования.
//!
//! Внутренняя диагностика маршрутизатора идёт через `tracing`; этот модуль
//! поднимает подписчик с фильтром из окружения (`RUST_LOG`) либо из
//! конфигурации. Сбои обработчиков попадают сюда через приёмник по
//! умолчанию [`crate::router::TracingSink`].

use tracing_subscriber::EnvFilter;

use crate::config::RouterConfig;

/// Инициализация логирования с конфигурацией.
///
/// Повторный вызов вернёт ошибку: глобальный подписчик `tracing`
/// устанавливается один раз на процесс.
pub fn init_logging(config: &RouterConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| e as Box<dyn std::error::Error>)?;

    Ok(())
}
