//! Конфигурация маршрутизатора.

use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Число рабочих потоков фоновой доставки (режим Async).
    pub async_workers: usize,
    /// Начальное состояние глобального выключателя.
    pub enabled: bool,
    /// Директива фильтра логирования по умолчанию.
    pub log_filter: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            async_workers: 2,
            enabled: true,
            log_filter: "info".to_string(),
        }
    }
}

impl RouterConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let cfg = Config::builder()
            // Значения по умолчанию
            .set_default("async_workers", 2)?
            .set_default("enabled", true)?
            .set_default("log_filter", "info")?
            // Переменные окружения с префиксом VESTNIK_
            .add_source(Environment::with_prefix("VESTNIK"))
            .build()?;

        // Десериализуем конфигурацию в нашу структуру
        cfg.try_deserialize()
    }
}
