//! Скомпилированные шаблоны тем.
//!
//! Шаблон — это имя темы, в котором `*` совпадает с нулём и более
//! символов, не ограничиваясь одним сегментом. Компиляция выполняется
//! через [`globset`]: точка в glob-синтаксисе — литерал, поэтому
//! дополнительного экранирования разделителя не требуется. Темы без `*`
//! этим модулем не обслуживаются — для них реестр использует точное
//! сравнение ключей.

use std::sync::Arc;

use globset::{GlobBuilder, GlobMatcher};

use super::normalize;
use crate::error::RouterError;

/// Скомпилированный шаблон темы с подстановкой.
#[derive(Debug, Clone)]
pub struct TopicPattern {
    pattern: Arc<str>,
    matcher: GlobMatcher,
}

impl TopicPattern {
    /// Компилирует шаблон в матчер.
    ///
    /// Шаблон приводится к канонической форме, `*` транслируется в
    /// "ноль и более любых символов", сравнение регистронезависимое.
    pub fn compile(pattern: &str) -> Result<Self, RouterError> {
        let canonical = normalize(pattern);
        let glob = GlobBuilder::new(&canonical)
            .case_insensitive(true)
            // `*` должна пересекать границы сегментов: "A.*" ловит и "A.B.C"
            .literal_separator(false)
            .build()
            .map_err(|source| RouterError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(Self {
            pattern: Arc::from(canonical),
            matcher: glob.compile_matcher(),
        })
    }

    /// Проверяет произвольное имя темы, предварительно канонизировав его.
    pub fn matches(&self, topic: &str) -> bool {
        self.matcher.is_match(normalize(topic))
    }

    /// Проверяет уже канонизированное имя темы.
    ///
    /// Диспетчер канонизирует опубликованную тему один раз и прогоняет её
    /// через все шаблоны индекса, не повторяя нормализацию на каждом шаге.
    pub(crate) fn matches_normalized(&self, candidate: &str) -> bool {
        self.matcher.is_match(candidate)
    }

    /// Каноническая форма шаблона.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}
