//! Нормализация ключей тем.
//!
//! Сопоставление издателей и подписчиков не зависит от регистра, поэтому
//! все ключи приводятся к единой канонической форме перед тем, как попасть
//! в реестр. Точка-разделитель в glob-синтаксисе — обычный литерал, так что
//! экранировать её не нужно: каноническая форма сводится к case-folding.

/// Символ подстановки в шаблонах тем.
pub const WILDCARD: char = '*';

/// Приводит имя темы к канонической форме ключа.
///
/// Обрезает окружающие пробелы и поднимает регистр. Две строки обозначают
/// одну и ту же тему тогда и только тогда, когда их канонические формы
/// равны.
pub fn normalize(topic: &str) -> String {
    topic.trim().to_uppercase()
}

/// Содержит ли тема символ подстановки.
pub fn has_wildcard(topic: &str) -> bool {
    topic.contains(WILDCARD)
}
