//! Темы и шаблоны.
//!
//! - `normalize`: канонизация ключей тем (case-folding).
//! - `pattern`: компиляция шаблонов с `*` и проверка кандидатов.

pub mod normalize;
pub mod pattern;

pub use normalize::{has_wildcard, normalize, WILDCARD};
pub use pattern::TopicPattern;
