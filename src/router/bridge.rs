//! Внешний транспортный мост.
//!
//! Издатели со scope [`EventScope::External`] не раздаются локальным
//! подписчикам: событие целиком передаётся мосту для межпроцессной
//! ре-публикации. Входящий путь — обратный: мост, получив сообщение,
//! возвращает его в ядро через [`EventRouter::publish_from_bridge`],
//! и такое событие помечается, чтобы внешняя публикация не ушла в мост
//! повторно (разрыв эхо-петли лежит на ядре).
//!
//! [`EventScope::External`]: crate::router::EventScope
//! [`EventRouter::publish_from_bridge`]: crate::router::EventRouter::publish_from_bridge

use crate::router::payload::Event;

/// Транспорт для ре-публикации событий за пределы процесса.
pub trait EventBridge: Send + Sync {
    /// Передаёт событие во внешний транспорт.
    ///
    /// Вызывается только для событий, которые не приходили через мост.
    fn forward(&self, event: &Event);
}
