//! Ядро маршрутизации событий.
//!
//! Этот модуль реализует внутрипроцессный маршрутизатор: компоненты
//! объявляют интерес к иерархическим темам, издатели публикуют события
//! без статической связи с подписчиками.
//!
//! - `payload`: событие и его типизированная нагрузка.
//! - `endpoint`: владельцы, модули развёртывания, контексты исполнения.
//! - `descriptor`: дескрипторы издателей и подписчиков, связанные
//!   обработчики.
//! - `entry`: запись реестра для одной темы.
//! - `registry` (приватный): процессное отображение тем и wildcard-индекс.
//! - `dispatch`: разрешение темы и раздача.
//! - `facade`: поверхность регистрации и процессный экземпляр.
//! - `sink`: подключаемый приёмник ошибок.
//! - `bridge`: внешний транспортный мост.

pub mod bridge;
pub mod descriptor;
mod dispatch;
pub mod endpoint;
pub mod entry;
pub mod facade;
pub mod payload;
mod registry;
pub mod sink;

pub use bridge::EventBridge;
pub use descriptor::{
    BoundHandler, DeliveryMode, EventScope, PublisherDescriptor, SubscriberDescriptor,
};
pub use endpoint::{DispatchContext, Endpoint, UnitId};
pub use entry::TopicEntry;
pub use facade::{
    add_publisher, add_static_subscriber, add_subscriber, publish, remove_publisher,
    remove_subscriber, set_enabled, unregister, Declaration, EventRouter,
};
pub use payload::{DataEvent, Event, EventPayload};
pub use sink::{ErrorSink, TracingSink};
