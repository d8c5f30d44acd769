//! События и их полезная нагрузка.

use std::{any::Any, fmt, sync::Arc};

use serde::{Deserialize, Serialize};

/// Полезная нагрузка события.
///
/// Любой потокобезопасный контейнер данных подходит — ядро не навязывает
/// схему. Типизированные обработчики восстанавливают конкретный тип через
/// `as_any`.
pub trait EventPayload: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + Send + Sync> EventPayload for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Универсальный контейнер данных события.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataEvent<T> {
    pub data: T,
}

impl<T> DataEvent<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Доставляемое событие.
///
/// Тема передаётся подписчику в том виде, в каком её опубликовали
/// (и точным, и wildcard-подписчикам), а не в канонической форме ключа.
#[derive(Clone)]
pub struct Event {
    topic: Arc<str>,
    sender: Option<Arc<dyn Any + Send + Sync>>,
    payload: Arc<dyn EventPayload>,
    /// Событие пришло через внешний мост: повторно в мост не отдаётся.
    via_bridge: bool,
}

impl Event {
    pub(crate) fn new(
        topic: &str,
        sender: Option<Arc<dyn Any + Send + Sync>>,
        payload: Arc<dyn EventPayload>,
        via_bridge: bool,
    ) -> Self {
        Self {
            topic: Arc::from(topic),
            sender,
            payload,
            via_bridge,
        }
    }

    /// Опубликованная тема.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Отправитель, если издатель его указал.
    pub fn sender(&self) -> Option<&Arc<dyn Any + Send + Sync>> {
        self.sender.as_ref()
    }

    /// Полезная нагрузка в стёртом виде.
    pub fn payload(&self) -> &Arc<dyn EventPayload> {
        &self.payload
    }

    /// Пытается восстановить конкретный тип полезной нагрузки.
    pub fn payload_as<P: EventPayload>(&self) -> Option<&P> {
        self.payload.as_any().downcast_ref::<P>()
    }

    /// Пришло ли событие из внешнего моста.
    pub fn arrived_via_bridge(&self) -> bool {
        self.via_bridge
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("topic", &self.topic)
            .field("has_sender", &self.sender.is_some())
            .field("via_bridge", &self.via_bridge)
            .finish()
    }
}
