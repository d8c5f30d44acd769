//! Дескрипторы издателей и подписчиков.
//!
//! Дескриптор — запись реестра, связывающая слабо удерживаемого владельца
//! с темой и ролью. Обработчик подписчика хранится в стёртом виде вместе
//! с `TypeId` его типа нагрузки (если обработчик типизированный) — это
//! позволяет проверить инвариант фоновой доставки при регистрации.

use std::{
    any::{Any, TypeId},
    fmt, ptr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
};

use crate::{
    error::RouterError,
    router::{endpoint::Endpoint, payload::Event, payload::EventPayload},
    topic::{has_wildcard, normalize},
};

/// Область видимости публикации.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventScope {
    /// Все живые подписчики темы.
    Global,
    /// Только подписчики из модуля развёртывания издателя.
    Restricted,
    /// Доставка делегируется внешнему транспортному мосту.
    External,
}

/// Режим доставки подписчику.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Вызов на потоке издателя, блокирующий.
    Sync,
    /// Вызов на фоновом контексте, издатель не ждёт.
    Async,
}

fn next_descriptor_id() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

/// Владелец подписки: слабая ссылка на объект либо статический
/// обработчик, не привязанный к объекту.
#[derive(Clone)]
pub(crate) enum OwnerRef {
    Instance(Weak<dyn Endpoint>),
    Static,
}

/// Результат запроса живости владельца в момент использования.
pub(crate) enum Liveness {
    /// Статический обработчик: всегда жив, владельца нет.
    Static,
    Alive(Arc<dyn Endpoint>),
    Dead,
}

impl OwnerRef {
    pub(crate) fn instance(owner: &Arc<dyn Endpoint>) -> Self {
        OwnerRef::Instance(Arc::downgrade(owner))
    }

    /// Живость опрашивается, а не кэшируется.
    pub(crate) fn liveness(&self) -> Liveness {
        match self {
            OwnerRef::Static => Liveness::Static,
            OwnerRef::Instance(weak) => match weak.upgrade() {
                Some(owner) => Liveness::Alive(owner),
                None => Liveness::Dead,
            },
        }
    }

    /// Идентичность владельца: сравнение адресов, не содержимого.
    pub(crate) fn is(&self, owner: &Arc<dyn Endpoint>) -> bool {
        match self {
            OwnerRef::Static => false,
            OwnerRef::Instance(weak) => ptr::addr_eq(weak.as_ptr(), Arc::as_ptr(owner)),
        }
    }
}

type ErasedHandler =
    dyn Fn(Option<&Arc<dyn Endpoint>>, &Event) -> Result<(), RouterError> + Send + Sync;

/// Связанный обработчик подписчика.
///
/// Конструкторы `typed*` фиксируют тип нагрузки; `untyped*` принимают
/// любое событие, но не могут регистрироваться в режиме `Async`.
#[derive(Clone)]
pub struct BoundHandler {
    payload_type: Option<TypeId>,
    func: Arc<ErasedHandler>,
}

impl BoundHandler {
    /// Обработчик-метод с типизированной нагрузкой.
    pub fn typed<O, P, F>(f: F) -> Self
    where
        O: Endpoint,
        P: EventPayload,
        F: Fn(&O, &Event, &P) + Send + Sync + 'static,
    {
        let func = Arc::new(
            move |owner: Option<&Arc<dyn Endpoint>>, event: &Event| -> Result<(), RouterError> {
                let mismatch = || RouterError::HandlerTypeMismatch {
                    topic: event.topic().to_string(),
                };
                let owner = owner.ok_or_else(mismatch)?;
                let any: &dyn Any = owner.as_ref();
                let target = any.downcast_ref::<O>().ok_or_else(mismatch)?;
                let payload = event.payload_as::<P>().ok_or_else(mismatch)?;
                f(target, event, payload);
                Ok(())
            },
        );
        Self {
            payload_type: Some(TypeId::of::<P>()),
            func,
        }
    }

    /// Обработчик-метод без типизированной нагрузки.
    pub fn untyped<O, F>(f: F) -> Self
    where
        O: Endpoint,
        F: Fn(&O, &Event) + Send + Sync + 'static,
    {
        let func = Arc::new(
            move |owner: Option<&Arc<dyn Endpoint>>, event: &Event| -> Result<(), RouterError> {
                let mismatch = || RouterError::HandlerTypeMismatch {
                    topic: event.topic().to_string(),
                };
                let owner = owner.ok_or_else(mismatch)?;
                let any: &dyn Any = owner.as_ref();
                let target = any.downcast_ref::<O>().ok_or_else(mismatch)?;
                f(target, event);
                Ok(())
            },
        );
        Self {
            payload_type: None,
            func,
        }
    }

    /// Статический обработчик с типизированной нагрузкой.
    pub fn static_typed<P, F>(f: F) -> Self
    where
        P: EventPayload,
        F: Fn(&Event, &P) + Send + Sync + 'static,
    {
        let func = Arc::new(
            move |_owner: Option<&Arc<dyn Endpoint>>, event: &Event| -> Result<(), RouterError> {
                let payload =
                    event
                        .payload_as::<P>()
                        .ok_or_else(|| RouterError::HandlerTypeMismatch {
                            topic: event.topic().to_string(),
                        })?;
                f(event, payload);
                Ok(())
            },
        );
        Self {
            payload_type: Some(TypeId::of::<P>()),
            func,
        }
    }

    /// Статический обработчик без типизированной нагрузки.
    pub fn static_untyped<F>(f: F) -> Self
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let func = Arc::new(
            move |_owner: Option<&Arc<dyn Endpoint>>, event: &Event| -> Result<(), RouterError> {
                f(event);
                Ok(())
            },
        );
        Self {
            payload_type: None,
            func,
        }
    }

    /// `TypeId` нагрузки типизированного обработчика.
    pub fn payload_type(&self) -> Option<TypeId> {
        self.payload_type
    }

    pub(crate) fn invoke(
        &self,
        owner: Option<&Arc<dyn Endpoint>>,
        event: &Event,
    ) -> Result<(), RouterError> {
        (self.func)(owner, event)
    }
}

impl fmt::Debug for BoundHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundHandler")
            .field("payload_type", &self.payload_type)
            .finish()
    }
}

/// Дескриптор зарегистрированного издателя.
#[derive(Clone)]
pub struct PublisherDescriptor {
    id: u64,
    owner: Weak<dyn Endpoint>,
    topic: Arc<str>,
    scope: EventScope,
}

impl PublisherDescriptor {
    pub(crate) fn new(topic: &str, scope: EventScope, owner: &Arc<dyn Endpoint>) -> Self {
        Self {
            id: next_descriptor_id(),
            owner: Arc::downgrade(owner),
            topic: Arc::from(topic),
            scope,
        }
    }

    /// Объявленная тема (в виде, переданном при регистрации).
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn scope(&self) -> EventScope {
        self.scope
    }

    /// Живой владелец либо `None`, если объект уже освобождён.
    pub(crate) fn owner(&self) -> Option<Arc<dyn Endpoint>> {
        self.owner.upgrade()
    }

    pub(crate) fn is_owned_by(&self, owner: &Arc<dyn Endpoint>) -> bool {
        ptr::addr_eq(self.owner.as_ptr(), Arc::as_ptr(owner))
    }
}

impl fmt::Debug for PublisherDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublisherDescriptor")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Дескриптор зарегистрированного подписчика.
#[derive(Clone)]
pub struct SubscriberDescriptor {
    id: u64,
    owner: OwnerRef,
    pattern: Arc<str>,
    has_wildcard: bool,
    mode: DeliveryMode,
    handler: BoundHandler,
}

impl SubscriberDescriptor {
    pub(crate) fn new(
        topic: &str,
        owner: OwnerRef,
        mode: DeliveryMode,
        handler: BoundHandler,
    ) -> Self {
        let pattern = normalize(topic);
        Self {
            id: next_descriptor_id(),
            owner,
            has_wildcard: has_wildcard(&pattern),
            pattern: Arc::from(pattern),
            mode,
            handler,
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Каноническая форма шаблона подписки.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn has_wildcard(&self) -> bool {
        self.has_wildcard
    }

    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    pub(crate) fn owner_ref(&self) -> &OwnerRef {
        &self.owner
    }

    pub(crate) fn handler(&self) -> &BoundHandler {
        &self.handler
    }

    pub(crate) fn is_owned_by(&self, owner: &Arc<dyn Endpoint>) -> bool {
        self.owner.is(owner)
    }
}

impl fmt::Debug for SubscriberDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberDescriptor")
            .field("id", &self.id)
            .field("pattern", &self.pattern)
            .field("has_wildcard", &self.has_wildcard)
            .field("mode", &self.mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::payload::DataEvent;

    #[derive(Default)]
    struct Probe {
        hits: std::sync::atomic::AtomicUsize,
    }
    impl Endpoint for Probe {}

    fn event_with(payload: Arc<dyn EventPayload>) -> Event {
        Event::new("Order.Created", None, payload, false)
    }

    /// Тест проверяет, что живость владельца опрашивается в момент
    /// использования: после дропа сильной ссылки дескриптор мёртв.
    #[test]
    fn test_owner_liveness_is_queried() {
        let owner: Arc<dyn Endpoint> = Arc::new(Probe::default());
        let owner_ref = OwnerRef::instance(&owner);
        assert!(matches!(owner_ref.liveness(), Liveness::Alive(_)));

        drop(owner);
        assert!(matches!(owner_ref.liveness(), Liveness::Dead));
    }

    /// Тест проверяет идентичность владельца по адресу, а не по типу.
    #[test]
    fn test_owner_identity() {
        let a: Arc<dyn Endpoint> = Arc::new(Probe::default());
        let b: Arc<dyn Endpoint> = Arc::new(Probe::default());
        let owner_ref = OwnerRef::instance(&a);

        assert!(owner_ref.is(&a));
        assert!(!owner_ref.is(&b));
        assert!(!OwnerRef::Static.is(&a));
    }

    /// Тест проверяет вызов типизированного обработчика и фиксацию
    /// типа нагрузки.
    #[test]
    fn test_typed_handler_invocation() {
        let owner: Arc<dyn Endpoint> = Arc::new(Probe::default());
        let handler = BoundHandler::typed(|probe: &Probe, _event, payload: &DataEvent<u32>| {
            assert_eq!(payload.data, 42);
            probe
                .hits
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });

        assert!(handler.payload_type().is_some());
        let event = event_with(Arc::new(DataEvent::new(42u32)));
        handler.invoke(Some(&owner), &event).unwrap();
    }

    /// Тест проверяет, что чужой тип нагрузки даёт мягкую ошибку,
    /// а не панику.
    #[test]
    fn test_typed_handler_payload_mismatch() {
        let owner: Arc<dyn Endpoint> = Arc::new(Probe::default());
        let handler =
            BoundHandler::typed(|_: &Probe, _event, _payload: &DataEvent<u32>| unreachable!());

        let event = event_with(Arc::new(DataEvent::new("wrong".to_string())));
        let err = handler.invoke(Some(&owner), &event).unwrap_err();
        assert!(matches!(err, RouterError::HandlerTypeMismatch { .. }));
    }

    /// Тест проверяет, что у нетипизированного обработчика нет TypeId
    /// нагрузки — инвариант фоновой регистрации опирается на это.
    #[test]
    fn test_untyped_handler_has_no_payload_type() {
        let handler = BoundHandler::untyped(|_: &Probe, _event| {});
        assert!(handler.payload_type().is_none());

        let static_handler = BoundHandler::static_untyped(|_event| {});
        assert!(static_handler.payload_type().is_none());
    }

    /// Тест проверяет, что дескриптор подписчика канонизирует шаблон
    /// и распознаёт подстановку.
    #[test]
    fn test_subscriber_descriptor_pattern() {
        let owner: Arc<dyn Endpoint> = Arc::new(Probe::default());
        let desc = SubscriberDescriptor::new(
            "Order.*",
            OwnerRef::instance(&owner),
            DeliveryMode::Sync,
            BoundHandler::static_untyped(|_| {}),
        );
        assert_eq!(desc.pattern(), "ORDER.*");
        assert!(desc.has_wildcard());
        assert_eq!(desc.mode(), DeliveryMode::Sync);
    }
}
