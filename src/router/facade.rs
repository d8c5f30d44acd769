//! Фасад регистрации и процессный экземпляр маршрутизатора.
//!
//! Этим интерфейсом пользуются внешний сканер объявлений и ad-hoc
//! вызывающие. Ошибки регистрации не возвращаются вызывающему — они
//! уходят в приёмник ошибок, а сама регистрация мягко пропускается.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use once_cell::sync::{Lazy, OnceCell};
use parking_lot::RwLock;
use tokio::runtime::Runtime;

use crate::{
    config::RouterConfig,
    router::{
        bridge::EventBridge,
        descriptor::{BoundHandler, DeliveryMode, EventScope, OwnerRef},
        endpoint::Endpoint,
        registry::TopicRegistry,
        sink::{ErrorSink, TracingSink},
    },
};

/// Процессный маршрутизатор; живёт до конца процесса.
static ROUTER: Lazy<EventRouter> = Lazy::new(EventRouter::new);

/// Объявление, которое внешний сканер извлекает из объекта и скармливает
/// фасаду. Ядро само интроспекцией не занимается.
pub enum Declaration {
    Publisher {
        topic: String,
        scope: EventScope,
    },
    Subscriber {
        topic: String,
        mode: DeliveryMode,
        handler: BoundHandler,
    },
}

/// Маршрутизатор событий.
///
/// Обычно используется процессный экземпляр ([`EventRouter::global`] и
/// свободные функции крейта); отдельные экземпляры создаются в тестах.
pub struct EventRouter {
    pub(crate) registry: TopicRegistry,
    enabled: AtomicBool,
    sink: RwLock<Arc<dyn ErrorSink>>,
    bridge: RwLock<Option<Arc<dyn EventBridge>>>,
    /// Фоновый контекст доставки; поднимается при первой Async-доставке.
    workers: OnceCell<Runtime>,
    config: RouterConfig,
    /// Общее количество вызовов `publish`.
    pub publish_count: AtomicUsize,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            registry: TopicRegistry::new(),
            enabled: AtomicBool::new(config.enabled),
            sink: RwLock::new(Arc::new(TracingSink)),
            bridge: RwLock::new(None),
            workers: OnceCell::new(),
            config,
            publish_count: AtomicUsize::new(0),
        }
    }

    /// Процессный экземпляр.
    pub fn global() -> &'static EventRouter {
        &ROUTER
    }

    /// Глобальный выключатель раздачи. Частая дешёвая проверка,
    /// без тяжёлой синхронизации.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Заменяет приёмник ошибок.
    pub fn set_error_sink(&self, sink: Arc<dyn ErrorSink>) {
        *self.sink.write() = sink;
    }

    pub(crate) fn error_sink(&self) -> Arc<dyn ErrorSink> {
        self.sink.read().clone()
    }

    /// Устанавливает внешний транспортный мост.
    pub fn set_bridge(&self, bridge: Arc<dyn EventBridge>) {
        *self.bridge.write() = Some(bridge);
    }

    pub(crate) fn bridge(&self) -> Option<Arc<dyn EventBridge>> {
        self.bridge.read().clone()
    }

    /// Фоновый контекст доставки; `None`, если его не удалось поднять
    /// (сбой уходит в приёмник ошибок, доставка пропускается).
    pub(crate) fn workers(&self) -> Option<&Runtime> {
        let built = self.workers.get_or_try_init(|| {
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(self.config.async_workers.max(1))
                .thread_name("vestnik-worker")
                .build()
        });
        match built {
            Ok(runtime) => Some(runtime),
            Err(err) => {
                self.error_sink()
                    .log_error("failed to start async delivery workers", Some(&err));
                None
            }
        }
    }

    /// Регистрирует издателя темы.
    pub fn add_publisher<O: Endpoint>(&self, topic: &str, scope: EventScope, owner: &Arc<O>) {
        let owner: Arc<dyn Endpoint> = owner.clone();
        self.registry.add_publisher(topic, scope, &owner);
    }

    /// Регистрирует подписчика темы. Отказ (некорректный шаблон,
    /// нетипизированный Async-обработчик) логируется и не прерывает
    /// вызывающего.
    pub fn add_subscriber<O: Endpoint>(
        &self,
        topic: &str,
        owner: &Arc<O>,
        mode: DeliveryMode,
        handler: BoundHandler,
    ) {
        let owner: Arc<dyn Endpoint> = owner.clone();
        self.subscribe(topic, OwnerRef::instance(&owner), mode, handler);
    }

    /// Регистрирует статический обработчик.
    ///
    /// Статический подписчик — одиночка на тему: если запись темы уже
    /// существует, регистрация тихо игнорируется.
    pub fn add_static_subscriber(&self, topic: &str, mode: DeliveryMode, handler: BoundHandler) {
        self.subscribe(topic, OwnerRef::Static, mode, handler);
    }

    fn subscribe(&self, topic: &str, owner: OwnerRef, mode: DeliveryMode, handler: BoundHandler) {
        if let Err(err) = self.registry.add_subscriber(topic, owner, mode, handler) {
            self.error_sink()
                .log_error("subscriber registration skipped", Some(&err));
        }
    }

    /// Снимает первую по порядку регистрацию издателя владельца в теме.
    pub fn remove_publisher<O: Endpoint>(&self, topic: &str, owner: &Arc<O>) {
        let owner: Arc<dyn Endpoint> = owner.clone();
        self.registry.remove_publisher(topic, &owner);
    }

    /// Снимает первую по порядку подписку владельца в теме.
    pub fn remove_subscriber<O: Endpoint>(&self, topic: &str, owner: &Arc<O>) {
        let owner: Arc<dyn Endpoint> = owner.clone();
        self.registry.remove_subscriber(topic, &owner);
    }

    /// Снимает все регистрации владельца. Повторный вызов — no-op.
    pub fn unregister<O: Endpoint>(&self, owner: &Arc<O>) {
        let owner: Arc<dyn Endpoint> = owner.clone();
        self.registry.unregister(&owner);
    }

    /// Скармливает пакет объявлений от сканера. Отказ одного объявления
    /// не прерывает остальные.
    pub fn register<O: Endpoint>(
        &self,
        owner: &Arc<O>,
        declarations: impl IntoIterator<Item = Declaration>,
    ) {
        for declaration in declarations {
            match declaration {
                Declaration::Publisher { topic, scope } => {
                    self.add_publisher(&topic, scope, owner);
                }
                Declaration::Subscriber {
                    topic,
                    mode,
                    handler,
                } => {
                    self.add_subscriber(&topic, owner, mode, handler);
                }
            }
        }
    }

    /// Число подписчиков темы (наблюдаемость для тестов и диагностики).
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.registry
            .find(topic)
            .map_or(0, |entry| entry.subscriber_count())
    }

    /// Число издателей темы.
    pub fn publisher_count(&self, topic: &str) -> usize {
        self.registry
            .find(topic)
            .map_or(0, |entry| entry.publisher_count())
    }

    /// Число известных тем (записи не удаляются, опустев).
    pub fn topic_count(&self) -> usize {
        self.registry.topic_count()
    }
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new()
    }
}

// -----------------------------------------------------------------------------
//  Свободные функции процессного экземпляра
// -----------------------------------------------------------------------------

/// Регистрирует издателя на процессном маршрутизаторе.
pub fn add_publisher<O: Endpoint>(topic: &str, scope: EventScope, owner: &Arc<O>) {
    EventRouter::global().add_publisher(topic, scope, owner);
}

/// Регистрирует подписчика на процессном маршрутизаторе.
pub fn add_subscriber<O: Endpoint>(
    topic: &str,
    owner: &Arc<O>,
    mode: DeliveryMode,
    handler: BoundHandler,
) {
    EventRouter::global().add_subscriber(topic, owner, mode, handler);
}

/// Регистрирует статический обработчик на процессном маршрутизаторе.
pub fn add_static_subscriber(topic: &str, mode: DeliveryMode, handler: BoundHandler) {
    EventRouter::global().add_static_subscriber(topic, mode, handler);
}

/// Снимает регистрацию издателя на процессном маршрутизаторе.
pub fn remove_publisher<O: Endpoint>(topic: &str, owner: &Arc<O>) {
    EventRouter::global().remove_publisher(topic, owner);
}

/// Снимает подписку на процессном маршрутизаторе.
pub fn remove_subscriber<O: Endpoint>(topic: &str, owner: &Arc<O>) {
    EventRouter::global().remove_subscriber(topic, owner);
}

/// Снимает все регистрации владельца на процессном маршрутизаторе.
pub fn unregister<O: Endpoint>(owner: &Arc<O>) {
    EventRouter::global().unregister(owner);
}

/// Публикует событие через процессный маршрутизатор.
pub fn publish(
    sender: Option<Arc<dyn std::any::Any + Send + Sync>>,
    topic: &str,
    payload: Arc<dyn crate::router::payload::EventPayload>,
) {
    EventRouter::global().publish(sender, topic, payload);
}

/// Переключает раздачу на процессном маршрутизаторе.
pub fn set_enabled(enabled: bool) {
    EventRouter::global().set_enabled(enabled);
}

impl Drop for EventRouter {
    fn drop(&mut self) {
        // Runtime нельзя ронять блокирующим shutdown изнутри async-контекста
        if let Some(runtime) = self.workers.take() {
            runtime.shutdown_background();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::sink::test_support::MemorySink;

    struct Probe;
    impl Endpoint for Probe {}

    /// Тест проверяет, что отказ регистрации уходит в приёмник ошибок,
    /// а не вызывающему.
    #[test]
    fn test_registration_failure_goes_to_sink() {
        let router = EventRouter::new();
        let sink = Arc::new(MemorySink::default());
        router.set_error_sink(sink.clone());

        let owner = Arc::new(Probe);
        router.add_subscriber(
            "Order.Created",
            &owner,
            DeliveryMode::Async,
            BoundHandler::untyped(|_: &Probe, _| {}),
        );

        assert_eq!(router.subscriber_count("Order.Created"), 0);
        let messages = sink.messages.lock();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("registration skipped"));
    }

    /// Тест проверяет пакетную регистрацию объявлений: плохое объявление
    /// не мешает остальным.
    #[test]
    fn test_declaration_batch_is_best_effort() {
        let router = EventRouter::new();
        let sink = Arc::new(MemorySink::default());
        router.set_error_sink(sink.clone());

        let owner = Arc::new(Probe);
        router.register(
            &owner,
            [
                Declaration::Publisher {
                    topic: "Order.Created".into(),
                    scope: EventScope::Global,
                },
                Declaration::Subscriber {
                    topic: "Order.*".into(),
                    mode: DeliveryMode::Async,
                    // нетипизированный Async — мягкий отказ
                    handler: BoundHandler::untyped(|_: &Probe, _| {}),
                },
                Declaration::Subscriber {
                    topic: "Order.Created".into(),
                    mode: DeliveryMode::Sync,
                    handler: BoundHandler::untyped(|_: &Probe, _| {}),
                },
            ],
        );

        assert_eq!(router.publisher_count("Order.Created"), 1);
        assert_eq!(router.subscriber_count("Order.Created"), 1);
        assert_eq!(router.subscriber_count("Order.*"), 0);
        assert_eq!(sink.messages.lock().len(), 1);
    }

    /// Тест проверяет выключатель.
    #[test]
    fn test_enabled_toggle() {
        let router = EventRouter::new();
        assert!(router.is_enabled());
        router.set_enabled(false);
        assert!(!router.is_enabled());
        router.set_enabled(true);
        assert!(router.is_enabled());
    }

    /// Тест проверяет, что конфигурация с `enabled = false` стартует
    /// выключенной.
    #[test]
    fn test_config_initial_enabled_state() {
        let config = RouterConfig {
            enabled: false,
            ..RouterConfig::default()
        };
        let router = EventRouter::with_config(config);
        assert!(!router.is_enabled());
    }
}
