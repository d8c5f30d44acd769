//! Реестр тем.
//!
//! Процессное отображение канонический-ключ → запись темы плюс вторичный
//! индекс по записям с подстановкой — издатель при публикации обходит
//! только его, а не весь реестр. Записи создаются лениво и не удаляются
//! до конца процесса.

use std::sync::Arc;

use dashmap::DashMap;

use crate::{
    error::RouterError,
    router::{
        descriptor::{
            BoundHandler, DeliveryMode, EventScope, OwnerRef, PublisherDescriptor,
            SubscriberDescriptor,
        },
        endpoint::Endpoint,
        entry::TopicEntry,
    },
    topic::normalize,
};

pub(crate) struct TopicRegistry {
    /// Все темы по каноническому ключу.
    topics: DashMap<Arc<str>, Arc<TopicEntry>>,
    /// Темы, чей ключ содержит подстановку; заполняется при регистрации
    /// wildcard-подписчика.
    wildcards: DashMap<Arc<str>, Arc<TopicEntry>>,
}

impl TopicRegistry {
    pub(crate) fn new() -> Self {
        Self {
            topics: DashMap::new(),
            wildcards: DashMap::new(),
        }
    }

    /// Возвращает запись темы, создавая пустую при первом обращении.
    pub(crate) fn find_or_create(&self, topic: &str) -> Arc<TopicEntry> {
        let key: Arc<str> = Arc::from(normalize(topic));
        self.topics
            .entry(key.clone())
            .or_insert_with(|| Arc::new(TopicEntry::new(key)))
            .clone()
    }

    /// Поиск без создания.
    pub(crate) fn find(&self, topic: &str) -> Option<Arc<TopicEntry>> {
        self.topics
            .get(normalize(topic).as_str())
            .map(|entry| entry.value().clone())
    }

    /// Регистрирует издателя темы.
    ///
    /// Пустая тема — тихий no-op.
    pub(crate) fn add_publisher(&self, topic: &str, scope: EventScope, owner: &Arc<dyn Endpoint>) {
        if topic.trim().is_empty() {
            return;
        }
        let entry = self.find_or_create(topic);
        entry.add_publisher(PublisherDescriptor::new(topic, scope, owner));
        tracing::debug!(topic = %entry.key(), ?scope, "publisher registered");
    }

    /// Регистрирует подписчика темы.
    ///
    /// Порядок проверок:
    /// 1. пустая тема — тихий no-op;
    /// 2. статический обработчик на уже существующую запись — тихий no-op
    ///    (первый статический подписчик темы остаётся единственным);
    /// 3. режим `Async` без типизированной нагрузки — мягкий отказ;
    /// 4. wildcard-шаблон компилируется, запись попадает в индекс.
    pub(crate) fn add_subscriber(
        &self,
        topic: &str,
        owner: OwnerRef,
        mode: DeliveryMode,
        handler: BoundHandler,
    ) -> Result<(), RouterError> {
        if topic.trim().is_empty() {
            return Ok(());
        }

        if matches!(owner, OwnerRef::Static) && self.find(topic).is_some() {
            tracing::debug!(topic, "static subscription ignored: topic entry already exists");
            return Ok(());
        }

        if mode == DeliveryMode::Async && handler.payload_type().is_none() {
            return Err(RouterError::UntypedAsyncHandler {
                topic: normalize(topic),
            });
        }

        let descriptor = SubscriberDescriptor::new(topic, owner, mode, handler);
        let entry = self.find_or_create(topic);

        if descriptor.has_wildcard() {
            entry.ensure_matcher()?;
            self.wildcards.insert(entry.key().clone(), entry.clone());
        }

        tracing::debug!(pattern = descriptor.pattern(), ?mode, "subscriber registered");
        entry.add_subscriber(descriptor);
        Ok(())
    }

    /// Снимает первый по порядку дескриптор издателя владельца в теме.
    pub(crate) fn remove_publisher(&self, topic: &str, owner: &Arc<dyn Endpoint>) {
        if let Some(entry) = self.find(topic) {
            entry.remove_publisher_of(owner);
        }
    }

    /// Снимает первый по порядку дескриптор подписчика владельца в теме.
    pub(crate) fn remove_subscriber(&self, topic: &str, owner: &Arc<dyn Endpoint>) {
        if let Some(entry) = self.find(topic) {
            entry.remove_subscriber_of(owner);
        }
    }

    /// Снимает все регистрации владельца во всех темах. Идемпотентно.
    ///
    /// Мутация каждого списка идёт под его мьютексом; раздача событий
    /// работает по снимкам и не наблюдает список посреди фильтрации.
    pub(crate) fn unregister(&self, owner: &Arc<dyn Endpoint>) {
        for entry in self.topics.iter() {
            entry.value().drop_descriptors_of(owner);
        }
        for entry in self.wildcards.iter() {
            entry.value().drop_descriptors_of(owner);
        }
    }

    /// Снимок wildcard-индекса для публикации.
    ///
    /// Порядок обхода между темами не специфицирован; порядок внутри
    /// одной темы — порядок регистрации подписчиков.
    pub(crate) fn wildcard_entries(&self) -> Vec<Arc<TopicEntry>> {
        self.wildcards
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub(crate) fn topic_count(&self) -> usize {
        self.topics.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe;
    impl Endpoint for Probe {}

    fn noop() -> BoundHandler {
        BoundHandler::static_untyped(|_| {})
    }

    fn typed_noop() -> BoundHandler {
        BoundHandler::static_typed(|_, _: &crate::router::DataEvent<u32>| {})
    }

    /// Тест проверяет ленивость создания и единственность записи.
    #[test]
    fn test_find_or_create_is_lazy_and_shared() {
        let registry = TopicRegistry::new();
        assert!(registry.find("Order.Created").is_none());

        let a = registry.find_or_create("Order.Created");
        // регистронезависимость: та же запись
        let b = registry.find_or_create("order.CREATED");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.topic_count(), 1);
    }

    /// Тест проверяет, что запись переживает удаление всех дескрипторов.
    #[test]
    fn test_entry_survives_emptying() {
        let registry = TopicRegistry::new();
        let owner: Arc<dyn Endpoint> = Arc::new(Probe);

        registry.add_publisher("Order.Created", EventScope::Global, &owner);
        registry.remove_publisher("Order.Created", &owner);

        let entry = registry.find("Order.Created").expect("entry must survive");
        assert_eq!(entry.publisher_count(), 0);
    }

    /// Тест проверяет, что wildcard-подписка компилирует матчер и
    /// попадает во вторичный индекс, а точная — нет.
    #[test]
    fn test_wildcard_index_population() {
        let registry = TopicRegistry::new();
        let owner: Arc<dyn Endpoint> = Arc::new(Probe);

        registry
            .add_subscriber(
                "Order.*",
                OwnerRef::instance(&owner),
                DeliveryMode::Sync,
                noop(),
            )
            .unwrap();
        registry
            .add_subscriber(
                "Order.Created",
                OwnerRef::instance(&owner),
                DeliveryMode::Sync,
                noop(),
            )
            .unwrap();

        let wildcards = registry.wildcard_entries();
        assert_eq!(wildcards.len(), 1);
        assert_eq!(&**wildcards[0].key(), "ORDER.*");
        assert!(wildcards[0].matcher().is_some());
    }

    /// Тест проверяет мягкий отказ фоновой подписки без типизированной
    /// нагрузки: дескриптор не сохраняется.
    #[test]
    fn test_async_requires_typed_payload() {
        let registry = TopicRegistry::new();
        let owner: Arc<dyn Endpoint> = Arc::new(Probe);

        let err = registry
            .add_subscriber(
                "Order.Created",
                OwnerRef::instance(&owner),
                DeliveryMode::Async,
                noop(),
            )
            .unwrap_err();
        assert!(matches!(err, RouterError::UntypedAsyncHandler { .. }));
        // типизированный обработчик проходит
        registry
            .add_subscriber(
                "Order.Created",
                OwnerRef::instance(&owner),
                DeliveryMode::Async,
                typed_noop(),
            )
            .unwrap();
        let entry = registry.find("Order.Created").unwrap();
        assert_eq!(entry.subscriber_count(), 1);
    }

    /// Тест проверяет правило одиночки для статических подписчиков:
    /// существующая запись темы блокирует новую статическую регистрацию.
    #[test]
    fn test_static_singleton_rule() {
        let registry = TopicRegistry::new();

        registry
            .add_subscriber("Order.Created", OwnerRef::Static, DeliveryMode::Sync, noop())
            .unwrap();
        // запись уже существует — вторая статическая регистрация игнорируется
        registry
            .add_subscriber("Order.Created", OwnerRef::Static, DeliveryMode::Sync, noop())
            .unwrap();

        let entry = registry.find("Order.Created").unwrap();
        assert_eq!(entry.subscriber_count(), 1);
    }

    /// Тест проверяет, что unregister снимает обе роли во всех темах
    /// и идемпотентен.
    #[test]
    fn test_unregister_is_idempotent() {
        let registry = TopicRegistry::new();
        let owner: Arc<dyn Endpoint> = Arc::new(Probe);

        registry.add_publisher("Order.Created", EventScope::Global, &owner);
        registry
            .add_subscriber(
                "Order.*",
                OwnerRef::instance(&owner),
                DeliveryMode::Sync,
                noop(),
            )
            .unwrap();

        registry.unregister(&owner);
        assert_eq!(
            registry.find("Order.Created").unwrap().publisher_count(),
            0
        );
        assert_eq!(registry.find("Order.*").unwrap().subscriber_count(), 0);

        // повторный вызов — no-op без ошибок
        registry.unregister(&owner);
    }

    /// Тест проверяет, что пустая тема — тихий no-op для обеих ролей.
    #[test]
    fn test_empty_topic_is_noop() {
        let registry = TopicRegistry::new();
        let owner: Arc<dyn Endpoint> = Arc::new(Probe);

        registry.add_publisher("", EventScope::Global, &owner);
        registry
            .add_subscriber("  ", OwnerRef::instance(&owner), DeliveryMode::Sync, noop())
            .unwrap();
        assert_eq!(registry.topic_count(), 0);
    }
}
