//! Запись реестра для одной темы.
//!
//! Запись создаётся лениво при первой регистрации и живёт до конца
//! процесса, даже когда оба списка дескрипторов опустели. Списки
//! защищены мьютексом записи; раздача события идёт по снимку списка,
//! снятому под тем же мьютексом, который защищает мутации.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::{
    error::RouterError,
    router::descriptor::{PublisherDescriptor, SubscriberDescriptor},
    topic::TopicPattern,
};

/// Состояние одной темы: издатели, подписчики и (для wildcard-тем)
/// скомпилированный матчер. Список подписчиков и есть multicast-обработчик
/// темы.
pub struct TopicEntry {
    key: Arc<str>,
    publishers: Mutex<Vec<PublisherDescriptor>>,
    subscribers: Mutex<Vec<SubscriberDescriptor>>,
    matcher: OnceCell<TopicPattern>,
}

impl TopicEntry {
    pub(crate) fn new(key: Arc<str>) -> Self {
        Self {
            key,
            publishers: Mutex::new(Vec::new()),
            subscribers: Mutex::new(Vec::new()),
            matcher: OnceCell::new(),
        }
    }

    /// Канонический ключ темы.
    pub fn key(&self) -> &Arc<str> {
        &self.key
    }

    pub(crate) fn add_publisher(&self, descriptor: PublisherDescriptor) {
        self.publishers.lock().push(descriptor);
    }

    pub(crate) fn add_subscriber(&self, descriptor: SubscriberDescriptor) {
        self.subscribers.lock().push(descriptor);
    }

    /// Первый дескриптор издателя — "объявленный издатель" раздачи.
    pub(crate) fn first_publisher(&self) -> Option<PublisherDescriptor> {
        self.publishers.lock().first().cloned()
    }

    /// Снимок списка подписчиков для раздачи: мутации никогда не
    /// наблюдаются посреди итерации.
    pub(crate) fn snapshot_subscribers(&self) -> Vec<SubscriberDescriptor> {
        self.subscribers.lock().clone()
    }

    /// Удаляет первый по порядку дескриптор издателя данного владельца.
    pub(crate) fn remove_publisher_of(&self, owner: &Arc<dyn crate::router::Endpoint>) -> bool {
        let mut publishers = self.publishers.lock();
        match publishers.iter().position(|d| d.is_owned_by(owner)) {
            Some(pos) => {
                publishers.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Удаляет первый по порядку дескриптор подписчика данного владельца.
    pub(crate) fn remove_subscriber_of(&self, owner: &Arc<dyn crate::router::Endpoint>) -> bool {
        let mut subscribers = self.subscribers.lock();
        match subscribers.iter().position(|d| d.is_owned_by(owner)) {
            Some(pos) => {
                subscribers.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Удаляет все дескрипторы владельца (обе роли).
    pub(crate) fn drop_descriptors_of(&self, owner: &Arc<dyn crate::router::Endpoint>) {
        self.publishers.lock().retain(|d| !d.is_owned_by(owner));
        self.subscribers.lock().retain(|d| !d.is_owned_by(owner));
    }

    /// Убирает мёртвый дескриптор, найденный при раздаче.
    pub(crate) fn prune_subscriber(&self, id: u64) {
        self.subscribers.lock().retain(|d| d.id() != id);
    }

    /// Компилирует матчер ключа (однократно) и возвращает его.
    pub(crate) fn ensure_matcher(&self) -> Result<&TopicPattern, RouterError> {
        self.matcher.get_or_try_init(|| TopicPattern::compile(&self.key))
    }

    pub(crate) fn matcher(&self) -> Option<&TopicPattern> {
        self.matcher.get()
    }

    pub fn publisher_count(&self) -> usize {
        self.publishers.lock().len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
