//! Диспетчер: разрешение темы и раздача события.
//!
//! Публикация сначала пробует точную запись (если тема без подстановки),
//! затем обходит wildcard-индекс. Раздача идёт по снимку списка
//! подписчиков; мёртвые дескрипторы при этом лениво выбрасываются из
//! живого списка. Паника обработчика гасится на границе диспетчера и
//! уходит в приёмник ошибок — до издателя она не долетает.

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::{atomic::Ordering, Arc},
};

use crate::{
    error::RouterError,
    router::{
        descriptor::{DeliveryMode, EventScope, Liveness, PublisherDescriptor, SubscriberDescriptor},
        endpoint::{Endpoint, UnitId},
        entry::TopicEntry,
        facade::EventRouter,
        payload::{Event, EventPayload},
        sink::ErrorSink,
    },
    topic::{has_wildcard, normalize},
};

/// Аудитория одной раздачи, определяется один раз на fire.
#[derive(Clone, Copy)]
enum Audience {
    /// Нет объявленного издателя либо scope `Global`.
    Everyone,
    /// Scope `Restricted`: только владельцы этого модуля.
    Unit(UnitId),
}

impl EventRouter {
    /// Публикует событие. Best-effort: вызов ничего не возвращает,
    /// сбои подписчиков наблюдаемы только через приёмник ошибок.
    pub fn publish(
        &self,
        sender: Option<Arc<dyn Any + Send + Sync>>,
        topic: &str,
        payload: Arc<dyn EventPayload>,
    ) {
        self.publish_event(Event::new(topic, sender, payload, false));
    }

    /// Входная точка для транспортного моста: событие помечается, и
    /// внешняя публикация раздаётся локально вместо повторной отправки
    /// в мост.
    pub fn publish_from_bridge(
        &self,
        sender: Option<Arc<dyn Any + Send + Sync>>,
        topic: &str,
        payload: Arc<dyn EventPayload>,
    ) {
        self.publish_event(Event::new(topic, sender, payload, true));
    }

    fn publish_event(&self, event: Event) {
        // самый дешёвый срез — проверяется первым
        if !self.is_enabled() {
            return;
        }
        self.publish_count.fetch_add(1, Ordering::Relaxed);

        // 1) точное совпадение; его первый издатель — объявленный
        //    издатель и для wildcard-раздач этой публикации
        let mut declared: Option<PublisherDescriptor> = None;
        if !has_wildcard(event.topic()) {
            if let Some(entry) = self.registry.find(event.topic()) {
                declared = entry.first_publisher();
                self.fire(&entry, declared.as_ref(), &event);
            }
        }

        // 2) обход wildcard-индекса по канонизированной теме
        let candidate = normalize(event.topic());
        for entry in self.registry.wildcard_entries() {
            if let Some(matcher) = entry.matcher() {
                if matcher.matches_normalized(&candidate) {
                    self.fire(&entry, declared.as_ref(), &event);
                }
            }
        }
    }

    /// Раздаёт событие подписчикам одной записи.
    fn fire(&self, entry: &TopicEntry, declared: Option<&PublisherDescriptor>, event: &Event) {
        let snapshot = entry.snapshot_subscribers();
        if snapshot.is_empty() {
            return;
        }

        let mut audience = Audience::Everyone;
        if let Some(publisher) = declared {
            // мёртвый издатель не может санкционировать раздачу
            let Some(owner) = publisher.owner() else {
                return;
            };
            match publisher.scope() {
                EventScope::Global => {}
                // граница модуля разрешается один раз на раздачу
                EventScope::Restricted => audience = Audience::Unit(owner.unit()),
                EventScope::External => {
                    if !event.arrived_via_bridge() {
                        match self.bridge() {
                            Some(bridge) => bridge.forward(event),
                            None => tracing::debug!(
                                topic = event.topic(),
                                "external-scope publish dropped: no bridge installed"
                            ),
                        }
                        return;
                    }
                    // событие пришло через мост — раздаём локально
                }
            }
        }

        for descriptor in &snapshot {
            let owner = match descriptor.owner_ref().liveness() {
                Liveness::Static => None,
                Liveness::Alive(owner) => Some(owner),
                Liveness::Dead => {
                    entry.prune_subscriber(descriptor.id());
                    continue;
                }
            };

            if let Audience::Unit(unit) = audience {
                // статический обработчик не принадлежит модулю —
                // ограниченная раздача его не достигает
                match owner.as_ref() {
                    Some(owner) if owner.unit() == unit => {}
                    _ => continue,
                }
            }

            self.dispatch_to(descriptor, owner, event);
        }
    }

    /// Доставляет событие одному подписчику согласно его режиму.
    fn dispatch_to(
        &self,
        descriptor: &SubscriberDescriptor,
        owner: Option<Arc<dyn Endpoint>>,
        event: &Event,
    ) {
        match descriptor.mode() {
            DeliveryMode::Sync => {
                invoke_guarded(descriptor, owner.as_ref(), event, self.error_sink().as_ref());
            }
            DeliveryMode::Async => {
                let context = owner.as_ref().and_then(|owner| owner.dispatch_context());
                let descriptor = descriptor.clone();
                let event = event.clone();
                let sink = self.error_sink();
                let task: Box<dyn FnOnce() + Send> = Box::new(move || {
                    invoke_guarded(&descriptor, owner.as_ref(), &event, sink.as_ref());
                });

                match context {
                    // владелец требует привязки к своему контексту исполнения
                    Some(context) => context.dispatch(task),
                    None => {
                        if let Some(workers) = self.workers() {
                            let _ = workers.spawn_blocking(task);
                        }
                    }
                }
            }
        }
    }
}

/// Вызов обработчика под барьером паники. Любой исход, кроме успешного,
/// уходит в приёмник; раздача продолжается со следующего подписчика.
fn invoke_guarded(
    descriptor: &SubscriberDescriptor,
    owner: Option<&Arc<dyn Endpoint>>,
    event: &Event,
    sink: &dyn ErrorSink,
) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        descriptor.handler().invoke(owner, event)
    }));
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(err)) => sink.log_error("subscriber delivery skipped", Some(&err)),
        Err(payload) => {
            let err = RouterError::HandlerPanic {
                topic: event.topic().to_string(),
                reason: panic_reason(payload.as_ref()),
            };
            sink.log_error("subscriber handler panicked", Some(&err));
        }
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
