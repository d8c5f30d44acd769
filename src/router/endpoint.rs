//! Владельцы подписок и публикаций.
//!
//! Реестр никогда не удерживает владельца сильной ссылкой: дескрипторы
//! хранят `Weak<dyn Endpoint>`, а живость проверяется в момент
//! использования. Обычное освобождение объекта снимает его подписки без
//! явного teardown.

use std::{
    any::Any,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

/// Идентификатор модуля развёртывания.
///
/// Граница аудитории для публикаций со scope `Restricted`: событие
/// доходит только до подписчиков, чей владелец принадлежит тому же
/// модулю, что и издатель. Сравнивается по значению-идентичности,
/// а не по строке.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitId(u64);

impl UnitId {
    /// Модуль по умолчанию для владельцев, не объявивших свой.
    pub const DEFAULT: UnitId = UnitId(0);

    /// Выделяет новый уникальный идентификатор модуля.
    pub fn allocate() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        UnitId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for UnitId {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Контекст исполнения с привязкой.
///
/// Точка расширения для владельцев, чьи обработчики должны выполняться
/// на конкретном потоке (например, UI). Фоновая доставка маршалирует
/// вызов сюда вместо произвольного рабочего потока.
pub trait DispatchContext: Send + Sync {
    /// Выполняет задачу на контексте владельца.
    fn dispatch(&self, task: Box<dyn FnOnce() + Send>);
}

/// Объект, способный владеть публикациями и подписками.
///
/// Оба метода имеют реализации по умолчанию: обычному владельцу
/// достаточно пустого `impl Endpoint for MyType {}`.
pub trait Endpoint: Any + Send + Sync {
    /// Модуль развёртывания владельца.
    fn unit(&self) -> UnitId {
        UnitId::DEFAULT
    }

    /// Контекст исполнения, на который нужно маршалировать фоновые
    /// вызовы. `None` — произвольный рабочий поток.
    fn dispatch_context(&self) -> Option<Arc<dyn DispatchContext>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain;
    impl Endpoint for Plain {}

    /// Тест проверяет, что выделенные идентификаторы уникальны и
    /// отличаются от модуля по умолчанию.
    #[test]
    fn test_unit_id_allocation() {
        let a = UnitId::allocate();
        let b = UnitId::allocate();
        assert_ne!(a, b);
        assert_ne!(a, UnitId::DEFAULT);
        assert_eq!(UnitId::default(), UnitId::DEFAULT);
    }

    /// Тест проверяет реализации по умолчанию.
    #[test]
    fn test_endpoint_defaults() {
        let plain = Plain;
        assert_eq!(plain.unit(), UnitId::DEFAULT);
        assert!(plain.dispatch_context().is_none());
    }
}
