//! Typed service lookup passed to modules during init
//!
//! The engine hands a [`Services`] value to every module's `init` hook so
//! modules can pull external dependencies (database pools, API clients,
//! shared caches) without the engine knowing their shape. Services are
//! keyed by type; one instance per type.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Opaque service container keyed by type.
#[derive(Clone, Default)]
pub struct Services {
    entries: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service instance, replacing any previous one of the same type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, service: T) {
        self.entries.insert(TypeId::of::<T>(), Arc::new(service));
    }

    /// Register an already-shared service instance.
    pub fn insert_arc<T: Send + Sync + 'static>(&mut self, service: Arc<T>) {
        self.entries.insert(TypeId::of::<T>(), service);
    }

    /// Look up a service by type.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.entries
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|entry| entry.downcast::<T>().ok())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("len", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakePool {
        dsn: String,
    }

    #[test]
    fn test_insert_and_get() {
        let mut services = Services::new();
        services.insert(FakePool {
            dsn: "postgres://localhost".to_string(),
        });

        let pool = services.get::<FakePool>().expect("service registered");
        assert_eq!(pool.dsn, "postgres://localhost");
    }

    #[test]
    fn test_get_missing_returns_none() {
        let services = Services::new();
        assert!(services.get::<FakePool>().is_none());
    }

    #[test]
    fn test_insert_replaces_same_type() {
        let mut services = Services::new();
        services.insert(FakePool {
            dsn: "first".to_string(),
        });
        services.insert(FakePool {
            dsn: "second".to_string(),
        });

        assert_eq!(services.len(), 1);
        assert_eq!(services.get::<FakePool>().unwrap().dsn, "second");
    }

    #[test]
    fn test_insert_arc_shares_instance() {
        let mut services = Services::new();
        let shared = Arc::new(FakePool {
            dsn: "shared".to_string(),
        });
        services.insert_arc(shared.clone());

        let got = services.get::<FakePool>().unwrap();
        assert!(Arc::ptr_eq(&shared, &got));
    }
}
