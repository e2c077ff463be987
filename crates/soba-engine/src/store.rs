//! Static data and singleton store
//!
//! Class-level state shared by every instantiation in one runtime. Both
//! tables live as long as the runtime; nothing is evicted.

use std::sync::Arc;
use std::thread::{self, ThreadId};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::class::ClassId;
use crate::error::{EngineError, EngineResult};
use crate::instance::Instance;
use crate::namespace::Namespace;

/// Singleton slot of one class
#[derive(Debug, Clone)]
enum SingletonSlot {
    /// Claimed by an instance whose construction has not finished
    Pending(Instance),
    /// Fully constructed singleton
    Ready(Instance),
}

/// Per-class static data and singleton slots
#[derive(Debug, Default)]
pub struct StaticStore {
    statics: Mutex<FxHashMap<ClassId, Arc<OnceCell<Namespace>>>>,
    /// Static entries being computed, with the computing thread
    computing: Mutex<FxHashSet<(ClassId, ThreadId)>>,
    singletons: Mutex<FxHashMap<ClassId, SingletonSlot>>,
}

/// Removes a `computing` entry when the computation ends, also on panic
struct ComputeGuard<'a> {
    computing: &'a Mutex<FxHashSet<(ClassId, ThreadId)>>,
    key: (ClassId, ThreadId),
}

impl Drop for ComputeGuard<'_> {
    fn drop(&mut self) {
        self.computing.lock().remove(&self.key);
    }
}

impl StaticStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Static data of `id`, computing it on first use.
    ///
    /// `compute` runs at most once per identity, also when several threads
    /// ask at the same time. A failing `compute` leaves the entry empty, so
    /// a later call tries again.
    ///
    /// `compute` must not ask for the static data of `id` again, directly
    /// or through an instantiation. Such a nested call fails with
    /// [`EngineError::ReentrantStatic`] instead of waiting on itself.
    pub fn get_or_compute_static<F, E>(&self, id: &ClassId, compute: F) -> Result<Namespace, E>
    where
        F: FnOnce() -> Result<Namespace, E>,
        E: From<EngineError>,
    {
        // The map lock only covers slot lookup; `compute` runs outside it
        let cell = {
            let mut statics = self.statics.lock();
            statics
                .entry(id.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };
        if let Some(data) = cell.get() {
            return Ok(data.clone());
        }

        let key = (id.clone(), thread::current().id());
        if !self.computing.lock().insert(key.clone()) {
            return Err(EngineError::ReentrantStatic(id.clone()).into());
        }
        let _guard = ComputeGuard {
            computing: &self.computing,
            key,
        };

        cell.get_or_try_init(|| {
            let data = compute()?;
            tracing::debug!(class = %id, members = data.len(), "store: static data computed");
            Ok(data)
        })
        .cloned()
    }

    /// Static data of `id`, if already computed
    pub fn get_static(&self, id: &ClassId) -> Option<Namespace> {
        let statics = self.statics.lock();
        statics.get(id).and_then(|cell| cell.get().cloned())
    }

    /// Number of computed static entries
    pub fn static_count(&self) -> usize {
        let statics = self.statics.lock();
        statics.values().filter(|cell| cell.get().is_some()).count()
    }

    /// Register a constructed instance as the singleton of `id`
    pub fn register_singleton(&self, id: &ClassId, instance: Instance) -> EngineResult<()> {
        let mut singletons = self.singletons.lock();
        if singletons.contains_key(id) {
            return Err(EngineError::DuplicateSingleton(id.clone()));
        }
        tracing::debug!(class = %id, instance = instance.id(), "store: singleton registered");
        singletons.insert(id.clone(), SingletonSlot::Ready(instance));
        Ok(())
    }

    /// Registered singleton of `id`, once its construction has finished
    pub fn get_singleton(&self, id: &ClassId) -> Option<Instance> {
        match self.singletons.lock().get(id) {
            Some(SingletonSlot::Ready(instance)) => Some(instance.clone()),
            _ => None,
        }
    }

    /// Existing singleton of `id`, or `None` after claiming the slot for
    /// `instance`.
    ///
    /// A claimed slot holds `instance` as pending until
    /// [`complete_singleton`](Self::complete_singleton) marks it ready.
    /// While it is pending every other claim fails with
    /// [`EngineError::SingletonUnderConstruction`].
    pub fn get_or_register_singleton(
        &self,
        id: &ClassId,
        instance: Instance,
    ) -> EngineResult<Option<Instance>> {
        let mut singletons = self.singletons.lock();
        match singletons.get(id) {
            Some(SingletonSlot::Ready(existing)) => Ok(Some(existing.clone())),
            Some(SingletonSlot::Pending(_)) => {
                Err(EngineError::SingletonUnderConstruction(id.clone()))
            }
            None => {
                tracing::debug!(class = %id, instance = instance.id(), "store: singleton slot claimed");
                singletons.insert(id.clone(), SingletonSlot::Pending(instance));
                Ok(None)
            }
        }
    }

    /// Mark the pending singleton of `id` as ready if `instance` holds it
    pub fn complete_singleton(&self, id: &ClassId, instance: &Instance) -> bool {
        let mut singletons = self.singletons.lock();
        match singletons.get(id) {
            Some(SingletonSlot::Pending(pending)) if pending.ptr_eq(instance) => {
                tracing::debug!(class = %id, instance = instance.id(), "store: singleton registered");
                singletons.insert(id.clone(), SingletonSlot::Ready(instance.clone()));
                true
            }
            _ => false,
        }
    }

    /// Free the slot of `id` if `instance` claimed it and never finished
    pub fn release_singleton(&self, id: &ClassId, instance: &Instance) -> bool {
        let mut singletons = self.singletons.lock();
        match singletons.get(id) {
            Some(SingletonSlot::Pending(pending)) if pending.ptr_eq(instance) => {
                tracing::debug!(class = %id, instance = instance.id(), "store: singleton slot released");
                singletons.remove(id);
                true
            }
            _ => false,
        }
    }

    /// Number of ready singletons
    pub fn singleton_count(&self) -> usize {
        self.singletons
            .lock()
            .values()
            .filter(|slot| matches!(slot, SingletonSlot::Ready(_)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use crate::class::ClassDefinition;
    use crate::runtime::Runtime;
    use crate::value::{Attributes, Value};

    #[test]
    fn test_static_computed_once() {
        let store = StaticStore::new();
        let id = ClassId::new("counter", 1);
        let calls = AtomicUsize::new(0);

        for _ in 0..5 {
            let data = store
                .get_or_compute_static(&id, || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    let ns = Namespace::new();
                    ns.set("total", 0)?;
                    Ok::<_, EngineError>(ns)
                })
                .unwrap();
            assert_eq!(data.get("total"), Some(Value::Int(0)));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.static_count(), 1);
    }

    #[test]
    fn test_static_is_shared() {
        let store = StaticStore::new();
        let id = ClassId::new("shared", 1);

        let first = store
            .get_or_compute_static(&id, || Ok::<_, EngineError>(Namespace::new()))
            .unwrap();
        first.set("hits", 1).unwrap();

        let second = store.get_static(&id).unwrap();
        assert!(first.ptr_eq(&second));
        assert_eq!(second.get("hits"), Some(Value::Int(1)));
    }

    #[test]
    fn test_failed_compute_is_retried() {
        let store = StaticStore::new();
        let id = ClassId::new("flaky", 1);

        let err = store.get_or_compute_static(&id, || {
            Err::<Namespace, _>(EngineError::Validation("not yet".to_string()))
        });
        assert!(err.unwrap_err().to_string().contains("not yet"));
        assert!(store.get_static(&id).is_none());

        let ok = store.get_or_compute_static(&id, || Ok::<_, EngineError>(Namespace::new()));
        assert!(ok.is_ok());
        assert_eq!(store.static_count(), 1);
    }

    #[test]
    fn test_static_computed_once_across_threads() {
        let store = Arc::new(StaticStore::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let id = ClassId::new("contended", 1);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let calls = calls.clone();
                let id = id.clone();
                thread::spawn(move || {
                    store
                        .get_or_compute_static(&id, || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::yield_now();
                            Ok::<_, EngineError>(Namespace::new())
                        })
                        .unwrap()
                })
            })
            .collect();

        let spaces: Vec<Namespace> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(spaces.windows(2).all(|pair| pair[0].ptr_eq(&pair[1])));
    }

    #[test]
    fn test_singleton_registration() {
        let runtime = Runtime::bare();
        let description = runtime.define(ClassDefinition::new("only", 1)).unwrap();
        let first = runtime
            .instantiate(description.id(), Attributes::new())
            .unwrap();
        let second = runtime
            .instantiate(description.id(), Attributes::new())
            .unwrap();

        let store = StaticStore::new();
        assert!(store.get_singleton(description.id()).is_none());
        store
            .register_singleton(description.id(), first.clone())
            .unwrap();
        assert_eq!(store.get_singleton(description.id()), Some(first.clone()));

        let err = store
            .register_singleton(description.id(), second.clone())
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateSingleton(_)));
        assert_eq!(store.singleton_count(), 1);

        let existing = store
            .get_or_register_singleton(description.id(), second)
            .unwrap();
        assert_eq!(existing, Some(first));
    }

    #[test]
    fn test_pending_singleton_lifecycle() {
        let runtime = Runtime::bare();
        let description = runtime.define(ClassDefinition::new("lazy", 1)).unwrap();
        let id = description.id();
        let first = runtime.instantiate(id, Attributes::new()).unwrap();
        let second = runtime.instantiate(id, Attributes::new()).unwrap();

        let store = StaticStore::new();
        assert_eq!(store.get_or_register_singleton(id, first.clone()).unwrap(), None);
        assert!(store.get_singleton(id).is_none());
        assert_eq!(store.singleton_count(), 0);

        let err = store
            .get_or_register_singleton(id, second.clone())
            .unwrap_err();
        assert!(matches!(err, EngineError::SingletonUnderConstruction(_)));

        // Only the claiming instance may finish or release the slot
        assert!(!store.complete_singleton(id, &second));
        assert!(!store.release_singleton(id, &second));
        assert!(store.release_singleton(id, &first));

        assert_eq!(store.get_or_register_singleton(id, second.clone()).unwrap(), None);
        assert!(store.complete_singleton(id, &second));
        assert_eq!(store.get_singleton(id), Some(second.clone()));
        assert!(!store.release_singleton(id, &second));
        assert_eq!(
            store.get_or_register_singleton(id, first).unwrap(),
            Some(second)
        );
    }

    #[test]
    fn test_reentrant_static_fails_instead_of_blocking() {
        let store = StaticStore::new();
        let id = ClassId::new("recursive", 1);

        let data = store
            .get_or_compute_static(&id, || {
                let nested = store.get_or_compute_static(&id, || Ok::<_, EngineError>(Namespace::new()));
                assert!(matches!(nested, Err(EngineError::ReentrantStatic(_))));
                let ns = Namespace::new();
                ns.set("depth", 1)?;
                Ok::<_, EngineError>(ns)
            })
            .unwrap();

        assert_eq!(data.get("depth"), Some(Value::Int(1)));
        // The entry is usable again once the outer computation is done
        assert!(store
            .get_or_compute_static(&id, || Ok::<_, EngineError>(Namespace::new()))
            .unwrap()
            .ptr_eq(&data));
    }
}
