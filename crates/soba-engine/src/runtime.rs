//! Runtime: the registry, the store and the two public operations
//!
//! A [`Runtime`] owns every piece of class-level state. It is `Send + Sync`;
//! locks are only held for lookups and the final insert, never while an
//! extension callback runs, so callbacks may call back into the runtime.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::builtins;
use crate::class::{ClassDefinition, ClassDescription, ClassHandle, ClassId};
use crate::error::{EngineError, EngineResult};
use crate::extension::merge_extensions;
use crate::instance::Instance;
use crate::options::RuntimeOptions;
use crate::pipeline::InstancePipeline;
use crate::registry::{linearize, ClassRegistry};
use crate::store::StaticStore;
use crate::value::Attributes;

/// Class registry, static store and options of one engine
#[derive(Debug)]
pub struct Runtime {
    /// Class registry (read on every instantiation, written on `define`)
    registry: RwLock<ClassRegistry>,

    /// Static data and singletons
    store: StaticStore,

    options: RuntimeOptions,
}

impl Runtime {
    /// Create a runtime with default options and the built-in classes
    pub fn new() -> EngineResult<Self> {
        Self::with_options(RuntimeOptions::default())
    }

    /// Create a runtime with no classes registered
    pub fn bare() -> Self {
        Self::empty(RuntimeOptions::default().with_builtins(false))
    }

    /// Create a runtime from options
    pub fn with_options(options: RuntimeOptions) -> EngineResult<Self> {
        let runtime = Self::empty(options);
        if runtime.options.builtins {
            builtins::register(&runtime)?;
        }
        Ok(runtime)
    }

    fn empty(options: RuntimeOptions) -> Self {
        Self {
            registry: RwLock::new(ClassRegistry::new()),
            store: StaticStore::new(),
            options,
        }
    }

    /// Options this runtime was created with
    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    /// Static data and singleton store
    pub fn store(&self) -> &StaticStore {
        &self.store
    }

    /// Register a class.
    ///
    /// Validates the definition, resolves its inheritance chain, merges the
    /// extensions of every represented class and applies their `store`
    /// transforms to the matching attributes. A failed `define` leaves the
    /// registry unchanged.
    pub fn define(&self, definition: ClassDefinition) -> EngineResult<Arc<ClassDescription>> {
        definition.validate()?;
        let ClassDefinition {
            id,
            inherits,
            extensions,
            mut attributes,
        } = definition;

        let (ancestors, merged) = {
            let registry = self.registry.read();
            if registry.contains(&id) {
                return Err(EngineError::DuplicateClass(id));
            }
            for parent in &inherits {
                if !registry.contains(parent) {
                    return Err(EngineError::UnknownParent {
                        class: id.clone(),
                        parent: parent.clone(),
                    });
                }
            }

            let order = linearize(&id, |class| {
                if *class == id {
                    Some(inherits.clone())
                } else {
                    registry
                        .get(class)
                        .map(|description| description.inherits_from().to_vec())
                }
            })?;

            // The class itself is last in the linearization
            let ancestors: Vec<Arc<ClassDescription>> = order[..order.len().saturating_sub(1)]
                .iter()
                .filter_map(|class| registry.get(class).cloned())
                .collect();

            let merged = merge_extensions(
                &id,
                ancestors
                    .iter()
                    .map(|description| (description.id(), description.own_extensions()))
                    .chain(std::iter::once((&id, extensions.as_slice()))),
            )?;

            (ancestors, merged)
        };

        let mut stored = Attributes::new();
        for ext in &merged {
            let Some(store) = ext.store() else {
                continue;
            };
            if let Some(raw) = attributes.remove(ext.name()) {
                let value = store(raw).map_err(|e| {
                    EngineError::Validation(format!(
                        "Attribute '{}' of class {} rejected: {:#}",
                        ext.name(),
                        id,
                        e
                    ))
                })?;
                stored.insert(ext.name().to_string(), value);
            }
        }

        if !attributes.is_empty() {
            let unclaimed: Vec<&str> = attributes.keys().map(String::as_str).collect();
            if self.options.strict_attributes {
                return Err(EngineError::Validation(format!(
                    "Class {} has attributes no extension stores: {}",
                    id,
                    unclaimed.join(", ")
                )));
            }
            tracing::warn!(class = %id, attributes = ?unclaimed, "runtime: dropping unclaimed attributes");
        }

        let description = {
            let mut registry = self.registry.write();
            // Another define may have won the race since the read lock was released
            if registry.contains(&id) {
                return Err(EngineError::DuplicateClass(id));
            }

            let handle = registry.next_handle();
            let mut represented: Vec<ClassHandle> =
                ancestors.iter().map(|description| description.handle()).collect();
            represented.push(handle);

            let description = Arc::new(ClassDescription::new(
                id, handle, inherits, extensions, represented, merged, stored,
            ));
            registry.insert(description.clone());
            description
        };

        tracing::debug!(
            class = %description.id(),
            represented = description.represented_handles().len(),
            extensions = description.extensions().len(),
            "runtime: class defined"
        );
        Ok(description)
    }

    /// Look up a registered class
    pub fn resolve(&self, id: &ClassId) -> EngineResult<Arc<ClassDescription>> {
        self.registry
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(id.clone()))
    }

    /// Look up a registered class by its `name:version` key
    pub fn resolve_key(&self, key: &str) -> EngineResult<Arc<ClassDescription>> {
        let id: ClassId = key.parse()?;
        self.resolve(&id)
    }

    /// Linearized inheritance chain of a registered class, itself last
    pub fn linearize(&self, id: &ClassId) -> EngineResult<Vec<ClassId>> {
        self.registry.read().linearize(id)
    }

    /// Represented classes of a registered class, ancestors first
    pub fn represented_classes(&self, id: &ClassId) -> EngineResult<Vec<Arc<ClassDescription>>> {
        let registry = self.registry.read();
        let description = registry
            .get(id)
            .ok_or_else(|| EngineError::NotFound(id.clone()))?;
        Ok(registry.represented(description))
    }

    /// Whether `ancestor` is one of `child`'s represented classes
    pub fn is_subclass_of(&self, child: &ClassId, ancestor: &ClassId) -> bool {
        self.registry.read().is_subclass_of(child, ancestor)
    }

    /// Number of registered classes
    pub fn class_count(&self) -> usize {
        self.registry.read().len()
    }

    /// Registered identities in registration order
    pub fn classes(&self) -> Vec<ClassId> {
        self.registry
            .read()
            .iter()
            .map(|description| description.id().clone())
            .collect()
    }

    /// Build an instance of a registered class
    pub fn instantiate(&self, id: &ClassId, initial_values: Attributes) -> EngineResult<Instance> {
        let (class, represented) = {
            let registry = self.registry.read();
            let class = registry
                .get(id)
                .cloned()
                .ok_or_else(|| EngineError::NotFound(id.clone()))?;
            let represented = registry.represented(&class);
            (class, represented)
        };

        InstancePipeline::new(self, class, represented).run(initial_values)
    }
}
