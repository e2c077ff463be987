//! Shared construction context

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::class::ClassDescription;
use crate::error::{EngineError, EngineResult};
use crate::extension::Contribution;
use crate::instance::Instance;
use crate::namespace::Namespace;
use crate::runtime::Runtime;
use crate::value::{Attributes, Value};

/// Key holding the instantiated class description
pub const CLASS_DESCRIPTION_KEY: &str = "classDescription";
/// Key holding the instance under construction
pub const SELF_KEY: &str = "self";
/// Key holding the caller-supplied initial values
pub const INITIAL_VALUES_KEY: &str = "initialValues";

/// Write-once key/value space of one instantiation.
///
/// Seeded with [`CLASS_DESCRIPTION_KEY`], [`SELF_KEY`] and
/// [`INITIAL_VALUES_KEY`]. Callbacks only read it; the pipeline merges the
/// contributions they return, and a key can be written once.
pub struct SharedContext<'a> {
    runtime: &'a Runtime,
    class: Arc<ClassDescription>,
    represented: &'a [Arc<ClassDescription>],
    instance: Instance,
    initial_values: Attributes,
    entries: FxHashMap<String, Value>,
}

impl<'a> SharedContext<'a> {
    pub(crate) fn new(
        runtime: &'a Runtime,
        class: Arc<ClassDescription>,
        represented: &'a [Arc<ClassDescription>],
        instance: Instance,
        initial_values: Attributes,
    ) -> Self {
        let mut entries = FxHashMap::default();
        entries.insert(CLASS_DESCRIPTION_KEY.to_string(), Value::Class(class.clone()));
        entries.insert(SELF_KEY.to_string(), Value::Instance(instance.clone()));
        entries.insert(
            INITIAL_VALUES_KEY.to_string(),
            Value::Map(initial_values.clone()),
        );

        Self {
            runtime,
            class,
            represented,
            instance,
            initial_values,
            entries,
        }
    }

    /// Owning runtime
    pub fn runtime(&self) -> &'a Runtime {
        self.runtime
    }

    /// Description of the class being instantiated
    pub fn class_description(&self) -> &Arc<ClassDescription> {
        &self.class
    }

    /// Instance under construction
    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// Caller-supplied initial values
    pub fn initial_values(&self) -> &Attributes {
        &self.initial_values
    }

    /// Represented classes, ancestors first
    pub fn represented_classes(&self) -> &'a [Arc<ClassDescription>] {
        self.represented
    }

    /// Get an entry
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Check if an entry exists
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Entry names, sorted
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Get an entry that must hold a namespace
    pub fn namespace(&self, key: &str) -> Option<&Namespace> {
        self.entries.get(key).and_then(Value::as_namespace)
    }

    /// Merge a contribution; any existing key fails the whole merge
    pub(crate) fn merge(&mut self, contribution: Contribution) -> EngineResult<()> {
        for (key, value) in contribution {
            if self.entries.contains_key(&key) {
                return Err(EngineError::ContextKeyExists(key));
            }
            self.entries.insert(key, value);
        }
        Ok(())
    }
}
