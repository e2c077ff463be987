//! Shared, freezable member tables
//!
//! Namespaces back instance members, the per-class `protected` spaces and
//! the static data entries. Cloning a namespace shares it; freezing is
//! permanent and applies to every handle.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{EngineError, EngineResult};
use crate::value::{Attributes, Value};

#[derive(Default)]
struct NamespaceInner {
    members: Attributes,
    frozen: bool,
}

/// Shared member table
#[derive(Clone, Default)]
pub struct Namespace(Arc<RwLock<NamespaceInner>>);

impl Namespace {
    /// Create an empty namespace
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a namespace holding `members`
    pub fn from_map(members: Attributes) -> Self {
        Namespace(Arc::new(RwLock::new(NamespaceInner {
            members,
            frozen: false,
        })))
    }

    /// Get a member
    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.read().members.get(key).cloned()
    }

    /// Check if a member exists
    pub fn contains(&self, key: &str) -> bool {
        self.0.read().members.contains_key(key)
    }

    /// Set a member, replacing any previous value
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> EngineResult<()> {
        let key = key.into();
        let mut inner = self.0.write();
        if inner.frozen {
            return Err(EngineError::FrozenNamespace(key));
        }
        inner.members.insert(key, value.into());
        Ok(())
    }

    /// Add a member that must not exist yet
    pub fn define(&self, key: impl Into<String>, value: impl Into<Value>) -> EngineResult<()> {
        let key = key.into();
        let mut inner = self.0.write();
        if inner.frozen {
            return Err(EngineError::FrozenNamespace(key));
        }
        if inner.members.contains_key(&key) {
            return Err(EngineError::DuplicateMember(key));
        }
        inner.members.insert(key, value.into());
        Ok(())
    }

    /// Remove a member
    pub fn remove(&self, key: &str) -> EngineResult<Option<Value>> {
        let mut inner = self.0.write();
        if inner.frozen {
            return Err(EngineError::FrozenNamespace(key.to_string()));
        }
        Ok(inner.members.remove(key))
    }

    /// Member names in order
    pub fn keys(&self) -> Vec<String> {
        self.0.read().members.keys().cloned().collect()
    }

    /// Copy of all members
    pub fn snapshot(&self) -> Attributes {
        self.0.read().members.clone()
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.0.read().members.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.0.read().members.is_empty()
    }

    /// Reject all further writes
    pub fn freeze(&self) {
        self.0.write().frozen = true;
    }

    /// Check if frozen
    pub fn is_frozen(&self) -> bool {
        self.0.read().frozen
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Namespace) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Members may refer back to this namespace, so only the shape is shown
        let inner = self.0.read();
        f.debug_struct("Namespace")
            .field("members", &inner.members.keys().collect::<Vec<_>>())
            .field("frozen", &inner.frozen)
            .finish()
    }
}
