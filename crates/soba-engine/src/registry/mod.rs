//! Class registry
//!
//! Arena of immutable class descriptions. Descriptions are appended once and
//! never removed, so a [`ClassHandle`] stays valid for the registry's
//! lifetime and represented classes can be stored as handles.

mod linearize;

pub use linearize::linearize;

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::class::{ClassDescription, ClassHandle, ClassId};
use crate::error::EngineResult;

/// Class registry for a runtime
#[derive(Debug, Default)]
pub struct ClassRegistry {
    /// Descriptions indexed by handle, in registration order
    classes: Vec<Arc<ClassDescription>>,
    /// Identity to handle mapping
    by_id: FxHashMap<ClassId, ClassHandle>,
}

impl ClassRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle the next inserted description will get
    pub(crate) fn next_handle(&self) -> ClassHandle {
        ClassHandle(self.classes.len() as u32)
    }

    /// Append a description built with [`ClassRegistry::next_handle`]
    pub(crate) fn insert(&mut self, description: Arc<ClassDescription>) -> ClassHandle {
        let handle = self.next_handle();
        debug_assert_eq!(description.handle(), handle);
        debug_assert!(!self.by_id.contains_key(description.id()));

        self.by_id.insert(description.id().clone(), handle);
        self.classes.push(description);
        handle
    }

    /// Get a description by identity
    pub fn get(&self, id: &ClassId) -> Option<&Arc<ClassDescription>> {
        self.by_id
            .get(id)
            .and_then(|handle| self.classes.get(handle.index()))
    }

    /// Get a description by handle
    pub fn get_by_handle(&self, handle: ClassHandle) -> Option<&Arc<ClassDescription>> {
        self.classes.get(handle.index())
    }

    /// Handle of a registered identity
    pub fn handle_of(&self, id: &ClassId) -> Option<ClassHandle> {
        self.by_id.get(id).copied()
    }

    /// Check if an identity is registered
    pub fn contains(&self, id: &ClassId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Number of registered classes
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Iterate over descriptions in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ClassDescription>> {
        self.classes.iter()
    }

    /// Linearize a registered class
    pub fn linearize(&self, id: &ClassId) -> EngineResult<Vec<ClassId>> {
        linearize(id, |class| {
            self.get(class)
                .map(|description| description.inherits_from().to_vec())
        })
    }

    /// Descriptions of a class's represented classes, ancestors first
    pub fn represented(&self, description: &ClassDescription) -> Vec<Arc<ClassDescription>> {
        description
            .represented_handles()
            .iter()
            .filter_map(|handle| self.get_by_handle(*handle).cloned())
            .collect()
    }

    /// Whether `ancestor` is represented in `child` (a class is its own
    /// ancestor)
    pub fn is_subclass_of(&self, child: &ClassId, ancestor: &ClassId) -> bool {
        match (self.get(child), self.handle_of(ancestor)) {
            (Some(child), Some(ancestor)) => child.represented_handles().contains(&ancestor),
            _ => false,
        }
    }
}
