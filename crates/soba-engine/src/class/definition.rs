//! Class registration payload

use rustc_hash::FxHashSet;

use crate::class::ClassId;
use crate::error::{EngineError, EngineResult};
use crate::extension::Extension;
use crate::value::{Attributes, Value};

/// Payload handed to `define`.
///
/// A definition is consumed by registration; the registry turns it into an
/// immutable [`ClassDescription`](crate::ClassDescription).
#[derive(Debug, Clone)]
pub struct ClassDefinition {
    /// Identity of the class being defined
    pub id: ClassId,
    /// Parents in declaration order
    pub inherits: Vec<ClassId>,
    /// Extensions declared directly on this class
    pub extensions: Vec<Extension>,
    /// Raw attributes, transformed by extension `store` callbacks
    pub attributes: Attributes,
}

impl ClassDefinition {
    /// Start a definition for `name:version`
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            id: ClassId::new(name, version),
            inherits: Vec::new(),
            extensions: Vec::new(),
            attributes: Attributes::new(),
        }
    }

    /// Add a parent
    pub fn inherits(mut self, name: impl Into<String>, version: u32) -> Self {
        self.inherits.push(ClassId::new(name, version));
        self
    }

    /// Add a parent by identity
    pub fn inherits_id(mut self, parent: ClassId) -> Self {
        self.inherits.push(parent);
        self
    }

    /// Declare an extension
    pub fn extension(mut self, extension: Extension) -> Self {
        self.extensions.push(extension);
        self
    }

    /// Set a raw attribute
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Structural checks that need no registry access
    pub(crate) fn validate(&self) -> EngineResult<()> {
        self.id.validate()?;

        let mut parent_names = FxHashSet::default();
        for parent in &self.inherits {
            parent.validate()?;
            if !parent_names.insert(parent.name()) {
                return Err(EngineError::Validation(format!(
                    "Class {} names parent '{}' more than once",
                    self.id,
                    parent.name()
                )));
            }
            if *parent == self.id {
                return Err(EngineError::CyclicInheritance {
                    path: vec![self.id.clone(), self.id.clone()],
                });
            }
        }

        for extension in &self.extensions {
            if extension.name().trim().is_empty() {
                return Err(EngineError::Validation(format!(
                    "Class {} declares an extension without a name",
                    self.id
                )));
            }
        }

        Ok(())
    }
}
