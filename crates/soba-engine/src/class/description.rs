//! Immutable class descriptions

use crate::class::ClassId;
use crate::extension::{Extension, ResolvedExtension};
use crate::value::{Attributes, Value};

/// Index of a description in the registry arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassHandle(pub(crate) u32);

impl ClassHandle {
    /// Raw arena index
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A registered class.
///
/// Built once by the registry and never mutated afterwards. Descriptions
/// are shared read-only through `Arc`; the registry's arena owns them.
#[derive(Debug)]
pub struct ClassDescription {
    id: ClassId,
    handle: ClassHandle,
    inherits_from: Vec<ClassId>,
    own_extensions: Vec<Extension>,
    /// Ancestors first, this class last
    represented: Vec<ClassHandle>,
    /// Parent-to-child order
    extensions: Vec<ResolvedExtension>,
    attributes: Attributes,
}

impl ClassDescription {
    pub(crate) fn new(
        id: ClassId,
        handle: ClassHandle,
        inherits_from: Vec<ClassId>,
        own_extensions: Vec<Extension>,
        represented: Vec<ClassHandle>,
        extensions: Vec<ResolvedExtension>,
        attributes: Attributes,
    ) -> Self {
        Self {
            id,
            handle,
            inherits_from,
            own_extensions,
            represented,
            extensions,
            attributes,
        }
    }

    /// Class identity
    pub fn id(&self) -> &ClassId {
        &self.id
    }

    /// Class name
    pub fn name(&self) -> &str {
        self.id.name()
    }

    /// Class version
    pub fn version(&self) -> u32 {
        self.id.version()
    }

    /// Arena handle
    pub fn handle(&self) -> ClassHandle {
        self.handle
    }

    /// Direct parents in declaration order
    pub fn inherits_from(&self) -> &[ClassId] {
        &self.inherits_from
    }

    /// Whether `parent` is a direct parent
    pub fn inherits_directly(&self, parent: &ClassId) -> bool {
        self.inherits_from.contains(parent)
    }

    /// Extensions declared on this class itself
    pub fn own_extensions(&self) -> &[Extension] {
        &self.own_extensions
    }

    /// Handles of the linearized represented classes, this class last
    pub fn represented_handles(&self) -> &[ClassHandle] {
        &self.represented
    }

    /// Merged extensions, ancestors first
    pub fn extensions(&self) -> &[ResolvedExtension] {
        &self.extensions
    }

    /// Find a merged extension by name
    pub fn extension(&self, name: &str) -> Option<&ResolvedExtension> {
        self.extensions.iter().find(|ext| ext.name() == name)
    }

    /// Whether the merged extension set contains `name`
    pub fn has_extension(&self, name: &str) -> bool {
        self.extension(name).is_some()
    }

    /// Stored attributes
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Get a stored attribute
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Truthiness of a stored attribute (absent is false)
    pub fn attribute_flag(&self, name: &str) -> bool {
        self.attribute(name).map(Value::is_truthy).unwrap_or(false)
    }
}
