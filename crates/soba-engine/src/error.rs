//! Engine error types

use crate::class::ClassId;
use crate::pipeline::Phase;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Broad classification of an [`EngineError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed class payload, identity, attribute or configuration
    Validation,
    /// Duplicate identity, unresolvable parent, extension name conflict
    Registration,
    /// Reference to an unregistered identity
    NotFound,
    /// A construction phase failed
    Construction,
    /// Second singleton registration for one identity
    DuplicateSingleton,
    /// Inheritance graph contains a cycle
    CyclicInheritance,
}

/// Engine error types
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Malformed class payload or identity
    #[error("Validation error: {0}")]
    Validation(String),

    /// Class identity already registered
    #[error("Class {0} is already defined")]
    DuplicateClass(ClassId),

    /// `inheritsFrom` cites a class that is not registered
    #[error("Class {class} inherits from {parent}, which is not defined")]
    UnknownParent {
        /// Class declaring the parent
        class: ClassId,
        /// Missing parent
        parent: ClassId,
    },

    /// Two distinct extensions with one name in a composed class
    #[error(
        "Extension conflict in {class}: extension '{name}' declared by {declared_by} is already used (declared by {existing})"
    )]
    ExtensionConflict {
        /// Class being defined
        class: ClassId,
        /// Clashing extension name
        name: String,
        /// Declaring class of the extension added first
        existing: ClassId,
        /// Declaring class of the rejected extension
        declared_by: ClassId,
    },

    /// Class identity not registered
    #[error("Class {0} is not defined")]
    NotFound(ClassId),

    /// A phase callback failed while building an instance
    #[error("Construction of {class} failed in {phase} of extension '{extension}': {source}")]
    Construction {
        /// Class being instantiated
        class: ClassId,
        /// Extension whose callback failed
        extension: String,
        /// Phase that was running
        phase: Phase,
        /// Original cause
        #[source]
        source: anyhow::Error,
    },

    /// Shared construction context key written twice
    #[error("Shared space already contains key '{0}'")]
    ContextKeyExists(String),

    /// Namespace member defined twice
    #[error("Namespace already contains member '{0}'")]
    DuplicateMember(String),

    /// Write to a frozen namespace
    #[error("Cannot modify member '{0}' of a frozen namespace")]
    FrozenNamespace(String),

    /// Second singleton registration
    #[error("An attempt to register second singleton of class {0}")]
    DuplicateSingleton(ClassId),

    /// Singleton slot claimed by an instance still being constructed
    #[error("Singleton of class {0} is still under construction")]
    SingletonUnderConstruction(ClassId),

    /// Static data requested from inside its own computation
    #[error("Static data of class {0} requested while it is being computed")]
    ReentrantStatic(ClassId),

    /// Inheritance graph contains a cycle
    #[error("Cyclic inheritance detected: {}", format_cycle(.path))]
    CyclicInheritance {
        /// Classes forming the cycle, first repeated at the end
        path: Vec<ClassId>,
    },

    /// Options could not be parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O error
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Validation(_) | EngineError::Config(_) | EngineError::Io(_) => {
                ErrorKind::Validation
            }
            EngineError::DuplicateClass(_)
            | EngineError::UnknownParent { .. }
            | EngineError::ExtensionConflict { .. } => ErrorKind::Registration,
            EngineError::NotFound(_) => ErrorKind::NotFound,
            EngineError::Construction { .. }
            | EngineError::ContextKeyExists(_)
            | EngineError::DuplicateMember(_)
            | EngineError::FrozenNamespace(_)
            | EngineError::SingletonUnderConstruction(_)
            | EngineError::ReentrantStatic(_) => ErrorKind::Construction,
            EngineError::DuplicateSingleton(_) => ErrorKind::DuplicateSingleton,
            EngineError::CyclicInheritance { .. } => ErrorKind::CyclicInheritance,
        }
    }

    /// The engine error at the bottom of a construction failure.
    ///
    /// Construction failures nest when a callback instantiates another
    /// class; this walks through every `Construction` layer.
    pub fn innermost(&self) -> &EngineError {
        let mut current = self;
        while let EngineError::Construction { source, .. } = current {
            match source.downcast_ref::<EngineError>() {
                Some(inner) => current = inner,
                None => break,
            }
        }
        current
    }
}

fn format_cycle(path: &[ClassId]) -> String {
    path.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}
