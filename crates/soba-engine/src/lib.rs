//! Soba Engine
//!
//! Metadata-driven object construction:
//! - **Class registry**: immutable class descriptions and inheritance
//!   linearization (`registry` module)
//! - **Extensions**: named capability units and their conflict-checked
//!   composition (`extension` module)
//! - **Instance pipeline**: the four construction phases (`pipeline` module)
//! - **Static store**: per-class static data and singletons (`store` module)
//! - **Builtins**: the `inheritable:1` root class (`builtins` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use soba_engine::{builtins, ClassDefinition, ClassId, Runtime};
//!
//! let runtime = Runtime::new()?;
//! runtime.define(
//!     ClassDefinition::new("counter", 1)
//!         .inherits_id(builtins::inheritable_id())
//!         .attribute("singleton", true),
//! )?;
//!
//! let a = runtime.instantiate(&ClassId::new("counter", 1), Default::default())?;
//! let b = runtime.instantiate(&ClassId::new("counter", 1), Default::default())?;
//! assert_eq!(a, b);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// ============================================================================
// Core Modules
// ============================================================================

/// Class identities, definitions and descriptions
pub mod class;

/// Engine errors
pub mod error;

/// Extensions and extension merging
pub mod extension;

/// Instance construction pipeline
pub mod pipeline;

/// Class registry and linearization
pub mod registry;

/// Runtime owning the registry and the store
pub mod runtime;

/// Static data and singleton store
pub mod store;

// ============================================================================
// Data Model
// ============================================================================

/// Constructed instances
pub mod instance;

/// Freezable member tables
pub mod namespace;

/// Dynamic values
pub mod value;

// ============================================================================
// Configuration and Builtins
// ============================================================================

/// Built-in classes
pub mod builtins;

/// Runtime options
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use class::{ClassDefinition, ClassDescription, ClassHandle, ClassId};
pub use error::{EngineError, EngineResult, ErrorKind};
pub use extension::{Contribution, Extension, ExtensionBuilder, PreInit, ResolvedExtension};
pub use instance::Instance;
pub use namespace::Namespace;
pub use options::RuntimeOptions;
pub use pipeline::{Phase, SharedContext};
pub use registry::ClassRegistry;
pub use runtime::Runtime;
pub use store::StaticStore;
pub use value::{Attributes, Function, Value};
