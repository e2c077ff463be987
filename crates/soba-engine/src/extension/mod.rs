//! Extensions: named capability units attached to classes
//!
//! An extension is a record of optional phase callbacks plus an optional
//! attribute `store` transform. Which phases an extension takes part in is
//! decided by which callbacks are present; the pipeline checks each field
//! rather than probing behavior.
//!
//! Extension identity is handle identity: cloning an [`Extension`] yields
//! the same extension, so attaching one handle to several classes and
//! reaching it through multiple inheritance paths never counts as a
//! conflict.

mod resolver;

use std::fmt;
use std::sync::Arc;

use crate::class::{ClassDescription, ClassId};
use crate::instance::Instance;
use crate::pipeline::{Phase, SharedContext};
use crate::value::Value;

pub use resolver::merge_extensions;

/// Outcome of a `preInitialize` callback
#[derive(Debug, Clone)]
pub enum PreInit {
    /// Keep constructing
    Continue,
    /// Stop construction and return this instance instead
    Redirect(Instance),
}

/// Keys an extension adds to the shared construction context
#[derive(Debug, Clone, Default)]
pub struct Contribution {
    entries: Vec<(String, Value)>,
}

impl Contribution {
    /// Create an empty contribution
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry (builder style)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Add an entry
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for Contribution {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// `preInitialize` callback
pub type PreInitializeFn = Arc<dyn Fn(&SharedContext<'_>) -> anyhow::Result<PreInit> + Send + Sync>;

/// `sharedModifiers` callback
pub type SharedModifierFn =
    Arc<dyn Fn(&SharedContext<'_>) -> anyhow::Result<Option<Contribution>> + Send + Sync>;

/// `perInheritance` callback, invoked with the represented class
pub type PerInheritanceFn = Arc<
    dyn Fn(&ClassDescription, &SharedContext<'_>) -> anyhow::Result<Option<Contribution>>
        + Send
        + Sync,
>;

/// `complete` callback
pub type CompleteFn = Arc<dyn Fn(&SharedContext<'_>) -> anyhow::Result<()> + Send + Sync>;

/// Attribute `store` transform
pub type StoreFn = Arc<dyn Fn(Value) -> anyhow::Result<Value> + Send + Sync>;

struct ExtensionDef {
    name: String,
    pre_initialize: Option<PreInitializeFn>,
    shared_modifiers: Option<SharedModifierFn>,
    per_inheritance: Option<PerInheritanceFn>,
    complete: Option<CompleteFn>,
    store: Option<StoreFn>,
}

/// A named capability unit
#[derive(Clone)]
pub struct Extension(Arc<ExtensionDef>);

impl Extension {
    /// Start building an extension
    pub fn builder(name: impl Into<String>) -> ExtensionBuilder {
        ExtensionBuilder {
            def: ExtensionDef {
                name: name.into(),
                pre_initialize: None,
                shared_modifiers: None,
                per_inheritance: None,
                complete: None,
                store: None,
            },
        }
    }

    /// Extension name (also the attribute name its `store` applies to)
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// `preInitialize` callback, if any
    pub fn pre_initialize(&self) -> Option<&PreInitializeFn> {
        self.0.pre_initialize.as_ref()
    }

    /// `sharedModifiers` callback, if any
    pub fn shared_modifiers(&self) -> Option<&SharedModifierFn> {
        self.0.shared_modifiers.as_ref()
    }

    /// `perInheritance` callback, if any
    pub fn per_inheritance(&self) -> Option<&PerInheritanceFn> {
        self.0.per_inheritance.as_ref()
    }

    /// `complete` callback, if any
    pub fn complete(&self) -> Option<&CompleteFn> {
        self.0.complete.as_ref()
    }

    /// `store` transform, if any
    pub fn store(&self) -> Option<&StoreFn> {
        self.0.store.as_ref()
    }

    /// Whether the extension has a callback for `phase`
    pub fn participates_in(&self, phase: Phase) -> bool {
        match phase {
            Phase::PreInitialize => self.0.pre_initialize.is_some(),
            Phase::SharedModifiers => self.0.shared_modifiers.is_some(),
            Phase::PerInheritance => self.0.per_inheritance.is_some(),
            Phase::Complete => self.0.complete.is_some(),
        }
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Extension) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phases: Vec<Phase> = Phase::ALL
            .into_iter()
            .filter(|phase| self.participates_in(*phase))
            .collect();
        f.debug_struct("Extension")
            .field("name", &self.0.name)
            .field("phases", &phases)
            .field("store", &self.0.store.is_some())
            .finish()
    }
}

/// Builder for [`Extension`]
pub struct ExtensionBuilder {
    def: ExtensionDef,
}

impl ExtensionBuilder {
    /// Set the `preInitialize` callback
    pub fn pre_initialize<F>(mut self, f: F) -> Self
    where
        F: Fn(&SharedContext<'_>) -> anyhow::Result<PreInit> + Send + Sync + 'static,
    {
        self.def.pre_initialize = Some(Arc::new(f));
        self
    }

    /// Set the `sharedModifiers` callback
    pub fn shared_modifiers<F>(mut self, f: F) -> Self
    where
        F: Fn(&SharedContext<'_>) -> anyhow::Result<Option<Contribution>> + Send + Sync + 'static,
    {
        self.def.shared_modifiers = Some(Arc::new(f));
        self
    }

    /// Set the `perInheritance` callback
    pub fn per_inheritance<F>(mut self, f: F) -> Self
    where
        F: Fn(&ClassDescription, &SharedContext<'_>) -> anyhow::Result<Option<Contribution>>
            + Send
            + Sync
            + 'static,
    {
        self.def.per_inheritance = Some(Arc::new(f));
        self
    }

    /// Set the `complete` callback
    pub fn complete<F>(mut self, f: F) -> Self
    where
        F: Fn(&SharedContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.def.complete = Some(Arc::new(f));
        self
    }

    /// Set the attribute `store` transform
    pub fn store<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.def.store = Some(Arc::new(f));
        self
    }

    /// Finish the extension
    pub fn build(self) -> Extension {
        Extension(Arc::new(self.def))
    }
}

/// An extension in a class's merged set, tagged with its declaring class
#[derive(Debug, Clone)]
pub struct ResolvedExtension {
    extension: Extension,
    declared_by: ClassId,
}

impl ResolvedExtension {
    /// The extension
    pub fn extension(&self) -> &Extension {
        &self.extension
    }

    /// Class that declared it
    pub fn declared_by(&self) -> &ClassId {
        &self.declared_by
    }

    /// Extension name
    pub fn name(&self) -> &str {
        self.extension.name()
    }
}

impl std::ops::Deref for ResolvedExtension {
    type Target = Extension;

    fn deref(&self) -> &Extension {
        &self.extension
    }
}
