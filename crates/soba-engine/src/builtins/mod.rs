//! Built-in classes
//!
//! `inheritable:1` is the usual root of user classes. It carries the
//! `protected`, `static`, `create`, `abstract`, `singleton` and `freeze`
//! extensions, so everything inheriting from it gets per-class private
//! namespaces, lazily computed static data, constructors, abstract classes
//! and singletons.

mod inheritable;

pub use inheritable::{
    inheritable_definition, inheritable_id, protected_space, static_space, ABSTRACT, CREATE, FREEZE,
    INHERITABLE, PROTECTED, SINGLETON, STATIC,
};

use std::fmt;
use std::sync::Arc;

use crate::class::ClassDescription;
use crate::error::EngineResult;
use crate::pipeline::SharedContext;
use crate::runtime::Runtime;
use crate::value::Value;

type ConstructorFn =
    dyn Fn(&ClassDescription, &SharedContext<'_>) -> anyhow::Result<()> + Send + Sync;

/// Per-class constructor stored in the `create` attribute.
///
/// Invoked once per represented class that declares one, with that class's
/// description and the shared construction context.
#[derive(Clone)]
pub struct Constructor(Arc<ConstructorFn>);

impl Constructor {
    /// Wrap a constructor function
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&ClassDescription, &SharedContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Constructor(Arc::new(f))
    }

    /// Run the constructor
    pub fn call(&self, class: &ClassDescription, ctx: &SharedContext<'_>) -> anyhow::Result<()> {
        (self.0)(class, ctx)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Constructor")
    }
}

/// A `create` attribute value wrapping `f`
pub fn constructor<F>(f: F) -> Value
where
    F: Fn(&ClassDescription, &SharedContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Value::native(Constructor::new(f))
}

/// Register the built-in classes
pub fn register(runtime: &Runtime) -> EngineResult<()> {
    let description = runtime.define(inheritable_definition())?;
    tracing::debug!(class = %description.id(), "builtins: registered");
    Ok(())
}
