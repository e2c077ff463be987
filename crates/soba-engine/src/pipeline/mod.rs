//! Instance construction pipeline
//!
//! Builds one instance by running the class's extensions through four
//! fixed phases against a shared construction context:
//!
//! 1. `preInitialize`, ancestors first; may redirect to another instance
//! 2. `sharedModifiers`, ancestors first; contributions merge into the context
//! 3. `perInheritance`, per represented class, that class's own extensions
//! 4. `complete`, descendants first
//!
//! The first failing callback aborts construction. Nothing is rolled back.

mod context;

pub use context::{SharedContext, CLASS_DESCRIPTION_KEY, INITIAL_VALUES_KEY, SELF_KEY};

use std::fmt;
use std::sync::Arc;

use crate::class::ClassDescription;
use crate::error::{EngineError, EngineResult};
use crate::extension::{Contribution, PreInit};
use crate::instance::Instance;
use crate::runtime::Runtime;
use crate::value::Attributes;

/// Construction phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// May interrupt construction
    PreInitialize,
    /// Contributes shared context entries
    SharedModifiers,
    /// Runs once per represented class
    PerInheritance,
    /// Finalization, descendants first
    Complete,
}

impl Phase {
    /// All phases in execution order
    pub const ALL: [Phase; 4] = [
        Phase::PreInitialize,
        Phase::SharedModifiers,
        Phase::PerInheritance,
        Phase::Complete,
    ];

    /// Callback name of the phase
    pub fn name(self) -> &'static str {
        match self {
            Phase::PreInitialize => "preInitialize",
            Phase::SharedModifiers => "sharedModifiers",
            Phase::PerInheritance => "perInheritance",
            Phase::Complete => "complete",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One run of the construction phases for a resolved class
pub(crate) struct InstancePipeline<'a> {
    runtime: &'a Runtime,
    class: Arc<ClassDescription>,
    /// Ancestors first, `class` last
    represented: Vec<Arc<ClassDescription>>,
}

impl<'a> InstancePipeline<'a> {
    pub(crate) fn new(
        runtime: &'a Runtime,
        class: Arc<ClassDescription>,
        represented: Vec<Arc<ClassDescription>>,
    ) -> Self {
        Self {
            runtime,
            class,
            represented,
        }
    }

    /// Build an instance, or return the instance a `preInitialize`
    /// callback redirected to.
    ///
    /// A failed construction gives up the singleton slot its instance
    /// claimed, so the next instantiation starts over.
    pub(crate) fn run(&self, initial_values: Attributes) -> EngineResult<Instance> {
        let instance = Instance::new(self.class.clone());
        self.construct(instance.clone(), initial_values)
            .inspect_err(|_| {
                self.runtime
                    .store()
                    .release_singleton(self.class.id(), &instance);
            })
    }

    fn construct(&self, instance: Instance, initial_values: Attributes) -> EngineResult<Instance> {
        let mut ctx = SharedContext::new(
            self.runtime,
            self.class.clone(),
            &self.represented,
            instance.clone(),
            initial_values,
        );
        let extensions = self.class.extensions();

        // Phase 1: preInitialize
        for ext in extensions {
            let Some(callback) = ext.pre_initialize() else {
                continue;
            };
            self.trace_callback(ext.name(), Phase::PreInitialize, None);
            match callback(&ctx) {
                Ok(PreInit::Continue) => {}
                Ok(PreInit::Redirect(target)) => {
                    tracing::debug!(
                        class = %self.class.id(),
                        extension = ext.name(),
                        instance = target.id(),
                        "pipeline: construction redirected"
                    );
                    return Ok(target);
                }
                Err(source) => return Err(self.failure(ext.name(), Phase::PreInitialize, source)),
            }
        }

        // Phase 2: sharedModifiers
        for ext in extensions {
            let Some(callback) = ext.shared_modifiers() else {
                continue;
            };
            self.trace_callback(ext.name(), Phase::SharedModifiers, None);
            let contribution = callback(&ctx)
                .map_err(|source| self.failure(ext.name(), Phase::SharedModifiers, source))?;
            self.merge(&mut ctx, contribution, ext.name(), Phase::SharedModifiers)?;
        }

        // Phase 3: perInheritance
        for represented in &self.represented {
            for ext in represented.own_extensions() {
                let Some(callback) = ext.per_inheritance() else {
                    continue;
                };
                self.trace_callback(ext.name(), Phase::PerInheritance, Some(represented.as_ref()));
                let contribution = callback(represented, &ctx)
                    .map_err(|source| self.failure(ext.name(), Phase::PerInheritance, source))?;
                self.merge(&mut ctx, contribution, ext.name(), Phase::PerInheritance)?;
            }
        }

        // Phase 4: complete
        for ext in extensions.iter().rev() {
            let Some(callback) = ext.complete() else {
                continue;
            };
            self.trace_callback(ext.name(), Phase::Complete, None);
            callback(&ctx).map_err(|source| self.failure(ext.name(), Phase::Complete, source))?;
        }

        tracing::debug!(
            class = %self.class.id(),
            instance = instance.id(),
            context_keys = ctx.keys().len(),
            "pipeline: instance constructed"
        );
        Ok(instance)
    }

    fn merge(
        &self,
        ctx: &mut SharedContext<'_>,
        contribution: Option<Contribution>,
        extension: &str,
        phase: Phase,
    ) -> EngineResult<()> {
        match contribution {
            Some(contribution) => ctx
                .merge(contribution)
                .map_err(|err| self.failure(extension, phase, err.into())),
            None => Ok(()),
        }
    }

    fn failure(&self, extension: &str, phase: Phase, source: anyhow::Error) -> EngineError {
        EngineError::Construction {
            class: self.class.id().clone(),
            extension: extension.to_string(),
            phase,
            source,
        }
    }

    fn trace_callback(&self, extension: &str, phase: Phase, represented: Option<&ClassDescription>) {
        match represented {
            Some(represented) => tracing::trace!(
                class = %self.class.id(),
                represented = %represented.id(),
                extension = extension,
                phase = %phase,
                "pipeline: invoking callback"
            ),
            None => tracing::trace!(
                class = %self.class.id(),
                extension = extension,
                phase = %phase,
                "pipeline: invoking callback"
            ),
        }
    }
}
