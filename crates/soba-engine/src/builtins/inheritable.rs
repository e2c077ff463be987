//! The `inheritable:1` class and its extensions

use crate::class::{ClassDefinition, ClassDescription, ClassId};
use crate::error::EngineResult;
use crate::extension::{Contribution, Extension, PreInit};
use crate::namespace::Namespace;
use crate::pipeline::SharedContext;
use crate::value::Value;

use super::Constructor;

/// Name of the built-in root class
pub const INHERITABLE: &str = "inheritable";
/// Per-instance namespace holding one private namespace per class
pub const PROTECTED: &str = "protected";
/// Per-class static data
pub const STATIC: &str = "static";
/// Per-class constructor
pub const CREATE: &str = "create";
/// Marks a class that can only be inherited
pub const ABSTRACT: &str = "abstract";
/// Marks a class with one shared instance
pub const SINGLETON: &str = "singleton";
/// Freezes instance members once construction is complete
pub const FREEZE: &str = "freeze";

/// Identity of the built-in root class
pub fn inheritable_id() -> ClassId {
    ClassId::new(INHERITABLE, 1)
}

/// Definition of `inheritable:1`.
///
/// Each call creates fresh extension handles; register it once per runtime.
pub fn inheritable_definition() -> ClassDefinition {
    ClassDefinition::new(INHERITABLE, 1)
        .extension(protected_extension())
        .extension(static_extension())
        .extension(create_extension())
        .extension(abstract_extension())
        .extension(singleton_extension())
        .extension(freeze_extension())
}

/// Private namespace of `class` inside the instance's `protected` space.
///
/// Per-class spaces are keyed by `name:version`, so two versions of one
/// class name can share a chain.
pub fn protected_space(ctx: &SharedContext<'_>, class: &ClassDescription) -> Option<Namespace> {
    class_space(ctx, PROTECTED, class)
}

/// Shared static namespace of `class` inside the instance's `static` space
pub fn static_space(ctx: &SharedContext<'_>, class: &ClassDescription) -> Option<Namespace> {
    class_space(ctx, STATIC, class)
}

fn class_space(ctx: &SharedContext<'_>, key: &str, class: &ClassDescription) -> Option<Namespace> {
    ctx.namespace(key)?
        .get(&class.id().key())
        .and_then(|value| value.as_namespace().cloned())
}

fn protected_extension() -> Extension {
    Extension::builder(PROTECTED)
        .shared_modifiers(|_| Ok(Some(Contribution::new().with(PROTECTED, Namespace::new()))))
        .build()
}

fn static_extension() -> Extension {
    Extension::builder(STATIC)
        .store(|value| match value {
            Value::Map(_) | Value::Null => Ok(value),
            other => anyhow::bail!("Static data must be a map, got {}", other.type_name()),
        })
        .shared_modifiers(|ctx| {
            let statics = Namespace::new();
            for class in ctx.represented_classes() {
                if !class.has_extension(STATIC) {
                    continue;
                }
                let data = ctx
                    .runtime()
                    .store()
                    .get_or_compute_static(class.id(), || -> EngineResult<Namespace> {
                        let initial = class
                            .attribute(STATIC)
                            .and_then(Value::as_map)
                            .cloned()
                            .unwrap_or_default();
                        Ok(Namespace::from_map(initial))
                    })?;
                statics.define(class.id().key(), data)?;
            }
            statics.freeze();
            Ok(Some(Contribution::new().with(STATIC, statics)))
        })
        .build()
}

fn create_extension() -> Extension {
    Extension::builder(CREATE)
        .store(|value| {
            if value.is_null() || value.downcast_native::<Constructor>().is_some() {
                Ok(value)
            } else {
                anyhow::bail!(
                    "Class constructor must be a constructor or null, got {}",
                    value.type_name()
                )
            }
        })
        .per_inheritance(|_, ctx| {
            let Some(protected) = ctx.namespace(PROTECTED) else {
                anyhow::bail!("Shared space has no '{}' namespace", PROTECTED);
            };

            // Declared once on the root, so this runs once and walks the chain
            for class in ctx.represented_classes() {
                if !class.has_extension(CREATE) {
                    continue;
                }
                let space = Namespace::new();
                protected.define(class.id().key(), space.clone())?;

                if let Some(constructor) = class
                    .attribute(CREATE)
                    .and_then(|value| value.downcast_native::<Constructor>())
                {
                    constructor.call(class, ctx)?;
                }
                space.freeze();
            }
            Ok(None)
        })
        .build()
}

fn abstract_extension() -> Extension {
    Extension::builder(ABSTRACT)
        .store(|value| Ok(Value::Bool(value.is_truthy())))
        .pre_initialize(|ctx| {
            let class = ctx.class_description();
            if class.attribute_flag(ABSTRACT) {
                anyhow::bail!(
                    "Abstract classes can only be inherited ({} is abstract)",
                    class.id()
                );
            }
            Ok(PreInit::Continue)
        })
        .build()
}

fn singleton_extension() -> Extension {
    Extension::builder(SINGLETON)
        .store(|value| Ok(Value::Bool(value.is_truthy())))
        .pre_initialize(|ctx| {
            let class = ctx.class_description();
            if !class.attribute_flag(SINGLETON) {
                return Ok(PreInit::Continue);
            }
            let existing = ctx
                .runtime()
                .store()
                .get_or_register_singleton(class.id(), ctx.instance().clone())?;
            Ok(match existing {
                Some(instance) => PreInit::Redirect(instance),
                None => PreInit::Continue,
            })
        })
        // Runs after `freeze`, the last callback of a construction
        .complete(|ctx| {
            let class = ctx.class_description();
            if class.attribute_flag(SINGLETON) {
                ctx.runtime()
                    .store()
                    .complete_singleton(class.id(), ctx.instance());
            }
            Ok(())
        })
        .build()
}

fn freeze_extension() -> Extension {
    Extension::builder(FREEZE)
        .complete(|ctx| {
            ctx.instance().members().freeze();
            Ok(())
        })
        .build()
}
