use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use soba_engine::builtins::{self, constructor, inheritable_id, protected_space, static_space};
use soba_engine::{
    Attributes, ClassDefinition, ClassId, EngineError, ErrorKind, Extension, Namespace, Phase,
    Runtime, RuntimeOptions, Value,
};

fn runtime() -> Runtime {
    Runtime::new().unwrap()
}

fn new(runtime: &Runtime, name: &str) -> Result<soba_engine::Instance, EngineError> {
    runtime.instantiate(&ClassId::new(name, 1), Attributes::new())
}

// ============================================================================
// Singleton Tests
// ============================================================================

#[test]
fn test_singleton_uniqueness() {
    let runtime = runtime();
    runtime
        .define(
            ClassDefinition::new("manager", 1)
                .inherits_id(inheritable_id())
                .attribute(builtins::SINGLETON, true),
        )
        .unwrap();

    let first = new(&runtime, "manager").unwrap();
    let second = new(&runtime, "manager").unwrap();
    assert_eq!(first, second);
    assert_eq!(runtime.store().singleton_count(), 1);

    // Registering another singleton directly fails, the slot keeps the first
    let id = ClassId::new("manager", 1);
    let err = runtime
        .store()
        .register_singleton(&id, first.clone())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateSingleton);
    assert_eq!(new(&runtime, "manager").unwrap(), first);
}

#[test]
fn test_singleton_is_not_inherited() {
    let runtime = runtime();
    runtime
        .define(
            ClassDefinition::new("manager", 1)
                .inherits_id(inheritable_id())
                .attribute(builtins::SINGLETON, true),
        )
        .unwrap();
    runtime
        .define(ClassDefinition::new("worker", 1).inherits("manager", 1))
        .unwrap();

    let a = new(&runtime, "worker").unwrap();
    let b = new(&runtime, "worker").unwrap();
    assert_ne!(a, b);
}

#[test]
fn test_singleton_constructor_runs_once() {
    let runtime = runtime();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    runtime
        .define(
            ClassDefinition::new("config", 1)
                .inherits_id(inheritable_id())
                .attribute(builtins::SINGLETON, true)
                .attribute(
                    builtins::CREATE,
                    constructor(move |_, _| {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }),
                ),
        )
        .unwrap();

    for _ in 0..3 {
        new(&runtime, "config").unwrap();
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_failed_singleton_construction_is_retried() {
    let runtime = runtime();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    runtime
        .define(
            ClassDefinition::new("service", 1)
                .inherits_id(inheritable_id())
                .attribute(builtins::SINGLETON, true)
                .attribute(
                    builtins::CREATE,
                    constructor(move |_, ctx| {
                        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                            anyhow::bail!("backend unavailable");
                        }
                        ctx.instance().set("ready", true)?;
                        Ok(())
                    }),
                ),
        )
        .unwrap();
    let id = ClassId::new("service", 1);

    let err = new(&runtime, "service").unwrap_err();
    assert!(err.to_string().contains("backend unavailable"));
    assert!(runtime.store().get_singleton(&id).is_none());
    assert_eq!(runtime.store().singleton_count(), 0);

    // The failed instance is never handed out; construction starts over
    let first = new(&runtime, "service").unwrap();
    assert_eq!(first.get("ready"), Some(Value::Bool(true)));
    assert!(first.is_frozen());
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let second = new(&runtime, "service").unwrap();
    assert_eq!(first, second);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(runtime.store().get_singleton(&id), Some(first));
}

#[test]
fn test_singleton_cannot_be_reached_during_its_construction() {
    let runtime = runtime();
    runtime
        .define(
            ClassDefinition::new("registry", 1)
                .inherits_id(inheritable_id())
                .attribute(builtins::SINGLETON, true)
                .attribute(
                    builtins::CREATE,
                    constructor(|class, ctx| {
                        ctx.runtime().instantiate(class.id(), Attributes::new())?;
                        Ok(())
                    }),
                ),
        )
        .unwrap();

    let err = new(&runtime, "registry").unwrap_err();
    assert!(matches!(
        err.innermost(),
        EngineError::SingletonUnderConstruction(_)
    ));

    // The outer failure released the slot as well
    assert_eq!(runtime.store().singleton_count(), 0);
    assert!(new(&runtime, "registry").is_err());
}

// ============================================================================
// Abstract Class Tests
// ============================================================================

#[test]
fn test_abstract_class_cannot_be_instantiated() {
    let runtime = runtime();
    runtime
        .define(
            ClassDefinition::new("shape", 1)
                .inherits_id(inheritable_id())
                .attribute(builtins::ABSTRACT, true),
        )
        .unwrap();
    runtime
        .define(ClassDefinition::new("circle", 1).inherits("shape", 1))
        .unwrap();

    let err = new(&runtime, "shape").unwrap_err();
    match &err {
        EngineError::Construction {
            extension, phase, ..
        } => {
            assert_eq!(extension, builtins::ABSTRACT);
            assert_eq!(*phase, Phase::PreInitialize);
        }
        other => panic!("Expected construction error, got {:?}", other),
    }
    assert!(err.to_string().contains("Abstract classes can only be inherited"));

    assert!(new(&runtime, "circle").is_ok());
}

// ============================================================================
// Constructor and Protected Space Tests
// ============================================================================

#[test]
fn test_constructors_run_per_class_with_private_space() {
    let runtime = runtime();
    let log = Arc::new(Mutex::new(Vec::<String>::new()));

    let base_log = log.clone();
    runtime
        .define(
            ClassDefinition::new("animal", 1)
                .inherits_id(inheritable_id())
                .attribute(
                    builtins::CREATE,
                    constructor(move |class, ctx| {
                        let private = protected_space(ctx, class)
                            .ok_or_else(|| anyhow::anyhow!("no protected space"))?;
                        private.set("legs", 4)?;
                        ctx.instance().set("kind", "animal")?;
                        base_log.lock().push(class.name().to_string());
                        Ok(())
                    }),
                ),
        )
        .unwrap();

    let derived_log = log.clone();
    runtime
        .define(
            ClassDefinition::new("dog", 1)
                .inherits("animal", 1)
                .attribute(
                    builtins::CREATE,
                    constructor(move |class, ctx| {
                        // The ancestor's space is already frozen
                        let protected = ctx.namespace(builtins::PROTECTED).unwrap();
                        let animal = protected.get("animal:1").unwrap();
                        let animal = animal.as_namespace().unwrap();
                        assert!(animal.is_frozen());
                        assert_eq!(animal.get("legs"), Some(Value::Int(4)));
                        assert!(animal.set("legs", 3).is_err());

                        let own = protected_space(ctx, class).unwrap();
                        assert!(!own.is_frozen());
                        own.set("sound", "woof")?;
                        ctx.instance().set("kind", "dog")?;
                        derived_log.lock().push(class.name().to_string());
                        Ok(())
                    }),
                ),
        )
        .unwrap();

    let dog = new(&runtime, "dog").unwrap();
    assert_eq!(*log.lock(), vec!["animal", "dog"]);
    assert_eq!(dog.get("kind"), Some(Value::from("dog")));
    assert!(dog.is_frozen());
}

#[test]
fn test_constructor_failure_names_create() {
    let runtime = runtime();
    runtime
        .define(
            ClassDefinition::new("fussy", 1)
                .inherits_id(inheritable_id())
                .attribute(
                    builtins::CREATE,
                    constructor(|_, ctx| {
                        if !ctx.initial_values().contains_key("required") {
                            anyhow::bail!("missing 'required'");
                        }
                        Ok(())
                    }),
                ),
        )
        .unwrap();

    let err = new(&runtime, "fussy").unwrap_err();
    match &err {
        EngineError::Construction {
            extension, phase, ..
        } => {
            assert_eq!(extension, builtins::CREATE);
            assert_eq!(*phase, Phase::PerInheritance);
        }
        other => panic!("Expected construction error, got {:?}", other),
    }

    let mut initial = Attributes::new();
    initial.insert("required".to_string(), Value::Bool(true));
    runtime
        .instantiate(&ClassId::new("fussy", 1), initial)
        .unwrap();
}

#[test]
fn test_two_versions_of_one_class_in_a_chain() {
    let runtime = runtime();
    let mut defaults = Attributes::new();
    defaults.insert("revision".to_string(), Value::Int(1));

    runtime
        .define(
            ClassDefinition::new("widget", 1)
                .inherits_id(inheritable_id())
                .attribute(builtins::STATIC, defaults)
                .attribute(
                    builtins::CREATE,
                    constructor(|class, ctx| {
                        protected_space(ctx, class).unwrap().set("size", 1)?;
                        Ok(())
                    }),
                ),
        )
        .unwrap();
    runtime
        .define(
            ClassDefinition::new("widget", 2)
                .inherits("widget", 1)
                .attribute(
                    builtins::CREATE,
                    constructor(|class, ctx| {
                        let protected = ctx.namespace(builtins::PROTECTED).unwrap();
                        assert!(protected.contains("widget:1"));
                        protected_space(ctx, class).unwrap().set("size", 2)?;

                        let statics = ctx.namespace(builtins::STATIC).unwrap();
                        assert!(statics.contains("widget:1"));
                        assert!(statics.contains("widget:2"));
                        Ok(())
                    }),
                ),
        )
        .unwrap();

    let widget = runtime
        .instantiate(&ClassId::new("widget", 2), Attributes::new())
        .unwrap();
    assert!(widget.is_frozen());
    assert_eq!(
        runtime
            .store()
            .get_static(&ClassId::new("widget", 1))
            .and_then(|ns| ns.get("revision")),
        Some(Value::Int(1))
    );
}

// ============================================================================
// Static Data Tests
// ============================================================================

#[test]
fn test_static_data_is_computed_once() {
    let runtime = runtime();
    let mut initial = Attributes::new();
    initial.insert("created".to_string(), Value::Int(0));

    runtime
        .define(
            ClassDefinition::new("tracked", 1)
                .inherits_id(inheritable_id())
                .attribute(builtins::STATIC, initial)
                .attribute(
                    builtins::CREATE,
                    constructor(|class, ctx| {
                        let own = static_space(ctx, class).unwrap();
                        let created = own.get("created").and_then(|v| v.as_int()).unwrap_or(0);
                        own.set("created", created + 1)?;
                        Ok(())
                    }),
                ),
        )
        .unwrap();
    runtime
        .define(ClassDefinition::new("subtracked", 1).inherits("tracked", 1))
        .unwrap();

    for _ in 0..3 {
        new(&runtime, "tracked").unwrap();
    }
    for _ in 0..2 {
        new(&runtime, "subtracked").unwrap();
    }

    let tracked = runtime
        .store()
        .get_static(&ClassId::new("tracked", 1))
        .unwrap();
    assert_eq!(tracked.get("created"), Some(Value::Int(5)));

    // inheritable, tracked and subtracked each have one entry
    assert_eq!(runtime.store().static_count(), 3);
}

#[test]
fn test_static_compute_runs_once_across_descendants() {
    let runtime = runtime();
    let computed = Arc::new(AtomicUsize::new(0));
    let counter = computed.clone();

    // Reads the parent's static data through the store on every instantiation
    let reader = Extension::builder("reader")
        .shared_modifiers(move |ctx| {
            let counter = counter.clone();
            ctx.runtime()
                .store()
                .get_or_compute_static(&ClassId::new("shared-data", 1), move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, EngineError>(Namespace::new())
                })?;
            Ok(None)
        })
        .build();

    runtime
        .define(
            ClassDefinition::new("parent", 1)
                .inherits_id(inheritable_id())
                .extension(reader),
        )
        .unwrap();
    runtime
        .define(ClassDefinition::new("child", 1).inherits("parent", 1))
        .unwrap();

    for name in ["parent", "child", "parent", "child"] {
        new(&runtime, name).unwrap();
    }
    assert_eq!(computed.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Options Tests
// ============================================================================

#[test]
fn test_runtime_without_builtins() {
    let runtime = Runtime::with_options(RuntimeOptions::default().with_builtins(false)).unwrap();
    assert_eq!(runtime.class_count(), 0);

    let err = runtime
        .define(ClassDefinition::new("lonely", 1).inherits_id(inheritable_id()))
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownParent { .. }));
}

#[test]
fn test_builtins_per_runtime() {
    let first = runtime();
    let second = runtime();

    first
        .define(
            ClassDefinition::new("solo", 1)
                .inherits_id(inheritable_id())
                .attribute(builtins::SINGLETON, true),
        )
        .unwrap();
    second
        .define(
            ClassDefinition::new("solo", 1)
                .inherits_id(inheritable_id())
                .attribute(builtins::SINGLETON, true),
        )
        .unwrap();

    let a = new(&first, "solo").unwrap();
    let b = new(&second, "solo").unwrap();
    assert_ne!(a, b);
}
