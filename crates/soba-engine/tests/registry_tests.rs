use soba_engine::registry::linearize;
use soba_engine::{Attributes, ClassDefinition, ClassId, EngineError, ErrorKind, Extension, Runtime};

fn names(ids: &[ClassId]) -> Vec<&str> {
    ids.iter().map(|id| id.name()).collect()
}

// ============================================================================
// Linearization Tests
// ============================================================================

#[test]
fn test_diamond_linearization() {
    let runtime = Runtime::bare();
    runtime.define(ClassDefinition::new("top", 1)).unwrap();
    runtime
        .define(ClassDefinition::new("left", 1).inherits("top", 1))
        .unwrap();
    runtime
        .define(ClassDefinition::new("right", 1).inherits("top", 1))
        .unwrap();
    runtime
        .define(
            ClassDefinition::new("bottom", 1)
                .inherits("left", 1)
                .inherits("right", 1),
        )
        .unwrap();

    let bottom = ClassId::new("bottom", 1);
    let order = runtime.linearize(&bottom).unwrap();
    assert_eq!(names(&order), vec!["top", "left", "right", "bottom"]);

    // Linearizing twice gives the same sequence
    assert_eq!(runtime.linearize(&bottom).unwrap(), order);

    let represented = runtime.represented_classes(&bottom).unwrap();
    let represented_ids: Vec<ClassId> = represented.iter().map(|d| d.id().clone()).collect();
    assert_eq!(represented_ids, order);
}

#[test]
fn test_every_class_follows_its_parents() {
    let runtime = Runtime::bare();
    runtime.define(ClassDefinition::new("a", 1)).unwrap();
    runtime.define(ClassDefinition::new("b", 1)).unwrap();
    runtime
        .define(ClassDefinition::new("c", 1).inherits("a", 1).inherits("b", 1))
        .unwrap();
    runtime
        .define(ClassDefinition::new("d", 1).inherits("b", 1))
        .unwrap();
    runtime
        .define(ClassDefinition::new("e", 1).inherits("d", 1).inherits("c", 1))
        .unwrap();

    let order = runtime.linearize(&ClassId::new("e", 1)).unwrap();
    for (position, id) in order.iter().enumerate() {
        let description = runtime.resolve(id).unwrap();
        for parent in description.inherits_from() {
            let parent_position = order.iter().position(|c| c == parent).unwrap();
            assert!(parent_position < position, "{} must precede {}", parent, id);
        }
    }
    assert_eq!(order.len(), 5);
}

#[test]
fn test_cycle_in_foreign_graph() {
    let edges = |id: &ClassId| -> Option<Vec<ClassId>> {
        match id.name() {
            "x" => Some(vec![ClassId::new("y", 1)]),
            "y" => Some(vec![ClassId::new("z", 1)]),
            "z" => Some(vec![ClassId::new("x", 1)]),
            _ => None,
        }
    };

    let err = linearize(&ClassId::new("x", 1), edges).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CyclicInheritance);
    assert_eq!(err.to_string(), "Cyclic inheritance detected: x:1 -> y:1 -> z:1 -> x:1");
}

#[test]
fn test_self_inheritance_is_cyclic() {
    let runtime = Runtime::bare();
    let err = runtime
        .define(ClassDefinition::new("ouroboros", 1).inherits("ouroboros", 1))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CyclicInheritance);
}

// ============================================================================
// Registration Error Tests
// ============================================================================

#[test]
fn test_registration_error_kinds() {
    let runtime = Runtime::bare();
    runtime.define(ClassDefinition::new("base", 1)).unwrap();

    let duplicate = runtime.define(ClassDefinition::new("base", 1)).unwrap_err();
    assert_eq!(duplicate.kind(), ErrorKind::Registration);

    let unknown = runtime
        .define(ClassDefinition::new("child", 1).inherits("nope", 1))
        .unwrap_err();
    assert_eq!(unknown.kind(), ErrorKind::Registration);

    let malformed = runtime.define(ClassDefinition::new("", 1)).unwrap_err();
    assert_eq!(malformed.kind(), ErrorKind::Validation);

    let no_version = runtime.define(ClassDefinition::new("zero", 0)).unwrap_err();
    assert_eq!(no_version.kind(), ErrorKind::Validation);

    let twice = runtime
        .define(ClassDefinition::new("twice", 1).inherits("base", 1).inherits("base", 1))
        .unwrap_err();
    assert_eq!(twice.kind(), ErrorKind::Validation);

    let missing = runtime.resolve_key("ghost:1").unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::NotFound);

    assert_eq!(runtime.class_count(), 1);
}

#[test]
fn test_resolve_key_rejects_malformed() {
    let runtime = Runtime::bare();
    for key in ["base", "base:", "base:x", ":1", "base:0"] {
        let err = runtime.resolve_key(key).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "key {:?}", key);
    }
}

// ============================================================================
// Extension Composition Tests
// ============================================================================

#[test]
fn test_conflicting_extension_names() {
    let runtime = Runtime::bare();
    runtime
        .define(ClassDefinition::new("base", 1).extension(Extension::builder("x").build()))
        .unwrap();

    let err = runtime
        .define(
            ClassDefinition::new("derived", 1)
                .inherits("base", 1)
                .extension(Extension::builder("x").build()),
        )
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Registration);
    match &err {
        EngineError::ExtensionConflict {
            name,
            existing,
            declared_by,
            ..
        } => {
            assert_eq!(name, "x");
            assert_eq!(existing, &ClassId::new("base", 1));
            assert_eq!(declared_by, &ClassId::new("derived", 1));
        }
        other => panic!("Expected extension conflict, got {:?}", other),
    }
    assert!(err.to_string().contains("'x'"));
    assert!(runtime.resolve_key("derived:1").is_err());
}

#[test]
fn test_shared_extension_through_two_paths() {
    let runtime = Runtime::bare();
    let events = Extension::builder("events").build();

    runtime
        .define(ClassDefinition::new("left", 1).extension(events.clone()))
        .unwrap();
    runtime
        .define(ClassDefinition::new("right", 1).extension(events.clone()))
        .unwrap();
    let bottom = runtime
        .define(
            ClassDefinition::new("bottom", 1)
                .inherits("left", 1)
                .inherits("right", 1),
        )
        .unwrap();

    assert_eq!(bottom.extensions().len(), 1);
    assert_eq!(bottom.extensions()[0].declared_by(), &ClassId::new("left", 1));
    assert!(bottom.extensions()[0].extension().ptr_eq(&events));

    runtime
        .instantiate(bottom.id(), Attributes::new())
        .unwrap();
}

#[test]
fn test_merged_extensions_are_parent_first() {
    let runtime = Runtime::bare();
    runtime
        .define(
            ClassDefinition::new("base", 1)
                .extension(Extension::builder("a").build())
                .extension(Extension::builder("b").build()),
        )
        .unwrap();
    let derived = runtime
        .define(
            ClassDefinition::new("derived", 1)
                .inherits("base", 1)
                .extension(Extension::builder("c").build()),
        )
        .unwrap();

    let merged: Vec<&str> = derived.extensions().iter().map(|e| e.name()).collect();
    assert_eq!(merged, vec!["a", "b", "c"]);
    assert_eq!(derived.own_extensions().len(), 1);
    assert!(derived.has_extension("a"));
    assert!(runtime.is_subclass_of(derived.id(), &ClassId::new("base", 1)));
}
