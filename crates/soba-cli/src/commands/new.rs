//! `soba new`: Register a manifest and build instances of one class.

use std::path::PathBuf;

use anyhow::Context;
use soba_engine::{Attributes, ClassId, Runtime, Value};

use crate::manifest::Manifest;
use crate::output::StyledOutput;

/// Arguments for the new command.
pub struct NewArgs {
    pub manifest: PathBuf,
    pub class: String,
    pub count: usize,
    pub set: Vec<String>,
    pub implicit_base: bool,
}

pub fn execute(runtime: &Runtime, args: NewArgs, out: &mut StyledOutput) -> anyhow::Result<()> {
    Manifest::from_file(&args.manifest)?.register(runtime, args.implicit_base)?;

    let id: ClassId = args.class.parse()?;
    let initial = parse_initial_values(&args.set)?;

    for _ in 0..args.count {
        let instance = runtime
            .instantiate(&id, initial.clone())
            .with_context(|| format!("Failed to instantiate {}", id))?;

        out.instance(instance.id(), &instance.class_id().to_string());
        let members = Value::Map(instance.members().snapshot()).to_json();
        out.field("members", &members.to_string());
    }

    for class in runtime.represented_classes(&id)? {
        if let Some(statics) = runtime.store().get_static(class.id()) {
            let data = Value::Namespace(statics).to_json();
            out.field(&format!("static {}", class.id()), &data.to_string());
        }
    }
    out.flush();
    Ok(())
}

/// Parse `key=value` pairs; values are JSON when they parse as JSON,
/// strings otherwise
pub fn parse_initial_values(pairs: &[String]) -> anyhow::Result<Attributes> {
    let mut values = Attributes::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .with_context(|| format!("Expected key=value, got '{}'", pair))?;
        if key.is_empty() {
            anyhow::bail!("Empty key in '{}'", pair);
        }
        let json = serde_json::from_str::<serde_json::Value>(raw)
            .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
        values.insert(key.to_string(), Value::from(json));
    }
    Ok(values)
}
