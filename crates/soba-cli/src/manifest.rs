//! Class manifest parsing
//!
//! A manifest declares classes as `[[class]]` tables:
//!
//! ```toml
//! [[class]]
//! name = "animal"
//! abstract = true
//! fields = { legs = 4 }
//!
//! [[class]]
//! name = "dog"
//! inherits = ["animal:1"]
//! static = { created = 0 }
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::Deserialize;
use soba_engine::builtins::{self, constructor, inheritable_id, protected_space};
use soba_engine::registry::linearize;
use soba_engine::{Attributes, ClassDefinition, ClassDescription, ClassId, Runtime, Value};

type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Parsed manifest file
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Declared classes, in file order
    #[serde(default, rename = "class")]
    pub classes: Vec<ClassEntry>,
}

/// One `[[class]]` table
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ClassEntry {
    /// Class name
    pub name: String,

    /// Class version
    #[serde(default = "default_version")]
    pub version: u32,

    /// Parents as `name:version` keys, in order
    #[serde(default)]
    pub inherits: Vec<String>,

    /// Class can only be inherited
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,

    /// Class has one shared instance
    #[serde(default)]
    pub singleton: bool,

    /// Initial static data
    #[serde(default, rename = "static")]
    pub statics: Option<JsonMap>,

    /// Instance fields with defaults, overridable by initial values
    #[serde(default)]
    pub fields: JsonMap,
}

fn default_version() -> u32 {
    1
}

impl Manifest {
    /// Load manifest from file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid manifest {}", path.display()))
    }

    /// Parse manifest from TOML
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let manifest: Manifest = toml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let mut seen = HashSet::new();
        for entry in &self.classes {
            let id = entry.id();
            id.validate()?;
            if !seen.insert(id.clone()) {
                anyhow::bail!("Class {} is declared twice", id);
            }
            entry.parents()?;
        }
        Ok(())
    }

    /// Register every class, parents before children.
    ///
    /// Parents may come later in the file or be registered already. With
    /// `implicit_base`, classes without parents inherit `inheritable:1`.
    pub fn register(
        &self,
        runtime: &Runtime,
        implicit_base: bool,
    ) -> anyhow::Result<Vec<Arc<ClassDescription>>> {
        let mut entries: HashMap<ClassId, &ClassEntry> = HashMap::new();
        for entry in &self.classes {
            entries.insert(entry.id(), entry);
        }

        let mut defined = Vec::new();
        for entry in &self.classes {
            let order = linearize(&entry.id(), |id| match entries.get(id) {
                Some(entry) => entry.parents_with_base(implicit_base).ok(),
                // Classes outside the manifest must already be registered
                None => runtime.resolve(id).ok().map(|_| Vec::new()),
            })?;

            for id in order {
                let Some(entry) = entries.remove(&id) else {
                    continue;
                };
                let description = runtime
                    .define(entry.to_definition(implicit_base)?)
                    .with_context(|| format!("Failed to define {}", id))?;
                defined.push(description);
            }
        }
        Ok(defined)
    }
}

impl ClassEntry {
    /// Identity of the declared class
    pub fn id(&self) -> ClassId {
        ClassId::new(self.name.clone(), self.version)
    }

    /// Declared parents
    pub fn parents(&self) -> anyhow::Result<Vec<ClassId>> {
        self.inherits
            .iter()
            .map(|key| {
                key.parse::<ClassId>()
                    .with_context(|| format!("Bad parent of {}", self.id()))
            })
            .collect()
    }

    fn parents_with_base(&self, implicit_base: bool) -> anyhow::Result<Vec<ClassId>> {
        let parents = self.parents()?;
        if parents.is_empty() && implicit_base {
            return Ok(vec![inheritable_id()]);
        }
        Ok(parents)
    }

    /// Build the definition handed to the runtime
    pub fn to_definition(&self, implicit_base: bool) -> anyhow::Result<ClassDefinition> {
        let mut definition = ClassDefinition::new(self.name.clone(), self.version);
        for parent in self.parents_with_base(implicit_base)? {
            definition = definition.inherits_id(parent);
        }

        if self.is_abstract {
            definition = definition.attribute(builtins::ABSTRACT, true);
        }
        if self.singleton {
            definition = definition.attribute(builtins::SINGLETON, true);
        }
        if let Some(statics) = &self.statics {
            definition = definition.attribute(builtins::STATIC, json_map(statics));
        }
        if !self.fields.is_empty() {
            definition = definition.attribute(builtins::CREATE, fields_constructor(json_map(&self.fields)));
        }
        Ok(definition)
    }
}

fn json_map(map: &JsonMap) -> Attributes {
    map.iter()
        .map(|(key, value)| (key.clone(), Value::from(value.clone())))
        .collect()
}

/// Constructor copying each field from the initial values, or its default
fn fields_constructor(fields: Attributes) -> Value {
    constructor(move |class, ctx| {
        let initial = ctx.initial_values();
        let private = protected_space(ctx, class);
        for (name, default) in &fields {
            let value = initial.get(name).cloned().unwrap_or_else(|| default.clone());
            ctx.instance().set(name.clone(), value.clone())?;
            if let Some(private) = &private {
                private.set(name.clone(), value)?;
            }
        }
        Ok(())
    })
}
