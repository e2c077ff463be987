//! Constructed instances

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::class::{ClassDescription, ClassId};
use crate::error::EngineResult;
use crate::namespace::Namespace;
use crate::value::Value;

/// Global counter for generating unique instance IDs
static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Generate a new unique instance ID
fn generate_instance_id() -> u64 {
    NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed)
}

struct InstanceInner {
    id: u64,
    class: Arc<ClassDescription>,
    members: Namespace,
}

/// An object built by the instance pipeline.
///
/// Its shape is whatever the class's extensions attached to `members`
/// while it was being constructed. Clones share the same instance; equality
/// is identity.
#[derive(Clone)]
pub struct Instance(Arc<InstanceInner>);

impl Instance {
    pub(crate) fn new(class: Arc<ClassDescription>) -> Self {
        Instance(Arc::new(InstanceInner {
            id: generate_instance_id(),
            class,
            members: Namespace::new(),
        }))
    }

    /// Unique instance ID
    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// Description of the class this instance was built from
    pub fn class(&self) -> &Arc<ClassDescription> {
        &self.0.class
    }

    /// Identity of the class this instance was built from
    pub fn class_id(&self) -> &ClassId {
        self.0.class.id()
    }

    /// Member table
    pub fn members(&self) -> &Namespace {
        &self.0.members
    }

    /// Get a member
    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.members.get(key)
    }

    /// Set a member
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> EngineResult<()> {
        self.0.members.set(key, value)
    }

    /// Call a function member
    pub fn call(&self, method: &str, args: &[Value]) -> anyhow::Result<Value> {
        match self.get(method) {
            Some(Value::Function(f)) => f.call(args),
            Some(other) => anyhow::bail!(
                "Member '{}' of {} is a {}, not a function",
                method,
                self.class_id(),
                other.type_name()
            ),
            None => anyhow::bail!("{} has no member '{}'", self.class_id(), method),
        }
    }

    /// Whether construction froze the member table
    pub fn is_frozen(&self) -> bool {
        self.0.members.is_frozen()
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Instance {}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.0.id)
            .field("class", self.0.class.id())
            .field("members", &self.0.members)
            .finish()
    }
}
