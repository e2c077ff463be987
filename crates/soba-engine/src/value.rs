//! Dynamic values carried by attributes, contexts and instance members

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::class::ClassDescription;
use crate::instance::Instance;
use crate::namespace::Namespace;

/// String-keyed value table (attributes, initial values)
pub type Attributes = BTreeMap<String, Value>;

/// Nesting limit for [`Value::to_json`]; namespaces may refer to themselves
const JSON_DEPTH_LIMIT: usize = 32;

/// Callable member value
#[derive(Clone)]
pub struct Function(Arc<dyn Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync>);

impl Function {
    /// Wrap a closure
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Function(Arc::new(f))
    }

    /// Invoke with arguments
    pub fn call(&self, args: &[Value]) -> anyhow::Result<Value> {
        (self.0)(args)
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Function) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}

/// Dynamic value
#[derive(Clone, Default)]
pub enum Value {
    /// Absent / null
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// String
    Str(String),
    /// Ordered list
    List(Vec<Value>),
    /// String-keyed table (plain data, copied on clone)
    Map(Attributes),
    /// Shared, freezable member table
    Namespace(Namespace),
    /// Constructed instance
    Instance(Instance),
    /// Registered class description
    Class(Arc<ClassDescription>),
    /// Callable
    Function(Function),
    /// Opaque native payload
    Native(Arc<dyn Any + Send + Sync>),
}

impl Value {
    /// Wrap a native payload
    pub fn native<T: Any + Send + Sync>(value: T) -> Self {
        Value::Native(Arc::new(value))
    }

    /// Check if this is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Loose truthiness: null, false, zero, NaN and "" are false
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0 && !f.is_nan(),
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as float (integers widen)
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get as list
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Get as map
    pub fn as_map(&self) -> Option<&Attributes> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Get as namespace
    pub fn as_namespace(&self) -> Option<&Namespace> {
        match self {
            Value::Namespace(ns) => Some(ns),
            _ => None,
        }
    }

    /// Get as instance
    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    /// Get as class description
    pub fn as_class(&self) -> Option<&Arc<ClassDescription>> {
        match self {
            Value::Class(class) => Some(class),
            _ => None,
        }
    }

    /// Get as function
    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Downcast a native payload
    pub fn downcast_native<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Native(payload) => (**payload).downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Short name of the variant, for messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Namespace(_) => "namespace",
            Value::Instance(_) => "instance",
            Value::Class(_) => "class",
            Value::Function(_) => "function",
            Value::Native(_) => "native",
        }
    }

    /// Render as JSON. Non-data values become descriptive strings.
    pub fn to_json(&self) -> serde_json::Value {
        self.to_json_at(0)
    }

    fn to_json_at(&self, depth: usize) -> serde_json::Value {
        use serde_json::Value as Json;

        if depth > JSON_DEPTH_LIMIT {
            return Json::String("<...>".to_string());
        }
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Str(s) => Json::String(s.clone()),
            Value::List(items) => {
                Json::Array(items.iter().map(|v| v.to_json_at(depth + 1)).collect())
            }
            Value::Map(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json_at(depth + 1)))
                    .collect(),
            ),
            Value::Namespace(ns) => Json::Object(
                ns.snapshot()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json_at(depth + 1)))
                    .collect(),
            ),
            Value::Instance(instance) => {
                Json::String(format!("<instance #{} of {}>", instance.id(), instance.class_id()))
            }
            Value::Class(class) => Json::String(format!("<class {}>", class.id())),
            Value::Function(_) => Json::String("<function>".to_string()),
            Value::Native(_) => Json::String("<native>".to_string()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Int(i) => write!(f, "Int({})", i),
            Value::Float(x) => write!(f, "Float({})", x),
            Value::Str(s) => write!(f, "Str({:?})", s),
            Value::List(items) => f.debug_list().entries(items).finish(),
            Value::Map(map) => f.debug_map().entries(map).finish(),
            Value::Namespace(ns) => write!(f, "{:?}", ns),
            Value::Instance(instance) => write!(f, "{:?}", instance),
            Value::Class(class) => write!(f, "Class({})", class.id()),
            Value::Function(func) => write!(f, "{:?}", func),
            Value::Native(_) => write!(f, "Native"),
        }
    }
}

/// Data variants compare structurally, shared handles by identity
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Namespace(a), Value::Namespace(b)) => a.ptr_eq(b),
            (Value::Instance(a), Value::Instance(b)) => a == b,
            (Value::Class(a), Value::Class(b)) => Arc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Native(a), Value::Native(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Attributes> for Value {
    fn from(map: Attributes) -> Self {
        Value::Map(map)
    }
}

impl From<Namespace> for Value {
    fn from(ns: Namespace) -> Self {
        Value::Namespace(ns)
    }
}

impl From<Instance> for Value {
    fn from(instance: Instance) -> Self {
        Value::Instance(instance)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            Json::String(s) => Value::Str(s),
            Json::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}
