//! Remote value representations

use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Result of an evaluation or call on the remote peer
#[derive(Debug, Clone)]
pub enum RemoteValue {
    /// Boolean, number or string, copied by value
    Primitive(Value),
    /// JavaScript `null`
    Null,
    /// JavaScript `undefined`
    Undefined,
    /// Object living in the peer's memory
    Handle(Arc<RemoteObject>),
}

impl RemoteValue {
    /// True for JavaScript `undefined`
    pub fn is_undefined(&self) -> bool {
        matches!(self, RemoteValue::Undefined)
    }

    /// True for JavaScript `null`
    pub fn is_null(&self) -> bool {
        matches!(self, RemoteValue::Null)
    }

    /// The handle, when this value lives in the peer
    pub fn as_handle(&self) -> Option<&Arc<RemoteObject>> {
        match self {
            RemoteValue::Handle(handle) => Some(handle),
            _ => None,
        }
    }

    /// The primitive value, if any
    pub fn as_primitive(&self) -> Option<&Value> {
        match self {
            RemoteValue::Primitive(value) => Some(value),
            _ => None,
        }
    }

    /// String coercion; `undefined` and `null` become the empty string
    pub fn to_text(&self) -> String {
        match self {
            RemoteValue::Primitive(Value::String(s)) => s.clone(),
            RemoteValue::Primitive(other) => other.to_string(),
            RemoteValue::Null | RemoteValue::Undefined => String::new(),
            RemoteValue::Handle(handle) => handle.description().unwrap_or_default().to_string(),
        }
    }

    /// Numeric coercion; anything that is not a number becomes zero
    pub fn to_f64(&self) -> f64 {
        match self {
            RemoteValue::Primitive(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            RemoteValue::Primitive(Value::Bool(b)) => f64::from(u8::from(*b)),
            RemoteValue::Primitive(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
            _ => 0.0,
        }
    }

    /// Sequence coercion; `undefined` and `null` become the empty sequence
    pub fn to_vec(&self) -> Vec<RemoteValue> {
        match self {
            RemoteValue::Null | RemoteValue::Undefined => Vec::new(),
            other => vec![other.clone()],
        }
    }

    /// Encode as a `Runtime.CallArgument`
    pub fn to_call_argument(&self) -> Value {
        match self {
            RemoteValue::Primitive(value) => json!({ "value": value }),
            RemoteValue::Null => json!({ "value": null }),
            RemoteValue::Undefined => json!({}),
            RemoteValue::Handle(handle) => json!({ "objectId": handle.remote_id() }),
        }
    }
}

impl From<Value> for RemoteValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => RemoteValue::Null,
            other => RemoteValue::Primitive(other),
        }
    }
}

/// A JavaScript object held by the peer and named by an opaque id
#[derive(Debug)]
pub struct RemoteObject {
    remote_id: String,
    group: Option<String>,
    js_type: String,
    subtype: Option<String>,
    class_name: Option<String>,
    description: Option<String>,
    value: Option<Value>,
    raw: Value,
    released: AtomicBool,
}

impl RemoteObject {
    pub(crate) fn new(remote_id: String, group: Option<String>, raw: &Value) -> Self {
        let text = |key: &str| raw.get(key).and_then(|v| v.as_str()).map(str::to_string);

        Self {
            remote_id,
            group,
            js_type: text("type").unwrap_or_else(|| "object".to_string()),
            subtype: text("subtype"),
            class_name: text("className"),
            description: text("description"),
            value: raw.get("value").cloned(),
            raw: raw.clone(),
            released: AtomicBool::new(false),
        }
    }

    /// Identifies this object in the remote debugger
    pub fn remote_id(&self) -> &str {
        &self.remote_id
    }

    /// Name of the owning group; `None` is the anonymous group
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// The JavaScript `typeof`
    pub fn js_type(&self) -> &str {
        &self.js_type
    }

    /// Type hint such as `array`, `node` or `regexp`
    pub fn subtype(&self) -> Option<&str> {
        self.subtype.as_deref()
    }

    /// Class name computed by the peer
    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    /// Console representation
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Primitive value, if the peer sent one
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// The payload this handle was built from
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// True once the peer-side object was released
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_released(&self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// A property of a remote object
#[derive(Debug, Clone)]
pub struct RemoteProperty {
    /// Property name
    pub name: String,
    /// Property value, absent for accessor properties
    pub value: Option<RemoteValue>,
    /// Getter function, for accessor properties
    pub getter: Option<RemoteValue>,
    /// Setter function, for accessor properties
    pub setter: Option<RemoteValue>,
    /// JavaScript code can remove this property
    pub configurable: bool,
    /// JavaScript code can enumerate this property
    pub enumerable: bool,
    /// JavaScript code can change this property's value
    pub writable: bool,
}
