//! Value types for bound statement parameters

use serde::{Deserialize, Serialize};

/// A parameter value carried by conditions and INSERT/UPDATE payloads
///
/// Serialized untagged, so a value travels as the plain JSON it represents.
/// Variant order matters for deserialization: the first variant that accepts
/// the input wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F64(f64),
    F32(f32),
    String(String),
    Array(Vec<Value>),
    Bytes(Vec<u8>),
    /// Arbitrary JSON, bound as text by SQL backends
    Json(serde_json::Value),
}

impl Value {
    /// Convert into a `serde_json::Value`; non-finite floats become null
    pub fn to_json(&self) -> serde_json::Value {
        let float = |f: f64| serde_json::Number::from_f64(f).map_or(serde_json::Value::Null, serde_json::Value::Number);
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => (*b).into(),
            Value::I32(i) => (*i).into(),
            Value::I64(i) => (*i).into(),
            Value::F32(f) => float(f64::from(*f)),
            Value::F64(f) => float(*f),
            Value::String(s) => s.as_str().into(),
            Value::Bytes(bytes) => bytes.iter().copied().map(serde_json::Value::from).collect(),
            Value::Json(json) => json.clone(),
            Value::Array(items) => items.iter().map(Value::to_json).collect(),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(val: $ty) -> Self {
                    Value::$variant(val.into())
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i8 => I32,
    i16 => I32,
    i32 => I32,
    u8 => I32,
    u16 => I32,
    u32 => I64,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    String => String,
    &str => String,
    Vec<u8> => Bytes,
    Vec<Value> => Array,
    serde_json::Value => Json,
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

// Types without a native variant travel in their canonical text form
macro_rules! value_from_display {
    ($($(#[$meta:meta])* $ty:ty => $render:expr),* $(,)?) => {
        $(
            $(#[$meta])*
            impl From<$ty> for Value {
                fn from(val: $ty) -> Self {
                    let render: fn(&$ty) -> String = $render;
                    Value::String(render(&val))
                }
            }
        )*
    };
}

value_from_display! {
    #[cfg(feature = "uuid-support")]
    uuid::Uuid => |id| id.to_string(),
    #[cfg(feature = "datetime-support")]
    chrono::DateTime<chrono::Utc> => |at| at.to_rfc3339(),
    #[cfg(feature = "datetime-support")]
    chrono::NaiveDate => |date| date.to_string(),
    #[cfg(feature = "decimal-support")]
    rust_decimal::Decimal => |amount| amount.to_string(),
}
