//! # Marshalling
//!
//! Converts [`Value`]s to payload text relative to a [`TransportContext`], and back.
//!
//! ## Format
//!
//! - **Plain data**: JSON literal (`null`, booleans, numbers, strings, arrays, objects).
//! - **Shared references**: `{"$shared": <handle>}`, resolved against the context.
//!
//! Classification is checked in that order: shared first, then plain data,
//! anything else is rejected.

use serde_json::Map;
use serde_json::Number;
use serde_json::Value as Json;

use crate::context::Handle;
use crate::context::TransportContext;
use crate::error::Error;
use crate::error::Result;
use crate::value::Value;

/// Object key reserved for handle tokens.
pub const SHARED_KEY: &str = "$shared";

/// Default limit on array/object nesting.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Highest nesting limit a [`JsonCodec`] accepts.
///
/// serde_json refuses payloads with 128 or more nested containers, and a
/// handle token at the deepest level adds one more.
pub const MAX_DEPTH_LIMIT: usize = 126;

/// Encodes values for transport and decodes them back.
///
/// Object-safe so a zone can hold `Arc<dyn Codec>`.
pub trait Codec: Send + Sync {
    /// Encodes `value`, registering any shared references in `context`.
    fn marshall(&self, value: &Value, context: &mut TransportContext) -> Result<String>;

    /// Decodes `payload`, resolving handle tokens against `context`.
    ///
    /// Must be deterministic for a given `(payload, context)` pair.
    fn unmarshall(&self, payload: &str, context: &TransportContext) -> Result<Value>;

    /// Renders plain values as a JSON array, without a transport context.
    ///
    /// Shared references and functions are rejected.
    fn encode_plain(&self, values: &[Value]) -> Result<String> {
        let mut scratch = TransportContext::new();
        let mut items = Vec::with_capacity(values.len());
        for value in values {
            items.push(self.marshall(value, &mut scratch)?);
            if !scratch.is_empty() {
                return Err(Error::UnsupportedValue(
                    "shared references cannot be rendered as plain data".into(),
                ));
            }
        }
        Ok(format!("[{}]", items.join(",")))
    }
}

/// The default JSON marshaller.
#[derive(Clone, Debug)]
pub struct JsonCodec {
    max_depth: usize,
}

impl JsonCodec {
    pub fn new() -> Self {
        Self { max_depth: DEFAULT_MAX_DEPTH }
    }

    /// Sets the nesting limit beyond which values are rejected.
    ///
    /// Clamped to [`MAX_DEPTH_LIMIT`] so every accepted value also decodes.
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth: max_depth.min(MAX_DEPTH_LIMIT) }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    fn to_json(&self, value: &Value, context: Option<&mut TransportContext>, depth: usize) -> Result<Json> {
        if depth > self.max_depth {
            return Err(Error::UnsupportedValue(format!(
                "nesting exceeds depth limit of {}",
                self.max_depth
            )));
        }

        let json = match value {
            Value::Shared(shared) => {
                let Some(context) = context else {
                    return Err(Error::UnsupportedValue(format!(
                        "shared reference ({}) needs a transport context",
                        shared.type_name()
                    )));
                };
                let handle = context.register_shared(shared);
                let mut token = Map::new();
                token.insert(SHARED_KEY.to_string(), Json::from(handle.0));
                Json::Object(token)
            }
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::Number(Number::from(*i)),
            Value::Float(f) => {
                let n = Number::from_f64(*f).ok_or_else(|| {
                    Error::UnsupportedValue(format!("non-finite number {}", f))
                })?;
                Json::Number(n)
            }
            Value::String(s) => Json::String(s.clone()),
            Value::Array(items) => {
                let mut context = context;
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.to_json(item, context.as_deref_mut(), depth + 1)?);
                }
                Json::Array(out)
            }
            Value::Object(fields) => {
                if fields.contains_key(SHARED_KEY) {
                    return Err(Error::UnsupportedValue(format!(
                        "object key '{}' is reserved for handle references",
                        SHARED_KEY
                    )));
                }
                let mut context = context;
                let mut out = Map::with_capacity(fields.len());
                for (key, item) in fields {
                    out.insert(key.clone(), self.to_json(item, context.as_deref_mut(), depth + 1)?);
                }
                Json::Object(out)
            }
            Value::Function(_) => {
                return Err(Error::UnsupportedValue(
                    "function literals cannot be marshalled as arguments".into(),
                ));
            }
        };

        Ok(json)
    }

    fn from_json(&self, json: Json, context: &TransportContext, depth: usize) -> Result<Value> {
        if depth > self.max_depth {
            return Err(Error::MalformedPayload(format!(
                "nesting exceeds depth limit of {}",
                self.max_depth
            )));
        }

        let value = match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().ok_or_else(|| {
                    Error::MalformedPayload(format!("number {} is out of range", n))
                })?),
            },
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.from_json(item, context, depth + 1))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Json::Object(fields) => {
                if let Some(token) = fields.get(SHARED_KEY) {
                    let handle = token
                        .as_u64()
                        .filter(|_| fields.len() == 1)
                        .ok_or_else(|| Error::MalformedPayload(format!("invalid handle token {}", token)))?;
                    return context.resolve(Handle(handle)).map(Value::Shared);
                }
                Value::Object(
                    fields
                        .into_iter()
                        .map(|(k, v)| self.from_json(v, context, depth + 1).map(|v| (k, v)))
                        .collect::<Result<_>>()?,
                )
            }
        };

        Ok(value)
    }
}

impl Default for JsonCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for JsonCodec {
    fn marshall(&self, value: &Value, context: &mut TransportContext) -> Result<String> {
        let json = self.to_json(value, Some(context), 0)?;
        Ok(serde_json::to_string(&json)?)
    }

    fn unmarshall(&self, payload: &str, context: &TransportContext) -> Result<Value> {
        let json: Json = serde_json::from_str(payload)?;
        self.from_json(json, context, 0)
    }

    fn encode_plain(&self, values: &[Value]) -> Result<String> {
        let items = values
            .iter()
            .map(|v| self.to_json(v, None, 0))
            .collect::<Result<Vec<_>>>()?;
        Ok(serde_json::to_string(&Json::Array(items))?)
    }
}

/// Marshalls `value` with the default codec.
pub fn marshall(value: &Value, context: &mut TransportContext) -> Result<String> {
    JsonCodec::new().marshall(value, context)
}

/// Unmarshalls `payload` with the default codec.
pub fn unmarshall(payload: &str, context: &TransportContext) -> Result<Value> {
    JsonCodec::new().unmarshall(payload, context)
}

/// Renders plain values with the default codec. See [`Codec::encode_plain`].
pub fn encode_plain(values: &[Value]) -> Result<String> {
    JsonCodec::new().encode_plain(values)
}
