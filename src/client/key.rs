//! Request signatures.
//!
//! A key is the URL-safe base64 encoding of canonical JSON describing the
//! request. serde_json objects keep their keys sorted, so logically identical
//! requests serialize identically regardless of how their params were built.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::client::Method;

// == Request Key ==
/// Decoded form of a request signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestKey {
    pub endpoint: String,
    /// Uppercased HTTP method
    pub method: String,
    /// Query parameters with null values dropped
    pub params: Value,
    pub body: Value,
}

impl RequestKey {
    pub fn new(endpoint: &str, method: Method, params: &Value, body: &Value) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            method: method.as_str().to_string(),
            params: strip_null_params(params),
            body: body.clone(),
        }
    }

    /// Encodes the signature for `endpoint`, `method`, `params` and `body`.
    pub fn derive(endpoint: &str, method: Method, params: &Value, body: &Value) -> String {
        Self::new(endpoint, method, params, body).encode()
    }

    pub fn encode(&self) -> String {
        // a Value always serializes
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(canonical)
    }

    /// Recovers the parts of a key; None for keys not produced by `encode`.
    pub fn decode(key: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(key).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

/// Drops null-valued top-level params; `{}` and `null` both become `{}`.
fn strip_null_params(params: &Value) -> Value {
    match params {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, value)| !value.is_null())
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        ),
        Value::Null => Value::Object(Map::new()),
        other => other.clone(),
    }
}
