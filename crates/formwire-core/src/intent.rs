//! The intent descriptor and its wire codec.
//!
//! An intent is an out-of-band signal embedded in a submission: "validate one
//! field" or "mutate a list" rather than a final submit. It rides in a single
//! reserved field whose value is `kind` or `kind/payload`:
//!
//! ```text
//! validate                     validate every field in the payload
//! validate/email               validate the `email` field only
//! list.insert/{"name":"items"}             append a generated key
//! list.insert/{"name":"items","key":"k9"}  append a caller-chosen key
//! list.remove/{"name":"items","key":"k2"}
//! list.reorder/{"name":"items","from":2,"to":0}
//! ```
//!
//! New intent kinds are additions to this tag set, not new parsing branches
//! scattered through the handler.

use serde::{Deserialize, Serialize};

use crate::error::ResolveError;

/// Reserved payload field carrying the serialized intent descriptor.
pub const INTENT_FIELD: &str = "__intent__";

/// Reserved payload field carrying the previous round-trip's serialized
/// [`FormState`](crate::state::FormState).
pub const STATE_FIELD: &str = "__state__";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Intent {
    /// Validate one field, or every field in the payload when `name` is absent.
    Validate { name: Option<String> },
    /// Append a key to a list field; generated when `key` is absent.
    ListInsert { name: String, key: Option<String> },
    /// Remove a key from a list field, preserving the order of the rest.
    ListRemove { name: String, key: String },
    /// Move the key at `from` to position `to`, shifting the others.
    ListReorder { name: String, from: usize, to: usize },
}

#[derive(Serialize, Deserialize)]
struct InsertPayload {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct RemovePayload {
    name: String,
    key: String,
}

#[derive(Serialize, Deserialize)]
struct ReorderPayload {
    name: String,
    from: usize,
    to: usize,
}

fn malformed(message: impl Into<String>) -> ResolveError {
    ResolveError::MalformedPayload {
        field: INTENT_FIELD,
        message: message.into(),
    }
}

impl Intent {
    /// Serialize into the single-field wire form.
    pub fn encode(&self) -> String {
        match self {
            Intent::Validate { name: None } => "validate".to_string(),
            Intent::Validate { name: Some(name) } => format!("validate/{name}"),
            Intent::ListInsert { name, key } => {
                let payload = InsertPayload {
                    name: name.clone(),
                    key: key.clone(),
                };
                format!(
                    "list.insert/{}",
                    serde_json::to_string(&payload).expect("intent payload serializes")
                )
            }
            Intent::ListRemove { name, key } => {
                let payload = RemovePayload {
                    name: name.clone(),
                    key: key.clone(),
                };
                format!(
                    "list.remove/{}",
                    serde_json::to_string(&payload).expect("intent payload serializes")
                )
            }
            Intent::ListReorder { name, from, to } => {
                let payload = ReorderPayload {
                    name: name.clone(),
                    from: *from,
                    to: *to,
                };
                format!(
                    "list.reorder/{}",
                    serde_json::to_string(&payload).expect("intent payload serializes")
                )
            }
        }
    }

    /// Decode the wire form. Unknown kinds are
    /// [`ResolveError::UnknownIntent`]; a known kind with an undecodable
    /// payload is [`ResolveError::MalformedPayload`].
    pub fn decode(raw: &str) -> Result<Intent, ResolveError> {
        let (kind, payload) = match raw.split_once('/') {
            Some((kind, payload)) => (kind, Some(payload)),
            None => (raw, None),
        };

        match kind {
            "validate" => Ok(Intent::Validate {
                name: payload.filter(|p| !p.is_empty()).map(str::to_string),
            }),
            "list.insert" => {
                let payload: InsertPayload = decode_json(payload)?;
                Ok(Intent::ListInsert {
                    name: payload.name,
                    key: payload.key,
                })
            }
            "list.remove" => {
                let payload: RemovePayload = decode_json(payload)?;
                Ok(Intent::ListRemove {
                    name: payload.name,
                    key: payload.key,
                })
            }
            "list.reorder" => {
                let payload: ReorderPayload = decode_json(payload)?;
                Ok(Intent::ListReorder {
                    name: payload.name,
                    from: payload.from,
                    to: payload.to,
                })
            }
            other => Err(ResolveError::UnknownIntent {
                kind: other.to_string(),
            }),
        }
    }
}

fn decode_json<T: serde::de::DeserializeOwned>(payload: Option<&str>) -> Result<T, ResolveError> {
    let payload = payload.ok_or_else(|| malformed("missing payload"))?;
    serde_json::from_str(payload).map_err(|err| malformed(err.to_string()))
}
