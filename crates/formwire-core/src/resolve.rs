//! Payload ingestion: flat entries → value tree + intent + state + fields.

use std::collections::{BTreeMap, BTreeSet};

use formwire_path::{decode, encode, PathKey};
use tracing::{debug, trace};

use crate::error::ResolveError;
use crate::intent::{Intent, INTENT_FIELD, STATE_FIELD};
use crate::state::FormState;
use crate::value::{self, FileUpload, FormValue};

/// One submitted value: text, or file metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadValue {
    Text(String),
    File(FileUpload),
}

/// An ordered multi-map of submitted `(name, value)` entries — the
/// `FormData`-equivalent input to resolution. Entry order is submission
/// order and is significant (repeated keys accumulate in it).
#[derive(Debug, Clone, Default)]
pub struct Payload {
    entries: Vec<(String, PayloadValue)>,
}

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries
            .push((name.into(), PayloadValue::Text(value.into())));
    }

    pub fn append_file(&mut self, name: impl Into<String>, file: FileUpload) {
        self.entries.push((name.into(), PayloadValue::File(file)));
    }

    /// Parse an `application/x-www-form-urlencoded` body or query string.
    pub fn from_urlencoded(query: &str) -> Self {
        let mut payload = Self::new();
        for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
            payload.append(name.into_owned(), value.into_owned());
        }
        payload
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &PayloadValue)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The output of [`resolve`]: everything downstream stages need.
#[derive(Debug, Clone)]
pub struct ResolvedForm {
    /// The reconstructed value tree; always a map at the root.
    pub data: FormValue,
    /// The decoded intent, `None` for a plain submit.
    pub intent: Option<Intent>,
    /// The previous round-trip's state, empty on a first submission.
    pub state: FormState,
    /// Field names present in the payload, deduplicated, in submission order.
    /// Reserved fields and unnamed entries are excluded.
    pub fields: Vec<String>,
    /// Names that resolved to list-typed values in this payload (repeated
    /// keys and every prefix an array index descends through).
    pub list_fields: BTreeSet<String>,
}

/// Resolve a raw payload into a [`ResolvedForm`].
///
/// Reserved fields: [`INTENT_FIELD`] carries the intent descriptor,
/// [`STATE_FIELD`] the previous [`FormState`] as JSON. Both are excluded from
/// the value tree and the field list. A duplicate of either is
/// [`ResolveError::MalformedPayload`] — a real submitter appends them once.
pub fn resolve(payload: &Payload) -> Result<ResolvedForm, ResolveError> {
    let mut root = BTreeMap::new();
    let mut intent: Option<Intent> = None;
    let mut state: Option<FormState> = None;
    let mut fields: Vec<String> = Vec::new();
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut list_fields: BTreeSet<String> = BTreeSet::new();

    for (name, value) in payload.entries() {
        if name.is_empty() {
            trace!("skipping unnamed payload entry");
            continue;
        }

        if name == INTENT_FIELD {
            let raw = expect_text(value, INTENT_FIELD)?;
            if intent.is_some() {
                return Err(duplicate(INTENT_FIELD));
            }
            intent = Some(Intent::decode(raw)?);
            continue;
        }

        if name == STATE_FIELD {
            let raw = expect_text(value, STATE_FIELD)?;
            if state.is_some() {
                return Err(duplicate(STATE_FIELD));
            }
            state = Some(serde_json::from_str(raw).map_err(|err| {
                ResolveError::MalformedPayload {
                    field: STATE_FIELD,
                    message: err.to_string(),
                }
            })?);
            continue;
        }

        let path = decode(name)?;
        if path.is_empty() {
            continue;
        }

        // Every prefix an index descends through is a list field; so is a
        // plain name that repeats.
        for (position, key) in path.iter().enumerate() {
            if matches!(key, PathKey::Index(_)) {
                list_fields.insert(encode(&path[..position]));
            }
        }
        if seen.insert(name) {
            fields.push(name.to_string());
        } else {
            list_fields.insert(name.to_string());
        }

        let leaf = match value {
            PayloadValue::Text(text) => FormValue::Text(text.clone()),
            PayloadValue::File(file) => FormValue::File(file.clone()),
        };
        value::insert_root(&mut root, name, &path, leaf)?;
    }

    let resolved = ResolvedForm {
        data: FormValue::Map(root),
        intent,
        state: state.unwrap_or_default(),
        fields,
        list_fields,
    };
    debug!(
        fields = resolved.fields.len(),
        intent = ?resolved.intent,
        "resolved form payload"
    );
    Ok(resolved)
}

fn expect_text<'a>(
    value: &'a PayloadValue,
    field: &'static str,
) -> Result<&'a str, ResolveError> {
    match value {
        PayloadValue::Text(text) => Ok(text),
        PayloadValue::File(_) => Err(ResolveError::MalformedPayload {
            field,
            message: "expected a text value, found a file".to_string(),
        }),
    }
}

fn duplicate(field: &'static str) -> ResolveError {
    ResolveError::MalformedPayload {
        field,
        message: "duplicate entry".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_tree_fields_and_intent() {
        let mut payload = Payload::new();
        payload.append("email", "ada@example.com");
        payload.append("items[0].name", "socks");
        payload.append("__intent__", "validate/email");

        let form = resolve(&payload).unwrap();
        assert_eq!(
            form.intent,
            Some(Intent::Validate {
                name: Some("email".into())
            })
        );
        assert_eq!(form.fields, vec!["email", "items[0].name"]);
        assert!(form.list_fields.contains("items"));
        assert_eq!(
            form.data.at(&decode("email").unwrap()),
            Some(&FormValue::text("ada@example.com"))
        );
    }

    #[test]
    fn plain_submit_has_no_intent() {
        let mut payload = Payload::new();
        payload.append("name", "ada");
        let form = resolve(&payload).unwrap();
        assert_eq!(form.intent, None);
        assert_eq!(form.state, FormState::default());
    }

    #[test]
    fn reserved_fields_never_reach_the_tree() {
        let mut payload = Payload::new();
        payload.append("__intent__", "validate");
        payload.append("__state__", r#"{"validated":{"email":true}}"#);
        payload.append("email", "a@b.c");

        let form = resolve(&payload).unwrap();
        assert_eq!(form.fields, vec!["email"]);
        assert!(form.data.at(&decode("__intent__").unwrap()).is_none());
        assert!(form.data.at(&decode("__state__").unwrap()).is_none());
        assert!(form.state.is_validated("email"));
    }

    #[test]
    fn duplicate_intent_is_malformed() {
        let mut payload = Payload::new();
        payload.append("__intent__", "validate");
        payload.append("__intent__", "validate");
        let err = resolve(&payload).unwrap_err();
        assert!(matches!(err, ResolveError::MalformedPayload { field, .. } if field == "__intent__"));
    }

    #[test]
    fn undecodable_state_is_malformed() {
        let mut payload = Payload::new();
        payload.append("__state__", "not json");
        let err = resolve(&payload).unwrap_err();
        assert!(matches!(err, ResolveError::MalformedPayload { field, .. } if field == "__state__"));
    }

    #[test]
    fn unnamed_entries_are_skipped() {
        let mut payload = Payload::new();
        payload.append("", "ignored");
        payload.append("name", "ada");
        let form = resolve(&payload).unwrap();
        assert_eq!(form.fields, vec!["name"]);
    }

    #[test]
    fn repeated_keys_become_list_fields() {
        let payload = Payload::from_urlencoded("tags=a&tags=b&title=x");
        let form = resolve(&payload).unwrap();
        assert!(form.list_fields.contains("tags"));
        assert!(!form.list_fields.contains("title"));
        assert_eq!(form.fields, vec!["tags", "title"]);
    }

    #[test]
    fn file_values_enter_the_tree_but_not_reserved_fields() {
        let upload = FileUpload {
            name: "me.png".into(),
            content_type: Some("image/png".into()),
            size: 1024,
        };
        let mut payload = Payload::new();
        payload.append_file("avatar", upload.clone());
        let form = resolve(&payload).unwrap();
        assert_eq!(
            form.data.at(&decode("avatar").unwrap()),
            Some(&FormValue::File(upload.clone()))
        );

        let mut payload = Payload::new();
        payload.append_file(INTENT_FIELD, upload);
        let err = resolve(&payload).unwrap_err();
        assert!(matches!(err, ResolveError::MalformedPayload { .. }));
    }

    #[test]
    fn urlencoded_payloads_decode_percent_escapes() {
        let payload = Payload::from_urlencoded("email=ada%40example.com&note=a+b");
        let form = resolve(&payload).unwrap();
        assert_eq!(
            form.data.at(&decode("email").unwrap()),
            Some(&FormValue::text("ada@example.com"))
        );
        assert_eq!(
            form.data.at(&decode("note").unwrap()),
            Some(&FormValue::text("a b"))
        );
    }
}
