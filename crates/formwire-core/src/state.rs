//! Persisted form state, round-tripped between server and client.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// State the protocol carries across submissions.
///
/// `validated` tracks which field names have been explicitly validated and
/// controls progressive error surfacing: a pending submission only reports
/// errors for validated fields. `list_keys` gives every list field a stable
/// ordered sequence of opaque keys, so removing or reordering one item never
/// disturbs the identity of its neighbours.
///
/// Created empty on the first submission, changed only by
/// [`apply_intent`](crate::handler::apply_intent) (which returns a new value,
/// never mutates), serialized into
/// [`SubmissionResult::state`](crate::submission::SubmissionResult) and
/// restored from the reserved state field on the next round-trip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormState {
    #[serde(default)]
    pub validated: BTreeMap<String, bool>,
    #[serde(default)]
    pub list_keys: BTreeMap<String, Vec<String>>,
}

impl FormState {
    pub fn is_validated(&self, name: &str) -> bool {
        self.validated.get(name).copied().unwrap_or(false)
    }
}
