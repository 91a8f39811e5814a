//! Intent handling: the `FormState` transition for one submission.
//!
//! Pure by construction: the handler returns a *new* state and leaves the
//! input untouched, so a caller can keep using the previous snapshot while a
//! resolution is in flight (spec'd concurrency model — state is an immutable
//! value at each step). A precondition failure aborts before validation with
//! no partial mutation to roll back.

use tracing::debug;
use uuid::Uuid;

use crate::error::IntentError;
use crate::intent::Intent;
use crate::resolve::ResolvedForm;
use crate::state::FormState;

/// A single observable state change, named by field.
///
/// `prev` is absent when the field was untracked before. Subscribers diff old
/// vs new without re-deriving state; structurally equal prev/next pairs are
/// never emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    Error {
        name: String,
        prev: Option<Vec<String>>,
        next: Vec<String>,
    },
    List {
        name: String,
        prev: Option<Vec<String>>,
        next: Vec<String>,
    },
    Validated {
        name: String,
        prev: Option<bool>,
        next: bool,
    },
}

/// Apply the resolved intent to the resolved previous state.
///
/// Returns the new state plus the [`Update`]s describing what changed. A
/// plain submit (no intent) changes nothing; full validation downstream
/// treats every field as implicitly validated.
pub fn apply_intent(form: &ResolvedForm) -> Result<(FormState, Vec<Update>), IntentError> {
    let mut state = form.state.clone();
    let mut updates = Vec::new();

    let Some(intent) = &form.intent else {
        return Ok((state, updates));
    };
    debug!(intent = %intent.encode(), "applying intent");

    match intent {
        Intent::Validate { name: Some(name) } => {
            if name.is_empty() {
                return Err(IntentError::EmptyFieldName);
            }
            mark_validated(&mut state, &mut updates, name);
        }
        Intent::Validate { name: None } => {
            for name in &form.fields {
                mark_validated(&mut state, &mut updates, name);
            }
        }
        Intent::ListInsert { name, key } => {
            if !form.list_fields.contains(name) && !state.list_keys.contains_key(name) {
                return Err(IntentError::UnknownList { name: name.clone() });
            }
            let keys = state.list_keys.entry(name.clone()).or_default();
            let prev = keys.clone();
            let key = match key {
                Some(key) => {
                    if keys.contains(key) {
                        return Err(IntentError::DuplicateKey {
                            name: name.clone(),
                            key: key.clone(),
                        });
                    }
                    key.clone()
                }
                None => fresh_key(keys),
            };
            keys.push(key);
            updates.push(Update::List {
                name: name.clone(),
                prev: Some(prev),
                next: keys.clone(),
            });
        }
        Intent::ListRemove { name, key } => {
            let keys = state
                .list_keys
                .get_mut(name)
                .ok_or_else(|| IntentError::UnknownList { name: name.clone() })?;
            let position = keys.iter().position(|k| k == key).ok_or_else(|| {
                IntentError::UnknownKey {
                    name: name.clone(),
                    key: key.clone(),
                }
            })?;
            let prev = keys.clone();
            keys.remove(position);
            updates.push(Update::List {
                name: name.clone(),
                prev: Some(prev),
                next: keys.clone(),
            });
        }
        Intent::ListReorder { name, from, to } => {
            let keys = state
                .list_keys
                .get_mut(name)
                .ok_or_else(|| IntentError::UnknownList { name: name.clone() })?;
            for index in [*from, *to] {
                if index >= keys.len() {
                    return Err(IntentError::IndexOutOfBounds {
                        name: name.clone(),
                        index,
                        len: keys.len(),
                    });
                }
            }
            if from != to {
                let prev = keys.clone();
                let key = keys.remove(*from);
                keys.insert(*to, key);
                updates.push(Update::List {
                    name: name.clone(),
                    prev: Some(prev),
                    next: keys.clone(),
                });
            }
        }
    }

    Ok((state, updates))
}

fn mark_validated(state: &mut FormState, updates: &mut Vec<Update>, name: &str) {
    let prev = state.validated.get(name).copied();
    if prev == Some(true) {
        return;
    }
    state.validated.insert(name.to_string(), true);
    updates.push(Update::Validated {
        name: name.to_string(),
        prev,
        next: true,
    });
}

/// Generate a key not equal to any existing key. UUIDs collide never in
/// practice; the loop is a guard, not a strategy.
fn fresh_key(existing: &[String]) -> String {
    loop {
        let key = Uuid::new_v4().to_string();
        if !existing.contains(&key) {
            return key;
        }
    }
}
