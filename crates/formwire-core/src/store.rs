//! The client-side state container and subscriber dispatch.
//!
//! A UI binding keeps one `FormStore` per form, applies every incoming
//! [`SubmissionResult`] to it, and lets widgets subscribe to the updates they
//! care about. Subscriptions are a plain ownership list held by the store —
//! no event bus, no global registry; disposing the returned handle removes
//! the subscription and nothing else can.

use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use crate::handler::Update;
use crate::state::FormState;
use crate::submission::{ErrorMap, SubmissionResult};
use crate::value::FlatValue;

/// A registered observer: `should_notify` is the predicate deciding which
/// updates matter to it, `callback` is invoked once per matching update,
/// synchronously, in the order updates were produced.
pub struct Subscriber {
    pub should_notify: Box<dyn Fn(&Update) -> bool>,
    pub callback: Box<dyn FnMut()>,
}

/// Dispose handle for one subscription. Pass it back to
/// [`FormStore::unsubscribe`]; there is no other way to address a
/// subscription (identity lives in the handle, not in the callback).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionHandle(u64);

#[derive(Default)]
pub struct FormStore {
    initial_value: BTreeMap<String, FlatValue>,
    error: ErrorMap,
    state: FormState,
    subscribers: Vec<(u64, Subscriber)>,
    next_id: u64,
}

impl FormStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initial_value(&self) -> &BTreeMap<String, FlatValue> {
        &self.initial_value
    }

    pub fn error(&self) -> &ErrorMap {
        &self.error
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn subscribe(&mut self, subscriber: Subscriber) -> SubscriptionHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers.push((id, subscriber));
        SubscriptionHandle(id)
    }

    pub fn unsubscribe(&mut self, handle: SubscriptionHandle) {
        self.subscribers.retain(|(id, _)| *id != handle.0);
    }

    /// Reconcile an incoming result into the store and notify subscribers.
    ///
    /// Diffs the old and new error map, list keys and validated set per
    /// field; structurally equal prev/next pairs emit nothing. An absent
    /// error/state on the result means "none" (an accepted result clears
    /// errors); an absent `initial_value` keeps the current one.
    pub fn apply(&mut self, result: &SubmissionResult) {
        let next_error = result.error.clone().unwrap_or_default();
        let next_state = result.state.clone().unwrap_or_default();

        let mut updates: Vec<Update> = Vec::new();
        diff_maps(&self.error, &next_error, |name, prev, next| {
            updates.push(Update::Error {
                name: name.to_string(),
                prev: prev.cloned(),
                next: next.cloned().unwrap_or_default(),
            });
        });
        diff_maps(
            &self.state.list_keys,
            &next_state.list_keys,
            |name, prev, next| {
                updates.push(Update::List {
                    name: name.to_string(),
                    prev: prev.cloned(),
                    next: next.cloned().unwrap_or_default(),
                });
            },
        );
        diff_maps(
            &self.state.validated,
            &next_state.validated,
            |name, prev, next| {
                updates.push(Update::Validated {
                    name: name.to_string(),
                    prev: prev.copied(),
                    next: next.copied().unwrap_or_default(),
                });
            },
        );

        if let Some(initial_value) = &result.initial_value {
            self.initial_value = initial_value.clone();
        }
        self.error = next_error;
        self.state = next_state;

        trace!(updates = updates.len(), "applying submission result");
        for update in &updates {
            for (_, subscriber) in self.subscribers.iter_mut() {
                if (subscriber.should_notify)(update) {
                    (subscriber.callback)();
                }
            }
        }
    }
}

/// Walk the union of both key sets, invoking `emit` for every field whose
/// value actually changed. "Absent before" and "equal to the default now"
/// count as equal, so removals of empty entries stay silent.
fn diff_maps<V: PartialEq + Default + Clone>(
    old: &BTreeMap<String, V>,
    new: &BTreeMap<String, V>,
    mut emit: impl FnMut(&str, Option<&V>, Option<&V>),
) {
    let names: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
    for name in names {
        let prev = old.get(name.as_str());
        let next = new.get(name.as_str());
        let prev_or_default = prev.cloned().unwrap_or_default();
        let next_or_default = next.cloned().unwrap_or_default();
        if prev_or_default != next_or_default {
            emit(name, prev, next);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::submission::SubmissionStatus;

    fn result_with_error(name: &str, message: &str) -> SubmissionResult {
        SubmissionResult {
            status: SubmissionStatus::Rejected,
            initial_value: None,
            error: Some(ErrorMap::from([(
                name.to_string(),
                vec![message.to_string()],
            )])),
            state: None,
        }
    }

    fn counting_subscriber(
        filter: impl Fn(&Update) -> bool + 'static,
        count: Rc<RefCell<usize>>,
    ) -> Subscriber {
        Subscriber {
            should_notify: Box::new(filter),
            callback: Box::new(move || *count.borrow_mut() += 1),
        }
    }

    #[test]
    fn notifies_only_matching_subscribers() {
        let mut store = FormStore::new();
        let email_hits = Rc::new(RefCell::new(0));
        let title_hits = Rc::new(RefCell::new(0));
        store.subscribe(counting_subscriber(
            |update| matches!(update, Update::Error { name, .. } if name == "email"),
            email_hits.clone(),
        ));
        store.subscribe(counting_subscriber(
            |update| matches!(update, Update::Error { name, .. } if name == "title"),
            title_hits.clone(),
        ));

        store.apply(&result_with_error("email", "Email is invalid"));
        assert_eq!(*email_hits.borrow(), 1);
        assert_eq!(*title_hits.borrow(), 0);
    }

    #[test]
    fn equal_states_emit_nothing() {
        let mut store = FormStore::new();
        let hits = Rc::new(RefCell::new(0));
        store.subscribe(counting_subscriber(|_| true, hits.clone()));

        let result = result_with_error("email", "Email is invalid");
        store.apply(&result);
        assert_eq!(*hits.borrow(), 1);
        // Same result again: prev == next for every field, no notification.
        store.apply(&result);
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn clearing_an_error_notifies_with_an_empty_next() {
        let mut store = FormStore::new();
        store.apply(&result_with_error("email", "Email is invalid"));

        let recorder = Rc::new(RefCell::new(Vec::<Update>::new()));
        let recorder_in = recorder.clone();
        store.subscribe(Subscriber {
            should_notify: Box::new(move |update| {
                recorder_in.borrow_mut().push(update.clone());
                true
            }),
            callback: Box::new(|| {}),
        });

        store.apply(&SubmissionResult {
            status: SubmissionStatus::Accepted,
            initial_value: None,
            error: None,
            state: None,
        });
        let recorded = recorder.borrow();
        assert_eq!(
            recorded.first(),
            Some(&Update::Error {
                name: "email".into(),
                prev: Some(vec!["Email is invalid".into()]),
                next: vec![],
            })
        );
    }

    #[test]
    fn unsubscribed_handles_stop_notifications() {
        let mut store = FormStore::new();
        let hits = Rc::new(RefCell::new(0));
        let handle = store.subscribe(counting_subscriber(|_| true, hits.clone()));
        store.unsubscribe(handle);
        store.apply(&result_with_error("email", "Email is invalid"));
        assert_eq!(*hits.borrow(), 0);
    }

    #[test]
    fn list_and_validated_changes_emit_their_own_updates() {
        let mut store = FormStore::new();
        let recorder = Rc::new(RefCell::new(Vec::<Update>::new()));
        let recorder_in = recorder.clone();
        store.subscribe(Subscriber {
            should_notify: Box::new(move |update| {
                recorder_in.borrow_mut().push(update.clone());
                false
            }),
            callback: Box::new(|| {}),
        });

        let mut state = FormState::default();
        state.validated.insert("email".into(), true);
        state.list_keys.insert("items".into(), vec!["k1".into()]);
        store.apply(&SubmissionResult {
            status: SubmissionStatus::Pending,
            initial_value: None,
            error: None,
            state: Some(state),
        });

        let recorded = recorder.borrow();
        assert_eq!(recorded.len(), 2);
        assert!(matches!(&recorded[0], Update::List { name, .. } if name == "items"));
        assert!(matches!(&recorded[1], Update::Validated { name, .. } if name == "email"));
    }
}
