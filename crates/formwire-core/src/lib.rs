//! Formwire submission resolution protocol
//!
//! A browser form submits a flat list of `(name, value)` entries. This crate
//! turns one of those payloads into a [`Submission`]: it reconstructs the
//! nested value tree from the flat names, extracts the out-of-band *intent*
//! signal (validate one field, mutate a list, plain submit), merges the
//! previous [`FormState`] carried in the payload, runs a schema validator
//! selectively, and produces a JSON-serializable [`SubmissionResult`] that
//! round-trips between server and client.
//!
//! The pieces, in data-flow order:
//!
//! - [`value`] — the [`FormValue`] tree, flat↔nested conversion
//! - [`resolve`] — payload ingestion and reserved-field handling
//! - [`intent`] — the intent descriptor and its wire codec
//! - [`handler`] — the intent → state transition (pure, returns a new state)
//! - [`validate`] — the validator contract a schema engine implements
//! - [`submission`] — status classification and the serializable result
//! - [`store`] — the state container + subscriber dispatch a UI binding reads
//!
//! The validator itself is a collaborator, not owned logic: anything that can
//! implement [`SchemaValidator`] plugs in. See the `formwire-rules` crate for
//! the built-in rule-based engine.

pub mod error;
pub mod handler;
pub mod intent;
pub mod resolve;
pub mod state;
pub mod store;
pub mod submission;
pub mod validate;
pub mod value;

pub use error::{IntentError, ParseError, ResolveError, ValidateError};
pub use handler::{apply_intent, Update};
pub use intent::{Intent, INTENT_FIELD, STATE_FIELD};
pub use resolve::{resolve, Payload, PayloadValue, ResolvedForm};
pub use state::FormState;
pub use store::{FormStore, Subscriber, SubscriptionHandle};
pub use submission::{
    build_submission, parse, parse_async, AcceptedSubmission, ErrorMap, PendingSubmission,
    RejectOptions, RejectedSubmission, Submission, SubmissionResult, SubmissionStatus,
};
pub use validate::{
    from_fn, FnValidator, Issue, IssueKind, SchemaValidator, ValidationContext, Verdict,
    VALIDATION_SKIPPED, VALIDATION_UNDETERMINED,
};
pub use value::{flatten, reconstruct, FileUpload, FlatValue, FormValue};
