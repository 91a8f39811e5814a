//! Status classification and the serializable submission result.
//!
//! Classification runs in a fixed order: any non-plain-submit intent makes
//! the submission *pending* (errors filtered to validated fields — this is
//! what progressive validation is); otherwise a failed validation makes it
//! *rejected* with the full error map; otherwise *accepted* with the typed
//! output. `revise`, `reject` and `reset` are pure projections: calling one
//! repeatedly with the same input yields the same result, and none of them
//! mutates the submission it came from.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ParseError;
use crate::handler::apply_intent;
use crate::resolve::{resolve, Payload, ResolvedForm};
use crate::state::FormState;
use crate::validate::{issue_name, SchemaValidator, ValidationContext, Verdict};
use crate::value::{flatten, FlatValue};

/// Field name → ordered messages. The empty name is reserved for form-level
/// errors. Message order within a field is insertion order and significant;
/// key order is sorted so serialized results are deterministic.
pub type ErrorMap = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Rejected,
    Accepted,
}

/// The serializable projection of a submission — the only shape that crosses
/// the network boundary. `initial_value` is the *flattened* tree (flat name →
/// value), never the nested tree: nested structures are not a stable wire
/// format for form re-hydration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    pub status: SubmissionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<BTreeMap<String, FlatValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<FormState>,
}

/// What every submission carries regardless of status: the flattened value,
/// the full error map, and the post-intent state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionContext {
    initial_value: BTreeMap<String, FlatValue>,
    error: ErrorMap,
    state: FormState,
}

/// A non-final submission: an intent other than plain submit was present.
/// `error` is filtered to validated fields; the full map stays internal.
#[derive(Debug, Clone)]
pub struct PendingSubmission {
    pub error: ErrorMap,
    context: SubmissionContext,
}

/// A plain submit whose validation failed.
#[derive(Debug, Clone)]
pub struct RejectedSubmission {
    pub error: ErrorMap,
    context: SubmissionContext,
}

/// A plain submit whose validation succeeded.
#[derive(Debug, Clone)]
pub struct AcceptedSubmission<Output> {
    pub value: Output,
    context: SubmissionContext,
}

/// Late rejection of an accepted submission, e.g. a uniqueness check that
/// only the server can run after an optimistic client accept.
#[derive(Debug, Clone, Default)]
pub struct RejectOptions {
    pub form_errors: Vec<String>,
    pub field_errors: ErrorMap,
}

impl PendingSubmission {
    /// Snapshot for client reconciliation without advancing to a final state.
    pub fn revise(&self) -> SubmissionResult {
        SubmissionResult {
            status: SubmissionStatus::Pending,
            initial_value: Some(self.context.initial_value.clone()),
            error: Some(self.error.clone()),
            state: Some(self.context.state.clone()),
        }
    }
}

impl RejectedSubmission {
    pub fn revise(&self) -> SubmissionResult {
        SubmissionResult {
            status: SubmissionStatus::Rejected,
            initial_value: Some(self.context.initial_value.clone()),
            error: Some(self.error.clone()),
            state: Some(self.context.state.clone()),
        }
    }
}

impl<Output> AcceptedSubmission<Output> {
    /// The accepted projection: value and errors stay server-side, the
    /// client gets the state to carry forward.
    pub fn revise(&self) -> SubmissionResult {
        SubmissionResult {
            status: SubmissionStatus::Accepted,
            initial_value: Some(self.context.initial_value.clone()),
            error: None,
            state: Some(self.context.state.clone()),
        }
    }

    /// Build a *new* rejected result; the accepted submission is untouched.
    /// `form_errors` land under the reserved `""` key.
    pub fn reject(&self, options: &RejectOptions) -> SubmissionResult {
        let mut error: ErrorMap = options.field_errors.clone();
        if !options.form_errors.is_empty() {
            error.insert(String::new(), options.form_errors.clone());
        }
        SubmissionResult {
            status: SubmissionStatus::Rejected,
            initial_value: Some(self.context.initial_value.clone()),
            error: Some(error),
            state: Some(self.context.state.clone()),
        }
    }

    /// The pristine result: an accepted status with an explicit empty value
    /// map, which a consuming UI reads as "clear every field". Idempotent
    /// constant — independent of the submission it is called on.
    pub fn reset(&self) -> SubmissionResult {
        SubmissionResult {
            status: SubmissionStatus::Accepted,
            initial_value: Some(BTreeMap::new()),
            error: None,
            state: None,
        }
    }
}

/// Tagged union over the three submission outcomes. The typed output exists
/// only on the accepted variant; error maps only on the other two.
#[derive(Debug, Clone)]
pub enum Submission<Output> {
    Pending(PendingSubmission),
    Rejected(RejectedSubmission),
    Accepted(AcceptedSubmission<Output>),
}

impl<Output> Submission<Output> {
    pub fn status(&self) -> SubmissionStatus {
        match self {
            Submission::Pending(_) => SubmissionStatus::Pending,
            Submission::Rejected(_) => SubmissionStatus::Rejected,
            Submission::Accepted(_) => SubmissionStatus::Accepted,
        }
    }

    pub fn error(&self) -> Option<&ErrorMap> {
        match self {
            Submission::Pending(pending) => Some(&pending.error),
            Submission::Rejected(rejected) => Some(&rejected.error),
            Submission::Accepted(_) => None,
        }
    }

    pub fn value(&self) -> Option<&Output> {
        match self {
            Submission::Accepted(accepted) => Some(&accepted.value),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<Output> {
        match self {
            Submission::Accepted(accepted) => Some(accepted.value),
            _ => None,
        }
    }

    /// The status-appropriate projection, for handlers that serialize the
    /// outcome unconditionally.
    pub fn revise(&self) -> SubmissionResult {
        match self {
            Submission::Pending(pending) => pending.revise(),
            Submission::Rejected(rejected) => rejected.revise(),
            Submission::Accepted(accepted) => accepted.revise(),
        }
    }
}

/// Assemble a submission from the resolved form, the post-intent state and
/// the validation verdict.
pub fn build_submission<Output>(
    form: &ResolvedForm,
    state: FormState,
    verdict: Verdict<Output>,
) -> Submission<Output> {
    let error = match &verdict {
        Verdict::Success { .. } => ErrorMap::new(),
        Verdict::Failure { issues } => {
            let mut map = ErrorMap::new();
            for issue in issues {
                map.entry(issue_name(&issue.path))
                    .or_default()
                    .push(issue.message.clone());
            }
            map
        }
    };

    let context = SubmissionContext {
        initial_value: flatten(&form.data),
        error: error.clone(),
        state,
    };

    if form.intent.is_some() {
        // Progressive validation: errors for fields the user has not
        // validated yet never surface.
        let filtered = error
            .into_iter()
            .filter(|(name, _)| context.state.is_validated(name))
            .collect();
        return Submission::Pending(PendingSubmission {
            error: filtered,
            context,
        });
    }

    match verdict {
        Verdict::Failure { .. } => Submission::Rejected(RejectedSubmission { error, context }),
        Verdict::Success { output } => Submission::Accepted(AcceptedSubmission {
            value: output,
            context,
        }),
    }
}

/// Resolve and validate a payload synchronously.
///
/// Fails with [`ValidateError::AsyncRequired`](crate::error::ValidateError)
/// if the validator needs its async branch; use [`parse_async`] there. The
/// two entry points are otherwise observably identical: the same payload and
/// validator produce byte-identical serialized results.
pub fn parse<V: SchemaValidator>(
    payload: &Payload,
    validator: &V,
) -> Result<Submission<V::Output>, ParseError> {
    let form = resolve(payload)?;
    let (state, _) = apply_intent(&form)?;
    let ctx = ValidationContext::new(form.intent.clone());
    let verdict = validator.validate(&form.data, &ctx)?;
    let submission = build_submission(&form, state, verdict);
    debug!(status = ?submission.status(), "built submission");
    Ok(submission)
}

/// Resolve and validate a payload, awaiting the validator's async branch.
pub async fn parse_async<V: SchemaValidator>(
    payload: &Payload,
    validator: &V,
) -> Result<Submission<V::Output>, ParseError> {
    let form = resolve(payload)?;
    let (state, _) = apply_intent(&form)?;
    let ctx = ValidationContext::new(form.intent.clone());
    let verdict = validator.validate_async(&form.data, &ctx).await?;
    let submission = build_submission(&form, state, verdict);
    debug!(status = ?submission.status(), "built submission");
    Ok(submission)
}
