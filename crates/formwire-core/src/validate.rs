//! The validator contract a schema engine implements.
//!
//! The protocol treats the schema engine as a black box: hand it the value
//! tree and the current intent, get back success-with-output or a list of
//! path-keyed issues. One trait, two entry points with identical observable
//! semantics — synchronous, and asynchronous for engines with checks that
//! suspend (uniqueness probes and the like). The sync entry point must fail
//! deterministically with [`ValidateError::AsyncRequired`] when a needed
//! check cannot run without suspending; it never resolves a future.

use async_trait::async_trait;
use formwire_path::{FieldPath, PathKey};
use serde::{Deserialize, Serialize};

use crate::error::ValidateError;
use crate::intent::Intent;
use crate::value::FormValue;

/// Reserved message marking a check that was skipped because the current
/// intent targets a different field. A client keeps the field's prior error
/// instead of treating the field as freshly valid.
pub const VALIDATION_SKIPPED: &str = "__VALIDATION_SKIPPED__";

/// Reserved message marking a check whose applicability could not be
/// determined (e.g. a probe only the server can run). Distinct from "ran and
/// passed" so nobody records a false negative.
pub const VALIDATION_UNDETERMINED: &str = "__VALIDATION_UNDETERMINED__";

/// How an issue came to be: a failed check, or one of the two sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Failed,
    Skipped,
    Undetermined,
}

/// One validation issue, keyed by the path of the field it concerns.
/// The empty path addresses the form itself (form-level errors).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub path: FieldPath,
    pub message: String,
    pub kind: IssueKind,
}

impl Issue {
    pub fn failed(path: FieldPath, message: impl Into<String>) -> Self {
        Issue {
            path,
            message: message.into(),
            kind: IssueKind::Failed,
        }
    }

    pub fn form_level(message: impl Into<String>) -> Self {
        Issue::failed(Vec::new(), message)
    }

    /// The skip sentinel; its message is the reserved marker.
    pub fn skipped(path: FieldPath) -> Self {
        Issue {
            path,
            message: VALIDATION_SKIPPED.to_string(),
            kind: IssueKind::Skipped,
        }
    }

    /// The undetermined sentinel; its message is the reserved marker.
    pub fn undetermined(path: FieldPath) -> Self {
        Issue {
            path,
            message: VALIDATION_UNDETERMINED.to_string(),
            kind: IssueKind::Undetermined,
        }
    }
}

/// What the protocol passes alongside the value tree.
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    pub intent: Option<Intent>,
}

impl ValidationContext {
    pub fn new(intent: Option<Intent>) -> Self {
        ValidationContext { intent }
    }

    /// Whether the current submission asks for `field` to be validated: true
    /// on a plain submit and on `validate` intents naming this field (or no
    /// field). List intents target no field at all.
    pub fn targets(&self, field: &str) -> bool {
        match &self.intent {
            None => true,
            Some(Intent::Validate { name: None }) => true,
            Some(Intent::Validate { name: Some(name) }) => name == field,
            Some(_) => false,
        }
    }
}

/// The validation outcome: typed output, or path-keyed issues in the order
/// the engine produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict<Output> {
    Success { output: Output },
    Failure { issues: Vec<Issue> },
}

impl<Output> Verdict<Output> {
    pub fn is_success(&self) -> bool {
        matches!(self, Verdict::Success { .. })
    }
}

/// The adapter contract. Implementations must give the sync and async paths
/// identical observable semantics for checks that do not need to suspend;
/// engine-internal errors propagate, they are never swallowed or retried.
#[async_trait]
pub trait SchemaValidator: Send + Sync {
    type Output: Send;

    fn validate(
        &self,
        value: &FormValue,
        ctx: &ValidationContext,
    ) -> Result<Verdict<Self::Output>, ValidateError>;

    /// Default: delegate to the sync path. Engines with suspending checks
    /// override this and await them here.
    async fn validate_async(
        &self,
        value: &FormValue,
        ctx: &ValidationContext,
    ) -> Result<Verdict<Self::Output>, ValidateError> {
        self.validate(value, ctx)
    }
}

/// A validator backed by a plain function — the "hand-written predicate set"
/// end of the contract. Build one with [`from_fn`].
pub struct FnValidator<F, Output> {
    run: F,
    _output: std::marker::PhantomData<fn() -> Output>,
}

/// Wrap a function as a [`SchemaValidator`] (sync path only; the async path
/// delegates to it).
pub fn from_fn<F, Output>(run: F) -> FnValidator<F, Output>
where
    F: Fn(&FormValue, &ValidationContext) -> Result<Verdict<Output>, ValidateError> + Send + Sync,
    Output: Send,
{
    FnValidator {
        run,
        _output: std::marker::PhantomData,
    }
}

#[async_trait]
impl<F, Output> SchemaValidator for FnValidator<F, Output>
where
    F: Fn(&FormValue, &ValidationContext) -> Result<Verdict<Output>, ValidateError> + Send + Sync,
    Output: Send,
{
    type Output = Output;

    fn validate(
        &self,
        value: &FormValue,
        ctx: &ValidationContext,
    ) -> Result<Verdict<Output>, ValidateError> {
        (self.run)(value, ctx)
    }
}

/// Build an error-map entry name from an issue path.
pub(crate) fn issue_name(path: &[PathKey]) -> String {
    formwire_path::encode(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targeting_follows_the_intent() {
        let plain = ValidationContext::new(None);
        assert!(plain.targets("email"));

        let one = ValidationContext::new(Some(Intent::Validate {
            name: Some("email".into()),
        }));
        assert!(one.targets("email"));
        assert!(!one.targets("title"));

        let all = ValidationContext::new(Some(Intent::Validate { name: None }));
        assert!(all.targets("title"));

        let list = ValidationContext::new(Some(Intent::ListInsert {
            name: "items".into(),
            key: None,
        }));
        assert!(!list.targets("email"));
    }

    #[test]
    fn sentinels_carry_their_reserved_messages() {
        assert_eq!(Issue::skipped(vec![]).message, VALIDATION_SKIPPED);
        assert_eq!(Issue::undetermined(vec![]).message, VALIDATION_UNDETERMINED);
        assert_eq!(Issue::skipped(vec![]).kind, IssueKind::Skipped);
    }
}
