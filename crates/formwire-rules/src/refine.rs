//! Gated checks: programmatic constraints with skip/undetermined semantics.
//!
//! A gated check names one field and one message, and runs a *probe* over
//! the field's value. Three outcomes, kept deliberately distinct:
//!
//! - `Some(true)` — ran and passed, no issue;
//! - `Some(false)` — ran and failed, a regular issue with the message;
//! - `None` — this side cannot decide (e.g. only the server can query the
//!   database): the undetermined sentinel, so nobody records a false pass.
//!
//! The gate decides whether the probe runs at all. A check gated off —
//! typically because the current intent validates a *different* field —
//! reports the skip sentinel instead of silently passing, which lets a
//! client preserve the field's previous error.

use std::future::Future;
use std::pin::Pin;

use formwire_core::error::ValidateError;
use formwire_core::validate::{Issue, ValidationContext};
use formwire_core::value::FormValue;
use formwire_path::decode;

type SyncProbe = Box<dyn Fn(Option<&FormValue>) -> Option<bool> + Send + Sync>;
type DeferredProbe =
    Box<dyn Fn(Option<&FormValue>) -> Pin<Box<dyn Future<Output = Option<bool>> + Send>> + Send + Sync>;

enum Probe {
    Sync(SyncProbe),
    Deferred(DeferredProbe),
}

enum Gate {
    Always,
    WhenTargeted,
    When(Box<dyn Fn(&ValidationContext) -> bool + Send + Sync>),
}

pub struct GatedCheck {
    field: String,
    message: String,
    gate: Gate,
    probe: Probe,
}

impl GatedCheck {
    /// A check whose probe runs inline.
    pub fn sync(
        field: impl Into<String>,
        message: impl Into<String>,
        probe: impl Fn(Option<&FormValue>) -> Option<bool> + Send + Sync + 'static,
    ) -> Self {
        GatedCheck {
            field: field.into(),
            message: message.into(),
            gate: Gate::Always,
            probe: Probe::Sync(Box::new(probe)),
        }
    }

    /// A check whose probe suspends (a network or database lookup). Only the
    /// async entry point can run it; the sync path fails with
    /// [`ValidateError::AsyncRequired`] when the check is not gated off.
    pub fn deferred(
        field: impl Into<String>,
        message: impl Into<String>,
        probe: impl Fn(Option<&FormValue>) -> Pin<Box<dyn Future<Output = Option<bool>> + Send>>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        GatedCheck {
            field: field.into(),
            message: message.into(),
            gate: Gate::Always,
            probe: Probe::Deferred(Box::new(probe)),
        }
    }

    /// Run only when the current intent targets this check's field (or the
    /// submission is a plain/validate-all submit).
    pub fn when_targeted(mut self) -> Self {
        self.gate = Gate::WhenTargeted;
        self
    }

    /// Run only when the predicate holds for the current context.
    pub fn when(mut self, gate: impl Fn(&ValidationContext) -> bool + Send + Sync + 'static) -> Self {
        self.gate = Gate::When(Box::new(gate));
        self
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    fn gated_on(&self, ctx: &ValidationContext) -> bool {
        match &self.gate {
            Gate::Always => true,
            Gate::WhenTargeted => ctx.targets(&self.field),
            Gate::When(predicate) => predicate(ctx),
        }
    }

    fn outcome_issue(&self, outcome: Option<bool>, path: Vec<formwire_path::PathKey>) -> Option<Issue> {
        match outcome {
            Some(true) => None,
            Some(false) => Some(Issue::failed(path, self.message.clone())),
            None => Some(Issue::undetermined(path)),
        }
    }

    pub(crate) fn evaluate_sync(
        &self,
        value: &FormValue,
        ctx: &ValidationContext,
    ) -> Result<Option<Issue>, ValidateError> {
        let path = decode(&self.field).map_err(ValidateError::engine)?;
        if !self.gated_on(ctx) {
            return Ok(Some(Issue::skipped(path)));
        }
        match &self.probe {
            Probe::Sync(probe) => Ok(self.outcome_issue(probe(value.at(&path)), path)),
            Probe::Deferred(_) => Err(ValidateError::AsyncRequired),
        }
    }

    pub(crate) async fn evaluate_async(
        &self,
        value: &FormValue,
        ctx: &ValidationContext,
    ) -> Result<Option<Issue>, ValidateError> {
        let path = decode(&self.field).map_err(ValidateError::engine)?;
        if !self.gated_on(ctx) {
            return Ok(Some(Issue::skipped(path)));
        }
        let outcome = match &self.probe {
            Probe::Sync(probe) => probe(value.at(&path)),
            Probe::Deferred(probe) => probe(value.at(&path)).await,
        };
        Ok(self.outcome_issue(outcome, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formwire_core::intent::Intent;
    use formwire_core::validate::IssueKind;

    fn tree(field: &str, value: &str) -> FormValue {
        let mut map = std::collections::BTreeMap::new();
        map.insert(field.to_string(), FormValue::text(value));
        FormValue::Map(map)
    }

    #[test]
    fn passing_probe_yields_no_issue() {
        let check = GatedCheck::sync("email", "taken", |v| {
            Some(v.and_then(FormValue::as_text) == Some("free@example.com"))
        });
        let ctx = ValidationContext::default();
        let issue = check
            .evaluate_sync(&tree("email", "free@example.com"), &ctx)
            .unwrap();
        assert!(issue.is_none());
    }

    #[test]
    fn failing_probe_yields_a_failed_issue() {
        let check = GatedCheck::sync("email", "Email is already used", |_| Some(false));
        let ctx = ValidationContext::default();
        let issue = check.evaluate_sync(&tree("email", "x"), &ctx).unwrap().unwrap();
        assert_eq!(issue.kind, IssueKind::Failed);
        assert_eq!(issue.message, "Email is already used");
    }

    #[test]
    fn undecidable_probe_yields_the_undetermined_sentinel() {
        let check = GatedCheck::sync("email", "taken", |_| None);
        let ctx = ValidationContext::default();
        let issue = check.evaluate_sync(&tree("email", "x"), &ctx).unwrap().unwrap();
        assert_eq!(issue.kind, IssueKind::Undetermined);
    }

    #[test]
    fn gated_off_check_yields_the_skip_sentinel_not_a_pass() {
        let check = GatedCheck::sync("email", "taken", |_| Some(false)).when_targeted();
        let ctx = ValidationContext::new(Some(Intent::Validate {
            name: Some("title".into()),
        }));
        let issue = check.evaluate_sync(&tree("email", "x"), &ctx).unwrap().unwrap();
        assert_eq!(issue.kind, IssueKind::Skipped);
    }

    #[test]
    fn deferred_probe_fails_fast_on_the_sync_path() {
        let check = GatedCheck::deferred("email", "taken", |_| Box::pin(async { Some(true) }));
        let ctx = ValidationContext::default();
        let err = check.evaluate_sync(&tree("email", "x"), &ctx).unwrap_err();
        assert!(matches!(err, ValidateError::AsyncRequired));
    }

    #[test]
    fn gated_off_deferred_probe_needs_no_async() {
        // Skip logic runs before the probe, so the sync path can still
        // resolve a submission whose intent targets another field.
        let check = GatedCheck::deferred("email", "taken", |_| Box::pin(async { Some(true) }))
            .when_targeted();
        let ctx = ValidationContext::new(Some(Intent::Validate {
            name: Some("title".into()),
        }));
        let issue = check.evaluate_sync(&tree("email", "x"), &ctx).unwrap().unwrap();
        assert_eq!(issue.kind, IssueKind::Skipped);
    }

    #[tokio::test]
    async fn deferred_probe_runs_on_the_async_path() {
        let check = GatedCheck::deferred("email", "Email is already used", |value| {
            let taken = value.and_then(FormValue::as_text) == Some("taken@example.com");
            Box::pin(async move { Some(!taken) })
        });
        let ctx = ValidationContext::default();
        let issue = check
            .evaluate_async(&tree("email", "taken@example.com"), &ctx)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(issue.kind, IssueKind::Failed);

        let pass = check
            .evaluate_async(&tree("email", "new@example.com"), &ctx)
            .await
            .unwrap();
        assert!(pass.is_none());
    }
}
