//! The validator implementation over rule tables and gated checks.

use std::sync::OnceLock;

use async_trait::async_trait;
use formwire_core::error::ValidateError;
use formwire_core::intent::Intent;
use formwire_core::validate::{Issue, SchemaValidator, ValidationContext, Verdict};
use formwire_core::value::FormValue;
use formwire_path::decode;
use regex::Regex;
use tracing::debug;

use crate::refine::GatedCheck;
use crate::schema::{Rule, RuleSchema};

type SchemaSelect = Box<dyn Fn(Option<&Intent>, &RuleSchema) -> RuleSchema + Send + Sync>;

/// A [`SchemaValidator`] driven by a [`RuleSchema`] plus gated checks.
///
/// Field rules always run in full; the protocol decides which errors
/// surface. Gated checks run through their skip logic first, so a deferred
/// (async) check gated off by the current intent never forces the async
/// entry point.
pub struct RuleValidator {
    schema: RuleSchema,
    checks: Vec<GatedCheck>,
    select: Option<SchemaSelect>,
}

impl RuleValidator {
    pub fn new(schema: RuleSchema) -> Self {
        RuleValidator {
            schema,
            checks: Vec::new(),
            select: None,
        }
    }

    pub fn with_check(mut self, check: GatedCheck) -> Self {
        self.checks.push(check);
        self
    }

    /// Derive the effective rule table from the current intent, e.g. to drop
    /// expensive rules while a single field is being validated.
    pub fn with_schema_for_intent(
        mut self,
        select: impl Fn(Option<&Intent>, &RuleSchema) -> RuleSchema + Send + Sync + 'static,
    ) -> Self {
        self.select = Some(Box::new(select));
        self
    }

    fn effective_schema(&self, ctx: &ValidationContext) -> RuleSchema {
        match &self.select {
            Some(select) => select(ctx.intent.as_ref(), &self.schema),
            None => self.schema.clone(),
        }
    }

    fn rule_issues(
        &self,
        schema: &RuleSchema,
        value: &FormValue,
    ) -> Result<Vec<Issue>, ValidateError> {
        let mut issues = Vec::new();
        for field in &schema.fields {
            let path = decode(&field.name).map_err(ValidateError::engine)?;
            let field_value = value.at(&path);
            for rule in &field.rules {
                if let Some(message) = evaluate_rule(rule, field_value)? {
                    issues.push(Issue::failed(path.clone(), message));
                }
            }
        }
        Ok(issues)
    }

    fn finish(&self, value: &FormValue, issues: Vec<Issue>) -> Verdict<FormValue> {
        debug!(issues = issues.len(), "rule validation finished");
        if issues.is_empty() {
            Verdict::Success {
                output: value.clone(),
            }
        } else {
            Verdict::Failure { issues }
        }
    }
}

#[async_trait]
impl SchemaValidator for RuleValidator {
    type Output = FormValue;

    fn validate(
        &self,
        value: &FormValue,
        ctx: &ValidationContext,
    ) -> Result<Verdict<FormValue>, ValidateError> {
        let mut issues = self.rule_issues(&self.effective_schema(ctx), value)?;
        for check in &self.checks {
            if let Some(issue) = check.evaluate_sync(value, ctx)? {
                issues.push(issue);
            }
        }
        Ok(self.finish(value, issues))
    }

    async fn validate_async(
        &self,
        value: &FormValue,
        ctx: &ValidationContext,
    ) -> Result<Verdict<FormValue>, ValidateError> {
        let mut issues = self.rule_issues(&self.effective_schema(ctx), value)?;
        for check in &self.checks {
            if let Some(issue) = check.evaluate_async(value, ctx).await? {
                issues.push(issue);
            }
        }
        Ok(self.finish(value, issues))
    }
}

fn is_present(value: Option<&FormValue>) -> bool {
    match value {
        None => false,
        Some(FormValue::Text(text)) => !text.is_empty(),
        Some(FormValue::File(_)) => true,
        Some(FormValue::List(items)) => !items.is_empty(),
        Some(FormValue::Map(entries)) => !entries.is_empty(),
    }
}

fn present_text(value: Option<&FormValue>) -> Option<&str> {
    value.and_then(FormValue::as_text).filter(|t| !t.is_empty())
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex compiles"))
}

/// Evaluate one rule; `Some(message)` is a failure. Length, pattern and
/// membership rules skip absent values — presence is `Required`'s concern.
fn evaluate_rule(rule: &Rule, value: Option<&FormValue>) -> Result<Option<String>, ValidateError> {
    let failure = match rule {
        Rule::Required { message } => (!is_present(value)).then(|| message.clone()),
        Rule::MinLength { min, message } => present_text(value)
            .filter(|text| text.chars().count() < *min)
            .map(|_| message.clone()),
        Rule::MaxLength { max, message } => present_text(value)
            .filter(|text| text.chars().count() > *max)
            .map(|_| message.clone()),
        Rule::Pattern { pattern, message } => {
            let re = Regex::new(pattern).map_err(ValidateError::engine)?;
            present_text(value)
                .filter(|text| !re.is_match(text))
                .map(|_| message.clone())
        }
        Rule::Email { message } => present_text(value)
            .filter(|text| !email_regex().is_match(text))
            .map(|_| message.clone()),
        Rule::OneOf { values, message } => present_text(value)
            .filter(|text| !values.iter().any(|v| v == text))
            .map(|_| message.clone()),
    };
    Ok(failure)
}
