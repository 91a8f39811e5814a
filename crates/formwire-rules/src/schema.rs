//! Declarative rule tables.
//!
//! A `RuleSchema` is plain data: it serializes to JSON, so a rules file can
//! drive the whole protocol from outside the process (the CLI does exactly
//! that). New rule kinds are additions to the tag set.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSchema {
    pub fields: Vec<FieldRules>,
}

impl RuleSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append rules for one flat field name.
    pub fn field(mut self, name: impl Into<String>, rules: Vec<Rule>) -> Self {
        self.fields.push(FieldRules {
            name: name.into(),
            rules,
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRules {
    /// Flat field name (`items[0].name` syntax), decoded by the engine.
    pub name: String,
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Rule {
    /// The value must be present: non-empty text, a file, or a non-empty
    /// container.
    Required { message: String },
    /// Minimum text length in characters. Absent values are the business of
    /// `Required`, not of length rules.
    MinLength { min: usize, message: String },
    MaxLength { max: usize, message: String },
    /// The text must match this regular expression.
    Pattern { pattern: String, message: String },
    Email { message: String },
    OneOf { values: Vec<String>, message: String },
}

impl Rule {
    pub fn required(message: impl Into<String>) -> Self {
        Rule::Required {
            message: message.into(),
        }
    }

    pub fn min_length(min: usize, message: impl Into<String>) -> Self {
        Rule::MinLength {
            min,
            message: message.into(),
        }
    }

    pub fn max_length(max: usize, message: impl Into<String>) -> Self {
        Rule::MaxLength {
            max,
            message: message.into(),
        }
    }

    pub fn pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Rule::Pattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    pub fn email(message: impl Into<String>) -> Self {
        Rule::Email {
            message: message.into(),
        }
    }

    pub fn one_of(values: Vec<String>, message: impl Into<String>) -> Self {
        Rule::OneOf {
            values,
            message: message.into(),
        }
    }
}
