//! Rule-based validator for the formwire protocol
//!
//! The protocol core treats the schema engine as a black box behind the
//! [`SchemaValidator`](formwire_core::SchemaValidator) contract. This crate
//! is the built-in engine: a declarative, serde-loadable set of per-field
//! rules plus programmatic *gated checks* for anything a rule table cannot
//! express (uniqueness probes, cross-field conditions, async lookups).
//!
//! Field rules always run in full — selective error *surfacing* is the
//! protocol's job, not the engine's. Gated checks are the exception: a check
//! tied to one field can be skipped when the current intent targets a
//! different field, reporting the skip sentinel instead of a false pass.

pub mod engine;
pub mod refine;
pub mod schema;

pub use engine::RuleValidator;
pub use refine::GatedCheck;
pub use schema::{FieldRules, Rule, RuleSchema};
