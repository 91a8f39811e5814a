//! Error taxonomy for the resolution boundary.
//!
//! Everything here is recoverable by the caller: a failed resolution never
//! leaves behind a partially mutated state, because every state transition in
//! this crate returns a new value instead of mutating its input.

use formwire_path::PathError;
use thiserror::Error;

/// Payload resolution failures (flat names → value tree, reserved fields).
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Path(#[from] PathError),

    /// Two entries disagreed on whether a shared path prefix is an object or
    /// an array. The first entry at a prefix fixes its kind for the whole
    /// resolution pass; later conflicts are hard errors, never coerced.
    #[error("conflicting shapes at `{name}`: {message}")]
    ShapeConflict { name: String, message: String },

    /// A reserved field was present but its value could not be decoded.
    #[error("malformed `{field}` entry: {message}")]
    MalformedPayload { field: &'static str, message: String },

    /// The intent descriptor decoded but its kind is not one we know.
    #[error("unknown intent kind `{kind}`")]
    UnknownIntent { kind: String },
}

/// Intent preconditions that fail before any validation runs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntentError {
    #[error("validate intent requires a non-empty field name")]
    EmptyFieldName,

    #[error("`{name}` is not a list field")]
    UnknownList { name: String },

    #[error("list `{name}` has no key `{key}`")]
    UnknownKey { name: String, key: String },

    #[error("list `{name}` already has key `{key}`")]
    DuplicateKey { name: String, key: String },

    #[error("index {index} out of bounds for list `{name}` of length {len}")]
    IndexOutOfBounds {
        name: String,
        index: usize,
        len: usize,
    },
}

/// Failures surfaced by a [`SchemaValidator`](crate::validate::SchemaValidator).
#[derive(Debug, Error)]
pub enum ValidateError {
    /// The synchronous entry point was used but a check needs the async
    /// branch. Deterministic: the sync path never resolves a future.
    #[error("validation requires the async entry point")]
    AsyncRequired,

    /// The validation engine itself failed (not a field failing validation).
    /// Propagated to the caller as-is; the protocol never retries.
    #[error("validation engine error: {0}")]
    Engine(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ValidateError {
    pub fn engine(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        ValidateError::Engine(Box::new(err))
    }
}

/// Union error for the top-level `parse`/`parse_async` entry points.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Intent(#[from] IntentError),
    #[error(transparent)]
    Validate(#[from] ValidateError),
}
