//! Error types for config resolution.

use thiserror::Error;

/// Result type for SCM capability calls.
pub type ScmResult<T> = std::result::Result<T, ScmError>;

/// Errors reported by an SCM backend.
///
/// `NotFound` is the only non-fatal variant: discovery treats a missing
/// candidate file as a miss and keeps going. Everything else aborts the
/// resolution that triggered the call.
#[derive(Error, Debug)]
pub enum ScmError {
    /// The requested path does not exist at the given revision.
    #[error("not found: {path}")]
    NotFound { path: String },

    /// The call failed for a reason other than a missing path.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Result type for resolution operations.
pub type ResolveResult<T> = std::result::Result<T, ResolveError>;

/// Terminal conditions of a config resolution.
///
/// All variants are fatal for the resolution that produced them; the
/// non-fatal "candidate absent" case never surfaces here, it is handled
/// inside discovery. `NotFound` is a distinct terminal condition rather
/// than a failure: discovery completed and found zero fragments, which
/// callers may map to host-default behavior.
///
/// The enum is `Clone` so outcomes can be stored in the result cache and
/// replayed to later requests.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// A candidate file exists but failed YAML parsing or the minimal
    /// schema check (`name` and `kind` required).
    #[error("malformed config {path}: {reason}")]
    Malformed { path: String, reason: String },

    /// An SCM call failed for a reason other than "not found".
    #[error("scm transport failure: {context}")]
    Transport { context: String },

    /// Discovery completed without finding any config fragment.
    #[error("no configuration found")]
    NotFound,

    /// The trigger metadata could not be interpreted, e.g. a pull-request
    /// ref without a numeric id.
    #[error("invalid trigger metadata: {0}")]
    Input(String),
}

impl ResolveError {
    /// Whether this is the "no configuration found" terminal condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::NotFound)
    }
}
