//! Error types for the defaulting core

use thiserror::Error;

use crate::resources::ResourceKind;

/// Failures the normalizer and assembler can report.
///
/// Every failure is a value, never a panic: the admission-denial path is a
/// first-class branch that handlers match on.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A quantity string could not be parsed.
    ///
    /// Raised only for operator-configured defaults (fatal at startup).
    /// Malformed user-declared values are passed through untouched for the
    /// API server's own schema validation.
    #[error("invalid quantity {value:?}: {reason}")]
    InvalidQuantity {
        /// The offending quantity string.
        value: String,
        /// Why it failed to parse.
        reason: String,
    },

    /// Normalization would leave a container requesting more of a resource
    /// than its limit allows.
    #[error("container {container}: {kind} request {request} exceeds limit {limit}")]
    ResourceConflict {
        /// 0-based index of the container in the pod's container list.
        container: usize,
        /// The resource kind that conflicts.
        kind: ResourceKind,
        /// The effective request value.
        request: String,
        /// The effective limit value.
        limit: String,
    },
}

impl Error {
    /// Create an `InvalidQuantity` error for the given value and reason
    pub fn invalid_quantity(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidQuantity {
            value: value.into(),
            reason: reason.into(),
        }
    }
}
