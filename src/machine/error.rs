//! Recoverable engine errors.
//!
//! Only two failure kinds are expected from well-formed templates; both are
//! recoverable by the caller and leave the machine exactly as it was. Any
//! other panic or error raised inside a validator or candidate source is a
//! programming error and propagates unmodified.

use thiserror::Error;

/// A transition or binding attempt was rejected.
///
/// The orchestrator catches this, marks the UI invalid, displays the
/// message, and does not advance.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StateTransitionError {
    /// The current state failed validation at the moment of the call.
    #[error("{reason}")]
    ValidationFailed { reason: String },

    /// A branch index named a child the current template does not have.
    #[error("no child template at index {index} ({available} available)")]
    UnknownBranch { index: usize, available: usize },

    /// A bound value failed validation at one step of `bind_values`.
    #[error("bound value rejected at '{state}': {reason}")]
    BindingRejected { state: String, reason: String },

    /// Multiple values were bound to a single-value state.
    #[error("multiple values bound to single-value state '{state}'")]
    BindingNotMultivalue { state: String },

    /// The binding ran out of steps before the grammar reached a terminal
    /// node.
    #[error("binding exhausted after {consumed} steps before reaching a terminal state")]
    BindingTooShort { consumed: usize },

    /// The grammar reached a terminal node with steps left over.
    #[error("binding has {remaining} unconsumed steps after reaching a terminal state")]
    BindingTooLong { remaining: usize },
}

/// An archive operation was not applicable.
///
/// Callers treat this as a no-op: no position or value change happened.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValueArchiveError {
    /// The current template does not accept multiple values.
    #[error("state '{state}' does not accept multiple values")]
    NotMultivalue { state: String },

    /// Nothing to unarchive.
    #[error("archive is empty")]
    EmptyArchive,

    /// `remove_archived_value` was called with an out-of-range index.
    #[error("archive index {index} is out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// The current value is absent or invalid and cannot be archived.
    #[error("current value cannot be archived: {reason}")]
    InvalidValue { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_failure_displays_the_reason_alone() {
        let err = StateTransitionError::ValidationFailed {
            reason: "Value must be numeric".to_string(),
        };
        assert_eq!(err.to_string(), "Value must be numeric");
    }

    #[test]
    fn archive_errors_name_the_state() {
        let err = ValueArchiveError::NotMultivalue {
            state: "Choose a field".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "state 'Choose a field' does not accept multiple values"
        );
    }

    #[test]
    fn index_error_reports_bounds() {
        let err = ValueArchiveError::IndexOutOfRange { index: 5, len: 2 };
        assert_eq!(err.to_string(), "archive index 5 is out of range (len 2)");
    }
}
