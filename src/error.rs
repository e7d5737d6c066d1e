#![forbid(unsafe_code)]

//! Error taxonomy shared across the compiler and planner layers.
//!
//! Validation errors are raised at compile time and carry the field,
//! operator, or identifier that triggered them. Execution errors carry the
//! compiled text and the parameter names, never the bound values.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, FrameError>;

/// Structured errors emitted by compilation and execution.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FrameError {
    /// Label, relationship type, or property name failed strict validation.
    #[error("invalid identifier '{ident}'")]
    InvalidIdentifier {
        /// The rejected identifier.
        ident: String,
    },
    /// A filter key carried an operator suffix outside the known set.
    #[error("unknown operator suffix '{op}' in filter key '{key}'")]
    UnknownOperator {
        /// The full filter key as supplied by the caller.
        key: String,
        /// The unrecognized trailing segment.
        op: String,
    },
    /// Operator and value kind disagree (e.g. `in` given a scalar).
    #[error("operator '{op}' on field '{field}' expects {expected}")]
    TypeMismatch {
        /// The property the predicate targets.
        field: String,
        /// The operator suffix as written.
        op: &'static str,
        /// What the operator accepts.
        expected: &'static str,
    },
    /// A required input was empty (row list, key list, target label).
    #[error("{what} must not be empty")]
    EmptyInput {
        /// Which input was empty.
        what: &'static str,
    },
    /// A key field declared for an upsert is absent from a row.
    #[error("key field '{field}' missing from row {row}")]
    MissingField {
        /// The declared key field.
        field: String,
        /// Zero-based index of the offending row.
        row: usize,
    },
    /// A predicate namespace cannot be resolved to a single alias.
    #[error("namespace '{segment}' is ambiguous")]
    AmbiguousNamespace {
        /// The colliding alias or namespace segment.
        segment: String,
    },
    /// A write plan was asked to transition after reaching a terminal state.
    #[error("write plan already {state}")]
    PlanConsumed {
        /// The terminal state the plan is in.
        state: &'static str,
    },
    /// The execution collaborator failed; the offending statement is
    /// attached for diagnosis. Parameter values are deliberately omitted.
    #[error("execution failed: {message}")]
    Execution {
        /// The collaborator's error, verbatim.
        message: String,
        /// The statement text that was being executed.
        text: String,
        /// Names of the bound parameters (values withheld).
        param_names: Vec<String>,
    },
}

impl FrameError {
    /// Returns a machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            FrameError::InvalidIdentifier { .. } => "InvalidIdentifier",
            FrameError::UnknownOperator { .. } => "UnknownOperator",
            FrameError::TypeMismatch { .. } => "TypeMismatch",
            FrameError::EmptyInput { .. } => "EmptyInput",
            FrameError::MissingField { .. } => "MissingField",
            FrameError::AmbiguousNamespace { .. } => "AmbiguousNamespace",
            FrameError::PlanConsumed { .. } => "PlanConsumed",
            FrameError::Execution { .. } => "ExecutionError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_display_omits_values() {
        let err = FrameError::Execution {
            message: "constraint violation".into(),
            text: "MERGE (n:Person {email: item.email})".into(),
            param_names: vec!["batch".into()],
        };
        let shown = err.to_string();
        assert!(shown.contains("constraint violation"));
        assert!(!shown.contains("batch"));
    }

    #[test]
    fn codes_are_stable() {
        let err = FrameError::EmptyInput { what: "rows" };
        assert_eq!(err.code(), "EmptyInput");
    }
}
