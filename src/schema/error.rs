use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::LLMError;

/// Category of one validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Non-optional field without a default is missing from the input.
    Required,
    /// Input value has the wrong JSON type for the declared kind.
    Type,
    Minimum,
    Maximum,
    ExclusiveMinimum,
    ExclusiveMaximum,
    MultipleOf,
    MinLength,
    MaxLength,
    Pattern,
    /// Value is not a member of the declared enum values.
    EnumMismatch,
    /// Value does not equal the declared constant.
    LiteralMismatch,
}

/// One entry in a validation report.
///
/// Paths use dotted names for nested objects and bracketed indices for array
/// elements, e.g. `address.street` or `tags[2]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Location of the offending value within the input.
    pub path: String,
    /// Which check failed.
    pub kind: ViolationKind,
    /// Human-readable description of the failure.
    pub message: String,
}

/// Raised by [`SchemaType::validate_or_raise`](super::SchemaType::validate_or_raise)
/// and [`SchemaInstance::parse`](super::SchemaInstance::parse) when validation
/// fails. Carries the complete ordered violation list so callers can render
/// every problem at once.
#[derive(Debug, Clone, Error)]
#[error("schema validation failed: {message}")]
pub struct SchemaError {
    /// Joined summary of every violation, one clause per entry.
    pub message: String,
    /// The full aggregated violation list, in declaration order.
    pub violations: Vec<Violation>,
}

impl SchemaError {
    pub(crate) fn new(violations: Vec<Violation>) -> Self {
        let message = violations
            .iter()
            .map(|v| format!("{}: {}", v.path, v.message))
            .collect::<Vec<_>>()
            .join("; ");
        Self {
            message,
            violations,
        }
    }
}

impl From<SchemaError> for LLMError {
    fn from(err: SchemaError) -> Self {
        LLMError::Schema {
            message: err.message,
            violations: err.violations,
        }
    }
}
