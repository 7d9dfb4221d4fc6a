//! Validation outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single failed rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    /// The property the rule was declared for.
    pub property_name: String,
    /// Human-readable error message.
    pub message: String,
    /// The value that failed, if the validator recorded it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempted_value: Option<serde_json::Value>,
}

impl FieldError {
    /// Creates a new field error.
    #[must_use]
    pub fn new(property_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            property_name: property_name.into(),
            message: message.into(),
            attempted_value: None,
        }
    }

    /// Records the value that failed.
    #[must_use]
    pub fn with_attempted_value(mut self, value: serde_json::Value) -> Self {
        self.attempted_value = Some(value);
        self
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.property_name, self.message)
    }
}

/// The result of validating one message.
///
/// Errors keep the order in which the validator's rules were declared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    errors: Vec<FieldError>,
}

impl ValidationOutcome {
    /// Creates a passing outcome.
    #[must_use]
    pub fn valid() -> Self {
        Self::default()
    }

    /// Creates an outcome from a list of errors.
    #[must_use]
    pub fn invalid(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    /// Adds an error.
    #[must_use]
    pub fn with_error(mut self, error: FieldError) -> Self {
        self.errors.push(error);
        self
    }

    /// Returns true if no rule failed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the failed rules.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Consumes the outcome and returns the failed rules.
    #[must_use]
    pub fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            return f.write_str("valid");
        }
        let rendered: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        f.write_str(&rendered.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_valid_outcome() {
        let outcome = ValidationOutcome::valid();
        assert!(outcome.is_valid());
        assert!(outcome.errors().is_empty());
        assert_eq!(outcome.to_string(), "valid");
    }

    #[test]
    fn test_errors_keep_declaration_order() {
        let outcome = ValidationOutcome::valid()
            .with_error(FieldError::new("Zeta", "first"))
            .with_error(FieldError::new("Alpha", "second"));

        assert!(!outcome.is_valid());
        let names: Vec<&str> = outcome
            .errors()
            .iter()
            .map(|e| e.property_name.as_str())
            .collect();
        assert_eq!(names, vec!["Zeta", "Alpha"]);
        assert_eq!(outcome.to_string(), "Zeta: first; Alpha: second");
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = ValidationOutcome::invalid(vec![FieldError::new("Name", "required")
            .with_attempted_value(serde_json::json!(""))]);

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["errors"][0]["property_name"], "Name");
        assert_eq!(json["errors"][0]["attempted_value"], "");

        let back: ValidationOutcome = serde_json::from_value(json).unwrap();
        assert_eq!(back, outcome);
    }
}
