//! Error types for validation steps and their configuration.
//!
//! Configuration errors are raised synchronously while a pipeline is being
//! built. Everything else surfaces from a step as a [`PipelineError`].

use crate::message::MessageType;
use crate::validation::{FieldError, ValidationOutcome};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Common configuration error codes.
pub mod codes {
    /// A failure strategy was registered twice for one message type.
    pub const DUPLICATE_STRATEGY: &str = "CONFIG-001-DUPLICATE_STRATEGY";
    /// A validator was registered twice for one message type.
    pub const DUPLICATE_VALIDATOR: &str = "CONFIG-002-DUPLICATE_VALIDATOR";
    /// A pipeline step name is already taken.
    pub const DUPLICATE_STEP: &str = "CONFIG-003-DUPLICATE_STEP";
    /// A pipeline step used as an anchor does not exist.
    pub const MISSING_STEP: &str = "CONFIG-004-MISSING_STEP";
    /// Dead-lettering was configured without an error channel.
    pub const MISSING_ERROR_CHANNEL: &str = "CONFIG-005-MISSING_ERROR_CHANNEL";
}

/// Metadata about a configuration error for better diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Error code (e.g., "CONFIG-001-DUPLICATE_STRATEGY").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("code".to_string(), serde_json::json!(self.code));
        map.insert("summary".to_string(), serde_json::json!(self.summary));
        if let Some(ref hint) = self.fix_hint {
            map.insert("fix_hint".to_string(), serde_json::json!(hint));
        }
        map
    }
}

/// Errors raised while configuring validation.
#[derive(Debug, Clone, Error)]
pub enum ConfigurationError {
    /// A failure strategy is already registered for the message type.
    #[error("A failure strategy is already registered for message type '{message_type}'")]
    DuplicateStrategy {
        /// The message type name.
        message_type: String,
    },

    /// A validator is already registered for the message type.
    #[error("A validator is already registered for message type '{message_type}'")]
    DuplicateValidator {
        /// The message type name.
        message_type: String,
    },

    /// The pipeline already contains a step with this name.
    #[error("Pipeline already contains a step named '{name}'")]
    DuplicateStep {
        /// The step name.
        name: String,
    },

    /// The pipeline has no step with this name.
    #[error("Pipeline has no step named '{name}'")]
    MissingStep {
        /// The step name.
        name: String,
    },

    /// Dead-lettering is configured but no error channel was provided.
    #[error("Dead-lettering is configured for [{}] but no error channel was provided", .message_types.join(", "))]
    MissingErrorChannel {
        /// Message types configured to be dead-lettered (`*` for the default).
        message_types: Vec<String>,
    },
}

impl ConfigurationError {
    /// Creates a duplicate strategy error.
    #[must_use]
    pub fn duplicate_strategy(message_type: MessageType) -> Self {
        Self::DuplicateStrategy {
            message_type: message_type.name().to_string(),
        }
    }

    /// Creates a duplicate validator error.
    #[must_use]
    pub fn duplicate_validator(message_type: MessageType) -> Self {
        Self::DuplicateValidator {
            message_type: message_type.name().to_string(),
        }
    }

    /// Creates a duplicate step error.
    #[must_use]
    pub fn duplicate_step(name: impl Into<String>) -> Self {
        Self::DuplicateStep { name: name.into() }
    }

    /// Creates a missing step error.
    #[must_use]
    pub fn missing_step(name: impl Into<String>) -> Self {
        Self::MissingStep { name: name.into() }
    }

    /// Returns structured diagnostics for the error.
    #[must_use]
    pub fn error_info(&self) -> ErrorInfo {
        match self {
            Self::DuplicateStrategy { .. } => {
                ErrorInfo::new(codes::DUPLICATE_STRATEGY, self.to_string())
                    .with_fix_hint("Register exactly one failure strategy per message type.")
            }
            Self::DuplicateValidator { .. } => {
                ErrorInfo::new(codes::DUPLICATE_VALIDATOR, self.to_string())
                    .with_fix_hint("Combine the rules into a single validator for the message type.")
            }
            Self::DuplicateStep { .. } => ErrorInfo::new(codes::DUPLICATE_STEP, self.to_string())
                .with_fix_hint("Install validation only once per pipeline."),
            Self::MissingStep { .. } => ErrorInfo::new(codes::MISSING_STEP, self.to_string())
                .with_fix_hint("Build the pipeline with its host steps before installing validation."),
            Self::MissingErrorChannel { .. } => {
                ErrorInfo::new(codes::MISSING_ERROR_CHANNEL, self.to_string())
                    .with_fix_hint("Pass an error channel to the configurer with `error_channel`.")
            }
        }
    }
}

/// A message failed validation.
///
/// Returned by the outgoing step, and handed to the error channel when a
/// failed incoming message is dead-lettered.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationFailure {
    /// Name of the message type that failed.
    pub message_type: String,
    /// Field errors in rule declaration order.
    pub errors: Vec<FieldError>,
}

impl ValidationFailure {
    /// Creates a failure from a validation outcome.
    #[must_use]
    pub fn new(message_type: MessageType, outcome: &ValidationOutcome) -> Self {
        Self {
            message_type: message_type.name().to_string(),
            errors: outcome.errors().to_vec(),
        }
    }

    /// Returns the field errors.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed for '{}':", self.message_type)?;
        for error in &self.errors {
            write!(f, "\n -- {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationFailure {}

/// Failure to wrap a body as `ValidationFailed<T>`.
///
/// Indicates a programming defect rather than bad data.
#[derive(Debug, Clone, Error)]
pub enum WrapError {
    /// The body type provides no wrap operation.
    #[error("Message type '{message_type}' cannot be wrapped as ValidationFailed")]
    NotWrappable {
        /// The message type name.
        message_type: String,
    },

    /// A wrap operation received a body of a different type.
    #[error("Wrap operation for '{expected}' was invoked with a '{actual}' body")]
    TypeMismatch {
        /// The type the operation was built for.
        expected: String,
        /// The type that was passed.
        actual: String,
    },
}

/// The validator engine failed to produce an outcome.
#[derive(Debug, Clone, Error)]
#[error("Validator '{validator}' failed: {reason}")]
pub struct ValidatorError {
    /// The validator type name.
    pub validator: String,
    /// The reason for failure.
    pub reason: String,
}

impl ValidatorError {
    /// Creates a new validator error.
    #[must_use]
    pub fn new(validator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            validator: validator.into(),
            reason: reason.into(),
        }
    }
}

/// The error channel rejected a poison message.
#[derive(Debug, Clone, Error)]
#[error("Error channel could not accept message '{message_id}': {reason}")]
pub struct ErrorChannelError {
    /// The message id, or `<unknown>`.
    pub message_id: String,
    /// The reason for failure.
    pub reason: String,
}

impl ErrorChannelError {
    /// Creates a new error channel error.
    #[must_use]
    pub fn new(message_id: Option<&str>, reason: impl Into<String>) -> Self {
        Self {
            message_id: message_id.unwrap_or("<unknown>").to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors returned by pipeline steps.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An outgoing message failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    /// A failed message could not be wrapped.
    #[error(transparent)]
    Wrap(#[from] WrapError),

    /// The validator engine failed.
    #[error(transparent)]
    Validator(#[from] ValidatorError),

    /// The error channel failed.
    #[error(transparent)]
    ErrorChannel(#[from] ErrorChannelError),

    /// The pipeline was misconfigured.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The pipeline execution was cancelled.
    #[error("Pipeline cancelled: {0}")]
    Cancelled(String),

    /// No handler accepted the message.
    #[error("Message of type '{message_type}' could not be dispatched to any handlers")]
    NoHandlers {
        /// The message type name.
        message_type: String,
    },

    /// An application handler failed.
    #[error(transparent)]
    Handler(#[from] anyhow::Error),

    /// A body could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PipelineError {
    /// Creates a no handlers error.
    #[must_use]
    pub fn no_handlers(message_type: MessageType) -> Self {
        Self::NoHandlers {
            message_type: message_type.name().to_string(),
        }
    }

    /// Returns true if this is a cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Returns the validation failure, if this is one.
    #[must_use]
    pub const fn as_validation_failure(&self) -> Option<&ValidationFailure> {
        match self {
            Self::Validation(failure) => Some(failure),
            _ => None,
        }
    }
}
