//! What happens to an incoming message that failed validation.
//!
//! This module provides:
//! - The [`FailureStrategy`] trait and the four built-in strategies
//! - The [`Disposition`] names used in configuration
//! - The per-type [`StrategyTable`] with its default fallback

mod dead_letter;
mod drop;
mod pass_through;
mod wrap;

pub use dead_letter::{DeadLetter, ErrorChannel};
pub use drop::DropMessage;
pub use pass_through::PassThrough;
pub use wrap::WrapAsValidationFailed;

use crate::errors::{ConfigurationError, PipelineError};
use crate::message::{Envelope, MessageType};
use crate::pipeline::{IncomingStepContext, Next};
use crate::validation::{ValidationOutcome, Validator};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Handles an incoming message that failed validation.
///
/// A strategy receives the pipeline continuation by value: it either runs it
/// or drops it, and cannot run it twice.
#[async_trait]
pub trait FailureStrategy: Send + Sync {
    /// Returns a short name for diagnostics.
    fn name(&self) -> &str;

    /// Disposes of the failed message.
    async fn process(
        &self,
        ctx: &mut IncomingStepContext,
        next: Next<'_, IncomingStepContext>,
        validator: &dyn Validator,
        outcome: ValidationOutcome,
    ) -> Result<(), PipelineError>;
}

/// The built-in failure strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Move the original transport message to the error channel.
    DeadLetter,
    /// Discard the message.
    Drop,
    /// Continue the pipeline with the message unchanged.
    PassThrough,
    /// Continue the pipeline with the message wrapped as `ValidationFailed<T>`.
    #[default]
    Wrap,
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DeadLetter => "dead_letter",
            Self::Drop => "drop",
            Self::PassThrough => "pass_through",
            Self::Wrap => "wrap",
        };
        f.write_str(name)
    }
}

/// Maps message types to failure strategies, with a default for the rest.
///
/// Lookups match the exact concrete type. The table is built once during
/// configuration and only read afterwards.
#[derive(Clone)]
pub struct StrategyTable {
    strategies: HashMap<MessageType, Arc<dyn FailureStrategy>>,
    default: Arc<dyn FailureStrategy>,
}

impl StrategyTable {
    /// Creates a table with only a default strategy.
    #[must_use]
    pub fn new(default: Arc<dyn FailureStrategy>) -> Self {
        Self {
            strategies: HashMap::new(),
            default,
        }
    }

    /// Registers the strategy for a message type.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::DuplicateStrategy`] if the type already
    /// has a strategy.
    pub fn insert(
        &mut self,
        message_type: MessageType,
        strategy: Arc<dyn FailureStrategy>,
    ) -> Result<(), ConfigurationError> {
        if self.strategies.contains_key(&message_type) {
            return Err(ConfigurationError::duplicate_strategy(message_type));
        }
        self.strategies.insert(message_type, strategy);
        Ok(())
    }

    /// Returns the strategy for a message type, or the default.
    #[must_use]
    pub fn get(&self, message_type: &MessageType) -> &Arc<dyn FailureStrategy> {
        self.strategies.get(message_type).unwrap_or(&self.default)
    }

    /// Returns true if the type has its own strategy.
    #[must_use]
    pub fn contains(&self, message_type: &MessageType) -> bool {
        self.strategies.contains_key(message_type)
    }

    /// Returns the default strategy.
    #[must_use]
    pub fn default_strategy(&self) -> &Arc<dyn FailureStrategy> {
        &self.default
    }

    /// Returns the number of type-specific registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Returns true if only the default is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl fmt::Debug for StrategyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: HashMap<&str, &str> = self
            .strategies
            .iter()
            .map(|(ty, strategy)| (ty.name(), strategy.name()))
            .collect();
        f.debug_struct("StrategyTable")
            .field("strategies", &entries)
            .field("default", &self.default.name())
            .finish()
    }
}

/// Returns the message id header for logging.
fn message_id(envelope: &Envelope) -> &str {
    envelope.message_id().unwrap_or("<unknown>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{OtherMessage, TestMessage};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lookup_falls_back_to_default() {
        let mut table = StrategyTable::new(Arc::new(PassThrough));
        table
            .insert(MessageType::of::<TestMessage>(), Arc::new(DropMessage))
            .unwrap();

        assert_eq!(table.get(&MessageType::of::<TestMessage>()).name(), "drop");
        assert_eq!(
            table.get(&MessageType::of::<OtherMessage>()).name(),
            "pass_through"
        );
        assert!(table.contains(&MessageType::of::<TestMessage>()));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut table = StrategyTable::new(Arc::new(PassThrough));
        table
            .insert(MessageType::of::<TestMessage>(), Arc::new(DropMessage))
            .unwrap();

        let err = table
            .insert(MessageType::of::<TestMessage>(), Arc::new(PassThrough))
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateStrategy { .. }));
        assert_eq!(table.get(&MessageType::of::<TestMessage>()).name(), "drop");
    }

    #[test]
    fn test_disposition_serde() {
        assert_eq!(Disposition::default(), Disposition::Wrap);
        assert_eq!(
            serde_json::to_string(&Disposition::DeadLetter).unwrap(),
            "\"dead_letter\""
        );
        let parsed: Disposition = serde_json::from_str("\"pass_through\"").unwrap();
        assert_eq!(parsed, Disposition::PassThrough);
        assert_eq!(Disposition::Drop.to_string(), "drop");
    }
}
