//! Validator resolution by message type.

use super::{Typed, TypedValidator, Validator};
use crate::errors::ConfigurationError;
use crate::message::{Message, MessageType};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Resolves the validator for a message type.
///
/// Returning `None` means messages of that type are not validated.
#[cfg_attr(test, mockall::automock)]
pub trait ValidatorFactory: Send + Sync {
    /// Returns the validator for the given message type, if any.
    fn validator_for(&self, message_type: &MessageType) -> Option<Arc<dyn Validator>>;
}

/// A [`ValidatorFactory`] backed by an explicit type-to-validator map.
#[derive(Default, Clone)]
pub struct ValidatorRegistry {
    validators: HashMap<MessageType, Arc<dyn Validator>>,
}

impl ValidatorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a typed validator for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::DuplicateValidator`] if `T` already has a
    /// validator.
    pub fn register<T, V>(self, validator: V) -> Result<Self, ConfigurationError>
    where
        T: Message,
        V: TypedValidator<T>,
    {
        self.register_validator(MessageType::of::<T>(), Arc::new(Typed::<T, V>::new(validator)))
    }

    /// Registers a type-erased validator for a message type.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::DuplicateValidator`] if the type already
    /// has a validator.
    pub fn register_validator(
        mut self,
        message_type: MessageType,
        validator: Arc<dyn Validator>,
    ) -> Result<Self, ConfigurationError> {
        if self.validators.contains_key(&message_type) {
            return Err(ConfigurationError::duplicate_validator(message_type));
        }
        self.validators.insert(message_type, validator);
        Ok(self)
    }

    /// Returns the number of registered validators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Returns true if no validator is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl ValidatorFactory for ValidatorRegistry {
    fn validator_for(&self, message_type: &MessageType) -> Option<Arc<dyn Validator>> {
        self.validators.get(message_type).cloned()
    }
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.validators.keys().map(MessageType::name).collect();
        f.debug_struct("ValidatorRegistry")
            .field("message_types", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ConfigurationError;
    use crate::testing::{OtherMessage, TestMessage, TestMessageValidator};

    #[test]
    fn test_registry_resolves_registered_type() {
        let registry = ValidatorRegistry::new()
            .register::<TestMessage, _>(TestMessageValidator)
            .unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry
            .validator_for(&MessageType::of::<TestMessage>())
            .is_some());
        assert!(registry
            .validator_for(&MessageType::of::<OtherMessage>())
            .is_none());
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let result = ValidatorRegistry::new()
            .register::<TestMessage, _>(TestMessageValidator)
            .and_then(|r| r.register::<TestMessage, _>(TestMessageValidator));

        assert!(matches!(
            result,
            Err(ConfigurationError::DuplicateValidator { .. })
        ));
    }

    #[test]
    fn test_mock_factory() {
        let mut factory = MockValidatorFactory::new();
        factory.expect_validator_for().times(1).returning(|_| None);

        assert!(factory
            .validator_for(&MessageType::of::<TestMessage>())
            .is_none());
    }
}
