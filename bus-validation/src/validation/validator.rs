//! Validator traits.

use super::ValidationOutcome;
use crate::errors::ValidatorError;
use crate::message::{Message, MessageType};
use async_trait::async_trait;
use std::fmt;
use std::marker::PhantomData;

/// Identity of a validator implementation.
///
/// Rendered into the `ValidatorType` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValidatorType {
    name: &'static str,
}

impl ValidatorType {
    /// Returns the identity of the validator type `V`.
    #[must_use]
    pub fn of<V: ?Sized + 'static>() -> Self {
        Self {
            name: std::any::type_name::<V>(),
        }
    }

    /// Returns the fully-qualified type name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for ValidatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A type-erased validator as seen by the validation steps.
///
/// Most validators implement [`TypedValidator`] and are adapted with
/// [`Typed`]. Implement this trait directly for validators that cover more
/// than one message type.
#[async_trait]
pub trait Validator: Send + Sync + 'static {
    /// Returns the identity written to the `ValidatorType` header.
    fn validator_type(&self) -> ValidatorType {
        ValidatorType::of::<Self>()
    }

    /// Returns true if this validator accepts bodies of the given type.
    fn can_validate(&self, message_type: &MessageType) -> bool;

    /// Validates a body.
    ///
    /// An `Err` means the validator itself failed, not the message.
    async fn validate(&self, message: &dyn Message) -> Result<ValidationOutcome, ValidatorError>;
}

/// A validator for a single concrete message type.
#[async_trait]
pub trait TypedValidator<T: Message>: Send + Sync + 'static {
    /// Validates a message.
    async fn validate(&self, message: &T) -> ValidationOutcome;
}

/// Adapts a [`TypedValidator`] to the type-erased [`Validator`] trait.
pub struct Typed<T, V> {
    inner: V,
    _message: PhantomData<fn() -> T>,
}

impl<T, V> Typed<T, V>
where
    T: Message,
    V: TypedValidator<T>,
{
    /// Wraps a typed validator.
    #[must_use]
    pub const fn new(inner: V) -> Self {
        Self {
            inner,
            _message: PhantomData,
        }
    }

    /// Returns the wrapped validator.
    #[must_use]
    pub const fn inner(&self) -> &V {
        &self.inner
    }
}

impl<T, V: fmt::Debug> fmt::Debug for Typed<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Typed").field(&self.inner).finish()
    }
}

#[async_trait]
impl<T, V> Validator for Typed<T, V>
where
    T: Message,
    V: TypedValidator<T>,
{
    fn validator_type(&self) -> ValidatorType {
        ValidatorType::of::<V>()
    }

    fn can_validate(&self, message_type: &MessageType) -> bool {
        message_type.is::<T>()
    }

    async fn validate(&self, message: &dyn Message) -> Result<ValidationOutcome, ValidatorError> {
        let typed = message.as_any().downcast_ref::<T>().ok_or_else(|| {
            ValidatorError::new(
                ValidatorType::of::<V>().name(),
                format!("cannot validate a '{}' body", message.message_type()),
            )
        })?;
        Ok(self.inner.validate(typed).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{OtherMessage, TestMessage, TestMessageValidator};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_typed_reports_inner_validator_type() {
        let validator = Typed::<TestMessage, _>::new(TestMessageValidator);

        assert_eq!(
            validator.validator_type(),
            ValidatorType::of::<TestMessageValidator>()
        );
        assert!(validator
            .validator_type()
            .name()
            .ends_with("TestMessageValidator"));
    }

    #[test]
    fn test_typed_can_validate_exact_type_only() {
        let validator = Typed::<TestMessage, _>::new(TestMessageValidator);

        assert!(validator.can_validate(&MessageType::of::<TestMessage>()));
        assert!(!validator.can_validate(&MessageType::of::<OtherMessage>()));
    }

    #[tokio::test]
    async fn test_typed_validates_body() {
        let validator = Typed::<TestMessage, _>::new(TestMessageValidator);

        let outcome = validator.validate(&TestMessage::valid()).await.unwrap();
        assert!(outcome.is_valid());

        let outcome = validator.validate(&TestMessage::invalid()).await.unwrap();
        assert_eq!(outcome.errors().len(), 1);
        assert_eq!(outcome.errors()[0].property_name, "ShouldPassValidation");
    }

    #[tokio::test]
    async fn test_typed_rejects_foreign_body() {
        let validator = Typed::<TestMessage, _>::new(TestMessageValidator);

        let err = validator.validate(&OtherMessage::default()).await.unwrap_err();
        assert!(err.validator.ends_with("TestMessageValidator"));
        assert!(err.reason.contains("OtherMessage"));
    }
}
