//! Per-type wrap operations.

use super::{FailureDetails, ValidationFailed};
use crate::errors::WrapError;
use crate::message::{Message, MessageType};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

type WrapFn = fn(Arc<dyn Any + Send + Sync>, FailureDetails) -> Result<Arc<dyn Message>, WrapError>;

/// Builds `ValidationFailed<T>` from a type-erased body of type `T`.
#[derive(Clone, Copy)]
pub struct WrapOperation {
    source: MessageType,
    target: MessageType,
    wrap: WrapFn,
}

impl WrapOperation {
    /// Returns the operation for `T`.
    #[must_use]
    pub fn of<T: Message>() -> Self {
        Self {
            source: MessageType::of::<T>(),
            target: MessageType::of::<ValidationFailed<T>>(),
            wrap: wrap_failed::<T>,
        }
    }

    /// Returns the body type this operation accepts.
    #[must_use]
    pub const fn source(&self) -> MessageType {
        self.source
    }

    /// Returns the wrapper type this operation produces.
    #[must_use]
    pub const fn target(&self) -> MessageType {
        self.target
    }

    /// Wraps `body`, keeping the same allocation inside the wrapper.
    ///
    /// # Errors
    ///
    /// Returns [`WrapError::TypeMismatch`] if `body` is not of the source type.
    pub fn apply(
        &self,
        body: Arc<dyn Message>,
        details: FailureDetails,
    ) -> Result<Arc<dyn Message>, WrapError> {
        let actual = body.message_type();
        if actual != self.source {
            return Err(self.mismatch(actual));
        }
        (self.wrap)(body.into_any(), details)
    }

    fn mismatch(&self, actual: MessageType) -> WrapError {
        WrapError::TypeMismatch {
            expected: self.source.name().to_string(),
            actual: actual.name().to_string(),
        }
    }
}

impl fmt::Debug for WrapOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrapOperation")
            .field("source", &self.source)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

fn wrap_failed<T: Message>(
    body: Arc<dyn Any + Send + Sync>,
    details: FailureDetails,
) -> Result<Arc<dyn Message>, WrapError> {
    let message = body.downcast::<T>().map_err(|_| WrapError::TypeMismatch {
        expected: MessageType::of::<T>().name().to_string(),
        actual: "<unknown>".to_string(),
    })?;
    Ok(Arc::new(ValidationFailed::new(message, details)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Headers;
    use crate::testing::{OtherMessage, TestMessage, TestMessageValidator};
    use crate::validation::{FieldError, ValidationOutcome, ValidatorType};

    fn details() -> FailureDetails {
        FailureDetails::new(
            Headers::new(),
            ValidationOutcome::invalid(vec![FieldError::new("ShouldPassValidation", "failed")]),
            ValidatorType::of::<TestMessageValidator>(),
        )
    }

    #[test]
    fn test_operation_types() {
        let op = WrapOperation::of::<TestMessage>();

        assert_eq!(op.source(), MessageType::of::<TestMessage>());
        assert_eq!(op.target(), MessageType::of::<ValidationFailed<TestMessage>>());
    }

    #[test]
    fn test_apply_keeps_body_identity() {
        let body: Arc<dyn Message> = Arc::new(TestMessage::invalid());
        let op = WrapOperation::of::<TestMessage>();

        let wrapped = op.apply(Arc::clone(&body), details()).unwrap();

        assert_eq!(wrapped.message_type(), op.target());
        let failed = wrapped
            .as_any()
            .downcast_ref::<ValidationFailed<TestMessage>>()
            .unwrap();
        assert!(std::ptr::eq(
            Arc::as_ptr(failed.message()).cast::<()>(),
            Arc::as_ptr(&body).cast::<()>()
        ));
        assert_eq!(failed.outcome().errors().len(), 1);
    }

    #[test]
    fn test_apply_rejects_other_type() {
        let body: Arc<dyn Message> = Arc::new(OtherMessage::default());
        let op = WrapOperation::of::<TestMessage>();

        let err = op.apply(body, details()).unwrap_err();
        assert!(matches!(err, WrapError::TypeMismatch { .. }));
        assert!(err.to_string().contains("OtherMessage"));
    }

    #[test]
    fn test_wrapper_is_not_wrappable() {
        let body: Arc<dyn Message> = Arc::new(TestMessage::invalid());
        let wrapped = WrapOperation::of::<TestMessage>()
            .apply(body, details())
            .unwrap();

        assert!(wrapped.wrap_operation().is_none());
    }
}
