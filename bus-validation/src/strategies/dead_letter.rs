//! Dead-lettering failed messages.

use super::{message_id, FailureStrategy};
use crate::errors::{ErrorChannelError, PipelineError, ValidationFailure};
use crate::message::TransportMessage;
use crate::pipeline::{IncomingStepContext, Next, TransactionContext};
use crate::validation::{ValidationOutcome, Validator};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Destination for messages that cannot be processed.
///
/// Usually backed by the host's error queue.
#[async_trait]
pub trait ErrorChannel: Send + Sync {
    /// Accepts a poison message together with the reason it failed.
    async fn handle_poison_message(
        &self,
        transport_message: &TransportMessage,
        transaction: &TransactionContext,
        failure: &ValidationFailure,
    ) -> Result<(), ErrorChannelError>;
}

/// Moves the originally received transport message to the error channel.
///
/// The remainder of the pipeline does not run.
#[derive(Clone)]
pub struct DeadLetter {
    error_channel: Arc<dyn ErrorChannel>,
}

impl DeadLetter {
    /// Creates the strategy.
    #[must_use]
    pub fn new(error_channel: Arc<dyn ErrorChannel>) -> Self {
        Self { error_channel }
    }
}

impl fmt::Debug for DeadLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeadLetter").finish_non_exhaustive()
    }
}

#[async_trait]
impl FailureStrategy for DeadLetter {
    fn name(&self) -> &str {
        "dead_letter"
    }

    async fn process(
        &self,
        ctx: &mut IncomingStepContext,
        _next: Next<'_, IncomingStepContext>,
        _validator: &dyn Validator,
        outcome: ValidationOutcome,
    ) -> Result<(), PipelineError> {
        if ctx.cancellation().is_cancelled() {
            let reason = ctx.cancellation().reason().unwrap_or_default();
            return Err(PipelineError::Cancelled(reason));
        }

        let message_type = ctx.envelope().message_type();
        debug!(
            message_id = %message_id(ctx.envelope()),
            message_type = %message_type,
            "Message {} of type {} is configured to be moved to error queue",
            message_id(ctx.envelope()),
            message_type
        );

        let failure = ValidationFailure::new(message_type, &outcome);
        let original = ctx.original_transport_message();
        debug!(
            message_id = original.message_id().unwrap_or("<unknown>"),
            "Moving message with ID {} to error queue",
            original.message_id().unwrap_or("<unknown>")
        );
        self.error_channel
            .handle_poison_message(original, ctx.transaction(), &failure)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{headers, Envelope, Headers, MessageType};
    use crate::testing::{ErrorQueue, InMemoryNetwork, TestMessage, TestMessageValidator};
    use crate::validation::{FieldError, Typed};

    struct Unavailable;

    #[async_trait]
    impl ErrorChannel for Unavailable {
        async fn handle_poison_message(
            &self,
            transport_message: &TransportMessage,
            _transaction: &TransactionContext,
            _failure: &ValidationFailure,
        ) -> Result<(), ErrorChannelError> {
            Err(ErrorChannelError::new(
                transport_message.message_id(),
                "error queue unavailable",
            ))
        }
    }

    /// Keeps every poison message and failure it is handed.
    #[derive(Default)]
    struct Recorded {
        received: parking_lot::Mutex<Vec<(TransportMessage, ValidationFailure)>>,
    }

    #[async_trait]
    impl ErrorChannel for Recorded {
        async fn handle_poison_message(
            &self,
            transport_message: &TransportMessage,
            _transaction: &TransactionContext,
            failure: &ValidationFailure,
        ) -> Result<(), ErrorChannelError> {
            self.received
                .lock()
                .push((transport_message.clone(), failure.clone()));
            Ok(())
        }
    }

    fn context() -> IncomingStepContext {
        let mut raw = Headers::new();
        raw.insert(headers::MESSAGE_ID.to_string(), "m-1".to_string());
        let transport = TransportMessage::new(raw.clone(), b"{\"original\":true}".to_vec());
        let envelope = Envelope::with_headers(raw, Arc::new(TestMessage::invalid()));
        IncomingStepContext::new(transport, envelope, Arc::new(TransactionContext::new("input")))
    }

    fn outcome() -> ValidationOutcome {
        ValidationOutcome::invalid(vec![FieldError::new("ShouldPassValidation", "failed")])
    }

    #[tokio::test]
    async fn test_forwards_original_transport_message() {
        let network = InMemoryNetwork::new();
        let strategy = DeadLetter::new(Arc::new(ErrorQueue::new(network.clone())));
        let validator = Typed::<TestMessage, _>::new(TestMessageValidator);

        let mut ctx = context();
        ctx.set_transport_message(TransportMessage::new(Headers::new(), b"replaced".to_vec()));

        strategy
            .process(&mut ctx, Next::new(&[]), &validator, outcome())
            .await
            .unwrap();

        let dead = network.receive("error").unwrap();
        assert_eq!(dead.body, b"{\"original\":true}".to_vec());
        assert_eq!(dead.message_id(), Some("m-1"));
        assert!(dead
            .header(headers::ERROR_DETAILS)
            .unwrap()
            .contains("ShouldPassValidation"));
    }

    #[tokio::test]
    async fn test_cancelled_context_skips_write() {
        let network = InMemoryNetwork::new();
        let strategy = DeadLetter::new(Arc::new(ErrorQueue::new(network.clone())));
        let validator = Typed::<TestMessage, _>::new(TestMessageValidator);

        let mut ctx = context();
        ctx.cancellation().cancel("shutdown");

        let err = strategy
            .process(&mut ctx, Next::new(&[]), &validator, outcome())
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(network.count("error"), 0);
    }

    #[tokio::test]
    async fn test_channel_failure_propagates() {
        let strategy = DeadLetter::new(Arc::new(Unavailable));
        let validator = Typed::<TestMessage, _>::new(TestMessageValidator);
        let mut ctx = context();

        let err = strategy
            .process(&mut ctx, Next::new(&[]), &validator, outcome())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::ErrorChannel(ref e) if e.message_id == "m-1"));
    }

    #[tokio::test]
    async fn test_channel_receives_structured_failure() {
        let channel = Arc::new(Recorded::default());
        let strategy = DeadLetter::new(Arc::clone(&channel) as Arc<dyn ErrorChannel>);
        let validator = Typed::<TestMessage, _>::new(TestMessageValidator);
        let outcome = ValidationOutcome::invalid(vec![
            FieldError::new("Zeta", "last letter"),
            FieldError::new("Alpha", "first letter"),
        ]);

        let mut ctx = context();
        let original = ctx.original_transport_message().clone();
        ctx.set_transport_message(TransportMessage::new(Headers::new(), b"replaced".to_vec()));

        strategy
            .process(&mut ctx, Next::new(&[]), &validator, outcome.clone())
            .await
            .unwrap();

        let received = channel.received.lock();
        assert_eq!(received.len(), 1);
        let (transport, failure) = &received[0];
        assert_eq!(transport, &original);
        assert_eq!(failure.errors(), outcome.errors());
        assert_eq!(failure.errors()[0].property_name, "Zeta");
        assert_eq!(failure.message_type, MessageType::of::<TestMessage>().name());
    }
}
