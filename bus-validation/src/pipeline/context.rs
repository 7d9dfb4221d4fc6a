//! Per-message step contexts.

use crate::cancellation::CancellationToken;
use crate::message::{Envelope, TransportMessage};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// The unit of work a received message is processed in.
#[derive(Debug, Clone)]
pub struct TransactionContext {
    id: Uuid,
    source_queue: String,
    started_at: DateTime<Utc>,
}

impl TransactionContext {
    /// Creates a transaction for a message received from `source_queue`.
    #[must_use]
    pub fn new(source_queue: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_queue: source_queue.into(),
            started_at: Utc::now(),
        }
    }

    /// Returns the transaction id.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the queue the message was received from.
    #[must_use]
    pub fn source_queue(&self) -> &str {
        &self.source_queue
    }

    /// Returns when processing started.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

/// Context of one received message as it moves through the incoming pipeline.
///
/// The transport message the host received is captured once, before any step
/// runs, and stays reachable through
/// [`original_transport_message`](Self::original_transport_message) even if
/// a step replaces the current one.
#[derive(Debug)]
pub struct IncomingStepContext {
    envelope: Envelope,
    transport_message: TransportMessage,
    original: Arc<TransportMessage>,
    transaction: Arc<TransactionContext>,
    cancellation: Arc<CancellationToken>,
}

impl IncomingStepContext {
    /// Creates a context for a received message and its deserialized envelope.
    #[must_use]
    pub fn new(
        transport_message: TransportMessage,
        envelope: Envelope,
        transaction: Arc<TransactionContext>,
    ) -> Self {
        Self {
            original: Arc::new(transport_message.clone()),
            transport_message,
            envelope,
            transaction,
            cancellation: Arc::new(CancellationToken::new()),
        }
    }

    /// Sets the cancellation token observed by steps.
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: Arc<CancellationToken>) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Returns the current envelope.
    #[must_use]
    pub const fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Returns the current envelope for modification.
    pub fn envelope_mut(&mut self) -> &mut Envelope {
        &mut self.envelope
    }

    /// Replaces the current envelope.
    pub fn set_envelope(&mut self, envelope: Envelope) {
        self.envelope = envelope;
    }

    /// Returns the current transport message.
    #[must_use]
    pub const fn transport_message(&self) -> &TransportMessage {
        &self.transport_message
    }

    /// Replaces the current transport message.
    pub fn set_transport_message(&mut self, transport_message: TransportMessage) {
        self.transport_message = transport_message;
    }

    /// Returns the transport message exactly as it was received.
    #[must_use]
    pub fn original_transport_message(&self) -> &TransportMessage {
        &self.original
    }

    /// Returns the transaction the message is processed in.
    #[must_use]
    pub fn transaction(&self) -> &TransactionContext {
        &self.transaction
    }

    /// Returns the cancellation token.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

/// Context of one message being sent through the outgoing pipeline.
#[derive(Debug)]
pub struct OutgoingStepContext {
    envelope: Envelope,
    destination: String,
    cancellation: Arc<CancellationToken>,
}

impl OutgoingStepContext {
    /// Creates a context for a message addressed to `destination`.
    #[must_use]
    pub fn new(envelope: Envelope, destination: impl Into<String>) -> Self {
        Self {
            envelope,
            destination: destination.into(),
            cancellation: Arc::new(CancellationToken::new()),
        }
    }

    /// Sets the cancellation token observed by steps.
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: Arc<CancellationToken>) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Returns the envelope.
    #[must_use]
    pub const fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Returns the envelope for modification.
    pub fn envelope_mut(&mut self) -> &mut Envelope {
        &mut self.envelope
    }

    /// Returns the destination queue.
    #[must_use]
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Returns the cancellation token.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{headers, Headers};
    use crate::testing::{OtherMessage, TestMessage};

    fn received() -> IncomingStepContext {
        let mut raw_headers = Headers::new();
        raw_headers.insert(headers::MESSAGE_ID.to_string(), "m-1".to_string());
        let transport = TransportMessage::new(raw_headers.clone(), b"{}".to_vec());
        let envelope = Envelope::with_headers(raw_headers, Arc::new(TestMessage::invalid()));
        IncomingStepContext::new(transport, envelope, Arc::new(TransactionContext::new("input")))
    }

    #[test]
    fn test_original_survives_replacement() {
        let mut ctx = received();
        ctx.set_transport_message(TransportMessage::new(Headers::new(), b"changed".to_vec()));

        assert_eq!(ctx.transport_message().body, b"changed".to_vec());
        assert_eq!(ctx.original_transport_message().body, b"{}".to_vec());
        assert_eq!(ctx.original_transport_message().message_id(), Some("m-1"));
    }

    #[test]
    fn test_envelope_replacement() {
        let mut ctx = received();
        ctx.set_envelope(Envelope::new(OtherMessage::default()));

        assert!(ctx.envelope().body_as::<OtherMessage>().is_some());
        assert_eq!(ctx.transaction().source_queue(), "input");
    }

    #[test]
    fn test_shared_cancellation() {
        let token = Arc::new(CancellationToken::new());
        let ctx = received().with_cancellation(Arc::clone(&token));

        token.cancel("stop");
        assert!(ctx.cancellation().is_cancelled());
    }

    #[test]
    fn test_outgoing_context() {
        let mut ctx = OutgoingStepContext::new(Envelope::new(TestMessage::valid()), "input");
        ctx.envelope_mut()
            .headers
            .insert(headers::DESTINATION.to_string(), "input".to_string());

        assert_eq!(ctx.destination(), "input");
        assert_eq!(ctx.envelope().header(headers::DESTINATION), Some("input"));
    }
}
