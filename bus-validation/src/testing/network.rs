//! In-memory queues and an error queue on top of them.

use crate::errors::{ErrorChannelError, ValidationFailure};
use crate::message::{headers, TransportMessage};
use crate::pipeline::TransactionContext;
use crate::strategies::ErrorChannel;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Name of the queue poison messages are moved to.
pub const ERROR_QUEUE: &str = "error";

/// A set of named FIFO queues shared by clones.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNetwork {
    queues: Arc<Mutex<HashMap<String, VecDeque<TransportMessage>>>>,
}

impl InMemoryNetwork {
    /// Creates an empty network.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message to a queue, creating the queue if needed.
    pub fn deliver(&self, queue: &str, message: TransportMessage) {
        self.queues
            .lock()
            .entry(queue.to_string())
            .or_default()
            .push_back(message);
    }

    /// Puts a message back at the head of a queue.
    pub fn requeue(&self, queue: &str, message: TransportMessage) {
        self.queues
            .lock()
            .entry(queue.to_string())
            .or_default()
            .push_front(message);
    }

    /// Takes the oldest message from a queue.
    #[must_use]
    pub fn receive(&self, queue: &str) -> Option<TransportMessage> {
        self.queues.lock().get_mut(queue)?.pop_front()
    }

    /// Returns the number of messages waiting in a queue.
    #[must_use]
    pub fn count(&self, queue: &str) -> usize {
        self.queues.lock().get(queue).map_or(0, VecDeque::len)
    }

    /// Returns copies of the messages waiting in a queue.
    #[must_use]
    pub fn peek_all(&self, queue: &str) -> Vec<TransportMessage> {
        self.queues
            .lock()
            .get(queue)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }
}

/// Moves poison messages to a queue of the network, annotated with the
/// failure details and the queue they came from.
#[derive(Clone)]
pub struct ErrorQueue {
    network: InMemoryNetwork,
    queue: String,
}

impl ErrorQueue {
    /// Creates an error queue named [`ERROR_QUEUE`].
    #[must_use]
    pub fn new(network: InMemoryNetwork) -> Self {
        Self {
            network,
            queue: ERROR_QUEUE.to_string(),
        }
    }

    /// Uses a different queue name.
    #[must_use]
    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = queue.into();
        self
    }

    /// Returns the queue name.
    #[must_use]
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Moves a copy of the message to the error queue.
    pub fn move_to_error_queue(
        &self,
        transport_message: &TransportMessage,
        transaction: &TransactionContext,
        details: &dyn fmt::Display,
    ) {
        let mut poisoned = transport_message.clone();
        poisoned
            .headers
            .insert(headers::ERROR_DETAILS.to_string(), details.to_string());
        poisoned.headers.insert(
            headers::SOURCE_QUEUE.to_string(),
            transaction.source_queue().to_string(),
        );
        debug!(
            message_id = transport_message.message_id().unwrap_or("<unknown>"),
            queue = %self.queue,
            "Moved message to error queue"
        );
        self.network.deliver(&self.queue, poisoned);
    }
}

impl fmt::Debug for ErrorQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorQueue").field("queue", &self.queue).finish()
    }
}

#[async_trait]
impl ErrorChannel for ErrorQueue {
    async fn handle_poison_message(
        &self,
        transport_message: &TransportMessage,
        transaction: &TransactionContext,
        failure: &ValidationFailure,
    ) -> Result<(), ErrorChannelError> {
        self.move_to_error_queue(transport_message, transaction, failure);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Headers;

    #[test]
    fn test_queues_are_fifo_and_shared() {
        let network = InMemoryNetwork::new();
        let clone = network.clone();

        network.deliver("input", TransportMessage::new(Headers::new(), b"1".to_vec()));
        clone.deliver("input", TransportMessage::new(Headers::new(), b"2".to_vec()));

        assert_eq!(network.count("input"), 2);
        assert_eq!(clone.receive("input").unwrap().body, b"1".to_vec());
        assert_eq!(network.receive("input").unwrap().body, b"2".to_vec());
        assert!(network.receive("input").is_none());
        assert!(network.receive("missing").is_none());
    }

    #[test]
    fn test_requeue_goes_first() {
        let network = InMemoryNetwork::new();
        network.deliver("input", TransportMessage::new(Headers::new(), b"later".to_vec()));
        network.requeue("input", TransportMessage::new(Headers::new(), b"first".to_vec()));

        assert_eq!(network.peek_all("input")[0].body, b"first".to_vec());
    }

    #[test]
    fn test_error_queue_annotates_message() {
        let network = InMemoryNetwork::new();
        let queue = ErrorQueue::new(network.clone());
        let transaction = TransactionContext::new("input");

        queue.move_to_error_queue(
            &TransportMessage::new(Headers::new(), b"{}".to_vec()),
            &transaction,
            &"handler exploded",
        );

        let dead = network.receive(ERROR_QUEUE).unwrap();
        assert_eq!(dead.header(headers::ERROR_DETAILS), Some("handler exploded"));
        assert_eq!(dead.header(headers::SOURCE_QUEUE), Some("input"));
    }
}
