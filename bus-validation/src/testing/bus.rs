//! A minimal in-memory bus host that runs the pipelines end to end.
//!
//! Sending runs the outgoing pipeline and serializes the body as JSON onto a
//! queue. Receiving takes one message off the input queue, deserializes it,
//! runs the incoming pipeline and moves the message to the error queue if the
//! pipeline fails. There are no retries.

use super::network::{ErrorQueue, InMemoryNetwork};
use crate::cancellation::CancellationToken;
use crate::errors::{ConfigurationError, PipelineError};
use crate::message::{headers, Envelope, Headers, Message, MessageType, TransportMessage};
use crate::pipeline::{
    IncomingStepContext, Next, OutgoingStepContext, PipelineBuilder, Pipelines, Step,
    TransactionContext, DISPATCH_STEP, SEND_STEP,
};
use async_trait::async_trait;
use chrono::Utc;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Name of the queue the bus receives from unless configured otherwise.
pub const INPUT_QUEUE: &str = "input";

/// Name of the incoming host step that checks the received headers
/// against the deserialized body.
pub const DESERIALIZE_STEP: &str = "deserialize";

/// Name of the outgoing host step that stamps transport headers.
pub const ASSIGN_HEADERS_STEP: &str = "assign-headers";

type EncodeFn = fn(&dyn Message) -> Result<Vec<u8>, PipelineError>;
type DecodeFn = fn(&[u8]) -> Result<Arc<dyn Message>, PipelineError>;
type HandlerFn = Arc<dyn Fn(&Envelope) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

#[derive(Clone, Copy)]
struct Codec {
    encode: EncodeFn,
    decode: DecodeFn,
}

/// JSON codecs keyed by message type name.
#[derive(Default)]
struct MessageTypes {
    codecs: RwLock<HashMap<String, Codec>>,
}

impl MessageTypes {
    fn register<T: Message + Serialize + DeserializeOwned>(&self) {
        self.codecs.write().insert(
            MessageType::of::<T>().name().to_string(),
            Codec {
                encode: encode::<T>,
                decode: decode::<T>,
            },
        );
    }

    fn codec(&self, type_name: &str) -> Result<Codec, PipelineError> {
        self.codecs
            .read()
            .get(type_name)
            .copied()
            .ok_or_else(|| PipelineError::Serialization(format!("unknown message type '{type_name}'")))
    }
}

fn encode<T: Message + Serialize>(body: &dyn Message) -> Result<Vec<u8>, PipelineError> {
    let typed = body.as_any().downcast_ref::<T>().ok_or_else(|| {
        PipelineError::Serialization(format!("expected a '{}' body", MessageType::of::<T>()))
    })?;
    serde_json::to_vec(typed).map_err(|e| PipelineError::Serialization(e.to_string()))
}

fn decode<T: Message + DeserializeOwned>(bytes: &[u8]) -> Result<Arc<dyn Message>, PipelineError> {
    let typed: T =
        serde_json::from_slice(bytes).map_err(|e| PipelineError::Serialization(e.to_string()))?;
    Ok(Arc::new(typed))
}

/// Handlers keyed by the exact body type they accept.
#[derive(Default)]
struct Handlers {
    by_type: RwLock<HashMap<MessageType, Vec<HandlerFn>>>,
}

impl Handlers {
    fn for_type(&self, message_type: &MessageType) -> Vec<HandlerFn> {
        self.by_type
            .read()
            .get(message_type)
            .cloned()
            .unwrap_or_default()
    }
}

/// Incoming host step that refuses messages without an id or whose type
/// header disagrees with the deserialized body.
struct DeserializeStep;

#[async_trait]
impl Step<IncomingStepContext> for DeserializeStep {
    fn name(&self) -> &str {
        DESERIALIZE_STEP
    }

    async fn process(
        &self,
        ctx: &mut IncomingStepContext,
        next: Next<'_, IncomingStepContext>,
    ) -> Result<(), PipelineError> {
        let envelope = ctx.envelope();
        if envelope.message_id().is_none() {
            return Err(PipelineError::Serialization(format!(
                "received message has no '{}' header",
                headers::MESSAGE_ID
            )));
        }
        let body_type = envelope.message_type();
        if envelope.header(headers::MESSAGE_TYPE) != Some(body_type.name()) {
            return Err(PipelineError::Serialization(format!(
                "'{}' header does not match body type '{body_type}'",
                headers::MESSAGE_TYPE
            )));
        }
        next.run(ctx).await
    }
}

/// Incoming host step that invokes every handler for the body's type.
struct DispatchStep {
    handlers: Arc<Handlers>,
}

#[async_trait]
impl Step<IncomingStepContext> for DispatchStep {
    fn name(&self) -> &str {
        DISPATCH_STEP
    }

    async fn process(
        &self,
        ctx: &mut IncomingStepContext,
        next: Next<'_, IncomingStepContext>,
    ) -> Result<(), PipelineError> {
        let message_type = ctx.envelope().message_type();
        let handlers = self.handlers.for_type(&message_type);
        if handlers.is_empty() {
            return Err(PipelineError::no_handlers(message_type));
        }
        for handler in handlers {
            handler(ctx.envelope()).await?;
        }
        next.run(ctx).await
    }
}

/// Outgoing host step that stamps id, type, destination and send time.
struct AssignHeadersStep;

#[async_trait]
impl Step<OutgoingStepContext> for AssignHeadersStep {
    fn name(&self) -> &str {
        ASSIGN_HEADERS_STEP
    }

    async fn process(
        &self,
        ctx: &mut OutgoingStepContext,
        next: Next<'_, OutgoingStepContext>,
    ) -> Result<(), PipelineError> {
        let message_type = ctx.envelope().message_type();
        let destination = ctx.destination().to_string();
        let stamped = &mut ctx.envelope_mut().headers;
        stamped
            .entry(headers::MESSAGE_ID.to_string())
            .or_insert_with(|| Uuid::new_v4().to_string());
        stamped.insert(headers::MESSAGE_TYPE.to_string(), message_type.name().to_string());
        stamped.insert(headers::DESTINATION.to_string(), destination);
        stamped.insert(headers::SENT_TIME.to_string(), Utc::now().to_rfc3339());
        next.run(ctx).await
    }
}

/// Outgoing host step that serializes the body and delivers it.
struct SendStep {
    network: InMemoryNetwork,
    types: Arc<MessageTypes>,
}

#[async_trait]
impl Step<OutgoingStepContext> for SendStep {
    fn name(&self) -> &str {
        SEND_STEP
    }

    async fn process(
        &self,
        ctx: &mut OutgoingStepContext,
        next: Next<'_, OutgoingStepContext>,
    ) -> Result<(), PipelineError> {
        let envelope = ctx.envelope();
        let codec = self.types.codec(envelope.message_type().name())?;
        let body = (codec.encode)(envelope.body.as_ref())?;
        self.network.deliver(
            ctx.destination(),
            TransportMessage::new(envelope.headers.clone(), body),
        );
        next.run(ctx).await
    }
}

/// Collects handlers, message types and pipeline steps before the bus starts.
pub struct TestBusBuilder {
    network: InMemoryNetwork,
    input_queue: String,
    types: Arc<MessageTypes>,
    handlers: Arc<Handlers>,
    pipeline: PipelineBuilder,
}

impl TestBusBuilder {
    /// Registers a JSON-serializable message type.
    #[must_use]
    pub fn register_type<T: Message + Serialize + DeserializeOwned>(self) -> Self {
        self.types.register::<T>();
        self
    }

    /// Registers a handler for bodies of exactly type `T`.
    #[must_use]
    pub fn handle<T, F, Fut>(self, handler: F) -> Self
    where
        T: Message,
        F: Fn(Arc<T>, Headers) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let erased: HandlerFn = Arc::new(move |envelope: &Envelope| match envelope.body_arc::<T>() {
            Some(body) => handler(body, envelope.headers.clone()).boxed(),
            None => {
                let actual = envelope.message_type();
                async move { Err(anyhow::anyhow!("handler cannot accept a '{actual}' body")) }.boxed()
            }
        });
        self.handlers
            .by_type
            .write()
            .entry(MessageType::of::<T>())
            .or_default()
            .push(erased);
        self
    }

    /// Returns the host pipelines for adding steps.
    pub fn pipeline_mut(&mut self) -> &mut PipelineBuilder {
        &mut self.pipeline
    }

    /// Starts the bus.
    #[must_use]
    pub fn build(self) -> TestBus {
        TestBus {
            error_queue: ErrorQueue::new(self.network.clone()),
            network: self.network,
            input_queue: self.input_queue,
            types: self.types,
            pipelines: self.pipeline.build(),
        }
    }
}

impl fmt::Debug for TestBusBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestBusBuilder")
            .field("input_queue", &self.input_queue)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

/// An in-memory bus that receives from a single input queue.
pub struct TestBus {
    network: InMemoryNetwork,
    input_queue: String,
    types: Arc<MessageTypes>,
    pipelines: Pipelines,
    error_queue: ErrorQueue,
}

impl TestBus {
    /// Creates a builder whose host pipelines are
    /// `deserialize -> dispatch` and `assign-headers -> send`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if the host steps cannot be added.
    pub fn builder(network: InMemoryNetwork) -> Result<TestBusBuilder, ConfigurationError> {
        let types = Arc::new(MessageTypes::default());
        let handlers = Arc::new(Handlers::default());
        let pipeline = PipelineBuilder::new()
            .incoming_step(Arc::new(DeserializeStep))
            .and_then(|b| {
                b.incoming_step(Arc::new(DispatchStep {
                    handlers: Arc::clone(&handlers),
                }))
            })
            .and_then(|b| b.outgoing_step(Arc::new(AssignHeadersStep)))
            .and_then(|b| {
                b.outgoing_step(Arc::new(SendStep {
                    network: network.clone(),
                    types: Arc::clone(&types),
                }))
            })?;

        Ok(TestBusBuilder {
            network,
            input_queue: INPUT_QUEUE.to_string(),
            types,
            handlers,
            pipeline,
        })
    }

    /// Returns the network the bus is attached to.
    #[must_use]
    pub const fn network(&self) -> &InMemoryNetwork {
        &self.network
    }

    /// Returns the built pipelines.
    #[must_use]
    pub const fn pipelines(&self) -> &Pipelines {
        &self.pipelines
    }

    /// Sends a message to the bus's own input queue.
    ///
    /// # Errors
    ///
    /// Returns the outgoing pipeline's error, e.g. a validation failure.
    pub async fn send_local<M: Message>(&self, body: M) -> Result<(), PipelineError> {
        self.send(&self.input_queue, body).await
    }

    /// Sends a message to a queue.
    ///
    /// # Errors
    ///
    /// Returns the outgoing pipeline's error, e.g. a validation failure.
    pub async fn send<M: Message>(&self, destination: &str, body: M) -> Result<(), PipelineError> {
        let mut ctx = OutgoingStepContext::new(Envelope::new(body), destination);
        self.pipelines.outgoing.execute(&mut ctx).await
    }

    /// Processes one message from the input queue.
    ///
    /// Returns `None` if the queue is empty.
    pub async fn receive_one(&self) -> Option<Result<(), PipelineError>> {
        self.receive_one_with(Arc::new(CancellationToken::new()))
            .await
    }

    /// Processes one message from the input queue under a cancellation token.
    ///
    /// A cancelled message is put back on the input queue. Any other failure
    /// moves it to the error queue.
    pub async fn receive_one_with(
        &self,
        cancellation: Arc<CancellationToken>,
    ) -> Option<Result<(), PipelineError>> {
        let transport = self.network.receive(&self.input_queue)?;
        let transaction = Arc::new(TransactionContext::new(self.input_queue.clone()));

        let body = match self.decode(&transport) {
            Ok(body) => body,
            Err(err) => {
                self.error_queue
                    .move_to_error_queue(&transport, &transaction, &err);
                return Some(Err(err));
            }
        };

        let envelope = Envelope::with_headers(transport.headers.clone(), body);
        let mut ctx = IncomingStepContext::new(transport, envelope, Arc::clone(&transaction))
            .with_cancellation(cancellation);
        let result = self.pipelines.incoming.execute(&mut ctx).await;

        if let Err(err) = &result {
            let original = ctx.original_transport_message().clone();
            if err.is_cancelled() {
                debug!(
                    message_id = original.message_id().unwrap_or("<unknown>"),
                    "Processing cancelled; returning message to the input queue"
                );
                self.network.requeue(&self.input_queue, original);
            } else {
                warn!(
                    message_id = original.message_id().unwrap_or("<unknown>"),
                    error = %err,
                    "Unhandled exception while handling message"
                );
                self.error_queue
                    .move_to_error_queue(&original, &transaction, err);
            }
        }
        Some(result)
    }

    /// Processes messages until the input queue is empty and returns each
    /// result in order.
    pub async fn drain(&self) -> Vec<Result<(), PipelineError>> {
        let mut results = Vec::new();
        while let Some(result) = self.receive_one().await {
            results.push(result);
        }
        results
    }

    fn decode(&self, transport: &TransportMessage) -> Result<Arc<dyn Message>, PipelineError> {
        let type_name = transport.message_type().ok_or_else(|| {
            PipelineError::Serialization(format!("missing '{}' header", headers::MESSAGE_TYPE))
        })?;
        let codec = self.types.codec(type_name)?;
        (codec.decode)(&transport.body)
    }
}

impl fmt::Debug for TestBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestBus")
            .field("input_queue", &self.input_queue)
            .field("pipelines", &self.pipelines)
            .finish_non_exhaustive()
    }
}

/// Returns a pipeline builder holding the host steps of a bus with no
/// handlers: `deserialize -> dispatch` and `assign-headers -> send`.
///
/// # Errors
///
/// Returns a [`ConfigurationError`] if the host steps cannot be added.
pub fn host_pipeline() -> Result<PipelineBuilder, ConfigurationError> {
    Ok(TestBus::builder(InMemoryNetwork::new())?.pipeline)
}
