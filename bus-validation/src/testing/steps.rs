//! Steps that observe a pipeline.

use crate::errors::PipelineError;
use crate::message::{Envelope, Message};
use crate::pipeline::{IncomingStepContext, Next, OutgoingStepContext, Step};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A step that counts its invocations and continues the pipeline.
#[derive(Debug)]
pub struct RecordingStep {
    name: String,
    calls: AtomicUsize,
}

impl RecordingStep {
    /// Creates a recording step.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Returns the number of times the step ran.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<C: Send + 'static> Step<C> for RecordingStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, ctx: &mut C, next: Next<'_, C>) -> Result<(), PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        next.run(ctx).await
    }
}

/// Records the body of type `T` found in the envelope once the rest of the
/// pipeline has completed, whether it succeeded or not.
///
/// Placed at the head of a pipeline, it sees what the last step saw, which
/// makes replaced bodies observable even when no handler consumed them.
pub struct TrackCompletionStep<T> {
    seen: Mutex<Vec<Arc<T>>>,
    _message: PhantomData<fn() -> T>,
}

impl<T: Message> TrackCompletionStep<T> {
    /// The step's name.
    pub const NAME: &'static str = "track-completion";

    /// Creates the step.
    #[must_use]
    pub fn new() -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
            _message: PhantomData,
        }
    }

    /// Returns the recorded bodies in completion order.
    #[must_use]
    pub fn seen(&self) -> Vec<Arc<T>> {
        self.seen.lock().clone()
    }

    fn record(&self, envelope: &Envelope) {
        if let Some(body) = envelope.body_arc::<T>() {
            self.seen.lock().push(body);
        }
    }
}

impl<T: Message> Default for TrackCompletionStep<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Message> Step<IncomingStepContext> for TrackCompletionStep<T> {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn process(
        &self,
        ctx: &mut IncomingStepContext,
        next: Next<'_, IncomingStepContext>,
    ) -> Result<(), PipelineError> {
        let result = next.run(ctx).await;
        self.record(ctx.envelope());
        result
    }
}

#[async_trait]
impl<T: Message> Step<OutgoingStepContext> for TrackCompletionStep<T> {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn process(
        &self,
        ctx: &mut OutgoingStepContext,
        next: Next<'_, OutgoingStepContext>,
    ) -> Result<(), PipelineError> {
        let result = next.run(ctx).await;
        self.record(ctx.envelope());
        result
    }
}
