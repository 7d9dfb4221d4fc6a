//! Pipeline steps and the continuation handed to each of them.

use crate::errors::PipelineError;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// One step of an incoming or outgoing pipeline.
///
/// A step decides whether the remainder of the pipeline runs by invoking
/// `next` or dropping it. Since [`Next::run`] consumes the continuation, a
/// step cannot run the remainder twice.
#[async_trait]
pub trait Step<C: Send + 'static>: Send + Sync {
    /// Returns the step's unique name within its pipeline.
    fn name(&self) -> &str;

    /// Processes the context and optionally continues the pipeline.
    async fn process(&self, ctx: &mut C, next: Next<'_, C>) -> Result<(), PipelineError>;
}

/// The remainder of a pipeline after the current step.
pub struct Next<'a, C: Send + 'static> {
    steps: &'a [Arc<dyn Step<C>>],
}

impl<'a, C: Send + 'static> Next<'a, C> {
    /// Creates a continuation over the given steps.
    #[must_use]
    pub const fn new(steps: &'a [Arc<dyn Step<C>>]) -> Self {
        Self { steps }
    }

    /// Runs the remaining steps.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a remaining step.
    pub async fn run(self, ctx: &mut C) -> Result<(), PipelineError> {
        match self.steps.split_first() {
            Some((step, rest)) => step.process(ctx, Next::new(rest)).await,
            None => Ok(()),
        }
    }

    /// Returns the number of steps left.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if no step is left.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl<C: Send + 'static> fmt::Debug for Next<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.steps.iter().map(|s| s.name()).collect();
        f.debug_struct("Next").field("steps", &names).finish()
    }
}
