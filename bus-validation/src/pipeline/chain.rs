//! Ordered step chains.

use super::{Next, Step};
use crate::errors::PipelineError;
use std::fmt;
use std::sync::Arc;

/// An immutable, ordered chain of steps for one context type.
pub struct Pipeline<C: Send + 'static> {
    steps: Arc<[Arc<dyn Step<C>>]>,
}

impl<C: Send + 'static> Pipeline<C> {
    /// Creates a pipeline from ordered steps.
    #[must_use]
    pub fn new(steps: Vec<Arc<dyn Step<C>>>) -> Self {
        Self {
            steps: steps.into(),
        }
    }

    /// Runs every step against the context.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a step.
    pub async fn execute(&self, ctx: &mut C) -> Result<(), PipelineError> {
        Next::new(&self.steps).run(ctx).await
    }

    /// Returns the step names in execution order.
    #[must_use]
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Returns the number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if the pipeline has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl<C: Send + 'static> Clone for Pipeline<C> {
    fn clone(&self) -> Self {
        Self {
            steps: Arc::clone(&self.steps),
        }
    }
}

impl<C: Send + 'static> fmt::Debug for Pipeline<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("steps", &self.step_names())
            .finish()
    }
}
