//! Pipeline builder with step ordering checks.

use super::{IncomingStepContext, OutgoingStepContext, Pipeline, Step};
use crate::errors::ConfigurationError;
use std::fmt;
use std::sync::Arc;

/// An ordered, name-unique list of steps under construction.
pub struct StepList<C: Send + 'static> {
    steps: Vec<Arc<dyn Step<C>>>,
}

impl<C: Send + 'static> StepList<C> {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Appends a step.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::DuplicateStep`] if the name is taken.
    pub fn append(&mut self, step: Arc<dyn Step<C>>) -> Result<(), ConfigurationError> {
        self.check_unique(step.name())?;
        self.steps.push(step);
        Ok(())
    }

    /// Inserts a step directly before the step named `anchor`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::MissingStep`] if there is no such anchor
    /// or [`ConfigurationError::DuplicateStep`] if the name is taken.
    pub fn insert_before(
        &mut self,
        anchor: &str,
        step: Arc<dyn Step<C>>,
    ) -> Result<(), ConfigurationError> {
        let index = self.position(anchor)?;
        self.check_unique(step.name())?;
        self.steps.insert(index, step);
        Ok(())
    }

    /// Inserts a step directly after the step named `anchor`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::MissingStep`] if there is no such anchor
    /// or [`ConfigurationError::DuplicateStep`] if the name is taken.
    pub fn insert_after(
        &mut self,
        anchor: &str,
        step: Arc<dyn Step<C>>,
    ) -> Result<(), ConfigurationError> {
        let index = self.position(anchor)?;
        self.check_unique(step.name())?;
        self.steps.insert(index + 1, step);
        Ok(())
    }

    /// Returns true if a step with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.steps.iter().any(|s| s.name() == name)
    }

    /// Returns the step names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Returns the number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn position(&self, anchor: &str) -> Result<usize, ConfigurationError> {
        self.steps
            .iter()
            .position(|s| s.name() == anchor)
            .ok_or_else(|| ConfigurationError::missing_step(anchor))
    }

    fn check_unique(&self, name: &str) -> Result<(), ConfigurationError> {
        if self.contains(name) {
            return Err(ConfigurationError::duplicate_step(name));
        }
        Ok(())
    }

    fn build(self) -> Pipeline<C> {
        Pipeline::new(self.steps)
    }
}

impl<C: Send + 'static> Default for StepList<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Send + 'static> fmt::Debug for StepList<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Builder for the incoming and outgoing pipelines of a bus.
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    incoming: StepList<IncomingStepContext>,
    outgoing: StepList<OutgoingStepContext>,
}

impl PipelineBuilder {
    /// Creates a builder with empty pipelines.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step to the incoming pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::DuplicateStep`] if the name is taken.
    pub fn incoming_step(
        mut self,
        step: Arc<dyn Step<IncomingStepContext>>,
    ) -> Result<Self, ConfigurationError> {
        self.incoming.append(step)?;
        Ok(self)
    }

    /// Appends a step to the outgoing pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::DuplicateStep`] if the name is taken.
    pub fn outgoing_step(
        mut self,
        step: Arc<dyn Step<OutgoingStepContext>>,
    ) -> Result<Self, ConfigurationError> {
        self.outgoing.append(step)?;
        Ok(self)
    }

    /// Returns the incoming steps for in-place modification.
    pub fn incoming_mut(&mut self) -> &mut StepList<IncomingStepContext> {
        &mut self.incoming
    }

    /// Returns the outgoing steps for in-place modification.
    pub fn outgoing_mut(&mut self) -> &mut StepList<OutgoingStepContext> {
        &mut self.outgoing
    }

    /// Returns the incoming step names in order.
    #[must_use]
    pub fn incoming_names(&self) -> Vec<&str> {
        self.incoming.names()
    }

    /// Returns the outgoing step names in order.
    #[must_use]
    pub fn outgoing_names(&self) -> Vec<&str> {
        self.outgoing.names()
    }

    /// Builds both pipelines.
    #[must_use]
    pub fn build(self) -> Pipelines {
        Pipelines {
            incoming: self.incoming.build(),
            outgoing: self.outgoing.build(),
        }
    }
}

/// The built pipelines of a bus.
#[derive(Debug, Clone)]
pub struct Pipelines {
    /// Runs for every received message.
    pub incoming: Pipeline<IncomingStepContext>,
    /// Runs for every sent message.
    pub outgoing: Pipeline<OutgoingStepContext>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingStep;
    use pretty_assertions::assert_eq;

    fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
            .incoming_step(Arc::new(RecordingStep::new("deserialize")))
            .unwrap()
            .incoming_step(Arc::new(RecordingStep::new("dispatch")))
            .unwrap()
            .outgoing_step(Arc::new(RecordingStep::new("send")))
            .unwrap()
    }

    #[test]
    fn test_builder_appends_in_order() {
        let builder = builder();

        assert_eq!(builder.incoming_names(), vec!["deserialize", "dispatch"]);
        assert_eq!(builder.outgoing_names(), vec!["send"]);
    }

    #[test]
    fn test_insert_before_anchor() {
        let mut builder = builder();
        builder
            .incoming_mut()
            .insert_before("dispatch", Arc::new(RecordingStep::new("validate")))
            .unwrap();

        assert_eq!(
            builder.incoming_names(),
            vec!["deserialize", "validate", "dispatch"]
        );
    }

    #[test]
    fn test_insert_after_anchor() {
        let mut builder = builder();
        builder
            .incoming_mut()
            .insert_after("deserialize", Arc::new(RecordingStep::new("audit")))
            .unwrap();

        assert_eq!(
            builder.incoming_names(),
            vec!["deserialize", "audit", "dispatch"]
        );
    }

    #[test]
    fn test_missing_anchor() {
        let mut builder = builder();
        let err = builder
            .outgoing_mut()
            .insert_before("dispatch", Arc::new(RecordingStep::new("validate")))
            .unwrap_err();

        assert!(matches!(err, ConfigurationError::MissingStep { ref name } if name == "dispatch"));
    }

    #[test]
    fn test_duplicate_step_name() {
        let result = builder().incoming_step(Arc::new(RecordingStep::new("dispatch")));

        assert!(matches!(result, Err(ConfigurationError::DuplicateStep { .. })));
    }

    #[test]
    fn test_build_keeps_order() {
        let pipelines = builder().build();

        assert_eq!(pipelines.incoming.step_names(), vec!["deserialize", "dispatch"]);
        assert_eq!(pipelines.outgoing.len(), 1);
    }
}
