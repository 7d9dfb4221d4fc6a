//! Wiring validation into a bus pipeline.
//!
//! Configuration errors surface from the configurer calls themselves, so a
//! misconfigured pipeline never starts.

use crate::errors::ConfigurationError;
use crate::message::{Message, MessageType};
use crate::pipeline::{PipelineBuilder, DISPATCH_STEP, SEND_STEP};
use crate::steps::{ValidateIncomingStep, ValidateOutgoingStep};
use crate::strategies::{
    DeadLetter, Disposition, DropMessage, ErrorChannel, FailureStrategy, PassThrough, StrategyTable,
    WrapAsValidationFailed,
};
use crate::validation::ValidatorFactory;
use crate::wrap::WrapperCache;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Which pipelines validate messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Directions {
    /// Received messages only.
    Incoming,
    /// Sent messages only.
    Outgoing,
    /// Both received and sent messages.
    #[default]
    Both,
}

impl Directions {
    /// Returns true if received messages are validated.
    #[must_use]
    pub const fn includes_incoming(self) -> bool {
        matches!(self, Self::Incoming | Self::Both)
    }

    /// Returns true if sent messages are validated.
    #[must_use]
    pub const fn includes_outgoing(self) -> bool {
        matches!(self, Self::Outgoing | Self::Both)
    }
}

/// Serializable validation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationOptions {
    /// Which pipelines validate messages.
    pub direction: Directions,
    /// Strategy for failed message types without their own registration.
    pub default_disposition: Disposition,
}

#[derive(Clone)]
enum Registration {
    Builtin(Disposition),
    Custom(Arc<dyn FailureStrategy>),
}

/// Builds and installs the validation steps.
///
/// ```rust,ignore
/// let mut builder = host_pipeline()?;
/// ValidationConfigurer::new(Arc::new(validators))
///     .dead_letter::<PlaceOrder>()?
///     .drop::<Heartbeat>()?
///     .error_channel(error_queue)
///     .install(&mut builder)?;
/// ```
pub struct ValidationConfigurer {
    factory: Arc<dyn ValidatorFactory>,
    options: ValidationOptions,
    registrations: HashMap<MessageType, Registration>,
    error_channel: Option<Arc<dyn ErrorChannel>>,
    wrap_cache: Arc<WrapperCache>,
}

impl ValidationConfigurer {
    /// Creates a configurer that resolves validators from `factory`.
    #[must_use]
    pub fn new(factory: Arc<dyn ValidatorFactory>) -> Self {
        Self {
            factory,
            options: ValidationOptions::default(),
            registrations: HashMap::new(),
            error_channel: None,
            wrap_cache: Arc::new(WrapperCache::new()),
        }
    }

    /// Applies serialized options.
    #[must_use]
    pub fn with_options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets which pipelines validate messages.
    #[must_use]
    pub fn direction(mut self, direction: Directions) -> Self {
        self.options.direction = direction;
        self
    }

    /// Sets the strategy for failed types without their own registration.
    #[must_use]
    pub fn default_disposition(mut self, disposition: Disposition) -> Self {
        self.options.default_disposition = disposition;
        self
    }

    /// Sets the error channel used by dead-lettering.
    #[must_use]
    pub fn error_channel(mut self, error_channel: Arc<dyn ErrorChannel>) -> Self {
        self.error_channel = Some(error_channel);
        self
    }

    /// Shares a wrap cache with the wrap strategy.
    #[must_use]
    pub fn with_wrap_cache(mut self, cache: Arc<WrapperCache>) -> Self {
        self.wrap_cache = cache;
        self
    }

    /// Moves failed messages of type `T` to the error channel.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::DuplicateStrategy`] if `T` already has a
    /// strategy.
    pub fn dead_letter<T: Message>(self) -> Result<Self, ConfigurationError> {
        self.register::<T>(Registration::Builtin(Disposition::DeadLetter))
    }

    /// Drops failed messages of type `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::DuplicateStrategy`] if `T` already has a
    /// strategy.
    pub fn drop<T: Message>(self) -> Result<Self, ConfigurationError> {
        self.register::<T>(Registration::Builtin(Disposition::Drop))
    }

    /// Lets failed messages of type `T` continue unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::DuplicateStrategy`] if `T` already has a
    /// strategy.
    pub fn pass_through<T: Message>(self) -> Result<Self, ConfigurationError> {
        self.register::<T>(Registration::Builtin(Disposition::PassThrough))
    }

    /// Wraps failed messages of type `T` as `ValidationFailed<T>`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::DuplicateStrategy`] if `T` already has a
    /// strategy.
    pub fn wrap<T: Message>(self) -> Result<Self, ConfigurationError> {
        self.register::<T>(Registration::Builtin(Disposition::Wrap))
    }

    /// Handles failed messages of type `T` with a custom strategy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::DuplicateStrategy`] if `T` already has a
    /// strategy.
    pub fn on_validation_failed<T: Message>(
        self,
        strategy: Arc<dyn FailureStrategy>,
    ) -> Result<Self, ConfigurationError> {
        self.register::<T>(Registration::Custom(strategy))
    }

    /// Returns the configured options.
    #[must_use]
    pub const fn options(&self) -> ValidationOptions {
        self.options
    }

    /// Returns the wrap cache used by the wrap strategy.
    #[must_use]
    pub fn wrap_cache(&self) -> &Arc<WrapperCache> {
        &self.wrap_cache
    }

    /// Builds the strategy table for the incoming step.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::MissingErrorChannel`] if dead-lettering
    /// is configured without an error channel.
    pub fn build_strategies(&self) -> Result<StrategyTable, ConfigurationError> {
        let builtins = Builtins::new(self.error_channel.clone(), Arc::clone(&self.wrap_cache));

        let mut unresolved: Vec<String> = Vec::new();
        let mut resolve = |disposition: Disposition, label: &str| {
            let strategy = builtins.get(disposition);
            if strategy.is_none() {
                unresolved.push(label.to_string());
            }
            strategy
        };

        let default = resolve(self.options.default_disposition, "*");
        let mut entries = Vec::with_capacity(self.registrations.len());
        for (message_type, registration) in &self.registrations {
            let strategy = match registration {
                Registration::Builtin(disposition) => resolve(*disposition, message_type.name()),
                Registration::Custom(strategy) => Some(Arc::clone(strategy)),
            };
            entries.push((*message_type, strategy));
        }

        if !unresolved.is_empty() {
            unresolved.sort();
            return Err(ConfigurationError::MissingErrorChannel {
                message_types: unresolved,
            });
        }

        let default = default.ok_or_else(|| ConfigurationError::MissingErrorChannel {
            message_types: vec!["*".to_string()],
        })?;
        let mut table = StrategyTable::new(default);
        for (message_type, strategy) in entries {
            if let Some(strategy) = strategy {
                table.insert(message_type, strategy)?;
            }
        }
        Ok(table)
    }

    /// Installs the validation steps into a host pipeline.
    ///
    /// The incoming step runs directly before the `dispatch` step and the
    /// outgoing step directly before the `send` step. Nothing is installed if
    /// any check fails.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::MissingStep`] if an anchor step is
    /// missing, [`ConfigurationError::DuplicateStep`] if validation is
    /// already installed, or [`ConfigurationError::MissingErrorChannel`].
    pub fn install(self, builder: &mut PipelineBuilder) -> Result<(), ConfigurationError> {
        let direction = self.options.direction;

        let incoming = if direction.includes_incoming() {
            let table = self.build_strategies()?;
            check_anchor(&builder.incoming_names(), DISPATCH_STEP, ValidateIncomingStep::NAME)?;
            Some(ValidateIncomingStep::new(
                Arc::clone(&self.factory),
                Arc::new(table),
            ))
        } else {
            None
        };

        let outgoing = if direction.includes_outgoing() {
            check_anchor(&builder.outgoing_names(), SEND_STEP, ValidateOutgoingStep::NAME)?;
            Some(ValidateOutgoingStep::new(Arc::clone(&self.factory)))
        } else {
            None
        };

        if let Some(step) = incoming {
            debug!(strategies = ?step.strategies(), "Installing incoming validation");
            builder
                .incoming_mut()
                .insert_before(DISPATCH_STEP, Arc::new(step))?;
        }
        if let Some(step) = outgoing {
            debug!("Installing outgoing validation");
            builder
                .outgoing_mut()
                .insert_before(SEND_STEP, Arc::new(step))?;
        }
        Ok(())
    }

    fn register<T: Message>(mut self, registration: Registration) -> Result<Self, ConfigurationError> {
        let message_type = MessageType::of::<T>();
        if self.registrations.contains_key(&message_type) {
            return Err(ConfigurationError::duplicate_strategy(message_type));
        }
        self.registrations.insert(message_type, registration);
        Ok(self)
    }
}

impl fmt::Debug for ValidationConfigurer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registered: Vec<&str> = self.registrations.keys().map(MessageType::name).collect();
        f.debug_struct("ValidationConfigurer")
            .field("options", &self.options)
            .field("registered", &registered)
            .field("has_error_channel", &self.error_channel.is_some())
            .finish_non_exhaustive()
    }
}

fn check_anchor(names: &[&str], anchor: &str, step: &str) -> Result<(), ConfigurationError> {
    if !names.contains(&anchor) {
        return Err(ConfigurationError::missing_step(anchor));
    }
    if names.contains(&step) {
        return Err(ConfigurationError::duplicate_step(step));
    }
    Ok(())
}

/// One shared instance per built-in strategy.
struct Builtins {
    dead_letter: Option<Arc<dyn FailureStrategy>>,
    drop: Arc<dyn FailureStrategy>,
    pass_through: Arc<dyn FailureStrategy>,
    wrap: Arc<dyn FailureStrategy>,
}

impl Builtins {
    fn new(error_channel: Option<Arc<dyn ErrorChannel>>, cache: Arc<WrapperCache>) -> Self {
        Self {
            dead_letter: error_channel
                .map(|channel| Arc::new(DeadLetter::new(channel)) as Arc<dyn FailureStrategy>),
            drop: Arc::new(DropMessage),
            pass_through: Arc::new(PassThrough),
            wrap: Arc::new(WrapAsValidationFailed::with_cache(cache)),
        }
    }

    fn get(&self, disposition: Disposition) -> Option<Arc<dyn FailureStrategy>> {
        match disposition {
            Disposition::DeadLetter => self.dead_letter.clone(),
            Disposition::Drop => Some(Arc::clone(&self.drop)),
            Disposition::PassThrough => Some(Arc::clone(&self.pass_through)),
            Disposition::Wrap => Some(Arc::clone(&self.wrap)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        host_pipeline, ErrorQueue, InMemoryNetwork, OtherMessage, TestMessage, TestMessage1,
        TestMessageValidator,
    };
    use crate::validation::ValidatorRegistry;
    use pretty_assertions::assert_eq;

    fn configurer() -> ValidationConfigurer {
        ValidationConfigurer::new(Arc::new(
            ValidatorRegistry::new()
                .register::<TestMessage, _>(TestMessageValidator)
                .unwrap(),
        ))
    }

    #[test]
    fn test_duplicate_registration_is_rejected_immediately() {
        let result = configurer().drop::<TestMessage>().and_then(|c| c.wrap::<TestMessage>());

        let err = result.unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateStrategy { .. }));
        assert_eq!(err.error_info().code, crate::errors::codes::DUPLICATE_STRATEGY);
    }

    #[test]
    fn test_install_places_steps_before_anchors() {
        let mut builder = host_pipeline().unwrap();
        configurer().install(&mut builder).unwrap();

        assert_eq!(
            builder.incoming_names(),
            vec!["deserialize", ValidateIncomingStep::NAME, DISPATCH_STEP]
        );
        assert_eq!(
            builder.outgoing_names(),
            vec!["assign-headers", ValidateOutgoingStep::NAME, SEND_STEP]
        );
    }

    #[test]
    fn test_direction_limits_installed_steps() {
        let mut builder = host_pipeline().unwrap();
        configurer()
            .direction(Directions::Outgoing)
            .install(&mut builder)
            .unwrap();

        assert!(!builder.incoming_names().contains(&ValidateIncomingStep::NAME));
        assert!(builder.outgoing_names().contains(&ValidateOutgoingStep::NAME));
    }

    #[test]
    fn test_install_twice_is_rejected() {
        let mut builder = host_pipeline().unwrap();
        configurer().install(&mut builder).unwrap();

        let err = configurer().install(&mut builder).unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateStep { .. }));
    }

    #[test]
    fn test_install_without_anchor() {
        let mut builder = PipelineBuilder::new();
        let err = configurer().install(&mut builder).unwrap_err();

        assert!(matches!(err, ConfigurationError::MissingStep { ref name } if name == DISPATCH_STEP));
        assert!(builder.incoming_names().is_empty());
    }

    #[test]
    fn test_dead_letter_requires_error_channel() {
        let err = configurer()
            .dead_letter::<TestMessage1>()
            .unwrap()
            .default_disposition(Disposition::DeadLetter)
            .build_strategies()
            .unwrap_err();

        match err {
            ConfigurationError::MissingErrorChannel { message_types } => {
                assert_eq!(message_types.len(), 2);
                assert!(message_types.contains(&"*".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_error_channel_leaves_pipeline_untouched() {
        let mut builder = host_pipeline().unwrap();
        let err = configurer()
            .dead_letter::<TestMessage>()
            .unwrap()
            .install(&mut builder)
            .unwrap_err();

        assert!(matches!(err, ConfigurationError::MissingErrorChannel { .. }));
        assert_eq!(builder.incoming_names(), vec!["deserialize", DISPATCH_STEP]);
        assert_eq!(builder.outgoing_names(), vec!["assign-headers", SEND_STEP]);
    }

    #[test]
    fn test_strategy_table_reflects_registrations() {
        let table = configurer()
            .dead_letter::<TestMessage>()
            .unwrap()
            .pass_through::<OtherMessage>()
            .unwrap()
            .error_channel(Arc::new(ErrorQueue::new(InMemoryNetwork::new())))
            .default_disposition(Disposition::Drop)
            .build_strategies()
            .unwrap();

        assert_eq!(table.get(&MessageType::of::<TestMessage>()).name(), "dead_letter");
        assert_eq!(table.get(&MessageType::of::<OtherMessage>()).name(), "pass_through");
        assert_eq!(table.get(&MessageType::of::<TestMessage1>()).name(), "drop");
    }

    #[test]
    fn test_default_disposition_is_wrap() {
        let table = configurer().build_strategies().unwrap();
        assert_eq!(table.default_strategy().name(), "wrap");
    }

    #[test]
    fn test_options_from_json() {
        let options: ValidationOptions =
            serde_json::from_str(r#"{"direction":"incoming","default_disposition":"drop"}"#).unwrap();
        assert_eq!(options.direction, Directions::Incoming);
        assert_eq!(options.default_disposition, Disposition::Drop);

        let defaults: ValidationOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(defaults, ValidationOptions::default());
        assert_eq!(defaults.direction, Directions::Both);

        let configured = configurer().with_options(options);
        assert_eq!(configured.options(), options);
    }
}
