//! # Bus Validation
//!
//! Validation steps for the incoming and outgoing pipelines of a message bus.
//!
//! Bus validation provides:
//!
//! - **Pipeline steps**: validate received and sent message bodies against
//!   registered validators
//! - **Failure strategies**: dead-letter, drop, pass through, or wrap invalid
//!   messages, chosen per message type
//! - **Typed wrapping**: invalid bodies reach handlers as
//!   [`ValidationFailed<T>`](wrap::ValidationFailed)
//! - **Cancellation**: validation honors the bus shutdown token
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bus_validation::prelude::*;
//!
//! let validators = ValidatorRegistry::new()
//!     .register::<PlaceOrder, _>(PlaceOrderValidator)?;
//!
//! ValidationConfigurer::new(Arc::new(validators))
//!     .dead_letter::<PlaceOrder>()?
//!     .error_channel(error_queue)
//!     .install(&mut pipeline)?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod errors;
pub mod message;
pub mod observability;
pub mod pipeline;
pub mod steps;
pub mod strategies;
pub mod testing;
pub mod validation;
pub mod wrap;


pub use config::{Directions, ValidationConfigurer, ValidationOptions};
pub use errors::{ConfigurationError, PipelineError, ValidationFailure};
pub use message::{Envelope, Headers, Message, MessageType};
pub use wrap::ValidationFailed;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{Directions, ValidationConfigurer, ValidationOptions};
    pub use crate::errors::{
        ConfigurationError, PipelineError, ValidationFailure, ValidatorError, WrapError,
    };
    pub use crate::impl_message;
    pub use crate::message::{headers, Envelope, Headers, Message, MessageType, TransportMessage};
    pub use crate::pipeline::{
        IncomingStepContext, Next, OutgoingStepContext, PipelineBuilder, Pipelines, Step,
        TransactionContext,
    };
    pub use crate::steps::{ValidateIncomingStep, ValidateOutgoingStep};
    pub use crate::strategies::{
        DeadLetter, Disposition, DropMessage, ErrorChannel, FailureStrategy, PassThrough,
        StrategyTable, WrapAsValidationFailed,
    };
    pub use crate::validation::{
        FieldError, Typed, TypedValidator, ValidationOutcome, Validator, ValidatorFactory,
        ValidatorRegistry, ValidatorType,
    };
    pub use crate::wrap::{ValidationFailed, WrapperCache};
}
