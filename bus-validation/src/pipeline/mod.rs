//! The pipeline host contract.
//!
//! This module provides:
//! - The [`Step`] trait and its consumable [`Next`] continuation
//! - Incoming and outgoing step contexts
//! - A builder that orders steps by name anchors

mod builder;
mod chain;
mod context;
mod step;

pub use builder::{PipelineBuilder, Pipelines, StepList};
pub use chain::Pipeline;
pub use context::{IncomingStepContext, OutgoingStepContext, TransactionContext};
pub use step::{Next, Step};

/// Name of the incoming host step that hands the body to its handlers.
pub const DISPATCH_STEP: &str = "dispatch";

/// Name of the outgoing host step that hands the message to the transport.
pub const SEND_STEP: &str = "send";
