//! Testing utilities for validated buses.
//!
//! This module provides:
//! - Sample messages and validators
//! - An in-memory network with an error queue
//! - A minimal bus host that runs the pipelines end to end
//! - Observer steps and a log capture for assertions

mod bus;
mod fixtures;
mod logs;
mod network;
mod steps;

pub use bus::{
    host_pipeline, TestBus, TestBusBuilder, ASSIGN_HEADERS_STEP, DESERIALIZE_STEP, INPUT_QUEUE,
};
pub use fixtures::{
    OtherMessage, OtherMessageValidator, RejectingValidator, TestMessage, TestMessage1,
    TestMessage2, TestMessageValidator,
};
pub use logs::{CaptureWriter, LogCapture};
pub use network::{ErrorQueue, InMemoryNetwork, ERROR_QUEUE};
pub use steps::{RecordingStep, TrackCompletionStep};
