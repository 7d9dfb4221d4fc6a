//! Cooperative cancellation of message processing.

mod token;

pub use token::CancellationToken;
