//! Well-known header keys.
//!
//! Header keys are case-sensitive literal strings.

/// Set to the validator's fully-qualified type name whenever a validator ran,
/// whether the message passed or failed.
pub const VALIDATOR_TYPE: &str = "ValidatorType";

/// Unique message identifier assigned on send.
pub const MESSAGE_ID: &str = "msg-id";

/// Fully-qualified type name of the serialized body.
pub const MESSAGE_TYPE: &str = "msg-type";

/// Queue the message was sent to.
pub const DESTINATION: &str = "msg-destination";

/// RFC 3339 timestamp of when the message was sent.
pub const SENT_TIME: &str = "msg-sent";

/// Error description attached by an error channel.
pub const ERROR_DETAILS: &str = "msg-error-details";

/// Queue the message was received from before being dead-lettered.
pub const SOURCE_QUEUE: &str = "msg-source-queue";
