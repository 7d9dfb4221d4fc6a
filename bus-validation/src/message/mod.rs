//! Message bodies, envelopes and raw transport messages.
//!
//! This module provides:
//! - The type-erased [`Message`] body trait and its [`MessageType`] identity
//! - The mutable [`Envelope`] that flows through a pipeline
//! - The raw [`TransportMessage`] handed to error channels
//! - Well-known header keys

mod envelope;
pub mod headers;
mod transport;

pub use envelope::{Envelope, Headers, Message, MessageType};
pub use transport::TransportMessage;

/// Implements [`Message`] for one or more concrete body types.
///
/// ```rust
/// use bus_validation::impl_message;
///
/// #[derive(Debug)]
/// struct OrderPlaced {
///     order_id: u64,
/// }
///
/// impl_message!(OrderPlaced);
/// ```
#[macro_export]
macro_rules! impl_message {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::message::Message for $ty {
                fn as_any(&self) -> &dyn ::std::any::Any {
                    self
                }

                fn into_any(
                    self: ::std::sync::Arc<Self>,
                ) -> ::std::sync::Arc<dyn ::std::any::Any + Send + Sync> {
                    self
                }

                fn wrap_operation(&self) -> Option<$crate::wrap::WrapOperation> {
                    Some($crate::wrap::WrapOperation::of::<Self>())
                }
            }
        )+
    };
}
