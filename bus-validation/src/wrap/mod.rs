//! Re-typing failed messages as [`ValidationFailed<T>`].
//!
//! Every wrappable body type carries a monomorphized [`WrapOperation`] that
//! knows how to build `ValidationFailed<T>` for its own `T`. The
//! [`WrapperCache`] keeps one operation per concrete type so the lookup is
//! done once per type rather than once per message.

mod cache;
mod failed;
mod operation;

pub use cache::WrapperCache;
pub use failed::{FailureDetails, ValidationFailed};
pub use operation::WrapOperation;
