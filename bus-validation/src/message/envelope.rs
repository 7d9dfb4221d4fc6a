//! Type-erased message bodies and the pipeline envelope.

use super::headers;
use crate::wrap::WrapOperation;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// String-keyed message metadata.
pub type Headers = HashMap<String, String>;

/// Runtime identity of a concrete message body type.
///
/// Equality and hashing use the [`TypeId`] only; the name is kept for logs
/// and wire headers.
#[derive(Clone, Copy)]
pub struct MessageType {
    id: TypeId,
    name: &'static str,
}

impl MessageType {
    /// Returns the identity of `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Returns the underlying type id.
    #[must_use]
    pub const fn id(&self) -> TypeId {
        self.id
    }

    /// Returns the fully-qualified type name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns true if this is the identity of `T`.
    #[must_use]
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for MessageType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MessageType {}

impl Hash for MessageType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MessageType").field(&self.name).finish()
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A message body whose concrete type is only known at run time.
///
/// Plain body types implement this through [`impl_message!`](crate::impl_message).
pub trait Message: Any + Send + Sync + fmt::Debug {
    /// Borrows the body as [`Any`] for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Converts the shared body into a shared [`Any`] without copying it.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    /// Returns the operation that wraps this body type in a
    /// [`ValidationFailed`](crate::wrap::ValidationFailed) envelope.
    ///
    /// `None` means the type cannot be wrapped.
    fn wrap_operation(&self) -> Option<WrapOperation>;

    /// Returns the concrete runtime type of the body.
    fn message_type(&self) -> MessageType {
        MessageType::of::<Self>()
    }
}

/// The mutable unit flowing through a pipeline: a body plus headers.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Message metadata.
    pub headers: Headers,
    /// Application payload.
    pub body: Arc<dyn Message>,
}

impl Envelope {
    /// Creates an envelope with empty headers.
    pub fn new<M: Message>(body: M) -> Self {
        Self::with_headers(Headers::new(), Arc::new(body))
    }

    /// Creates an envelope from headers and an already shared body.
    #[must_use]
    pub fn with_headers(headers: Headers, body: Arc<dyn Message>) -> Self {
        Self { headers, body }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Returns the concrete type of the body.
    #[must_use]
    pub fn message_type(&self) -> MessageType {
        self.body.message_type()
    }

    /// Returns a header value.
    #[must_use]
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    /// Returns the message id header, if present.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.header(headers::MESSAGE_ID)
    }

    /// Borrows the body as `T` if that is its concrete type.
    #[must_use]
    pub fn body_as<T: Message>(&self) -> Option<&T> {
        self.body.as_any().downcast_ref::<T>()
    }

    /// Returns the shared body as `Arc<T>` if that is its concrete type.
    #[must_use]
    pub fn body_arc<T: Message>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.body).into_any().downcast::<T>().ok()
    }
}
