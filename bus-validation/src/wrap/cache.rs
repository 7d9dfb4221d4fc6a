//! Cache of wrap operations keyed by concrete body type.

use super::{FailureDetails, WrapOperation};
use crate::errors::WrapError;
use crate::message::{Message, MessageType};
use dashmap::DashMap;
use std::any::TypeId;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Thread-safe, append-only cache of [`WrapOperation`]s.
///
/// Concurrent first uses of one type may each resolve the operation, but only
/// one is stored and counted.
#[derive(Debug, Default)]
pub struct WrapperCache {
    operations: DashMap<TypeId, WrapOperation>,
    synthesized: AtomicUsize,
}

impl WrapperCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the wrap operation for the body's concrete type.
    ///
    /// # Errors
    ///
    /// Returns [`WrapError::NotWrappable`] if the type has no wrap operation.
    pub fn operation_for(&self, body: &dyn Message) -> Result<WrapOperation, WrapError> {
        let message_type = body.message_type();
        let cached = self.operations.get(&message_type.id()).map(|op| *op);
        if let Some(op) = cached {
            return Ok(op);
        }

        let resolved = body.wrap_operation().ok_or_else(|| WrapError::NotWrappable {
            message_type: message_type.name().to_string(),
        })?;

        let stored = *self
            .operations
            .entry(message_type.id())
            .or_insert_with(|| {
                self.synthesized.fetch_add(1, Ordering::SeqCst);
                trace!(message_type = %message_type, "Cached wrap operation");
                resolved
            });
        Ok(stored)
    }

    /// Wraps `body` as `ValidationFailed<T>` for its concrete `T`.
    ///
    /// # Errors
    ///
    /// Returns a [`WrapError`] if the body type cannot be wrapped.
    pub fn wrap(
        &self,
        body: Arc<dyn Message>,
        details: FailureDetails,
    ) -> Result<Arc<dyn Message>, WrapError> {
        let op = self.operation_for(body.as_ref())?;
        op.apply(body, details)
    }

    /// Returns true if an operation is cached for the type.
    #[must_use]
    pub fn contains(&self, message_type: &MessageType) -> bool {
        self.operations.contains_key(&message_type.id())
    }

    /// Returns how many operations were added to the cache.
    #[must_use]
    pub fn synthesized(&self) -> usize {
        self.synthesized.load(Ordering::SeqCst)
    }

    /// Returns the number of cached operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns true if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Headers;
    use crate::testing::{TestMessage, TestMessage1, TestMessage2, TestMessageValidator};
    use crate::validation::{ValidationOutcome, ValidatorType};
    use crate::wrap::ValidationFailed;

    fn details() -> FailureDetails {
        FailureDetails::new(
            Headers::new(),
            ValidationOutcome::invalid(vec![]),
            ValidatorType::of::<TestMessageValidator>(),
        )
    }

    #[test]
    fn test_cache_synthesizes_once_per_type() {
        let cache = WrapperCache::new();

        for _ in 0..5 {
            cache
                .wrap(Arc::new(TestMessage::invalid()), details())
                .unwrap();
        }

        assert_eq!(cache.synthesized(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&MessageType::of::<TestMessage>()));
    }

    #[test]
    fn test_cache_keys_by_concrete_type() {
        let cache = WrapperCache::new();

        let first = cache.wrap(Arc::new(TestMessage1::default()), details()).unwrap();
        let second = cache.wrap(Arc::new(TestMessage2::default()), details()).unwrap();

        assert_eq!(cache.synthesized(), 2);
        assert!(first
            .as_any()
            .is::<ValidationFailed<TestMessage1>>());
        assert!(second
            .as_any()
            .is::<ValidationFailed<TestMessage2>>());
    }

    #[test]
    fn test_wrapper_cannot_be_wrapped_again() {
        let cache = WrapperCache::new();
        let wrapped = cache
            .wrap(Arc::new(TestMessage::invalid()), details())
            .unwrap();

        let err = cache.wrap(wrapped, details()).unwrap_err();
        assert!(matches!(err, WrapError::NotWrappable { .. }));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_use_stores_one_operation() {
        let cache = Arc::new(WrapperCache::new());

        let tasks = (0..32).map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache
                    .wrap(Arc::new(TestMessage::invalid()), details())
                    .map(|_| ())
            })
        });

        for result in futures::future::join_all(tasks).await {
            assert!(result.unwrap().is_ok());
        }
        assert_eq!(cache.synthesized(), 1);
    }
}
