use std::sync::Arc;

use genui_core::{SessionId, TokenUsage, UiTree};

use crate::error::ClientError;
use crate::snapshot::Snapshot;

/// Session context handed to every callback.
#[derive(Debug, Clone, Copy)]
pub struct SessionParams<'a> {
    pub session_id: &'a SessionId,
    /// Conversational text received so far.
    pub conversation: &'a str,
    pub usage: Option<&'a TokenUsage>,
}

/// Observer of a [`Controller`](crate::Controller).
///
/// Callbacks run while the controller's publish gate is held, so they are
/// never interleaved across sessions and never fire for a session that has
/// been superseded. They must not call back into the controller's async
/// methods (`send`, `cancel`, `clear`), which wait on that same gate.
#[async_trait::async_trait]
pub trait UiSubscriber: Send + Sync {
    // Session lifecycle
    async fn on_session_started(&self, _params: SessionParams<'async_trait>) {}

    async fn on_complete(&self, _tree: &UiTree, _params: SessionParams<'async_trait>) {}

    async fn on_error(&self, _error: &ClientError, _params: SessionParams<'async_trait>) {}

    async fn on_cleared(&self) {}

    // Progress
    async fn on_snapshot(&self, _snapshot: &Snapshot, _params: SessionParams<'async_trait>) {}

    async fn on_conversation(&self, _params: SessionParams<'async_trait>) {}
}

/// Anything that can be turned into a subscriber list.
pub trait IntoSubscribers {
    fn into_subscribers(self) -> Vec<Arc<dyn UiSubscriber>>;
}

impl IntoSubscribers for () {
    fn into_subscribers(self) -> Vec<Arc<dyn UiSubscriber>> {
        Vec::new()
    }
}

impl IntoSubscribers for Vec<Arc<dyn UiSubscriber>> {
    fn into_subscribers(self) -> Vec<Arc<dyn UiSubscriber>> {
        self
    }
}

impl<T: UiSubscriber + 'static> IntoSubscribers for Arc<T> {
    fn into_subscribers(self) -> Vec<Arc<dyn UiSubscriber>> {
        vec![self]
    }
}
