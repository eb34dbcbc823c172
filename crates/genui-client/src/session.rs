//! Session state, context and handles.
//!
//! A session is one `send`: it starts `Streaming` and ends in exactly one of
//! `Completed`, `Errored` or `Aborted`. Cancellation is cooperative through a
//! [`CancellationToken`] carried in the [`SessionContext`]; the session checks
//! it before consuming each chunk and before every visible effect.

use crate::error::{ClientError, ClientResult};
use genui_core::{SessionId, TokenUsage, UiTree};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// No session has been started (or the controller was cleared).
    Idle,
    Streaming,
    Completed,
    /// Cancelled by the caller or superseded by a newer session.
    Aborted,
    Errored,
}

impl SessionStatus {
    /// Terminal states are final for the session that reached them.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted | Self::Errored)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Streaming => "streaming",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
            Self::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// Context handed to a generator for one session.
///
/// Cheap to clone. Generators that do their own waiting should watch
/// [`cancelled`](Self::cancelled) so a superseded request stops promptly:
///
/// ```rust,ignore
/// tokio::select! {
///     _ = ctx.cancelled() => return Err(ClientError::custom("cancelled")),
///     response = client.send() => { /* ... */ }
/// }
/// ```
#[derive(Clone)]
pub struct SessionContext {
    session_id: SessionId,
    cancellation: CancellationToken,
}

impl SessionContext {
    #[must_use]
    pub fn new(session_id: SessionId, cancellation: CancellationToken) -> Self {
        Self {
            session_id,
            cancellation,
        }
    }

    /// A context with a random ID and a fresh token. Handy in tests.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(SessionId::random(), CancellationToken::new())
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Completes when cancellation is requested.
    pub fn cancelled(&self) -> tokio_util::sync::WaitForCancellationFuture<'_> {
        self.cancellation.cancelled()
    }

    /// Request cancellation. The session notices at its next check.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// A token that is cancelled with this session but can also be
    /// cancelled on its own.
    #[must_use]
    pub fn child_token(&self) -> CancellationToken {
        self.cancellation.child_token()
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("session_id", &self.session_id)
            .field("is_cancelled", &self.is_cancelled())
            .finish()
    }
}

/// What a session ended with.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub session_id: SessionId,
    pub status: SessionStatus,
    /// The last tree the session derived. For an aborted session this may
    /// be newer than anything that was published.
    pub tree: Arc<UiTree>,
    pub conversation: String,
    pub usage: Option<TokenUsage>,
    /// Set when `status` is `Errored`.
    pub error: Option<Arc<ClientError>>,
}

/// Handle to a running session, returned by
/// [`Controller::send`](crate::controller::Controller::send).
#[derive(Debug)]
pub struct SessionHandle {
    ctx: SessionContext,
    status: watch::Receiver<SessionStatus>,
    join: JoinHandle<SessionOutcome>,
}

impl SessionHandle {
    pub(crate) fn new(
        ctx: SessionContext,
        status: watch::Receiver<SessionStatus>,
        join: JoinHandle<SessionOutcome>,
    ) -> Self {
        Self { ctx, status, join }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.ctx.session_id()
    }

    /// Current status of this session.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    /// A receiver that observes every status transition of this session.
    #[must_use]
    pub fn status_receiver(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    /// Cancel this session. It ends `Aborted` without completion or error
    /// callbacks, unless it had already finished.
    pub fn cancel(&self) {
        self.ctx.cancel();
    }

    /// Wait for the session to reach a terminal state.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Generation`] if the session task panicked.
    pub async fn wait(self) -> ClientResult<SessionOutcome> {
        self.join
            .await
            .map_err(|e| ClientError::custom_with_source("session task failed", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!SessionStatus::Idle.is_terminal());
        assert!(!SessionStatus::Streaming.is_terminal());
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Aborted.is_terminal());
        assert!(SessionStatus::Errored.is_terminal());
    }

    #[test]
    fn status_display() {
        assert_eq!(SessionStatus::Streaming.to_string(), "streaming");
        assert_eq!(SessionStatus::Aborted.to_string(), "aborted");
    }

    #[tokio::test]
    async fn context_cancellation() {
        let ctx = SessionContext::empty();
        assert!(!ctx.is_cancelled());

        let clone = ctx.clone();
        clone.cancel();
        assert!(ctx.is_cancelled());
        ctx.cancelled().await;
    }

    #[tokio::test]
    async fn context_child_token() {
        let ctx = SessionContext::empty();
        let child = ctx.child_token();

        assert!(!child.is_cancelled());
        ctx.cancel();
        assert!(child.is_cancelled());
    }

    #[tokio::test]
    async fn handle_reports_status_and_outcome() {
        let ctx = SessionContext::empty();
        let (tx, rx) = watch::channel(SessionStatus::Streaming);
        let id = ctx.session_id();
        let join = tokio::spawn(async move {
            tx.send_replace(SessionStatus::Completed);
            SessionOutcome {
                session_id: id,
                status: SessionStatus::Completed,
                tree: Arc::new(UiTree::new()),
                conversation: String::new(),
                usage: None,
                error: None,
            }
        });
        let handle = SessionHandle::new(ctx, rx, join);
        assert_eq!(handle.id(), id);

        let outcome = handle.wait().await.expect("task should not panic");
        assert_eq!(outcome.status, SessionStatus::Completed);
    }
}
