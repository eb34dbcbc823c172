//! The lifecycle controller.
//!
//! A [`Controller`] owns at most one live session. [`Controller::send`]
//! spawns a session task that cancels whatever is streaming, publishes the
//! request's starting tree and then reads the generator's stream through a
//! [`StreamConsumer`]. Every observable effect of a session (snapshots,
//! conversation updates, terminal callbacks) happens under a single publish
//! gate after re-checking the session's cancellation token, so once a new
//! session has started nothing from an older one reaches the subscribers.

use std::sync::Arc;

use futures::StreamExt;
use genui_core::{SessionId, UiTree};
use log::{debug, warn};
use tokio::sync::{Mutex as AsyncMutex, oneshot, watch};
use tokio_util::sync::CancellationToken;

use crate::consumer::{ChunkUpdate, StreamConsumer};
use crate::error::ClientError;
use crate::generator::{GenerateRequest, Generator};
use crate::session::{SessionContext, SessionHandle, SessionOutcome, SessionStatus};
use crate::snapshot::{Snapshot, SnapshotStore, TreeDelta};
use crate::subscriber::{IntoSubscribers, SessionParams, UiSubscriber};

/// Drives generation sessions and publishes their trees.
///
/// Cloning is cheap; clones share the same session slot and snapshot store.
#[derive(Clone)]
pub struct Controller {
    shared: Arc<Shared>,
}

struct Shared {
    generator: Arc<dyn Generator>,
    subscribers: Vec<Arc<dyn UiSubscriber>>,
    store: SnapshotStore,
    gate: AsyncMutex<()>,
    active: parking_lot::Mutex<Option<ActiveSession>>,
}

struct ActiveSession {
    ctx: SessionContext,
    status: watch::Receiver<SessionStatus>,
}

enum Termination {
    Completed,
    Aborted,
    Errored(ClientError),
}

impl Controller {
    pub fn new(generator: impl Generator + 'static) -> Self {
        Self::with_subscribers(generator, ())
    }

    pub fn with_subscribers(
        generator: impl Generator + 'static,
        subscribers: impl IntoSubscribers,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                generator: Arc::new(generator),
                subscribers: subscribers.into_subscribers(),
                store: SnapshotStore::new(),
                gate: AsyncMutex::new(()),
                active: parking_lot::Mutex::new(None),
            }),
        }
    }

    /// Start a new session, superseding the current one.
    ///
    /// When this returns, the previous session is cancelled and the starting
    /// tree has been published as snapshot 0. All of that happens on the
    /// spawned session task, so dropping this future early does not leave a
    /// half-started session behind: the session still starts and runs.
    pub async fn send(&self, request: GenerateRequest) -> SessionHandle {
        let ctx = SessionContext::new(SessionId::random(), CancellationToken::new());
        let (status_tx, status_rx) = watch::channel(SessionStatus::Streaming);
        let (started_tx, started_rx) = oneshot::channel();

        let join = tokio::spawn(run_session(
            Arc::clone(&self.shared),
            ctx.clone(),
            request,
            StatusGuard(status_tx),
            status_rx.clone(),
            started_tx,
        ));
        // Fails only if the task died while starting; `wait()` reports that.
        let _ = started_rx.await;

        SessionHandle::new(ctx, status_rx, join)
    }

    /// Stop the current session without touching the published tree.
    ///
    /// Returns `true` if a streaming session was cancelled.
    pub async fn cancel(&self) -> bool {
        let _gate = self.shared.gate.lock().await;
        let active = self.shared.active.lock();
        match active.as_ref() {
            Some(session)
                if !session.ctx.is_cancelled()
                    && *session.status.borrow() == SessionStatus::Streaming =>
            {
                debug!("cancelling session {}", session.ctx.session_id());
                session.ctx.cancel();
                true
            }
            _ => false,
        }
    }

    /// Cancel the current session and forget the published tree.
    pub async fn clear(&self) {
        let _gate = self.shared.gate.lock().await;
        let previous = self.shared.active.lock().take();
        if let Some(previous) = previous {
            previous.ctx.cancel();
        }
        self.shared.store.reset();
        for subscriber in &self.shared.subscribers {
            subscriber.on_cleared().await;
        }
    }

    /// The latest published tree, if any.
    pub fn tree(&self) -> Option<Arc<UiTree>> {
        self.shared.store.current()
    }

    /// Status of the most recent session, `Idle` if there is none.
    pub fn status(&self) -> SessionStatus {
        self.shared
            .active
            .lock()
            .as_ref()
            .map_or(SessionStatus::Idle, |session| *session.status.borrow())
    }

    pub fn is_streaming(&self) -> bool {
        self.status() == SessionStatus::Streaming
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("generator", &self.shared.generator.name())
            .field("subscribers", &self.shared.subscribers.len())
            .field("status", &self.status())
            .finish()
    }
}

impl Shared {
    /// Install `ctx` as the live session, cancel the one it replaces and
    /// publish the starting tree.
    async fn start(
        &self,
        ctx: &SessionContext,
        status: watch::Receiver<SessionStatus>,
        base: Arc<UiTree>,
    ) {
        let session_id = ctx.session_id();
        let _gate = self.gate.lock().await;

        let previous = self.active.lock().replace(ActiveSession {
            ctx: ctx.clone(),
            status,
        });
        if let Some(previous) = previous {
            if !previous.ctx.is_cancelled() {
                debug!(
                    "session {} superseded by {}",
                    previous.ctx.session_id(),
                    session_id
                );
            }
            previous.ctx.cancel();
        }

        debug!(
            "starting session {} with {} generator",
            session_id,
            self.generator.name()
        );
        let params = SessionParams {
            session_id: &session_id,
            conversation: "",
            usage: None,
        };
        for subscriber in &self.subscribers {
            subscriber.on_session_started(params).await;
        }
        self.publish(session_id, 0, base, params).await;
    }

    /// Publish `tree` and notify subscribers. Callers hold the gate.
    async fn publish(
        &self,
        session_id: SessionId,
        sequence: u64,
        tree: Arc<UiTree>,
        params: SessionParams<'_>,
    ) {
        let delta = self.store.publish(Arc::clone(&tree)).unwrap_or_else(|e| {
            warn!("session {session_id}: could not compute snapshot delta: {e}");
            TreeDelta::empty()
        });
        let snapshot = Snapshot {
            session_id,
            sequence,
            tree,
            delta,
        };
        for subscriber in &self.subscribers {
            subscriber.on_snapshot(&snapshot, params).await;
        }
    }

    async fn deliver(
        &self,
        ctx: &SessionContext,
        consumer: &StreamConsumer,
        update: ChunkUpdate,
        sequence: &mut u64,
    ) {
        let _gate = self.gate.lock().await;
        if ctx.is_cancelled() {
            return;
        }

        let session_id = ctx.session_id();
        let params = SessionParams {
            session_id: &session_id,
            conversation: consumer.conversation(),
            usage: consumer.usage(),
        };
        if update.conversation_changed {
            for subscriber in &self.subscribers {
                subscriber.on_conversation(params).await;
            }
        }
        if let Some(tree) = update.tree {
            *sequence += 1;
            self.publish(session_id, *sequence, tree, params).await;
        }
    }

    async fn drive(
        &self,
        ctx: &SessionContext,
        request: &GenerateRequest,
        consumer: &mut StreamConsumer,
    ) -> Termination {
        let generated = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Termination::Aborted,
            generated = self.generator.generate(request, ctx) => generated,
        };
        let mut stream = match generated {
            Ok(stream) => stream,
            Err(e) => return Termination::Errored(e),
        };

        let mut sequence = 0;
        loop {
            let next = tokio::select! {
                biased;
                _ = ctx.cancelled() => return Termination::Aborted,
                next = stream.next() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    let update = consumer.push_chunk(&chunk);
                    if !update.is_empty() {
                        self.deliver(ctx, consumer, update, &mut sequence).await;
                    }
                }
                Some(Err(e)) => return Termination::Errored(e),
                None => {
                    let update = consumer.finish();
                    if !update.is_empty() {
                        self.deliver(ctx, consumer, update, &mut sequence).await;
                    }
                    return Termination::Completed;
                }
            }
        }
    }

    async fn finish(
        &self,
        ctx: &SessionContext,
        consumer: StreamConsumer,
        termination: Termination,
        reporter: &StatusGuard,
    ) -> SessionOutcome {
        let session_id = ctx.session_id();
        let _gate = self.gate.lock().await;

        // A session cancelled before it got here ends aborted, whatever the
        // stream did last.
        let termination = if ctx.is_cancelled() {
            if let Termination::Errored(e) = &termination {
                debug!("session {session_id}: dropping error after cancellation: {e}");
            }
            Termination::Aborted
        } else {
            termination
        };

        let params = SessionParams {
            session_id: &session_id,
            conversation: consumer.conversation(),
            usage: consumer.usage(),
        };
        let (status, error) = match termination {
            Termination::Completed => {
                debug!("session {session_id} completed");
                for subscriber in &self.subscribers {
                    subscriber.on_complete(consumer.tree(), params).await;
                }
                (SessionStatus::Completed, None)
            }
            Termination::Aborted => {
                debug!("session {session_id} aborted");
                (SessionStatus::Aborted, None)
            }
            Termination::Errored(e) => {
                warn!("session {session_id} failed: {e}");
                for subscriber in &self.subscribers {
                    subscriber.on_error(&e, params).await;
                }
                (SessionStatus::Errored, Some(Arc::new(e)))
            }
        };
        reporter.set(status);

        SessionOutcome {
            session_id,
            status,
            tree: Arc::clone(consumer.tree()),
            conversation: consumer.conversation().to_string(),
            usage: consumer.usage().cloned(),
            error,
        }
    }
}

/// Reports `Errored` if the session task goes away (a panicking subscriber,
/// runtime shutdown) before it reached a terminal status.
struct StatusGuard(watch::Sender<SessionStatus>);

impl StatusGuard {
    fn set(&self, status: SessionStatus) {
        self.0.send_replace(status);
    }
}

impl Drop for StatusGuard {
    fn drop(&mut self) {
        self.0.send_if_modified(|status| {
            if status.is_terminal() {
                return false;
            }
            *status = SessionStatus::Errored;
            true
        });
    }
}

async fn run_session(
    shared: Arc<Shared>,
    ctx: SessionContext,
    request: GenerateRequest,
    reporter: StatusGuard,
    status_rx: watch::Receiver<SessionStatus>,
    started: oneshot::Sender<()>,
) -> SessionOutcome {
    let base = Arc::new(request.starting_tree());
    shared.start(&ctx, status_rx, Arc::clone(&base)).await;
    let _ = started.send(());

    let mut consumer = StreamConsumer::new(ctx.session_id(), base);
    let termination = shared.drive(&ctx, &request, &mut consumer).await;
    shared.finish(&ctx, consumer, termination, &reporter).await
}
