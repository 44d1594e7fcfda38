// ── Event stream client ──
//
// Multiplexes the backend push feed onto per-category handlers. One
// connection is shared by every subscriber: it is opened lazily by the
// first subscription and closed when the last one goes away.
//
// Registry and connection live behind one mutex. Dispatch snapshots the
// handler list under the lock and invokes handlers after releasing it,
// so a handler never sees a half-updated registry and may itself
// subscribe or unsubscribe.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use idsdash_api::events::{EventSource, PushFrame, PushMessage, PushStatus, ReconnectConfig};
use idsdash_api::{ApiClient, Error as ApiError};
use indexmap::IndexMap;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::CoreError;
use crate::push_event::EventKind;

/// Callback invoked with each decoded JSON payload of its category.
pub type Handler = Arc<dyn Fn(&Value) + Send + Sync>;

// ── StreamStatus ─────────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    /// No subscribers, no connection.
    Closed,
    Connecting,
    Open,
    /// The transport lost the feed and is backing off before `attempt`.
    Reconnecting { attempt: u32 },
    /// The transport gave up after `attempts` failures. Subscribers are
    /// kept; [`EventStreamClient::reconnect`] or a new subscription
    /// rebuilds the connection.
    Degraded { attempts: u32 },
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => f.write_str("closed"),
            Self::Connecting => f.write_str("connecting"),
            Self::Open => f.write_str("open"),
            Self::Reconnecting { attempt } => write!(f, "reconnecting (attempt {attempt})"),
            Self::Degraded { attempts } => write!(f, "degraded after {attempts} attempts"),
        }
    }
}

// ── Connector seam ───────────────────────────────────────────────

/// A started push connection: its message feed and its stop switch.
pub struct PushConnection {
    pub messages: mpsc::Receiver<PushMessage>,
    pub cancel: CancellationToken,
}

/// Opens push connections. The production implementation is
/// [`SseConnector`]; tests substitute an in-memory feed.
pub trait PushConnector: Send + Sync + 'static {
    fn connect(&self) -> Result<PushConnection, CoreError>;
}

/// Connects to the backend's server-sent event feed through an
/// [`ApiClient`] (sharing its token, cookies and TLS settings).
#[derive(Debug, Clone)]
pub struct SseConnector {
    client: ApiClient,
    reconnect: ReconnectConfig,
}

impl SseConnector {
    pub fn new(client: ApiClient, reconnect: ReconnectConfig) -> Self {
        Self { client, reconnect }
    }
}

impl PushConnector for SseConnector {
    fn connect(&self) -> Result<PushConnection, CoreError> {
        let cancel = CancellationToken::new();
        let (_source, messages) =
            EventSource::connect(&self.client, self.reconnect.clone(), cancel.clone())?;
        Ok(PushConnection { messages, cancel })
    }
}

// ── Subscription ─────────────────────────────────────────────────

/// Handle returned by [`EventStreamClient::subscribe`].
///
/// Dropping it does NOT unsubscribe; call
/// [`unsubscribe`](Self::unsubscribe), which is idempotent.
#[derive(Debug)]
pub struct Subscription {
    inner: Weak<Inner>,
    event_type: String,
    id: u64,
    done: AtomicBool,
}

impl Subscription {
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Remove this handler. The last removal anywhere closes the connection.
    pub fn unsubscribe(&self) {
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(inner) = self.inner.upgrade() {
            inner.remove(&self.event_type, self.id);
        }
    }
}

// ── EventStreamClient ────────────────────────────────────────────

/// Shared, lazily connected push feed with per-category fan-out.
///
/// Cheaply cloneable via `Arc<Inner>`. `subscribe`, `unsubscribe` and
/// `close` are synchronous but spawn or cancel background tasks, so they
/// must run inside a Tokio runtime.
#[derive(Clone)]
pub struct EventStreamClient {
    inner: Arc<Inner>,
}

struct Inner {
    connector: Arc<dyn PushConnector>,
    state: Mutex<StreamState>,
    status: watch::Sender<StreamStatus>,
    next_id: AtomicU64,
}

#[derive(Default)]
struct StreamState {
    registry: IndexMap<String, Vec<Registration>>,
    connection: Option<ActiveConnection>,
    /// Bumped whenever a connection is opened or dropped; messages from
    /// an older pump are discarded.
    generation: u64,
}

struct Registration {
    id: u64,
    handler: Handler,
}

struct ActiveConnection {
    cancel: CancellationToken,
}

impl EventStreamClient {
    /// Client that connects through `connector` on first subscription.
    pub fn new(connector: Arc<dyn PushConnector>) -> Self {
        let (status, _) = watch::channel(StreamStatus::Closed);
        Self {
            inner: Arc::new(Inner {
                connector,
                state: Mutex::new(StreamState::default()),
                status,
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Client for `api`'s push feed.
    pub fn for_api(api: ApiClient, reconnect: ReconnectConfig) -> Self {
        Self::new(Arc::new(SseConnector::new(api, reconnect)))
    }

    // ── Subscription management ──────────────────────────────────

    /// Register `handler` for `event_type`.
    ///
    /// Opens the shared connection if none exists. Registering the same
    /// handler (by `Arc` identity) twice for one type is a no-op; the
    /// returned handle then refers to the existing registration.
    pub fn subscribe(&self, event_type: &str, handler: Handler) -> Result<Subscription, CoreError> {
        if event_type.parse::<EventKind>().is_err() {
            debug!(event_type, "subscribing to a category the feed does not emit");
        }

        let mut state = self.inner.lock();
        if state.connection.is_none() {
            self.inner.open(&mut state)?;
        }

        let handlers = state.registry.entry(event_type.to_owned()).or_default();
        let id = if let Some(existing) = handlers.iter().find(|r| Arc::ptr_eq(&r.handler, &handler)) {
            existing.id
        } else {
            let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
            handlers.push(Registration { id, handler });
            id
        };
        debug!(event_type, id, "handler subscribed");

        Ok(Subscription {
            inner: Arc::downgrade(&self.inner),
            event_type: event_type.to_owned(),
            id,
            done: AtomicBool::new(false),
        })
    }

    /// Convenience wrapper around [`subscribe`](Self::subscribe) for a
    /// known category and a plain closure.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> Result<Subscription, CoreError>
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.subscribe(kind.as_ref(), Arc::new(handler))
    }

    /// Drop the connection and every subscription.
    pub fn close(&self) {
        let mut state = self.inner.lock();
        state.registry.clear();
        self.inner.drop_connection(&mut state, StreamStatus::Closed);
        info!("event stream closed");
    }

    /// Replace the connection with a fresh one, keeping subscriptions.
    ///
    /// Picks up a changed token (after login) and recovers from
    /// [`StreamStatus::Degraded`]. No-op without subscribers.
    pub fn reconnect(&self) -> Result<(), CoreError> {
        let mut state = self.inner.lock();
        if state.registry.is_empty() {
            return Ok(());
        }
        self.inner.drop_connection(&mut state, StreamStatus::Closed);
        self.inner.open(&mut state)
    }

    // ── Observation ──────────────────────────────────────────────

    pub fn status(&self) -> StreamStatus {
        *self.inner.status.borrow()
    }

    /// Subscribe to status changes.
    pub fn watch_status(&self) -> watch::Receiver<StreamStatus> {
        self.inner.status.subscribe()
    }

    /// Status changes as a stream (current value first).
    pub fn status_stream(&self) -> WatchStream<StreamStatus> {
        WatchStream::new(self.inner.status.subscribe())
    }

    /// `true` while a connection exists (open, connecting or reconnecting).
    pub fn is_connected(&self) -> bool {
        self.inner.lock().connection.is_some()
    }

    /// Total handlers across all categories.
    pub fn handler_count(&self) -> usize {
        self.inner.lock().registry.values().map(Vec::len).sum()
    }
}

impl fmt::Debug for EventStreamClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStreamClient")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

// ── Inner: connection lifecycle and dispatch ─────────────────────

impl Inner {
    fn lock(&self) -> MutexGuard<'_, StreamState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a connection and its pump task. Caller holds the lock.
    fn open(self: &Arc<Self>, state: &mut StreamState) -> Result<(), CoreError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| CoreError::Stream {
            message: format!("no Tokio runtime: {e}"),
        })?;

        let PushConnection { messages, cancel } = self.connector.connect()?;
        state.generation += 1;
        let generation = state.generation;
        state.connection = Some(ActiveConnection {
            cancel: cancel.clone(),
        });
        self.status.send_replace(StreamStatus::Connecting);
        info!(generation, "event stream connection created");

        runtime.spawn(pump(Arc::downgrade(self), generation, messages, cancel));
        Ok(())
    }

    /// Cancel the current connection, if any. Caller holds the lock.
    fn drop_connection(&self, state: &mut StreamState, status: StreamStatus) {
        if let Some(conn) = state.connection.take() {
            conn.cancel.cancel();
            state.generation += 1;
        }
        self.status.send_replace(status);
    }

    fn remove(&self, event_type: &str, id: u64) {
        let mut state = self.lock();
        let Some(handlers) = state.registry.get_mut(event_type) else {
            return;
        };
        handlers.retain(|r| r.id != id);
        if handlers.is_empty() {
            state.registry.shift_remove(event_type);
        }
        debug!(event_type, id, "handler unsubscribed");

        if state.registry.is_empty() {
            self.drop_connection(&mut state, StreamStatus::Closed);
            info!("last subscriber gone, event stream closed");
        }
    }

    fn on_status(&self, generation: u64, status: PushStatus) {
        let mut state = self.lock();
        if state.generation != generation {
            return;
        }
        match status {
            PushStatus::Connecting => {
                self.status.send_replace(StreamStatus::Connecting);
            }
            PushStatus::Open => {
                self.status.send_replace(StreamStatus::Open);
            }
            PushStatus::Reconnecting { attempt, delay } => {
                warn!(attempt, delay_ms = delay.as_millis() as u64, "event stream reconnecting");
                self.status.send_replace(StreamStatus::Reconnecting { attempt });
            }
            PushStatus::Degraded { attempts } => {
                error!(attempts, "event stream degraded, transport stopped retrying");
                self.drop_connection(&mut state, StreamStatus::Degraded { attempts });
            }
            PushStatus::Closed => {}
        }
    }

    fn on_frame(&self, generation: u64, frame: &PushFrame) {
        if frame.event.parse::<EventKind>().is_err() {
            debug!(event = %frame.event, "ignoring frame of unknown category");
            return;
        }

        let payload: Value = match serde_json::from_str(&frame.data) {
            Ok(v) => v,
            Err(e) => {
                let err = ApiError::MalformedPushPayload {
                    event: frame.event.clone(),
                    message: e.to_string(),
                };
                warn!(error = %err, "dropping push frame");
                return;
            }
        };

        let snapshot: Vec<Handler> = {
            let state = self.lock();
            if state.generation != generation {
                return;
            }
            state
                .registry
                .get(&frame.event)
                .map(|regs| regs.iter().map(|r| Arc::clone(&r.handler)).collect())
                .unwrap_or_default()
        };

        for handler in snapshot {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(&payload))) {
                error!(
                    event = %frame.event,
                    panic = panic_message(panic.as_ref()),
                    "push handler panicked"
                );
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(conn) = state.connection.take() {
            conn.cancel.cancel();
        }
    }
}

// ── Pump task ────────────────────────────────────────────────────

/// Forward transport messages to the client until cancelled, the feed
/// ends, or the client itself is dropped.
async fn pump(
    inner: Weak<Inner>,
    generation: u64,
    mut messages: mpsc::Receiver<PushMessage>,
    cancel: CancellationToken,
) {
    loop {
        let msg = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            msg = messages.recv() => msg,
        };
        let Some(msg) = msg else { break };
        let Some(inner) = inner.upgrade() else { break };
        match msg {
            PushMessage::Frame(frame) => inner.on_frame(generation, &frame),
            PushMessage::Status(status) => inner.on_status(generation, status),
        }
    }
    cancel.cancel();
    debug!(generation, "event stream pump exiting");
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic>")
}
