//! Server-sent event stream with auto-reconnect.
//!
//! Connects to the backend's `/api/events` feed and forwards parsed
//! frames, plus connection status changes, through a [`tokio::sync::mpsc`]
//! channel. Reconnection uses exponential backoff with jitter; the last
//! seen event id is replayed as `Last-Event-ID` so the backend can resume.
//!
//! # Example
//!
//! ```rust,ignore
//! use idsdash_api::{ApiClient, events::{EventSource, PushMessage, ReconnectConfig}};
//! use tokio_util::sync::CancellationToken;
//!
//! let client = ApiClient::with_defaults("http://127.0.0.1:5000")?;
//! let cancel = CancellationToken::new();
//! let (source, mut rx) = EventSource::connect(&client, ReconnectConfig::default(), cancel.clone())?;
//!
//! while let Some(msg) = rx.recv().await {
//!     if let PushMessage::Frame(frame) = msg {
//!         println!("{}: {}", frame.event, frame.data);
//!     }
//! }
//!
//! source.shutdown();
//! ```

use std::time::Duration;

use bytes::BytesMut;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL, HeaderValue};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::client::ApiClient;
use crate::error::Error;

// ── Channel capacity ─────────────────────────────────────────────────

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Event name used when a frame carries no `event:` line.
pub const DEFAULT_EVENT: &str = "message";

/// Longest line, and largest accumulated `data`, the parser will hold.
/// Anything larger is discarded up to the end of its frame.
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

// ── PushFrame ────────────────────────────────────────────────────────

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushFrame {
    /// Event category (`alert`, `block`, `scan`, ...).
    pub event: String,
    /// Raw data lines joined with `\n`. Normally a JSON document.
    pub data: String,
    /// Last event id in effect when this frame was dispatched.
    pub id: Option<String>,
}

// ── PushStatus ───────────────────────────────────────────────────────

/// Transport-level connection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushStatus {
    /// First connection attempt in flight.
    Connecting,
    /// The feed answered and frames are flowing.
    Open,
    /// Waiting before reconnection attempt `attempt` (1-based).
    Reconnecting { attempt: u32, delay: Duration },
    /// Retry budget exhausted after `attempts` consecutive failed
    /// connections; the transport has stopped.
    Degraded { attempts: u32 },
    /// Shut down on request.
    Closed,
}

/// Everything the transport task reports to its consumer, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushMessage {
    Frame(PushFrame),
    Status(PushStatus),
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for push reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    /// A `retry:` field from the server replaces it.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum consecutive failed attempts before giving up.
    /// `None` means retry forever. Default: 10.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: Some(10),
        }
    }
}

// ── SseParser ────────────────────────────────────────────────────────

/// Incremental `text/event-stream` decoder.
///
/// Accepts arbitrary byte chunks (lines may be split across them),
/// LF or CRLF line endings, `:` comment lines (keep-alives), multi-line
/// `data:`, `id:` and `retry:`.
#[derive(Debug, Default)]
pub struct SseParser {
    buf: BytesMut,
    event: Option<String>,
    data: String,
    has_data: bool,
    last_id: Option<String>,
    retry: Option<Duration>,
    /// Set while the current line is being skipped for length.
    skipping_line: bool,
    /// Set once the current frame exceeded [`MAX_FRAME_BYTES`].
    oversized: bool,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parser that resumes from a previously seen event id.
    pub fn with_last_event_id(last_id: Option<String>) -> Self {
        Self {
            last_id,
            ..Self::default()
        }
    }

    /// Feed a chunk and return every frame it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<PushFrame> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();

        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line = self.buf.split_to(pos + 1);
            if std::mem::take(&mut self.skipping_line) {
                // tail of an overlong line
                continue;
            }
            let mut line = &line[..pos];
            if line.last() == Some(&b'\r') {
                line = &line[..line.len() - 1];
            }
            let line = String::from_utf8_lossy(line);
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }

        if self.buf.len() > MAX_FRAME_BYTES {
            self.buf.clear();
            self.skipping_line = true;
            self.mark_oversized();
        }
        frames
    }

    fn mark_oversized(&mut self) {
        if !self.oversized {
            self.oversized = true;
            self.data = String::new();
            self.has_data = false;
        }
    }

    /// Id of the last frame seen, for `Last-Event-ID`.
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_id.as_deref()
    }

    /// Reconnect delay requested by the server, consumed once.
    pub fn take_retry(&mut self) -> Option<Duration> {
        self.retry.take()
    }

    fn process_line(&mut self, line: &str) -> Option<PushFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if let Some(comment) = line.strip_prefix(':') {
            tracing::trace!(comment = comment.trim(), "keep-alive");
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_owned()),
            "data" if self.oversized => {}
            "data" if self.data.len() + value.len() + 1 > MAX_FRAME_BYTES => self.mark_oversized(),
            "data" => {
                if self.has_data {
                    self.data.push('\n');
                }
                self.data.push_str(value);
                self.has_data = true;
            }
            "id" if !value.contains('\0') => self.last_id = Some(value.to_owned()),
            "retry" => {
                if let Ok(ms) = value.trim().parse::<u64>() {
                    self.retry = Some(Duration::from_millis(ms));
                }
            }
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<PushFrame> {
        let event = self.event.take();
        if std::mem::take(&mut self.oversized) {
            let err = Error::MalformedPushPayload {
                event: event.unwrap_or_else(|| DEFAULT_EVENT.to_owned()),
                message: format!("frame exceeds {MAX_FRAME_BYTES} bytes"),
            };
            tracing::warn!(error = %err, "dropping push frame");
            return None;
        }
        if !self.has_data {
            return None;
        }
        self.has_data = false;
        Some(PushFrame {
            event: event
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| DEFAULT_EVENT.to_owned()),
            data: std::mem::take(&mut self.data),
            id: self.last_id.clone(),
        })
    }
}

// ── EventSource ──────────────────────────────────────────────────────

/// Handle to a running push connection.
///
/// Call [`shutdown`](Self::shutdown) to tear down the background task;
/// the message channel closes after a final `Closed` status.
#[derive(Debug)]
pub struct EventSource {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl EventSource {
    /// Spawn the connection loop for `client`'s push feed.
    ///
    /// Returns immediately; the first connection attempt happens in the
    /// background. The feed URL (and `?token=`) is recomputed on every
    /// attempt, so a token refreshed in between is picked up. Cancelling
    /// `cancel` has the same effect as [`shutdown`](Self::shutdown).
    pub fn connect(
        client: &ApiClient,
        reconnect: ReconnectConfig,
        cancel: CancellationToken,
    ) -> Result<(Self, mpsc::Receiver<PushMessage>), Error> {
        let http = client.transport().build_stream_client()?;
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let task_cancel = cancel.clone();
        let client = client.clone();
        let task = tokio::spawn(async move {
            sse_loop(http, client, reconnect, tx, task_cancel).await;
        });

        Ok((Self { cancel, task }, rx))
    }

    /// Signal the background task to stop.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// `true` once the background task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: connect → read → on error, backoff → reconnect.
async fn sse_loop(
    http: reqwest::Client,
    client: ApiClient,
    mut reconnect: ReconnectConfig,
    tx: mpsc::Sender<PushMessage>,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;
    let mut last_id: Option<String> = None;

    if tx.send(PushMessage::Status(PushStatus::Connecting)).await.is_err() {
        return;
    }

    loop {
        let mut parser = SseParser::with_last_event_id(last_id.clone());
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = connect_and_read(&http, &client, &mut parser, &tx, &mut attempt) => result,
        };

        last_id = parser.last_event_id().map(str::to_owned);
        if let Some(retry) = parser.take_retry() {
            tracing::debug!(retry_ms = retry.as_millis() as u64, "server adjusted reconnect delay");
            reconnect.initial_delay = retry;
        }

        match result {
            // Server ended the stream; reconnect with the base delay.
            Ok(()) => tracing::info!("event stream ended, reconnecting"),
            Err(Disconnect::ConsumerGone) => return,
            Err(Disconnect::Transport) => {}
        }

        if let Some(max) = reconnect.max_retries {
            if attempt >= max {
                tracing::error!(max_retries = max, "event stream reconnection limit reached, giving up");
                // the failure just seen plus every retry before it
                let _ = tx
                    .send(PushMessage::Status(PushStatus::Degraded {
                        attempts: attempt.saturating_add(1),
                    }))
                    .await;
                return;
            }
        }

        let delay = calculate_backoff(attempt, &reconnect);
        attempt += 1;
        tracing::info!(delay_ms = delay.as_millis() as u64, attempt, "waiting before reconnect");
        if tx
            .send(PushMessage::Status(PushStatus::Reconnecting { attempt, delay }))
            .await
            .is_err()
        {
            return;
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
    }

    tracing::debug!("event stream loop exiting");
    let _ = tx.send(PushMessage::Status(PushStatus::Closed)).await;
}

/// Why a single connection ended abnormally. Transport errors are logged
/// where they happen; the loop only needs to know whether to back off.
enum Disconnect {
    Transport,
    ConsumerGone,
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Open one feed connection and forward frames until it drops.
///
/// A successful open resets `attempt` to zero.
async fn connect_and_read(
    http: &reqwest::Client,
    client: &ApiClient,
    parser: &mut SseParser,
    tx: &mpsc::Sender<PushMessage>,
    attempt: &mut u32,
) -> Result<(), Disconnect> {
    let url = client.events_url().map_err(|e| {
        tracing::warn!(error = %e, "cannot build event stream URL");
        Disconnect::Transport
    })?;
    tracing::info!(url = %redact_token(&url), "connecting to event stream");

    let mut request = http
        .get(url)
        .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
        .header(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    if let Some(id) = parser.last_event_id() {
        request = request.header("Last-Event-ID", id);
    }

    let resp = request.send().await.map_err(|e| {
        tracing::warn!(error = %e, attempt = *attempt, "event stream connect failed");
        Disconnect::Transport
    })?;
    let status = resp.status();
    if !status.is_success() {
        tracing::warn!(%status, attempt = *attempt, "event stream rejected");
        return Err(Disconnect::Transport);
    }

    tracing::info!("event stream connected");
    *attempt = 0;
    tx.send(PushMessage::Status(PushStatus::Open))
        .await
        .map_err(|_| Disconnect::ConsumerGone)?;

    let mut body = resp.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| {
            tracing::warn!(error = %e, "event stream read failed");
            Disconnect::Transport
        })?;
        for frame in parser.feed(&chunk) {
            tx.send(PushMessage::Frame(frame))
                .await
                .map_err(|_| Disconnect::ConsumerGone)?;
        }
    }
    Ok(())
}

/// URL for logs, with the `token` query value masked.
fn redact_token(url: &url::Url) -> String {
    if url.query().is_none() {
        return url.to_string();
    }
    let mut masked = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "token" { "***".to_owned() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    masked.query_pairs_mut().clear().extend_pairs(pairs);
    masked.to_string()
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) + jitter`
///
/// Jitter is +-25% to spread out reconnection storms from multiple clients.
pub fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt.min(30)).unwrap_or(30);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic "jitter" seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn frame(event: &str, data: &str, id: Option<&str>) -> PushFrame {
        PushFrame {
            event: event.into(),
            data: data.into(),
            id: id.map(Into::into),
        }
    }

    #[test]
    fn default_reconnect_config() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert_eq!(config.max_retries, Some(10));
    }

    #[test]
    fn backoff_increases_exponentially() {
        let config = ReconnectConfig::default();

        let d0 = calculate_backoff(0, &config);
        let d1 = calculate_backoff(1, &config);
        let d2 = calculate_backoff(2, &config);

        assert!(d1 > d0, "d1 ({d1:?}) should be greater than d0 ({d0:?})");
        assert!(d2 > d1, "d2 ({d2:?}) should be greater than d1 ({d1:?})");
    }

    #[test]
    fn backoff_caps_at_max_delay() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_retries: None,
        };

        let d10 = calculate_backoff(10, &config);
        // With jitter factor up to 1.25, max effective is 12.5s
        assert!(
            d10 <= Duration::from_secs(13),
            "delay at attempt 10 ({d10:?}) should be capped near max_delay"
        );
        // huge attempt counts must not overflow
        assert!(calculate_backoff(u32::MAX, &config) <= Duration::from_secs(13));
    }

    #[test]
    fn parses_named_events() {
        let mut parser = SseParser::new();
        let frames = parser.feed(b"event: alert\ndata: {\"id\":\"a1\"}\n\nevent: block\ndata: {}\n\n");
        assert_eq!(
            frames,
            vec![frame("alert", "{\"id\":\"a1\"}", None), frame("block", "{}", None)]
        );
    }

    #[test]
    fn handles_crlf_and_split_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"event: sc").is_empty());
        assert!(parser.feed(b"an\r\ndata: {\"scan\":").is_empty());
        assert!(parser.feed(b"{}}\r").is_empty());
        let frames = parser.feed(b"\n\r\n");
        assert_eq!(frames, vec![frame("scan", "{\"scan\":{}}", None)]);
    }

    #[test]
    fn comments_are_keepalives() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b": ok\n\n: ping\n\n").is_empty());
    }

    #[test]
    fn multi_line_data_and_default_event() {
        let mut parser = SseParser::new();
        let frames = parser.feed(b"data: line one\ndata:line two\n\n");
        assert_eq!(frames, vec![frame(DEFAULT_EVENT, "line one\nline two", None)]);
    }

    #[test]
    fn event_without_data_is_not_dispatched() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"event: alert\n\n").is_empty());
        // the event name does not leak into the next frame
        let frames = parser.feed(b"data: x\n\n");
        assert_eq!(frames[0].event, DEFAULT_EVENT);
    }

    #[test]
    fn tracks_id_and_retry() {
        let mut parser = SseParser::with_last_event_id(Some("7".into()));
        let frames = parser.feed(b"retry: 2500\nid: 8\nevent: alert\ndata: {}\n\n");
        assert_eq!(frames, vec![frame("alert", "{}", Some("8"))]);
        assert_eq!(parser.last_event_id(), Some("8"));
        assert_eq!(parser.take_retry(), Some(Duration::from_millis(2500)));
        assert_eq!(parser.take_retry(), None);
    }

    #[test]
    fn overlong_line_drops_its_frame_only() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"event: alert\ndata: ").is_empty());
        let filler = vec![b'x'; MAX_FRAME_BYTES / 2 + 1];
        assert!(parser.feed(&filler).is_empty());
        assert!(parser.feed(&filler).is_empty());
        // buffered bytes were released rather than kept growing
        assert!(parser.buf.len() <= MAX_FRAME_BYTES);
        assert!(parser.feed(&filler).is_empty());

        let frames = parser.feed(b"xx\n\nevent: alert\ndata: {\"id\":\"a2\"}\n\n");
        assert_eq!(frames, vec![frame("alert", "{\"id\":\"a2\"}", None)]);
    }

    #[test]
    fn oversized_multi_line_data_is_dropped() {
        let mut parser = SseParser::new();
        let line = format!("data: {}\n", "y".repeat(64 * 1024));
        let mut stream = b"event: block\n".to_vec();
        for _ in 0..(MAX_FRAME_BYTES / (64 * 1024) + 1) {
            stream.extend_from_slice(line.as_bytes());
        }
        stream.extend_from_slice(b"\ndata: small\n\n");

        let frames = parser.feed(&stream);
        assert_eq!(frames, vec![frame(DEFAULT_EVENT, "small", None)]);
        assert!(parser.data.is_empty());
    }

    #[test]
    fn token_is_redacted_in_logs() {
        let url = url::Url::parse("http://h/api/events?token=secret").expect("url");
        assert_eq!(redact_token(&url), "http://h/api/events?token=***");
    }
}
