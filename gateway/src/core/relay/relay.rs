//! The duplex pump between one client connection and one upstream session.

use axum::extract::ws::{CloseFrame, Message, close_code};
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};

use super::messages::OutboundClientMessage;
use crate::core::audio::PcmFormat;
use crate::core::realtime::{
    InboundEvent, SessionMetadata, UpstreamReceiver, UpstreamSender, UpstreamSession,
};
use crate::errors::RelayError;

/// Upper bound on delivering the final close frame to the client.
pub const CLIENT_CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

// =============================================================================
// State
// =============================================================================

/// Lifecycle of one relay session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelayState {
    /// Waiting for the upstream session to open.
    #[default]
    Connecting,
    /// Both pumps running.
    Active,
    /// One side has ended; tearing down the other.
    Draining,
    /// Both sides released.
    Closed,
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayState::Connecting => write!(f, "connecting"),
            RelayState::Active => write!(f, "active"),
            RelayState::Draining => write!(f, "draining"),
            RelayState::Closed => write!(f, "closed"),
        }
    }
}

/// Traffic counters for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Binary frames forwarded upstream.
    pub audio_in_chunks: u64,
    /// Bytes forwarded upstream.
    pub audio_in_bytes: u64,
    /// `audio_output` messages sent to the client.
    pub audio_out_messages: u64,
    /// Other events sent to the client.
    pub passthrough_messages: u64,
    /// Audio events dropped for being empty, undecodable or unframeable.
    pub skipped_audio: u64,
}

#[derive(Debug, Default)]
struct RelayCounters {
    audio_in_chunks: AtomicU64,
    audio_in_bytes: AtomicU64,
    audio_out_messages: AtomicU64,
    passthrough_messages: AtomicU64,
    skipped_audio: AtomicU64,
}

impl RelayCounters {
    fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    fn snapshot(&self) -> RelayStats {
        RelayStats {
            audio_in_chunks: self.audio_in_chunks.load(Ordering::Relaxed),
            audio_in_bytes: self.audio_in_bytes.load(Ordering::Relaxed),
            audio_out_messages: self.audio_out_messages.load(Ordering::Relaxed),
            passthrough_messages: self.passthrough_messages.load(Ordering::Relaxed),
            skipped_audio: self.skipped_audio.load(Ordering::Relaxed),
        }
    }
}

/// How a session ended.
#[derive(Debug)]
pub struct RelayOutcome {
    /// Why the first pump stopped.
    pub reason: RelayError,
    pub stats: RelayStats,
    /// Provider identifiers seen before the session closed.
    pub metadata: SessionMetadata,
}

impl RelayOutcome {
    /// True when the client side ended the session.
    pub fn ended_by_client(&self) -> bool {
        matches!(self.reason, RelayError::ClientDisconnected)
    }
}

// =============================================================================
// Relay
// =============================================================================

/// Runs one relay session.
///
/// A relay starts in [`RelayState::Connecting`]. [`Relay::run`] moves it
/// through `Active` and `Draining` to `Closed`; [`Relay::abandon`] moves it
/// straight to `Closed` when no upstream session could be opened.
#[derive(Debug)]
pub struct Relay {
    session_id: String,
    state: watch::Sender<RelayState>,
}

impl Relay {
    pub fn new(session_id: impl Into<String>) -> Self {
        let (state, _) = watch::channel(RelayState::Connecting);
        Self {
            session_id: session_id.into(),
            state,
        }
    }

    pub fn state(&self) -> RelayState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<RelayState> {
        self.state.subscribe()
    }

    /// Close a session whose upstream never opened.
    pub fn abandon(&self) {
        self.transition(RelayState::Closed);
    }

    fn transition(&self, next: RelayState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(
                session_id = %self.session_id,
                from = %previous,
                to = %next,
                "Relay state changed"
            );
        }
    }

    /// Pump both directions until one side ends, then release both.
    ///
    /// `client_rx` and `client_tx` are the two halves of the client socket.
    /// The upstream session is always closed before this returns.
    pub async fn run<S, E, K>(
        &self,
        mut client_rx: S,
        mut client_tx: K,
        mut upstream: UpstreamSession,
    ) -> RelayOutcome
    where
        S: Stream<Item = Result<Message, E>> + Unpin,
        E: fmt::Display,
        K: Sink<Message> + Unpin,
        K::Error: fmt::Display,
    {
        self.transition(RelayState::Active);
        info!(session_id = %self.session_id, "Relay active");

        let counters = RelayCounters::default();

        let reason = {
            let (sender, receiver) = upstream.split();
            tokio::select! {
                reason = pump_client_to_upstream(&mut client_rx, sender, &counters) => reason,
                reason = pump_upstream_to_client(
                    receiver,
                    &mut client_tx,
                    PcmFormat::default(),
                    &counters,
                ) => reason,
            }
        };

        self.transition(RelayState::Draining);
        match &reason {
            RelayError::UpstreamStreamError(e) => {
                warn!(session_id = %self.session_id, "Upstream failed: {}", e);
            }
            other => info!(session_id = %self.session_id, "Session ending: {}", other),
        }

        close_client(&mut client_tx).await;
        let metadata = upstream.metadata();
        if let Err(e) = upstream.close().await {
            warn!(session_id = %self.session_id, "Upstream close: {}", e);
        }

        self.transition(RelayState::Closed);
        let stats = counters.snapshot();
        info!(
            session_id = %self.session_id,
            chat_id = metadata.chat_id.as_deref().unwrap_or(""),
            chat_group_id = metadata.chat_group_id.as_deref().unwrap_or(""),
            audio_in_chunks = stats.audio_in_chunks,
            audio_in_bytes = stats.audio_in_bytes,
            audio_out_messages = stats.audio_out_messages,
            passthrough_messages = stats.passthrough_messages,
            skipped_audio = stats.skipped_audio,
            "Relay closed"
        );

        RelayOutcome {
            reason,
            stats,
            metadata,
        }
    }
}

// =============================================================================
// Pumps
// =============================================================================

/// Client → upstream. Binary frames are forwarded as-is.
async fn pump_client_to_upstream<S, E>(
    client_rx: &mut S,
    upstream: &UpstreamSender,
    counters: &RelayCounters,
) -> RelayError
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: fmt::Display,
{
    while let Some(frame) = client_rx.next().await {
        match frame {
            Ok(Message::Binary(chunk)) => {
                let len = chunk.len() as u64;
                if let Err(e) = upstream.send(chunk).await {
                    return RelayError::UpstreamStreamError(format!(
                        "upstream stopped accepting audio: {e}"
                    ));
                }
                RelayCounters::bump(&counters.audio_in_chunks, 1);
                RelayCounters::bump(&counters.audio_in_bytes, len);
            }
            Ok(Message::Text(text)) => {
                debug!("Ignoring text frame from client ({} bytes)", text.len());
            }
            Ok(Message::Close(frame)) => {
                debug!("Client sent close: {:?}", frame);
                return RelayError::ClientDisconnected;
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Err(e) => {
                warn!("Client connection error: {}", e);
                return RelayError::ClientDisconnected;
            }
        }
    }
    RelayError::ClientDisconnected
}

/// Upstream → client. Audio is framed as WAV, everything else passes through.
async fn pump_upstream_to_client<K>(
    upstream: &mut UpstreamReceiver,
    client_tx: &mut K,
    fallback: PcmFormat,
    counters: &RelayCounters,
) -> RelayError
where
    K: Sink<Message> + Unpin,
    K::Error: fmt::Display,
{
    loop {
        let event = match upstream.receive().await {
            None => return RelayError::UpstreamClosed,
            Some(Err(e)) => return RelayError::UpstreamStreamError(e.to_string()),
            Some(Ok(event)) => event,
        };

        if let InboundEvent::InvalidAudio { id, reason } = &event {
            warn!(chunk_id = ?id, "Skipping undecodable audio_output: {}", reason);
            RelayCounters::bump(&counters.skipped_audio, 1);
            continue;
        }

        let message = match OutboundClientMessage::from_event(event, fallback) {
            Ok(Some(message)) => message,
            Ok(None) => {
                trace!("Skipping empty audio chunk");
                RelayCounters::bump(&counters.skipped_audio, 1);
                continue;
            }
            Err(e) => {
                warn!("Skipping audio chunk: {}", RelayError::InvalidAudioParameters(e));
                RelayCounters::bump(&counters.skipped_audio, 1);
                continue;
            }
        };

        let frame = match message.to_ws_message() {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to serialize client message: {}", e);
                continue;
            }
        };

        if let Err(e) = client_tx.send(frame).await {
            debug!("Client stopped accepting messages: {}", e);
            return RelayError::ClientDisconnected;
        }

        match message {
            OutboundClientMessage::AudioOutput(_) => {
                RelayCounters::bump(&counters.audio_out_messages, 1)
            }
            OutboundClientMessage::Passthrough(_) => {
                RelayCounters::bump(&counters.passthrough_messages, 1)
            }
        }
    }
}

/// Send a normal close frame and close the sink, giving up after
/// [`CLIENT_CLOSE_TIMEOUT`].
async fn close_client<K>(client_tx: &mut K)
where
    K: Sink<Message> + Unpin,
    K::Error: fmt::Display,
{
    let close = async {
        let frame = Message::Close(Some(CloseFrame {
            code: close_code::NORMAL,
            reason: "".into(),
        }));
        if let Err(e) = client_tx.send(frame).await {
            debug!("Close frame not delivered: {}", e);
        }
        if let Err(e) = client_tx.close().await {
            debug!("Client sink close: {}", e);
        }
    };

    if tokio::time::timeout(CLIENT_CLOSE_TIMEOUT, close).await.is_err() {
        debug!("Client did not accept close in time");
    }
}
