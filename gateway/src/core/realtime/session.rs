//! Duplex handle over one open upstream session.
//!
//! An [`UpstreamSession`] wraps two bounded channels into a provider
//! transport task: raw audio bytes flow out through one, classified
//! [`InboundEvent`]s flow back through the other. Adapters build a session
//! with [`UpstreamSession::from_channels`] and attach their task with
//! [`UpstreamSession::with_task`].

use bytes::Bytes;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::base::{ConnectionState, InboundEvent, RealtimeError, RealtimeResult};

/// How long [`UpstreamSession::close`] waits for the transport task.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Provider-side identifiers reported once the session is established.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionMetadata {
    pub chat_id: Option<String>,
    pub chat_group_id: Option<String>,
}

/// Outgoing half of an upstream session.
#[derive(Debug)]
pub struct UpstreamSender {
    tx: Option<mpsc::Sender<Bytes>>,
}

impl UpstreamSender {
    /// Forward raw audio bytes.
    ///
    /// Suspends while the transport's queue is full.
    pub async fn send(&self, chunk: Bytes) -> RealtimeResult<()> {
        let tx = self.tx.as_ref().ok_or(RealtimeError::NotConnected)?;
        tx.send(chunk)
            .await
            .map_err(|_| RealtimeError::NotConnected)
    }
}

/// Incoming half of an upstream session.
#[derive(Debug)]
pub struct UpstreamReceiver {
    rx: mpsc::Receiver<RealtimeResult<InboundEvent>>,
    finished: bool,
}

impl UpstreamReceiver {
    /// Wait for the next event.
    ///
    /// Returns `None` once the provider closes the stream. After an error or
    /// the end of the stream every later call returns `None`.
    pub async fn receive(&mut self) -> Option<RealtimeResult<InboundEvent>> {
        if self.finished {
            return None;
        }

        let next = self.rx.recv().await;
        if matches!(next, None | Some(Err(_))) {
            self.finished = true;
        }
        next
    }
}

/// One open duplex session with a realtime provider.
#[derive(Debug)]
pub struct UpstreamSession {
    sender: UpstreamSender,
    receiver: UpstreamReceiver,
    task: Option<JoinHandle<()>>,
    metadata: watch::Receiver<SessionMetadata>,
    close_timeout: Duration,
    state: ConnectionState,
}

impl UpstreamSession {
    /// Build a session from the channels of a transport.
    ///
    /// `outgoing` carries audio towards the provider and `events` carries
    /// classified provider events back.
    pub fn from_channels(
        outgoing: mpsc::Sender<Bytes>,
        events: mpsc::Receiver<RealtimeResult<InboundEvent>>,
    ) -> Self {
        // Sessions built without a metadata source report nothing.
        let (_, metadata) = watch::channel(SessionMetadata::default());
        Self {
            sender: UpstreamSender { tx: Some(outgoing) },
            receiver: UpstreamReceiver {
                rx: events,
                finished: false,
            },
            task: None,
            metadata,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
            state: ConnectionState::Connected,
        }
    }

    /// Attach the transport task; it is awaited on close and aborted on drop.
    pub fn with_task(mut self, task: JoinHandle<()>) -> Self {
        self.task = Some(task);
        self
    }

    /// Attach a source of provider metadata.
    pub fn with_metadata(mut self, metadata: watch::Receiver<SessionMetadata>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Bound how long close waits before aborting the transport.
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Forward raw audio bytes.
    pub async fn send(&self, chunk: Bytes) -> RealtimeResult<()> {
        self.sender.send(chunk).await
    }

    /// Wait for the next provider event.
    pub async fn receive(&mut self) -> Option<RealtimeResult<InboundEvent>> {
        self.receiver.receive().await
    }

    /// Lend the two halves so they can be driven concurrently.
    pub fn split(&mut self) -> (&UpstreamSender, &mut UpstreamReceiver) {
        (&self.sender, &mut self.receiver)
    }

    /// Latest provider metadata.
    pub fn metadata(&self) -> SessionMetadata {
        self.metadata.borrow().clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Close the session.
    ///
    /// Stops accepting audio, stops delivering events, then waits up to the
    /// close timeout for the transport to finish. A transport that does not
    /// finish in time is aborted and `Timeout` is returned. Calling this
    /// again is a no-op.
    pub async fn close(&mut self) -> RealtimeResult<()> {
        if matches!(
            self.state,
            ConnectionState::Disconnected | ConnectionState::Failed
        ) {
            return Ok(());
        }
        self.state = ConnectionState::Closing;

        self.sender.tx = None;
        self.receiver.rx.close();
        self.receiver.finished = true;

        // The handle stays in place while waiting so that a cancelled close
        // still leaves Drop something to abort.
        let Some(task) = self.task.as_mut() else {
            self.state = ConnectionState::Disconnected;
            return Ok(());
        };
        let joined = tokio::time::timeout(self.close_timeout, task).await;
        let task = self.task.take();

        match joined {
            Ok(Ok(())) => {
                debug!("Upstream transport finished");
                self.state = ConnectionState::Disconnected;
                Ok(())
            }
            Ok(Err(e)) => {
                warn!("Upstream transport ended abnormally: {}", e);
                self.state = ConnectionState::Failed;
                Ok(())
            }
            Err(_) => {
                if let Some(task) = task {
                    task.abort();
                }
                warn!(
                    timeout_ms = self.close_timeout.as_millis() as u64,
                    "Upstream transport did not finish in time, aborted"
                );
                self.state = ConnectionState::Disconnected;
                Err(RealtimeError::Timeout(
                    "upstream close did not complete".to_string(),
                ))
            }
        }
    }
}

impl Drop for UpstreamSession {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            debug!("Upstream session dropped without close, aborting transport");
            task.abort();
        }
    }
}
