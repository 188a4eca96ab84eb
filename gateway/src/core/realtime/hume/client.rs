//! Hume EVI WebSocket client implementation.
//!
//! [`HumeEVI`] is a [`RealtimeConnector`]: every call to `open` dials a fresh
//! EVI chat socket and hands back an [`UpstreamSession`] backed by a spawned
//! transport task.
//!
//! # Example
//!
//! ```rust,ignore
//! use evi_relay::core::realtime::hume::{HumeEVI, HumeEVIConfig};
//! use evi_relay::core::realtime::RealtimeConnector;
//!
//! let evi = HumeEVI::new(HumeEVIConfig::new("your-api-key"))?;
//! let mut session = evi.open("your-config-id", "your-secret-key").await?;
//!
//! session.send(audio_bytes).await?;
//! while let Some(event) = session.receive().await {
//!     println!("{:?}", event?);
//! }
//! session.close().await?;
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, error, info, trace, warn};

use super::config::HumeEVIConfig;
use super::messages::{
    AudioInput, EVIClientMessage, EVIServerMessage, SessionSettings, classify_binary,
    classify_text,
};
use crate::core::realtime::base::{
    InboundEvent, RealtimeConnector, RealtimeError, RealtimeResult,
};
use crate::core::realtime::session::{SessionMetadata, UpstreamSession};

/// Audio chunks queued towards Hume before `send` suspends.
pub const AUDIO_QUEUE_CAPACITY: usize = 64;

/// Events queued towards the relay before the socket reader suspends.
pub const EVENT_QUEUE_CAPACITY: usize = 64;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWrite = SplitSink<WsStream, Message>;
type WsRead = SplitStream<WsStream>;

// =============================================================================
// HumeEVI Connector
// =============================================================================

/// Hume EVI (Empathic Voice Interface) connector.
///
/// Holds the API key and session defaults; each session adds its own config
/// ID and secret key.
#[derive(Debug, Clone)]
pub struct HumeEVI {
    config: HumeEVIConfig,
}

impl HumeEVI {
    /// Create a connector from a validated configuration.
    pub fn new(config: HumeEVIConfig) -> RealtimeResult<Self> {
        config
            .validate()
            .map_err(RealtimeError::InvalidConfiguration)?;
        Ok(Self { config })
    }

    /// Session defaults used by this connector.
    pub fn config(&self) -> &HumeEVIConfig {
        &self.config
    }

    /// Configuration for one session.
    fn session_config(&self, config_id: &str, secret_key: &str) -> RealtimeResult<HumeEVIConfig> {
        let mut config = self.config.clone();
        if !config_id.is_empty() {
            config = config.with_config_id(config_id);
        }
        if !secret_key.is_empty() {
            config = config.with_secret_key(secret_key);
        }
        config
            .validate()
            .map_err(RealtimeError::InvalidConfiguration)?;
        Ok(config)
    }
}

#[async_trait]
impl RealtimeConnector for HumeEVI {
    async fn open(&self, config_id: &str, secret_key: &str) -> RealtimeResult<UpstreamSession> {
        let config = self.session_config(config_id, secret_key)?;
        connect_session(&config).await
    }

    fn provider_name(&self) -> &'static str {
        "hume"
    }
}

// =============================================================================
// Transport
// =============================================================================

/// Dial EVI, announce the input format and start the transport task.
async fn connect_session(config: &HumeEVIConfig) -> RealtimeResult<UpstreamSession> {
    let url = config.build_websocket_url();
    debug!("Connecting to Hume EVI: {}", config.redacted_url());

    let (ws_stream, response) = match timeout(config.connection_timeout(), connect_async(url.as_str()))
        .await
    {
        Ok(Ok((stream, response))) => (stream, response),
        Ok(Err(e)) => {
            return Err(RealtimeError::ConnectionFailed(format!(
                "WebSocket connection failed: {e}"
            )));
        }
        Err(_) => {
            return Err(RealtimeError::Timeout(format!(
                "Connection to Hume EVI timed out after {}s",
                config.connection_timeout_seconds
            )));
        }
    };

    info!(
        config_id = config.config_id.as_deref().unwrap_or(""),
        evi_version = %config.evi_version,
        "Connected to Hume EVI (status: {})",
        response.status()
    );

    let (mut ws_write, ws_read) = ws_stream.split();

    if let Some(input) = config.input_audio {
        let settings = EVIClientMessage::SessionSettings(SessionSettings {
            audio: Some(input.to_settings()),
        });
        let json = settings
            .to_json()
            .map_err(|e| RealtimeError::SerializationError(e.to_string()))?;
        ws_write
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| {
                RealtimeError::ConnectionFailed(format!("Failed to send session settings: {e}"))
            })?;
        debug!(
            sample_rate = input.sample_rate,
            channels = input.channels,
            "Sent session settings"
        );
    }

    let (audio_tx, audio_rx) = mpsc::channel(AUDIO_QUEUE_CAPACITY);
    let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
    let (metadata_tx, metadata_rx) = watch::channel(SessionMetadata::default());

    let task = tokio::spawn(run_transport(
        ws_write,
        ws_read,
        audio_rx,
        event_tx,
        metadata_tx,
    ));

    Ok(UpstreamSession::from_channels(audio_tx, event_rx)
        .with_task(task)
        .with_metadata(metadata_rx))
}

/// Drive one EVI socket until either direction finishes.
///
/// The writer and reader are independent futures: a reader waiting on a full
/// event queue never holds up outgoing audio, and the reverse.
async fn run_transport(
    mut ws_write: WsWrite,
    mut ws_read: WsRead,
    mut audio_rx: mpsc::Receiver<Bytes>,
    event_tx: mpsc::Sender<RealtimeResult<InboundEvent>>,
    metadata_tx: watch::Sender<SessionMetadata>,
) {
    let writer = async {
        let mut chunks: u64 = 0;
        while let Some(chunk) = audio_rx.recv().await {
            let json = match EVIClientMessage::AudioInput(AudioInput::from_bytes(&chunk)).to_json()
            {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize audio input: {e}");
                    continue;
                }
            };
            if let Err(e) = ws_write.send(Message::Text(json.into())).await {
                error!("Failed to send audio to Hume EVI: {e}");
                let _ = event_tx
                    .send(Err(RealtimeError::WebSocketError(e.to_string())))
                    .await;
                return;
            }
            chunks += 1;
        }

        debug!(chunks, "Audio input finished, closing Hume EVI socket");
        if let Err(e) = ws_write.send(Message::Close(None)).await {
            debug!("Close frame not delivered: {e}");
        }
    };

    // Pings are answered by tungstenite itself while the stream is polled.
    let reader = async {
        while let Some(frame) = ws_read.next().await {
            let event = match frame {
                Ok(Message::Text(text)) => {
                    trace!(
                        "Received EVI message: {}",
                        text.chars().take(100).collect::<String>()
                    );
                    let event = classify_text(&text);
                    observe_event(&event, &metadata_tx);
                    event
                }
                Ok(Message::Binary(data)) => {
                    trace!("Received binary audio: {} bytes", data.len());
                    classify_binary(data)
                }
                Ok(Message::Close(frame)) => {
                    info!("Hume EVI closed the session: {:?}", frame);
                    return;
                }
                Ok(_) => continue,
                Err(e) => {
                    warn!("Hume EVI socket error: {e}");
                    let _ = event_tx
                        .send(Err(RealtimeError::WebSocketError(e.to_string())))
                        .await;
                    return;
                }
            };

            if event_tx.send(Ok(event)).await.is_err() {
                debug!("Event receiver dropped, stopping reader");
                return;
            }
        }
        debug!("Hume EVI stream ended");
    };

    tokio::select! {
        _ = writer => {}
        _ = reader => {}
    }

    debug!("Hume EVI transport finished");
}

/// Log the events worth knowing about and record chat metadata.
fn observe_event(event: &InboundEvent, metadata: &watch::Sender<SessionMetadata>) {
    let InboundEvent::Other(value) = event else {
        return;
    };

    match EVIServerMessage::from_value(value) {
        EVIServerMessage::ChatMetadata(meta) => {
            info!(
                chat_id = %meta.chat_id,
                chat_group_id = %meta.chat_group_id,
                "EVI chat started"
            );
            metadata.send_replace(SessionMetadata {
                chat_id: Some(meta.chat_id),
                chat_group_id: Some(meta.chat_group_id),
            });
        }
        EVIServerMessage::UserMessage(msg) => {
            debug!(
                interim = ?msg.interim,
                "User message ({} chars)",
                msg.message.content.len()
            );
        }
        EVIServerMessage::AssistantMessage(msg) => {
            debug!("Assistant message ({} chars)", msg.message.content.len());
        }
        EVIServerMessage::UserInterruption {} => debug!("User interruption"),
        EVIServerMessage::AssistantEnd {} => debug!("Assistant response ended"),
        EVIServerMessage::AudioOutput(output) => {
            warn!(id = ?output.id, "Undecodable audio_output, forwarding as-is");
        }
        EVIServerMessage::Error(err) => {
            error!(code = %err.code, "EVI error: {}", err.message);
        }
        EVIServerMessage::Unknown => trace!("Unrecognized EVI event"),
    }
}

// =============================================================================
// Tests
// =============================================================================
