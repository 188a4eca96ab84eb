//! WebSocket Mock Server for Hume EVI
//!
//! Accepts EVI connections, records everything the client sends, and plays a
//! scripted list of server frames back.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::accept_hdr_async;

/// What the mock does once its scripted frames are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MockEnd {
    /// Keep reading until the client closes.
    #[default]
    KeepOpen,
    /// Send a normal close frame.
    Close,
    /// Drop the TCP connection without a closing handshake.
    Abort,
}

/// Frames sent to every connection, in order.
#[derive(Debug, Clone, Default)]
pub struct MockHumeScript {
    pub frames: Vec<Message>,
    /// Wait for this many `audio_input` messages before sending `frames`.
    pub after_audio_inputs: usize,
    /// Pause between scripted frames.
    pub frame_delay: Option<Duration>,
    pub end: MockEnd,
}

impl MockHumeScript {
    pub fn new(frames: Vec<Message>) -> Self {
        Self {
            frames,
            ..Default::default()
        }
    }

    pub fn after_audio_inputs(mut self, count: usize) -> Self {
        self.after_audio_inputs = count;
        self
    }

    pub fn with_frame_delay(mut self, delay: Duration) -> Self {
        self.frame_delay = Some(delay);
        self
    }

    pub fn ending(mut self, end: MockEnd) -> Self {
        self.end = end;
        self
    }
}

/// Everything the mock observed.
#[derive(Debug, Default)]
pub struct MockHumeRecord {
    pub connections: usize,
    /// Query string of the last handshake request.
    pub query: Option<String>,
    /// JSON text frames received, in order.
    pub messages: Vec<Value>,
    pub close_received: bool,
    pub disconnected: bool,
}

impl MockHumeRecord {
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    pub fn messages_of_type(&self, kind: &str) -> Vec<&Value> {
        self.messages
            .iter()
            .filter(|m| m["type"] == kind)
            .collect()
    }

    /// Decoded payloads of every `audio_input` message.
    pub fn audio_inputs(&self) -> Vec<Vec<u8>> {
        self.messages_of_type("audio_input")
            .into_iter()
            .map(|m| STANDARD.decode(m["data"].as_str().unwrap_or_default()).unwrap())
            .collect()
    }
}

/// A running mock EVI endpoint.
pub struct MockHumeServer {
    pub url: String,
    pub record: Arc<Mutex<MockHumeRecord>>,
}

impl MockHumeServer {
    /// Bind on an ephemeral port and serve `script` to every connection.
    pub async fn start(script: MockHumeScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let record = Arc::new(Mutex::new(MockHumeRecord::default()));

        let shared = record.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let record = shared.clone();
                let script = script.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, script, record).await {
                        eprintln!("Mock Hume connection error: {}", e);
                    }
                });
            }
        });

        Self {
            url: format!("ws://{}/v0/evi/chat", addr),
            record,
        }
    }

    pub fn snapshot<T>(&self, f: impl FnOnce(&MockHumeRecord) -> T) -> T {
        f(&self.record.lock().unwrap())
    }
}

async fn handle_connection(
    stream: TcpStream,
    script: MockHumeScript,
    record: Arc<Mutex<MockHumeRecord>>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let handshake_record = record.clone();
    let callback = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        let mut rec = handshake_record.lock().unwrap();
        rec.connections += 1;
        rec.query = request.uri().query().map(str::to_string);
        Ok(response)
    };

    let ws_stream = accept_hdr_async(stream, callback).await?;
    let (mut write, mut read) = ws_stream.split();

    let mut audio_inputs = 0usize;
    let mut script_sent = false;

    loop {
        if !script_sent && audio_inputs >= script.after_audio_inputs {
            script_sent = true;
            for frame in &script.frames {
                if let Some(delay) = script.frame_delay {
                    tokio::time::sleep(delay).await;
                }
                write.send(frame.clone()).await?;
            }
            match script.end {
                MockEnd::KeepOpen => {}
                MockEnd::Close => {
                    write.send(Message::Close(None)).await?;
                }
                MockEnd::Abort => {
                    record.lock().unwrap().disconnected = true;
                    return Ok(());
                }
            }
        }

        let Some(msg) = read.next().await else {
            break;
        };
        match msg {
            Ok(Message::Text(text)) => {
                let value: Value = serde_json::from_str(&text)?;
                if value["type"] == "audio_input" {
                    audio_inputs += 1;
                }
                record.lock().unwrap().messages.push(value);
            }
            Ok(Message::Close(_)) => {
                record.lock().unwrap().close_received = true;
                break;
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }

    record.lock().unwrap().disconnected = true;
    Ok(())
}

// =============================================================================
// Scripted frames
// =============================================================================

pub fn chat_metadata(chat_id: &str, chat_group_id: &str) -> Message {
    text(json!({
        "type": "chat_metadata",
        "chat_id": chat_id,
        "chat_group_id": chat_group_id,
        "request_id": "req-1",
    }))
}

pub fn user_message(content: &str) -> Message {
    text(json!({
        "type": "user_message",
        "message": {"role": "user", "content": content},
        "models": {"prosody": {"scores": {"Joy": 0.5}}},
        "interim": false,
    }))
}

pub fn assistant_end() -> Message {
    text(json!({"type": "assistant_end"}))
}

/// `audio_output` carrying `payload` (usually a WAV file) as base64.
pub fn audio_output(id: &str, payload: &[u8]) -> Message {
    text(json!({
        "type": "audio_output",
        "id": id,
        "index": 0,
        "data": STANDARD.encode(payload),
    }))
}

pub fn text(value: Value) -> Message {
    Message::Text(value.to_string().into())
}
