//! Integration tests for the Hume EVI connector
//!
//! These tests run the connector against a local mock EVI server and verify:
//! - Handshake query parameters
//! - `session_settings` and `audio_input` messages
//! - Classification of server events
//! - Session metadata and close behavior

mod fixtures;
mod mock_providers;

use bytes::Bytes;
use std::time::Duration;
use tokio::time::timeout;

use evi_relay::core::realtime::{
    ConnectionState, EVIVersion, HumeEVI, HumeEVIConfig, InboundEvent, RealtimeConnector,
    RealtimeError, UpstreamSession,
};
use fixtures::*;
use mock_providers::hume_mock::{
    MockEnd, MockHumeScript, MockHumeServer, assistant_end, audio_output, chat_metadata, text,
    user_message,
};
use mock_providers::wait_until;
use tokio_tungstenite::tungstenite::Message;

const WAIT: Duration = Duration::from_secs(5);

fn connector(server: &MockHumeServer) -> HumeEVI {
    HumeEVI::new(
        HumeEVIConfig::new("test-api-key")
            .with_websocket_url(server.url.clone())
            .with_connection_timeout(5),
    )
    .unwrap()
}

async fn next_event(session: &mut UpstreamSession) -> InboundEvent {
    timeout(WAIT, session.receive())
        .await
        .expect("timed out waiting for event")
        .expect("session ended early")
        .expect("transport error")
}

#[tokio::test]
async fn test_handshake_query_parameters() {
    let server = MockHumeServer::start(MockHumeScript::default()).await;
    let evi = HumeEVI::new(
        HumeEVIConfig::new("test-api-key")
            .with_websocket_url(server.url.clone())
            .with_version(EVIVersion::V4Mini)
            .with_verbose_transcription(),
    )
    .unwrap();

    let mut session = evi.open("cfg-123", "secret&key").await.unwrap();
    assert_eq!(session.state(), ConnectionState::Connected);

    assert!(wait_until(WAIT, || server.snapshot(|r| r.connections == 1)).await);
    server.snapshot(|r| {
        assert_eq!(r.query_param("api_key").as_deref(), Some("test-api-key"));
        assert_eq!(r.query_param("config_id").as_deref(), Some("cfg-123"));
        // Reserved characters survive encoding
        assert_eq!(r.query_param("secret_key").as_deref(), Some("secret&key"));
        assert_eq!(r.query_param("evi_version").as_deref(), Some("4-mini"));
        assert_eq!(r.query_param("verbose_transcription").as_deref(), Some("true"));
    });

    session.close().await.unwrap();
}

#[tokio::test]
async fn test_session_settings_sent_before_audio() {
    let server = MockHumeServer::start(MockHumeScript::default()).await;
    let evi = HumeEVI::new(
        HumeEVIConfig::new("test-api-key")
            .with_websocket_url(server.url.clone())
            .with_input_audio(INPUT_SAMPLE_RATE, 1),
    )
    .unwrap();

    let mut session = evi.open("cfg", "secret").await.unwrap();
    let pcm = generate_sine_bytes(FRAME_20MS, INPUT_SAMPLE_RATE, 440.0);
    session.send(Bytes::from(pcm.clone())).await.unwrap();

    assert!(wait_until(WAIT, || server.snapshot(|r| r.messages.len() == 2)).await);
    server.snapshot(|r| {
        let settings = &r.messages[0];
        assert_eq!(settings["type"], "session_settings");
        assert_eq!(settings["audio"]["encoding"], "linear16");
        assert_eq!(settings["audio"]["sample_rate"], 16000);
        assert_eq!(settings["audio"]["channels"], 1);

        assert_eq!(r.messages[1]["type"], "audio_input");
        assert_eq!(r.audio_inputs(), vec![pcm.clone()]);
    });

    session.close().await.unwrap();
}

#[tokio::test]
async fn test_no_session_settings_without_input_layout() {
    let server = MockHumeServer::start(MockHumeScript::default()).await;
    let mut session = connector(&server).open("cfg", "secret").await.unwrap();

    session.send(Bytes::from_static(&[1, 0, 2, 0])).await.unwrap();

    assert!(wait_until(WAIT, || server.snapshot(|r| !r.messages.is_empty())).await);
    server.snapshot(|r| {
        assert!(r.messages_of_type("session_settings").is_empty());
        assert_eq!(r.audio_inputs(), vec![vec![1, 0, 2, 0]]);
    });

    session.close().await.unwrap();
}

#[tokio::test]
async fn test_audio_chunks_forwarded_in_order() {
    let server = MockHumeServer::start(MockHumeScript::default()).await;
    let mut session = connector(&server).open("cfg", "secret").await.unwrap();

    let chunks: Vec<Vec<u8>> = (0..5u8).map(|i| vec![i; 64]).collect();
    for chunk in &chunks {
        session.send(Bytes::from(chunk.clone())).await.unwrap();
    }

    assert!(wait_until(WAIT, || server.snapshot(|r| r.audio_inputs().len() == 5)).await);
    assert_eq!(server.snapshot(|r| r.audio_inputs()), chunks);

    session.close().await.unwrap();
}

#[tokio::test]
async fn test_server_events_are_classified() {
    let samples = generate_sine_wave(480, OUTPUT_SAMPLE_RATE, 220.0, 0.5);
    let wav = encode_wav(&samples, OUTPUT_SAMPLE_RATE, 1);

    let server = MockHumeServer::start(MockHumeScript::new(vec![
        chat_metadata("chat-1", "group-1"),
        user_message("hello there"),
        audio_output("clip-1", &wav),
        Message::Binary(Bytes::from_static(&[9, 0, 8, 0])),
        Message::Text("not json".into()),
        text(serde_json::json!({"type": "audio_output", "data": "%%% not base64 %%%"})),
        assistant_end(),
    ]))
    .await;
    let mut session = connector(&server).open("cfg", "secret").await.unwrap();

    match next_event(&mut session).await {
        InboundEvent::Other(value) => assert_eq!(value["type"], "chat_metadata"),
        other => panic!("expected chat_metadata, got {other:?}"),
    }

    match next_event(&mut session).await {
        InboundEvent::Other(value) => {
            assert_eq!(value["message"]["content"], "hello there");
            // Unknown fields are kept
            assert_eq!(value["models"]["prosody"]["scores"]["Joy"], 0.5);
        }
        other => panic!("expected user_message, got {other:?}"),
    }

    match next_event(&mut session).await {
        InboundEvent::AudioOutput(chunk) => {
            assert_eq!(chunk.id.as_deref(), Some("clip-1"));
            let format = chunk.format.unwrap();
            assert_eq!(format.sample_rate, OUTPUT_SAMPLE_RATE);
            assert_eq!(format.sample_width, 2);
            assert_eq!(format.channels, 1);
            assert_eq!(bytes_to_samples(&chunk.pcm), samples);
        }
        other => panic!("expected audio_output, got {other:?}"),
    }

    match next_event(&mut session).await {
        InboundEvent::AudioOutput(chunk) => {
            assert_eq!(&chunk.pcm[..], &[9, 0, 8, 0]);
            assert!(chunk.format.is_none());
        }
        other => panic!("expected binary audio, got {other:?}"),
    }

    match next_event(&mut session).await {
        InboundEvent::Other(value) => assert_eq!(value, "not json"),
        other => panic!("expected string passthrough, got {other:?}"),
    }

    match next_event(&mut session).await {
        InboundEvent::InvalidAudio { id, reason } => {
            assert!(id.is_none());
            assert!(reason.contains("base64"));
        }
        other => panic!("expected undecodable audio, got {other:?}"),
    }

    assert_eq!(next_event(&mut session).await.event_type(), Some("assistant_end"));

    let metadata = session.metadata();
    assert_eq!(metadata.chat_id.as_deref(), Some("chat-1"));
    assert_eq!(metadata.chat_group_id.as_deref(), Some("group-1"));

    session.close().await.unwrap();
}

#[tokio::test]
async fn test_close_sends_close_frame() {
    let server = MockHumeServer::start(MockHumeScript::default()).await;
    let mut session = connector(&server).open("cfg", "secret").await.unwrap();

    session.close().await.unwrap();
    assert_eq!(session.state(), ConnectionState::Disconnected);
    assert!(wait_until(WAIT, || server.snapshot(|r| r.close_received)).await);

    // Idempotent
    session.close().await.unwrap();
    assert!(session.receive().await.is_none());
    assert!(matches!(
        session.send(Bytes::from_static(&[0, 0])).await,
        Err(RealtimeError::NotConnected)
    ));
}

#[tokio::test]
async fn test_server_close_ends_event_stream() {
    let server =
        MockHumeServer::start(MockHumeScript::new(vec![assistant_end()]).ending(MockEnd::Close))
            .await;
    let mut session = connector(&server).open("cfg", "secret").await.unwrap();

    assert_eq!(next_event(&mut session).await.event_type(), Some("assistant_end"));
    let end = timeout(WAIT, session.receive()).await.unwrap();
    assert!(end.is_none());

    session.close().await.unwrap();
}

#[tokio::test]
async fn test_server_abort_surfaces_error() {
    let server = MockHumeServer::start(MockHumeScript::default().ending(MockEnd::Abort)).await;
    let mut session = connector(&server).open("cfg", "secret").await.unwrap();

    let end = timeout(WAIT, session.receive()).await.unwrap();
    assert!(matches!(end, Some(Err(RealtimeError::WebSocketError(_)))));
    // Nothing after the error
    assert!(session.receive().await.is_none());

    session.close().await.unwrap();
}

#[tokio::test]
async fn test_connection_refused() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let evi = HumeEVI::new(
        HumeEVIConfig::new("test-api-key").with_websocket_url(format!("ws://{addr}/v0/evi/chat")),
    )
    .unwrap();

    let result = evi.open("cfg", "secret").await;
    assert!(matches!(result, Err(RealtimeError::ConnectionFailed(_))));
}
