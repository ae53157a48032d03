//! # WebSocket Audio Relay
//!
//! Handles the `/ws/transcribe` endpoint: a persistent duplex connection that
//! receives raw PCM audio (mono, 16-bit little-endian, 16 kHz) as binary
//! frames and emits transcript chunks as JSON text frames
//! `{"text": string, "isFinal": boolean}`.
//!
//! ## Relay loop:
//! 1. On connect, the connection gets its own empty [`AudioBuffer`].
//! 2. Every binary frame appends to the buffer.
//! 3. Once the buffer exceeds the flush threshold (~2 s of audio), the bytes
//!    are taken, wrapped in a WAV container, and sent to the transcription
//!    API on a spawned task so the actor keeps servicing frames and other
//!    connections keep making progress.
//! 4. Non-empty transcripts come back as `isFinal: false` chunks; empty
//!    results and provider errors are logged and dropped.
//!
//! At most one flush is in flight per connection, which keeps chunk emission
//! in flush order. Connections are fully independent: each actor owns its
//! buffer and nothing is shared between them.

use crate::ai::{wav, ProviderClient};
use crate::config::AudioConfig;
use crate::state::AppState;

use actix::prelude::*;
use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use actix_web_actors::ws;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audio::AudioBuffer;

/// Terminal chunk sent when the process has no transcription provider.
const MISSING_KEY_TEXT: &str = "Error: Server missing API Key.";

/// One unit of transcribed text returned to the client.
///
/// `isFinal` is `false` for every successful transcript; the only `true`
/// chunk this server ever sends is the missing-API-key error on connect.
/// No finalization protocol exists beyond that.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptChunk {
    pub text: String,
    #[serde(rename = "isFinal")]
    pub is_final: bool,
}

impl TranscriptChunk {
    pub fn partial(text: String) -> Self {
        Self { text, is_final: false }
    }

    pub fn terminal_error(text: &str) -> Self {
        Self {
            text: text.to_string(),
            is_final: true,
        }
    }
}

/// WebSocket actor for one audio relay connection.
///
/// Each connection is an independent actor owning its own buffer; the actor
/// mailbox serializes frame handling and flush completions, so no locking is
/// needed anywhere in the relay path.
pub struct TranscribeSocket {
    /// Connection id, for log correlation only.
    conn_id: Uuid,

    /// Connection-scoped audio accumulation buffer.
    buffer: AudioBuffer,

    /// Transcription client; `None` means the connection is refused on open.
    ai: Option<Arc<ProviderClient>>,

    /// Audio format used for the WAV wrapper.
    audio: AudioConfig,

    /// Shared state, used for the connection gauge.
    state: web::Data<AppState>,

    /// Whether a transcription call is currently in flight.
    flush_in_flight: bool,
}

impl TranscribeSocket {
    pub fn new(state: web::Data<AppState>) -> Self {
        let audio = state.config.audio.clone();
        Self {
            conn_id: Uuid::new_v4(),
            buffer: AudioBuffer::new(audio.flush_threshold_bytes),
            ai: state.ai.clone(),
            audio,
            state,
            flush_in_flight: false,
        }
    }

    /// Claim the buffered audio for a flush, if one is due.
    ///
    /// Returns `None` while a flush is already in flight or the buffer has
    /// not crossed the threshold. On dispatch the buffer is taken (and
    /// thereby reset) before the outcome of the transcription call is known;
    /// frames arriving during the flight accumulate in the fresh buffer and
    /// wait for [`finish_flush`](Self::finish_flush) to re-arm the gate.
    fn begin_flush(&mut self) -> Option<Vec<u8>> {
        if self.flush_in_flight || !self.buffer.should_flush() {
            return None;
        }
        self.flush_in_flight = true;
        Some(self.buffer.take())
    }

    /// Re-arm the flush gate once the in-flight call has finished.
    fn finish_flush(&mut self) {
        self.flush_in_flight = false;
    }

    /// Dispatch a transcription call for the buffered audio when one is due.
    fn maybe_flush(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        let ai = match &self.ai {
            Some(ai) => ai.clone(),
            None => return, // unreachable once started() has refused the connection
        };

        let pcm = match self.begin_flush() {
            Some(pcm) => pcm,
            None => return,
        };

        let conn_id = self.conn_id;
        let audio = self.audio.clone();
        let addr = ctx.address();

        debug!(%conn_id, bytes = pcm.len(), "Dispatching flush");

        tokio::spawn(async move {
            match flush(&ai, &audio, pcm).await {
                Ok(Some(text)) => addr.do_send(SendChunk(TranscriptChunk::partial(text))),
                Ok(None) => debug!(%conn_id, "Flush produced empty transcript, dropping"),
                Err(err) => warn!(%conn_id, error = %err, "Transcription failed, dropping segment"),
            }
            // Result delivery is best-effort: if the connection already
            // closed, the actor address is dead and do_send is a no-op.
            addr.do_send(FlushComplete);
        });
    }
}

/// Wrap one buffered PCM run in a WAV container and transcribe it.
///
/// Returns `Ok(None)` for an empty transcript so the caller can tell
/// "nothing to send" apart from a failure.
async fn flush(
    ai: &ProviderClient,
    audio: &AudioConfig,
    pcm: Vec<u8>,
) -> anyhow::Result<Option<String>> {
    let payload = wav::wrap_pcm(&pcm, audio)?;
    let text = ai.transcribe(payload).await?;
    if text.is_empty() {
        Ok(None)
    } else {
        Ok(Some(text))
    }
}

/// Actor message carrying a chunk to emit on the socket.
#[derive(Message)]
#[rtype(result = "()")]
struct SendChunk(TranscriptChunk);

/// Actor message marking the in-flight flush as finished.
#[derive(Message)]
#[rtype(result = "()")]
struct FlushComplete;

impl Actor for TranscribeSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.state.increment_active_connections();
        info!(conn_id = %self.conn_id, "WebSocket connection opened");

        // No provider means no relay: send one terminal error chunk and
        // close before accepting any audio.
        if self.ai.is_none() {
            if let Ok(json) = serde_json::to_string(&TranscriptChunk::terminal_error(MISSING_KEY_TEXT)) {
                ctx.text(json);
            }
            warn!(conn_id = %self.conn_id, "Refusing connection: no API key configured");
            ctx.close(Some(ws::CloseReason {
                code: ws::CloseCode::Normal,
                description: None,
            }));
            ctx.stop();
        }
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        // Buffer contents are discarded with the actor; a partially-filled
        // buffer is never flushed on close.
        self.state.decrement_active_connections();
        info!(
            conn_id = %self.conn_id,
            discarded_bytes = self.buffer.len(),
            "WebSocket connection closed"
        );
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for TranscribeSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Binary(data)) => {
                self.buffer.append(&data);
                self.maybe_flush(ctx);
            }
            Ok(ws::Message::Text(_)) => {
                // The client protocol is binary-only inbound.
                warn!(conn_id = %self.conn_id, "Ignoring unexpected text frame");
            }
            Ok(ws::Message::Ping(data)) => {
                ctx.pong(&data);
            }
            Ok(ws::Message::Pong(_)) => {}
            Ok(ws::Message::Close(reason)) => {
                debug!(conn_id = %self.conn_id, ?reason, "Client closed connection");
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) => {
                warn!(conn_id = %self.conn_id, "Ignoring unexpected continuation frame");
            }
            Ok(ws::Message::Nop) => {}
            Err(err) => {
                warn!(conn_id = %self.conn_id, error = %err, "WebSocket protocol error");
                ctx.stop();
            }
        }
    }
}

impl Handler<SendChunk> for TranscribeSocket {
    type Result = ();

    fn handle(&mut self, msg: SendChunk, ctx: &mut Self::Context) {
        if let Ok(json) = serde_json::to_string(&msg.0) {
            ctx.text(json);
        }
    }
}

impl Handler<FlushComplete> for TranscribeSocket {
    type Result = ();

    fn handle(&mut self, _msg: FlushComplete, ctx: &mut Self::Context) {
        self.finish_flush();
        // Frames that arrived during the flight may already warrant the next flush.
        self.maybe_flush(ctx);
    }
}

/// HTTP handler that upgrades `/ws/transcribe` requests to a relay connection.
pub async fn transcribe_websocket(
    req: HttpRequest,
    stream: web::Payload,
    app_state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    info!(
        peer = ?req.connection_info().peer_addr(),
        "New WebSocket connection request"
    );

    ws::start(TranscribeSocket::new(app_state), &req, stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use futures_util::{SinkExt, StreamExt};

    fn relay_socket() -> TranscribeSocket {
        TranscribeSocket::new(web::Data::new(AppState::new(AppConfig::default()).unwrap()))
    }

    #[test]
    fn test_flush_waits_for_threshold() {
        let mut socket = relay_socket();
        socket.buffer.append(&vec![0u8; 64_000]);
        assert!(socket.begin_flush().is_none());
    }

    #[test]
    fn test_one_flush_in_flight_at_a_time() {
        let mut socket = relay_socket();
        socket.buffer.append(&vec![0u8; 64_002]);

        let first = socket.begin_flush().expect("buffer crossed the threshold");
        assert_eq!(first.len(), 64_002);
        assert!(socket.buffer.is_empty());

        // Audio arriving during the flight accumulates but must not dispatch.
        socket.buffer.append(&vec![0u8; 70_000]);
        assert!(socket.begin_flush().is_none());

        // Completion re-arms the gate and the backlog goes out next.
        socket.finish_flush();
        let second = socket.begin_flush().expect("backlog crossed the threshold");
        assert_eq!(second.len(), 70_000);
    }

    #[actix_web::test]
    async fn test_missing_key_sends_one_terminal_chunk_then_closes() {
        let state = web::Data::new(AppState::new(AppConfig::default()).unwrap());
        let mut srv = actix_test::start(move || {
            actix_web::App::new()
                .app_data(state.clone())
                .route("/ws/transcribe", web::get().to(transcribe_websocket))
        });

        let mut conn = srv.ws_at("/ws/transcribe").await.unwrap();

        let chunk = match conn.next().await.unwrap().unwrap() {
            awc::ws::Frame::Text(bytes) => {
                serde_json::from_slice::<TranscriptChunk>(&bytes).unwrap()
            }
            other => panic!("expected a text frame, got {:?}", other),
        };
        assert_eq!(chunk, TranscriptChunk::terminal_error(MISSING_KEY_TEXT));

        match conn.next().await.unwrap().unwrap() {
            awc::ws::Frame::Close(_) => {}
            other => panic!("expected the connection to close, got {:?}", other),
        }
    }

    #[actix_web::test]
    async fn test_binary_frames_flush_into_partial_chunks() {
        // Stand-in transcription API speaking the provider wire format.
        let provider = actix_test::start(|| {
            actix_web::App::new().route(
                "/v1/audio/transcriptions",
                web::post().to(|| async {
                    HttpResponse::Ok().json(serde_json::json!({ "text": "the cat sat" }))
                }),
            )
        });

        let mut config = AppConfig::default();
        config.provider.api_key = "sk-test-1234".to_string();
        config.provider.base_url = provider.url("/v1");

        let state = web::Data::new(AppState::new(config).unwrap());
        let mut srv = actix_test::start(move || {
            actix_web::App::new()
                .app_data(state.clone())
                .route("/ws/transcribe", web::get().to(transcribe_websocket))
        });

        let mut conn = srv.ws_at("/ws/transcribe").await.unwrap();

        // Enough PCM to cross the 64,000-byte threshold in one frame.
        let pcm = web::Bytes::from(vec![0u8; 64_002]);
        conn.send(awc::ws::Message::Binary(pcm)).await.unwrap();

        let chunk = match conn.next().await.unwrap().unwrap() {
            awc::ws::Frame::Text(bytes) => {
                serde_json::from_slice::<TranscriptChunk>(&bytes).unwrap()
            }
            other => panic!("expected a text frame, got {:?}", other),
        };
        assert_eq!(chunk, TranscriptChunk::partial("the cat sat".to_string()));
    }

    #[test]
    fn test_partial_chunk_serialization() {
        let chunk = TranscriptChunk::partial("the cat sat".to_string());
        let json = serde_json::to_string(&chunk).unwrap();
        assert!(json.contains(r#""text":"the cat sat""#));
        assert!(json.contains(r#""isFinal":false"#));
    }

    #[test]
    fn test_terminal_error_chunk() {
        let chunk = TranscriptChunk::terminal_error(MISSING_KEY_TEXT);
        assert!(chunk.is_final);
        assert_eq!(chunk.text, "Error: Server missing API Key.");

        let json = serde_json::to_string(&chunk).unwrap();
        assert!(json.contains(r#""isFinal":true"#));
    }

    #[test]
    fn test_chunk_round_trip_uses_camel_case_key() {
        let json = r#"{"text": "hello", "isFinal": false}"#;
        let chunk: TranscriptChunk = serde_json::from_str(json).unwrap();
        assert_eq!(chunk, TranscriptChunk::partial("hello".to_string()));
    }
}
