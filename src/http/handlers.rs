use super::state::AppState;
use crate::codec;
use crate::playback::NullSink;
use crate::session::{SessionConfig, SessionStats, UsageCounts};
use crate::transcript::Message;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct StartSessionRequest {
    /// Optional session ID (if not provided, generate UUID)
    pub session_id: Option<String>,

    /// Optional voice selector override
    pub voice: Option<String>,

    /// Optional system-instruction override for this surface
    pub system_instruction: Option<String>,

    /// Counts of prior study artifacts, folded into the system instruction
    #[serde(default)]
    pub usage: UsageCounts,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StopSessionResponse {
    pub status: String,
    pub message: String,
    pub stats: Option<SessionStats>,
}

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SynthesizeResponse {
    /// Base64 PCM16 LE at `sample_rate`; absent when synthesis soft-failed
    pub audio: Option<String>,
    pub sample_rate: u32,
    pub duration_secs: f64,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /voice/start
/// Start the voice session; an already-active session is replaced
pub async fn start_session(
    State(state): State<AppState>,
    Json(req): Json<StartSessionRequest>,
) -> impl IntoResponse {
    let session_id = req
        .session_id
        .unwrap_or_else(|| format!("voice-{}", uuid::Uuid::new_v4()));

    info!("Starting voice session: {}", session_id);

    let mut config = SessionConfig {
        session_id: session_id.clone(),
        model: state.config.live.model.clone(),
        voice_name: req.voice.unwrap_or_else(|| state.config.live.voice.clone()),
        input_sample_rate: state.config.audio.input_sample_rate,
        output_sample_rate: state.config.audio.output_sample_rate,
        frame_samples: state.config.audio.frame_samples,
        connect_timeout: Duration::from_secs(state.config.live.connect_timeout_secs),
        ..SessionConfig::default()
    };
    if let Some(instruction) = req.system_instruction {
        config.system_instruction = instruction;
    }

    match state
        .manager
        .activate(config, req.usage, Arc::new(NullSink))
        .await
    {
        Ok(_session) => {
            info!("Voice session started successfully: {}", session_id);
            (
                StatusCode::OK,
                Json(StartSessionResponse {
                    session_id: session_id.clone(),
                    status: "active".to_string(),
                    message: format!("Voice session {} started", session_id),
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to start voice session: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to start voice session: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// POST /voice/stop
/// Stop the active voice session
pub async fn stop_session(State(state): State<AppState>) -> impl IntoResponse {
    info!("Stopping voice session");

    match state.manager.deactivate().await {
        Ok(Some(stats)) => (
            StatusCode::OK,
            Json(StopSessionResponse {
                status: "stopped".to_string(),
                message: "Voice session stopped".to_string(),
                stats: Some(stats),
            }),
        )
            .into_response(),
        Ok(None) => (
            StatusCode::OK,
            Json(StopSessionResponse {
                status: "idle".to_string(),
                message: "No active voice session".to_string(),
                stats: None,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to stop voice session: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to stop voice session: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// GET /voice/status
/// Get statistics for the active session
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    match state.manager.current().await {
        Some(session) => match session.stats().await {
            Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
            Err(e) => {
                error!("Failed to get stats: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: format!("Failed to get stats: {}", e),
                    }),
                )
                    .into_response()
            }
        },
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No active voice session".to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /voice/transcript
/// Get the conversation log accumulated so far
pub async fn get_transcript(State(state): State<AppState>) -> impl IntoResponse {
    match state.manager.current().await {
        Some(session) => {
            let messages = session.messages().await;
            (StatusCode::OK, Json(TranscriptResponse { messages })).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No active voice session".to_string(),
            }),
        )
            .into_response(),
    }
}

/// POST /speech
/// One-shot synthesis for short prompts (reminders, summaries)
///
/// Synthesis without audio is a soft failure: 200 with no audio payload.
pub async fn synthesize_speech(
    State(state): State<AppState>,
    Json(req): Json<SynthesizeRequest>,
) -> impl IntoResponse {
    match state.speech.synthesize(&req.text).await {
        Ok(audio) if audio.is_empty() => (
            StatusCode::OK,
            Json(SynthesizeResponse {
                audio: None,
                sample_rate: audio.sample_rate,
                duration_secs: 0.0,
            }),
        )
            .into_response(),
        Ok(audio) => {
            let encoded = codec::encode_frame(&audio.samples);
            (
                StatusCode::OK,
                Json(SynthesizeResponse {
                    audio: Some(encoded.data),
                    sample_rate: audio.sample_rate,
                    duration_secs: audio.duration_secs,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Speech synthesis failed: {:#}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    error: format!("Speech synthesis failed: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
