use crate::codec;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Settings for the text-to-speech endpoint
#[derive(Debug, Clone)]
pub struct SpeechSettings {
    /// Endpoint base URL
    pub endpoint: String,
    /// Model identifier
    pub model: String,
    /// Voice selector
    pub voice_name: String,
    /// Input character cap; longer text is truncated with an ellipsis
    pub max_chars: usize,
    /// Sample rate of returned PCM audio (24kHz mono)
    pub sample_rate: u32,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "models/gemini-2.5-flash-preview-tts".to_string(),
            voice_name: "Puck".to_string(),
            max_chars: 500,
            sample_rate: 24000,
        }
    }
}

/// Synthesized audio; empty when the endpoint returned none
#[derive(Debug, Clone)]
pub struct SpeechAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub duration_secs: f64,
}

impl SpeechAudio {
    fn empty(sample_rate: u32) -> Self {
        Self {
            samples: Vec::new(),
            sample_rate,
            duration_secs: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechRequest {
    model: String,
    input: SpeechInput,
    voice: SpeechVoice,
}

#[derive(Debug, Serialize)]
struct SpeechInput {
    text: String,
}

#[derive(Debug, Serialize)]
struct SpeechVoice {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpeechResponse {
    /// Base64-encoded PCM16 LE, absent on soft failure
    audio_content: Option<String>,
}

/// Client for the remote text-to-speech endpoint
pub struct SpeechClient {
    http: reqwest::Client,
    settings: SpeechSettings,
    api_key: String,
}

impl SpeechClient {
    pub fn new(settings: SpeechSettings, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
            api_key: api_key.into(),
        }
    }

    /// Synthesize speech for the given text
    ///
    /// A response without audio is a soft failure: the result is empty and
    /// zero-duration, never an error.
    pub async fn synthesize(&self, text: &str) -> Result<SpeechAudio> {
        let input = truncate_input(text, self.settings.max_chars);

        let url = format!("{}/{}:synthesize", self.settings.endpoint, self.settings.model);
        let request = SpeechRequest {
            model: self.settings.model.clone(),
            input: SpeechInput { text: input },
            voice: SpeechVoice {
                name: self.settings.voice_name.clone(),
            },
        };

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .context("Speech request failed")?
            .error_for_status()
            .context("Speech endpoint rejected the request")?;

        let payload: SpeechResponse = response
            .json()
            .await
            .context("Failed to parse speech response")?;

        let Some(audio) = payload.audio_content else {
            warn!("Speech endpoint returned no audio");
            return Ok(SpeechAudio::empty(self.settings.sample_rate));
        };

        match codec::decode_frame(&audio, self.settings.sample_rate, 1) {
            Ok(decoded) => {
                info!("Synthesized {:.2}s of speech", decoded.duration_secs);
                Ok(SpeechAudio {
                    samples: decoded.mono().to_vec(),
                    sample_rate: decoded.sample_rate,
                    duration_secs: decoded.duration_secs,
                })
            }
            Err(e) => {
                warn!("Speech endpoint returned malformed audio: {:#}", e);
                Ok(SpeechAudio::empty(self.settings.sample_rate))
            }
        }
    }
}

/// Cap input length at a character boundary, appending an ellipsis
pub fn truncate_input(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push('…');
    truncated
}
