use anyhow::{bail, Result};
use base64::Engine;

/// MIME type the live endpoint expects for 16kHz mono capture frames
pub const CAPTURE_MIME_TYPE: &str = "audio/pcm;rate=16000";

/// A capture frame encoded for transport
///
/// Samples are scaled to 16-bit signed PCM, packed little-endian and
/// base64-encoded so the frame can travel inside a JSON message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    /// Base64-encoded PCM16 LE bytes
    pub data: String,
    /// MIME type declared to the endpoint (e.g. "audio/pcm;rate=16000")
    pub mime_type: String,
}

/// Decoded inbound audio, de-interleaved per channel
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// One Vec<f32> per channel, samples in [-1.0, 1.0]
    pub channels: Vec<Vec<f32>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Duration in seconds
    pub duration_secs: f64,
}

impl DecodedAudio {
    /// Samples of the first channel (mono playback path)
    pub fn mono(&self) -> &[f32] {
        self.channels.first().map(|c| c.as_slice()).unwrap_or(&[])
    }
}

/// Encode float samples into a transport-safe frame
///
/// Each sample is scaled by 32768, clamped to the i16 range and packed
/// little-endian before base64 encoding.
pub fn encode_frame(samples: &[f32]) -> EncodedFrame {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let scaled = (sample * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        bytes.extend_from_slice(&scaled.to_le_bytes());
    }

    EncodedFrame {
        data: base64::engine::general_purpose::STANDARD.encode(&bytes),
        mime_type: CAPTURE_MIME_TYPE.to_string(),
    }
}

/// Decode a base64 PCM16 LE payload into float samples per channel
///
/// The byte length must be divisible by 2 bytes per sample times the channel
/// count; anything else is a malformed payload.
pub fn decode_frame(payload: &str, sample_rate: u32, channels: u16) -> Result<DecodedAudio> {
    if channels == 0 {
        bail!("channel count must be at least 1");
    }

    let bytes = base64::engine::general_purpose::STANDARD.decode(payload)?;

    let frame_bytes = 2 * channels as usize;
    if bytes.len() % frame_bytes != 0 {
        bail!(
            "PCM payload length {} is not divisible by {} (2 bytes x {} channels)",
            bytes.len(),
            frame_bytes,
            channels
        );
    }

    let mut per_channel: Vec<Vec<f32>> =
        vec![Vec::with_capacity(bytes.len() / frame_bytes); channels as usize];

    for (i, chunk) in bytes.chunks_exact(2).enumerate() {
        let value = i16::from_le_bytes([chunk[0], chunk[1]]);
        per_channel[i % channels as usize].push(value as f32 / 32768.0);
    }

    let frames = per_channel.first().map(|c| c.len()).unwrap_or(0);
    let duration_secs = if sample_rate > 0 {
        frames as f64 / sample_rate as f64
    } else {
        0.0
    };

    Ok(DecodedAudio {
        channels: per_channel,
        sample_rate,
        duration_secs,
    })
}
