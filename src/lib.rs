pub mod capture;
pub mod codec;
pub mod config;
pub mod http;
pub mod live;
pub mod playback;
pub mod session;
pub mod speech;
pub mod tools;
pub mod transcript;

pub use capture::{
    activity_level, AudioFrame, CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureFeed,
    CaptureSource, ChannelBackend,
};
pub use codec::{decode_frame, encode_frame, DecodedAudio, EncodedFrame};
pub use config::Config;
pub use http::{create_router, AppState};
pub use live::{
    LiveChannel, LiveEndpoint, SessionTransport, TransportOptions, TransportState,
    TransportUpdate, WsEndpoint,
};
pub use playback::{AudioSink, ChannelSink, MonotonicClock, NullSink, OutputClock, PlaybackScheduler};
pub use session::{SessionConfig, SessionManager, SessionStats, UsageCounts, VoiceSession};
pub use speech::{SpeechAudio, SpeechClient, SpeechSettings};
pub use tools::{NavIntent, StudyToolRouter, ToolDeclaration, ToolHandler};
pub use transcript::{Message, Role, TranscriptAssembler, TranscriptEvent};
