pub mod backend;

pub use backend::{
    activity_level, AudioFrame, CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureFeed,
    CaptureSource, ChannelBackend,
};
