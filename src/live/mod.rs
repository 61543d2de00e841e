pub mod endpoint;
pub mod events;
pub mod transport;
pub mod ws;

pub use endpoint::{LiveChannel, LiveEndpoint};
pub use events::{
    Blob, ClientEvent, Content, FunctionCall, FunctionResponse, GenerationConfig, Part,
    RealtimeInput, ServerContent, ServerEvent, SetupComplete, SetupRequest, ToolCall, ToolList,
    ToolResponse, Transcription, TranscriptionConfig,
};
pub use transport::{SessionTransport, TransportOptions, TransportState, TransportUpdate};
pub use ws::WsEndpoint;
