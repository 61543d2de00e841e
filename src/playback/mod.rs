pub mod clock;
pub mod scheduler;
pub mod sink;

pub use clock::{MonotonicClock, OutputClock};
pub use scheduler::PlaybackScheduler;
pub use sink::{AudioSink, ChannelSink, NullSink};
