pub mod registry;
pub mod sink;

pub use registry::StreamRegistry;
pub use sink::BroadcastProgressSink;
