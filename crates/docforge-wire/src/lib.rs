pub mod agents;
pub mod auth;
pub mod events;
pub mod export;
pub mod progress;
pub mod projects;
pub mod stage;

pub use events::{StreamEvent, StreamEventPayload};
