pub mod agents;
pub mod auth;
pub mod events;
pub mod exports;
pub mod progress;
pub mod projects;
pub mod stages;
