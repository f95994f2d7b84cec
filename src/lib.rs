// Public API for integration tests and potential library usage

pub mod api;
pub mod auth;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod llm;
pub mod moderation;
pub mod rate_limit;
pub mod state;
pub mod store;
pub mod types;
