// Public API for integration tests and potential library usage

pub mod auth;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod protocol;
pub mod quiz;
pub mod state;
pub mod store;
pub mod types;
pub mod ws;
