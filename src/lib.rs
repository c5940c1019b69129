//! fcm-relay-service Library Crate

// Declare modules as public to be accessible from the binary crate and integration tests
pub mod config;
pub mod error;
pub mod fcm_sender;
pub mod google_auth;
pub mod handlers;
pub mod models;
pub mod state;
pub mod tenant;
