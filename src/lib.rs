#![forbid(unsafe_code)]

//! `ota-relay` — admin server for over-the-air mobile update bundles.

pub mod auth;
pub mod config;
pub mod errors;
pub mod http;
pub mod models;
pub mod persistence;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
