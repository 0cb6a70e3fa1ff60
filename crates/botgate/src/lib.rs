//! # botgate
//!
//! Webhook server for bot messages, with the botgate authentication gate
//! in front of the message endpoint.
//!
//! This crate provides:
//! - Configuration loading (TOML file, then flags and environment)
//! - Logging setup
//! - The axum router: `POST /api/messages` (gated), `GET /healthz` (open)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod server;

pub use cli::Cli;
pub use config::ServerConfig;
pub use error::{Error, Result};
pub use server::{authenticator, router, serve};
