//! Campus ledger server library.
//!
//! Provides the HTTP API, configuration loading, and shutdown handling.

#![deny(unsafe_code)]

pub mod api;
pub mod config;
pub mod error;
pub mod shutdown;

pub use api::{AppState, build_router};
pub use error::ApiError;
