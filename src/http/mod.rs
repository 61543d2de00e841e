//! HTTP control plane for the voice session
//!
//! This module provides the REST API a UI surface drives the pipeline with:
//! - POST /voice/start - Start (or replace) the voice session
//! - POST /voice/stop - Stop the active session
//! - GET /voice/status - Query session statistics
//! - GET /voice/transcript - Get the conversation log
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
