//! Health check endpoint for container orchestration.
//!
//! Provides a simple liveness probe that returns 200 OK when the process is running.
//! Orchestrators poll it to decide whether to keep this instance registered.

use crate::config::HEALTHY_MESSAGE;

/// Health check handler.
///
/// This is a liveness probe - it only checks that the process can respond to HTTP.
pub async fn health() -> &'static str {
    HEALTHY_MESSAGE
}
