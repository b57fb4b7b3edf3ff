//! HTTP server module.
//!
//! Serves plain HTTP on all interfaces and drains in-flight requests on
//! SIGTERM/SIGINT before exiting. TLS is left to the surrounding platform.

mod server;
mod shutdown;

pub use server::{start_server, ServerError};
