//! Helloworld: a sample service for orchestration demos.
//!
//! Exposes `/hello`, which reports the service version and container that
//! answered, and `/health`, a liveness probe. Instances are registered and
//! deregistered by an external platform based on the health endpoint.

pub mod config;
pub mod http;
pub mod middleware;
pub mod routes;
pub mod state;
