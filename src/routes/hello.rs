//! Identity endpoint reporting which version and container answered.

use axum::extract::State;

use crate::config::ServiceConfig;
use crate::state::AppState;

/// Handler for `GET /hello`.
pub async fn hello(State(state): State<AppState>) -> String {
    greeting(&state.config.service)
}

/// Format the greeting line for the given service identity.
pub fn greeting(service: &ServiceConfig) -> String {
    format!(
        "Hello version: {}, container: {}\n",
        service.identity.version(),
        service.host_identifier()
    )
}
