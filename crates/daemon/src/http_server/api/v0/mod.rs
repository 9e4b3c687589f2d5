use axum::Router;

pub mod file;

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .nest("/file", file::router(state.clone()))
        .with_state(state)
}
