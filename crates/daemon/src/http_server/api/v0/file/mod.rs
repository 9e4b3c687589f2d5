use axum::routing::post;
use axum::Router;

pub mod create;

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/", post(create::handler))
        .with_state(state)
}
