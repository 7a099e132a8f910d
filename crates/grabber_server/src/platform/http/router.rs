use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;

use super::constants::{
    ROUTE_DOWNLOAD, ROUTE_PROCESS, ROUTE_QUEUE, ROUTE_QUEUE_CLEAR, ROUTE_SOCKET, ROUTE_STATUS,
};
use super::{handlers, origin, ws, AppState};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(ROUTE_STATUS, get(handlers::api_status))
        .route(ROUTE_PROCESS, post(handlers::process_link))
        .route(ROUTE_DOWNLOAD, get(handlers::download_file))
        .route(
            ROUTE_QUEUE,
            get(handlers::queue_view).post(handlers::queue_submit),
        )
        .route(ROUTE_QUEUE_CLEAR, post(handlers::queue_clear))
        .route(ROUTE_SOCKET, get(ws::progress_socket))
        .layer(from_fn_with_state(state.clone(), origin::origin_guard))
        .with_state(state)
}
