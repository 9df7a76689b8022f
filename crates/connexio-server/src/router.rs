use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::config::ServerConfig;
use crate::handler::{self, SharedStore};

/// Build the axum router with all Connexio endpoints.
pub fn build_router(store: SharedStore, config: &ServerConfig) -> Router {
    Router::new()
        .route(endpoints::HEALTH, get(handler::health_handler))
        .route(
            endpoints::CURRENT,
            get(handler::get_current_handler)
                .post(handler::set_current_handler)
                .delete(handler::clear_current_handler),
        )
        .route(endpoints::UPLOAD, post(handler::upload_handler))
        .route(endpoints::FILE, get(handler::download_handler))
        .route(
            endpoints::SLOTS,
            get(handler::list_slots_handler).post(handler::create_slot_handler),
        )
        .route(endpoints::SLOT, delete(handler::delete_slot_handler))
        .route(endpoints::SLOT_LOAD, post(handler::load_slot_handler))
        .layer(DefaultBodyLimit::max(config.max_upload_size))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

/// Browsers on any origin may call the API.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}
