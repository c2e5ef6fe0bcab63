pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod state;

pub use state::ApiState;

use axum::{Router, middleware as axum_middleware, routing::post};

/// Mount point shared with existing clients of the product endpoints.
pub const API_PREFIX: &str = "/sync-product-from-amazon/v1";

pub fn build_api_router(state: &ApiState) -> Router<ApiState> {
    let guarded = Router::new()
        .route("/import-product", post(handlers::import_product))
        .route("/clear-cache", post(handlers::clear_cache))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_admin_token,
        ));

    Router::new()
        .route("/fetch-product", post(handlers::fetch_product))
        .merge(guarded)
}
