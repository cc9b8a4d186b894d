// weathervane-server/src/lib.rs
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod budget;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod store;
pub mod upstream;

pub use config::Config;
pub use state::AppState;

/// Build the service router over shared state. Kept separate from `main`
/// so integration tests can drive it directly.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/weather", get(routes::get_weather))
        .route("/forecast", get(routes::get_forecast))
        .route("/api/predict", get(routes::predict_one))
        .route("/api/predict/all", get(routes::predict_all))
        .route("/predict", post(routes::predict_custom))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
