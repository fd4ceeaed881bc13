pub mod routes;
pub mod ws;

use crate::state::AppState;
use axum::routing::{get, post};
use std::sync::Arc;

/// All HTTP + WS routes, plus the static front-end directory as fallback.
pub fn router(state: Arc<AppState>) -> axum::Router {
    let static_dir = state.config.static_dir.clone();

    axum::Router::new()
        .route("/api/state", get(routes::get_state))
        .route("/api/price", get(routes::get_price))
        .route("/api/curve", get(routes::get_curve))
        .route("/api/scenarios", get(routes::get_scenarios))
        .route("/api/scenarios/{key}/load", post(routes::load_scenario))
        .route("/api/parameters", post(routes::set_parameter))
        .route("/api/option-kind/toggle", post(routes::toggle_option_kind))
        .route("/api/simulation/start", post(routes::start_simulation))
        .route("/api/simulation/stop", post(routes::stop_simulation))
        .route("/api/counters", get(routes::get_counters))
        .route("/ws", get(ws::ws_handler))
        .fallback_service(
            tower_http::services::ServeDir::new(&static_dir)
                .fallback(tower_http::services::ServeFile::new(static_dir.join("index.html"))),
        )
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .with_state(state)
}
