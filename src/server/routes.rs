use crate::engine;
use crate::errors::EngineError;
use crate::scenarios::{self, Scenario};
use crate::state::{AppState, EngineEvent, EngineSnapshot, ParameterField, SimulationState};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use std::sync::Arc;

#[derive(serde::Deserialize)]
pub struct SetParameterBody {
    pub field: ParameterField,
    pub value: f64,
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = match &self {
            EngineError::InvalidParameter(_) | EngineError::Pricing(_) | EngineError::Parse(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            EngineError::UnknownScenario(_) => StatusCode::NOT_FOUND,
            EngineError::ChannelClosed(_) => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::Config(_) | EngineError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// GET /api/state -- current engine snapshot (from watch channel, no lock)
pub async fn get_state(State(state): State<Arc<AppState>>) -> Json<EngineSnapshot> {
    let snapshot = state.snapshot_rx.borrow().clone();
    Json(snapshot)
}

/// GET /api/price -- null until the first successful pricing
pub async fn get_price(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let snapshot = state.snapshot_rx.borrow().clone();
    Json(serde_json::json!({
        "price": snapshot.price,
        "option_kind": snapshot.parameters.option_kind,
        "underlying_price": snapshot.parameters.underlying_price,
        "error": snapshot.last_error,
    }))
}

/// GET /api/curve
pub async fn get_curve(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let snapshot = state.snapshot_rx.borrow().clone();
    Json(serde_json::json!({
        "option_kind": snapshot.parameters.option_kind,
        "points": snapshot.curve,
    }))
}

/// GET /api/scenarios -- the preset catalogue
pub async fn get_scenarios() -> Json<&'static [Scenario]> {
    Json(scenarios::all())
}

/// POST /api/scenarios/{key}/load -- key is the id or the slug
pub async fn load_scenario(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<EngineSnapshot>, EngineError> {
    let snapshot = engine::request(&state.engine_tx, |reply| EngineEvent::LoadScenario { key, reply }).await?;
    Ok(Json(snapshot))
}

/// POST /api/parameters -- { "field": "volatility", "value": 0.3 }
pub async fn set_parameter(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetParameterBody>,
) -> Result<Json<EngineSnapshot>, EngineError> {
    let snapshot = engine::request(&state.engine_tx, |reply| EngineEvent::SetParameter {
        field: body.field,
        value: body.value,
        reply,
    })
    .await?;
    Ok(Json(snapshot))
}

/// POST /api/option-kind/toggle
pub async fn toggle_option_kind(
    State(state): State<Arc<AppState>>,
) -> Result<Json<EngineSnapshot>, EngineError> {
    let snapshot = engine::request(&state.engine_tx, |reply| EngineEvent::ToggleOptionKind { reply }).await?;
    Ok(Json(snapshot))
}

/// POST /api/simulation/start
pub async fn start_simulation(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, EngineError> {
    let sim = engine::request(&state.engine_tx, |reply| EngineEvent::StartSimulation { reply }).await?;
    Ok(simulation_body(sim))
}

/// POST /api/simulation/stop
pub async fn stop_simulation(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, EngineError> {
    let sim = engine::request(&state.engine_tx, |reply| EngineEvent::StopSimulation { reply }).await?;
    Ok(simulation_body(sim))
}

fn simulation_body(sim: SimulationState) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "simulation": sim }))
}

/// GET /api/counters -- performance counters (lock-free reads)
pub async fn get_counters(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    use portable_atomic::Ordering::Relaxed;
    Json(serde_json::json!({
        "events_processed": state.counters.events_processed.load(Relaxed),
        "ticks_applied": state.counters.ticks_applied.load(Relaxed),
        "ticks_discarded": state.counters.ticks_discarded.load(Relaxed),
        "pricing_errors": state.counters.pricing_errors.load(Relaxed),
        "ws_messages_sent": state.counters.ws_messages_sent.load(Relaxed),
    }))
}

#[cfg(test)]
mod tests {
    use crate::config::AppConfig;
    use crate::engine::run_engine;
    use crate::server::router;
    use crate::state::AppState;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    fn app() -> axum::Router {
        let (tx, rx) = mpsc::channel(64);
        let state = AppState::new(AppConfig::default(), tx);
        let engine_state = state.clone();
        tokio::spawn(async move { run_engine(engine_state, rx).await });
        router(state)
    }

    async fn call(app: &axum::Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
    }

    #[tokio::test]
    async fn test_scenarios_listed_in_order() {
        let app = app();
        let (status, body) = call(&app, "GET", "/api/scenarios", None).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<_> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["Call Purchase", "Put Protection", "Volatility Impact"]);
    }

    #[tokio::test]
    async fn test_set_parameter_reprices() {
        let app = app();
        let (status, body) = call(
            &app,
            "POST",
            "/api/parameters",
            Some(r#"{"field":"underlying_price","value":148.0}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["parameters"]["underlying_price"], 148.0);
        let price = body["price"].as_f64().unwrap();
        assert!((price - 45.62).abs() < 0.01, "price={price}");

        let (_, body) = call(&app, "GET", "/api/price", None).await;
        assert_eq!(body["price"].as_f64(), Some(price));
    }

    #[tokio::test]
    async fn test_unknown_field_is_unprocessable() {
        let app = app();
        let (status, _) = call(&app, "POST", "/api/parameters", Some(r#"{"field":"dividend","value":0.01}"#)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_unknown_scenario_is_not_found() {
        let app = app();
        let (status, body) = call(&app, "POST", "/api/scenarios/straddle/load", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("straddle"));
    }

    #[tokio::test]
    async fn test_toggle_and_curve() {
        let app = app();
        let (status, body) = call(&app, "POST", "/api/option-kind/toggle", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["parameters"]["option_kind"], "put");

        let (_, body) = call(&app, "GET", "/api/curve", None).await;
        assert_eq!(body["option_kind"], "put");
        let points = body["points"].as_array().unwrap();
        assert_eq!(points.len(), 50);
        assert_eq!(points[0]["underlying_price"], 50.0);
        assert_eq!(points[49]["underlying_price"], 148.0);
    }

    #[tokio::test]
    async fn test_simulation_start_stop() {
        let app = app();
        let (_, body) = call(&app, "POST", "/api/simulation/start", None).await;
        assert_eq!(body["simulation"], "running");
        let (_, body) = call(&app, "POST", "/api/simulation/stop", None).await;
        assert_eq!(body["simulation"], "idle");
        let (_, body) = call(&app, "GET", "/api/state", None).await;
        assert_eq!(body["simulation"], "idle");
    }
}
