use crate::errors::{EngineError, EngineResult, PricingError};
use crate::models::black_scholes::BlackScholesEuropean;
use crate::scenarios;
use crate::session::{PricingSession, Recompute, SessionUpdate};
use crate::simulation::SimulationDriver;
use crate::state::*;
use portable_atomic::Ordering;
use smallvec::SmallVec;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Core engine loop. Owns the pricing session and the simulation driver and
/// applies events one at a time, so every mutation and its recompute are
/// atomic with respect to observers. No locks.
pub async fn run_engine(state: Arc<AppState>, mut rx: mpsc::Receiver<EngineEvent>) {
    tracing::info!("engine task started");

    let mut session = PricingSession::new(Box::new(BlackScholesEuropean::new()));
    let mut driver = SimulationDriver::new(state.config.sim_tick, state.config.sim_range);

    let updates = session.recompute(Recompute::ALL);
    publish(&state, &session, &driver, updates);
    tracing::info!(
        model = session.model_name(),
        price = ?session.price(),
        "initial pricing complete"
    );

    while let Some(event) = rx.recv().await {
        state.counters.events_processed.fetch_add(1, Ordering::Relaxed);

        if matches!(event, EngineEvent::Shutdown) {
            tracing::info!("shutdown event received");
            driver.stop();
            break;
        }

        process_event(event, &mut session, &mut driver, &state);
    }

    tracing::info!("engine task shutting down");
}

/// Apply a single event. Commands answer on their oneshot; a dropped
/// receiver only means the requester went away.
pub fn process_event(
    event: EngineEvent,
    session: &mut PricingSession,
    driver: &mut SimulationDriver,
    state: &Arc<AppState>,
) {
    match event {
        EngineEvent::SetParameter { field, value, reply } => {
            let result = session.set_parameter(field, value).map(|signal| {
                tracing::debug!(field = %field, value, "parameter edited");
                apply(session, driver, state, signal)
            });
            if let Err(e) = &result {
                tracing::warn!(error = %e, "parameter edit rejected");
            }
            let _ = reply.send(result);
        }

        EngineEvent::LoadScenario { key, reply } => {
            let result = scenarios::find(&key).map(|scenario| {
                tracing::info!(scenario = scenario.name, "loading scenario");
                let signal = session.load_scenario(scenario);
                apply(session, driver, state, signal)
            });
            let _ = reply.send(result);
        }

        EngineEvent::ToggleOptionKind { reply } => {
            let signal = session.toggle_option_kind();
            tracing::info!(option_kind = %session.parameters().option_kind, "option kind toggled");
            let _ = reply.send(Ok(apply(session, driver, state, signal)));
        }

        EngineEvent::StartSimulation { reply } => {
            if driver.start(state.engine_tx.clone()) {
                announce_simulation(driver, state);
            }
            let _ = reply.send(Ok(driver.state()));
        }

        EngineEvent::StopSimulation { reply } => {
            if driver.stop() {
                announce_simulation(driver, state);
            }
            let _ = reply.send(Ok(driver.state()));
        }

        EngineEvent::SimulationTick { generation } => {
            if !driver.accept_tick(generation) {
                state.counters.ticks_discarded.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    generation,
                    live_generation = driver.generation(),
                    "discarding stale simulation tick"
                );
                return;
            }

            let next = driver.advance(session.parameters().underlying_price);
            let signal = session.set_underlying(next);
            state.counters.ticks_applied.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(underlying = next, "simulation tick");

            apply(session, driver, state, signal);
        }

        EngineEvent::Shutdown => {
            driver.stop();
        }
    }
}

/// Run the recompute the signal asks for and publish the result.
fn apply(
    session: &mut PricingSession,
    driver: &SimulationDriver,
    state: &Arc<AppState>,
    signal: Recompute,
) -> EngineSnapshot {
    if !signal.is_empty() {
        state.broadcast(WsMessage::ParametersChanged {
            parameters: *session.parameters(),
            timestamp: now(),
        });
    }
    let updates = session.recompute(signal);
    publish(state, session, driver, updates)
}

/// Broadcast recompute results and refresh the watch snapshot.
fn publish(
    state: &Arc<AppState>,
    session: &PricingSession,
    driver: &SimulationDriver,
    updates: SmallVec<[SessionUpdate; 2]>,
) -> EngineSnapshot {
    let timestamp = now();
    let params = *session.parameters();

    for update in updates {
        match update {
            SessionUpdate::Price(price) => state.broadcast(WsMessage::PriceUpdate {
                price,
                option_kind: params.option_kind,
                underlying_price: params.underlying_price,
                timestamp: timestamp.clone(),
            }),
            SessionUpdate::Curve(points) => state.broadcast(WsMessage::CurveUpdate {
                option_kind: params.option_kind,
                points,
            }),
            SessionUpdate::PriceFailed(e) => report_failure(state, "price", e, &params, &timestamp),
            SessionUpdate::CurveFailed(e) => report_failure(state, "curve", e, &params, &timestamp),
        }
    }

    let snapshot = EngineSnapshot {
        parameters: params,
        price: session.price(),
        curve: session.curve().to_vec(),
        simulation: driver.state(),
        last_error: session.last_error().map(|e| e.to_string()),
        updated_at: timestamp,
    };
    state.snapshot_tx.send_replace(snapshot.clone());
    snapshot
}

fn report_failure(
    state: &Arc<AppState>,
    stage: &'static str,
    error: PricingError,
    params: &ContractParameters,
    timestamp: &str,
) {
    state.counters.pricing_errors.fetch_add(1, Ordering::Relaxed);
    tracing::warn!(stage, error = %error, ?params, "pricing failed, keeping last valid value");
    state.broadcast(WsMessage::PricingError {
        target: stage.to_string(),
        error: error.to_string(),
        timestamp: timestamp.to_string(),
    });
}

fn announce_simulation(driver: &SimulationDriver, state: &Arc<AppState>) {
    state.broadcast(WsMessage::SimulationStateMsg {
        state: driver.state(),
        generation: driver.generation(),
    });
    state.snapshot_tx.send_modify(|s| s.simulation = driver.state());
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Send a command to the engine and wait for its reply.
pub async fn request<T>(
    engine_tx: &mpsc::Sender<EngineEvent>,
    make: impl FnOnce(Reply<T>) -> EngineEvent,
) -> EngineResult<T> {
    let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
    engine_tx
        .send(make(reply_tx))
        .await
        .map_err(|_| EngineError::ChannelClosed("engine".into()))?;
    reply_rx
        .await
        .map_err(|_| EngineError::ChannelClosed("engine reply".into()))?
}
