use crate::simulation::SimulationRange;
use crate::state::{EngineEvent, SimulationState};
use portable_atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Idle/Running state machine for the underlying-price animation.
///
/// Owned by the engine task. Each start opens a new generation and spawns a
/// ticker task that emits `SimulationTick { generation }` into the engine
/// channel. Stop aborts the ticker and closes the generation, so a tick that
/// was already queued is rejected by `accept_tick` before it can apply.
pub struct SimulationDriver {
    state: SimulationState,
    generation: u64,
    period: Duration,
    range: SimulationRange,
    ticker: Option<JoinHandle<()>>,
    /// Set by the ticker when it sends, cleared when the engine consumes the tick.
    pending: Arc<AtomicBool>,
}

impl SimulationDriver {
    pub fn new(period: Duration, range: SimulationRange) -> Self {
        Self {
            state: SimulationState::Idle,
            generation: 0,
            period,
            range,
            ticker: None,
            pending: Arc::new(AtomicBool::new(false)),
        }
    }

    #[inline]
    pub fn state(&self) -> SimulationState {
        self.state
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Idle -> Running. Returns false if already running.
    pub fn start(&mut self, engine_tx: mpsc::Sender<EngineEvent>) -> bool {
        if self.state == SimulationState::Running {
            return false;
        }

        self.generation += 1;
        self.state = SimulationState::Running;
        // Fresh flag per run so a tick stranded by the previous run cannot block this one
        self.pending = Arc::new(AtomicBool::new(false));

        let generation = self.generation;
        let period = self.period;
        let pending = self.pending.clone();
        self.ticker = Some(tokio::spawn(async move {
            run_ticker(generation, period, pending, engine_tx).await;
        }));

        tracing::info!(generation, period_ms = period.as_millis() as u64, "simulation started");
        true
    }

    /// Running -> Idle. Returns false if already idle.
    pub fn stop(&mut self) -> bool {
        if self.state == SimulationState::Idle {
            return false;
        }

        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
        self.state = SimulationState::Idle;
        // Any tick still in flight carries this generation and is now stale
        self.generation += 1;

        tracing::info!(generation = self.generation, "simulation stopped");
        true
    }

    /// Whether a tick belongs to the live run. Consumes the pending slot if so.
    pub fn accept_tick(&self, generation: u64) -> bool {
        if self.state != SimulationState::Running || generation != self.generation {
            return false;
        }
        self.pending.store(false, Ordering::Release);
        true
    }

    #[inline]
    pub fn advance(&self, underlying: f64) -> f64 {
        self.range.advance(underlying)
    }
}

impl Drop for SimulationDriver {
    fn drop(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }
}

/// Emits at most one outstanding tick: a period that elapses while the
/// previous tick is still queued is skipped.
async fn run_ticker(
    generation: u64,
    period: Duration,
    pending: Arc<AtomicBool>,
    engine_tx: mpsc::Sender<EngineEvent>,
) {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        if pending.swap(true, Ordering::AcqRel) {
            tracing::debug!(generation, "previous tick still pending, skipping");
            continue;
        }

        if engine_tx
            .send(EngineEvent::SimulationTick { generation })
            .await
            .is_err()
        {
            tracing::error!("engine channel closed, simulation ticker shutting down");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver() -> SimulationDriver {
        SimulationDriver::new(Duration::from_millis(200), SimulationRange::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_stop_transitions() {
        let (tx, _rx) = mpsc::channel(8);
        let mut d = driver();
        assert_eq!(d.state(), SimulationState::Idle);

        assert!(d.start(tx.clone()));
        assert_eq!(d.state(), SimulationState::Running);
        assert!(!d.start(tx), "second start is a no-op");

        assert!(d.stop());
        assert_eq!(d.state(), SimulationState::Idle);
        assert!(!d.stop(), "second stop is a no-op");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_generation_rejected() {
        let (tx, _rx) = mpsc::channel(8);
        let mut d = driver();

        d.start(tx.clone());
        let first = d.generation();
        assert!(d.accept_tick(first));

        d.stop();
        assert!(!d.accept_tick(first), "tick after stop must not apply");

        d.start(tx);
        assert!(!d.accept_tick(first), "tick from an earlier run must not apply");
        assert!(d.accept_tick(d.generation()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_one_period() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut d = driver();
        d.start(tx);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(100)).await;
        match rx.try_recv() {
            Ok(EngineEvent::SimulationTick { generation }) => assert_eq!(generation, d.generation()),
            other => panic!("expected a tick, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_at_most_one_pending_tick() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut d = driver();
        d.start(tx);

        // Nobody consumes the tick, so later periods are skipped
        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert!(matches!(rx.try_recv(), Ok(EngineEvent::SimulationTick { .. })));
        assert!(rx.try_recv().is_err());

        // Consuming frees the slot for the next period
        assert!(d.accept_tick(d.generation()));
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(matches!(rx.try_recv(), Ok(EngineEvent::SimulationTick { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_silences_ticker() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut d = driver();
        d.start(tx);
        d.stop();

        tokio::time::sleep(Duration::from_millis(2_000)).await;
        assert!(rx.try_recv().is_err());
    }
}
