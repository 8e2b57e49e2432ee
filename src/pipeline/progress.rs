//! Simulated progress for the loading view.
//!
//! The generation service reports nothing until text arrives, so the
//! percentage shown while waiting is estimated from elapsed ticks only.  It
//! moves fast at first, slows down in the middle band and then creeps
//! towards 99% without ever reaching it.  Only [`ProgressEstimator::stop`]
//! can show 100%.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use super::state::PipelineEvent;

/// Default interval between ticks.
pub const DEFAULT_TICK: Duration = Duration::from_millis(200);

const FAST_UNTIL: f32 = 40.0;
const SLOW_UNTIL: f32 = 85.0;
const FAST_STEP: f32 = 1.5;
const SLOW_STEP: f32 = 0.4;
const CEILING: f32 = 99.0;
const APPROACH_RATE: f32 = 0.01;

// ---------------------------------------------------------------------------
// ProgressPhase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProgressPhase {
    #[default]
    Idle,
    /// Started, no tick yet.
    Loading,
    Uploading,
    Analyzing,
    Drafting,
    Complete,
    Failed,
}

impl ProgressPhase {
    /// Status line shown under the bar.
    pub fn label(&self) -> &'static str {
        match self {
            ProgressPhase::Idle => "",
            ProgressPhase::Loading => "Cargando archivo...",
            ProgressPhase::Uploading => "Subiendo audio a la nube...",
            ProgressPhase::Analyzing => "Analizando transcripción...",
            ProgressPhase::Drafting => "Generando redacción institucional...",
            ProgressPhase::Complete => "Completado",
            ProgressPhase::Failed => "Error",
        }
    }

    fn for_percent(percent: f32) -> Self {
        if percent < FAST_UNTIL {
            ProgressPhase::Uploading
        } else if percent < SLOW_UNTIL {
            ProgressPhase::Analyzing
        } else {
            ProgressPhase::Drafting
        }
    }
}

/// One reading of the estimator.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProgressSnapshot {
    pub percent: f32,
    pub phase: ProgressPhase,
}

/// Next percentage after one tick from `current`.
pub fn advance(current: f32) -> f32 {
    if current < FAST_UNTIL {
        current + FAST_STEP
    } else if current < SLOW_UNTIL {
        current + SLOW_STEP
    } else {
        current + (CEILING - current) * APPROACH_RATE
    }
}

// ---------------------------------------------------------------------------
// ProgressEstimator
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Shared {
    snapshot: ProgressSnapshot,
    /// Bumped by every start and stop; a ticker only writes while its own
    /// epoch is current.
    epoch: u64,
}

/// Tick-driven progress generator.
///
/// At most one ticker task exists: [`start`](Self::start) aborts the
/// previous one before spawning, and [`stop`](Self::stop) (or dropping the
/// estimator) aborts the current one.  Must be used inside a tokio runtime.
pub struct ProgressEstimator {
    shared: Arc<Mutex<Shared>>,
    tick: Duration,
    events: Option<UnboundedSender<PipelineEvent>>,
    task: Option<JoinHandle<()>>,
}

impl ProgressEstimator {
    pub fn new(tick: Duration) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared::default())),
            tick: tick.max(Duration::from_millis(1)),
            events: None,
            task: None,
        }
    }

    /// Publish every reading as [`PipelineEvent::Progress`].
    pub fn with_events(mut self, events: UnboundedSender<PipelineEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        lock(&self.shared).snapshot
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Reset to 0% and start ticking.  A running ticker is cancelled first.
    pub fn start(&mut self) {
        self.cancel();

        let epoch = {
            let mut shared = lock(&self.shared);
            shared.epoch += 1;
            shared.snapshot = ProgressSnapshot {
                percent: 0.0,
                phase: ProgressPhase::Loading,
            };
            publish(&self.events, shared.snapshot);
            shared.epoch
        };

        let shared = Arc::clone(&self.shared);
        let events = self.events.clone();
        let tick = self.tick;

        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + tick, tick);
            loop {
                ticker.tick().await;
                let mut current = lock(&shared);
                if current.epoch != epoch {
                    break;
                }
                let percent = advance(current.snapshot.percent);
                current.snapshot = ProgressSnapshot {
                    percent,
                    phase: ProgressPhase::for_percent(percent),
                };
                publish(&events, current.snapshot);
            }
        }));
    }

    /// Cancel the ticker and snap to 100% (`success`) or 0% with the error
    /// label.
    pub fn stop(&mut self, success: bool) {
        self.cancel();

        let mut shared = lock(&self.shared);
        shared.epoch += 1;
        shared.snapshot = if success {
            ProgressSnapshot {
                percent: 100.0,
                phase: ProgressPhase::Complete,
            }
        } else {
            ProgressSnapshot {
                percent: 0.0,
                phase: ProgressPhase::Failed,
            }
        };
        publish(&self.events, shared.snapshot);
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Default for ProgressEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_TICK)
    }
}

impl Drop for ProgressEstimator {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn publish(events: &Option<UnboundedSender<PipelineEvent>>, snapshot: ProgressSnapshot) {
    if let Some(tx) = events {
        let _ = tx.send(PipelineEvent::Progress(snapshot));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
