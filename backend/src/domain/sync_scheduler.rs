//! Background and on-demand scheduling of availability sync passes.
//!
//! A pass fetches the live feed, applies it and regenerates the snapshot.
//! Scheduled and on-demand passes share one in-flight guard, so at most one
//! pass runs at a time; a trigger that finds a pass running waits for that
//! pass instead of starting another.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{Instrument, debug, info, info_span, warn};
use utoipa::ToSchema;

use super::availability_sync::{AvailabilitySync, AvailabilitySyncReport};
use super::registry_loader::{CarparkRegistryLoader, RegistryLoadReport};
use super::snapshot::SnapshotGenerator;
use super::{Error, TraceId};

const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Timing knobs for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    interval: Duration,
    freshness: Duration,
    on_demand_wait: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            freshness: Duration::from_secs(60),
            on_demand_wait: Duration::from_secs(2),
        }
    }
}

impl SyncSettings {
    /// Period of the background loop; clamped to at least one second.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_INTERVAL);
        self
    }

    /// Age after which the map view triggers an on-demand pass.
    pub fn with_freshness(mut self, freshness: Duration) -> Self {
        self.freshness = freshness;
        self
    }

    /// Longest a request waits for an on-demand pass.
    pub fn with_on_demand_wait(mut self, wait: Duration) -> Self {
        self.on_demand_wait = wait;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn freshness(&self) -> Duration {
        self.freshness
    }

    pub fn on_demand_wait(&self) -> Duration {
        self.on_demand_wait
    }
}

/// What a caller of [`SyncScheduler::refresh_if_stale`] gets to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// The last successful pass is within the freshness window.
    Fresh,
    /// A pass completed successfully within the wait.
    Refreshed,
    /// A pass completed within the wait but failed.
    Failed,
    /// No pass completed within the wait, or a recent attempt is still
    /// being honoured; the current snapshot is served.
    Stale,
}

/// Why a pass was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassTrigger {
    Scheduled,
    OnDemand,
}

impl PassTrigger {
    fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::OnDemand => "on_demand",
        }
    }
}

/// Counts from one successful pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncPassReport {
    pub availability: AvailabilitySyncReport,
    pub features: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct PassCompletion {
    generation: u64,
    succeeded: bool,
}

struct SchedulerState {
    availability: AvailabilitySync,
    snapshots: SnapshotGenerator,
    clock: Arc<dyn Clock>,
    settings: SyncSettings,
    last_success: Mutex<Option<DateTime<Utc>>>,
    last_attempt: Mutex<Option<DateTime<Utc>>>,
    in_flight: AtomicBool,
    completions: watch::Sender<PassCompletion>,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn within(clock: &dyn Clock, at: Option<DateTime<Utc>>, window: Duration) -> bool {
    let Some(at) = at else {
        return false;
    };
    match TimeDelta::from_std(window) {
        Ok(window) => clock.utc() - at < window,
        Err(_) => true,
    }
}

/// Runs sync passes on a fixed interval and on demand.
#[derive(Clone)]
pub struct SyncScheduler {
    state: Arc<SchedulerState>,
}

impl SyncScheduler {
    pub fn new(
        availability: AvailabilitySync,
        snapshots: SnapshotGenerator,
        clock: Arc<dyn Clock>,
        settings: SyncSettings,
    ) -> Self {
        let (completions, _) = watch::channel(PassCompletion::default());
        Self {
            state: Arc::new(SchedulerState {
                availability,
                snapshots,
                clock,
                settings,
                last_success: Mutex::new(None),
                last_attempt: Mutex::new(None),
                in_flight: AtomicBool::new(false),
                completions,
            }),
        }
    }

    pub fn settings(&self) -> SyncSettings {
        self.state.settings
    }

    /// Time of the last successful pass.
    pub fn last_synced_at(&self) -> Option<DateTime<Utc>> {
        *lock(&self.state.last_success)
    }

    /// Load the registry once before serving. Failures are logged and do not
    /// stop startup.
    pub async fn run_startup(&self, loader: &CarparkRegistryLoader) -> Option<RegistryLoadReport> {
        let trace_id = TraceId::generate();
        let span = info_span!("registry_startup_load", %trace_id);
        match TraceId::scope(trace_id, loader.load().instrument(span)).await {
            Ok(report) => Some(report),
            Err(error) => {
                warn!(%error, code = ?error.code(), "startup registry load failed; continuing");
                None
            }
        }
    }

    /// Spawn the background loop. The first pass runs immediately.
    pub fn spawn(&self) -> JoinHandle<()> {
        let scheduler = self.clone();
        tokio::spawn(async move { scheduler.run_forever().await })
    }

    async fn run_forever(self) {
        let mut ticker = interval(self.state.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            interval_secs = self.state.settings.interval.as_secs(),
            "carpark sync loop started"
        );
        loop {
            ticker.tick().await;
            self.run_pass(PassTrigger::Scheduled).await;
        }
    }

    fn try_begin(&self) -> Option<InFlightGuard<'_>> {
        self.state
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard(&self.state.in_flight))
    }

    /// Run one pass unless another is in flight.
    ///
    /// Returns `None` when the pass was skipped. Failures are logged here;
    /// the caller only decides what to serve.
    pub async fn run_pass(&self, trigger: PassTrigger) -> Option<Result<SyncPassReport, Error>> {
        let Some(guard) = self.try_begin() else {
            debug!(trigger = trigger.as_str(), "sync pass already running; skipped");
            return None;
        };
        *lock(&self.state.last_attempt) = Some(self.state.clock.utc());

        let trace_id = TraceId::generate();
        let span = info_span!("carpark_sync_pass", %trace_id, trigger = trigger.as_str());
        let result = TraceId::scope(trace_id, self.execute_pass().instrument(span)).await;

        let succeeded = result.is_ok();
        match &result {
            Ok(report) => {
                *lock(&self.state.last_success) = Some(self.state.clock.utc());
                debug!(trigger = trigger.as_str(), features = report.features, "sync pass succeeded");
            }
            Err(error) => {
                warn!(trigger = trigger.as_str(), %error, "sync pass failed; retrying on next trigger");
            }
        }
        drop(guard);
        self.state.completions.send_modify(|completion| {
            completion.generation += 1;
            completion.succeeded = succeeded;
        });
        Some(result)
    }

    async fn execute_pass(&self) -> Result<SyncPassReport, Error> {
        let availability = self.state.availability.sync().await?;
        let features = self.state.snapshots.regenerate().await?.len();
        Ok(SyncPassReport {
            availability,
            features,
        })
    }

    fn is_fresh(&self) -> bool {
        within(
            self.state.clock.as_ref(),
            self.last_synced_at(),
            self.state.settings.freshness,
        )
    }

    fn attempted_recently(&self) -> bool {
        within(
            self.state.clock.as_ref(),
            *lock(&self.state.last_attempt),
            self.state.settings.freshness,
        )
    }

    /// Trigger a pass when data is stale and wait a bounded time for it.
    ///
    /// Attempts are throttled to one per freshness window, so a failing feed
    /// is not retried on every request.
    pub async fn refresh_if_stale(&self) -> RefreshOutcome {
        if self.is_fresh() {
            return RefreshOutcome::Fresh;
        }
        let mut completions = self.state.completions.subscribe();
        let in_flight = self.state.in_flight.load(Ordering::Acquire);
        if !in_flight && self.attempted_recently() {
            return if self.is_fresh() {
                RefreshOutcome::Fresh
            } else {
                RefreshOutcome::Stale
            };
        }

        if !in_flight {
            let scheduler = self.clone();
            tokio::spawn(async move {
                scheduler.run_pass(PassTrigger::OnDemand).await;
            });
        }

        match timeout(self.state.settings.on_demand_wait, completions.changed()).await {
            Ok(Ok(())) => {
                if completions.borrow_and_update().succeeded {
                    RefreshOutcome::Refreshed
                } else {
                    RefreshOutcome::Failed
                }
            }
            Ok(Err(_)) => RefreshOutcome::Failed,
            Err(_) => {
                debug!(
                    wait_millis = saturating_millis(self.state.settings.on_demand_wait),
                    "on-demand refresh still running; serving current snapshot"
                );
                RefreshOutcome::Stale
            }
        }
    }
}

#[cfg(test)]
#[path = "sync_scheduler_tests.rs"]
mod tests;
