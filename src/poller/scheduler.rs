use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep};
use tracing::{debug, warn};

use super::registry::{TaskRegistry, TaskState};
use crate::client::PanelSource;
use crate::types::{PanelKind, PanelUpdate};

/// One polled panel: which endpoint, and how far into the period its first
/// firing is deferred. Offsets spread the panels' requests across the period
/// so the backend never sees all of them at once.
#[derive(Debug, Clone, Copy)]
pub struct PanelTask {
    pub kind: PanelKind,
    pub offset: Duration,
}

impl PanelTask {
    pub fn new(kind: PanelKind, offset: Duration) -> Self {
        Self { kind, offset }
    }
}

/// Drives all panel fetches on a shared cadence. Each task fires once at its
/// offset, then every `period`; a firing that finds its previous request
/// still in flight is skipped outright, never queued.
pub struct Poller {
    source: Arc<dyn PanelSource>,
    tasks: Vec<PanelTask>,
    period: Duration,
    updates: mpsc::UnboundedSender<PanelUpdate>,
}

impl Poller {
    pub fn new(
        source: Arc<dyn PanelSource>,
        tasks: Vec<PanelTask>,
        period: Duration,
        updates: mpsc::UnboundedSender<PanelUpdate>,
    ) -> Self {
        Self {
            source,
            tasks,
            period,
            updates,
        }
    }

    /// The default task list: every known panel, offset by `stagger` times
    /// its position in declaration order.
    pub fn staggered_tasks(stagger: Duration) -> Vec<PanelTask> {
        PanelKind::ALL
            .iter()
            .enumerate()
            .map(|(i, &kind)| PanelTask::new(kind, stagger * i as u32))
            .collect()
    }

    pub fn spawn(self) -> PollerHandle {
        let Self {
            source,
            tasks,
            period,
            updates,
        } = self;

        let registry = Arc::new(TaskRegistry::new(tasks.iter().map(|t| t.kind)));
        let handles = tasks
            .into_iter()
            .map(|task| {
                tokio::spawn(run_task(
                    Arc::clone(&source),
                    Arc::clone(&registry),
                    updates.clone(),
                    task,
                    period,
                ))
            })
            .collect();

        PollerHandle { registry, handles }
    }
}

async fn run_task(
    source: Arc<dyn PanelSource>,
    registry: Arc<TaskRegistry>,
    updates: mpsc::UnboundedSender<PanelUpdate>,
    task: PanelTask,
    period: Duration,
) {
    sleep(task.offset).await;
    let mut ticks = interval(period);
    loop {
        ticks.tick().await;

        let Some(guard) = registry.try_begin(task.kind) else {
            debug!(panel = %task.kind, "request still in flight, skipping this firing");
            continue;
        };

        // The fetch runs on its own task so a slow response can never delay
        // this panel's tick loop or any other panel.
        let source = Arc::clone(&source);
        let updates = updates.clone();
        let kind = task.kind;
        tokio::spawn(async move {
            let _guard = guard;
            let update = match source.fetch_panel(kind).await {
                Ok(data) => PanelUpdate::ok(data),
                Err(e) => {
                    warn!(panel = %kind, error = %e, "panel fetch failed");
                    PanelUpdate::err(kind, e.to_string())
                }
            };
            let _ = updates.send(update);
        });
    }
}

/// Owns the per-task loops; aborting them on drop stops polling with the
/// process. In-flight requests are never cancelled mid-request by a re-fire,
/// they complete or fail on their own.
pub struct PollerHandle {
    registry: Arc<TaskRegistry>,
    handles: Vec<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn task_state(&self, kind: PanelKind) -> TaskState {
        self.registry.state(kind)
    }

    pub fn shutdown(&self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::time::Instant;

    use crate::client::ApiError;
    use crate::types::{Health, PanelData};

    struct FakeBackend {
        started: Instant,
        calls: Mutex<Vec<(PanelKind, Duration)>>,
        delay: Duration,
        failing: Vec<PanelKind>,
    }

    impl FakeBackend {
        fn new() -> Self {
            Self {
                started: Instant::now(),
                calls: Mutex::new(Vec::new()),
                delay: Duration::ZERO,
                failing: Vec::new(),
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn with_failing(mut self, kind: PanelKind) -> Self {
            self.failing.push(kind);
            self
        }

        fn calls_for(&self, kind: PanelKind) -> Vec<u64> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(k, _)| *k == kind)
                .map(|(_, at)| at.as_millis() as u64)
                .collect()
        }

        fn total_calls(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl PanelSource for FakeBackend {
        async fn fetch_panel(&self, kind: PanelKind) -> Result<PanelData, ApiError> {
            self.calls
                .lock()
                .unwrap()
                .push((kind, self.started.elapsed()));
            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }
            if self.failing.contains(&kind) {
                return Err(ApiError::Status {
                    status: 503,
                    reason: "Service Unavailable".to_string(),
                });
            }
            Ok(PanelData::Health(Health {
                ok: true,
                ts: "2025-08-10T00:00:00Z".to_string(),
            }))
        }
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[tokio::test(start_paused = true)]
    async fn tasks_fire_at_offset_then_every_period() {
        let source = Arc::new(FakeBackend::new());
        let (tx, _rx) = mpsc::unbounded_channel();
        let kinds = [
            PanelKind::Health,
            PanelKind::Positions,
            PanelKind::Ai,
            PanelKind::TickCfg,
            PanelKind::Risk,
            PanelKind::Trades,
        ];
        let tasks = kinds
            .iter()
            .enumerate()
            .map(|(i, &kind)| PanelTask::new(kind, ms(500 * i as u64)))
            .collect();

        let _handle = Poller::new(source.clone(), tasks, ms(6000), tx).spawn();
        sleep(ms(21_000)).await;

        for (i, &kind) in kinds.iter().enumerate() {
            let offset = 500 * i as u64;
            assert_eq!(
                source.calls_for(kind),
                vec![offset, offset + 6000, offset + 12_000, offset + 18_000],
                "firing schedule for {}",
                kind
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn firing_during_in_flight_window_is_a_no_op() {
        // Each response takes 10s while the period is 100ms, so every firing
        // after the first must be skipped until the response lands.
        let source = Arc::new(FakeBackend::new().with_delay(ms(10_000)));
        let (tx, _rx) = mpsc::unbounded_channel();
        let tasks = vec![PanelTask::new(PanelKind::Health, Duration::ZERO)];

        let handle = Poller::new(source.clone(), tasks, ms(100), tx).spawn();

        sleep(ms(350)).await;
        assert_eq!(source.total_calls(), 1);
        assert_eq!(handle.task_state(PanelKind::Health), TaskState::InFlight);

        sleep(ms(9_800)).await;
        assert_eq!(source.total_calls(), 2, "next firing after release fetches again");
    }

    #[tokio::test(start_paused = true)]
    async fn failing_panel_is_isolated_from_the_others() {
        let source = Arc::new(FakeBackend::new().with_failing(PanelKind::Positions));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let tasks = vec![
            PanelTask::new(PanelKind::Health, Duration::ZERO),
            PanelTask::new(PanelKind::Positions, ms(500)),
        ];

        let handle = Poller::new(source.clone(), tasks, ms(6000), tx).spawn();
        sleep(ms(1000)).await;

        let mut updates = Vec::new();
        while let Ok(update) = rx.try_recv() {
            updates.push(update);
        }
        assert_eq!(updates.len(), 2);

        let health = updates.iter().find(|u| u.kind == PanelKind::Health).unwrap();
        assert!(health.result.is_ok());

        let positions = updates
            .iter()
            .find(|u| u.kind == PanelKind::Positions)
            .unwrap();
        assert_eq!(
            positions.result.as_ref().unwrap_err(),
            "503 Service Unavailable"
        );

        // Both guards were released; the failure neither sticks nor spreads.
        assert_eq!(handle.task_state(PanelKind::Health), TaskState::Idle);
        assert_eq!(handle.task_state(PanelKind::Positions), TaskState::Idle);

        sleep(ms(6000)).await;
        assert_eq!(source.calls_for(PanelKind::Health).len(), 2);
        assert_eq!(source.calls_for(PanelKind::Positions).len(), 2);
    }
}
