use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::types::PanelKind;

/// Scheduler-side view of a panel task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Idle,
    InFlight,
}

/// Per-task single-flight flags. A claim succeeds only when the flag is
/// clear; the matching guard clears it again when the fetch ends.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    guards: HashMap<PanelKind, Arc<AtomicBool>>,
}

impl TaskRegistry {
    pub fn new(kinds: impl IntoIterator<Item = PanelKind>) -> Self {
        Self {
            guards: kinds
                .into_iter()
                .map(|kind| (kind, Arc::new(AtomicBool::new(false))))
                .collect(),
        }
    }

    pub fn state(&self, kind: PanelKind) -> TaskState {
        match self.guards.get(&kind) {
            Some(flag) if flag.load(Ordering::Acquire) => TaskState::InFlight,
            _ => TaskState::Idle,
        }
    }

    /// Claims the task for one firing. Returns `None` while a request is
    /// outstanding, which makes that firing a no-op rather than a queue entry.
    pub fn try_begin(&self, kind: PanelKind) -> Option<FlightGuard> {
        let flag = self.guards.get(&kind)?;
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(FlightGuard {
            flag: Arc::clone(flag),
        })
    }
}

/// Releases the task on drop, so the InFlight -> Idle transition happens
/// whether the fetch succeeded, failed or panicked.
#[derive(Debug)]
pub struct FlightGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_is_refused_while_in_flight() {
        let registry = TaskRegistry::new([PanelKind::Health]);
        let guard = registry.try_begin(PanelKind::Health).expect("first claim");
        assert_eq!(registry.state(PanelKind::Health), TaskState::InFlight);
        assert!(registry.try_begin(PanelKind::Health).is_none());

        drop(guard);
        assert_eq!(registry.state(PanelKind::Health), TaskState::Idle);
        assert!(registry.try_begin(PanelKind::Health).is_some());
    }

    #[test]
    fn claims_are_isolated_per_task() {
        let registry = TaskRegistry::new([PanelKind::Health, PanelKind::Positions]);
        let _guard = registry.try_begin(PanelKind::Health).expect("claim health");
        assert_eq!(registry.state(PanelKind::Positions), TaskState::Idle);
        assert!(registry.try_begin(PanelKind::Positions).is_some());
    }

    #[test]
    fn unknown_task_cannot_be_claimed() {
        let registry = TaskRegistry::new([PanelKind::Health]);
        assert!(registry.try_begin(PanelKind::Trades).is_none());
        assert_eq!(registry.state(PanelKind::Trades), TaskState::Idle);
    }
}
