//! Deterministic "resume at T, run task" queue for timed sequences.

use std::{
    cmp::{Ordering, Reverse},
    collections::BinaryHeap,
    time::Duration,
};

use lanebound_core::{MatchOutcome, UnitId};

use crate::units::AppliedModifier;

/// Continuation resumed once its due time is reached.
///
/// Unit tasks carry the unit handle; they are dropped when the handle no
/// longer resolves to a live unit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Task {
    AttackMidpoint { unit: UnitId },
    AttackEnd { unit: UnitId },
    ModifierExpiry { unit: UnitId, modifier: AppliedModifier },
    SceneTransition { outcome: MatchOutcome },
}

#[derive(Debug)]
struct Scheduled {
    due: Duration,
    sequence: u64,
    task: Task,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due
            .cmp(&other.due)
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

/// Min-heap of tasks ordered by due time, then by insertion order.
#[derive(Debug, Default)]
pub(crate) struct Scheduler {
    now: Duration,
    sequence: u64,
    queue: BinaryHeap<Reverse<Scheduled>>,
}

impl Scheduler {
    pub(crate) fn now(&self) -> Duration {
        self.now
    }

    pub(crate) fn advance(&mut self, dt: Duration) {
        self.now = self.now.saturating_add(dt);
    }

    pub(crate) fn schedule_in(&mut self, delay: Duration, task: Task) {
        let due = self.now.saturating_add(delay);
        self.queue.push(Reverse(Scheduled {
            due,
            sequence: self.sequence,
            task,
        }));
        self.sequence = self.sequence.wrapping_add(1);
    }

    /// Pops the earliest task whose due time has been reached.
    pub(crate) fn pop_due(&mut self) -> Option<Task> {
        let Reverse(next) = self.queue.peek()?;
        if next.due > self.now {
            return None;
        }
        self.queue.pop().map(|Reverse(scheduled)| scheduled.task)
    }

    pub(crate) fn pending(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::{Scheduler, Task};
    use lanebound_core::{MatchOutcome, UnitId};
    use std::time::Duration;

    #[test]
    fn tasks_run_in_due_then_insertion_order() {
        let mut scheduler = Scheduler::default();
        let unit = UnitId::new(0, 0);
        scheduler.schedule_in(Duration::from_millis(500), Task::AttackEnd { unit });
        scheduler.schedule_in(Duration::from_millis(250), Task::AttackMidpoint { unit });
        scheduler.schedule_in(
            Duration::from_millis(500),
            Task::SceneTransition {
                outcome: MatchOutcome::Win,
            },
        );

        assert_eq!(scheduler.pop_due(), None);
        scheduler.advance(Duration::from_millis(500));

        assert_eq!(scheduler.pop_due(), Some(Task::AttackMidpoint { unit }));
        assert_eq!(scheduler.pop_due(), Some(Task::AttackEnd { unit }));
        assert_eq!(
            scheduler.pop_due(),
            Some(Task::SceneTransition {
                outcome: MatchOutcome::Win
            })
        );
        assert_eq!(scheduler.pop_due(), None);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn future_tasks_stay_queued() {
        let mut scheduler = Scheduler::default();
        scheduler.advance(Duration::from_secs(1));
        scheduler.schedule_in(
            Duration::from_secs(2),
            Task::AttackEnd {
                unit: UnitId::new(3, 1),
            },
        );
        scheduler.advance(Duration::from_secs(1));
        assert_eq!(scheduler.pop_due(), None);
        assert_eq!(scheduler.pending(), 1);
    }
}
