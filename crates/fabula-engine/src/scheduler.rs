use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::action::Action;
use crate::event::{Event, RunCtx};
use crate::rule::Rule;

/// What a scheduled job does when its time comes.
#[derive(Debug, Clone)]
pub enum JobWork {
    /// Run the actions once and forget the job.
    Once(Arc<[Action]>),
    /// Re-check the rule; while it keeps matching and running cleanly,
    /// the job re-enqueues itself one interval later.
    Repeating {
        /// Interval between runs.
        every: Duration,
        /// The rule to check and run each time.
        rule: Arc<Rule>,
    },
}

/// A unit of deferred work with the event it was scheduled under.
#[derive(Debug, Clone)]
pub struct Job {
    /// When the job becomes due.
    pub next_run: DateTime<Utc>,
    /// The event re-presented to the work when it runs.
    pub event: Event,
    /// What to do.
    pub work: JobWork,
    seq: u64,
}

// Ordering looks only at due time, with the insertion sequence breaking
// ties so equal timestamps pop in the order they were added.
impl PartialEq for Job {
    fn eq(&self, other: &Self) -> bool {
        self.next_run == other.next_run && self.seq == other.seq
    }
}

impl Eq for Job {}

impl PartialOrd for Job {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Job {
    fn cmp(&self, other: &Self) -> Ordering {
        self.next_run
            .cmp(&other.next_run)
            .then(self.seq.cmp(&other.seq))
    }
}

/// A min-heap of pending jobs, keyed by due time.
///
/// The scheduler never ticks on its own; the session loop asks it for
/// due jobs with the current time.
#[derive(Debug, Default)]
pub struct Scheduler {
    heap: BinaryHeap<Reverse<Job>>,
    seq: u64,
}

impl Scheduler {
    /// An empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue work to run at `at`.
    pub fn add(&mut self, at: DateTime<Utc>, event: Event, work: JobWork) {
        let seq = self.seq;
        self.seq += 1;
        self.heap.push(Reverse(Job {
            next_run: at,
            event,
            work,
            seq,
        }));
    }

    /// Pop the earliest job due at or before `now`, if any.
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Option<Job> {
        if self.heap.peek()?.0.next_run > now {
            return None;
        }
        self.heap.pop().map(|Reverse(job)| job)
    }

    /// When the next job is due, if any are queued.
    pub fn next_run_at(&self) -> Option<DateTime<Utc>> {
        self.heap.peek().map(|Reverse(job)| job.next_run)
    }

    /// Number of queued jobs.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

/// Run every job due at or before `now`, returning how many ran.
///
/// A failing once-job is dropped after its first failing action; the
/// session must outlive bad content. A repeating job re-enqueues itself
/// one interval after its due time, but only when its rule matched and
/// every action succeeded. Any failure or non-match ends the chain.
pub fn run_due(now: DateTime<Utc>, ctx: &mut RunCtx<'_>) -> usize {
    let mut ran = 0;
    while let Some(job) = ctx.scheduler.pop_due(now) {
        ran += 1;
        match &job.work {
            JobWork::Once(actions) => {
                for action in actions.iter() {
                    if action.execute(&job.event, ctx).is_err() {
                        break;
                    }
                }
            }
            JobWork::Repeating { every, rule } => {
                let matched = rule.matches(&job.event, ctx);
                if !matches!(matched, Ok(true)) {
                    continue;
                }
                if rule.run(&job.event, ctx).is_err() {
                    continue;
                }
                ctx.scheduler.add(
                    job.next_run + *every,
                    job.event,
                    JobWork::Repeating {
                        every: *every,
                        rule: Arc::clone(rule),
                    },
                );
            }
        }
    }
    ran
}
