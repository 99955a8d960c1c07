//! Timer Service
//!
//! Fire-once delayed jobs for table lifecycle transitions.
//!
//! ## Design
//! - One background thread owns a min-heap of pending jobs ordered by due time
//! - Handles are cheap clones of a channel sender; scheduling never blocks
//! - Jobs cannot be cancelled; once scheduled they always run
//! - When every handle is gone the thread drains the remaining jobs at their
//!   due time, then exits
//!
//! Jobs run on the timer thread, so they must only take short locks. They
//! capture weak handles and identifiers, never strong table references, and
//! do nothing if their target has disappeared.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};

use crate::error::{DbError, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A job waiting in the queue
struct Scheduled {
    due: Instant,
    /// Arrival order; keeps jobs with the same due time FIFO
    seq: u64,
    label: &'static str,
    job: Job,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    // Reversed: BinaryHeap is a max-heap, the earliest job must be on top
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Handle to the process-wide delay queue
#[derive(Clone)]
pub struct TimerService {
    sender: Sender<Scheduled>,
}

impl TimerService {
    /// Spawn the timer thread and return a handle to it
    pub fn start() -> Result<Self> {
        let (sender, receiver) = channel::unbounded();

        thread::Builder::new()
            .name("ddbmem-timer".into())
            .spawn(move || run(receiver))
            .map_err(|e| DbError::Internal(format!("failed to start timer thread: {}", e)))?;

        Ok(Self { sender })
    }

    /// Run `job` once, `delay` from now
    pub fn schedule<F>(&self, label: &'static str, delay: Duration, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let scheduled = Scheduled {
            due: Instant::now() + delay,
            seq: 0,
            label,
            job: Box::new(job),
        };

        tracing::debug!(job = label, delay_ms = delay.as_millis() as u64, "Scheduling timer");

        // The receiver only goes away with the thread, which outlives all senders
        if self.sender.send(scheduled).is_err() {
            tracing::warn!(job = label, "Timer thread is gone; job dropped");
        }
    }
}

/// Timer thread main loop
fn run(receiver: Receiver<Scheduled>) {
    let mut queue: BinaryHeap<Scheduled> = BinaryHeap::new();
    let mut next_seq: u64 = 0;

    loop {
        fire_due(&mut queue);

        let received = match queue.peek() {
            Some(next) => {
                receiver.recv_timeout(next.due.saturating_duration_since(Instant::now()))
            }
            None => receiver.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(mut scheduled) => {
                scheduled.seq = next_seq;
                next_seq += 1;
                queue.push(scheduled);
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    // No more handles: finish what was already promised
    while let Some(next) = queue.peek() {
        let wait = next.due.saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            thread::sleep(wait);
        }
        fire_due(&mut queue);
    }

    tracing::debug!("Timer thread stopped");
}

fn fire_due(queue: &mut BinaryHeap<Scheduled>) {
    let now = Instant::now();
    while queue.peek().is_some_and(|next| next.due <= now) {
        if let Some(scheduled) = queue.pop() {
            tracing::debug!(job = scheduled.label, "Timer fired");
            (scheduled.job)();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use parking_lot::Mutex;

    #[test]
    fn test_jobs_fire_in_due_order() {
        let timers = TimerService::start().unwrap();
        let fired = Arc::new(Mutex::new(Vec::new()));

        for (label, delay) in [("late", 60), ("early", 10), ("middle", 30)] {
            let fired = Arc::clone(&fired);
            timers.schedule("test", Duration::from_millis(delay), move || {
                fired.lock().push(label);
            });
        }

        thread::sleep(Duration::from_millis(300));
        assert_eq!(*fired.lock(), vec!["early", "middle", "late"]);
    }

    #[test]
    fn test_pending_jobs_run_after_handles_drop() {
        let fired = Arc::new(Mutex::new(false));
        {
            let timers = TimerService::start().unwrap();
            let fired = Arc::clone(&fired);
            timers.schedule("test", Duration::from_millis(20), move || {
                *fired.lock() = true;
            });
        }

        thread::sleep(Duration::from_millis(200));
        assert!(*fired.lock());
    }
}
