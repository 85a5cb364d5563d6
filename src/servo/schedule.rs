// Deferred completion delivery. One worker thread owns a deadline heap;
// drivers push (deadline, token) pairs and the worker fires each token as
// its deadline passes. Ties break by submission order.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::motion::Completion;

struct Entry {
    due: Instant,
    seq: u64,
    done: Completion,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

struct Queue {
    heap: BinaryHeap<Reverse<Entry>>,
    next_seq: u64,
    shutdown: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    wake: Condvar,
}

/// Fires completions on a worker thread once their deadline passes.
pub(crate) struct CompletionScheduler {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl CompletionScheduler {
    pub(crate) fn new() -> CompletionScheduler {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                heap: BinaryHeap::new(),
                next_seq: 0,
                shutdown: false,
            }),
            wake: Condvar::new(),
        });
        let worker = {
            let shared = shared.clone();
            thread::spawn(move || deliver(shared))
        };
        CompletionScheduler {
            shared,
            worker: Some(worker),
        }
    }

    /// Fire `done` once `after` has elapsed.
    pub(crate) fn defer(&self, after: Duration, done: Completion) {
        let mut queue = self.shared.queue.lock().unwrap();
        let seq = queue.next_seq;
        queue.next_seq += 1;
        queue.heap.push(Reverse(Entry {
            due: Instant::now() + after,
            seq,
            done,
        }));
        self.shared.wake.notify_one();
    }
}

fn deliver(shared: Arc<Shared>) {
    loop {
        let mut queue = shared.queue.lock().unwrap();
        loop {
            if queue.shutdown {
                return;
            }
            let now = Instant::now();
            let until_due = match queue.heap.peek() {
                Some(Reverse(entry)) if entry.due <= now => break,
                Some(Reverse(entry)) => Some(entry.due - now),
                None => None,
            };
            queue = match until_due {
                Some(wait) => shared.wake.wait_timeout(queue, wait).unwrap().0,
                None => shared.wake.wait(queue).unwrap(),
            };
        }
        if let Some(Reverse(entry)) = queue.heap.pop() {
            // deliver with the lock released
            drop(queue);
            entry.done.complete();
        }
    }
}

impl Drop for CompletionScheduler {
    fn drop(&mut self) {
        self.shared.queue.lock().unwrap().shutdown = true;
        self.shared.wake.notify_one();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::{MotionState, YieldWait};

    #[test]
    fn fires_in_deadline_order_not_submission_order() {
        let state = Arc::new(MotionState::with_policy(YieldWait));
        let scheduler = CompletionScheduler::new();

        state.set_in_motion(0);
        state.set_in_motion(1);
        scheduler.defer(Duration::from_millis(80), Completion::new(state.clone(), 0));
        scheduler.defer(Duration::from_millis(10), Completion::new(state.clone(), 1));

        state.wait_one(1);
        assert!(
            state.in_motion(0),
            "the later deadline must still be pending"
        );
        state.wait_one(0);
    }

    #[test]
    fn shuts_down_with_work_still_queued() {
        let state = Arc::new(MotionState::with_policy(YieldWait));
        let scheduler = CompletionScheduler::new();

        state.set_in_motion(3);
        scheduler.defer(Duration::from_secs(3600), Completion::new(state.clone(), 3));
        drop(scheduler);

        // the worker joined without firing the far-future token
        assert!(state.in_motion(3));
    }
}
