//! Timers backing the detection overlay: the session's polling tick and
//! the result marker's fade.
//!
//! Both are cancellable handles over a dedicated worker thread. The session
//! invariant ("at most one live polling timer per session") is enforced by
//! ownership: whoever holds a [`PollTimer`] holds the only handle to its
//! thread, and cancelling (or dropping) the handle reaps it. Cancellation
//! wakes a sleeping worker immediately rather than waiting out the period.

use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use log::warn;

/// Cancellation latch shared between a timer handle and its worker thread.
struct Latch {
    tripped: Mutex<bool>,
    signal: Condvar,
}

impl Latch {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            tripped: Mutex::new(false),
            signal: Condvar::new(),
        })
    }

    fn trip(&self) {
        *self.tripped.lock().unwrap_or_else(|err| err.into_inner()) = true;
        self.signal.notify_all();
    }

    fn is_tripped(&self) -> bool {
        *self.tripped.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Blocks until the latch trips or the deadline passes. Returns true if
    /// the latch tripped first.
    fn tripped_before(&self, deadline: Instant) -> bool {
        let mut tripped = self.tripped.lock().unwrap_or_else(|err| err.into_inner());
        loop {
            if *tripped {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .signal
                .wait_timeout(tripped, deadline - now)
                .unwrap_or_else(|err| err.into_inner());
            tripped = guard;
        }
    }
}

/// The session's polling timer: invokes `tick` once per period until
/// cancelled. Cancellation joins the worker, so once `cancel` (or drop)
/// returns, no further ticks can fire.
pub struct PollTimer {
    latch: Arc<Latch>,
    worker: Option<thread::JoinHandle<()>>,
}

impl PollTimer {
    pub fn arm<F>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let latch = Latch::new();
        let worker_latch = Arc::clone(&latch);
        let worker = thread::spawn(move || {
            loop {
                if worker_latch.tripped_before(Instant::now() + period) {
                    return;
                }
                tick();
                if worker_latch.is_tripped() {
                    return;
                }
            }
        });

        Self {
            latch,
            worker: Some(worker),
        }
    }

    pub fn cancel(&mut self) {
        self.latch.trip();
        reap_worker(&mut self.worker, "poll timer");
    }
}

impl Drop for PollTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// One-shot fade for a result marker: runs `action` after the delay unless
/// cancelled first. `cancel` only trips the latch; the worker is reaped on
/// drop.
pub struct FadeTimer {
    latch: Arc<Latch>,
    worker: Option<thread::JoinHandle<()>>,
}

impl FadeTimer {
    pub fn after<F>(delay: Duration, action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let latch = Latch::new();
        let worker_latch = Arc::clone(&latch);
        let worker = thread::spawn(move || {
            if !worker_latch.tripped_before(Instant::now() + delay) {
                action();
            }
        });

        Self {
            latch,
            worker: Some(worker),
        }
    }

    pub fn cancel(&self) {
        self.latch.trip();
    }
}

impl Drop for FadeTimer {
    fn drop(&mut self) {
        self.latch.trip();
        reap_worker(&mut self.worker, "fade timer");
    }
}

fn reap_worker(worker: &mut Option<thread::JoinHandle<()>>, name: &str) {
    if let Some(worker) = worker.take() {
        if worker.thread().id() == thread::current().id() {
            warn!("not joining the {name}; it was cancelled from its own thread");
            return;
        }

        if worker.join().is_err() {
            warn!("the {name} worker panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn poll_timer_ticks_until_cancelled() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let mut timer = PollTimer::arm(Duration::from_millis(20), move || {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        thread::sleep(Duration::from_millis(200));
        timer.cancel();
        let after_cancel = ticks.load(Ordering::Relaxed);
        assert!(after_cancel >= 2, "expected several ticks, got {after_cancel}");

        thread::sleep(Duration::from_millis(100));
        assert_eq!(
            ticks.load(Ordering::Relaxed),
            after_cancel,
            "cancelled timer kept ticking"
        );
    }

    #[test]
    fn dropping_a_poll_timer_stops_it() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let timer = PollTimer::arm(Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        thread::sleep(Duration::from_millis(60));
        drop(timer);
        let after_drop = ticks.load(Ordering::Relaxed);
        thread::sleep(Duration::from_millis(60));
        assert_eq!(ticks.load(Ordering::Relaxed), after_drop);
    }

    #[test]
    fn cancelling_wakes_a_sleeping_worker_immediately() {
        let started = Instant::now();
        let mut timer = PollTimer::arm(Duration::from_secs(600), || {});
        timer.cancel();
        assert!(
            started.elapsed() < Duration::from_secs(5),
            "cancel waited out the period"
        );
    }

    #[test]
    fn fade_timer_fires_once_after_the_delay() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let _timer = FadeTimer::after(Duration::from_millis(30), move || {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        assert_eq!(fired.load(Ordering::Relaxed), 0);
        thread::sleep(Duration::from_millis(150));
        assert_eq!(fired.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn cancelled_fade_timer_never_fires() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let timer = FadeTimer::after(Duration::from_millis(50), move || {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        timer.cancel();
        thread::sleep(Duration::from_millis(150));
        assert_eq!(fired.load(Ordering::Relaxed), 0);
    }
}
