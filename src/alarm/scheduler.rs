use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Local};
use tracing::{debug, error, info};

use crate::time_provider::TimeSource;

pub const DEFAULT_POLL_SLICE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FireOutcome<T> {
    Fired(T),
    Cancelled,
}

pub struct AlarmScheduler {
    source: Arc<dyn TimeSource>,
    poll_slice: Duration,
}

impl AlarmScheduler {
    pub fn new(source: Arc<dyn TimeSource>) -> Self {
        Self {
            source,
            poll_slice: DEFAULT_POLL_SLICE,
        }
    }

    pub fn with_poll_slice(mut self, poll_slice: Duration) -> Self {
        self.poll_slice = poll_slice.max(Duration::from_millis(1));
        self
    }

    pub fn arm<T, F>(&self, delay: Duration, action: F) -> AlarmHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> io::Result<T> + Send + 'static,
    {
        let step = chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::MAX);
        let now = self.source.now();
        let fire_at = now.checked_add_signed(step).unwrap_or(now);
        let stop = Arc::new(AtomicBool::new(false));

        let source = Arc::clone(&self.source);
        let stop_for_thread = Arc::clone(&stop);
        let poll_slice = self.poll_slice;
        let join = thread::spawn(move || {
            if !wait_until(source.as_ref(), fire_at, poll_slice, &stop_for_thread) {
                debug!("alarm cancelled before firing");
                return Ok(FireOutcome::Cancelled);
            }
            info!(%fire_at, "alarm firing");
            match action() {
                Ok(value) => Ok(FireOutcome::Fired(value)),
                Err(err) => {
                    error!(error = %err, "alarm action failed");
                    Err(err)
                }
            }
        });

        AlarmHandle {
            fire_at,
            stop,
            join: Some(join),
        }
    }
}

fn wait_until(
    source: &dyn TimeSource,
    deadline: DateTime<Local>,
    poll_slice: Duration,
    stop: &AtomicBool,
) -> bool {
    loop {
        if stop.load(Ordering::Relaxed) {
            return false;
        }
        let now = source.now();
        if now >= deadline {
            return !stop.load(Ordering::Relaxed);
        }
        let remaining = (deadline - now).to_std().unwrap_or(Duration::ZERO);
        source.sleep(remaining.min(poll_slice));
    }
}

pub struct AlarmHandle<T> {
    fire_at: DateTime<Local>,
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<io::Result<FireOutcome<T>>>>,
}

impl<T> AlarmHandle<T> {
    pub fn fire_at(&self) -> DateTime<Local> {
        self.fire_at
    }

    pub fn is_finished(&self) -> bool {
        self.join
            .as_ref()
            .map(JoinHandle::is_finished)
            .unwrap_or(true)
    }

    pub fn cancel(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn join(mut self) -> Result<FireOutcome<T>> {
        let join = self
            .join
            .take()
            .ok_or_else(|| anyhow!("alarm thread already joined"))?;
        let outcome = join
            .join()
            .map_err(|_| anyhow!("alarm thread panicked"))?
            .context("alarm action failed")?;
        Ok(outcome)
    }
}

impl<T> Drop for AlarmHandle<T> {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::time_provider::testing::ManualTimeSource;

    fn scheduler(source: &Arc<ManualTimeSource>) -> AlarmScheduler {
        let shared: Arc<dyn TimeSource> = source.clone();
        AlarmScheduler::new(shared)
    }

    #[test]
    fn fires_after_delay_on_virtual_clock() {
        let source = Arc::new(ManualTimeSource::fixed_epoch());
        let start = source.now();
        let handle = scheduler(&source).arm(Duration::from_secs(8 * 3600), || Ok(42));

        assert_eq!(handle.fire_at() - start, chrono::Duration::hours(8));
        assert_eq!(handle.join().expect("join"), FireOutcome::Fired(42));
        assert!(source.now() >= start + chrono::Duration::hours(8));
        assert_eq!(source.sleeps(), 8 * 3600 * 5);
    }

    #[test]
    fn zero_delay_fires_without_sleeping() {
        let source = Arc::new(ManualTimeSource::fixed_epoch());
        let handle = scheduler(&source).arm(Duration::ZERO, || Ok("now"));
        assert_eq!(handle.join().expect("join"), FireOutcome::Fired("now"));
        assert_eq!(source.sleeps(), 0);
    }

    #[test]
    fn action_runs_exactly_once() {
        let source = Arc::new(ManualTimeSource::fixed_epoch());
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_for_action = Arc::clone(&calls);
        let handle = scheduler(&source).arm(Duration::from_secs(5), move || {
            calls_for_action.fetch_add(1, Ordering::Relaxed);
            Ok(())
        });
        handle.join().expect("join");
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn cancel_prevents_action() {
        let source = Arc::new(ManualTimeSource::frozen());
        let ran = Arc::new(Mutex::new(false));
        let ran_for_action = Arc::clone(&ran);
        let handle = scheduler(&source).arm(Duration::from_secs(60), move || {
            *ran_for_action.lock().expect("lock") = true;
            Ok(())
        });

        assert!(!handle.is_finished());
        handle.cancel();
        assert_eq!(handle.join().expect("join"), FireOutcome::Cancelled);
        assert!(!*ran.lock().expect("lock"));
    }

    #[test]
    fn dropping_handle_cancels_pending_alarm() {
        let source = Arc::new(ManualTimeSource::frozen());
        let ran = Arc::new(AtomicBool::new(false));
        let ran_for_action = Arc::clone(&ran);
        let handle = scheduler(&source).arm(Duration::from_secs(60), move || {
            ran_for_action.store(true, Ordering::Relaxed);
            Ok(())
        });
        drop(handle);
        assert!(!ran.load(Ordering::Relaxed));
    }

    #[test]
    fn action_failure_reaches_caller() {
        let source = Arc::new(ManualTimeSource::fixed_epoch());
        let handle = scheduler(&source).arm(Duration::from_secs(1), || -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::NotFound, "nothing to open"))
        });

        let err = handle.join().expect_err("failure should propagate");
        assert!(format!("{err:#}").contains("nothing to open"));
        let io_err = err.downcast_ref::<io::Error>().expect("io error in chain");
        assert_eq!(io_err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn wider_poll_slice_sleeps_less() {
        let source = Arc::new(ManualTimeSource::fixed_epoch());
        let handle = scheduler(&source)
            .with_poll_slice(Duration::from_secs(60))
            .arm(Duration::from_secs(600), || Ok(()));
        handle.join().expect("join");
        assert_eq!(source.sleeps(), 10);
    }
}
