use std::thread;
use std::time::Duration;

use chrono::{DateTime, Local};

pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Local>;
    fn sleep(&self, duration: Duration);
}

pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}
