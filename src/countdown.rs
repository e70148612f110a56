use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::runtime::AppEvent;

pub const COUNTDOWN_PERIOD: Duration = Duration::from_secs(1);

/// Identity of one periodic countdown timer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

impl TimerId {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// A running periodic timer. Cancelling more than once is a no-op.
pub trait TimerHandle: Send {
    fn id(&self) -> TimerId;
    fn cancel(&mut self);
}

/// Emits `AppEvent::Countdown(id)` every period from a background thread.
#[derive(Debug)]
pub struct CountdownTimer {
    id: TimerId,
    cancelled: Arc<AtomicBool>,
}

impl CountdownTimer {
    pub fn spawn(id: TimerId, period: Duration, tx: Sender<AppEvent>) -> Self {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        thread::spawn(move || loop {
            thread::sleep(period);
            if flag.load(Ordering::Acquire) {
                break;
            }
            if tx.send(AppEvent::Countdown(id)).is_err() {
                break;
            }
        });

        Self { id, cancelled }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl TimerHandle for CountdownTimer {
    fn id(&self) -> TimerId {
        self.id
    }

    fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
