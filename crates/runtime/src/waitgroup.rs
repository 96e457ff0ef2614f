//! A counter plus one-shot notify, used by shutdown paths that must wait
//! for in-flight tasks to reach zero before freeing shared state.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Clone, Debug, Default)]
pub struct WaitGroup {
    count: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl WaitGroup {
    pub fn new() -> Self {
        WaitGroup {
            count: Arc::new(AtomicUsize::new(0)),
            idle: Arc::new(Notify::new()),
        }
    }

    pub fn add(&self, n: usize) {
        self.count.fetch_add(n, Ordering::SeqCst);
    }

    /// Mark one unit of work done, waking any waiter if the count reaches 0.
    pub fn done(&self) {
        let previous = self.count.fetch_sub(1, Ordering::SeqCst);
        if previous == 1 {
            self.idle.notify_waiters();
        }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Suspend until the count reaches 0. Safe to call concurrently with
    /// `add`/`done`: if the count is already 0 this returns immediately.
    pub async fn wait(&self) {
        loop {
            if self.count() == 0 {
                return;
            }
            let notified = self.idle.notified();
            if self.count() == 0 {
                return;
            }
            notified.await;
        }
    }
}
