//! Background idle timer.
//!
//! Spawns a thread that ticks a shared [`Session`] every poll interval
//! and calls `on_lock` when it transitions to `Locked`.  The thread
//! exits promptly once [`IdleWatcher::stop`] is called or the watcher
//! is dropped; no timer outlives its owner.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::{LockEvent, Session};

pub struct IdleWatcher {
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl IdleWatcher {
    /// Start polling `session` every `interval`.
    pub fn spawn<F>(session: Arc<Mutex<Session>>, interval: Duration, mut on_lock: F) -> Self
    where
        F: FnMut(LockEvent) + Send + 'static,
    {
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);

        let handle = thread::spawn(move || loop {
            thread::park_timeout(interval);

            if flag.load(Ordering::Relaxed) {
                break;
            }

            let event = match session.lock() {
                Ok(mut guard) => guard.tick(),
                Err(_) => break,
            };

            if let Some(event) = event {
                on_lock(event);
            }
        });

        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// Stop the timer and wait for its thread to finish.
    pub fn stop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for IdleWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn fires_on_lock_and_stops_cleanly() {
        let session = Arc::new(Mutex::new(Session::new("pw", Duration::from_millis(20))));
        let (tx, rx) = mpsc::channel();

        let mut watcher = IdleWatcher::spawn(
            Arc::clone(&session),
            Duration::from_millis(5),
            move |event| {
                let _ = tx.send(event);
            },
        );

        let event = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(event, LockEvent::Locked);
        assert!(session.lock().unwrap().is_locked());

        watcher.stop();
        assert!(!watcher.is_running());
    }

    #[test]
    fn drop_joins_thread() {
        let session = Arc::new(Mutex::new(Session::new("pw", Duration::from_secs(60))));
        let watcher = IdleWatcher::spawn(Arc::clone(&session), Duration::from_secs(60), |_| {});
        drop(watcher);
        // Only the test's handle remains once the thread has exited.
        assert_eq!(Arc::strong_count(&session), 1);
    }
}
