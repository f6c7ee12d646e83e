//! Idle-lock behaviour driven with simulated time, plus one real-time
//! check of the background watcher.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use locka::session::{IdleWatcher, LockEvent, LockState, ReauthOutcome, Session};

const TIMEOUT: Duration = Duration::from_secs(120);

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

#[test]
fn activity_before_timeout_restarts_the_countdown() {
    let t0 = Instant::now();
    let mut s = Session::new_at("pw", TIMEOUT, t0);

    s.touch_activity_at(t0 + secs(100));
    assert_eq!(s.tick_at(t0 + secs(150)), None);
    assert_eq!(s.remaining_at(t0 + secs(150)), secs(70));
    assert_eq!(s.tick_at(t0 + secs(220)), Some(LockEvent::Locked));
    assert_eq!(s.state(), LockState::Locked);
}

#[test]
fn lock_event_fires_once() {
    let t0 = Instant::now();
    let mut s = Session::new_at("pw", TIMEOUT, t0);

    assert_eq!(s.tick_at(t0 + TIMEOUT), Some(LockEvent::Locked));
    assert_eq!(s.tick_at(t0 + TIMEOUT + secs(1)), None);
    assert_eq!(s.tick_at(t0 + TIMEOUT + secs(500)), None);
}

#[test]
fn activity_while_locked_is_ignored() {
    let t0 = Instant::now();
    let mut s = Session::new_at("pw", TIMEOUT, t0);
    s.tick_at(t0 + TIMEOUT);

    s.touch_activity_at(t0 + secs(200));
    assert!(s.is_locked());
    assert_eq!(s.snapshot().last_activity, t0);

    s.begin_reauth();
    s.touch_activity_at(t0 + secs(201));
    assert_eq!(s.state(), LockState::Reauthenticating);
    assert_eq!(s.snapshot().last_activity, t0);
}

#[test]
fn wrong_passphrase_keeps_lock_and_timer() {
    let t0 = Instant::now();
    let mut s = Session::new_at("correct-horse", TIMEOUT, t0);
    s.tick_at(t0 + TIMEOUT);
    s.begin_reauth();

    assert_eq!(
        s.answer_reauth_at(Some("wrong"), t0 + secs(300)),
        ReauthOutcome::Retry
    );
    assert_eq!(s.state(), LockState::Reauthenticating);
    assert_eq!(s.snapshot().last_activity, t0);
    assert!(s.gate().is_err());
}

#[test]
fn correct_passphrase_unlocks_and_restarts_timer() {
    let t0 = Instant::now();
    let mut s = Session::new_at("correct-horse", TIMEOUT, t0);
    s.tick_at(t0 + TIMEOUT);
    s.begin_reauth();

    let t1 = t0 + secs(400);
    assert_eq!(
        s.answer_reauth_at(Some("correct-horse"), t1),
        ReauthOutcome::Unlocked
    );
    assert!(s.gate().is_ok());
    assert_eq!(s.tick_at(t1 + secs(119)), None);
    assert_eq!(s.tick_at(t1 + TIMEOUT), Some(LockEvent::Locked));
}

#[test]
fn cancelled_prompt_means_exit() {
    let t0 = Instant::now();
    let mut s = Session::new_at("pw", TIMEOUT, t0);
    s.tick_at(t0 + TIMEOUT);
    s.begin_reauth();

    assert_eq!(s.answer_reauth_at(None, t0 + secs(121)), ReauthOutcome::Exit);
    assert!(s.is_locked());
}

#[test]
fn watcher_locks_an_idle_session() {
    let session = Arc::new(Mutex::new(Session::new("pw", Duration::from_millis(50))));
    let (tx, rx) = mpsc::channel();

    let mut watcher = IdleWatcher::spawn(
        Arc::clone(&session),
        Duration::from_millis(10),
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
