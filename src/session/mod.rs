//! Session lock state machine.
//!
//! A session starts `Unlocked`.  After `idle_timeout` without activity
//! it becomes `Locked`; the UI then moves it to `Reauthenticating` while
//! it prompts for the master passphrase.  Only a matching passphrase
//! returns it to `Unlocked`.
//!
//! ```text
//! Unlocked --idle--> Locked --begin_reauth--> Reauthenticating
//!     ^                                         |   |      |
//!     +------------- correct passphrase --------+   |   cancel -> exit
//!                                     wrong passphrase (stay)
//! ```
//!
//! The session never touches the vault file.  Every time-dependent
//! method has an `_at(now)` form so callers and tests can drive the
//! clock themselves.

pub mod watcher;

use std::time::{Duration, Instant};

use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::errors::{LockaError, Result};

pub use watcher::IdleWatcher;

/// Default idle timeout before the session locks.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(120);

/// Default interval at which the idle timer is checked.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default pause between locking and showing the passphrase prompt.
pub const DEFAULT_REAUTH_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    Locked,
    Reauthenticating,
}

/// Emitted by [`Session::tick_at`] on the transition into `Locked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockEvent {
    Locked,
}

/// What the UI should do after the user answers (or declines) the
/// unlock prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReauthOutcome {
    Unlocked,
    Retry,
    Exit,
}

/// Snapshot of the session flags for display/debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    pub locked: bool,
    pub unlocking: bool,
    pub last_activity: Instant,
}

/// Idle-lock state for one unlocked vault.
pub struct Session {
    state: LockState,
    last_activity: Instant,
    idle_timeout: Duration,
    passphrase: Zeroizing<String>,
}

impl Session {
    /// Start an unlocked session for a vault opened with `passphrase`.
    pub fn new(passphrase: &str, idle_timeout: Duration) -> Self {
        Self::new_at(passphrase, idle_timeout, Instant::now())
    }

    pub fn new_at(passphrase: &str, idle_timeout: Duration, now: Instant) -> Self {
        Self {
            state: LockState::Unlocked,
            last_activity: now,
            idle_timeout,
            passphrase: Zeroizing::new(passphrase.to_string()),
        }
    }

    // ------------------------------------------------------------------
    // State queries
    // ------------------------------------------------------------------

    pub fn state(&self) -> LockState {
        self.state
    }

    /// `true` in both `Locked` and `Reauthenticating`.
    pub fn is_locked(&self) -> bool {
        self.state != LockState::Unlocked
    }

    pub fn snapshot(&self) -> SessionState {
        SessionState {
            locked: self.is_locked(),
            unlocking: self.state == LockState::Reauthenticating,
            last_activity: self.last_activity,
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Time left before the session locks, or zero once it has.
    pub fn remaining_at(&self, now: Instant) -> Duration {
        if self.is_locked() {
            return Duration::ZERO;
        }
        self.idle_timeout
            .saturating_sub(now.saturating_duration_since(self.last_activity))
    }

    /// The single gate every record query and mutation passes through.
    pub fn gate(&self) -> Result<()> {
        match self.state {
            LockState::Unlocked => Ok(()),
            LockState::Locked | LockState::Reauthenticating => Err(LockaError::SessionLocked),
        }
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Record user activity.  Ignored unless unlocked, so input while
    /// locked can never clear the lock or reset the timer.
    pub fn touch_activity(&mut self) {
        self.touch_activity_at(Instant::now());
    }

    pub fn touch_activity_at(&mut self, now: Instant) {
        if self.state == LockState::Unlocked {
            self.last_activity = now;
        }
    }

    /// Check the idle timer.
    pub fn tick(&mut self) -> Option<LockEvent> {
        self.tick_at(Instant::now())
    }

    /// Lock if `idle_timeout` has elapsed since the last activity.
    ///
    /// Returns `Some` only on the tick that performs the transition.
    pub fn tick_at(&mut self, now: Instant) -> Option<LockEvent> {
        if self.state != LockState::Unlocked {
            return None;
        }
        if now.saturating_duration_since(self.last_activity) >= self.idle_timeout {
            self.state = LockState::Locked;
            return Some(LockEvent::Locked);
        }
        None
    }

    /// Lock immediately, e.g. on an explicit user request.
    pub fn lock(&mut self) -> Option<LockEvent> {
        if self.state == LockState::Unlocked {
            self.state = LockState::Locked;
            return Some(LockEvent::Locked);
        }
        None
    }

    /// The UI is about to prompt for the passphrase.
    pub fn begin_reauth(&mut self) {
        if self.state == LockState::Locked {
            self.state = LockState::Reauthenticating;
        }
    }

    /// Compare `passphrase` with the one this session was opened with.
    ///
    /// On a match the session unlocks and the idle timer restarts.  A
    /// wrong passphrase leaves the state and the timer untouched.
    pub fn authenticate(&mut self, passphrase: &str) -> bool {
        self.authenticate_at(passphrase, Instant::now())
    }

    pub fn authenticate_at(&mut self, passphrase: &str, now: Instant) -> bool {
        let matches: bool = passphrase
            .as_bytes()
            .ct_eq(self.passphrase.as_bytes())
            .into();
        if matches {
            self.state = LockState::Unlocked;
            self.last_activity = now;
        }
        matches
    }

    /// Handle the answer to the unlock prompt; `None` means the user
    /// cancelled.
    pub fn answer_reauth(&mut self, answer: Option<&str>) -> ReauthOutcome {
        self.answer_reauth_at(answer, Instant::now())
    }

    pub fn answer_reauth_at(&mut self, answer: Option<&str>, now: Instant) -> ReauthOutcome {
        match answer {
            None => self.cancel_reauth(),
            Some(pw) if self.authenticate_at(pw, now) => ReauthOutcome::Unlocked,
            Some(_) => ReauthOutcome::Retry,
        }
    }

    /// The user declined to enter a passphrase: the application exits.
    pub fn cancel_reauth(&mut self) -> ReauthOutcome {
        ReauthOutcome::Exit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(now: Instant) -> Session {
        Session::new_at("correct-horse", Duration::from_secs(120), now)
    }

    #[test]
    fn stays_unlocked_before_timeout() {
        let t0 = Instant::now();
        let mut s = session(t0);
        assert_eq!(s.tick_at(t0 + Duration::from_secs(119)), None);
        assert_eq!(s.state(), LockState::Unlocked);
        assert!(s.gate().is_ok());
    }

    #[test]
    fn locks_once_at_timeout() {
        let t0 = Instant::now();
        let mut s = session(t0);
        assert_eq!(s.tick_at(t0 + Duration::from_secs(120)), Some(LockEvent::Locked));
        assert_eq!(s.tick_at(t0 + Duration::from_secs(121)), None);
        assert!(s.is_locked());
        assert!(matches!(s.gate(), Err(LockaError::SessionLocked)));
        assert_eq!(s.remaining_at(t0 + Duration::from_secs(121)), Duration::ZERO);
    }

    #[test]
    fn snapshot_reports_flags() {
        let t0 = Instant::now();
        let mut s = session(t0);
        s.lock();
        s.begin_reauth();
        let snap = s.snapshot();
        assert!(snap.locked);
        assert!(snap.unlocking);
        assert_eq!(snap.last_activity, t0);
    }

    #[test]
    fn cancel_exits() {
        let mut s = session(Instant::now());
        s.lock();
        s.begin_reauth();
        assert_eq!(s.answer_reauth(None), ReauthOutcome::Exit);
        assert!(s.is_locked());
    }
}
