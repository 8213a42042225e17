use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::dto::activation_dto::ActivationStatusResponse;
use crate::error::{Error, Result};
use crate::models::user::User;
use crate::services::user_service::UserService;
use crate::utils::crypto::secrets_match;

#[derive(Debug, Clone, Default)]
struct AttemptState {
    failures: u32,
    locked_until: Option<DateTime<Utc>>,
}

/// Per-user failed activation attempts, kept in memory.
#[derive(Debug, Clone)]
pub struct AttemptTracker {
    max_attempts: u32,
    lockout: Duration,
    state: Arc<Mutex<HashMap<Uuid, AttemptState>>>,
}

impl AttemptTracker {
    pub fn new(max_attempts: u32, lockout_minutes: i64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            lockout: Duration::minutes(lockout_minutes.max(1)),
            state: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut HashMap<Uuid, AttemptState>) -> R) -> R {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    /// `Some(until)` while the user is locked out at `now`.
    pub fn locked_until(&self, user: Uuid, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.with_state(|map| {
            map.get(&user)
                .and_then(|s| s.locked_until)
                .filter(|until| *until > now)
        })
    }

    pub fn attempts_left(&self, user: Uuid, now: DateTime<Utc>) -> u32 {
        if self.locked_until(user, now).is_some() {
            return 0;
        }
        self.with_state(|map| {
            let failures = map.get(&user).map(|s| s.failures).unwrap_or(0);
            self.max_attempts.saturating_sub(failures)
        })
    }

    /// Counts a failure. Reaching the limit starts a lockout and resets the
    /// counter for the next window. Returns the attempts left.
    pub fn record_failure(&self, user: Uuid, now: DateTime<Utc>) -> u32 {
        let max = self.max_attempts;
        let lockout = self.lockout;
        self.with_state(|map| {
            let entry = map.entry(user).or_default();
            if entry.locked_until.is_some_and(|until| until <= now) {
                entry.locked_until = None;
            }
            entry.failures += 1;
            if entry.failures >= max {
                entry.failures = 0;
                entry.locked_until = Some(now + lockout);
                0
            } else {
                max - entry.failures
            }
        })
    }

    pub fn clear(&self, user: Uuid) {
        self.with_state(|map| {
            map.remove(&user);
        });
    }
}

#[derive(Clone)]
pub struct ActivationService {
    users: UserService,
    codes: Vec<String>,
    tracker: AttemptTracker,
}

/// What happened on a successful `activate` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    Activated,
    AlreadyActive,
}

impl ActivationService {
    pub fn new(users: UserService, codes: Vec<String>, tracker: AttemptTracker) -> Self {
        Self {
            users,
            codes,
            tracker,
        }
    }

    /// With no codes configured the gate is open for everyone.
    fn is_active(&self, user: &User) -> bool {
        self.codes.is_empty() || user.activated_at.is_some()
    }

    pub fn status(&self, user: &User) -> ActivationStatusResponse {
        let now = Utc::now();
        ActivationStatusResponse {
            activated: self.is_active(user),
            attempts_left: self.tracker.attempts_left(user.id, now),
            locked_until: self.tracker.locked_until(user.id, now),
        }
    }

    fn code_matches(&self, code: &str) -> bool {
        // No short-circuit: every configured code is compared.
        self.codes
            .iter()
            .fold(false, |found, expected| secrets_match(code, expected) | found)
    }

    pub async fn activate(&self, user: &User, code: &str) -> Result<ActivationOutcome> {
        if self.is_active(user) {
            return Ok(ActivationOutcome::AlreadyActive);
        }
        let code = code.trim();
        if code.is_empty() {
            return Err(Error::BadRequest("Activation code is required".into()));
        }

        let now = Utc::now();
        if self.tracker.locked_until(user.id, now).is_some() {
            return Err(Error::TooManyRequests(
                "Too many failed attempts. Try again later".into(),
            ));
        }

        if !self.code_matches(code) {
            let left = self.tracker.record_failure(user.id, now);
            tracing::warn!(user_id = %user.id, attempts_left = left, "invalid activation code");
            if left == 0 {
                return Err(Error::TooManyRequests(
                    "Too many failed attempts. Try again later".into(),
                ));
            }
            return Err(Error::BadRequest(format!(
                "Invalid activation code. {} attempts left",
                left
            )));
        }

        self.users.mark_activated(user.id).await?;
        self.tracker.clear(user.id);
        Ok(ActivationOutcome::Activated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn third_failure_locks_the_user() {
        let tracker = AttemptTracker::new(3, 60);
        let user = Uuid::new_v4();
        let now = Utc::now();
        assert_eq!(tracker.attempts_left(user, now), 3);
        assert_eq!(tracker.record_failure(user, now), 2);
        assert_eq!(tracker.record_failure(user, now), 1);
        assert_eq!(tracker.record_failure(user, now), 0);
        assert_eq!(tracker.locked_until(user, now), Some(now + Duration::minutes(60)));
        assert_eq!(tracker.attempts_left(user, now), 0);
    }

    #[test]
    fn lockout_expires() {
        let tracker = AttemptTracker::new(1, 60);
        let user = Uuid::new_v4();
        let now = Utc::now();
        tracker.record_failure(user, now);
        let later = now + Duration::minutes(61);
        assert!(tracker.locked_until(user, later).is_none());
        assert_eq!(tracker.attempts_left(user, later), 1);
    }

    #[test]
    fn users_are_tracked_separately() {
        let tracker = AttemptTracker::new(3, 60);
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let now = Utc::now();
        tracker.record_failure(a, now);
        assert_eq!(tracker.attempts_left(a, now), 2);
        assert_eq!(tracker.attempts_left(b, now), 3);
        tracker.clear(a);
        assert_eq!(tracker.attempts_left(a, now), 3);
    }
}
