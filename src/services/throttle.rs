use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThrottleScope {
    Dataroom,
    Meeting,
}

/// Per-user request throttles, one window per scope.
#[derive(Clone)]
pub struct Throttles {
    last_seen: Arc<DashMap<(ThrottleScope, Uuid), DateTime<Utc>>>,
    dataroom_window: Duration,
    meeting_window: Duration,
}

impl Throttles {
    pub fn new(dataroom_secs: u64, meeting_secs: u64) -> Self {
        Self {
            last_seen: Arc::new(DashMap::new()),
            dataroom_window: Duration::seconds(dataroom_secs as i64),
            meeting_window: Duration::seconds(meeting_secs as i64),
        }
    }

    fn window(&self, scope: ThrottleScope) -> Duration {
        match scope {
            ThrottleScope::Dataroom => self.dataroom_window,
            ThrottleScope::Meeting => self.meeting_window,
        }
    }

    /// Records a request at `now`, or fails with `RateLimited(seconds to wait)`
    /// when the previous accepted request is still inside the window.
    pub fn acquire(&self, scope: ThrottleScope, user_id: Uuid, now: DateTime<Utc>) -> Result<(), AppError> {
        let window = self.window(scope);
        if window <= Duration::zero() {
            return Ok(());
        }
        match self.last_seen.entry((scope, user_id)) {
            Entry::Occupied(mut entry) => {
                let elapsed = now - *entry.get();
                if elapsed < window {
                    let wait = (window - elapsed).num_milliseconds();
                    // round up to whole seconds
                    return Err(AppError::RateLimited(((wait + 999) / 1000) as u64));
                }
                entry.insert(now);
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
            }
        }
        Ok(())
    }

    /// Drop entries whose window has passed.
    pub fn cleanup_expired(&self, now: DateTime<Utc>) {
        let (dataroom, meeting) = (self.dataroom_window, self.meeting_window);
        self.last_seen.retain(|(scope, _), at| {
            let window = match scope {
                ThrottleScope::Dataroom => dataroom,
                ThrottleScope::Meeting => meeting,
            };
            now - *at < window
        });
    }

    pub fn len(&self) -> usize {
        self.last_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_request_inside_window_is_limited() {
        let throttles = Throttles::new(60, 10);
        let user = Uuid::new_v4();
        let t0 = Utc::now();

        throttles.acquire(ThrottleScope::Dataroom, user, t0).unwrap();
        let err = throttles
            .acquire(ThrottleScope::Dataroom, user, t0 + Duration::seconds(20))
            .unwrap_err();
        assert!(matches!(err, AppError::RateLimited(40)));

        // other scopes and users are independent
        throttles.acquire(ThrottleScope::Meeting, user, t0).unwrap();
        throttles.acquire(ThrottleScope::Dataroom, Uuid::new_v4(), t0).unwrap();

        throttles
            .acquire(ThrottleScope::Dataroom, user, t0 + Duration::seconds(60))
            .unwrap();
    }

    #[test]
    fn test_zero_window_disables_throttle() {
        let throttles = Throttles::new(0, 0);
        let user = Uuid::new_v4();
        let t0 = Utc::now();
        throttles.acquire(ThrottleScope::Meeting, user, t0).unwrap();
        throttles.acquire(ThrottleScope::Meeting, user, t0).unwrap();
        assert!(throttles.is_empty());
    }

    #[test]
    fn test_cleanup_expired() {
        let throttles = Throttles::new(60, 10);
        let t0 = Utc::now();
        throttles.acquire(ThrottleScope::Dataroom, Uuid::new_v4(), t0).unwrap();
        throttles.acquire(ThrottleScope::Meeting, Uuid::new_v4(), t0).unwrap();

        throttles.cleanup_expired(t0 + Duration::seconds(30));
        assert_eq!(throttles.len(), 1);
    }
}
