use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const DEFAULT_MEETING_TITLE: &str = "Investor-Startup Meeting";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Meeting {
    pub id: Uuid,
    pub investor_id: Uuid,
    pub startup_id: Uuid,
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub calendar_event_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Meeting {
    /// Half-open ranges `[start, end)` overlap.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && self.end_time > start
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleMeeting {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub title: Option<String>,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn meeting_at(start: DateTime<Utc>, minutes: i64) -> Meeting {
        Meeting {
            id: Uuid::new_v4(),
            investor_id: Uuid::new_v4(),
            startup_id: Uuid::new_v4(),
            title: DEFAULT_MEETING_TITLE.into(),
            description: String::new(),
            start_time: start,
            end_time: start + Duration::minutes(minutes),
            calendar_event_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_overlap_is_half_open() {
        let t0 = Utc::now();
        let m = meeting_at(t0, 60);
        assert!(m.overlaps(t0 + Duration::minutes(30), t0 + Duration::minutes(90)));
        assert!(m.overlaps(t0 - Duration::minutes(10), t0 + Duration::minutes(10)));
        // back-to-back is fine
        assert!(!m.overlaps(t0 + Duration::minutes(60), t0 + Duration::minutes(120)));
        assert!(!m.overlaps(t0 - Duration::minutes(60), t0));
    }
}
