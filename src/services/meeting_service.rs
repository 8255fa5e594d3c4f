use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::external::calendar::{CalendarEvent, CalendarProvider};
use crate::external::identity::IdentityProvider;
use crate::models::{Meeting, Role, ScheduleMeeting, User, DEFAULT_MEETING_TITLE};
use crate::services::profile_service;
use crate::store::{scheduling_conflict, MeetingFilter, Store};

/// Calendar side of a booking: the provider plus the identity provider used
/// to turn the investor's refresh token into an access token.
pub struct CalendarBooking<'a> {
    pub identity: &'a dyn IdentityProvider,
    pub calendar: &'a dyn CalendarProvider,
}

struct BookedEvent<'a> {
    calendar: &'a dyn CalendarProvider,
    access_token: String,
    event_id: String,
}

async fn book_calendar<'a>(
    booking: &CalendarBooking<'a>,
    investor: &User,
    startup: &User,
    meeting: &Meeting,
) -> Result<BookedEvent<'a>, AppError> {
    let refresh_token = investor
        .refresh_token
        .as_deref()
        .ok_or_else(|| AppError::Validation("Investor does not have a valid refresh token".into()))?;

    let access_token = booking
        .identity
        .refresh_access_token(refresh_token)
        .await
        .map_err(|e| AppError::External(format!("Error refreshing access token: {}", e)))?;

    let free = booking
        .calendar
        .is_free(&access_token, meeting.start_time, meeting.end_time)
        .await
        .map_err(|e| AppError::External(format!("Error checking calendar availability: {}", e)))?;
    if !free {
        return Err(AppError::Conflict(
            "The requested time slot is not available for the investor".into(),
        ));
    }

    let event = CalendarEvent {
        summary: meeting.title.clone(),
        description: meeting.description.clone(),
        start: meeting.start_time,
        end: meeting.end_time,
        attendees: vec![startup.email.clone()],
    };
    let event_id = booking
        .calendar
        .create_event(&access_token, &event)
        .await
        .map_err(|e| AppError::External(format!("Error scheduling investor-startup meeting: {}", e)))?;

    Ok(BookedEvent {
        calendar: booking.calendar,
        access_token,
        event_id,
    })
}

/// Book a meeting between an investor and a startup.
///
/// Neither party may already have a meeting overlapping `[start, end)`. The
/// overlap check is repeated atomically by the store when the meeting is
/// written; if that final write fails, a calendar event created for it is
/// cancelled.
pub async fn schedule(
    store: &dyn Store,
    booking: Option<CalendarBooking<'_>>,
    investor_id: Uuid,
    startup_id: Uuid,
    input: ScheduleMeeting,
) -> Result<Meeting, AppError> {
    if input.start_time >= input.end_time {
        return Err(AppError::Validation("end_time must be after start_time".into()));
    }
    let now = Utc::now();
    if input.start_time <= now {
        return Err(AppError::Validation("Meetings can only be scheduled in the future".into()));
    }

    let investor = profile_service::require(store, investor_id, Role::Investor).await?;
    let startup = profile_service::require(store, startup_id, Role::Startup).await?;

    let clashes = store
        .find_overlapping_meetings(investor_id, startup_id, input.start_time, input.end_time)
        .await?;
    if !clashes.is_empty() {
        return Err(scheduling_conflict());
    }

    let mut meeting = Meeting {
        id: Uuid::new_v4(),
        investor_id,
        startup_id,
        title: input
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MEETING_TITLE.to_string()),
        description: input.description.unwrap_or_default(),
        start_time: input.start_time,
        end_time: input.end_time,
        calendar_event_id: None,
        created_at: now,
    };

    let booked = match &booking {
        Some(b) => Some(book_calendar(b, &investor, &startup, &meeting).await?),
        None => None,
    };
    meeting.calendar_event_id = booked.as_ref().map(|b| b.event_id.clone());

    match store.insert_meeting(&meeting).await {
        Ok(saved) => {
            info!(
                "Meeting {} scheduled: investor {} with startup {} at {}",
                saved.id, investor_id, startup_id, saved.start_time
            );
            Ok(saved)
        }
        Err(e) => {
            if let Some(b) = booked {
                if let Err(cleanup) = b.calendar.delete_event(&b.access_token, &b.event_id).await {
                    warn!("Failed to cancel orphaned calendar event {}: {}", b.event_id, cleanup);
                }
            }
            Err(e)
        }
    }
}

pub async fn list_for_investor(store: &dyn Store, investor_id: Uuid) -> Result<Vec<Meeting>, AppError> {
    profile_service::require(store, investor_id, Role::Investor).await?;
    store
        .list_meetings(MeetingFilter {
            investor_id: Some(investor_id),
            ..Default::default()
        })
        .await
}

pub async fn list_for_startup(store: &dyn Store, startup_id: Uuid) -> Result<Vec<Meeting>, AppError> {
    profile_service::require(store, startup_id, Role::Startup).await?;
    store
        .list_meetings(MeetingFilter {
            startup_id: Some(startup_id),
            ..Default::default()
        })
        .await
}

pub async fn list_all(store: &dyn Store) -> Result<Vec<Meeting>, AppError> {
    store.list_meetings(MeetingFilter::default()).await
}

pub async fn delete(store: &dyn Store, meeting_id: Uuid) -> Result<(), AppError> {
    match store.delete_meeting(meeting_id).await? {
        0 => Err(AppError::NotFound(format!("Meeting with id {} does not exist", meeting_id))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::fakes::{CalendarScript, ScriptedCalendar, StaticIdentity};
    use crate::models::RoleProfile;
    use crate::store::{MemoryStore, UserStore};
    use chrono::{DateTime, Duration};

    async fn parties(store: &MemoryStore) -> (User, User) {
        let mut investor = User::new("ivy@example.com".into(), "Ivy".into(), RoleProfile::default_for(Role::Investor, ""));
        investor.refresh_token = Some("rt-ivy".into());
        let startup = User::new("acme@example.com".into(), "Acme".into(), RoleProfile::default_for(Role::Startup, "Acme"));
        store.insert_user(&investor).await.unwrap();
        store.insert_user(&startup).await.unwrap();
        (investor, startup)
    }

    fn slot(start: DateTime<Utc>, minutes: i64) -> ScheduleMeeting {
        ScheduleMeeting {
            start_time: start,
            end_time: start + Duration::minutes(minutes),
            title: None,
            description: None,
        }
    }

    #[tokio::test]
    async fn test_overlapping_slot_is_a_conflict() {
        let store = MemoryStore::new();
        let (investor, startup) = parties(&store).await;
        let t0 = Utc::now() + Duration::days(2);

        let first = schedule(&store, None, investor.id, startup.id, slot(t0, 60)).await.unwrap();
        assert_eq!(first.title, DEFAULT_MEETING_TITLE);

        let err = schedule(&store, None, investor.id, startup.id, slot(t0 + Duration::minutes(30), 60))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // back-to-back is allowed
        schedule(&store, None, investor.id, startup.id, slot(t0 + Duration::minutes(60), 30))
            .await
            .unwrap();
        assert_eq!(list_for_investor(&store, investor.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_time_validation() {
        let store = MemoryStore::new();
        let (investor, startup) = parties(&store).await;

        let past = slot(Utc::now() - Duration::hours(1), 30);
        assert!(matches!(
            schedule(&store, None, investor.id, startup.id, past).await,
            Err(AppError::Validation(_))
        ));

        let t0 = Utc::now() + Duration::days(1);
        let inverted = ScheduleMeeting {
            start_time: t0,
            end_time: t0,
            title: None,
            description: None,
        };
        assert!(matches!(
            schedule(&store, None, investor.id, startup.id, inverted).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_calendar_event_is_created_for_startup() {
        let store = MemoryStore::new();
        let (investor, startup) = parties(&store).await;
        let identity = StaticIdentity::new();
        let calendar = ScriptedCalendar::new(CalendarScript::Free);
        let booking = CalendarBooking {
            identity: &identity,
            calendar: &calendar,
        };

        let meeting = schedule(&store, Some(booking), investor.id, startup.id, slot(Utc::now() + Duration::days(1), 45))
            .await
            .unwrap();

        let created = calendar.created();
        assert_eq!(created.len(), 1);
        assert_eq!(meeting.calendar_event_id.as_deref(), Some(created[0].0.as_str()));
        assert_eq!(created[0].1.attendees, vec![startup.email.clone()]);
    }

    #[tokio::test]
    async fn test_busy_or_failing_calendar_persists_nothing() {
        let store = MemoryStore::new();
        let (investor, startup) = parties(&store).await;
        let identity = StaticIdentity::new();
        let calendar = ScriptedCalendar::new(CalendarScript::Busy);
        let start = Utc::now() + Duration::days(1);

        let booking = CalendarBooking { identity: &identity, calendar: &calendar };
        let err = schedule(&store, Some(booking), investor.id, startup.id, slot(start, 30)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        calendar.set_script(CalendarScript::Unavailable);
        let booking = CalendarBooking { identity: &identity, calendar: &calendar };
        let err = schedule(&store, Some(booking), investor.id, startup.id, slot(start, 30)).await.unwrap_err();
        assert!(matches!(err, AppError::External(_)));

        assert!(list_all(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_refresh_token_is_rejected() {
        let store = MemoryStore::new();
        let (_, startup) = parties(&store).await;
        let no_token = User::new("bob@example.com".into(), "Bob".into(), RoleProfile::default_for(Role::Investor, ""));
        store.insert_user(&no_token).await.unwrap();
        let identity = StaticIdentity::new();
        let calendar = ScriptedCalendar::new(CalendarScript::Free);

        let booking = CalendarBooking { identity: &identity, calendar: &calendar };
        let err = schedule(&store, Some(booking), no_token.id, startup.id, slot(Utc::now() + Duration::days(1), 30))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_party_is_not_found() {
        let store = MemoryStore::new();
        let (investor, _) = parties(&store).await;
        let err = schedule(&store, None, investor.id, Uuid::new_v4(), slot(Utc::now() + Duration::days(1), 30))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
