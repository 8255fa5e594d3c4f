use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::Meeting;

const MEETING_COLUMNS: &str =
    "id, investor_id, startup_id, title, description, start_time, end_time, calendar_event_id, created_at";

pub async fn fetch_filtered(
    pool: &PgPool,
    investor_id: Option<Uuid>,
    startup_id: Option<Uuid>,
    starting_after: Option<DateTime<Utc>>,
) -> Result<Vec<Meeting>, sqlx::Error> {
    sqlx::query_as::<_, Meeting>(&format!(
        "SELECT {MEETING_COLUMNS}
         FROM meetings
         WHERE ($1::uuid IS NULL OR investor_id = $1)
           AND ($2::uuid IS NULL OR startup_id = $2)
           AND ($3::timestamptz IS NULL OR start_time > $3)
         ORDER BY start_time ASC"
    ))
    .bind(investor_id)
    .bind(startup_id)
    .bind(starting_after)
    .fetch_all(pool)
    .await
}

/// Meetings of either party whose `[start_time, end_time)` intersects the range.
pub async fn fetch_overlapping<'e, E>(
    executor: E,
    investor_id: Uuid,
    startup_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<Meeting>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Meeting>(&format!(
        "SELECT {MEETING_COLUMNS}
         FROM meetings
         WHERE (investor_id = $1 OR startup_id = $2)
           AND start_time < $4
           AND end_time > $3
         ORDER BY start_time ASC"
    ))
    .bind(investor_id)
    .bind(startup_id)
    .bind(start)
    .bind(end)
    .fetch_all(executor)
    .await
}

pub async fn insert(conn: &mut PgConnection, meeting: &Meeting) -> Result<Meeting, sqlx::Error> {
    sqlx::query_as::<_, Meeting>(&format!(
        "INSERT INTO meetings ({MEETING_COLUMNS})
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING {MEETING_COLUMNS}"
    ))
    .bind(meeting.id)
    .bind(meeting.investor_id)
    .bind(meeting.startup_id)
    .bind(&meeting.title)
    .bind(&meeting.description)
    .bind(meeting.start_time)
    .bind(meeting.end_time)
    .bind(&meeting.calendar_event_id)
    .bind(meeting.created_at)
    .fetch_one(conn)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM meetings WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
