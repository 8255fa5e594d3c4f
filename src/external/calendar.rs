use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

const CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3";

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    pub summary: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub attendees: Vec<String>,
}

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),
}

/// External calendar of the booking investor. Every call acts on the
/// calendar owned by `access_token`.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    async fn is_free(
        &self,
        access_token: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool, CalendarError>;

    /// Returns the provider's event id.
    async fn create_event(&self, access_token: &str, event: &CalendarEvent) -> Result<String, CalendarError>;

    async fn delete_event(&self, access_token: &str, event_id: &str) -> Result<(), CalendarError>;
}

pub struct GoogleCalendar {
    client: reqwest::Client,
}

impl GoogleCalendar {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for GoogleCalendar {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct FreeBusyResponse {
    calendars: std::collections::HashMap<String, FreeBusyCalendar>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyCalendar {
    #[serde(default)]
    busy: Vec<serde_json::Value>,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct CreatedEvent {
    id: String,
}

fn check_status(resp: &reqwest::Response, what: &str) -> Result<(), CalendarError> {
    match resp.status() {
        s if s.is_success() => Ok(()),
        s if s == reqwest::StatusCode::UNAUTHORIZED => Err(CalendarError::BadResponse(format!(
            "Unauthorized access to Calendar API while {}",
            what
        ))),
        s if s == reqwest::StatusCode::FORBIDDEN => Err(CalendarError::BadResponse(format!(
            "Forbidden access to Calendar API while {}",
            what
        ))),
        s => Err(CalendarError::BadResponse(format!("{} failed with {}", what, s))),
    }
}

#[async_trait]
impl CalendarProvider for GoogleCalendar {
    async fn is_free(
        &self,
        access_token: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool, CalendarError> {
        let body = json!({
            "timeMin": start.to_rfc3339(),
            "timeMax": end.to_rfc3339(),
            "items": [{ "id": "primary" }],
        });

        let resp = self
            .client
            .post(format!("{}/freeBusy", CALENDAR_API))
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| CalendarError::Network(e.to_string()))?;
        check_status(&resp, "checking availability")?;

        let parsed: FreeBusyResponse = resp
            .json()
            .await
            .map_err(|e| CalendarError::Parse(e.to_string()))?;

        let primary = parsed
            .calendars
            .get("primary")
            .ok_or_else(|| CalendarError::BadResponse("free/busy response has no primary calendar".into()))?;
        if !primary.errors.is_empty() {
            return Err(CalendarError::BadResponse(format!("free/busy errors: {:?}", primary.errors)));
        }
        Ok(primary.busy.is_empty())
    }

    async fn create_event(&self, access_token: &str, event: &CalendarEvent) -> Result<String, CalendarError> {
        let attendees: Vec<_> = event.attendees.iter().map(|email| json!({ "email": email })).collect();
        let body = json!({
            "summary": event.summary,
            "description": event.description,
            "start": { "dateTime": event.start.to_rfc3339(), "timeZone": "UTC" },
            "end": { "dateTime": event.end.to_rfc3339(), "timeZone": "UTC" },
            "attendees": attendees,
            "reminders": {
                "useDefault": false,
                "overrides": [
                    { "method": "email", "minutes": 24 * 60 },
                    { "method": "popup", "minutes": 10 },
                ],
            },
        });

        let resp = self
            .client
            .post(format!("{}/calendars/primary/events", CALENDAR_API))
            .query(&[("sendUpdates", "all")])
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| CalendarError::Network(e.to_string()))?;
        check_status(&resp, "scheduling the meeting")?;

        let created: CreatedEvent = resp
            .json()
            .await
            .map_err(|e| CalendarError::Parse(e.to_string()))?;
        Ok(created.id)
    }

    async fn delete_event(&self, access_token: &str, event_id: &str) -> Result<(), CalendarError> {
        let resp = self
            .client
            .delete(format!("{}/calendars/primary/events/{}", CALENDAR_API, event_id))
            .query(&[("sendUpdates", "all")])
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| CalendarError::Network(e.to_string()))?;
        check_status(&resp, "cancelling the meeting")
    }
}
