//! In-process stand-ins for the external collaborators. They record what
//! they were asked to do so integration tests can assert on side effects.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::calendar::{CalendarError, CalendarEvent, CalendarProvider};
use super::identity::{IdentityError, IdentityProfile, IdentityProvider, TokenGrant};
use super::notifier::{Email, Notifier};

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Email>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every later delivery reports failure (nothing is recorded).
    pub fn fail_deliveries(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().clone()
    }

    pub fn sent_to(&self, address: &str) -> Vec<Email> {
        self.sent.lock().iter().filter(|e| e.to == address).cloned().collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, email: &Email) -> bool {
        if self.failing.load(Ordering::SeqCst) {
            return false;
        }
        self.sent.lock().push(email.clone());
        true
    }
}

/// Identity provider with a fixed table of authorization codes.
#[derive(Default)]
pub struct StaticIdentity {
    accounts: Mutex<HashMap<String, (IdentityProfile, Option<String>)>>,
}

impl StaticIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(self, code: &str, email: &str, name: &str, refresh_token: Option<&str>) -> Self {
        self.accounts.lock().insert(
            code.to_string(),
            (
                IdentityProfile {
                    email: email.to_string(),
                    name: Some(name.to_string()),
                },
                refresh_token.map(str::to_string),
            ),
        );
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, IdentityError> {
        let accounts = self.accounts.lock();
        let (_, refresh_token) = accounts
            .get(code)
            .ok_or_else(|| IdentityError::BadResponse("invalid_grant".into()))?;
        Ok(TokenGrant {
            access_token: format!("access-{}", code),
            refresh_token: refresh_token.clone(),
        })
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<IdentityProfile, IdentityError> {
        let code = access_token.trim_start_matches("access-");
        self.accounts
            .lock()
            .get(code)
            .map(|(profile, _)| profile.clone())
            .ok_or_else(|| IdentityError::BadResponse("invalid access token".into()))
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> Result<String, IdentityError> {
        Ok(format!("refreshed-{}", refresh_token))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalendarScript {
    #[default]
    Free,
    Busy,
    Unavailable,
}

/// Calendar whose availability answer is scripted.
#[derive(Default)]
pub struct ScriptedCalendar {
    script: Mutex<CalendarScript>,
    created: Mutex<Vec<(String, CalendarEvent)>>,
    deleted: Mutex<Vec<String>>,
}

impl ScriptedCalendar {
    pub fn new(script: CalendarScript) -> Self {
        Self {
            script: Mutex::new(script),
            ..Default::default()
        }
    }

    pub fn set_script(&self, script: CalendarScript) {
        *self.script.lock() = script;
    }

    pub fn created(&self) -> Vec<(String, CalendarEvent)> {
        self.created.lock().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().clone()
    }
}

#[async_trait]
impl CalendarProvider for ScriptedCalendar {
    async fn is_free(&self, _access_token: &str, _start: DateTime<Utc>, _end: DateTime<Utc>) -> Result<bool, CalendarError> {
        match *self.script.lock() {
            CalendarScript::Free => Ok(true),
            CalendarScript::Busy => Ok(false),
            CalendarScript::Unavailable => Err(CalendarError::Network("calendar unreachable".into())),
        }
    }

    async fn create_event(&self, _access_token: &str, event: &CalendarEvent) -> Result<String, CalendarError> {
        let mut created = self.created.lock();
        let id = format!("evt-{}", created.len() + 1);
        created.push((id.clone(), event.clone()));
        Ok(id)
    }

    async fn delete_event(&self, _access_token: &str, event_id: &str) -> Result<(), CalendarError> {
        self.deleted.lock().push(event_id.to_string());
        Ok(())
    }
}
