//! Repository seams between the services and the storage engine.
//!
//! Services only ever see `&dyn Store`. `PgStore` is the production engine;
//! `MemoryStore` keeps everything in process and backs the test suite and the
//! `STORAGE_BACKEND=memory` mode.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::dashboard::PlatformStatistics;
use crate::models::{Deal, DealStatus, Investment, Meeting, User};

/// In-place edit applied while the row is exclusively held.
pub type UserEdit<'a> = Box<dyn FnOnce(&mut User) -> Result<(), AppError> + Send + 'a>;
pub type DealEdit<'a> = Box<dyn FnOnce(&mut Deal) -> Result<(), AppError> + Send + 'a>;

#[derive(Debug, Clone, Copy, Default)]
pub struct DealFilter {
    pub startup_id: Option<Uuid>,
    pub status: Option<DealStatus>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InvestmentFilter {
    pub investor_id: Option<Uuid>,
    pub deal_id: Option<Uuid>,
    pub startup_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MeetingFilter {
    pub investor_id: Option<Uuid>,
    pub startup_id: Option<Uuid>,
    pub starting_after: Option<DateTime<Utc>>,
}

/// Everything one committed investment touched, as persisted.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub investment: Investment,
    pub investor: User,
    pub startup: User,
    pub deal: Deal,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Users ordered newest first.
    async fn list_users(&self) -> Result<Vec<User>, AppError>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    /// Fails with `Conflict` when the email is already registered.
    async fn insert_user(&self, user: &User) -> Result<User, AppError>;
    async fn modify_user(&self, id: Uuid, edit: UserEdit<'_>) -> Result<Option<User>, AppError>;
    /// Removes the user and everything that references it.
    async fn delete_user(&self, id: Uuid) -> Result<u64, AppError>;
}

#[async_trait]
pub trait DealStore: Send + Sync {
    /// Deals ordered newest first.
    async fn list_deals(&self, filter: DealFilter) -> Result<Vec<Deal>, AppError>;
    async fn find_deal(&self, id: Uuid) -> Result<Option<Deal>, AppError>;
    async fn insert_deal(&self, deal: &Deal) -> Result<Deal, AppError>;
    async fn modify_deal(&self, id: Uuid, edit: DealEdit<'_>) -> Result<Option<Deal>, AppError>;
    async fn delete_deal(&self, id: Uuid) -> Result<u64, AppError>;
}

#[async_trait]
pub trait InvestmentStore: Send + Sync {
    /// Investments ordered newest first.
    async fn list_investments(&self, filter: InvestmentFilter) -> Result<Vec<Investment>, AppError>;
    async fn find_investment(&self, id: Uuid) -> Result<Option<Investment>, AppError>;
    /// Settle and persist one investment atomically; see `ledger::settle`.
    async fn record_investment(
        &self,
        investor_id: Uuid,
        deal_id: Uuid,
        amount: &BigDecimal,
        fee_rate: &BigDecimal,
    ) -> Result<Settlement, AppError>;
    async fn delete_investment(&self, id: Uuid) -> Result<u64, AppError>;
}

#[async_trait]
pub trait MeetingStore: Send + Sync {
    /// Meetings ordered by start time.
    async fn list_meetings(&self, filter: MeetingFilter) -> Result<Vec<Meeting>, AppError>;
    async fn find_overlapping_meetings(
        &self,
        investor_id: Uuid,
        startup_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Meeting>, AppError>;
    /// Persists the meeting unless either party is already booked in its range,
    /// in which case `Conflict` is returned. Check and insert are atomic.
    async fn insert_meeting(&self, meeting: &Meeting) -> Result<Meeting, AppError>;
    async fn delete_meeting(&self, id: Uuid) -> Result<u64, AppError>;
}

#[async_trait]
pub trait StatisticsStore: Send + Sync {
    async fn platform_statistics(&self, now: DateTime<Utc>) -> Result<PlatformStatistics, AppError>;
}

pub trait Store: UserStore + DealStore + InvestmentStore + MeetingStore + StatisticsStore {}

impl<T> Store for T where T: UserStore + DealStore + InvestmentStore + MeetingStore + StatisticsStore {}

pub(crate) fn scheduling_conflict() -> AppError {
    AppError::Conflict("The requested time slot overlaps an existing meeting".into())
}
