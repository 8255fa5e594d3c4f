use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use super::{
    scheduling_conflict, DealEdit, DealFilter, DealStore, InvestmentFilter, InvestmentStore,
    MeetingFilter, MeetingStore, Settlement, StatisticsStore, UserEdit, UserStore,
};
use crate::db::{deal_queries, investment_queries, meeting_queries, statistics_queries, user_queries};
use crate::errors::AppError;
use crate::models::dashboard::PlatformStatistics;
use crate::models::{Deal, Investment, Meeting, User};
use crate::services::ledger::{self, SettlementError};

/// Postgres-backed store. Writes that read-modify-write a row take its
/// `FOR UPDATE` lock inside a transaction. When several rows are locked the
/// order is always deal, then startup user, then investor user.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

#[async_trait]
impl UserStore for PgStore {
    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        user_queries::fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        user_queries::fetch_one(&self.pool, id)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        user_queries::find_by_email(&self.pool, email)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn insert_user(&self, user: &User) -> Result<User, AppError> {
        match user_queries::insert(&self.pool, user).await {
            Ok(row) => User::try_from(row),
            Err(e) if is_unique_violation(&e) => Err(AppError::Conflict(format!(
                "User with email {} already exists",
                user.email
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn modify_user(&self, id: Uuid, edit: UserEdit<'_>) -> Result<Option<User>, AppError> {
        let mut tx = self.pool.begin().await?;
        let Some(row) = user_queries::lock_one(&mut *tx, id).await? else {
            return Ok(None);
        };
        let mut user = User::try_from(row)?;
        edit(&mut user)?;
        let row = user_queries::write_locked(&mut *tx, &user).await?;
        tx.commit().await?;
        User::try_from(row).map(Some)
    }

    async fn delete_user(&self, id: Uuid) -> Result<u64, AppError> {
        Ok(user_queries::delete(&self.pool, id).await?)
    }
}

#[async_trait]
impl DealStore for PgStore {
    async fn list_deals(&self, filter: DealFilter) -> Result<Vec<Deal>, AppError> {
        deal_queries::fetch_filtered(&self.pool, filter.startup_id, filter.status)
            .await?
            .into_iter()
            .map(Deal::try_from)
            .collect()
    }

    async fn find_deal(&self, id: Uuid) -> Result<Option<Deal>, AppError> {
        deal_queries::fetch_one(&self.pool, id)
            .await?
            .map(Deal::try_from)
            .transpose()
    }

    async fn insert_deal(&self, deal: &Deal) -> Result<Deal, AppError> {
        match deal_queries::insert(&self.pool, deal).await {
            Ok(row) => Deal::try_from(row),
            Err(e) if is_foreign_key_violation(&e) => Err(AppError::NotFound(format!(
                "Startup with id {} does not exist",
                deal.startup_id
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn modify_deal(&self, id: Uuid, edit: DealEdit<'_>) -> Result<Option<Deal>, AppError> {
        let mut tx = self.pool.begin().await?;
        let Some(row) = deal_queries::lock_one(&mut *tx, id).await? else {
            return Ok(None);
        };
        let mut deal = Deal::try_from(row)?;
        edit(&mut deal)?;
        let row = deal_queries::write_locked(&mut *tx, &deal).await?;
        tx.commit().await?;
        Deal::try_from(row).map(Some)
    }

    async fn delete_deal(&self, id: Uuid) -> Result<u64, AppError> {
        Ok(deal_queries::delete(&self.pool, id).await?)
    }
}

#[async_trait]
impl InvestmentStore for PgStore {
    async fn list_investments(&self, filter: InvestmentFilter) -> Result<Vec<Investment>, AppError> {
        Ok(investment_queries::fetch_filtered(
            &self.pool,
            filter.investor_id,
            filter.deal_id,
            filter.startup_id,
        )
        .await?)
    }

    async fn find_investment(&self, id: Uuid) -> Result<Option<Investment>, AppError> {
        Ok(investment_queries::fetch_one(&self.pool, id).await?)
    }

    async fn record_investment(
        &self,
        investor_id: Uuid,
        deal_id: Uuid,
        amount: &BigDecimal,
        fee_rate: &BigDecimal,
    ) -> Result<Settlement, AppError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to begin investment transaction for deal {}: {}", deal_id, e);
            e
        })?;

        let mut deal: Deal = deal_queries::lock_one(&mut *tx, deal_id)
            .await?
            .ok_or(SettlementError::DealUnavailable(deal_id))?
            .try_into()?;
        let mut startup: User = user_queries::lock_one(&mut *tx, deal.startup_id)
            .await?
            .ok_or(SettlementError::DealUnavailable(deal_id))?
            .try_into()?;
        let mut investor: User = user_queries::lock_one(&mut *tx, investor_id)
            .await?
            .ok_or(SettlementError::InvestorUnavailable(investor_id))?
            .try_into()?;

        // an early return drops `tx`, which rolls back
        let investment = ledger::settle(&mut investor, &mut startup, &mut deal, amount, fee_rate, Utc::now())?;

        let investor = user_queries::write_locked(&mut *tx, &investor).await?;
        let startup = user_queries::write_locked(&mut *tx, &startup).await?;
        let deal = deal_queries::write_locked(&mut *tx, &deal).await?;
        let investment = investment_queries::insert(&mut *tx, &investment).await?;

        tx.commit().await.map_err(|e| {
            error!("Failed to commit investment {} for deal {}: {}", investment.id, deal_id, e);
            e
        })?;

        Ok(Settlement {
            investment,
            investor: investor.try_into()?,
            startup: startup.try_into()?,
            deal: deal.try_into()?,
        })
    }

    async fn delete_investment(&self, id: Uuid) -> Result<u64, AppError> {
        Ok(investment_queries::delete(&self.pool, id).await?)
    }
}

#[async_trait]
impl MeetingStore for PgStore {
    async fn list_meetings(&self, filter: MeetingFilter) -> Result<Vec<Meeting>, AppError> {
        Ok(meeting_queries::fetch_filtered(
            &self.pool,
            filter.investor_id,
            filter.startup_id,
            filter.starting_after,
        )
        .await?)
    }

    async fn find_overlapping_meetings(
        &self,
        investor_id: Uuid,
        startup_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Meeting>, AppError> {
        Ok(meeting_queries::fetch_overlapping(&self.pool, investor_id, startup_id, start, end).await?)
    }

    async fn insert_meeting(&self, meeting: &Meeting) -> Result<Meeting, AppError> {
        let mut tx = self.pool.begin().await?;

        // Both parties' user rows serialize concurrent bookings for either of them.
        for party in [meeting.startup_id, meeting.investor_id] {
            if user_queries::lock_one(&mut *tx, party).await?.is_none() {
                return Err(AppError::NotFound(format!("User with id {} does not exist", party)));
            }
        }

        let clashes = meeting_queries::fetch_overlapping(
            &mut *tx,
            meeting.investor_id,
            meeting.startup_id,
            meeting.start_time,
            meeting.end_time,
        )
        .await?;
        if !clashes.is_empty() {
            return Err(scheduling_conflict());
        }

        let saved = meeting_queries::insert(&mut *tx, meeting).await?;
        tx.commit().await?;
        Ok(saved)
    }

    async fn delete_meeting(&self, id: Uuid) -> Result<u64, AppError> {
        Ok(meeting_queries::delete(&self.pool, id).await?)
    }
}

#[async_trait]
impl StatisticsStore for PgStore {
    async fn platform_statistics(&self, now: DateTime<Utc>) -> Result<PlatformStatistics, AppError> {
        Ok(statistics_queries::platform_statistics(&self.pool, now).await?)
    }
}
