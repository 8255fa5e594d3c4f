use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DealStatus {
    Pending,
    Approved,
    Rejected,
    Closed,
}

impl DealStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DealStatus::Pending => "pending",
            DealStatus::Approved => "approved",
            DealStatus::Rejected => "rejected",
            DealStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for DealStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DealStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DealStatus::Pending),
            "approved" => Ok(DealStatus::Approved),
            "rejected" => Ok(DealStatus::Rejected),
            "closed" => Ok(DealStatus::Closed),
            other => Err(AppError::Internal(format!("unknown deal status '{}'", other))),
        }
    }
}

/// Admin decision on a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DealAction {
    Approve,
    Reject,
    Close,
}

impl DealAction {
    /// Status reached by applying this action to a deal in `from`, if allowed.
    pub fn target(&self, from: DealStatus) -> Option<DealStatus> {
        match (self, from) {
            (DealAction::Approve, DealStatus::Pending) => Some(DealStatus::Approved),
            (DealAction::Reject, DealStatus::Pending) => Some(DealStatus::Rejected),
            (DealAction::Close, DealStatus::Approved) => Some(DealStatus::Closed),
            _ => None,
        }
    }
}

impl FromStr for DealAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(DealAction::Approve),
            "reject" => Ok(DealAction::Reject),
            "close" => Ok(DealAction::Close),
            _ => Err(AppError::Validation("Invalid action".into())),
        }
    }
}

// A fundraising campaign published by a startup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deal {
    pub id: Uuid,
    pub startup_id: Uuid,
    pub name: String,
    pub description: String,
    pub content: String,
    #[serde(rename = "type")]
    pub deal_type: String,
    pub image_background_url: Option<String>,
    pub image_logo_url: Option<String>,
    pub image_content_url: Option<String>,
    pub dataroom_url: Option<String>,
    pub allocation: BigDecimal,
    pub price_per_unit: BigDecimal,
    pub minimum_investment: BigDecimal,
    pub raised: BigDecimal,
    pub investor_count: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: DealStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deal {
    pub fn new(startup_id: Uuid, input: CreateDeal) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            startup_id,
            name: input.name,
            description: input.description.unwrap_or_default(),
            content: input.content.unwrap_or_default(),
            deal_type: input.deal_type.unwrap_or_default(),
            image_background_url: input.image_background_url,
            image_logo_url: input.image_logo_url,
            image_content_url: input.image_content_url,
            dataroom_url: input.dataroom_url,
            allocation: input.allocation.unwrap_or_else(BigDecimal::zero),
            price_per_unit: input.price_per_unit.unwrap_or_else(BigDecimal::zero),
            minimum_investment: input.minimum_investment.unwrap_or_else(BigDecimal::zero),
            raised: BigDecimal::zero(),
            investor_count: 0,
            start_date: input.start_date.unwrap_or(now),
            end_date: input.end_date.unwrap_or(now),
            status: DealStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge a partial update. Status and counters are never touched here.
    pub fn apply(&mut self, input: UpdateDeal) {
        if let Some(v) = input.name {
            self.name = v;
        }
        if let Some(v) = input.description {
            self.description = v;
        }
        if let Some(v) = input.content {
            self.content = v;
        }
        if let Some(v) = input.deal_type {
            self.deal_type = v;
        }
        if let Some(v) = input.image_background_url {
            self.image_background_url = Some(v);
        }
        if let Some(v) = input.image_logo_url {
            self.image_logo_url = Some(v);
        }
        if let Some(v) = input.image_content_url {
            self.image_content_url = Some(v);
        }
        if let Some(v) = input.dataroom_url {
            self.dataroom_url = Some(v);
        }
        if let Some(v) = input.allocation {
            self.allocation = v;
        }
        if let Some(v) = input.price_per_unit {
            self.price_per_unit = v;
        }
        if let Some(v) = input.minimum_investment {
            self.minimum_investment = v;
        }
        if let Some(v) = input.start_date {
            self.start_date = v;
        }
        if let Some(v) = input.end_date {
            self.end_date = v;
        }
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DealRow {
    pub id: Uuid,
    pub startup_id: Uuid,
    pub name: String,
    pub description: String,
    pub content: String,
    pub deal_type: String,
    pub image_background_url: Option<String>,
    pub image_logo_url: Option<String>,
    pub image_content_url: Option<String>,
    pub dataroom_url: Option<String>,
    pub allocation: BigDecimal,
    pub price_per_unit: BigDecimal,
    pub minimum_investment: BigDecimal,
    pub raised: BigDecimal,
    pub investor_count: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: String, // Will be converted to/from DealStatus
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DealRow> for Deal {
    type Error = AppError;

    fn try_from(row: DealRow) -> Result<Self, Self::Error> {
        Ok(Deal {
            status: row.status.parse()?,
            id: row.id,
            startup_id: row.startup_id,
            name: row.name,
            description: row.description,
            content: row.content,
            deal_type: row.deal_type,
            image_background_url: row.image_background_url,
            image_logo_url: row.image_logo_url,
            image_content_url: row.image_content_url,
            dataroom_url: row.dataroom_url,
            allocation: row.allocation,
            price_per_unit: row.price_per_unit,
            minimum_investment: row.minimum_investment,
            raised: row.raised,
            investor_count: row.investor_count,
            start_date: row.start_date,
            end_date: row.end_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateDeal {
    pub name: String,
    pub description: Option<String>,
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub deal_type: Option<String>,
    pub image_background_url: Option<String>,
    pub image_logo_url: Option<String>,
    pub image_content_url: Option<String>,
    pub dataroom_url: Option<String>,
    pub allocation: Option<BigDecimal>,
    pub price_per_unit: Option<BigDecimal>,
    pub minimum_investment: Option<BigDecimal>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDeal {
    pub name: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub deal_type: Option<String>,
    pub image_background_url: Option<String>,
    pub image_logo_url: Option<String>,
    pub image_content_url: Option<String>,
    pub dataroom_url: Option<String>,
    pub allocation: Option<BigDecimal>,
    pub price_per_unit: Option<BigDecimal>,
    pub minimum_investment: Option<BigDecimal>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}
