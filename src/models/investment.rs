use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// An investor's commitment to a deal. Rows are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Investment {
    pub id: Uuid,
    pub investor_id: Uuid,
    pub deal_id: Uuid,
    pub investment_amount: BigDecimal,
    pub platform_fee: BigDecimal,
    pub net_amount: BigDecimal,
    pub investment_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateInvestment {
    pub investment_amount: BigDecimal,
}
