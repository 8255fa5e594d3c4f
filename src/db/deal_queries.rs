use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::{Deal, DealRow, DealStatus};

const DEAL_COLUMNS: &str = "id, startup_id, name, description, content, deal_type, \
     image_background_url, image_logo_url, image_content_url, dataroom_url, allocation, \
     price_per_unit, minimum_investment, raised, investor_count, start_date, end_date, \
     status, created_at, updated_at";

pub async fn fetch_filtered(
    pool: &PgPool,
    startup_id: Option<Uuid>,
    status: Option<DealStatus>,
) -> Result<Vec<DealRow>, sqlx::Error> {
    sqlx::query_as::<_, DealRow>(&format!(
        "SELECT {DEAL_COLUMNS}
         FROM deals
         WHERE ($1::uuid IS NULL OR startup_id = $1)
           AND ($2::text IS NULL OR status = $2)
         ORDER BY created_at DESC"
    ))
    .bind(startup_id)
    .bind(status.map(|s| s.as_str()))
    .fetch_all(pool)
    .await
}

pub async fn fetch_one(pool: &PgPool, id: Uuid) -> Result<Option<DealRow>, sqlx::Error> {
    sqlx::query_as::<_, DealRow>(&format!("SELECT {DEAL_COLUMNS} FROM deals WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn lock_one(conn: &mut PgConnection, id: Uuid) -> Result<Option<DealRow>, sqlx::Error> {
    sqlx::query_as::<_, DealRow>(&format!(
        "SELECT {DEAL_COLUMNS} FROM deals WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await
}

pub async fn insert(pool: &PgPool, deal: &Deal) -> Result<DealRow, sqlx::Error> {
    sqlx::query_as::<_, DealRow>(&format!(
        "INSERT INTO deals ({DEAL_COLUMNS})
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
         RETURNING {DEAL_COLUMNS}"
    ))
    .bind(deal.id)
    .bind(deal.startup_id)
    .bind(&deal.name)
    .bind(&deal.description)
    .bind(&deal.content)
    .bind(&deal.deal_type)
    .bind(&deal.image_background_url)
    .bind(&deal.image_logo_url)
    .bind(&deal.image_content_url)
    .bind(&deal.dataroom_url)
    .bind(&deal.allocation)
    .bind(&deal.price_per_unit)
    .bind(&deal.minimum_investment)
    .bind(&deal.raised)
    .bind(deal.investor_count)
    .bind(deal.start_date)
    .bind(deal.end_date)
    .bind(deal.status.as_str())
    .bind(deal.created_at)
    .bind(deal.updated_at)
    .fetch_one(pool)
    .await
}

/// Overwrite every mutable column. Only call while holding the row lock.
pub async fn write_locked(conn: &mut PgConnection, deal: &Deal) -> Result<DealRow, sqlx::Error> {
    sqlx::query_as::<_, DealRow>(&format!(
        "UPDATE deals
         SET name = $2, description = $3, content = $4, deal_type = $5,
             image_background_url = $6, image_logo_url = $7, image_content_url = $8,
             dataroom_url = $9, allocation = $10, price_per_unit = $11,
             minimum_investment = $12, raised = $13, investor_count = $14,
             start_date = $15, end_date = $16, status = $17, updated_at = $18
         WHERE id = $1
         RETURNING {DEAL_COLUMNS}"
    ))
    .bind(deal.id)
    .bind(&deal.name)
    .bind(&deal.description)
    .bind(&deal.content)
    .bind(&deal.deal_type)
    .bind(&deal.image_background_url)
    .bind(&deal.image_logo_url)
    .bind(&deal.image_content_url)
    .bind(&deal.dataroom_url)
    .bind(&deal.allocation)
    .bind(&deal.price_per_unit)
    .bind(&deal.minimum_investment)
    .bind(&deal.raised)
    .bind(deal.investor_count)
    .bind(deal.start_date)
    .bind(deal.end_date)
    .bind(deal.status.as_str())
    .bind(deal.updated_at)
    .fetch_one(conn)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM deals WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
