use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::Investment;

const INVESTMENT_COLUMNS: &str =
    "id, investor_id, deal_id, investment_amount, platform_fee, net_amount, investment_date";

pub async fn fetch_filtered(
    pool: &PgPool,
    investor_id: Option<Uuid>,
    deal_id: Option<Uuid>,
    startup_id: Option<Uuid>,
) -> Result<Vec<Investment>, sqlx::Error> {
    sqlx::query_as::<_, Investment>(
        "SELECT i.id, i.investor_id, i.deal_id, i.investment_amount, i.platform_fee,
                i.net_amount, i.investment_date
         FROM investments i
         JOIN deals d ON d.id = i.deal_id
         WHERE ($1::uuid IS NULL OR i.investor_id = $1)
           AND ($2::uuid IS NULL OR i.deal_id = $2)
           AND ($3::uuid IS NULL OR d.startup_id = $3)
         ORDER BY i.investment_date DESC",
    )
    .bind(investor_id)
    .bind(deal_id)
    .bind(startup_id)
    .fetch_all(pool)
    .await
}

pub async fn fetch_one(pool: &PgPool, id: Uuid) -> Result<Option<Investment>, sqlx::Error> {
    sqlx::query_as::<_, Investment>(&format!(
        "SELECT {INVESTMENT_COLUMNS} FROM investments WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn insert(conn: &mut PgConnection, investment: &Investment) -> Result<Investment, sqlx::Error> {
    sqlx::query_as::<_, Investment>(&format!(
        "INSERT INTO investments ({INVESTMENT_COLUMNS})
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING {INVESTMENT_COLUMNS}"
    ))
    .bind(investment.id)
    .bind(investment.investor_id)
    .bind(investment.deal_id)
    .bind(&investment.investment_amount)
    .bind(&investment.platform_fee)
    .bind(&investment.net_amount)
    .bind(investment.investment_date)
    .fetch_one(conn)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM investments WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
