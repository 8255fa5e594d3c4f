use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::{User, UserRow};

const USER_COLUMNS: &str = "id, email, username, role, refresh_token, permission, \
     available_funds, total_invested, startup_name, description, fundraising_goal, \
     total_raised, created_at, updated_at";

pub async fn fetch_all(pool: &PgPool) -> Result<Vec<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await
}

pub async fn fetch_one(pool: &PgPool, id: Uuid) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
}

/// Fetch a user row and hold its row lock until the surrounding transaction ends.
pub async fn lock_one(conn: &mut PgConnection, id: Uuid) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await
}

pub async fn insert(pool: &PgPool, user: &User) -> Result<UserRow, sqlx::Error> {
    let cols = user.profile.columns();
    sqlx::query_as::<_, UserRow>(&format!(
        "INSERT INTO users (id, email, username, role, refresh_token, permission,
             available_funds, total_invested, startup_name, description, fundraising_goal,
             total_raised, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
         RETURNING {USER_COLUMNS}"
    ))
    .bind(user.id)
    .bind(&user.email)
    .bind(&user.username)
    .bind(cols.role)
    .bind(&user.refresh_token)
    .bind(cols.permission)
    .bind(cols.available_funds)
    .bind(cols.total_invested)
    .bind(cols.startup_name)
    .bind(cols.description)
    .bind(cols.fundraising_goal)
    .bind(cols.total_raised)
    .bind(user.created_at)
    .bind(user.updated_at)
    .fetch_one(pool)
    .await
}

/// Overwrite every mutable column. Only call while holding the row lock.
pub async fn write_locked(conn: &mut PgConnection, user: &User) -> Result<UserRow, sqlx::Error> {
    let cols = user.profile.columns();
    sqlx::query_as::<_, UserRow>(&format!(
        "UPDATE users
         SET username = $2, role = $3, refresh_token = $4, permission = $5,
             available_funds = $6, total_invested = $7, startup_name = $8,
             description = $9, fundraising_goal = $10, total_raised = $11,
             updated_at = $12
         WHERE id = $1
         RETURNING {USER_COLUMNS}"
    ))
    .bind(user.id)
    .bind(&user.username)
    .bind(cols.role)
    .bind(&user.refresh_token)
    .bind(cols.permission)
    .bind(cols.available_funds)
    .bind(cols.total_invested)
    .bind(cols.startup_name)
    .bind(cols.description)
    .bind(cols.fundraising_goal)
    .bind(cols.total_raised)
    .bind(user.updated_at)
    .fetch_one(conn)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
