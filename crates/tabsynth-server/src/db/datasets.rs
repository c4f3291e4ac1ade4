//! Dataset rows
//!
//! Plain queries only; the consistency rules (orphans, ownership, identity
//! allocation) live in [`crate::registry`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct Dataset {
    pub id: i64,
    /// Original upload file name, for display.
    pub name: String,
    #[serde(skip_serializing)]
    pub path: String,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
}

const COLUMNS: &str = "id, name, path, owner_id, created_at";

pub async fn max_id(pool: &SqlitePool) -> sqlx::Result<i64> {
    sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) FROM datasets")
        .fetch_one(pool)
        .await
}

pub async fn path_exists(pool: &SqlitePool, path: &str) -> sqlx::Result<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM datasets WHERE path = ?")
        .bind(path)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

pub async fn insert(
    pool: &SqlitePool,
    id: i64,
    name: &str,
    path: &str,
    owner_id: i64,
) -> sqlx::Result<Dataset> {
    sqlx::query_as::<_, Dataset>(&format!(
        "INSERT INTO datasets ({COLUMNS}) VALUES (?, ?, ?, ?, ?) RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(name)
    .bind(path)
    .bind(owner_id)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
}

pub async fn find(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<Dataset>> {
    sqlx::query_as::<_, Dataset>(&format!("SELECT {COLUMNS} FROM datasets WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_by_owner(pool: &SqlitePool, owner_id: i64) -> sqlx::Result<Vec<Dataset>> {
    sqlx::query_as::<_, Dataset>(&format!(
        "SELECT {COLUMNS} FROM datasets WHERE owner_id = ? ORDER BY id"
    ))
    .bind(owner_id)
    .fetch_all(pool)
    .await
}

pub async fn list_all(pool: &SqlitePool) -> sqlx::Result<Vec<Dataset>> {
    sqlx::query_as::<_, Dataset>(&format!("SELECT {COLUMNS} FROM datasets ORDER BY id"))
        .fetch_all(pool)
        .await
}

pub async fn delete(pool: &SqlitePool, id: i64) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM datasets WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
