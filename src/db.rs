//! Sqlite persistence for the items resource.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

use crate::models::{Item, ItemCreate, ItemUpdate};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_items_name ON items(name);
"#;

pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
}

// Idempotent schema bootstrap, run once at startup
pub async fn run_migration(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA_SQL.split(';') {
        let statement = statement.trim();
        if !statement.is_empty() {
            sqlx::query(statement).execute(pool).await?;
        }
    }
    Ok(())
}

// Row shape as stored; timestamps kept as rfc3339 text
#[derive(sqlx::FromRow)]
struct ItemRow {
    id: i64,
    name: String,
    description: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Item {
            id: row.id,
            name: row.name,
            description: row.description,
            created_at: parse_ts(&row.created_at),
            updated_at: parse_ts(&row.updated_at),
        }
    }
}

fn parse_ts(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_default()
}

pub async fn create_item(pool: &SqlitePool, item: ItemCreate) -> Result<Item, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        "INSERT INTO items (name, description, created_at, updated_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&item.name)
    .bind(&item.description)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    let id = result.last_insert_rowid();
    get_item(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
}

pub async fn get_item(pool: &SqlitePool, id: i64) -> Result<Option<Item>, sqlx::Error> {
    let row = sqlx::query_as::<_, ItemRow>("SELECT * FROM items WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(Item::from))
}

pub async fn list_items(pool: &SqlitePool, skip: i64, limit: i64) -> Result<Vec<Item>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ItemRow>("SELECT * FROM items ORDER BY id LIMIT ? OFFSET ?")
        .bind(limit)
        .bind(skip)
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(Item::from).collect())
}

// Partial update - unset fields keep their stored values
pub async fn update_item(
    pool: &SqlitePool,
    id: i64,
    update: ItemUpdate,
) -> Result<Option<Item>, sqlx::Error> {
    if update.name.is_none() && update.description.is_none() {
        return get_item(pool, id).await;
    }

    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        "UPDATE items SET name = COALESCE(?, name), description = COALESCE(?, description), updated_at = ? WHERE id = ?",
    )
    .bind(&update.name)
    .bind(&update.description)
    .bind(&now)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_item(pool, id).await
}

pub async fn delete_item(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM items WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// Substring match on name or description
pub async fn search_items(
    pool: &SqlitePool,
    query: &str,
    skip: i64,
    limit: i64,
) -> Result<Vec<Item>, sqlx::Error> {
    let pattern = format!("%{query}%");
    let rows = sqlx::query_as::<_, ItemRow>(
        "SELECT * FROM items WHERE name LIKE ? OR description LIKE ? ORDER BY id LIMIT ? OFFSET ?",
    )
    .bind(&pattern)
    .bind(&pattern)
    .bind(limit)
    .bind(skip)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Item::from).collect())
}
