use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    num::NonZeroU32,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

use shared::domain::{Item, ItemId, ItemKind, ItemType, Period};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

/// Row-level view of an item, including bookkeeping columns the wire format
/// does not carry.
#[derive(Debug, Clone)]
pub struct StoredItem {
    pub item: Item,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    /// Set the first time the item is completed; never moves afterwards.
    pub completed_at: Option<DateTime<Utc>>,
}

struct KindColumns {
    deadline: Option<NaiveDate>,
    frequency: Option<i64>,
    period: Option<&'static str>,
    amount: Option<i64>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Persists `item` as a new open row. Any id already set on `item` is ignored.
    pub async fn insert_item(&self, item: &Item) -> Result<ItemId> {
        let columns = kind_columns(&item.kind);
        let rec = sqlx::query(
            "INSERT INTO items (label, item_type, deadline, frequency, period, amount)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(&item.label)
        .bind(item.item_type().as_str())
        .bind(columns.deadline)
        .bind(columns.frequency)
        .bind(columns.period)
        .bind(columns.amount)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert item")?;
        let id = rec.get::<i64, _>(0);
        debug!(item_id = id, item_type = %item.item_type(), "stored item");
        Ok(ItemId(id.to_string()))
    }

    /// Open items in insertion order.
    pub async fn list_open_items(&self) -> Result<Vec<Item>> {
        let rows = sqlx::query(
            "SELECT id, label, item_type, deadline, frequency, period, amount
             FROM items
             WHERE completed = 0
             ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to list open items")?;
        rows.iter().map(item_from_row).collect()
    }

    pub async fn find_item(&self, item_id: i64) -> Result<Option<StoredItem>> {
        let row = sqlx::query(
            "SELECT id, label, item_type, deadline, frequency, period, amount, completed,
                    created_at, completed_at
             FROM items
             WHERE id = ?",
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(StoredItem {
            item: item_from_row(&row)?,
            completed: row.try_get::<i64, _>("completed")? != 0,
            created_at: row.try_get::<NaiveDateTime, _>("created_at")?.and_utc(),
            completed_at: row
                .try_get::<Option<NaiveDateTime>, _>("completed_at")?
                .map(|at| at.and_utc()),
        }))
    }

    /// Marks the item completed. Returns `false` when no row has that id;
    /// completing an already-completed row is not an error.
    pub async fn complete_item(&self, item_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE items
             SET completed = 1, completed_at = COALESCE(completed_at, CURRENT_TIMESTAMP)
             WHERE id = ?",
        )
        .bind(item_id)
        .execute(&self.pool)
        .await
        .context("failed to complete item")?;
        Ok(result.rows_affected() > 0)
    }
}

fn kind_columns(kind: &ItemKind) -> KindColumns {
    match kind {
        ItemKind::Task { deadline } => KindColumns {
            deadline: *deadline,
            frequency: None,
            period: None,
            amount: None,
        },
        ItemKind::Recurring { frequency, period } => KindColumns {
            deadline: None,
            frequency: Some(i64::from(frequency.get())),
            period: Some(period.as_str()),
            amount: None,
        },
        ItemKind::ShoppingItem { amount } => KindColumns {
            deadline: None,
            frequency: None,
            period: None,
            amount: Some(i64::from(amount.get())),
        },
    }
}

fn item_from_row(row: &SqliteRow) -> Result<Item> {
    let id: i64 = row.try_get("id")?;
    let label: String = row.try_get("label")?;
    let item_type: ItemType = row.try_get::<String, _>("item_type")?.parse()?;

    let kind = match item_type {
        ItemType::Task => ItemKind::Task {
            deadline: row.try_get("deadline")?,
        },
        ItemType::Recurring => {
            let period = match row.try_get::<Option<String>, _>("period")? {
                Some(raw) => raw.parse::<Period>()?,
                None => Period::default(),
            };
            ItemKind::Recurring {
                frequency: positive_column(row, "frequency", id)?,
                period,
            }
        }
        ItemType::ShoppingItem => ItemKind::ShoppingItem {
            amount: positive_column(row, "amount", id)?,
        },
    };

    Ok(Item {
        id: Some(ItemId(id.to_string())),
        label,
        kind,
    })
}

fn positive_column(row: &SqliteRow, column: &str, item_id: i64) -> Result<NonZeroU32> {
    let raw: Option<i64> = row.try_get(column)?;
    raw.and_then(|value| u32::try_from(value).ok())
        .and_then(NonZeroU32::new)
        .ok_or_else(|| anyhow!("item {item_id} has invalid {column} {raw:?}"))
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
