use std::num::NonZeroU32;

use chrono::NaiveDate;
use shared::{
    domain::{label_is_present, Item, ItemId, ItemKind, Period},
    error::{ApiError, ErrorCode},
};
use storage::Storage;
use tracing::{debug, info};

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
}

pub async fn list_items(ctx: &ApiContext) -> Result<Vec<Item>, ApiError> {
    ctx.storage.list_open_items().await.map_err(internal)
}

pub async fn add_task(ctx: &ApiContext, label: &str) -> Result<Vec<Item>, ApiError> {
    insert(ctx, Item::new(label, ItemKind::Task { deadline: None })).await
}

pub async fn add_task_with_deadline(
    ctx: &ApiContext,
    label: &str,
    deadline: NaiveDate,
) -> Result<Vec<Item>, ApiError> {
    insert(
        ctx,
        Item::new(
            label,
            ItemKind::Task {
                deadline: Some(deadline),
            },
        ),
    )
    .await
}

pub async fn add_recurring_task(
    ctx: &ApiContext,
    label: &str,
    frequency: NonZeroU32,
    period: Period,
) -> Result<Vec<Item>, ApiError> {
    insert(ctx, Item::new(label, ItemKind::Recurring { frequency, period })).await
}

pub async fn add_shopping_item(
    ctx: &ApiContext,
    label: &str,
    amount: NonZeroU32,
) -> Result<Vec<Item>, ApiError> {
    insert(ctx, Item::new(label, ItemKind::ShoppingItem { amount })).await
}

/// Persists a client-submitted item. The client's id, if any, is discarded.
pub async fn add_item(ctx: &ApiContext, item: Item) -> Result<Vec<Item>, ApiError> {
    match item.kind {
        ItemKind::Task { deadline: None } => add_task(ctx, &item.label).await,
        ItemKind::Task {
            deadline: Some(deadline),
        } => add_task_with_deadline(ctx, &item.label, deadline).await,
        ItemKind::Recurring { frequency, period } => {
            add_recurring_task(ctx, &item.label, frequency, period).await
        }
        ItemKind::ShoppingItem { amount } => add_shopping_item(ctx, &item.label, amount).await,
    }
}

pub async fn mark_completed(ctx: &ApiContext, item_id: &ItemId) -> Result<Vec<Item>, ApiError> {
    let row_id = parse_row_id(item_id)?;
    let existing = ctx.storage.find_item(row_id).await.map_err(internal)?;
    match existing {
        None => {
            return Err(ApiError::not_found(format!("item {item_id} not found")));
        }
        Some(stored) if stored.completed => {
            debug!(%item_id, completed_at = ?stored.completed_at, "item already completed");
        }
        Some(_) => {
            ctx.storage.complete_item(row_id).await.map_err(internal)?;
            info!(%item_id, "item completed");
        }
    }
    list_items(ctx).await
}

async fn insert(ctx: &ApiContext, item: Item) -> Result<Vec<Item>, ApiError> {
    if !label_is_present(&item.label) {
        return Err(ApiError::validation("label must not be empty"));
    }
    let item_id = ctx.storage.insert_item(&item).await.map_err(internal)?;
    info!(%item_id, item_type = %item.item_type(), "item added");
    list_items(ctx).await
}

fn parse_row_id(item_id: &ItemId) -> Result<i64, ApiError> {
    item_id
        .as_str()
        .parse::<i64>()
        .map_err(|_| ApiError::new(ErrorCode::NotFound, format!("item {item_id} not found")))
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, err.to_string())
}
