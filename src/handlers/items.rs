use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use std::sync::Arc;

use crate::db;
use crate::error::ApiError;
use crate::metrics::REQUEST_TOTAL;
use crate::models::{Item, ItemCreate, ItemUpdate, ListQuery, SearchQuery};
use crate::state::AppState;

pub async fn create_item_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ItemCreate>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    REQUEST_TOTAL.inc();
    let item = db::create_item(&state.db, payload).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn get_item_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Item>, ApiError> {
    REQUEST_TOTAL.inc();
    let item = db::get_item(&state.db, id)
        .await?
        .ok_or(ApiError::ItemNotFound)?;
    Ok(Json(item))
}

pub async fn list_items_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Item>>, ApiError> {
    REQUEST_TOTAL.inc();
    let items = db::list_items(&state.db, query.skip, query.limit).await?;
    Ok(Json(items))
}

pub async fn update_item_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<ItemUpdate>,
) -> Result<Json<Item>, ApiError> {
    REQUEST_TOTAL.inc();
    let item = db::update_item(&state.db, id, payload)
        .await?
        .ok_or(ApiError::ItemNotFound)?;
    Ok(Json(item))
}

pub async fn delete_item_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    REQUEST_TOTAL.inc();
    if db::delete_item(&state.db, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::ItemNotFound)
    }
}

pub async fn search_items_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Item>>, ApiError> {
    REQUEST_TOTAL.inc();
    let items = db::search_items(&state.db, &query.q, query.skip, query.limit).await?;
    Ok(Json(items))
}
