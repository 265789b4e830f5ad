//! Generic CRUD over every registered document collection, in the shape of
//! `/api/:collection` and `/api/:collection/:id`. Entities with their own
//! typed controllers (posts, contexts, the analyst tooling) register static
//! routes that take precedence over these.

use axum::extract::{Path, Query};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::database::collection::{collection, Collection, ListOptions};
use crate::database::manager::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

async fn open(name: &str) -> Result<Collection, ApiError> {
    let spec = collection(name)
        .ok_or_else(|| ApiError::not_found(format!("Unknown collection: {}", name)))?;
    let pool = DatabaseManager::pool().await?;
    Ok(Collection::new(spec, pool))
}

/// GET /api/:collection
pub async fn list(
    Path(name): Path<String>,
    Query(query): Query<CollectionListQuery>,
) -> ApiResult<Vec<Value>> {
    let coll = open(&name).await?;
    let opts = ListOptions {
        page: query.page,
        limit: query.limit,
        start_date: query
            .start_date
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|d| d.and_utc()),
        end_date: query
            .end_date
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|d| d.and_utc()),
    };
    Ok(ApiResponse::success(coll.list(&opts).await?))
}

/// GET /api/:collection/:id
pub async fn get(Path((name, id)): Path<(String, Uuid)>) -> ApiResult<Value> {
    let coll = open(&name).await?;
    let doc = coll
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("{} {} not found", name, id)))?;
    Ok(ApiResponse::success(doc))
}

/// POST /api/:collection
pub async fn create(Path(name): Path<String>, Json(doc): Json<Value>) -> ApiResult<Value> {
    let coll = open(&name).await?;
    coll.validate(&doc)
        .map_err(|msg| ApiError::validation_error(msg, None))?;
    Ok(ApiResponse::created(coll.create(&doc).await?))
}

/// PUT /api/:collection/:id
pub async fn update(
    Path((name, id)): Path<(String, Uuid)>,
    Json(doc): Json<Value>,
) -> ApiResult<Value> {
    let coll = open(&name).await?;
    coll.validate(&doc)
        .map_err(|msg| ApiError::validation_error(msg, None))?;
    let updated = coll
        .update(id, &doc)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("{} {} not found", name, id)))?;
    Ok(ApiResponse::success(updated))
}

/// DELETE /api/:collection/:id
pub async fn delete(Path((name, id)): Path<(String, Uuid)>) -> ApiResult<Value> {
    let coll = open(&name).await?;
    let deleted = coll
        .delete(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("{} {} not found", name, id)))?;
    Ok(ApiResponse::success(deleted))
}
