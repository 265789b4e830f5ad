//! Context container CRUD. The `posts` membership array is normally written
//! by the post controller's sync step; direct writes here replace it wholesale.

use axum::extract::{Path, Query};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use sqlx::types::Json as SqlJson;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::DatabaseManager;
use crate::database::models::{Context, ContextPostRef};
use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextListQuery {
    pub container_type: Option<String>,
}

/// GET /api/contexts
pub async fn list(Query(query): Query<ContextListQuery>) -> ApiResult<Vec<Context>> {
    let pool = DatabaseManager::pool().await?;

    let contexts = match &query.container_type {
        Some(container_type) => {
            sqlx::query_as::<_, Context>(
                "SELECT * FROM contexts WHERE container_type = $1 ORDER BY display_order, created_at DESC",
            )
            .bind(container_type)
            .fetch_all(&pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Context>(
                "SELECT * FROM contexts ORDER BY display_order, created_at DESC",
            )
            .fetch_all(&pool)
            .await?
        }
    };

    Ok(ApiResponse::success(contexts))
}

/// GET /api/contexts/:id
pub async fn get(Path(id): Path<Uuid>) -> ApiResult<Context> {
    let pool = DatabaseManager::pool().await?;
    Ok(ApiResponse::success(find_context(&pool, id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextPayload {
    pub title: String,
    pub container_type: String,
    #[serde(default)]
    pub sectors: Vec<Uuid>,
    #[serde(default)]
    pub sub_sectors: Vec<Uuid>,
    #[serde(default)]
    pub display_order: i32,
    pub posts: Option<Vec<ContextPostRef>>,
}

impl ContextPayload {
    fn validate(&self) -> Result<(), ApiError> {
        if self.title.trim().is_empty() {
            return Err(ApiError::validation_error("Title is required", None));
        }
        if self.container_type.trim().is_empty() {
            return Err(ApiError::validation_error("Container type is required", None));
        }
        Ok(())
    }
}

/// POST /api/contexts
pub async fn create(Json(payload): Json<ContextPayload>) -> ApiResult<Context> {
    payload.validate()?;
    let pool = DatabaseManager::pool().await?;

    let context = sqlx::query_as::<_, Context>(
        "INSERT INTO contexts (title, container_type, sectors, sub_sectors, display_order, posts) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(&payload.title)
    .bind(&payload.container_type)
    .bind(&payload.sectors)
    .bind(&payload.sub_sectors)
    .bind(payload.display_order)
    .bind(SqlJson(payload.posts.clone().unwrap_or_default()))
    .fetch_one(&pool)
    .await?;

    Ok(ApiResponse::created(context))
}

/// PUT /api/contexts/:id
pub async fn update(Path(id): Path<Uuid>, Json(payload): Json<ContextPayload>) -> ApiResult<Context> {
    payload.validate()?;
    let pool = DatabaseManager::pool().await?;
    let existing = find_context(&pool, id).await?;

    // Omitting `posts` keeps the membership the sync step maintains.
    let posts = payload.posts.clone().unwrap_or_else(|| existing.posts.0.clone());

    let context = sqlx::query_as::<_, Context>(
        "UPDATE contexts SET title = $2, container_type = $3, sectors = $4, sub_sectors = $5, \
         display_order = $6, posts = $7, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&payload.title)
    .bind(&payload.container_type)
    .bind(&payload.sectors)
    .bind(&payload.sub_sectors)
    .bind(payload.display_order)
    .bind(SqlJson(posts))
    .fetch_one(&pool)
    .await?;

    Ok(ApiResponse::success(context))
}

/// DELETE /api/contexts/:id
pub async fn delete(Path(id): Path<Uuid>) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let existing = find_context(&pool, id).await?;

    sqlx::query("DELETE FROM contexts WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    // Drop the dangling pointer from any post still referencing this context
    if let Err(e) = sqlx::query(
        "UPDATE posts SET contexts = array_remove(contexts, $1), updated_at = now() \
         WHERE $1 = ANY(contexts)",
    )
    .bind(id)
    .execute(&pool)
    .await
    {
        tracing::error!(context_id = %id, "post cleanup failed on context delete: {}", e);
    }

    Ok(ApiResponse::success(serde_json::to_value(&existing).unwrap_or(Value::Null)))
}

async fn find_context(pool: &PgPool, id: Uuid) -> Result<Context, ApiError> {
    sqlx::query_as::<_, Context>("SELECT * FROM contexts WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Context {} not found", id)))
}
