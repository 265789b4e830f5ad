//! Post CRUD. This is the one controller that maintains a multi-document
//! invariant: `Context.posts` membership is realigned on every create, update,
//! and delete, best-effort (see `services::context_sync`).

use axum::extract::{Path, Query};
use axum::Json;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::DatabaseManager;
use crate::database::models::post::strip_html;
use crate::database::models::{Context, Post};
use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::services::context_sync::{ContextSyncService, DesiredContext};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub populate: Option<String>,
}

// Shared by the list and count queries so pagination totals reflect the
// same filter as the page contents.
const RANGE_FILTER: &str = " WHERE post_date >= $1 AND post_date < $2";

fn count_sql(filtered: bool) -> String {
    let mut sql = "SELECT COUNT(*) FROM posts".to_string();
    if filtered {
        sql.push_str(RANGE_FILTER);
    }
    sql
}

/// GET /api/posts
pub async fn list(Query(query): Query<PostListQuery>) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;

    let mut sql = "SELECT * FROM posts".to_string();
    let range = date_range(query.start_date, query.end_date);
    if range.is_some() {
        sql.push_str(RANGE_FILTER);
    }
    sql.push_str(" ORDER BY post_date DESC");

    let paginated = query.limit.is_some();
    if let Some(limit) = query.limit {
        let page = query.page.unwrap_or(1).max(1);
        sql.push_str(&format!(" LIMIT {} OFFSET {}", limit.max(0), (page - 1) * limit.max(0)));
    }

    let mut q = sqlx::query_as::<_, Post>(&sql);
    if let Some((start, end)) = range {
        q = q.bind(start).bind(end);
    }
    let posts = q.fetch_all(&pool).await?;

    let populate = query.populate.as_deref() == Some("contexts");
    let items = render_posts(&pool, posts, populate).await?;

    if paginated {
        let total_sql = count_sql(range.is_some());
        let mut count = sqlx::query_scalar::<_, i64>(&total_sql);
        if let Some((start, end)) = range {
            count = count.bind(start).bind(end);
        }
        let total: i64 = count.fetch_one(&pool).await?;
        let limit = query.limit.unwrap_or(1).max(1);
        Ok(ApiResponse::success(json!({
            "posts": items,
            "total": total,
            "page": query.page.unwrap_or(1).max(1),
            "totalPages": (total + limit - 1) / limit,
        })))
    } else {
        Ok(ApiResponse::success(Value::Array(items)))
    }
}

#[derive(Debug, Deserialize)]
pub struct PostGetQuery {
    pub populate: Option<String>,
}

/// GET /api/posts/:id
pub async fn get(
    Path(id): Path<Uuid>,
    Query(query): Query<PostGetQuery>,
) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let post = find_post(&pool, id).await?;

    let populate = query.populate.as_deref() == Some("contexts");
    let mut items = render_posts(&pool, vec![post], populate).await?;
    Ok(ApiResponse::success(items.remove(0)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPayload {
    pub title: String,
    pub post_date: DateTime<Utc>,
    pub post_type: String,
    #[serde(default)]
    pub summary: String,
    pub source_urls: Vec<String>,
    #[serde(default)]
    pub contexts: Vec<Uuid>,
    #[serde(default)]
    pub include_in_container: bool,
}

impl PostPayload {
    fn validate(&self) -> Result<(), ApiError> {
        if self.title.trim().is_empty() {
            return Err(ApiError::validation_error("Title is required", None));
        }
        if self.source_urls.is_empty() {
            return Err(ApiError::validation_error(
                "At least one source URL is required",
                None,
            ));
        }
        Ok(())
    }

    fn desired_contexts(&self) -> Vec<DesiredContext> {
        self.contexts
            .iter()
            .map(|&context_id| DesiredContext {
                context_id,
                include_in_container: self.include_in_container,
            })
            .collect()
    }
}

/// POST /api/posts
pub async fn create(Json(payload): Json<PostPayload>) -> ApiResult<Value> {
    payload.validate()?;
    let pool = DatabaseManager::pool().await?;

    let post = sqlx::query_as::<_, Post>(
        "INSERT INTO posts (title, post_date, post_type, summary, source_urls, contexts) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(&payload.title)
    .bind(payload.post_date)
    .bind(&payload.post_type)
    .bind(strip_html(&payload.summary))
    .bind(&payload.source_urls)
    .bind(&payload.contexts)
    .fetch_one(&pool)
    .await?;

    sync_best_effort(&pool, post.id, &[], &payload.desired_contexts()).await;

    Ok(ApiResponse::created(serde_json::to_value(&post).unwrap_or(Value::Null)))
}

/// PUT /api/posts/:id
pub async fn update(Path(id): Path<Uuid>, Json(payload): Json<PostPayload>) -> ApiResult<Value> {
    payload.validate()?;
    let pool = DatabaseManager::pool().await?;
    let existing = find_post(&pool, id).await?;

    let post = sqlx::query_as::<_, Post>(
        "UPDATE posts SET title = $2, post_date = $3, post_type = $4, summary = $5, \
         source_urls = $6, contexts = $7, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&payload.title)
    .bind(payload.post_date)
    .bind(&payload.post_type)
    .bind(strip_html(&payload.summary))
    .bind(&payload.source_urls)
    .bind(&payload.contexts)
    .fetch_one(&pool)
    .await?;

    sync_best_effort(&pool, id, &existing.contexts, &payload.desired_contexts()).await;

    Ok(ApiResponse::success(serde_json::to_value(&post).unwrap_or(Value::Null)))
}

/// DELETE /api/posts/:id
pub async fn delete(Path(id): Path<Uuid>) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let existing = find_post(&pool, id).await?;

    // Pull the post from every context first; failure is logged, not fatal.
    let sync = ContextSyncService::new(pool.clone());
    if let Err(e) = sync.remove_post_everywhere(id).await {
        tracing::error!(post_id = %id, "context cleanup failed on delete: {}", e);
    }

    sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    Ok(ApiResponse::success(serde_json::to_value(&existing).unwrap_or(Value::Null)))
}

async fn find_post(pool: &PgPool, id: Uuid) -> Result<Post, ApiError> {
    sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Post {} not found", id)))
}

/// The post mutation is authoritative; reciprocal context updates may fail
/// without failing the request.
async fn sync_best_effort(pool: &PgPool, post_id: Uuid, current: &[Uuid], desired: &[DesiredContext]) {
    let sync = ContextSyncService::new(pool.clone());
    if let Err(e) = sync.sync_post(post_id, current, desired).await {
        tracing::error!(post_id = %post_id, "context sync failed: {}", e);
    }
}

async fn render_posts(
    pool: &PgPool,
    posts: Vec<Post>,
    populate: bool,
) -> Result<Vec<Value>, ApiError> {
    if !populate {
        return Ok(posts
            .iter()
            .map(|p| serde_json::to_value(p).unwrap_or(Value::Null))
            .collect());
    }

    let mut all_ids: Vec<Uuid> = posts.iter().flat_map(|p| p.contexts.iter().copied()).collect();
    all_ids.sort();
    all_ids.dedup();

    let contexts = if all_ids.is_empty() {
        vec![]
    } else {
        sqlx::query_as::<_, Context>("SELECT * FROM contexts WHERE id = ANY($1)")
            .bind(&all_ids)
            .fetch_all(pool)
            .await?
    };
    let by_id: std::collections::HashMap<Uuid, Value> = contexts
        .iter()
        .map(|c| (c.id, serde_json::to_value(c).unwrap_or(Value::Null)))
        .collect();

    Ok(posts
        .iter()
        .map(|p| {
            let mut value = serde_json::to_value(p).unwrap_or(Value::Null);
            let resolved: Vec<Value> = p
                .contexts
                .iter()
                .filter_map(|id| by_id.get(id).cloned())
                .collect();
            value["contexts"] = Value::Array(resolved);
            value
        })
        .collect())
}

fn date_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    match (start, end) {
        (Some(start), Some(end)) => {
            let start = start.and_hms_opt(0, 0, 0)?.and_utc();
            // End date is inclusive: filter below the following midnight
            let end = end.and_hms_opt(0, 0, 0)?.and_utc() + Duration::days(1);
            Some((start, end))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_range_is_end_inclusive() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let (s, e) = date_range(Some(start), Some(end)).unwrap();
        assert_eq!(s.to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert_eq!(e.to_rfc3339(), "2024-02-01T00:00:00+00:00");
    }

    #[test]
    fn partial_range_is_ignored() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(date_range(Some(start), None).is_none());
        assert!(date_range(None, None).is_none());
    }

    #[test]
    fn filtered_count_uses_the_list_filter() {
        assert_eq!(count_sql(false), "SELECT COUNT(*) FROM posts");
        assert!(count_sql(true).ends_with(RANGE_FILTER));
    }

    #[test]
    fn payload_requires_source_urls() {
        let payload = PostPayload {
            title: "T".to_string(),
            post_date: Utc::now(),
            post_type: "News".to_string(),
            summary: String::new(),
            source_urls: vec![],
            contexts: vec![],
            include_in_container: false,
        };
        assert!(payload.validate().is_err());
    }
}
