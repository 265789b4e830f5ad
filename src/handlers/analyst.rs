//! Analyst-tooling collections (market data, query refiners, clarification
//! guidance): the same document CRUD as the taxonomy, plus sector/sub-sector
//! population and bulk insert with referential pre-validation.

use axum::extract::{Path, Query};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::database::collection::{collection, Collection};
use crate::database::manager::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct AnalystListQuery {
    pub populate: Option<String>,
}

async fn open(name: &'static str) -> Result<Collection, ApiError> {
    let spec = collection(name).expect("analyst collection registered");
    let pool = DatabaseManager::pool().await?;
    Ok(Collection::new(spec, pool))
}

async fn list_collection(name: &'static str, populate: bool) -> ApiResult<Vec<Value>> {
    let coll = open(name).await?;
    let mut docs = coll.list(&Default::default()).await?;

    if populate {
        let sectors = open_ref("sectors").await?;
        let sub_sectors = open_ref("sub-sectors").await?;
        for doc in &mut docs {
            coll.populate_field(doc, "sectorId", &sectors).await?;
            coll.populate_field(doc, "subSectorId", &sub_sectors).await?;
        }
    }

    Ok(ApiResponse::success(docs))
}

async fn open_ref(name: &'static str) -> Result<Collection, ApiError> {
    let spec = collection(name).expect("reference collection registered");
    let pool = DatabaseManager::pool().await?;
    Ok(Collection::new(spec, pool))
}

async fn create_one(name: &'static str, doc: Value) -> ApiResult<Value> {
    let coll = open(name).await?;
    coll.validate(&doc)
        .map_err(|msg| ApiError::validation_error(msg, None))?;
    verify_references(std::slice::from_ref(&doc)).await?;
    Ok(ApiResponse::created(coll.create(&doc).await?))
}

/// Insert the whole batch or nothing: any unknown sector/sub-sector reference
/// rejects every document.
async fn bulk_insert(name: &'static str, docs: Vec<Value>) -> ApiResult<Vec<Value>> {
    if docs.is_empty() {
        return Err(ApiError::validation_error("Batch must not be empty", None));
    }

    let coll = open(name).await?;
    for doc in &docs {
        coll.validate(doc)
            .map_err(|msg| ApiError::validation_error(msg, None))?;
    }
    verify_references(&docs).await?;

    let mut created = Vec::with_capacity(docs.len());
    for doc in &docs {
        created.push(coll.create(doc).await?);
    }
    Ok(ApiResponse::created(created))
}

async fn verify_references(docs: &[Value]) -> Result<(), ApiError> {
    let sector_ids = collect_ids(docs, "sectorId");
    let sub_sector_ids = collect_ids(docs, "subSectorId");

    if !sector_ids.is_empty() {
        let sectors = open_ref("sectors").await?;
        if !sectors.exists_all(&sector_ids).await? {
            return Err(ApiError::validation_error(
                "Batch references a sector that does not exist",
                None,
            ));
        }
    }
    if !sub_sector_ids.is_empty() {
        let sub_sectors = open_ref("sub-sectors").await?;
        if !sub_sectors.exists_all(&sub_sector_ids).await? {
            return Err(ApiError::validation_error(
                "Batch references a sub-sector that does not exist",
                None,
            ));
        }
    }
    Ok(())
}

fn collect_ids(docs: &[Value], field: &str) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = docs
        .iter()
        .filter_map(|d| d.get(field))
        .filter_map(|v| v.as_str())
        .filter_map(|s| Uuid::parse_str(s).ok())
        .collect();
    ids.sort();
    ids.dedup();
    ids
}

// Per-collection entry points (static routes take precedence over the generic
// /api/:collection handlers, so each needs its own method set).

pub async fn market_data_list(Query(q): Query<AnalystListQuery>) -> ApiResult<Vec<Value>> {
    list_collection("market-data", q.populate.is_some()).await
}
pub async fn market_data_create(Json(doc): Json<Value>) -> ApiResult<Value> {
    create_one("market-data", doc).await
}
pub async fn market_data_bulk(Json(docs): Json<Vec<Value>>) -> ApiResult<Vec<Value>> {
    bulk_insert("market-data", docs).await
}

pub async fn query_refiner_list(Query(q): Query<AnalystListQuery>) -> ApiResult<Vec<Value>> {
    list_collection("query-refiners", q.populate.is_some()).await
}
pub async fn query_refiner_create(Json(doc): Json<Value>) -> ApiResult<Value> {
    create_one("query-refiners", doc).await
}
pub async fn query_refiner_bulk(Json(docs): Json<Vec<Value>>) -> ApiResult<Vec<Value>> {
    bulk_insert("query-refiners", docs).await
}

pub async fn clarification_list(Query(q): Query<AnalystListQuery>) -> ApiResult<Vec<Value>> {
    list_collection("clarification-guidance", q.populate.is_some()).await
}
pub async fn clarification_create(Json(doc): Json<Value>) -> ApiResult<Value> {
    create_one("clarification-guidance", doc).await
}
pub async fn clarification_bulk(Json(docs): Json<Vec<Value>>) -> ApiResult<Vec<Value>> {
    bulk_insert("clarification-guidance", docs).await
}

/// GET /api/<analyst-collection>/:id with optional populate.
async fn get_one(name: &'static str, id: Uuid, populate: bool) -> ApiResult<Value> {
    let coll = open(name).await?;
    let mut doc = coll
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("{} {} not found", name, id)))?;

    if populate {
        let sectors = open_ref("sectors").await?;
        let sub_sectors = open_ref("sub-sectors").await?;
        coll.populate_field(&mut doc, "sectorId", &sectors).await?;
        coll.populate_field(&mut doc, "subSectorId", &sub_sectors).await?;
    }

    Ok(ApiResponse::success(doc))
}

async fn update_one(name: &'static str, id: Uuid, doc: Value) -> ApiResult<Value> {
    let coll = open(name).await?;
    coll.validate(&doc)
        .map_err(|msg| ApiError::validation_error(msg, None))?;
    verify_references(std::slice::from_ref(&doc)).await?;
    let updated = coll
        .update(id, &doc)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("{} {} not found", name, id)))?;
    Ok(ApiResponse::success(updated))
}

async fn delete_one(name: &'static str, id: Uuid) -> ApiResult<Value> {
    let coll = open(name).await?;
    let deleted = coll
        .delete(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("{} {} not found", name, id)))?;
    Ok(ApiResponse::success(deleted))
}

pub async fn market_data_get(
    Path(id): Path<Uuid>,
    Query(q): Query<AnalystListQuery>,
) -> ApiResult<Value> {
    get_one("market-data", id, q.populate.is_some()).await
}
pub async fn market_data_update(Path(id): Path<Uuid>, Json(doc): Json<Value>) -> ApiResult<Value> {
    update_one("market-data", id, doc).await
}
pub async fn market_data_delete(Path(id): Path<Uuid>) -> ApiResult<Value> {
    delete_one("market-data", id).await
}

pub async fn query_refiner_get(
    Path(id): Path<Uuid>,
    Query(q): Query<AnalystListQuery>,
) -> ApiResult<Value> {
    get_one("query-refiners", id, q.populate.is_some()).await
}
pub async fn query_refiner_update(Path(id): Path<Uuid>, Json(doc): Json<Value>) -> ApiResult<Value> {
    update_one("query-refiners", id, doc).await
}
pub async fn query_refiner_delete(Path(id): Path<Uuid>) -> ApiResult<Value> {
    delete_one("query-refiners", id).await
}

pub async fn clarification_get(
    Path(id): Path<Uuid>,
    Query(q): Query<AnalystListQuery>,
) -> ApiResult<Value> {
    get_one("clarification-guidance", id, q.populate.is_some()).await
}
pub async fn clarification_update(Path(id): Path<Uuid>, Json(doc): Json<Value>) -> ApiResult<Value> {
    update_one("clarification-guidance", id, doc).await
}
pub async fn clarification_delete(Path(id): Path<Uuid>) -> ApiResult<Value> {
    delete_one("clarification-guidance", id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn collect_ids_dedupes_and_skips_invalid() {
        let id = Uuid::new_v4();
        let docs = vec![
            json!({"sectorId": id}),
            json!({"sectorId": id}),
            json!({"sectorId": "not-a-uuid"}),
            json!({"other": 1}),
        ];
        assert_eq!(collect_ids(&docs, "sectorId"), vec![id]);
    }
}
