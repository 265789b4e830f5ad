//! Generic CRUD over JSONB document collections.
//!
//! Every taxonomy entity with no cross-document invariants (sectors, regions,
//! signals, sources, themes, story orders, ...) is stored as a JSONB document
//! in its own table. The API shape of a document is the stored object merged
//! with `id`, `createdAt` and `updatedAt`.

use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Map, Value};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::database::manager::DatabaseError;

/// Static description of one document collection.
#[derive(Debug, Clone, Copy)]
pub struct CollectionSpec {
    /// URL path segment, e.g. "sub-sectors".
    pub name: &'static str,
    pub table: &'static str,
    /// Fields that must be present and non-null on create.
    pub required: &'static [&'static str],
    /// Document field usable for start/end date filtering, if any.
    pub date_field: Option<&'static str>,
}

/// Registry of every simple collection the API serves.
pub const COLLECTIONS: &[CollectionSpec] = &[
    CollectionSpec { name: "sectors", table: "sectors", required: &["sectorName"], date_field: None },
    CollectionSpec { name: "sub-sectors", table: "sub_sectors", required: &["subSectorName", "sectorId"], date_field: None },
    CollectionSpec { name: "regions", table: "regions", required: &["regionName"], date_field: None },
    CollectionSpec { name: "countries", table: "countries", required: &["countryName", "regionId"], date_field: None },
    CollectionSpec { name: "signals", table: "signals", required: &["signalName"], date_field: None },
    CollectionSpec { name: "sub-signals", table: "sub_signals", required: &["subSignalName", "signalId"], date_field: None },
    CollectionSpec { name: "sources", table: "sources", required: &["sourceName"], date_field: None },
    CollectionSpec { name: "companies", table: "companies", required: &["companyName"], date_field: None },
    CollectionSpec { name: "themes", table: "themes", required: &["themeTitle"], date_field: None },
    CollectionSpec { name: "story-orders", table: "story_orders", required: &["date"], date_field: Some("date") },
    CollectionSpec { name: "tile-templates", table: "tile_templates", required: &["templateName", "jsxCode"], date_field: None },
    CollectionSpec { name: "images", table: "images", required: &["url"], date_field: None },
    CollectionSpec { name: "profiles", table: "profiles", required: &["userId"], date_field: None },
    CollectionSpec { name: "market-data", table: "market_data", required: &["sectorId"], date_field: None },
    CollectionSpec { name: "query-refiners", table: "query_refiners", required: &["sectorId"], date_field: None },
    CollectionSpec { name: "clarification-guidance", table: "clarification_guidance", required: &["sectorId"], date_field: None },
];

pub fn collection(name: &str) -> Option<&'static CollectionSpec> {
    COLLECTIONS.iter().find(|c| c.name == name)
}

#[derive(Debug, Default, Clone)]
pub struct ListOptions {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Handle for CRUD against one collection table.
pub struct Collection {
    spec: &'static CollectionSpec,
    pool: PgPool,
}

impl Collection {
    pub fn new(spec: &'static CollectionSpec, pool: PgPool) -> Self {
        Self { spec, pool }
    }

    /// Validate that every required field is present and non-null.
    pub fn validate(&self, doc: &Value) -> Result<(), String> {
        validate_required(self.spec, doc)
    }

    pub async fn list(&self, opts: &ListOptions) -> Result<Vec<Value>, DatabaseError> {
        let mut sql = format!(
            "SELECT id, doc, created_at, updated_at FROM \"{}\"",
            self.spec.table
        );

        // Date-range filter on the collection's date field, end date inclusive
        let range = match (self.spec.date_field, opts.start_date, opts.end_date) {
            (Some(field), Some(start), Some(end)) => {
                sql.push_str(&format!(
                    " WHERE (doc->>'{}')::timestamptz >= $1 AND (doc->>'{}')::timestamptz < $2",
                    field, field
                ));
                Some((start, end + Duration::days(1)))
            }
            _ => None,
        };

        sql.push_str(" ORDER BY created_at DESC");

        if let Some(limit) = opts.limit {
            let page = opts.page.unwrap_or(1).max(1);
            sql.push_str(&format!(" LIMIT {} OFFSET {}", limit.max(0), (page - 1) * limit.max(0)));
        }

        let mut query = sqlx::query(&sql);
        if let Some((start, end)) = range {
            query = query.bind(start).bind(end);
        }

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_document).collect::<Result<_, _>>()?)
    }

    pub async fn count(&self) -> Result<i64, DatabaseError> {
        let row = sqlx::query(&format!("SELECT COUNT(*) AS n FROM \"{}\"", self.spec.table))
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Value>, DatabaseError> {
        let row = sqlx::query(&format!(
            "SELECT id, doc, created_at, updated_at FROM \"{}\" WHERE id = $1",
            self.spec.table
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_document(&r)).transpose().map_err(Into::into)
    }

    pub async fn create(&self, doc: &Value) -> Result<Value, DatabaseError> {
        let row = sqlx::query(&format!(
            "INSERT INTO \"{}\" (doc) VALUES ($1) RETURNING id, doc, created_at, updated_at",
            self.spec.table
        ))
        .bind(doc)
        .fetch_one(&self.pool)
        .await?;

        Ok(row_to_document(&row)?)
    }

    pub async fn update(&self, id: Uuid, doc: &Value) -> Result<Option<Value>, DatabaseError> {
        let row = sqlx::query(&format!(
            "UPDATE \"{}\" SET doc = $2, updated_at = now() WHERE id = $1 \
             RETURNING id, doc, created_at, updated_at",
            self.spec.table
        ))
        .bind(id)
        .bind(doc)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_document(&r)).transpose().map_err(Into::into)
    }

    pub async fn delete(&self, id: Uuid) -> Result<Option<Value>, DatabaseError> {
        let row = sqlx::query(&format!(
            "DELETE FROM \"{}\" WHERE id = $1 RETURNING id, doc, created_at, updated_at",
            self.spec.table
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_document(&r)).transpose().map_err(Into::into)
    }

    /// Whether every id in `ids` resolves in this collection.
    pub async fn exists_all(&self, ids: &[Uuid]) -> Result<bool, DatabaseError> {
        if ids.is_empty() {
            return Ok(true);
        }
        let row = sqlx::query(&format!(
            "SELECT COUNT(*) AS n FROM \"{}\" WHERE id = ANY($1)",
            self.spec.table
        ))
        .bind(ids)
        .fetch_one(&self.pool)
        .await?;
        let n: i64 = row.try_get("n")?;
        Ok(n == ids.len() as i64)
    }

    /// Replace an id-bearing field with the referenced document, when it resolves.
    /// Unresolvable references are left as the bare id.
    pub async fn populate_field(
        &self,
        doc: &mut Value,
        field: &str,
        target: &Collection,
    ) -> Result<(), DatabaseError> {
        let id = doc
            .get(field)
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok());
        if let Some(id) = id {
            if let Some(referenced) = target.get(id).await? {
                doc[field] = referenced;
            }
        }
        Ok(())
    }
}

/// Required-field check shared by create paths and bulk pre-validation.
pub fn validate_required(spec: &CollectionSpec, doc: &Value) -> Result<(), String> {
    let obj = match doc.as_object() {
        Some(obj) => obj,
        None => return Err("Document body must be a JSON object".to_string()),
    };
    for field in spec.required {
        match obj.get(*field) {
            Some(v) if !v.is_null() => {}
            _ => return Err(format!("Missing required field: {}", field)),
        }
    }
    Ok(())
}

/// Merge the stored object with its row metadata into the API shape.
fn row_to_document(row: &sqlx::postgres::PgRow) -> Result<Value, sqlx::Error> {
    let id: Uuid = row.try_get("id")?;
    let doc: Value = row.try_get("doc")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    let mut obj = match doc {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    };
    obj.insert("id".to_string(), json!(id));
    obj.insert("createdAt".to_string(), json!(created_at));
    obj.insert("updatedAt".to_string(), json!(updated_at));
    Ok(Value::Object(obj))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_names_are_unique() {
        for (i, a) in COLLECTIONS.iter().enumerate() {
            for b in &COLLECTIONS[i + 1..] {
                assert_ne!(a.name, b.name);
                assert_ne!(a.table, b.table);
            }
        }
    }

    #[test]
    fn lookup_by_route_name() {
        assert!(collection("sub-sectors").is_some());
        assert!(collection("story-orders").unwrap().date_field.is_some());
        assert!(collection("nope").is_none());
    }

    #[test]
    fn validate_rejects_missing_required_fields() {
        let spec = collection("countries").unwrap();
        assert!(validate_required(spec, &json!({"countryName": "France", "regionId": "x"})).is_ok());
        assert!(validate_required(spec, &json!({"countryName": "France"})).is_err());
        assert!(validate_required(spec, &json!({"countryName": null, "regionId": "x"})).is_err());
        assert!(validate_required(spec, &json!("not an object")).is_err());
    }
}
