use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// One post membership inside a context container.
///
/// `Context.posts` is the single source of truth for which contexts include
/// which posts; `Post.contexts` is a denormalized pointer kept in sync by the
/// application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextPostRef {
    #[serde(rename = "postId")]
    pub post_id: Uuid,
    #[serde(rename = "includeInContainer", default)]
    pub include_in_container: bool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    pub id: Uuid,
    pub title: String,
    pub container_type: String,
    pub sectors: Vec<Uuid>,
    pub sub_sectors: Vec<Uuid>,
    pub display_order: i32,
    pub posts: Json<Vec<ContextPostRef>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Context {
    pub fn lists_post(&self, post_id: Uuid) -> bool {
        self.posts.0.iter().any(|p| p.post_id == post_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn post_ref_uses_wire_field_names() {
        let r = ContextPostRef { post_id: Uuid::nil(), include_in_container: true };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(
            v,
            json!({"postId": "00000000-0000-0000-0000-000000000000", "includeInContainer": true})
        );
    }

    #[test]
    fn include_in_container_defaults_false() {
        let r: ContextPostRef =
            serde_json::from_value(json!({"postId": Uuid::new_v4()})).unwrap();
        assert!(!r.include_in_container);
    }
}
