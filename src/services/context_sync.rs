//! Keeps `Context.posts` membership consistent with `Post.contexts`.
//!
//! The context side is best-effort by design: the post mutation is
//! authoritative and is never rolled back when a reciprocal update fails.
//! Callers log the error and report success for the primary operation.

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::DatabaseError;

/// A context the post wants to appear in, with its container flag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DesiredContext {
    pub context_id: Uuid,
    pub include_in_container: bool,
}

/// Which contexts must stop or start listing a post when its `contexts`
/// field moves from `current` to `desired`.
#[derive(Debug, PartialEq)]
pub struct SyncPlan {
    pub removals: Vec<Uuid>,
    pub additions: Vec<Uuid>,
}

pub fn sync_plan(current: &[Uuid], desired: &[Uuid]) -> SyncPlan {
    SyncPlan {
        removals: current.iter().filter(|id| !desired.contains(id)).copied().collect(),
        additions: desired.iter().filter(|id| !current.contains(id)).copied().collect(),
    }
}

pub struct ContextSyncService {
    pool: PgPool,
}

impl ContextSyncService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Align context membership after a post create/update.
    ///
    /// Contexts dropped from the post are pulled; every desired context gets
    /// the membership set-added (or its `includeInContainer` flag refreshed,
    /// without duplicating the entry).
    pub async fn sync_post(
        &self,
        post_id: Uuid,
        current: &[Uuid],
        desired: &[DesiredContext],
    ) -> Result<(), DatabaseError> {
        let desired_contexts: Vec<Uuid> = desired.iter().map(|d| d.context_id).collect();
        let plan = sync_plan(current, &desired_contexts);

        for context_id in &plan.removals {
            self.pull_from_context(*context_id, post_id).await?;
        }

        for entry in desired {
            self.upsert_membership(entry.context_id, post_id, entry.include_in_container)
                .await?;
        }

        Ok(())
    }

    /// Remove the post from every context that lists it (post deletion).
    pub async fn remove_post_everywhere(&self, post_id: Uuid) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE contexts
            SET posts = COALESCE(
                    (SELECT jsonb_agg(elem)
                     FROM jsonb_array_elements(posts) elem
                     WHERE elem->>'postId' <> $1),
                    '[]'::jsonb),
                updated_at = now()
            WHERE posts @> $2
            "#,
        )
        .bind(post_id.to_string())
        .bind(json!([{ "postId": post_id }]))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn pull_from_context(&self, context_id: Uuid, post_id: Uuid) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            UPDATE contexts
            SET posts = COALESCE(
                    (SELECT jsonb_agg(elem)
                     FROM jsonb_array_elements(posts) elem
                     WHERE elem->>'postId' <> $2),
                    '[]'::jsonb),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(context_id)
        .bind(post_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Set-semantics add: refresh the existing entry in place, or append one.
    async fn upsert_membership(
        &self,
        context_id: Uuid,
        post_id: Uuid,
        include_in_container: bool,
    ) -> Result<(), DatabaseError> {
        let entry = json!({ "postId": post_id, "includeInContainer": include_in_container });
        let key = json!([{ "postId": post_id }]);

        let updated = sqlx::query(
            r#"
            UPDATE contexts
            SET posts = (SELECT jsonb_agg(
                             CASE WHEN elem->>'postId' = $2 THEN $3::jsonb ELSE elem END)
                         FROM jsonb_array_elements(posts) elem),
                updated_at = now()
            WHERE id = $1 AND posts @> $4
            "#,
        )
        .bind(context_id)
        .bind(post_id.to_string())
        .bind(&entry)
        .bind(&key)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            sqlx::query(
                r#"
                UPDATE contexts
                SET posts = posts || jsonb_build_array($2::jsonb), updated_at = now()
                WHERE id = $1
                "#,
            )
            .bind(context_id)
            .bind(&entry)
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn plan_splits_removals_and_additions() {
        let all = ids(3);
        let (c1, c2, c3) = (all[0], all[1], all[2]);
        let plan = sync_plan(&[c1, c2], &[c2, c3]);
        assert_eq!(plan.removals, vec![c1]);
        assert_eq!(plan.additions, vec![c3]);
    }

    #[test]
    fn unchanged_membership_plans_nothing() {
        let all = ids(2);
        let plan = sync_plan(&all, &all);
        assert!(plan.removals.is_empty());
        assert!(plan.additions.is_empty());
    }

    #[test]
    fn round_trip_restores_membership() {
        // Updating A -> B then B -> A must plan the inverse operations
        let all = ids(3);
        let a = vec![all[0], all[1]];
        let b = vec![all[1], all[2]];
        let forward = sync_plan(&a, &b);
        let back = sync_plan(&b, &a);
        assert_eq!(forward.removals, back.additions);
        assert_eq!(forward.additions, back.removals);
    }

    #[test]
    fn empty_current_adds_everything() {
        let b = ids(2);
        let plan = sync_plan(&[], &b);
        assert!(plan.removals.is_empty());
        assert_eq!(plan.additions, b);
    }
}
