//! Schema bootstrap. Executed at startup; every statement is idempotent.

use sqlx::PgPool;

use crate::database::collection::COLLECTIONS;
use crate::database::manager::DatabaseError;

const TYPED_TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'User',
        name TEXT NOT NULL DEFAULT '',
        provider TEXT NOT NULL DEFAULT 'local',
        reset_token TEXT,
        reset_token_expiration TIMESTAMPTZ,
        last_password_update TIMESTAMPTZ NOT NULL DEFAULT now(),
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS posts (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        title TEXT NOT NULL,
        post_date TIMESTAMPTZ NOT NULL,
        post_type TEXT NOT NULL,
        summary TEXT NOT NULL DEFAULT '',
        source_urls TEXT[] NOT NULL,
        contexts UUID[] NOT NULL DEFAULT '{}',
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS contexts (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        title TEXT NOT NULL,
        container_type TEXT NOT NULL,
        sectors UUID[] NOT NULL DEFAULT '{}',
        sub_sectors UUID[] NOT NULL DEFAULT '{}',
        display_order INT NOT NULL DEFAULT 0,
        posts JSONB NOT NULL DEFAULT '[]',
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
];

/// Create typed tables and one document table per registered collection.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), DatabaseError> {
    for stmt in TYPED_TABLES {
        sqlx::query(stmt).execute(pool).await?;
    }

    for spec in COLLECTIONS {
        let stmt = format!(
            r#"
            CREATE TABLE IF NOT EXISTS "{}" (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                doc JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
            spec.table
        );
        sqlx::query(&stmt).execute(pool).await?;
    }

    Ok(())
}
