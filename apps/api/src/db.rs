use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Creates the answer, edited-answer and fixed-interview tables if they do not
/// exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS answer_records (
            user_id      TEXT PRIMARY KEY,
            slots        JSONB NOT NULL,
            last_updated TIMESTAMPTZ,
            created_at   TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS edited_answers (
            id           UUID PRIMARY KEY,
            user_id      TEXT NOT NULL,
            edited_items JSONB NOT NULL,
            saved_at     TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS edited_answers_user_saved ON edited_answers (user_id, saved_at DESC)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fixed_progress (
            user_id       TEXT PRIMARY KEY,
            started       BOOLEAN NOT NULL DEFAULT FALSE,
            current_index INTEGER NOT NULL DEFAULT 0,
            last_updated  TIMESTAMPTZ
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fixed_dialog_messages (
            id      BIGSERIAL PRIMARY KEY,
            user_id TEXT NOT NULL,
            sender  TEXT NOT NULL,
            text    TEXT NOT NULL,
            sent_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS fixed_dialog_messages_user ON fixed_dialog_messages (user_id, id)",
    )
    .execute(pool)
    .await?;

    info!("Database schema ready");
    Ok(())
}
