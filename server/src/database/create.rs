use sqlx::SqlitePool;
use tracing::info;

/// Initialize the identity schema. Safe to run on every startup.
pub async fn create_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // `permissions` holds a JSON array of capability strings.
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS admins (
            id                 TEXT    PRIMARY KEY,
            email              TEXT    NOT NULL UNIQUE,
            password_hash      TEXT    NOT NULL,
            name               TEXT    NOT NULL,
            role               TEXT    NOT NULL,
            permissions        TEXT    NOT NULL DEFAULT '[]',
            is_active          INTEGER NOT NULL DEFAULT 1,
            login_count        INTEGER NOT NULL DEFAULT 0,
            failed_login_count INTEGER NOT NULL DEFAULT 0,
            last_login_at      INTEGER,
            created_at         INTEGER NOT NULL,
            updated_at         INTEGER NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_admins_role ON admins(role)")
        .execute(pool)
        .await?;

    info!("Identity schema ready");
    Ok(())
}
