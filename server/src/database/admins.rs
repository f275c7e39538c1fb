use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::debug;

use shared::types::server_config::DatabaseConfig;
use shared::types::{AdminRecord, AdminRole, AdminUpdate, NewAdmin};

use crate::database::create::create_tables;
use crate::database::store::{AdminStore, StoreError};
use crate::database::utils::{generate_admin_id, get_timestamp};

/// SQLite-backed [`AdminStore`].
#[derive(Debug, Clone)]
pub struct SqliteAdminStore {
    pool: SqlitePool,
}

#[derive(Debug, sqlx::FromRow)]
struct AdminRow {
    id: String,
    email: String,
    password_hash: String,
    name: String,
    role: String,
    permissions: String,
    is_active: bool,
    login_count: i64,
    failed_login_count: i64,
    last_login_at: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

impl AdminRow {
    fn into_record(self) -> Result<AdminRecord, StoreError> {
        let role = AdminRole::from_str(&self.role)
            .map_err(|e| StoreError::Corrupt(format!("admin {}: {}", self.id, e)))?;
        let permissions: Vec<String> = serde_json::from_str(&self.permissions).map_err(|e| {
            StoreError::Corrupt(format!("admin {} permissions: {}", self.id, e))
        })?;

        Ok(AdminRecord {
            id: self.id,
            email: self.email,
            password_hash: self.password_hash,
            name: self.name,
            role,
            permissions,
            is_active: self.is_active,
            login_count: self.login_count,
            failed_login_count: self.failed_login_count,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SQLite result code for "unable to open database file".
const SQLITE_CANTOPEN: &str = "14";

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => StoreError::Conflict,
            sqlx::Error::Database(ref db) if db.code().as_deref() == Some(SQLITE_CANTOPEN) => {
                StoreError::Unavailable(e.to_string())
            }
            sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Unavailable(e.to_string()),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

impl SqliteAdminStore {
    /// Build a pool without opening a connection, so the server can start
    /// while the database is down.
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_lazy_with(options);

        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        create_tables(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl AdminStore for SqliteAdminStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<AdminRecord>, StoreError> {
        let row = sqlx::query_as::<_, AdminRow>(
            "SELECT id, email, password_hash, name, role, permissions, is_active, login_count,
                    failed_login_count, last_login_at, created_at, updated_at
             FROM admins WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(AdminRow::into_record).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<AdminRecord>, StoreError> {
        let row = sqlx::query_as::<_, AdminRow>(
            "SELECT id, email, password_hash, name, role, permissions, is_active, login_count,
                    failed_login_count, last_login_at, created_at, updated_at
             FROM admins WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(AdminRow::into_record).transpose()
    }

    async fn create(&self, admin: NewAdmin) -> Result<AdminRecord, StoreError> {
        let now = get_timestamp();
        let id = generate_admin_id();
        let permissions = serde_json::to_string(&admin.permissions)
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        sqlx::query(
            "INSERT INTO admins (id, email, password_hash, name, role, permissions, is_active,
                                 login_count, failed_login_count, last_login_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, 1, 0, 0, NULL, ?, ?)",
        )
        .bind(&id)
        .bind(&admin.email)
        .bind(&admin.password_hash)
        .bind(&admin.name)
        .bind(admin.role.as_str())
        .bind(&permissions)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!("Created admin {} ({})", id, admin);

        Ok(AdminRecord {
            id,
            email: admin.email,
            password_hash: admin.password_hash,
            name: admin.name,
            role: admin.role,
            permissions: admin.permissions,
            is_active: true,
            login_count: 0,
            failed_login_count: 0,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    async fn update(
        &self,
        id: &str,
        update: AdminUpdate,
    ) -> Result<Option<AdminRecord>, StoreError> {
        if update.is_empty() {
            return self.find_by_id(id).await;
        }

        let permissions = update
            .permissions
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let result = sqlx::query(
            "UPDATE admins SET
                email         = COALESCE(?, email),
                password_hash = COALESCE(?, password_hash),
                name          = COALESCE(?, name),
                role          = COALESCE(?, role),
                permissions   = COALESCE(?, permissions),
                is_active     = COALESCE(?, is_active),
                updated_at    = ?
             WHERE id = ?",
        )
        .bind(update.email.as_deref())
        .bind(update.password_hash.as_deref())
        .bind(update.name.as_deref())
        .bind(update.role.map(|r| r.as_str()))
        .bind(permissions.as_deref())
        .bind(update.is_active)
        .bind(get_timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.find_by_id(id).await
    }

    async fn record_login(&self, id: &str, succeeded: bool) -> Result<(), StoreError> {
        if succeeded {
            sqlx::query(
                "UPDATE admins
                 SET login_count = login_count + 1, failed_login_count = 0, last_login_at = ?
                 WHERE id = ?",
            )
            .bind(get_timestamp())
            .bind(id)
            .execute(&self.pool)
            .await?;
        } else {
            sqlx::query("UPDATE admins SET failed_login_count = failed_login_count + 1 WHERE id = ?")
                .bind(id)
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    async fn count(&self) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM admins")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
