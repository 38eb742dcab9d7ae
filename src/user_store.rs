use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tracing::{debug, info};

use crate::{error::GatewayError, model::RelationalUser};

const CREATE_USERS_TABLE: &str = "CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE
)";

/// CRUD access to the relational `users` table.
///
/// Every operation is a single statement: it is atomic on its own and is
/// visible to the next call once it returns.
#[async_trait]
pub trait UserStore {
    async fn create(&self, name: &str, email: &str) -> Result<RelationalUser, GatewayError>;
    async fn update(&self, id: i64, name: &str) -> Result<RelationalUser, GatewayError>;
    async fn delete(&self, id: i64) -> Result<RelationalUser, GatewayError>;
    async fn list_all(&self) -> Result<Vec<RelationalUser>, GatewayError>;
}

pub struct SqlUserStore {
    pool: SqlitePool,
}

impl SqlUserStore {
    /// Opens a pool on `database_url` and makes sure the `users` table
    /// exists.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, GatewayError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| GatewayError::config(format!("invalid database url: {e}")))?
            .create_if_missing(true);

        // Each connection to an in-memory database sees its own database, and
        // the database is gone once its connection closes.
        let pool_options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| GatewayError::StoreUnavailable {
                message: e.to_string(),
            })?;

        let store = SqlUserStore { pool };
        store.bootstrap().await?;
        info!(
            max_connections = store.pool.options().get_max_connections(),
            "connected to user store"
        );
        Ok(store)
    }

    async fn bootstrap(&self) -> Result<(), GatewayError> {
        sqlx::query(CREATE_USERS_TABLE).execute(&self.pool).await?;
        Ok(())
    }
}

fn require_non_blank(field: &str, value: &str) -> Result<(), GatewayError> {
    if value.trim().is_empty() {
        return Err(GatewayError::ConstraintViolation {
            message: format!("{field} must not be blank"),
        });
    }
    Ok(())
}

#[async_trait]
impl UserStore for SqlUserStore {
    async fn create(&self, name: &str, email: &str) -> Result<RelationalUser, GatewayError> {
        require_non_blank("name", name)?;
        require_non_blank("email", email)?;

        let user = sqlx::query_as::<_, RelationalUser>(
            "INSERT INTO users (name, email) VALUES (?, ?) RETURNING id, name, email",
        )
        .bind(name)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        debug!(id = user.id, "created user");
        Ok(user)
    }

    async fn update(&self, id: i64, name: &str) -> Result<RelationalUser, GatewayError> {
        require_non_blank("name", name)?;

        let user = sqlx::query_as::<_, RelationalUser>(
            "UPDATE users SET name = ? WHERE id = ? RETURNING id, name, email",
        )
        .bind(name)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| GatewayError::not_found("user", id.to_string()))?;

        debug!(id, "updated user");
        Ok(user)
    }

    async fn delete(&self, id: i64) -> Result<RelationalUser, GatewayError> {
        let user = sqlx::query_as::<_, RelationalUser>(
            "DELETE FROM users WHERE id = ? RETURNING id, name, email",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| GatewayError::not_found("user", id.to_string()))?;

        debug!(id, "deleted user");
        Ok(user)
    }

    async fn list_all(&self) -> Result<Vec<RelationalUser>, GatewayError> {
        let users =
            sqlx::query_as::<_, RelationalUser>("SELECT id, name, email FROM users ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqlUserStore {
        SqlUserStore::connect("sqlite::memory:", 5).await.unwrap()
    }

    #[tokio::test]
    async fn created_users_are_listed() {
        let store = store().await;

        let created = store.create("Ada", "ada@example.com").await.unwrap();
        let users = store.list_all().await.unwrap();

        assert_eq!(users, vec![created.clone()]);
        assert_eq!(created.name, "Ada");
        assert_eq!(created.email, "ada@example.com");
    }

    #[tokio::test]
    async fn ids_are_assigned_by_the_store() {
        let store = store().await;

        let first = store.create("Ada", "ada@example.com").await.unwrap();
        let second = store.create("Grace", "grace@example.com").await.unwrap();

        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_constraint_violation() {
        let store = store().await;
        store.create("Ada", "ada@example.com").await.unwrap();

        let duplicate = store.create("Other Ada", "ada@example.com").await;

        assert!(matches!(
            duplicate,
            Err(GatewayError::ConstraintViolation { .. })
        ));
    }

    #[tokio::test]
    async fn blank_fields_are_rejected() {
        let store = store().await;

        assert!(matches!(
            store.create("  ", "ada@example.com").await,
            Err(GatewayError::ConstraintViolation { .. })
        ));
        assert!(matches!(
            store.create("Ada", "").await,
            Err(GatewayError::ConstraintViolation { .. })
        ));
    }

    #[tokio::test]
    async fn update_changes_only_the_name() {
        let store = store().await;
        let created = store.create("Ada", "ada@example.com").await.unwrap();

        let updated = store.update(created.id, "Ada Lovelace").await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "Ada Lovelace");
        assert_eq!(updated.email, created.email);
    }

    #[tokio::test]
    async fn update_of_missing_row_is_not_found() {
        let store = store().await;

        assert!(matches!(
            store.update(99, "Nobody").await,
            Err(GatewayError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn double_delete_is_not_found() {
        let store = store().await;
        let created = store.create("Ada", "ada@example.com").await.unwrap();

        let deleted = store.delete(created.id).await.unwrap();
        assert_eq!(deleted, created);
        assert!(store.list_all().await.unwrap().is_empty());

        assert!(matches!(
            store.delete(created.id).await,
            Err(GatewayError::NotFound { .. })
        ));
    }
}
