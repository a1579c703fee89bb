//! User store.

use sqlx::Row;
use uuid::Uuid;

use crate::authz::{Scope, ScopePredicate};
use crate::error::{ForgeError, Result};
use crate::pagination::OffsetPagination;

use super::models::{UserRow, UserStats};
use super::Database;

const USER_COLUMNS: &str = "id, username, email, role, active, created_at, updated_at";

/// Fields accepted on user creation. The password arrives pre-hashed.
#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
}

/// Optional fields for a user update.
#[derive(Debug, Default)]
pub struct UserPatch {
    pub email: Option<String>,
    pub username: Option<String>,
}

impl Database {
    pub async fn insert_user(&self, user: &NewUser) -> Result<UserRow> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (id, username, email, password_hash, role, active)
            VALUES ($1, $2, $3, $4, $5, TRUE)
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.role)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get_user(&self, id: Uuid) -> Result<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// List users under the caller's scope. Returns the page plus the
    /// scoped total count.
    pub async fn list_users(
        &self,
        scope: Scope,
        pagination: OffsetPagination,
    ) -> Result<(Vec<UserRow>, u64)> {
        let predicate = ScopePredicate::for_users(scope, 1);

        let count_sql = format!("SELECT COUNT(*) FROM users WHERE {}", predicate.sql);
        let mut count_query = sqlx::query(&count_sql);
        if let Some(actor) = predicate.bind {
            count_query = count_query.bind(actor);
        }
        let total: i64 = count_query.fetch_one(&self.pool).await?.try_get(0)?;

        let list_sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {} \
             ORDER BY created_at DESC LIMIT {} OFFSET {}",
            predicate.sql,
            pagination.limit(),
            pagination.offset()
        );
        let mut list_query = sqlx::query_as::<_, UserRow>(&list_sql);
        if let Some(actor) = predicate.bind {
            list_query = list_query.bind(actor);
        }
        let rows = list_query.fetch_all(&self.pool).await?;

        Ok((rows, total as u64))
    }

    pub async fn update_user(&self, id: Uuid, patch: &UserPatch) -> Result<UserRow> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                email = COALESCE($3, email),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(patch.username.as_deref())
        .bind(patch.email.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| ForgeError::not_found("user", id))
    }

    pub async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<()> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(ForgeError::not_found("user", id));
        }
        Ok(())
    }

    pub async fn set_role(&self, id: Uuid, role: &str) -> Result<UserRow> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(role)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| ForgeError::not_found("user", id))
    }

    pub async fn deactivate_user(&self, id: Uuid) -> Result<()> {
        let result =
            sqlx::query("UPDATE users SET active = FALSE, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(ForgeError::not_found("user", id));
        }
        Ok(())
    }

    pub async fn delete_user(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ForgeError::not_found("user", id));
        }
        Ok(())
    }

    /// Workload counters for one user.
    pub async fn user_stats(&self, id: Uuid) -> Result<UserStats> {
        let stats = sqlx::query_as::<_, UserStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM tasks WHERE created_by = $1) AS tasks_created,
                (SELECT COUNT(*) FROM tasks WHERE assigned_to = $1) AS tasks_assigned,
                (SELECT COUNT(*) FROM tasks WHERE assigned_to = $1 AND status <> 'done') AS tasks_open,
                (SELECT COUNT(*) FROM projects WHERE created_by = $1) AS projects_created
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }
}
