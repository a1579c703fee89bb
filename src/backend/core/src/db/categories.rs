//! Category store.

use sqlx::Row;
use uuid::Uuid;

use crate::error::{ForgeError, Result};
use crate::pagination::OffsetPagination;

use super::models::CategoryRow;
use super::Database;

const CATEGORY_COLUMNS: &str = "id, name, description, created_at";

#[derive(Debug)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl Database {
    pub async fn insert_category(&self, category: &NewCategory) -> Result<CategoryRow> {
        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            r#"
            INSERT INTO categories (id, name, description)
            VALUES ($1, $2, $3)
            RETURNING {CATEGORY_COLUMNS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(&category.name)
        .bind(category.description.as_deref())
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get_category(&self, id: Uuid) -> Result<Option<CategoryRow>> {
        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Categories are globally readable; the only filter is pagination.
    pub async fn list_categories(
        &self,
        pagination: OffsetPagination,
    ) -> Result<(Vec<CategoryRow>, u64)> {
        let total: i64 = sqlx::query("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?;

        let rows = sqlx::query_as::<_, CategoryRow>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name \
             LIMIT {} OFFSET {}",
            pagination.limit(),
            pagination.offset()
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok((rows, total as u64))
    }

    pub async fn update_category(&self, id: Uuid, patch: &CategoryPatch) -> Result<CategoryRow> {
        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            r#"
            UPDATE categories
            SET name = COALESCE($2, name),
                description = COALESCE($3, description)
            WHERE id = $1
            RETURNING {CATEGORY_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(patch.name.as_deref())
        .bind(patch.description.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| ForgeError::not_found("category", id))
    }

    pub async fn delete_category(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ForgeError::not_found("category", id));
        }
        Ok(())
    }
}
