use anyhow::{bail, Context, Result};
use chrono::Utc;

use super::schema::Database;
use super::types::{Category, CategoryDbRow, CategoryUpdate, DeletedCategory, NewCategory};
use crate::catalog::form::{clean_descricao, clean_nome};

const CATEGORY_COLUMNS: &str = "id, nome, parent_id, descricao, created_at, updated_at";

// ============================================================================
// Category Operations
// ============================================================================

impl Database {
    /// All categories ordered by name, ties broken by id.
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows: Vec<CategoryDbRow> = sqlx::query_as(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categorias ORDER BY nome, id"
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list categories")?;

        Ok(rows.into_iter().map(CategoryDbRow::into_category).collect())
    }

    /// Insert a category and return the stored row.
    ///
    /// The name is cleaned the same way the form cleans it, so the CLI and
    /// TUI store identical values.
    pub async fn create_category(&self, new: &NewCategory) -> Result<Category> {
        let nome = clean_nome(&new.nome)?;
        let descricao = new.descricao.as_deref().and_then(clean_descricao);
        let now = Utc::now().timestamp();

        let mut tx = self.pool.begin().await?;

        if let Some(parent_id) = new.parent_id {
            let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM categorias WHERE id = ?")
                .bind(parent_id)
                .fetch_optional(&mut *tx)
                .await?;
            if exists.is_none() {
                bail!("Parent category {} not found", parent_id);
            }
        }

        let row: CategoryDbRow = sqlx::query_as(&format!(
            "INSERT INTO categorias (nome, parent_id, descricao, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?) RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(&nome)
        .bind(new.parent_id)
        .bind(&descricao)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .with_context(|| format!("Failed to create category '{}'", nome))?;

        tx.commit().await?;

        tracing::debug!(id = row.id, parent_id = ?row.parent_id, "Category created");
        Ok(row.into_category())
    }

    /// Apply a partial update. Errors when `id` does not exist.
    pub async fn update_category(&self, id: i64, update: &CategoryUpdate) -> Result<Category> {
        let nome = update.nome.as_deref().map(clean_nome).transpose()?;
        let set_descricao = update.descricao.is_some();
        let descricao = update
            .descricao
            .as_ref()
            .and_then(|d| d.as_deref().and_then(clean_descricao));

        let row: Option<CategoryDbRow> = sqlx::query_as(&format!(
            "UPDATE categorias SET \
                 nome = COALESCE(?, nome), \
                 descricao = CASE WHEN ? THEN ? ELSE descricao END, \
                 updated_at = ? \
             WHERE id = ? RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(&nome)
        .bind(set_descricao)
        .bind(&descricao)
        .bind(Utc::now().timestamp())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to update category {}", id))?;

        match row {
            Some(row) => Ok(row.into_category()),
            None => bail!("Category {} not found", id),
        }
    }

    /// Delete a category. `ON DELETE CASCADE` removes its descendants.
    ///
    /// The subtree is counted and removed in one transaction. Returns `None`
    /// when `id` does not exist.
    pub async fn delete_category(&self, id: i64) -> Result<Option<DeletedCategory>> {
        let mut tx = self.pool.begin().await?;

        let row: Option<CategoryDbRow> = sqlx::query_as(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categorias WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .with_context(|| format!("Failed to load category {}", id))?;
        let Some(row) = row else {
            return Ok(None);
        };

        // UNION (not UNION ALL) deduplicates, so a corrupted cyclic chain
        // still terminates
        let (count,): (i64,) = sqlx::query_as(
            r#"
            WITH RECURSIVE subtree(id) AS (
                SELECT id FROM categorias WHERE id = ?
                UNION
                SELECT c.id FROM categorias c JOIN subtree s ON c.parent_id = s.id
            )
            SELECT COUNT(*) FROM subtree
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .with_context(|| format!("Failed to count subtree of category {}", id))?;

        sqlx::query("DELETE FROM categorias WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to delete category {}", id))?;

        tx.commit().await?;

        let removed = u64::try_from(count).unwrap_or(0);
        tracing::debug!(id, removed, "Category deleted");
        Ok(Some(DeletedCategory {
            category: row.into_category(),
            removed: Some(removed),
        }))
    }
}
