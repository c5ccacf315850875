//! The single data-access seam used by the TUI and the CLI.

use anyhow::{Context, Result};

use crate::catalog::form::{clean_descricao, clean_nome};
use crate::remote::RemoteStore;
use crate::storage::{Category, CategoryUpdate, Database, DeletedCategory, NewCategory};

/// Either the local SQLite file or the hosted table.
///
/// Cheap to clone; spawned tasks take their own copy.
#[derive(Debug, Clone)]
pub enum CategoryRepository {
    Local(Database),
    Remote(RemoteStore),
}

impl CategoryRepository {
    pub fn describe(&self) -> String {
        match self {
            CategoryRepository::Local(_) => "local".to_string(),
            CategoryRepository::Remote(store) => store.endpoint().to_string(),
        }
    }

    /// Every row, ordered by name.
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        match self {
            CategoryRepository::Local(db) => db.list_categories().await,
            CategoryRepository::Remote(store) => store
                .list_categories()
                .await
                .context("Failed to fetch categories"),
        }
    }

    pub async fn create_category(&self, new: &NewCategory) -> Result<Category> {
        match self {
            CategoryRepository::Local(db) => db.create_category(new).await,
            CategoryRepository::Remote(store) => {
                let cleaned = NewCategory {
                    nome: clean_nome(&new.nome)?,
                    descricao: new.descricao.as_deref().and_then(clean_descricao),
                    parent_id: new.parent_id,
                };
                store
                    .create_category(&cleaned)
                    .await
                    .with_context(|| format!("Failed to create category '{}'", cleaned.nome))
            }
        }
    }

    /// Errors with "not found" when `id` does not exist.
    pub async fn update_category(&self, id: i64, update: &CategoryUpdate) -> Result<Category> {
        match self {
            CategoryRepository::Local(db) => db.update_category(id, update).await,
            CategoryRepository::Remote(store) => {
                let cleaned = CategoryUpdate {
                    nome: update.nome.as_deref().map(clean_nome).transpose()?,
                    descricao: update
                        .descricao
                        .as_ref()
                        .map(|d| d.as_deref().and_then(clean_descricao)),
                };
                store
                    .update_category(id, &cleaned)
                    .await
                    .with_context(|| format!("Failed to update category {}", id))
            }
        }
    }

    /// Delete `id` and, through the store's cascade, its descendants.
    ///
    /// `None` when `id` was already gone.
    pub async fn delete_category(&self, id: i64) -> Result<Option<DeletedCategory>> {
        match self {
            CategoryRepository::Local(db) => db.delete_category(id).await,
            CategoryRepository::Remote(store) => store
                .delete_category(id)
                .await
                .with_context(|| format!("Failed to delete category {}", id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_round_trip() {
        let repo = CategoryRepository::Local(Database::open(":memory:").await.unwrap());
        let bolos = repo.create_category(&NewCategory::root("Bolos")).await.unwrap();
        repo.create_category(&NewCategory::child_of(bolos.id, "Recheados"))
            .await
            .unwrap();

        let renamed = repo
            .update_category(bolos.id, &CategoryUpdate::rename("Bolos caseiros"))
            .await
            .unwrap();
        assert_eq!(renamed.nome, "Bolos caseiros");

        let deleted = repo.delete_category(bolos.id).await.unwrap().unwrap();
        assert_eq!(deleted.category.nome, "Bolos caseiros");
        assert_eq!(deleted.descendants(), Some(1));
        assert!(repo.list_categories().await.unwrap().is_empty());
        assert_eq!(repo.delete_category(bolos.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_local_describe() {
        let repo = CategoryRepository::Local(Database::open(":memory:").await.unwrap());
        assert_eq!(repo.describe(), "local");
    }
}
