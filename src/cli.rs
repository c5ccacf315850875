//! Command-line arguments and the headless subcommands.
//!
//! With no subcommand the binary opens the TUI. Every subcommand goes through
//! the same [`CategoryRepository`] the TUI uses.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

use crate::catalog::build_forest;
use crate::repository::CategoryRepository;
use crate::storage::{CategoryUpdate, NewCategory};
use crate::util::strip_control_chars;

/// Terminal manager for a bakery catalog's category hierarchy
#[derive(Parser, Debug)]
#[command(name = "doceria")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Run 'doceria' without a subcommand to open the catalog browser.")]
pub struct Cli {
    /// Config file (default: ~/.config/doceria/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Delete and recreate the local database
    #[arg(long, global = true)]
    pub reset_db: bool,

    /// Use the hosted store from the [remote] config section
    #[arg(long, global = true)]
    pub remote: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Print the category tree
    List {
        /// Flattened entries as JSON, with level and full path
        #[arg(long)]
        json: bool,

        /// Nested JSON (implies --json)
        #[arg(long)]
        nested: bool,
    },

    /// Create a category
    Add {
        /// Category name
        nome: String,

        /// Parent category id
        #[arg(short, long)]
        parent: Option<i64>,

        /// Optional description
        #[arg(short, long)]
        descricao: Option<String>,
    },

    /// Rename a category
    Rename {
        id: i64,
        nome: String,
    },

    /// Delete a category and all of its subcategories
    Remove {
        id: i64,
    },
}

/// Run one subcommand, writing human or JSON output to `out`.
pub async fn execute(
    command: Commands,
    repo: &CategoryRepository,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        Commands::List { json, nested } => {
            let categories = repo.list_categories().await?;
            let forest = build_forest(&categories);
            if !forest.cycle_breaks().is_empty() {
                tracing::warn!(ids = ?forest.cycle_breaks(), "Parent cycles broken while listing");
            }
            if nested {
                serde_json::to_writer_pretty(&mut *out, &forest.roots())
                    .context("Failed to encode categories")?;
                writeln!(out)?;
            } else if json {
                serde_json::to_writer_pretty(&mut *out, forest.entries())
                    .context("Failed to encode categories")?;
                writeln!(out)?;
            } else if forest.is_empty() {
                writeln!(out, "No categories found")?;
            } else {
                for entry in forest.entries() {
                    writeln!(
                        out,
                        "{}{}  [{}]",
                        "  ".repeat(entry.nivel),
                        strip_control_chars(&entry.nome),
                        entry.id
                    )?;
                }
            }
        }
        Commands::Add {
            nome,
            parent,
            descricao,
        } => {
            let new = NewCategory {
                nome,
                descricao,
                parent_id: parent,
            };
            let category = repo.create_category(&new).await?;
            writeln!(
                out,
                "Created '{}' [{}]",
                strip_control_chars(&category.nome),
                category.id
            )?;
        }
        Commands::Rename { id, nome } => {
            let category = repo
                .update_category(id, &CategoryUpdate::rename(nome))
                .await?;
            writeln!(
                out,
                "Renamed [{}] to '{}'",
                category.id,
                strip_control_chars(&category.nome)
            )?;
        }
        Commands::Remove { id } => {
            let Some(deleted) = repo.delete_category(id).await? else {
                anyhow::bail!("Category {} not found", id);
            };
            let nome = strip_control_chars(&deleted.category.nome);
            match deleted.descendants() {
                Some(0) => writeln!(out, "Deleted '{}'", nome)?,
                Some(n) => writeln!(out, "Deleted '{}' and {} subcategories", nome, n)?,
                None => writeln!(out, "Deleted '{}' and any subcategories", nome)?,
            }
        }
    }
    Ok(())
}
