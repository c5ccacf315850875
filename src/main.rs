use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::mpsc;

use doceria::app::{App, AppEvent, UiSettings};
use doceria::cli::{self, Cli};
use doceria::config::{Config, API_KEY_ENV};
use doceria::remote::RemoteStore;
use doceria::repository::CategoryRepository;
use doceria::storage::{Database, DatabaseError};
use doceria::theme::ThemeVariant;

/// ~/.config/doceria/
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("doceria"))
}

/// Create the config directory if needed and restrict it to the user.
fn prepare_config_dir(config_dir: &Path) -> Result<()> {
    if !config_dir.exists() {
        std::fs::create_dir_all(config_dir).context("Failed to create config directory")?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o700);
        if let Err(e) = std::fs::set_permissions(config_dir, perms) {
            eprintln!(
                "Warning: could not restrict {} to 0700: {}",
                config_dir.display(),
                e
            );
        }
    }
    Ok(())
}

/// The TUI owns the terminal, so its logs go to a file. Subcommands log to
/// stderr. `RUST_LOG` controls the level in both cases.
fn init_tracing(config_dir: &Path, tui: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("doceria=info"));

    if tui {
        let log_path = config_dir.join("doceria.log");
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Failed to open log file {}", log_path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

async fn open_local(db_path: &Path, reset: bool) -> Result<Database> {
    if reset && db_path.exists() {
        std::fs::remove_file(db_path).context("Failed to delete database")?;
        println!("Database reset.");
    }

    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    match Database::open(db_path_str).await {
        Ok(db) => Ok(db),
        Err(DatabaseError::InstanceLocked) => {
            eprintln!(
                "Error: Another instance of doceria appears to be running. Please close it and try again."
            );
            std::process::exit(1);
        }
        Err(e) => Err(anyhow::anyhow!("Failed to open database: {}", e)),
    }
}

async fn open_repository(args: &Cli, config: &Config, config_dir: &Path) -> Result<CategoryRepository> {
    if args.remote {
        if args.reset_db {
            tracing::warn!("--reset-db only applies to the local database; ignoring");
        }
        let settings = config
            .remote_settings(std::env::var(API_KEY_ENV).ok())
            .context("Cannot use --remote")?;
        let store = RemoteStore::new(&settings.base_url, &settings.table, settings.api_key)
            .context("Invalid remote store settings")?;
        tracing::info!(endpoint = %store.endpoint(), "Using hosted category store");
        return Ok(CategoryRepository::Remote(store));
    }

    let db_path = config
        .database_path
        .clone()
        .unwrap_or_else(|| config_dir.join("catalog.db"));
    Ok(CategoryRepository::Local(
        open_local(&db_path, args.reset_db).await?,
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let config_dir = get_config_dir()?;
    prepare_config_dir(&config_dir)?;
    init_tracing(&config_dir, args.command.is_none())?;

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    let repo = open_repository(&args, &config, &config_dir).await?;

    if let Some(command) = args.command {
        let mut stdout = std::io::stdout().lock();
        return cli::execute(command, &repo, &mut stdout).await;
    }

    let mut app = App::new(repo, UiSettings::from(&config));

    match ThemeVariant::from_str_name(&config.theme) {
        Some(variant) => app.set_theme(variant),
        None => tracing::warn!(theme = %config.theme, "Unknown theme, using dark"),
    }

    let warnings = app.keybindings.apply_overrides(&config.keybindings);
    for warning in &warnings {
        tracing::warn!("{}", warning);
    }
    if let Some(first) = warnings.first() {
        app.set_status(format!("Config: {}", first));
    }

    let (event_tx, event_rx) = mpsc::channel::<AppEvent>(32);
    doceria::ui::run(&mut app, event_tx, event_rx).await?;

    Ok(())
}
