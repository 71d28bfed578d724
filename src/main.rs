use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wavenote_server::config::{
    AppConfig, CliConfig, FileConfig, DEFAULT_ACQUIRE_TIMEOUT_SECS, DEFAULT_MAX_CONNECTIONS,
    DEFAULT_PORT,
};
use wavenote_server::sqlite_persistence::Migration;
use wavenote_server::{
    run_server, AuthManager, DbPool, LibraryManager, MigrationRunner, RequestsLoggingLevel,
    SqliteLibraryStore, SqliteUserStore, TokenIssuer,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Its values override the command line.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite database file. Created if missing.
    #[clap(long, env = "DB_PATH", value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// Maximum number of pooled database connections.
    #[clap(long, default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: u32,

    /// Seconds to wait for a free connection before failing the request.
    #[clap(long, default_value_t = DEFAULT_ACQUIRE_TIMEOUT_SECS)]
    pub acquire_timeout_secs: u64,

    /// Directory of `*.sql` migrations to use instead of the embedded ones.
    #[clap(long, value_parser = parse_path)]
    pub migrations_dir: Option<PathBuf>,

    /// Apply pending migrations and exit.
    #[clap(long)]
    pub migrate_only: bool,

    /// The port to listen on.
    #[clap(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Secret used to sign bearer tokens.
    #[clap(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_path: self.db_path.clone(),
            max_connections: self.max_connections,
            acquire_timeout_secs: self.acquire_timeout_secs,
            migrations_dir: self.migrations_dir.clone(),
            port: self.port,
            logging_level: self.logging_level.clone(),
            frontend_dir_path: self.frontend_dir_path.clone(),
            jwt_secret: self.jwt_secret.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;
    info!("Resolved configuration: {:?}", config);

    info!("Opening SQLite database at {:?}...", config.db_path);
    let pool = DbPool::new(config.pool_config())?;

    let runner = match &config.migrations_dir {
        Some(dir) => MigrationRunner::new(Migration::load_dir(dir)?),
        None => MigrationRunner::embedded(),
    };
    match runner.run(&pool) {
        Ok(report) => info!(
            "Migrations {:?}: {} applied, {} already applied",
            report.state,
            report.applied.len(),
            report.already_applied.len()
        ),
        Err(err) => {
            error!("Database migration failed: {}", err);
            std::process::exit(1);
        }
    }
    if cli_args.migrate_only {
        return Ok(());
    }

    let auth_manager = AuthManager::new(
        Arc::new(SqliteUserStore::new(pool.clone())),
        TokenIssuer::new(&config.jwt_secret),
    );
    let library_manager = LibraryManager::new(Arc::new(SqliteLibraryStore::new(pool)));

    info!("Ready to serve at port {}!", config.port);
    run_server(
        config.server_config(),
        Arc::new(auth_manager),
        Arc::new(library_manager),
    )
    .await
}
