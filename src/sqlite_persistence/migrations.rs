use super::pool::{log_query, DbPool, PoolError};
use anyhow::{Context, Result};
use rusqlite::{params, TransactionBehavior};
use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info};

const LEDGER_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS migrations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    executed_at INTEGER NOT NULL DEFAULT (cast(strftime('%s','now') as int))
);";

/// Migrations compiled into the binary. Append only, never edit an entry once shipped.
const EMBEDDED_MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_create_users.sql",
        include_str!("../../migrations/001_create_users.sql"),
    ),
    (
        "002_create_projects.sql",
        include_str!("../../migrations/002_create_projects.sql"),
    ),
    (
        "003_create_songs.sql",
        include_str!("../../migrations/003_create_songs.sql"),
    ),
    (
        "004_create_versions.sql",
        include_str!("../../migrations/004_create_versions.sql"),
    ),
    (
        "005_create_feedback.sql",
        include_str!("../../migrations/005_create_feedback.sql"),
    ),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub name: String,
    pub sql: String,
}

impl Migration {
    pub fn new<N: Into<String>, S: Into<String>>(name: N, sql: S) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
        }
    }

    pub fn embedded() -> Vec<Migration> {
        EMBEDDED_MIGRATIONS
            .iter()
            .map(|(name, sql)| Migration::new(*name, *sql))
            .collect()
    }

    /// Reads every `*.sql` file in `dir`.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<Migration>> {
        let dir = dir.as_ref();
        let mut migrations = vec![];
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read migrations directory {:?}", dir))?
        {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("sql") {
                continue;
            }
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            let sql = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read migration {:?}", path))?;
            migrations.push(Migration { name, sql });
        }
        Ok(migrations)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Pending,
    Running,
    Committed,
    RolledBack,
}

#[derive(Debug)]
pub struct MigrationReport {
    pub applied: Vec<String>,
    pub already_applied: Vec<String>,
    pub state: BatchState,
}

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("migration {name} failed, batch rolled back: {source}")]
    Failed {
        name: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("migration ledger error: {0}")]
    Ledger(#[from] rusqlite::Error),
}

pub struct MigrationRunner {
    migrations: Vec<Migration>,
}

impl MigrationRunner {
    pub fn new(mut migrations: Vec<Migration>) -> Self {
        migrations.sort_by(|a, b| a.name.cmp(&b.name));
        Self { migrations }
    }

    pub fn embedded() -> Self {
        Self::new(Migration::embedded())
    }

    pub fn migration_names(&self) -> Vec<&str> {
        self.migrations.iter().map(|m| m.name.as_str()).collect()
    }

    /// Applies every migration missing from the ledger in a single transaction.
    pub fn run(&self, pool: &DbPool) -> Result<MigrationReport, MigrationError> {
        let mut conn = pool.get()?;
        conn.execute_batch(LEDGER_TABLE_SQL)?;

        let applied_names: HashSet<String> = {
            let mut stmt = conn.prepare("SELECT name FROM migrations")?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<_>>()?;
            names
        };

        let (already_applied, pending): (Vec<&Migration>, Vec<&Migration>) = self
            .migrations
            .iter()
            .partition(|m| applied_names.contains(&m.name));

        let mut report = MigrationReport {
            applied: vec![],
            already_applied: already_applied.iter().map(|m| m.name.clone()).collect(),
            state: BatchState::Pending,
        };
        for name in report.already_applied.iter() {
            debug!("Migration already executed: {}", name);
        }

        if pending.is_empty() {
            info!(
                "Database schema up to date ({} migrations applied)",
                report.already_applied.len()
            );
            report.state = BatchState::Committed;
            return Ok(report);
        }

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        report.state = BatchState::Running;
        info!("Running {} pending migrations...", pending.len());

        for migration in pending {
            info!("Running migration: {}", migration.name);
            let start = Instant::now();
            let result = tx.execute_batch(&migration.sql).and_then(|_| {
                tx.execute(
                    "INSERT INTO migrations (name) VALUES (?1)",
                    params![migration.name],
                )
            });

            if let Err(source) = result {
                error!("Migration {} failed: {}", migration.name, source);
                if let Err(rollback_err) = tx.rollback() {
                    error!("Rollback failed: {}", rollback_err);
                }
                report.state = BatchState::RolledBack;
                return Err(MigrationError::Failed {
                    name: migration.name.clone(),
                    source,
                });
            }
            log_query(&migration.name, start.elapsed(), 0);
            report.applied.push(migration.name.clone());
        }

        tx.commit()?;
        report.state = BatchState::Committed;
        info!("All migrations completed successfully");
        Ok(report)
    }
}
