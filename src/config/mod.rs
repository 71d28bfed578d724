mod file_config;

pub use file_config::FileConfig;

use crate::server::{RequestsLoggingLevel, ServerConfig};
use crate::sqlite_persistence::PoolConfig;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PORT: u16 = 3001;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub migrations_dir: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub jwt_secret: Option<String>,
}

#[derive(Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub migrations_dir: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub jwt_secret: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("db_path", &self.db_path)
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .field("migrations_dir", &self.migrations_dir)
            .field("port", &self.port)
            .field("logging_level", &self.logging_level)
            .field("frontend_dir_path", &self.frontend_dir_path)
            .field("jwt_secret", &"<redacted>")
            .finish()
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_path must be specified via --db-path or in config file")
            })?;
        if db_path.is_dir() {
            bail!("db_path is a directory: {:?}", db_path);
        }

        let max_connections = file.max_connections.unwrap_or(cli.max_connections);
        if max_connections == 0 {
            bail!("max_connections must be at least 1");
        }
        let acquire_timeout_secs = file
            .acquire_timeout_secs
            .unwrap_or(cli.acquire_timeout_secs);
        if acquire_timeout_secs == 0 {
            bail!("acquire_timeout_secs must be at least 1");
        }

        let migrations_dir = file
            .migrations_dir
            .map(PathBuf::from)
            .or_else(|| cli.migrations_dir.clone());
        if let Some(dir) = &migrations_dir {
            if !dir.is_dir() {
                bail!("Migrations directory does not exist: {:?}", dir);
            }
        }

        let port = file.port.unwrap_or(cli.port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let jwt_secret = file
            .jwt_secret
            .or_else(|| cli.jwt_secret.clone())
            .filter(|secret| !secret.trim().is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "jwt_secret must be specified via --jwt-secret, JWT_SECRET or in config file"
                )
            })?;

        Ok(Self {
            db_path,
            max_connections,
            acquire_timeout_secs,
            migrations_dir,
            port,
            logging_level,
            frontend_dir_path,
            jwt_secret,
        })
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::new(&self.db_path)
            .with_max_size(self.max_connections)
            .with_acquire_timeout(Duration::from_secs(self.acquire_timeout_secs))
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            requests_logging_level: self.logging_level.clone(),
            port: self.port,
            frontend_dir_path: self.frontend_dir_path.clone(),
        }
    }
}

fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_cli(temp_dir: &TempDir) -> CliConfig {
        CliConfig {
            db_path: Some(temp_dir.path().join("wavenote.db")),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
            migrations_dir: None,
            port: DEFAULT_PORT,
            logging_level: RequestsLoggingLevel::Headers,
            frontend_dir_path: Some("/frontend".to_string()),
            jwt_secret: Some("cli-secret".to_string()),
        }
    }

    #[test]
    fn test_parse_logging_level() {
        assert!(matches!(
            parse_logging_level("none"),
            Some(RequestsLoggingLevel::None)
        ));
        assert!(matches!(
            parse_logging_level("path"),
            Some(RequestsLoggingLevel::Path)
        ));
        assert!(matches!(
            parse_logging_level("headers"),
            Some(RequestsLoggingLevel::Headers)
        ));
        assert!(matches!(
            parse_logging_level("body"),
            Some(RequestsLoggingLevel::Body)
        ));
        assert!(matches!(
            parse_logging_level("PATH"),
            Some(RequestsLoggingLevel::Path)
        ));
        assert!(parse_logging_level("invalid").is_none());
    }

    #[test]
    fn test_resolve_cli_only() {
        let temp_dir = TempDir::new().unwrap();
        let cli = make_cli(&temp_dir);

        let config = AppConfig::resolve(&cli, None).unwrap();

        assert_eq!(config.db_path, temp_dir.path().join("wavenote.db"));
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.acquire_timeout_secs, 30);
        assert_eq!(config.port, 3001);
        assert_eq!(config.logging_level, RequestsLoggingLevel::Headers);
        assert_eq!(config.frontend_dir_path, Some("/frontend".to_string()));
        assert_eq!(config.jwt_secret, "cli-secret");
        assert!(config.migrations_dir.is_none());
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let temp_dir = TempDir::new().unwrap();
        let cli = make_cli(&temp_dir);
        let file = FileConfig {
            db_path: Some("/data/other.db".to_string()),
            max_connections: Some(4),
            acquire_timeout_secs: Some(5),
            migrations_dir: Some(temp_dir.path().to_string_lossy().to_string()),
            port: Some(8080),
            logging_level: Some("body".to_string()),
            frontend_dir_path: None,
            jwt_secret: Some("file-secret".to_string()),
        };

        let config = AppConfig::resolve(&cli, Some(file)).unwrap();

        assert_eq!(config.db_path, PathBuf::from("/data/other.db"));
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.acquire_timeout_secs, 5);
        assert_eq!(config.migrations_dir.as_deref(), Some(temp_dir.path()));
        assert_eq!(config.port, 8080);
        assert_eq!(config.logging_level, RequestsLoggingLevel::Body);
        // Not set in TOML, falls back to CLI
        assert_eq!(config.frontend_dir_path, Some("/frontend".to_string()));
        assert_eq!(config.jwt_secret, "file-secret");
    }

    #[test]
    fn test_resolve_invalid_toml_logging_level_falls_back_to_cli() {
        let temp_dir = TempDir::new().unwrap();
        let file = FileConfig {
            logging_level: Some("loud".to_string()),
            ..Default::default()
        };
        let config = AppConfig::resolve(&make_cli(&temp_dir), Some(file)).unwrap();
        assert_eq!(config.logging_level, RequestsLoggingLevel::Headers);
    }

    #[test]
    fn test_resolve_missing_db_path_error() {
        let temp_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            db_path: None,
            ..make_cli(&temp_dir)
        };
        let err = AppConfig::resolve(&cli, None).unwrap_err();
        assert!(err.to_string().contains("db_path"));
    }

    #[test]
    fn test_resolve_db_path_is_directory_error() {
        let temp_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            db_path: Some(temp_dir.path().to_path_buf()),
            ..make_cli(&temp_dir)
        };
        assert!(AppConfig::resolve(&cli, None).is_err());
    }

    #[test]
    fn test_resolve_missing_or_blank_secret_error() {
        let temp_dir = TempDir::new().unwrap();
        for secret in [None, Some("   ".to_string())] {
            let cli = CliConfig {
                jwt_secret: secret,
                ..make_cli(&temp_dir)
            };
            let err = AppConfig::resolve(&cli, None).unwrap_err();
            assert!(err.to_string().contains("jwt_secret"));
        }
    }

    #[test]
    fn test_resolve_nonexistent_migrations_dir_error() {
        let temp_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            migrations_dir: Some(temp_dir.path().join("nope")),
            ..make_cli(&temp_dir)
        };
        assert!(AppConfig::resolve(&cli, None).is_err());
    }

    #[test]
    fn test_resolve_zero_pool_limits_error() {
        let temp_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            max_connections: 0,
            ..make_cli(&temp_dir)
        };
        let err = AppConfig::resolve(&cli, None).unwrap_err();
        assert!(err.to_string().contains("max_connections"));

        let cli = CliConfig {
            acquire_timeout_secs: 0,
            ..make_cli(&temp_dir)
        };
        let err = AppConfig::resolve(&cli, None).unwrap_err();
        assert!(err.to_string().contains("acquire_timeout_secs"));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig::resolve(&make_cli(&temp_dir), None).unwrap();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("cli-secret"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_server_config_mirrors_app_config() {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig::resolve(&make_cli(&temp_dir), None).unwrap();
        let server_config = config.server_config();
        assert_eq!(server_config.port, 3001);
        assert_eq!(
            server_config.requests_logging_level,
            RequestsLoggingLevel::Headers
        );
        assert_eq!(server_config.frontend_dir_path, Some("/frontend".to_string()));
    }
}
