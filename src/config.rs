use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::db::{ConnectOptions, SslMode};

pub const DEFAULT_NAMESPACE: &str = "public";
pub const DEFAULT_COMPARE_WITH: &str = "server/db/schema.ts";

/// Discrete connection fields, used when no URL is configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConnection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_user")]
    pub database: String,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_user() -> String {
    "postgres".to_string()
}

impl DatabaseConnection {
    pub fn to_connection_string(&self) -> String {
        let mut parts = vec![
            format!("host={}", quote(&self.host)),
            format!("port={}", self.port),
            format!("user={}", quote(&self.user)),
        ];
        if !self.password.is_empty() {
            parts.push(format!("password={}", quote(&self.password)));
        }
        parts.push(format!("dbname={}", quote(&self.database)));
        parts.join(" ")
    }
}

// Key/value connection strings need quoting once a value has spaces or quotes.
fn quote(value: &str) -> String {
    if !value.is_empty() && !value.contains([' ', '\'', '\\']) {
        return value.to_string();
    }
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}

/// Contents of `~/.config/pg-schema-report/config.json`. Every field is optional.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<DatabaseConnection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_mode: Option<SslMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_with: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("invalid config file {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::get_config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
        Ok(home.join(".config").join("pg-schema-report").join("config.json"))
    }
}

/// Final settings after merging the command line, the environment and the file.
#[derive(Debug, Clone)]
pub struct Settings {
    pub connect: ConnectOptions,
    pub compare_with: String,
}

impl Settings {
    /// Flags (and `DATABASE_URL`, through clap) win over the config file.
    pub fn resolve(cli: &Cli, config: &Config) -> Result<Self> {
        let url = cli
            .database_url
            .clone()
            .or_else(|| config.database_url.clone())
            .or_else(|| config.connection.as_ref().map(|c| c.to_connection_string()))
            .filter(|url| !url.trim().is_empty())
            .context(
                "no database connection configured: pass --database-url, set DATABASE_URL, \
                 or add database_url to the config file",
            )?;

        let namespace = cli
            .schema
            .clone()
            .or_else(|| config.schema.clone())
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

        let ssl_mode = cli.ssl_mode.or(config.ssl_mode).unwrap_or_default();

        let compare_with = cli
            .compare_with
            .clone()
            .or_else(|| config.compare_with.clone())
            .unwrap_or_else(|| DEFAULT_COMPARE_WITH.to_string());

        Ok(Settings {
            connect: ConnectOptions {
                namespace,
                ssl_mode,
                ..ConnectOptions::new(url)
            },
            compare_with,
        })
    }

    /// What `--write-config` stores. The credential is never written back.
    pub fn to_config(&self, existing: &Config) -> Config {
        Config {
            database_url: existing.database_url.clone(),
            connection: existing.connection.clone(),
            schema: Some(self.connect.namespace.clone()),
            ssl_mode: Some(self.connect.ssl_mode),
            compare_with: Some(self.compare_with.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["pg-schema-report"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            schema: Some("audit".to_string()),
            ssl_mode: Some(SslMode::Require),
            ..Default::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("invalid config file"));
    }

    #[test]
    fn flag_wins_over_file() {
        let config = Config {
            database_url: Some("postgresql://file@localhost/db".to_string()),
            schema: Some("audit".to_string()),
            ..Default::default()
        };
        let settings = Settings::resolve(
            &cli(&["--database-url", "postgresql://flag@localhost/db", "--schema", "sales"]),
            &config,
        )
        .unwrap();
        assert_eq!(settings.connect.url, "postgresql://flag@localhost/db");
        assert_eq!(settings.connect.namespace, "sales");
    }

    #[test]
    fn file_fills_in_and_defaults_apply() {
        let config = Config {
            database_url: Some("postgresql://file@localhost/db".to_string()),
            ..Default::default()
        };
        let mut args = cli(&[]);
        // DATABASE_URL may be set in the test environment.
        args.database_url = None;
        let settings = Settings::resolve(&args, &config).unwrap();
        assert_eq!(settings.connect.url, "postgresql://file@localhost/db");
        assert_eq!(settings.connect.namespace, "public");
        assert_eq!(settings.connect.ssl_mode, SslMode::Prefer);
        assert_eq!(settings.compare_with, "server/db/schema.ts");
    }

    #[test]
    fn connection_fields_build_key_value_string() {
        let config = Config {
            connection: Some(DatabaseConnection {
                host: "db.internal".to_string(),
                port: 6543,
                user: "report".to_string(),
                password: "it's secret".to_string(),
                database: "app".to_string(),
            }),
            ..Default::default()
        };
        let mut args = cli(&[]);
        args.database_url = None;
        let settings = Settings::resolve(&args, &config).unwrap();
        assert_eq!(
            settings.connect.url,
            "host=db.internal port=6543 user=report password='it\\'s secret' dbname=app"
        );
    }

    #[test]
    fn no_connection_anywhere_is_an_error() {
        let mut args = cli(&[]);
        args.database_url = None;
        let err = Settings::resolve(&args, &Config::default()).unwrap_err();
        assert!(err.to_string().contains("no database connection configured"));
    }

    #[test]
    fn written_config_keeps_credentials_out() {
        let existing = Config::default();
        let settings = Settings {
            connect: ConnectOptions::new("postgresql://secret@localhost/db"),
            compare_with: DEFAULT_COMPARE_WITH.to_string(),
        };
        let written = settings.to_config(&existing);
        assert_eq!(written.database_url, None);
        assert_eq!(written.schema.as_deref(), Some("public"));
    }
}
