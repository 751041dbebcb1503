//! Connection settings
//!
//! Settings are read once at process start from a dotenv file (a `.env` by
//! default) and handed to the providers by value. Process environment
//! variables with the same keys take precedence over the file.
//!
//! | Key                  | Default     |
//! |----------------------|-------------|
//! | `DB_HOST`            | `localhost` |
//! | `DB_PORT`            | `3306`      |
//! | `DB_DATABASE`        | `sigtap`    |
//! | `DB_USERNAME`        | `root`      |
//! | `DB_PASSWORD`        | (empty)     |
//! | `DB_MAX_CONNECTIONS` | `5`         |

use config::{Config, Environment};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Prefix shared by every settings key
pub const KEY_PREFIX: &str = "DB";

pub const HOST_KEY: &str = "DB_HOST";
pub const PORT_KEY: &str = "DB_PORT";
pub const DATABASE_KEY: &str = "DB_DATABASE";
pub const USERNAME_KEY: &str = "DB_USERNAME";
pub const PASSWORD_KEY: &str = "DB_PASSWORD";
pub const MAX_CONNECTIONS_KEY: &str = "DB_MAX_CONNECTIONS";

/// Settings error type
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings file {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("Invalid settings: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Database connection parameters
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            database: "sigtap".to_string(),
            username: "root".to_string(),
            password: String::new(),
            max_connections: 5,
        }
    }
}

// The password never reaches the logs
impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("DatabaseSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"***")
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

#[cfg(feature = "mysql")]
impl DatabaseSettings {
    /// Connect options for the configured database
    pub fn mysql_options(&self) -> sqlx::mysql::MySqlConnectOptions {
        self.mysql_server_options().database(&self.database)
    }

    /// Connect options for the server alone, without selecting a database
    pub fn mysql_server_options(&self) -> sqlx::mysql::MySqlConnectOptions {
        sqlx::mysql::MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(&self.password)
            .charset("utf8mb4")
    }
}

/// Process-wide settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub database: DatabaseSettings,
}

impl Settings {
    /// Load settings from a dotenv file, then apply environment overrides
    ///
    /// A missing file is not an error: every key falls back to its default.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let file_values = read_dotenv(path.as_ref())?;
        Self::from_sources(file_values, None)
    }

    /// Build settings from file values and an environment
    ///
    /// `environment` defaults to the process environment. It wins over the
    /// file; both fall back to the defaults.
    pub fn from_sources(
        file_values: HashMap<String, String>,
        environment: Option<HashMap<String, String>>,
    ) -> Result<Self, SettingsError> {
        let config = Config::builder()
            .add_source(Environment::with_prefix(KEY_PREFIX).source(Some(file_values.into_iter().collect())))
            .add_source(
                Environment::with_prefix(KEY_PREFIX)
                    .source(environment.map(|values| values.into_iter().collect())),
            )
            .build()?;

        let database: DatabaseSettings = config.try_deserialize()?;
        if database.max_connections == 0 {
            return Err(SettingsError::InvalidValue {
                key: MAX_CONNECTIONS_KEY,
                value: "0".to_string(),
            });
        }

        Ok(Self { database })
    }
}

/// Read the `KEY=VALUE` pairs of a dotenv file; a missing file reads as empty
pub fn read_dotenv(path: &Path) -> Result<HashMap<String, String>, SettingsError> {
    let file_error = |source| SettingsError::File {
        path: path.to_path_buf(),
        source,
    };

    let lines = match dotenvy::from_path_iter(path) {
        Ok(lines) => lines,
        Err(error) if error.not_found() => {
            tracing::info!(path = %path.display(), "settings file not found, using defaults");
            return Ok(HashMap::new());
        }
        Err(error) => return Err(file_error(error)),
    };

    lines
        .map(|line| line.map_err(file_error))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn dotenv_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn without_environment(file_values: HashMap<String, String>) -> Result<Settings, SettingsError> {
        Settings::from_sources(file_values, Some(HashMap::new()))
    }

    #[test]
    fn test_read_dotenv_syntax() {
        let file = dotenv_file(
            "# SIGTAP\nDB_HOST=db # primary\n\nexport DB_USERNAME=sigtap_ro\nDB_PASSWORD=\"p=ss \\\"word\\\"\"\nDB_DATABASE='SIgtap'\n",
        );
        let values = read_dotenv(file.path()).unwrap();
        assert_eq!(values["DB_HOST"], "db");
        assert_eq!(values["DB_USERNAME"], "sigtap_ro");
        assert_eq!(values["DB_PASSWORD"], "p=ss \"word\"");
        assert_eq!(values["DB_DATABASE"], "SIgtap");
        assert_eq!(values.len(), 4);
    }

    #[test]
    fn test_defaults_when_keys_missing() {
        let settings = without_environment(HashMap::new()).unwrap();
        assert_eq!(settings.database, DatabaseSettings::default());
        assert_eq!(settings.database.host, "localhost");
        assert_eq!(settings.database.port, 3306);
        assert!(settings.database.password.is_empty());
    }

    #[test]
    fn test_file_values_are_typed() {
        let file_values = HashMap::from([
            (PORT_KEY.to_string(), "3307".to_string()),
            (MAX_CONNECTIONS_KEY.to_string(), "2".to_string()),
            (PASSWORD_KEY.to_string(), "1234".to_string()),
        ]);
        let settings = without_environment(file_values).unwrap();
        assert_eq!(settings.database.port, 3307);
        assert_eq!(settings.database.max_connections, 2);
        assert_eq!(settings.database.password, "1234");
    }

    #[test]
    fn test_environment_overrides_file() {
        let file_values = HashMap::from([
            (HOST_KEY.to_string(), "file-host".to_string()),
            (PORT_KEY.to_string(), "3307".to_string()),
        ]);
        let environment = HashMap::from([(HOST_KEY.to_string(), "env-host".to_string())]);

        let settings = Settings::from_sources(file_values, Some(environment)).unwrap();
        assert_eq!(settings.database.host, "env-host");
        assert_eq!(settings.database.port, 3307);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let file_values = HashMap::from([(PORT_KEY.to_string(), "mysql".to_string())]);
        let error = without_environment(file_values).unwrap_err();
        assert!(matches!(error, SettingsError::Config(_)), "{error:?}");

        let file_values = HashMap::from([(MAX_CONNECTIONS_KEY.to_string(), "0".to_string())]);
        let error = without_environment(file_values).unwrap_err();
        assert!(matches!(error, SettingsError::InvalidValue { key: MAX_CONNECTIONS_KEY, .. }));
    }

    #[test]
    fn test_read_missing_file_is_empty() {
        let directory = tempfile::tempdir().unwrap();
        assert!(read_dotenv(&directory.path().join("absent.env")).unwrap().is_empty());
    }

    #[test]
    fn test_debug_hides_password() {
        let settings = DatabaseSettings {
            password: "secret".to_string(),
            ..DatabaseSettings::default()
        };
        assert!(!format!("{settings:?}").contains("secret"));
    }
}
