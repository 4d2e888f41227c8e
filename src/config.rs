use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use config;

/// Base settings (web host/port) shipped with the repository.
pub const DEFAULT_SETTINGS_FILE: &str = "config/default.toml";

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub web: WebConfig,
    // Populated from the .env file
    pub database_path: String,
    pub media_path: String,
    pub allowed_origins: String,
    pub log_level: String,
    pub session_secret_key: String,
    pub use_secure_cookies: bool,
    pub seed_file: Option<String>,
    /// Password for the `admin` account created at startup when missing.
    pub admin_password: Option<String>,
}

fn missing(key: &str) -> config::ConfigError {
    config::ConfigError::Message(format!(
        "FATAL: Environment variable '{}' is not set in your .env file.",
        key
    ))
}

impl Config {
    pub fn from_env(env_path: &Path) -> Result<Self, config::ConfigError> {
        dotenvy::from_path(env_path)
            .map_err(|e| config::ConfigError::Message(format!(
                "FATAL: Failed to load .env file from '{}'. Error: {}", env_path.display(), e
            )))?;

        let vars: HashMap<String, String> = env::vars().collect();
        Self::from_values(&vars, Path::new(DEFAULT_SETTINGS_FILE))
    }

    /// Validates raw key/value pairs and merges them over the TOML defaults.
    pub fn from_values(
        vars: &HashMap<String, String>,
        defaults_file: &Path,
    ) -> Result<Self, config::ConfigError> {
        let database_path = vars.get("DATABASE_PATH").cloned().ok_or_else(|| missing("DATABASE_PATH"))?;
        let media_path = vars.get("MEDIA_PATH").cloned().ok_or_else(|| missing("MEDIA_PATH"))?;
        let session_secret_key = vars.get("SESSION_SECRET_KEY").cloned().ok_or_else(|| missing("SESSION_SECRET_KEY"))?;

        // 128 hex characters (64 bytes), the minimum cookie key size.
        if session_secret_key.len() != 128 || !session_secret_key.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(config::ConfigError::Message(
                "FATAL: 'SESSION_SECRET_KEY' must be 128 hexadecimal characters long (64 bytes).".to_string()
            ));
        }

        let allowed_origins = vars.get("ALLOWED_ORIGINS").cloned().unwrap_or_default();
        let log_level = vars.get("LOG_LEVEL").cloned().unwrap_or_else(|| "info".to_string());
        let use_secure_cookies = vars
            .get("USE_SECURE_COOKIES")
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(false);
        let seed_file = vars
            .get("SEED_FILE")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let admin_password = vars.get("ADMIN_PASSWORD").cloned().filter(|s| !s.is_empty());

        if Path::new(&database_path).is_relative() {
            return Err(config::ConfigError::Message(format!(
                "FATAL: The 'DATABASE_PATH' in your .env file is a relative path ('{}'). It MUST be an absolute path.",
                database_path
            )));
        }

        if Path::new(&media_path).is_relative() {
            return Err(config::ConfigError::Message(format!(
                "FATAL: The 'MEDIA_PATH' in your .env file is a relative path ('{}'). It MUST be an absolute path.",
                media_path
            )));
        }

        let builder = config::Config::builder()
            .add_source(config::File::new(
                &defaults_file.to_string_lossy(),
                config::FileFormat::Toml,
            ))
            .set_override("database_path", database_path)?
            .set_override("media_path", media_path)?
            .set_override("session_secret_key", session_secret_key)?
            .set_override("allowed_origins", allowed_origins)?
            .set_override("log_level", log_level)?
            .set_override("use_secure_cookies", use_secure_cookies)?
            .set_override_option("seed_file", seed_file)?
            .set_override_option("admin_password", admin_password)?
            .build()?;

        builder.try_deserialize()
    }

    /// Returns the full path to the archive database file inside its own folder.
    pub fn archive_db_path(&self) -> PathBuf {
        PathBuf::from(&self.database_path)
            .join("archive")
            .join("archive.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_vars() -> HashMap<String, String> {
        let mut vars = HashMap::new();
        vars.insert("DATABASE_PATH".to_string(), "/var/lib/textile".to_string());
        vars.insert("MEDIA_PATH".to_string(), "/var/lib/textile/media".to_string());
        vars.insert("SESSION_SECRET_KEY".to_string(), "ab".repeat(64));
        vars
    }

    #[test]
    fn loads_defaults_and_overrides() {
        let config = Config::from_values(&valid_vars(), Path::new(DEFAULT_SETTINGS_FILE)).unwrap();
        assert_eq!(config.web.port, 8080);
        assert_eq!(config.log_level, "info");
        assert!(!config.use_secure_cookies);
        assert!(config.seed_file.is_none());
        assert!(config.admin_password.is_none());
        assert_eq!(
            config.archive_db_path(),
            PathBuf::from("/var/lib/textile/archive/archive.db")
        );
    }

    #[test]
    fn picks_up_optional_values() {
        let mut vars = valid_vars();
        vars.insert("USE_SECURE_COOKIES".to_string(), "true".to_string());
        vars.insert("SEED_FILE".to_string(), " data/seed.json ".to_string());
        vars.insert("LOG_LEVEL".to_string(), "debug".to_string());

        let config = Config::from_values(&vars, Path::new(DEFAULT_SETTINGS_FILE)).unwrap();
        assert!(config.use_secure_cookies);
        assert_eq!(config.seed_file.as_deref(), Some("data/seed.json"));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn admin_password_is_read_with_the_other_settings() {
        let mut vars = valid_vars();
        vars.insert("ADMIN_PASSWORD".to_string(), "tear-1908".to_string());
        let config = Config::from_values(&vars, Path::new(DEFAULT_SETTINGS_FILE)).unwrap();
        assert_eq!(config.admin_password.as_deref(), Some("tear-1908"));

        vars.insert("ADMIN_PASSWORD".to_string(), String::new());
        let config = Config::from_values(&vars, Path::new(DEFAULT_SETTINGS_FILE)).unwrap();
        assert!(config.admin_password.is_none());
    }

    #[test]
    fn rejects_short_session_key() {
        let mut vars = valid_vars();
        vars.insert("SESSION_SECRET_KEY".to_string(), "abcd".to_string());
        assert!(Config::from_values(&vars, Path::new(DEFAULT_SETTINGS_FILE)).is_err());
    }

    #[test]
    fn rejects_relative_database_path() {
        let mut vars = valid_vars();
        vars.insert("DATABASE_PATH".to_string(), "data".to_string());
        assert!(Config::from_values(&vars, Path::new(DEFAULT_SETTINGS_FILE)).is_err());
    }

    #[test]
    fn web_settings_come_from_the_defaults_file() {
        let dir = tempfile::tempdir().unwrap();
        let defaults = dir.path().join("default.toml");
        std::fs::write(&defaults, "[web]\nhost = \"0.0.0.0\"\nport = 9090\n").unwrap();

        let config = Config::from_values(&valid_vars(), &defaults).unwrap();
        assert_eq!(config.web.host, "0.0.0.0");
        assert_eq!(config.web.port, 9090);
    }

    #[test]
    fn missing_media_path_is_an_error() {
        let mut vars = valid_vars();
        vars.remove("MEDIA_PATH");
        let err = Config::from_values(&vars, Path::new(DEFAULT_SETTINGS_FILE)).unwrap_err();
        assert!(err.to_string().contains("MEDIA_PATH"));
    }
}
