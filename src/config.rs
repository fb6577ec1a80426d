//! Configuration types.

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Service name for identification.
    pub name: String,
    /// Port the HTTP/WS server binds to.
    pub port: u16,
    /// Path of the profile database file.
    pub db_path: String,
    /// Directory for rolling log files (None = log to stderr).
    pub log_dir: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "mentorhub".to_string(),
            port: 8080,
            db_path: "./data/mentorhub.db".to_string(),
            log_dir: None,
        }
    }
}

impl AppConfig {
    /// Build the configuration from `MENTORHUB_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            name: defaults.name,
            port: std::env::var("MENTORHUB_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            db_path: std::env::var("MENTORHUB_DB_PATH").unwrap_or(defaults.db_path),
            log_dir: std::env::var("MENTORHUB_LOG_DIR").ok(),
        }
    }
}
