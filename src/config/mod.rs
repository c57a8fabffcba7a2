use std::env;
use std::path::PathBuf;

/// Runtime configuration, loaded once at startup and shared read-only
/// through the application state.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HMAC secret for signing bearer tokens
    pub jwt_secret: String,

    /// SQLite connection string (default: "sqlite://file_relay.db")
    pub database_url: String,

    /// Root directory for stored file content (default: "./uploads")
    pub upload_dir: PathBuf,

    /// Public base URL embedded in one-time download links
    pub server_url: String,

    /// Listen port (default: 8080)
    pub port: u16,

    /// Maximum upload size in bytes (default: 100 MB)
    pub max_file_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "secret".to_string(),
            database_url: "sqlite://file_relay.db".to_string(),
            upload_dir: PathBuf::from("./uploads"),
            server_url: "http://localhost:8080".to_string(),
            port: 8080,
            max_file_size: 100_000_000,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            jwt_secret: env::var("JWT_SECRET").unwrap_or(default.jwt_secret),

            database_url: env::var("DATABASE_URL").unwrap_or(default.database_url),

            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.upload_dir),

            server_url: env::var("SERVER_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(default.server_url),

            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.port),

            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.max_file_size, 100_000_000);
        assert_eq!(config.port, 8080);
        assert_eq!(config.server_url, "http://localhost:8080");
    }

    #[test]
    fn test_from_env_overrides() {
        unsafe { env::set_var("SERVER_URL", "https://files.example.com/") };
        unsafe { env::set_var("MAX_FILE_SIZE", "1234") };
        let config = AppConfig::from_env();
        unsafe { env::remove_var("SERVER_URL") };
        unsafe { env::remove_var("MAX_FILE_SIZE") };

        // Trailing slash is stripped so link URLs never get a double slash
        assert_eq!(config.server_url, "https://files.example.com");
        assert_eq!(config.max_file_size, 1234);
    }
}
