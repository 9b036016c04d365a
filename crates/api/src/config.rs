use std::path::PathBuf;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8080`).
    pub port: u16,
    /// Maximum pool size (default: `20`).
    pub db_max_connections: u32,
    /// Connection attempts at startup before giving up (default: `3`).
    pub db_connect_retries: u32,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Root directory for uploaded files (default: `./uploads`).
    pub upload_path: PathBuf,
    /// Maximum request body size for uploads (default: 100 MiB).
    pub max_upload_bytes: usize,
    /// Password given to the bootstrap `admin` account.
    pub default_admin_password: String,
    /// Password assigned by the admin reset-password action.
    pub reset_password: String,
    /// JWT token configuration.
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                 |
    /// |--------------------------|-------------------------|
    /// | `HOST`                   | `0.0.0.0`               |
    /// | `PORT`                   | `8080`                  |
    /// | `DB_MAX_CONNECTIONS`     | `20`                    |
    /// | `DB_CONNECT_RETRIES`     | `3`                     |
    /// | `CORS_ORIGINS`           | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                    |
    /// | `UPLOAD_PATH`            | `./uploads`             |
    /// | `MAX_UPLOAD_BYTES`       | `104857600`             |
    /// | `DEFAULT_ADMIN_PASSWORD` | `Admin@123`             |
    /// | `RESET_PASSWORD`         | `Reset@123`             |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .expect("PORT must be a valid u16");

        let db_max_connections: u32 = std::env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "20".into())
            .parse()
            .expect("DB_MAX_CONNECTIONS must be a valid u32");

        let db_connect_retries: u32 = std::env::var("DB_CONNECT_RETRIES")
            .unwrap_or_else(|_| "3".into())
            .parse()
            .expect("DB_CONNECT_RETRIES must be a valid u32");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let upload_path =
            PathBuf::from(std::env::var("UPLOAD_PATH").unwrap_or_else(|_| "./uploads".into()));

        let max_upload_bytes: usize = std::env::var("MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| "104857600".into())
            .parse()
            .expect("MAX_UPLOAD_BYTES must be a valid usize");

        let default_admin_password =
            std::env::var("DEFAULT_ADMIN_PASSWORD").unwrap_or_else(|_| "Admin@123".into());
        let reset_password = std::env::var("RESET_PASSWORD").unwrap_or_else(|_| "Reset@123".into());

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            db_max_connections,
            db_connect_retries,
            cors_origins,
            request_timeout_secs,
            upload_path,
            max_upload_bytes,
            default_admin_password,
            reset_password,
            jwt,
        }
    }
}
