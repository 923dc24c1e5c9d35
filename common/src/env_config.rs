use std::{env, sync::Arc, time::Duration};

use crate::error::{AppError, Res};

#[derive(Clone, Debug)]
/// Configuration struct for the subscription service.
///
/// This struct holds all the necessary configuration parameters
/// required to initialize and run the server: bind address, number of
/// worker threads, CORS origin, logging preferences and the global
/// request budget.
pub struct Config {
    // environment
    pub environment: String, // development or production
    /// The hostname or IP address the server will bind to.
    pub server_host: String,
    /// The port number the server will listen on.
    pub server_port: u16,
    /// The number of worker threads to spawn for handling requests.
    pub num_workers: usize,
    /// The allowed origin for CORS (Cross-Origin Resource Sharing).
    pub cors_allowed_origin: String,
    /// A boolean indicating whether console logging is enabled.
    pub console_logging_enabled: bool,
    /// Minimum level passed to the logger (`error`, `warn`, `info`, `debug`, `trace`).
    pub log_level: String,
    /// Optional file that receives a copy of every log line.
    pub log_file: Option<String>,
    /// Requests per second accepted across all callers.
    pub rate_limit_per_second: u32,
}

impl Config {
    /// Creates a new `Config` instance from environment variables.
    ///
    /// # Environment Variables
    ///
    /// Optional (with defaults):
    /// - `ENVIRONMENT`: `development` or `production` (default: "development")
    /// - `IP`: Server host (default: "127.0.0.1")
    /// - `PORT`: Server port (default: 8001)
    /// - `WORKERS`: Number of worker threads (default: 4)
    /// - `CORS_ALLOWED_ORIGIN`: Allowed CORS origin (default: "http://localhost:3000")
    /// - `ENABLE_CONSOLE_LOGGING`: Whether to enable console logging (default: true)
    /// - `LOG_LEVEL`: Logger level (default: "info")
    /// - `LOG_FILE`: Log file path (default: none)
    /// - `RATE_LIMIT_PER_SECOND`: Global request budget (default: 50)
    ///
    /// Values that fail to parse fall back to their defaults.
    pub fn from_env() -> Arc<Self> {
        dotenvy::dotenv().ok();

        Arc::new(Config {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            server_host: env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "8001".to_string())
                .parse()
                .unwrap_or(8001),
            num_workers: env::var("WORKERS")
                .unwrap_or_else(|_| "4".to_string())
                .parse()
                .unwrap_or(4),
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            console_logging_enabled: env::var("ENABLE_CONSOLE_LOGGING")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                == "true",
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_file: env::var("LOG_FILE").ok().filter(|path| !path.is_empty()),
            rate_limit_per_second: env::var("RATE_LIMIT_PER_SECOND")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(50),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

#[derive(Clone, Debug)]
/// Settings used by the subscription client to reach the API.
pub struct ClientConfig {
    /// Base URL of the backend, without the `/api` prefix.
    pub backend_url: url::Url,
    /// Upper bound for a single request round-trip.
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub const DEFAULT_BACKEND_URL: &'static str = "http://localhost:8001";

    pub fn new(backend_url: &str) -> Res<Self> {
        let backend_url = url::Url::parse(backend_url)
            .map_err(|e| AppError::BadRequest(format!("Invalid backend URL '{}': {}", backend_url, e)))?;
        if backend_url.cannot_be_a_base() {
            return Err(AppError::BadRequest(format!(
                "Backend URL '{}' cannot be used as a base",
                backend_url
            )));
        }

        Ok(ClientConfig {
            backend_url,
            request_timeout: Duration::from_secs(10),
        })
    }

    /// Reads `BACKEND_URL` and `REQUEST_TIMEOUT_SECS` (default 10).
    pub fn from_env() -> Res<Self> {
        dotenvy::dotenv().ok();

        let backend_url =
            env::var("BACKEND_URL").unwrap_or_else(|_| Self::DEFAULT_BACKEND_URL.to_string());
        let mut config = Self::new(&backend_url)?;
        if let Some(secs) = env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.request_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    /// Joins `path` under `<backend>/api/`.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/api/{}",
            self.backend_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
