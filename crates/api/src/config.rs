use std::time::Duration;

use kidstory_jobs::JobsConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development. In production,
/// override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `60`).
    pub request_timeout_secs: u64,
    /// Credential for the hosted chat / image API. Empty means every
    /// upstream call fails with an auth error.
    pub openai_api_key: String,
    /// Base URL of the hosted API.
    pub openai_base_url: String,
    /// Shared secret expected in `x-webhook-secret`. `None` disables the
    /// completion webhook (every call is rejected).
    pub webhook_secret: Option<String>,
    /// Requested output resolution for generated images.
    pub image_size: String,
    /// Largest image body the download proxy will buffer.
    pub download_max_bytes: usize,
    /// Cache, pacer, deadline and retention tunables.
    pub jobs: JobsConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                     |
    /// |-------------------------|-----------------------------|
    /// | `HOST`                  | `0.0.0.0`                   |
    /// | `PORT`                  | `3000`                      |
    /// | `CORS_ORIGINS`          | `http://localhost:3000`     |
    /// | `REQUEST_TIMEOUT_SECS`  | `60`                        |
    /// | `OPENAI_API_KEY`        | *(empty)*                   |
    /// | `OPENAI_BASE_URL`       | `https://api.openai.com/v1` |
    /// | `WEBHOOK_SECRET`        | *(unset)*                   |
    /// | `IMAGE_SIZE`            | `1024x1024`                 |
    /// | `IMAGE_CACHE_TTL_SECS`  | `3600`                      |
    /// | `IMAGE_MIN_INTERVAL_MS` | `1000`                      |
    /// | `IMAGE_TIMEOUT_SECS`    | `30`                        |
    /// | `PUSH_TIMEOUT_SECS`     | `30`                        |
    /// | `JOB_RETENTION_SECS`    | `600`                       |
    /// | `DOWNLOAD_MAX_BYTES`    | `20971520` (20 MiB)         |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs = env_u64("REQUEST_TIMEOUT_SECS", 60);

        let openai_api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        let openai_base_url = std::env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| kidstory_openai::api::DEFAULT_API_URL.into());

        let webhook_secret = std::env::var("WEBHOOK_SECRET")
            .ok()
            .filter(|s| !s.is_empty());

        let image_size = std::env::var("IMAGE_SIZE")
            .unwrap_or_else(|_| kidstory_openai::provider::DEFAULT_IMAGE_SIZE.into());

        let download_max_bytes = env_u64(
            "DOWNLOAD_MAX_BYTES",
            crate::handlers::download::DEFAULT_DOWNLOAD_MAX_BYTES as u64,
        ) as usize;

        let defaults = JobsConfig::default();
        let jobs = JobsConfig {
            cache_ttl: Duration::from_secs(env_u64(
                "IMAGE_CACHE_TTL_SECS",
                defaults.cache_ttl.as_secs(),
            )),
            min_call_interval: Duration::from_millis(env_u64(
                "IMAGE_MIN_INTERVAL_MS",
                defaults.min_call_interval.as_millis() as u64,
            )),
            call_timeout: Duration::from_secs(env_u64(
                "IMAGE_TIMEOUT_SECS",
                defaults.call_timeout.as_secs(),
            )),
            push_timeout: Duration::from_secs(env_u64(
                "PUSH_TIMEOUT_SECS",
                defaults.push_timeout.as_secs(),
            )),
            retention: Duration::from_secs(env_u64(
                "JOB_RETENTION_SECS",
                defaults.retention.as_secs(),
            )),
            sweep_interval: defaults.sweep_interval,
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            openai_api_key,
            openai_base_url,
            webhook_secret,
            image_size,
            download_max_bytes,
            jobs,
        }
    }
}

/// Read a `u64` env var, falling back to `default` when unset.
///
/// Panics on a present but unparsable value so misconfiguration fails fast.
fn env_u64(name: &str, default: u64) -> u64 {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|_| panic!("{name} must be a valid u64")),
        Err(_) => default,
    }
}
