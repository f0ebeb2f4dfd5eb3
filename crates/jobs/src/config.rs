use std::time::Duration;

/// How long a cached image URL stays valid: 1 hour.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Minimum spacing between the starts of two outbound generation calls.
pub const DEFAULT_MIN_CALL_INTERVAL: Duration = Duration::from_secs(1);

/// Deadline for a single outbound generation call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// How long a push channel waits for a result before closing empty.
pub const DEFAULT_PUSH_TIMEOUT: Duration = Duration::from_secs(30);

/// How long a finished job stays pollable: 10 minutes.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(600);

/// How often the reaper sweeps expired jobs.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Tunables for the job machinery.
#[derive(Debug, Clone)]
pub struct JobsConfig {
    pub cache_ttl: Duration,
    pub min_call_interval: Duration,
    pub call_timeout: Duration,
    pub push_timeout: Duration,
    pub retention: Duration,
    pub sweep_interval: Duration,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            min_call_interval: DEFAULT_MIN_CALL_INTERVAL,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            push_timeout: DEFAULT_PUSH_TIMEOUT,
            retention: DEFAULT_RETENTION,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}
