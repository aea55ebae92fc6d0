/// Lobby API configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Capacity of the lobby broadcast channel. Slow sessions that fall
    /// further behind skip messages.
    pub broadcast_capacity: usize,
    /// Heartbeat interval sent to clients in the READY payload (ms).
    pub heartbeat_interval_ms: u64,
}

impl Config {
    /// Load configuration from environment variables, falling back to the
    /// defaults for anything missing or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: parsed_var::<u16>("PORT").unwrap_or(defaults.port),
            broadcast_capacity: parsed_var::<usize>("BROADCAST_CAPACITY")
                .filter(|&c| c > 0)
                .unwrap_or(defaults.broadcast_capacity),
            heartbeat_interval_ms: parsed_var::<u64>("HEARTBEAT_INTERVAL_MS")
                .filter(|&ms| ms > 0)
                .unwrap_or(defaults.heartbeat_interval_ms),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 4010,
            broadcast_capacity: 4096,
            heartbeat_interval_ms: 41250,
        }
    }
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
