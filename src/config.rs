use std::net::SocketAddr;
use std::time::Duration;

use tracing::warn;

/// Queue sizing and reclamation policy for the broker core.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Capacity of the room manager's request queue. Generously bounded so
    /// callers rarely wait to be routed.
    pub command_buffer: usize,

    /// Capacity of each room's inbound message queue. Submits beyond this
    /// are rejected, not buffered.
    pub message_buffer: usize,

    /// Capacity of each listener's delivery queue.
    pub listener_buffer: usize,

    pub reaper: ReaperConfig,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            command_buffer: 100,
            message_buffer: 10,
            listener_buffer: 8,
            reaper: ReaperConfig::default(),
        }
    }
}

/// Policy for reclaiming rooms nobody is listening to. A room that has sat
/// at zero listeners for longer than `idle_grace` is deleted on the next
/// sweep; submits to an empty room reset its idle clock.
#[derive(Debug, Clone)]
pub struct ReaperConfig {
    /// How often the registry sweeps for idle rooms.
    pub sweep_interval: Duration,

    /// How long a room must stay listener-free before deletion.
    pub idle_grace: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(30),
            idle_grace: Duration::from_secs(10 * 60),
        }
    }
}

/// Top-level server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,

    pub broker: BrokerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            broker: BrokerConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Reads configuration from `PARLOR_*` environment variables, keeping
    /// the default for anything unset or unparseable.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(addr) = env_parse::<SocketAddr>("PARLOR_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(n) = env_parse::<usize>("PARLOR_COMMAND_QUEUE") {
            config.broker.command_buffer = n;
        }
        if let Some(n) = env_parse::<usize>("PARLOR_ROOM_QUEUE") {
            config.broker.message_buffer = n;
        }
        if let Some(n) = env_parse::<usize>("PARLOR_LISTENER_QUEUE") {
            config.broker.listener_buffer = n;
        }
        if let Some(secs) = env_parse::<u64>("PARLOR_SWEEP_SECS") {
            config.broker.reaper.sweep_interval = Duration::from_secs(secs.max(1));
        }
        if let Some(secs) = env_parse::<u64>("PARLOR_IDLE_GRACE_SECS") {
            config.broker.reaper.idle_grace = Duration::from_secs(secs.max(1));
        }
        config
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key = key, value = %raw, "Ignoring unparseable environment variable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults_keep_reference_constants() {
        let config = BrokerConfig::default();
        assert_eq!(config.command_buffer, 100);
        assert_eq!(config.message_buffer, 10);
    }

    #[rstest]
    #[case("PARLOR_TEST_QUEUE_OK", "17", Some(17))]
    #[case("PARLOR_TEST_QUEUE_BAD", "not-a-number", None)]
    #[case("PARLOR_TEST_QUEUE_NEGATIVE", "-3", None)]
    fn test_env_parse_usize(
        #[case] key: &str,
        #[case] raw: &str,
        #[case] expected: Option<usize>,
    ) {
        std::env::set_var(key, raw);
        assert_eq!(env_parse::<usize>(key), expected);
    }

    #[test]
    fn test_env_parse_missing_variable() {
        assert_eq!(env_parse::<usize>("PARLOR_TEST_QUEUE_UNSET"), None);
    }

    #[test]
    fn test_from_env_overrides_bind_addr() {
        std::env::set_var("PARLOR_BIND_ADDR", "127.0.0.1:9000");
        let config = ServerConfig::from_env();
        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse().unwrap());
        std::env::remove_var("PARLOR_BIND_ADDR");
    }
}
