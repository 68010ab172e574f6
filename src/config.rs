//! Configuration for kvlink
//!
//! Centralized client configuration with sensible defaults.

use std::time::Duration;

/// Default response timeout
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection configuration for a single target host
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Target
    // -------------------------------------------------------------------------
    /// Host name or IP address of the store
    pub host: String,

    /// TCP port of the store
    pub port: u16,

    // -------------------------------------------------------------------------
    // Timeouts
    // -------------------------------------------------------------------------
    /// How long a request waits for a complete reply
    pub response_timeout: Duration,

    /// Upper bound on the TCP handshake (None = OS default)
    pub connect_timeout: Option<Duration>,

    // -------------------------------------------------------------------------
    // Socket Behaviour
    // -------------------------------------------------------------------------
    /// Block in `connect` until the handshake completes
    pub blocking_connect: bool,

    /// Disable Nagle's algorithm
    pub nodelay: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            connect_timeout: None,
            blocking_connect: true,
            nodelay: true,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// `host:port` as used for address resolution
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the target host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the target port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the response timeout
    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.config.response_timeout = timeout;
        self
    }

    /// Set the response timeout (in milliseconds)
    pub fn response_timeout_ms(mut self, ms: u64) -> Self {
        self.config.response_timeout = Duration::from_millis(ms);
        self
    }

    /// Bound the TCP handshake
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    /// Choose between blocking and background connects
    pub fn blocking_connect(mut self, blocking: bool) -> Self {
        self.config.blocking_connect = blocking;
        self
    }

    pub fn nodelay(mut self, nodelay: bool) -> Self {
        self.config.nodelay = nodelay;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
