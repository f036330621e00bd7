use std::time::Duration;

/// Server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Connections with no traffic for this long are closed.
    pub idle_timeout: Duration,

    /// Largest frame payload accepted or produced, in bytes.
    pub max_message_size: usize,

    /// Most strings a single request may carry.
    pub max_args: usize,

    /// Most TTL expirations handled per loop iteration.
    pub expire_batch: usize,

    /// Poll timeout when there are no connections and no TTLs.
    pub default_poll_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 1234,
            idle_timeout: Duration::from_secs(5),
            max_message_size: 32 << 20,
            max_args: 200_000,
            expire_batch: 2000,
            default_poll_timeout: Duration::from_secs(10),
        }
    }
}

impl ServerConfig {
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Port 0 binds an ephemeral port.
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    pub fn max_message_size(mut self, size: usize) -> Self {
        self.config.max_message_size = size;
        self
    }

    pub fn max_args(mut self, count: usize) -> Self {
        self.config.max_args = count;
        self
    }

    pub fn expire_batch(mut self, count: usize) -> Self {
        self.config.expire_batch = count;
        self
    }

    pub fn default_poll_timeout(mut self, timeout: Duration) -> Self {
        self.config.default_poll_timeout = timeout;
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}
