//! Server configuration.

use seqthink_rpc::hub::DEFAULT_SUBSCRIBER_CAPACITY;
use seqthink_settings::ServerSettings;

/// Configuration for the HTTP transports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Queue capacity of each event-stream subscriber.
    pub subscriber_buffer: usize,
}

impl ServerConfig {
    /// `host:port` string for binding. IPv6 hosts are bracketed.
    pub fn bind_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            subscriber_buffer: DEFAULT_SUBSCRIBER_CAPACITY,
        }
    }
}

impl From<&ServerSettings> for ServerConfig {
    fn from(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            subscriber_buffer: settings.subscriber_buffer,
        }
    }
}
