use std::time::Duration;

/// Well-known endpoint of the CC live-streaming link service.
///
/// Scheme-relative: the `ws:`/`wss:` prefix is chosen by
/// [`ClientConfig::use_secure_transport`].
pub const DEFAULT_ENDPOINT: &str = "//weblink.cc.163.com/";

/// Configuration for one [`CCLink`](crate::CCLink) instance.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Scheme-relative WebSocket endpoint.
    pub endpoint: String,
    /// Dial with `wss:` instead of `ws:`.
    pub use_secure_transport: bool,
    /// Start the reconnect timer after a transport error.
    pub auto_reconnect: bool,
    /// Dial attempts per reconnect cycle before giving up.
    pub max_reconnect_attempts: u32,
    /// Delay between reconnect attempts.
    pub reconnect_interval: Duration,
    /// Delay between keep-alive messages while connected.
    pub heartbeat_interval: Duration,
    /// Default window for correlated requests.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            use_secure_transport: true,
            auto_reconnect: true,
            max_reconnect_attempts: 3,
            reconnect_interval: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(30),
            request_timeout: Duration::from_secs(5),
        }
    }
}

impl ClientConfig {
    /// The dial URL: scheme prefix plus the scheme-relative endpoint.
    pub fn url(&self) -> String {
        let scheme = if self.use_secure_transport {
            "wss:"
        } else {
            "ws:"
        };
        format!("{scheme}{}", self.endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_url_is_secure() {
        assert_eq!(ClientConfig::default().url(), "wss://weblink.cc.163.com/");
    }

    #[test]
    fn insecure_url_uses_ws_scheme() {
        let cfg = ClientConfig {
            use_secure_transport: false,
            ..ClientConfig::default()
        };
        assert_eq!(cfg.url(), "ws://weblink.cc.163.com/");
    }
}
