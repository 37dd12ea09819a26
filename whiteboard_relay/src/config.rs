use clap::Parser;
use std::time::Duration;

use crate::{codec::DEFAULT_MAX_FRAME_BYTES, connection::ConnectionOptions};

/// Relay for a shared whiteboard session.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct RelayConfig {
    /// Interface to bind.
    #[arg(long, env = "WHITEBOARD_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// TCP port to listen on.
    #[arg(long, env = "WHITEBOARD_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Frames queued for one peer before it is considered too slow and dropped.
    #[arg(long, env = "WHITEBOARD_OUTBOUND_QUEUE", default_value_t = 256)]
    pub outbound_queue: usize,

    /// Milliseconds a single write to a peer may take.
    #[arg(long, env = "WHITEBOARD_SEND_TIMEOUT_MS", default_value_t = 5000)]
    pub send_timeout_ms: u64,

    /// Largest inbound frame accepted, in bytes.
    #[arg(long, env = "WHITEBOARD_MAX_FRAME_BYTES", default_value_t = DEFAULT_MAX_FRAME_BYTES)]
    pub max_frame_bytes: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            outbound_queue: 256,
            send_timeout_ms: 5000,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

impl RelayConfig {
    /// `host:port` as passed to the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connection_options(&self) -> ConnectionOptions {
        ConnectionOptions {
            queue_capacity: self.outbound_queue.max(1),
            send_timeout: Duration::from_millis(self.send_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_match_default_impl() {
        let parsed = RelayConfig::try_parse_from(["whiteboard-relay"]).unwrap();
        let default = RelayConfig::default();
        assert_eq!(parsed.host, default.host);
        assert_eq!(parsed.port, default.port);
        assert_eq!(parsed.outbound_queue, default.outbound_queue);
        assert_eq!(parsed.send_timeout_ms, default.send_timeout_ms);
        assert_eq!(parsed.max_frame_bytes, default.max_frame_bytes);
    }

    #[test]
    fn flags_override_defaults() {
        let parsed = RelayConfig::try_parse_from([
            "whiteboard-relay",
            "--host",
            "127.0.0.1",
            "--port",
            "6000",
            "--outbound-queue",
            "0",
            "--send-timeout-ms",
            "250",
        ])
        .unwrap();
        assert_eq!(parsed.bind_addr(), "127.0.0.1:6000");

        let options = parsed.connection_options();
        assert_eq!(options.queue_capacity, 1);
        assert_eq!(options.send_timeout, Duration::from_millis(250));
    }
}
