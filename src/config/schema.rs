//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration of an engine and its transport bindings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Bind addresses, backlog and connection limit.
    pub listener: ListenerConfig,

    /// Request, handshake and idle timeouts.
    pub timeouts: TimeoutConfig,

    /// HTTP binding limits.
    pub http: HttpConfig,

    /// WebSocket engine limits.
    pub websocket: WebSocketConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// HTTP bind address (e.g., "0.0.0.0:8080").
    pub http_address: String,

    /// WebSocket bind address (e.g., "0.0.0.0:8081").
    pub websocket_address: String,

    /// Kernel accept backlog.
    pub backlog: u32,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            http_address: "0.0.0.0:8080".to_string(),
            websocket_address: "0.0.0.0:8081".to_string(),
            backlog: 1024,
            max_connections: 10_000,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time for one HTTP request in seconds.
    pub request_secs: u64,

    /// Time allowed for the WebSocket opening handshake in seconds.
    pub handshake_secs: u64,

    /// A WebSocket connection silent for this long is dropped.
    pub websocket_idle_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            handshake_secs: 10,
            websocket_idle_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Largest request body buffered before dispatch; larger bodies get 413.
    pub max_body_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebSocketConfig {
    pub max_handshake_bytes: usize,

    /// Largest accepted frame payload.
    pub max_frame_bytes: usize,

    /// Outbound frames buffered per connection before senders wait.
    pub outbound_queue: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            max_handshake_bytes: 8 * 1024,
            max_frame_bytes: 16 * 1024 * 1024,
            outbound_queue: 64,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Prometheus endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
