//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and value ranges (limits and timeouts > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function of the config

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::EngineConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: {value:?} is not a socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("http and websocket listeners share {0}")]
    SharedAddress(String),
}

pub fn validate_config(config: &EngineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let addresses = [
        ("listener.http_address", &config.listener.http_address),
        ("listener.websocket_address", &config.listener.websocket_address),
        ("observability.metrics_address", &config.observability.metrics_address),
    ];
    for (field, value) in addresses {
        if value.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidAddress {
                field,
                value: value.clone(),
            });
        }
    }
    if config.listener.http_address == config.listener.websocket_address {
        errors.push(ValidationError::SharedAddress(
            config.listener.http_address.clone(),
        ));
    }

    let positive = [
        ("listener.backlog", u64::from(config.listener.backlog)),
        ("listener.max_connections", config.listener.max_connections as u64),
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("timeouts.handshake_secs", config.timeouts.handshake_secs),
        ("timeouts.websocket_idle_secs", config.timeouts.websocket_idle_secs),
        ("http.max_body_bytes", config.http.max_body_bytes as u64),
        ("websocket.max_handshake_bytes", config.websocket.max_handshake_bytes as u64),
        ("websocket.max_frame_bytes", config.websocket.max_frame_bytes as u64),
        ("websocket.outbound_queue", config.websocket.outbound_queue as u64),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(validate_config(&EngineConfig::default()), Ok(()));
    }

    #[test]
    fn reports_every_problem() {
        let mut config = EngineConfig::default();
        config.listener.http_address = "nowhere".into();
        config.timeouts.handshake_secs = 0;
        config.websocket.max_frame_bytes = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::Zero {
            field: "timeouts.handshake_secs"
        }));
        assert_eq!(
            errors[0].to_string(),
            "listener.http_address: \"nowhere\" is not a socket address"
        );
    }
}
