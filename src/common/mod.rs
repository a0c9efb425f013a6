//! Common Infrastructure Module
//!
//! This module contains:
//! - Configuration loading from environment variables
//! - Structured logging setup
//! - Common error types

pub mod config;
pub mod error;
pub mod logging;

// Re-exports for convenience
pub use config::{BridgeSettings, ConfigError, Network};
pub use error::{ErrorKind, Result, ZBridgeError};
pub use logging::{
    generate_correlation_id, init_from_config, init_logging, log_header_event, log_issue_event,
    log_redeem_event, log_security_event, log_vault_event, ErrorDetails, EventCategory, LogEvent,
    LogLevel, LoggingError,
};
