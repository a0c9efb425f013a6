//! Structured Logging for zBridge
//!
//! Provides:
//! - JSON output for log aggregation, pretty output for development
//! - Correlation ids tying the steps of one issue or redeem together
//! - Structured events for relay, issue, redeem, vault and security activity
//!
//! # Usage
//!
//! ```rust,ignore
//! use zbridge::common::logging::{init_logging, LogLevel};
//!
//! init_logging(LogLevel::Info, true)?;
//! tracing::info!(target: "zbridge::issue", nonce = 7, "Permit issued");
//! ```

use rand::Rng;
use serde::Serialize;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

// ============================================================================
// Log Levels
// ============================================================================

/// Application log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl From<&str> for LogLevel {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "warn" | "warning" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

// ============================================================================
// Structured Event Types
// ============================================================================

/// Event categories for structured logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Header submissions, tip changes, reorgs
    Relay,
    /// Lock permits, mints and their resolution
    Issue,
    /// Burns and their resolution
    Redeem,
    /// Registration, collateral, balance proofs, liquidation
    Vault,
    /// Authorization and proof failures
    Security,
    /// Startup, shutdown, watcher ticks
    System,
}

impl EventCategory {
    pub fn target(&self) -> &'static str {
        match self {
            EventCategory::Relay => "zbridge::relay",
            EventCategory::Issue => "zbridge::issue",
            EventCategory::Redeem => "zbridge::redeem",
            EventCategory::Vault => "zbridge::vault",
            EventCategory::Security => "zbridge::security",
            EventCategory::System => "zbridge::system",
        }
    }
}

/// Structured log event
#[derive(Debug, Serialize)]
pub struct LogEvent {
    /// Event timestamp (RFC 3339)
    pub timestamp: String,
    pub level: String,
    pub category: EventCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetails>,
}

/// Error details for failed operations
#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

impl LogEvent {
    pub fn new(level: LogLevel, category: EventCategory, message: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            level: format!("{:?}", level).to_uppercase(),
            category,
            message: message.into(),
            correlation_id: None,
            data: None,
            error: None,
        }
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_error(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.error = Some(ErrorDetails {
            code: code.into(),
            message: message.into(),
        });
        self
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                "{{\"error\": \"failed to serialize log\", \"message\": \"{}\"}}",
                self.message
            )
        })
    }

    /// Emit through `tracing` at the event's level and category target
    pub fn emit(&self, level: LogLevel) {
        let json = self.to_json();
        // tracing needs a static target, so dispatch per category
        macro_rules! at {
            ($target:literal) => {
                match level {
                    LogLevel::Trace => tracing::trace!(target: $target, "{}", json),
                    LogLevel::Debug => tracing::debug!(target: $target, "{}", json),
                    LogLevel::Info => tracing::info!(target: $target, "{}", json),
                    LogLevel::Warn => tracing::warn!(target: $target, "{}", json),
                    LogLevel::Error => tracing::error!(target: $target, "{}", json),
                }
            };
        }
        match self.category {
            EventCategory::Relay => at!("zbridge::relay"),
            EventCategory::Issue => at!("zbridge::issue"),
            EventCategory::Redeem => at!("zbridge::redeem"),
            EventCategory::Vault => at!("zbridge::vault"),
            EventCategory::Security => at!("zbridge::security"),
            EventCategory::System => at!("zbridge::system"),
        }
    }
}

// ============================================================================
// Event Helpers
// ============================================================================

/// Log an authorization or proof failure (or a notable success)
pub fn log_security_event(
    event_type: &str,
    success: bool,
    details: serde_json::Value,
    correlation_id: Option<&str>,
) {
    let level = if success { LogLevel::Info } else { LogLevel::Warn };
    let mut event = LogEvent::new(level, EventCategory::Security, event_type).with_data(
        serde_json::json!({
            "success": success,
            "details": details
        }),
    );
    if let Some(id) = correlation_id {
        event = event.with_correlation_id(id);
    }
    event.emit(level);
}

/// Log a header submission outcome
pub fn log_header_event(
    event_type: &str,
    block_hash: &str,
    height: u64,
    success: bool,
    error: Option<&str>,
) {
    let level = if success { LogLevel::Info } else { LogLevel::Warn };
    let mut event = LogEvent::new(level, EventCategory::Relay, event_type).with_data(
        serde_json::json!({
            "block_hash": block_hash,
            "height": height,
            "success": success
        }),
    );
    if let Some(err) = error {
        event = event.with_error("RELAY_ERROR", err);
    }
    event.emit(level);
}

/// Log an issue lifecycle step; the permit nonce is the correlation id
pub fn log_issue_event(
    event_type: &str,
    nonce: u64,
    vault: &str,
    success: bool,
    error: Option<&str>,
) {
    let level = if success { LogLevel::Info } else { LogLevel::Error };
    let mut event = LogEvent::new(level, EventCategory::Issue, event_type)
        .with_correlation_id(format!("issue-{}", nonce))
        .with_data(serde_json::json!({
            "nonce": nonce,
            "vault": vault,
            "success": success
        }));
    if let Some(err) = error {
        event = event.with_error("ISSUE_ERROR", err);
    }
    event.emit(level);
}

/// Log a redeem lifecycle step; the burn nonce is the correlation id
pub fn log_redeem_event(
    event_type: &str,
    nonce: u64,
    vault: &str,
    amount: u64,
    success: bool,
    error: Option<&str>,
) {
    let level = if success { LogLevel::Info } else { LogLevel::Error };
    let mut event = LogEvent::new(level, EventCategory::Redeem, event_type)
        .with_correlation_id(format!("redeem-{}", nonce))
        .with_data(serde_json::json!({
            "nonce": nonce,
            "vault": vault,
            "amount": amount,
            "success": success
        }));
    if let Some(err) = error {
        event = event.with_error("REDEEM_ERROR", err);
    }
    event.emit(level);
}

/// Log a vault collateral or solvency change
pub fn log_vault_event(event_type: &str, vault: &str, data: serde_json::Value) {
    LogEvent::new(LogLevel::Info, EventCategory::Vault, event_type)
        .with_correlation_id(vault)
        .with_data(data)
        .emit(LogLevel::Info);
}

// ============================================================================
// Initialization
// ============================================================================

/// Initialize the logging system.
///
/// `RUST_LOG` overrides `level` when set.
pub fn init_logging(level: LogLevel, json_format: bool) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("zbridge={}", level.as_filter())));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .map_err(|e| LoggingError::InitFailed(e.to_string()))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .map_err(|e| LoggingError::InitFailed(e.to_string()))?;
    }

    Ok(())
}

/// Initialize logging from loaded settings (JSON on mainnet)
pub fn init_from_config(settings: &super::config::BridgeSettings) -> Result<(), LoggingError> {
    let level = LogLevel::from(settings.log_level.as_str());
    let json_format = settings.network == super::config::Network::Mainnet;
    init_logging(level, json_format)
}

/// Logging errors
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to initialize logging: {0}")]
    InitFailed(String),
}

/// Unique id for correlating log lines of one operation
pub fn generate_correlation_id() -> String {
    let timestamp = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!(
        "{:x}-{:04x}",
        timestamp & 0xFFFF_FFFF,
        rand::thread_rng().gen::<u16>()
    )
}
