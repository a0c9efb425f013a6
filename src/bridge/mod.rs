//! Bridge Module
//!
//! Issue and redeem state machines composing the relay, the vault registry,
//! the proof verifier and the wrapped token.
//!
//! ## Issue
//! ```text
//! request_lock -> mint -> confirm_issue | challenge_issue
//!        \          \
//!         `----------`-> expire_issue
//! ```
//!
//! ## Redeem
//! ```text
//! burn -> confirm_redeem | challenge_redeem | claim_collateral
//! ```

pub mod issue;
pub mod orchestrator;
pub mod redeem;
pub mod token;
pub mod types;

#[cfg(test)]
mod fixtures;

pub use orchestrator::{Bridge, BridgeRecords};
pub use token::{InMemoryToken, TokenError, WrappedToken};
pub use types::{BridgeConfig, BridgeError, BridgeStats, NonceCounters};
