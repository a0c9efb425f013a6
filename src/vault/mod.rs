//! Vault Module
//!
//! Collateral accounting and solvency checks for the vaults that custody
//! backing-chain value.

pub mod registry;

pub use registry::{VaultConfig, VaultError, VaultRegistry};
