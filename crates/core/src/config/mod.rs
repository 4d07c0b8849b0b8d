//! Configuration for a running solver process.
//!
//! This module provides:
//! - Runtime knobs (deadline slack, informational profit/slippage targets)
//! - Per-chain configuration (RPC endpoints, gas pricing)
//! - Deployment manifests (resolver address, filler account, whitelist)
//! - A loader that resolves a TOML manifest into typed, env-expanded values

mod chain;
mod deployment;
mod loader;
mod runtime;

pub use chain::{ChainConfig, ChainDetails, GasConfig, GasPricingModel, RpcConfig};
pub use deployment::{
    DeploymentConfig, DeploymentDetails, FillerRef, PaymentConfig, PaymentRecipientEntry,
    ResolverRef, WhitelistEntry,
};
pub use loader::{DeploymentLoader, ResolvedDeployment, ResolvedWhitelistEntry};
pub use runtime::{config, init_config, RuntimeConfig};
