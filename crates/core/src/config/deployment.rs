//! Raw (pre-resolution) deployment configuration as parsed from TOML.
//!
//! This is the on-disk shape; [`super::loader::DeploymentLoader`] turns it
//! into a [`super::loader::ResolvedDeployment`] with parsed addresses and
//! expanded environment variables.

use serde::{Deserialize, Serialize};

use super::chain::ChainConfig;

/// Top-level deployment manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Deployment metadata.
    pub deployment: DeploymentDetails,
    /// The on-chain resolver contract this deployment talks to.
    pub resolver: ResolverRef,
    /// The account that signs and sends fill transactions.
    pub filler: FillerRef,
    /// Chains the solver may act on, keyed by their own chain id.
    pub chains: Vec<ChainConfig>,
    /// Accounts whitelisted for specific assumption kinds.
    #[serde(default)]
    pub whitelist: Vec<WhitelistEntry>,
    /// Where plan-level payments settle, and who receives them per chain.
    pub payment: PaymentConfig,
}

/// `ctx.paymentChain` / `ctx.paymentRecipient(chainId)` (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// The chain on which plan-level payments are ultimately settled.
    pub chain_id: u64,
    /// The recipient address on each chain a payment may arrive on.
    pub recipients: Vec<PaymentRecipientEntry>,
}

/// One `(chainId -> recipient address)` mapping entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecipientEntry {
    pub chain_id: u64,
    pub address: String,
}

/// Deployment metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentDetails {
    /// Human-readable deployment name, e.g. "mainnet" or "staging".
    pub name: String,
}

/// Reference to the resolver contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverRef {
    /// Chain the resolver contract is deployed on.
    pub chain_id: u64,
    /// Resolver contract address, hex string, `${VAR}` expansion supported.
    pub address: String,
}

/// Reference to the filler account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillerRef {
    /// Filler's address, hex string.
    pub address: String,
    /// Name of the environment variable holding the filler's private key.
    /// Never stored in the TOML file itself.
    pub private_key_env: String,
}

/// A whitelisted account, scoped to one assumption kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhitelistEntry {
    /// Chain the account lives on.
    pub chain_id: u64,
    /// Account address, hex string.
    pub address: String,
    /// Assumption kind this account is trusted for.
    pub kind: String,
}
