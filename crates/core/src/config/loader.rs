//! Resolves raw [`DeploymentConfig`] into a fully-typed [`ResolvedDeployment`]:
//! environment variables expanded, addresses parsed, ready to hand to
//! `solver-chain` for wiring a `SolverContext`.

use std::collections::HashMap;
use std::path::Path;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use tracing::info;

use super::chain::{expand_env, ChainConfig};
use super::deployment::DeploymentConfig;
use crate::model::Account;

/// A deployment with every address parsed and every `${VAR}` expanded.
#[derive(Debug, Clone)]
pub struct ResolvedDeployment {
    /// Deployment name, e.g. "mainnet".
    pub name: String,
    /// The resolver contract this deployment targets.
    pub resolver: Account,
    /// The filler's address.
    pub filler_address: Address,
    /// Name of the env var holding the filler's private key.
    pub filler_private_key_env: String,
    /// Per-chain configuration, RPC URLs expanded.
    pub chains: Vec<ChainConfig>,
    /// Resolved whitelist entries.
    pub whitelist: Vec<ResolvedWhitelistEntry>,
    /// The chain plan-level payments settle on (`ctx.paymentChain`).
    pub payment_chain: u64,
    /// Recipient address per chain (`ctx.paymentRecipient(chainId)`).
    pub payment_recipients: HashMap<u64, Address>,
}

/// A whitelisted account with its address parsed.
#[derive(Debug, Clone)]
pub struct ResolvedWhitelistEntry {
    /// The whitelisted account.
    pub account: Account,
    /// The assumption kind it is trusted for.
    pub kind: String,
}

impl ResolvedDeployment {
    /// Look up the RPC details for a chain id.
    pub fn chain(&self, chain_id: u64) -> Option<&ChainConfig> {
        self.chains.iter().find(|c| c.chain.chain_id == chain_id)
    }

    /// Whether `account` is whitelisted for `kind`.
    pub fn is_whitelisted(&self, account: &Account, kind: &str) -> bool {
        self.whitelist
            .iter()
            .any(|w| w.account == *account && w.kind == kind)
    }
}

fn parse_address(raw: &str) -> Result<Address> {
    let expanded = expand_env(raw);
    expanded
        .parse::<Address>()
        .with_context(|| format!("invalid address literal: {expanded}"))
}

/// Loads and resolves deployment manifests from disk.
pub struct DeploymentLoader;

impl DeploymentLoader {
    /// Load and resolve a deployment manifest from a TOML file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<ResolvedDeployment> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading deployment config {}", path.display()))?;
        let raw: DeploymentConfig = toml::from_str(&content)
            .with_context(|| format!("parsing deployment config {}", path.display()))?;
        Self::resolve(raw)
    }

    /// Load the deployment manifest named by `SOLVER_DEPLOYMENT_CONFIG`,
    /// defaulting to `deployment.toml` in the working directory.
    pub fn load_from_env() -> Result<ResolvedDeployment> {
        let path = std::env::var("SOLVER_DEPLOYMENT_CONFIG")
            .unwrap_or_else(|_| "deployment.toml".to_string());
        Self::load_from_file(path)
    }

    fn resolve(raw: DeploymentConfig) -> Result<ResolvedDeployment> {
        let resolver = Account {
            address: parse_address(&raw.resolver.address)?,
            chain_id: raw.resolver.chain_id,
        };

        let filler_address = parse_address(&raw.filler.address)?;

        let mut chains = raw.chains;
        for chain in &mut chains {
            chain.chain.rpc.http = expand_env(&chain.chain.rpc.http);
            chain.chain.rpc.ws = expand_env(&chain.chain.rpc.ws);
        }

        let mut whitelist = Vec::with_capacity(raw.whitelist.len());
        for entry in raw.whitelist {
            whitelist.push(ResolvedWhitelistEntry {
                account: Account {
                    address: parse_address(&entry.address)?,
                    chain_id: entry.chain_id,
                },
                kind: entry.kind,
            });
        }

        let mut payment_recipients = HashMap::with_capacity(raw.payment.recipients.len());
        for entry in raw.payment.recipients {
            payment_recipients.insert(entry.chain_id, parse_address(&entry.address)?);
        }

        info!(
            deployment = %raw.deployment.name,
            chains = chains.len(),
            whitelist = whitelist.len(),
            payment_chain = raw.payment.chain_id,
            "deployment configuration resolved"
        );

        Ok(ResolvedDeployment {
            name: raw.deployment.name,
            resolver,
            filler_address,
            filler_private_key_env: raw.filler.private_key_env,
            chains,
            whitelist,
            payment_chain: raw.payment.chain_id,
            payment_recipients,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [deployment]
        name = "testnet"

        [resolver]
        chain_id = 11155111
        address = "0x00000000000000000000000000000000000001"

        [filler]
        address = "0x00000000000000000000000000000000000002"
        private_key_env = "SOLVER_FILLER_KEY"

        [[chains]]
        [chains.chain]
        chain_id = 11155111
        name = "sepolia"
        [chains.chain.rpc]
        http = "https://example.invalid"
        [chains.chain.gas]
        pricing = "Eip1559"

        [[whitelist]]
        chain_id = 11155111
        address = "0x00000000000000000000000000000000000003"
        kind = "oracle"

        [payment]
        chain_id = 11155111

        [[payment.recipients]]
        chain_id = 11155111
        address = "0x00000000000000000000000000000000000004"
    "#;

    #[test]
    fn resolves_sample_deployment() {
        let raw: DeploymentConfig = toml::from_str(SAMPLE).unwrap();
        let resolved = DeploymentLoader::resolve(raw).unwrap();
        assert_eq!(resolved.name, "testnet");
        assert_eq!(resolved.resolver.chain_id, 11155111);
        assert!(resolved.chain(11155111).is_some());
        assert_eq!(resolved.whitelist.len(), 1);
        assert!(resolved.is_whitelisted(&resolved.whitelist[0].account.clone(), "oracle"));
        assert_eq!(resolved.payment_chain, 11155111);
        assert_eq!(resolved.payment_recipients.len(), 1);
    }
}
