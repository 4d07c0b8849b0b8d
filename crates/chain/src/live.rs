//! [`LiveSolverContext`]: the production [`solver_core::SolverContext`],
//! wiring real alloy providers/wallets per chain to the core's narrow
//! external-collaborator interface.
//!
//! Pricing, whitelisting, and witness resolution are injected as trait
//! objects rather than implemented here — those are the out-of-scope
//! external collaborators named in spec §1/§6; `solver-api` supplies
//! concrete implementations, `main.rs` wires them together.

use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::info;

use solver_core::config::{GasPricingModel, ResolvedDeployment};
use solver_core::{Account, PriceOracle, SimulationResult, SolverContext, TxReceipt, WhitelistSource, WitnessResolver};

use crate::gas::create_gas_strategy;
use crate::provider::ChainProvider;
use crate::signer::TransactionSender;

/// Ties one chain's read provider and write sender together.
struct ChainHandle {
    provider: ChainProvider,
    sender: TransactionSender,
}

pub struct LiveSolverContext {
    chains: DashMap<u64, ChainHandle>,
    deployment: ResolvedDeployment,
    price_oracle: Arc<dyn PriceOracle>,
    whitelist: Arc<dyn WhitelistSource>,
    witness_resolvers: HashMap<String, Arc<dyn WitnessResolver>>,
}

impl LiveSolverContext {
    /// Connect to every chain named in `deployment`, reading the filler's
    /// private key from the environment variable `deployment` points at.
    pub async fn connect(
        deployment: ResolvedDeployment,
        price_oracle: Arc<dyn PriceOracle>,
        whitelist: Arc<dyn WhitelistSource>,
        witness_resolvers: HashMap<String, Arc<dyn WitnessResolver>>,
    ) -> Result<Self> {
        let private_key = std::env::var(&deployment.filler_private_key_env).with_context(|| {
            format!(
                "reading filler private key from ${}",
                deployment.filler_private_key_env
            )
        })?;
        let signer: PrivateKeySigner = private_key
            .trim_start_matches("0x")
            .parse()
            .context("parsing filler private key")?;
        if signer.address() != deployment.filler_address {
            anyhow::bail!(
                "configured filler address {} does not match key-derived address {}",
                deployment.filler_address,
                signer.address()
            );
        }

        let chains = DashMap::new();
        for chain in &deployment.chains {
            let provider = ChainProvider::connect(chain.chain.chain_id, chain.chain.rpc.http.clone())
                .await
                .with_context(|| format!("connecting provider for chain {}", chain.chain.chain_id))?;

            let gas = &chain.chain.gas;
            let pricing_model = match gas.pricing {
                GasPricingModel::Legacy => "legacy",
                GasPricingModel::Eip1559 => "eip1559",
            };
            let gas_strategy = create_gas_strategy(
                pricing_model,
                gas.default_gas_price_gwei,
                gas.max_gas_price_gwei,
                gas.priority_fee_gwei,
            );

            let sender = TransactionSender::new(
                signer.clone(),
                &chain.chain.rpc.http,
                chain.chain.chain_id,
                gas_strategy,
            )
            .await
            .with_context(|| format!("initializing sender for chain {}", chain.chain.chain_id))?;

            info!(chain_id = chain.chain.chain_id, name = %chain.chain.name, "chain wired");
            chains.insert(chain.chain.chain_id, ChainHandle { provider, sender });
        }

        Ok(Self {
            chains,
            deployment,
            price_oracle,
            whitelist,
            witness_resolvers,
        })
    }

    fn chain(&self, chain_id: u64) -> Result<dashmap::mapref::one::Ref<'_, u64, ChainHandle>> {
        self.chains
            .get(&chain_id)
            .ok_or_else(|| anyhow::anyhow!("no provider configured for chain {chain_id}"))
    }
}

#[async_trait]
impl SolverContext for LiveSolverContext {
    async fn call(
        &self,
        chain_id: u64,
        to: Address,
        data: Bytes,
        block_number: Option<u64>,
    ) -> Result<Bytes> {
        self.chain(chain_id)?.provider.call(to, data, block_number).await
    }

    async fn simulate(
        &self,
        chain_id: u64,
        account: Address,
        to: Address,
        data: Bytes,
        block_number: Option<u64>,
    ) -> Result<SimulationResult> {
        self.chain(chain_id)?
            .provider
            .simulate(account, to, data, block_number)
            .await
    }

    async fn send_transaction(&self, chain_id: u64, to: Address, data: Bytes) -> Result<B256> {
        self.chain(chain_id)?.sender.send_transaction(to, data).await
    }

    async fn wait_for_receipt(&self, chain_id: u64, tx_hash: B256) -> Result<TxReceipt> {
        self.chain(chain_id)?.provider.wait_for_receipt(tx_hash).await
    }

    async fn block_timestamp(&self, chain_id: u64, block_number: u64) -> Result<u64> {
        self.chain(chain_id)?.provider.block_timestamp(block_number).await
    }

    fn payment_chain(&self) -> u64 {
        self.deployment.payment_chain
    }

    async fn payment_recipient(&self, chain_id: u64) -> Result<Address> {
        self.deployment
            .payment_recipients
            .get(&chain_id)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("no payment recipient configured for chain {chain_id}"))
    }

    fn filler_address(&self) -> Address {
        self.deployment.filler_address
    }

    async fn is_whitelisted(&self, account: Account, kind: &str) -> Result<bool> {
        self.whitelist.is_whitelisted(account, kind).await
    }

    fn witness_resolver(&self, kind: &str) -> Option<Arc<dyn WitnessResolver>> {
        self.witness_resolvers.get(kind).cloned()
    }

    async fn token_price_usd(&self, account: Account) -> Result<U256> {
        self.price_oracle.token_price_usd(account).await
    }

    async fn gas_price_usd(&self, chain_id: u64) -> Result<U256> {
        self.price_oracle.gas_price_usd(chain_id).await
    }
}
