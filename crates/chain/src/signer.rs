//! Transaction signing and sending for a single chain, with a locally
//! cached nonce and a pluggable [`GasStrategy`].
//!
//! Grounded on the teacher's `TransactionSender`/`NonceManager` pair: nonce
//! management and gas pricing are named out-of-scope external collaborators
//! in the core's contract (spec §1, §6), so this crate — not `solver-core` —
//! owns them, the same division the teacher draws between its chain layer
//! and its liquidation decision logic.

use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

use crate::gas::{GasParams, GasStrategy};

/// Cached nonce manager for fast transaction submission. Avoids an RPC call
/// per transaction by tracking the nonce locally.
pub struct NonceManager {
    current: AtomicU64,
    last_synced: AtomicU64,
}

impl NonceManager {
    pub fn new(initial_nonce: u64) -> Self {
        Self {
            current: AtomicU64::new(initial_nonce),
            last_synced: AtomicU64::new(initial_nonce),
        }
    }

    #[inline]
    pub fn next(&self) -> u64 {
        self.current.fetch_add(1, Ordering::SeqCst)
    }

    #[inline]
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    pub fn sync(&self, chain_nonce: u64) {
        let current = self.current.load(Ordering::SeqCst);
        if chain_nonce > current {
            self.current.store(chain_nonce, Ordering::SeqCst);
        }
        self.last_synced.store(chain_nonce, Ordering::SeqCst);
    }

    pub fn reset(&self, chain_nonce: u64) {
        self.current.store(chain_nonce, Ordering::SeqCst);
        self.last_synced.store(chain_nonce, Ordering::SeqCst);
    }
}

/// Signs and sends transactions on one chain.
pub struct TransactionSender {
    rpc_url: String,
    wallet: EthereumWallet,
    pub address: Address,
    chain_id: u64,
    nonce_manager: NonceManager,
    gas_strategy: Box<dyn GasStrategy>,
}

impl TransactionSender {
    /// Create a sender for `chain_id`, fetching the initial nonce from
    /// `rpc_url`.
    pub async fn new(
        signer: PrivateKeySigner,
        rpc_url: &str,
        chain_id: u64,
        gas_strategy: Box<dyn GasStrategy>,
    ) -> Result<Self> {
        let address = signer.address();
        let wallet = EthereumWallet::from(signer);

        let provider = ProviderBuilder::new().on_http(rpc_url.parse()?);
        let initial_nonce = provider
            .get_transaction_count(address)
            .await
            .context("fetching initial nonce")?;

        info!(
            address = %address,
            chain_id,
            initial_nonce,
            strategy = gas_strategy.strategy_name(),
            "transaction sender initialized"
        );

        Ok(Self {
            rpc_url: rpc_url.to_string(),
            wallet,
            address,
            chain_id,
            nonce_manager: NonceManager::new(initial_nonce),
            gas_strategy,
        })
    }

    /// Send a transaction and wait for confirmation.
    pub async fn send_transaction(&self, to: Address, calldata: Bytes) -> Result<B256> {
        let gas_params = self
            .gas_strategy
            .fetch_params(&self.rpc_url)
            .await
            .context("fetching gas params")?;

        let nonce = self.nonce_manager.next();

        let mut tx = TransactionRequest::default()
            .with_to(to)
            .with_input(calldata)
            .with_value(U256::ZERO)
            .with_nonce(nonce)
            .with_chain_id(self.chain_id);
        self.gas_strategy.apply_gas(&mut tx, &gas_params);

        debug!(
            to = %to,
            nonce,
            strategy = self.gas_strategy.strategy_name(),
            effective_gas_price = gas_params.effective_gas_price(),
            "sending transaction"
        );

        let provider = ProviderBuilder::new()
            .wallet(self.wallet.clone())
            .on_http(self.rpc_url.parse()?);

        let pending = provider
            .send_transaction(tx)
            .await
            .context("submitting transaction")?;
        let tx_hash = *pending.tx_hash();

        info!(tx_hash = %tx_hash, chain_id = self.chain_id, "transaction submitted");
        Ok(tx_hash)
    }

    /// Sync the cached nonce from the chain (call after a send failure).
    pub async fn sync_nonce(&self) {
        let provider = ProviderBuilder::new()
            .on_http(self.rpc_url.parse().expect("url validated at construction"));
        match provider.get_transaction_count(self.address).await {
            Ok(chain_nonce) => {
                self.nonce_manager.reset(chain_nonce);
                debug!(nonce = chain_nonce, "nonce synced from chain");
            }
            Err(e) => warn!(error = %e, "failed to sync nonce from chain"),
        }
    }

    pub fn current_nonce(&self) -> u64 {
        self.nonce_manager.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonce_manager() {
        let manager = NonceManager::new(10);

        assert_eq!(manager.current(), 10);
        assert_eq!(manager.next(), 10);
        assert_eq!(manager.current(), 11);
        assert_eq!(manager.next(), 11);
        assert_eq!(manager.current(), 12);

        manager.sync(15);
        assert_eq!(manager.current(), 15);

        // Sync should not decrease.
        manager.sync(10);
        assert_eq!(manager.current(), 15);

        manager.reset(5);
        assert_eq!(manager.current(), 5);
    }

    #[tokio::test]
    #[ignore] // Requires network
    async fn test_sender_creation() {
        let private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
        let signer: PrivateKeySigner = private_key.parse().unwrap();
        let sender = TransactionSender::new(
            signer,
            "https://rpc.sepolia.org",
            11155111,
            Box::new(crate::gas::LegacyGasStrategy::new(1_000_000_000, 10_000_000_000)),
        )
        .await;

        assert!(sender.is_ok());
    }
}
