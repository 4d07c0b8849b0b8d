//! Per-chain read provider: wraps a single alloy HTTP provider and exposes
//! exactly the read operations [`solver_core::SolverContext`] needs
//! (`eth_call`, gas-estimation-based simulation, receipts, block lookup).
//!
//! One [`ChainProvider`] is created per chain id the deployment configures;
//! [`crate::live::LiveSolverContext`] keys a map of them by chain id.

use alloy::eips::{BlockId, BlockNumberOrTag};
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, B256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use anyhow::{Context, Result};
use tracing::{debug, warn};

use solver_core::{SimulationResult, TxReceipt};

/// Read-capable provider for one chain.
#[derive(Clone)]
pub struct ChainProvider {
    chain_id: u64,
    http_url: String,
}

impl ChainProvider {
    /// Connect to `http_url` and verify it actually reports `chain_id`.
    pub async fn connect(chain_id: u64, http_url: impl Into<String>) -> Result<Self> {
        let http_url = http_url.into();
        let provider = ProviderBuilder::new().on_http(http_url.parse()?);
        let reported = provider
            .get_chain_id()
            .await
            .with_context(|| format!("fetching chain id from {http_url}"))?;
        if reported != chain_id {
            anyhow::bail!(
                "configured chain id {chain_id} does not match RPC-reported {reported} at {http_url}"
            );
        }
        debug!(chain_id, url = %http_url, "chain provider connected");
        Ok(Self { chain_id, http_url })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn provider(&self) -> impl Provider {
        ProviderBuilder::new()
            .on_http(self.http_url.parse().expect("url validated at connect time"))
    }

    fn block_id(block_number: Option<u64>) -> BlockId {
        block_number
            .map(BlockId::number)
            .unwrap_or(BlockId::Number(BlockNumberOrTag::Latest))
    }

    /// Read-only `eth_call`, optionally pinned to a historical block.
    pub async fn call(&self, to: Address, data: Bytes, block_number: Option<u64>) -> Result<Bytes> {
        let tx = TransactionRequest::default().with_to(to).with_input(data);
        let result = self
            .provider()
            .call(&tx)
            .block(Self::block_id(block_number))
            .await
            .context("eth_call")?;
        Ok(result)
    }

    /// Simulate a call without broadcasting. The core only needs
    /// success/failure and gas used (or revert data), so this estimates gas:
    /// a failing `eth_estimateGas` surfaces the same revert an execution
    /// would have hit, and a succeeding one gives an accurate gas figure.
    pub async fn simulate(
        &self,
        account: Address,
        to: Address,
        data: Bytes,
        block_number: Option<u64>,
    ) -> Result<SimulationResult> {
        let tx = TransactionRequest::default()
            .with_from(account)
            .with_to(to)
            .with_input(data);
        match self
            .provider()
            .estimate_gas(&tx)
            .block(Self::block_id(block_number))
            .await
        {
            Ok(gas_used) => Ok(SimulationResult {
                success: true,
                gas_used,
                revert_data: None,
            }),
            Err(err) => {
                let revert_data = extract_revert_data(&err);
                warn!(to = %to, error = %err, "simulation reverted");
                Ok(SimulationResult {
                    success: false,
                    gas_used: 0,
                    revert_data,
                })
            }
        }
    }

    /// Block until the transaction is mined (no reorg tolerance).
    pub async fn wait_for_receipt(&self, tx_hash: B256) -> Result<TxReceipt> {
        let provider = self.provider();
        let pending = provider
            .watch_pending_transaction(alloy::providers::PendingTransactionConfig::new(tx_hash))
            .await
            .context("watching pending transaction")?;
        pending.await.context("awaiting transaction confirmation")?;
        let receipt = provider
            .get_transaction_receipt(tx_hash)
            .await
            .context("fetching transaction receipt")?
            .ok_or_else(|| anyhow::anyhow!("receipt missing for confirmed tx {tx_hash}"))?;

        Ok(TxReceipt {
            tx_hash,
            success: receipt.status(),
            block_number: receipt.block_number.unwrap_or_default(),
            effective_gas_price: receipt.effective_gas_price,
        })
    }

    /// Wall-clock timestamp of a mined block.
    pub async fn block_timestamp(&self, block_number: u64) -> Result<u64> {
        let block = self
            .provider()
            .get_block_by_number(BlockNumberOrTag::Number(block_number))
            .await
            .context("fetching block")?
            .ok_or_else(|| anyhow::anyhow!("block {block_number} not found"))?;
        Ok(block.header.timestamp)
    }

    pub async fn gas_price(&self) -> Result<u128> {
        self.provider().get_gas_price().await.context("fetching gas price")
    }
}

/// Best-effort recovery of revert data from an RPC error response. Alloy
/// surfaces the node's `data` field (hex-encoded revert bytes) on the JSON-RPC
/// error payload when a call reverts; absent that, there is nothing to match
/// a revert policy against and the filler treats it as an internal error.
fn extract_revert_data(err: &alloy::transports::TransportError) -> Option<Bytes> {
    let resp = err.as_error_resp()?;
    let raw = resp.data.as_ref()?;
    let s = raw.get().trim_matches('"');
    let hex_str = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(hex_str).ok().map(Bytes::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_id_defaults_to_latest() {
        assert!(matches!(
            ChainProvider::block_id(None),
            BlockId::Number(BlockNumberOrTag::Latest)
        ));
    }

    #[test]
    fn block_id_pins_a_number() {
        assert_eq!(ChainProvider::block_id(Some(42)), BlockId::number(42));
    }

    #[tokio::test]
    #[ignore] // Requires network
    async fn connect_rejects_chain_id_mismatch() {
        let result = ChainProvider::connect(999_999_999, "https://cloudflare-eth.com").await;
        assert!(result.is_err());
    }
}
