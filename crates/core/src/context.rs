//! `SolverContext`: the complete external-collaborator surface the core
//! requires. Everything the core needs from chain RPC transports, nonce and
//! gas management, price oracles, whitelist sources, and witness-kind
//! plugins is named here and nowhere else — `solver-core` depends on this
//! trait only, never on a concrete transport crate.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;

use crate::model::{AbiEncodedValue, Account};

/// Outcome of simulating a call without broadcasting it.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub success: bool,
    pub gas_used: u64,
    /// Raw revert data, present only when `success` is false.
    pub revert_data: Option<Bytes>,
}

/// The subset of a transaction receipt the core cares about.
#[derive(Debug, Clone)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub success: bool,
    pub block_number: u64,
    pub effective_gas_price: u128,
}

/// A kind-specific plugin that resolves a `Witness` variable at fill time.
#[async_trait]
pub trait WitnessResolver: Send + Sync {
    async fn resolve(
        &self,
        data: &Bytes,
        values: &[AbiEncodedValue],
    ) -> anyhow::Result<AbiEncodedValue>;
}

/// Token/gas price source. Split out from [`SolverContext`] so a concrete
/// `SolverContext` (e.g. `solver-chain::LiveSolverContext`) can be composed
/// from an injected oracle rather than implementing pricing itself — the
/// oracle, whitelist source, and witness registry are the out-of-scope
/// collaborators named in spec §1, wired together only at the binary.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// USD price per smallest unit of `account`'s token.
    async fn token_price_usd(&self, account: Account) -> anyhow::Result<U256>;
    /// USD price per gas unit on `chain_id`.
    async fn gas_price_usd(&self, chain_id: u64) -> anyhow::Result<U256>;
}

/// Source of truth for whether an [`Account`] is trusted for an assumption
/// kind.
#[async_trait]
pub trait WhitelistSource: Send + Sync {
    async fn is_whitelisted(&self, account: Account, kind: &str) -> anyhow::Result<bool>;
}

/// The full set of external collaborators `solver-core` consumes.
#[async_trait]
pub trait SolverContext: Send + Sync {
    /// Read-only `eth_call`, optionally pinned to a historical block.
    async fn call(
        &self,
        chain_id: u64,
        to: Address,
        data: Bytes,
        block_number: Option<u64>,
    ) -> anyhow::Result<Bytes>;

    /// Simulate a call from `account` without broadcasting, returning
    /// status and gas used (or revert data).
    async fn simulate(
        &self,
        chain_id: u64,
        account: Address,
        to: Address,
        data: Bytes,
        block_number: Option<u64>,
    ) -> anyhow::Result<SimulationResult>;

    /// Broadcast a transaction from the filler account, returning its hash.
    async fn send_transaction(
        &self,
        chain_id: u64,
        to: Address,
        data: Bytes,
    ) -> anyhow::Result<B256>;

    /// Block until the transaction is mined (no reorg tolerance).
    async fn wait_for_receipt(&self, chain_id: u64, tx_hash: B256) -> anyhow::Result<TxReceipt>;

    /// Wall-clock timestamp of a mined block.
    async fn block_timestamp(&self, chain_id: u64, block_number: u64) -> anyhow::Result<u64>;

    /// The chain on which plan-level payments are ultimately settled.
    fn payment_chain(&self) -> u64;

    /// The recipient of payments on `chain_id`.
    async fn payment_recipient(&self, chain_id: u64) -> anyhow::Result<Address>;

    /// The address the filler signs and sends transactions from.
    fn filler_address(&self) -> Address;

    /// Whether `account` is whitelisted for `kind`.
    async fn is_whitelisted(&self, account: Account, kind: &str) -> anyhow::Result<bool>;

    /// Look up the witness resolver registered for `kind`, if any.
    fn witness_resolver(&self, kind: &str) -> Option<Arc<dyn WitnessResolver>>;

    /// USD price per smallest unit of `account`'s token.
    async fn token_price_usd(&self, account: Account) -> anyhow::Result<U256>;

    /// USD price per gas unit on `chain_id`.
    async fn gas_price_usd(&self, chain_id: u64) -> anyhow::Result<U256>;
}
