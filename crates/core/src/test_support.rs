//! In-memory [`SolverContext`] double used by this crate's own unit tests.
//! Grounded on the teacher's test-only provider/sender fixtures and the
//! reference `create_test_config()` pattern from the pack's OIF-solver
//! examples: a single struct with builder-style `with_*` setters and
//! atomic call counters so tests can assert on call counts as well as
//! return values.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;

use crate::context::{SimulationResult, SolverContext, TxReceipt, WitnessResolver};
use crate::model::{AbiEncodedValue, Account};

/// A stub [`SolverContext`] for unit tests. Every call is logged in an
/// atomic counter; behavior defaults to "always succeeds, zero price,
/// zero gas" and is overridden via the `with_*` builders.
pub struct StubContext {
    payment_chain: u64,
    payment_recipient: Address,
    filler_address: Address,
    token_price_usd: U256,
    gas_price_usd: U256,
    simulate_success: bool,
    revert_data: Option<Bytes>,
    receipt_block_number: u64,
    receipt_effective_gas_price: u128,
    block_timestamp: u64,
    whitelisted: Mutex<Vec<(Account, String)>>,
    witness_resolvers: Mutex<Vec<(String, Arc<dyn WitnessResolver>)>>,

    call_count: AtomicU64,
    simulate_count: AtomicU64,
    send_count: AtomicU64,
    payment_chain_reads: AtomicU64,
}

impl StubContext {
    pub fn new() -> Self {
        Self {
            payment_chain: 1,
            payment_recipient: Address::ZERO,
            filler_address: Address::repeat_byte(0xF1),
            token_price_usd: U256::ZERO,
            gas_price_usd: U256::ZERO,
            simulate_success: true,
            revert_data: None,
            receipt_block_number: 1,
            receipt_effective_gas_price: 1,
            block_timestamp: 0,
            whitelisted: Mutex::new(Vec::new()),
            witness_resolvers: Mutex::new(Vec::new()),
            call_count: AtomicU64::new(0),
            simulate_count: AtomicU64::new(0),
            send_count: AtomicU64::new(0),
            payment_chain_reads: AtomicU64::new(0),
        }
    }

    pub fn with_payment_chain(mut self, chain_id: u64) -> Self {
        self.payment_chain = chain_id;
        self
    }

    pub fn with_token_price_usd(mut self, price: u64) -> Self {
        self.token_price_usd = U256::from(price);
        self
    }

    pub fn with_gas_price_usd(mut self, price: u64) -> Self {
        self.gas_price_usd = U256::from(price);
        self
    }

    /// Make every `simulate` call revert with the given raw data.
    pub fn with_revert_data(mut self, data: Vec<u8>) -> Self {
        self.simulate_success = false;
        self.revert_data = Some(Bytes::from(data));
        self
    }

    pub fn with_receipt_block_number(mut self, block_number: u64) -> Self {
        self.receipt_block_number = block_number;
        self
    }

    pub fn with_receipt_effective_gas_price(mut self, price: u128) -> Self {
        self.receipt_effective_gas_price = price;
        self
    }

    pub fn with_block_timestamp(mut self, timestamp: u64) -> Self {
        self.block_timestamp = timestamp;
        self
    }

    pub fn whitelist(&self, account: Account, kind: &str) {
        self.whitelisted.lock().unwrap().push((account, kind.to_string()));
    }

    pub fn register_witness_resolver(&self, kind: &str, resolver: Arc<dyn WitnessResolver>) {
        self.witness_resolvers.lock().unwrap().push((kind.to_string(), resolver));
    }

    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn simulate_count(&self) -> u64 {
        self.simulate_count.load(Ordering::SeqCst)
    }

    pub fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::SeqCst)
    }

    pub fn payment_chain_reads(&self) -> u64 {
        self.payment_chain_reads.load(Ordering::SeqCst)
    }
}

impl Default for StubContext {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SolverContext for StubContext {
    async fn call(
        &self,
        _chain_id: u64,
        _to: Address,
        _data: Bytes,
        _block_number: Option<u64>,
    ) -> anyhow::Result<Bytes> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        Ok(Bytes::from(AbiEncodedValue::from_uint256(U256::ZERO).encoding().to_vec()))
    }

    async fn simulate(
        &self,
        _chain_id: u64,
        _account: Address,
        _to: Address,
        _data: Bytes,
        _block_number: Option<u64>,
    ) -> anyhow::Result<SimulationResult> {
        self.simulate_count.fetch_add(1, Ordering::SeqCst);
        Ok(SimulationResult {
            success: self.simulate_success,
            gas_used: 21_000,
            revert_data: self.revert_data.clone(),
        })
    }

    async fn send_transaction(
        &self,
        _chain_id: u64,
        _to: Address,
        _data: Bytes,
    ) -> anyhow::Result<B256> {
        self.send_count.fetch_add(1, Ordering::SeqCst);
        Ok(B256::repeat_byte(0xAB))
    }

    async fn wait_for_receipt(&self, _chain_id: u64, tx_hash: B256) -> anyhow::Result<TxReceipt> {
        Ok(TxReceipt {
            tx_hash,
            success: true,
            block_number: self.receipt_block_number,
            effective_gas_price: self.receipt_effective_gas_price,
        })
    }

    async fn block_timestamp(&self, _chain_id: u64, _block_number: u64) -> anyhow::Result<u64> {
        Ok(self.block_timestamp)
    }

    fn payment_chain(&self) -> u64 {
        self.payment_chain_reads.fetch_add(1, Ordering::SeqCst);
        self.payment_chain
    }

    async fn payment_recipient(&self, _chain_id: u64) -> anyhow::Result<Address> {
        Ok(self.payment_recipient)
    }

    fn filler_address(&self) -> Address {
        self.filler_address
    }

    async fn is_whitelisted(&self, account: Account, kind: &str) -> anyhow::Result<bool> {
        Ok(self
            .whitelisted
            .lock()
            .unwrap()
            .iter()
            .any(|(a, k)| *a == account && k == kind))
    }

    fn witness_resolver(&self, kind: &str) -> Option<Arc<dyn WitnessResolver>> {
        self.witness_resolvers
            .lock()
            .unwrap()
            .iter()
            .find(|(k, _)| k == kind)
            .map(|(_, r)| r.clone())
    }

    async fn token_price_usd(&self, _account: Account) -> anyhow::Result<U256> {
        Ok(self.token_price_usd)
    }

    async fn gas_price_usd(&self, _chain_id: u64) -> anyhow::Result<U256> {
        Ok(self.gas_price_usd)
    }
}
