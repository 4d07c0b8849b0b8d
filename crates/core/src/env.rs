//! `VariableEnv`: the plan's lazily-computed, tick-versioned dependency
//! graph of variable values.
//!
//! Each slot is guarded by its own `tokio::sync::Mutex`, held across the
//! `await` that computes its value. A concurrent `get` on the same slot
//! therefore simply waits for the lock rather than racing a duplicate
//! computation — the freshness check that runs once the lock is acquired
//! then finds the value already fresh and returns it without recomputing,
//! which is what gives the single-compute guarantee.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;

use crate::codec::decode_abi_encoded_value;
use crate::context::SolverContext;
use crate::error::{FillError, SolverError};
use crate::model::{AbiEncodedValue, VariableRole};

#[derive(Debug, Default)]
struct Slot {
    value_tick: Option<(AbiEncodedValue, u64)>,
}

/// The per-plan cache of variable values and their dependency freshness.
pub struct VariableEnv {
    roles: Vec<VariableRole>,
    slots: Vec<Mutex<Slot>>,
    counter: AtomicU64,
}

impl VariableEnv {
    /// Create a fresh environment for a plan's variable list. All slots
    /// start empty.
    pub fn new(roles: Vec<VariableRole>) -> Self {
        let slots = roles.iter().map(|_| Mutex::new(Slot::default())).collect();
        Self {
            roles,
            slots,
            counter: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn role(&self, idx: usize) -> &VariableRole {
        &self.roles[idx]
    }

    /// Returns the cached value if fresh, else computes (and caches) it.
    pub async fn get(
        &self,
        ctx: &dyn SolverContext,
        idx: usize,
    ) -> Result<AbiEncodedValue, SolverError> {
        let mut slot = self.slots[idx].lock().await;

        if let Some((value, tick)) = slot.value_tick.clone() {
            if self.is_fresh(idx, tick).await {
                return Ok(value);
            }
        }

        let value = self.compute(ctx, idx).await?;
        let tick = self.counter.fetch_add(1, Ordering::SeqCst);
        slot.value_tick = Some((value.clone(), tick));
        Ok(value)
    }

    /// Return the cached value without triggering a computation or
    /// checking freshness — used only where the contract explicitly calls
    /// for "already known", not "fresh" (filler scheduling).
    pub async fn peek(&self, idx: usize) -> Option<AbiEncodedValue> {
        self.slots[idx].lock().await.value_tick.clone().map(|(v, _)| v)
    }

    /// Set a variable's value directly. Only valid for roles whose value
    /// is externally produced (`Pricing`, `TxOutput`, `Witness`).
    pub async fn set(&self, idx: usize, value: AbiEncodedValue) -> Result<(), SolverError> {
        match &self.roles[idx] {
            VariableRole::Pricing | VariableRole::TxOutput | VariableRole::Witness { .. } => {}
            _ => return Err(FillError::NotSettable(idx).into()),
        }
        let tick = self.counter.fetch_add(1, Ordering::SeqCst);
        let mut slot = self.slots[idx].lock().await;
        slot.value_tick = Some((value, tick));
        Ok(())
    }

    /// A slot is fresh iff it holds a value and, recursively, every
    /// dependency slot is fresh and has a tick no greater than `own_tick`.
    fn is_fresh<'a>(&'a self, idx: usize, own_tick: u64) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>> {
        Box::pin(async move {
            for dep in self.roles[idx].dependencies() {
                let dep_tick = {
                    let dep_slot = self.slots[dep].lock().await;
                    match &dep_slot.value_tick {
                        None => return false,
                        Some((_, dep_tick)) => *dep_tick,
                    }
                };
                if dep_tick > own_tick {
                    return false;
                }
                if !self.is_fresh(dep, dep_tick).await {
                    return false;
                }
            }
            true
        })
    }

    async fn compute(
        &self,
        ctx: &dyn SolverContext,
        idx: usize,
    ) -> Result<AbiEncodedValue, SolverError> {
        match self.roles[idx].clone() {
            VariableRole::PaymentChain => Ok(AbiEncodedValue::from_uint256(
                alloy::primitives::U256::from(ctx.payment_chain()),
            )),
            VariableRole::PaymentRecipient { chain_id } => {
                let address = ctx.payment_recipient(chain_id).await?;
                Ok(AbiEncodedValue::from_address(address))
            }
            VariableRole::Query {
                target,
                selector,
                arguments,
                block_number,
            } => {
                let calldata = crate::call_builder::build_call_data(self, ctx, selector, &arguments).await?;
                let response = ctx
                    .call(target.chain_id, target.address, calldata.into(), block_number)
                    .await?;
                Ok(decode_abi_encoded_value(&response)?)
            }
            VariableRole::Pricing | VariableRole::TxOutput | VariableRole::Witness { .. } => {
                Err(FillError::VariableNotSet(idx).into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Account, Argument};
    use crate::test_support::StubContext;
    use alloy::primitives::{Address, U256};

    #[tokio::test]
    async fn determinism_single_compute_property_5() {
        let ctx = StubContext::new().with_payment_chain(7);
        let env = VariableEnv::new(vec![VariableRole::PaymentChain]);

        let first = env.get(&ctx, 0).await.unwrap();
        let computes_before = ctx.payment_chain_reads();
        let second = env.get(&ctx, 0).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(computes_before, ctx.payment_chain_reads());
    }

    #[tokio::test]
    async fn set_invalidates_dependents_property_4() {
        let ctx = StubContext::new();
        let env = VariableEnv::new(vec![
            VariableRole::Witness {
                kind: "test".into(),
                data: Default::default(),
                variables: vec![],
            },
            VariableRole::Query {
                target: Account { address: Address::ZERO, chain_id: 1 },
                selector: [0u8; 4],
                arguments: vec![Argument::Variable(0)],
                block_number: None,
            },
        ]);

        env.set(0, AbiEncodedValue::from_uint256(U256::from(1u64)))
            .await
            .unwrap();
        let first = env.get(&ctx, 1).await.unwrap();
        let calls_before = ctx.call_count();

        env.set(0, AbiEncodedValue::from_uint256(U256::from(2u64)))
            .await
            .unwrap();
        let second = env.get(&ctx, 1).await.unwrap();
        assert_ne!(first, second);
        assert!(ctx.call_count() > calls_before);
    }

    #[tokio::test]
    async fn set_rejected_for_query_role() {
        let env = VariableEnv::new(vec![VariableRole::Query {
            target: Account { address: Address::ZERO, chain_id: 1 },
            selector: [0u8; 4],
            arguments: vec![],
            block_number: None,
        }]);
        let result = env
            .set(0, AbiEncodedValue::from_uint256(U256::ZERO))
            .await;
        assert!(matches!(result, Err(SolverError::Fill(FillError::NotSettable(0)))));
    }
}
