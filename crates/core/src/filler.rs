//! Iterates a plan's steps in declared order: resolves witness-kind
//! arguments, optionally sleeps until a scheduled timestamp, simulates for
//! revert, sends, awaits the receipt, extracts receipt-derived variables,
//! and interprets any revert under the step's revert policy.

use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::{Bytes, B256, U256};
use tracing::{info, instrument, warn};

use crate::call_builder::build_call_data;
use crate::context::SolverContext;
use crate::env::VariableEnv;
use crate::error::{FillError, SolverError};
use crate::model::{AbiEncodedValue, Argument, ResolvedOrder, RevertPolicyKind, Step, VariableRole};

/// Per-step disposition recorded for the final [`FillOutcome`] trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    Completed,
    Ignored,
}

/// What happened to one step, for observability.
#[derive(Debug, Clone)]
pub struct StepTrace {
    pub step_index: usize,
    pub tx_hash: Option<B256>,
    pub result: StepResult,
}

/// The terminal result of `fill`.
#[derive(Debug, Clone)]
pub enum FillOutcome {
    /// Every step ran to completion (or was policy-ignored).
    Completed { steps: Vec<StepTrace> },
    /// A step's revert policy signalled `drop`; the plan ended cleanly.
    Dropped { at_step: usize, steps: Vec<StepTrace> },
}

impl FillOutcome {
    /// The spec's literal contract: `true` means completed end-to-end,
    /// `false` means a `drop` policy terminated the plan.
    pub fn completed(&self) -> bool {
        matches!(self, FillOutcome::Completed { .. })
    }
}

/// `fill(ctx, plan, env) -> FillOutcome`.
pub async fn fill(
    ctx: &dyn SolverContext,
    plan: &ResolvedOrder,
    env: &VariableEnv,
) -> Result<FillOutcome, SolverError> {
    let mut trace = Vec::with_capacity(plan.steps.len());

    for (step_index, step) in plan.steps.iter().enumerate() {
        match run_step(ctx, env, step_index, step).await? {
            StepOutcome::Completed(tx_hash) => trace.push(StepTrace {
                step_index,
                tx_hash: Some(tx_hash),
                result: StepResult::Completed,
            }),
            StepOutcome::Ignored => trace.push(StepTrace {
                step_index,
                tx_hash: None,
                result: StepResult::Ignored,
            }),
            StepOutcome::Dropped => {
                return Ok(FillOutcome::Dropped { at_step: step_index, steps: trace });
            }
        }
    }

    Ok(FillOutcome::Completed { steps: trace })
}

enum StepOutcome {
    Completed(B256),
    Ignored,
    Dropped,
}

#[instrument(skip(ctx, env, step), fields(step_index))]
async fn run_step(
    ctx: &dyn SolverContext,
    env: &VariableEnv,
    step_index: usize,
    step: &Step,
) -> Result<StepOutcome, SolverError> {
    let Step::Call { target, selector, arguments, attributes, .. } = step;

    resolve_witnesses(ctx, env, arguments).await?;

    if let Some(deadline) = scheduled_timestamp(ctx, env, attributes).await? {
        sleep_until(deadline).await;
    }

    let calldata = build_call_data(env, ctx, *selector, arguments).await?;

    let simulation = ctx
        .simulate(target.chain_id, ctx.filler_address(), target.address, calldata.clone().into(), None)
        .await?;

    if !simulation.success {
        return handle_revert(step_index, attributes, simulation.revert_data);
    }

    let tx_hash = ctx
        .send_transaction(target.chain_id, target.address, calldata.clone().into())
        .await?;
    let receipt = ctx.wait_for_receipt(target.chain_id, tx_hash).await?;

    if receipt.success {
        if let Some(idx) = attributes.with_block_number {
            env.set(idx, AbiEncodedValue::from_uint256(U256::from(receipt.block_number)))
                .await?;
        }
        if let Some(idx) = attributes.with_timestamp {
            let ts = ctx.block_timestamp(target.chain_id, receipt.block_number).await?;
            env.set(idx, AbiEncodedValue::from_uint256(U256::from(ts))).await?;
        }
        if let Some(idx) = attributes.with_effective_gas_price {
            env.set(
                idx,
                AbiEncodedValue::from_uint256(U256::from(receipt.effective_gas_price)),
            )
            .await?;
        }
        info!(step_index, tx_hash = %tx_hash, "step completed");
        return Ok(StepOutcome::Completed(tx_hash));
    }

    // The transaction landed but reverted; re-simulate at the receipt's
    // block to recover revert data.
    let resim = ctx
        .simulate(
            target.chain_id,
            ctx.filler_address(),
            target.address,
            calldata.into(),
            Some(receipt.block_number),
        )
        .await?;
    if resim.success {
        warn!(step_index, "revert re-simulation unexpectedly succeeded; treating as internal error");
        return Err(FillError::NoRevertData(step_index).into());
    }
    handle_revert(step_index, attributes, resim.revert_data)
}

async fn resolve_witnesses(
    ctx: &dyn SolverContext,
    env: &VariableEnv,
    arguments: &[Argument],
) -> Result<(), SolverError> {
    for argument in arguments {
        let Argument::Variable(idx) = argument else { continue };
        let VariableRole::Witness { kind, data, variables } = env.role(*idx).clone() else {
            continue;
        };
        let resolver = ctx
            .witness_resolver(&kind)
            .ok_or_else(|| FillError::MissingWitnessResolver(kind.clone()))?;

        let mut values = Vec::with_capacity(variables.len());
        for dep_idx in variables {
            values.push(env.get(ctx, dep_idx).await?);
        }

        let resolved = resolver
            .resolve(&data, &values)
            .await
            .map_err(|e| FillError::WitnessResolutionFailed(kind.clone(), e.to_string()))?;
        env.set(*idx, resolved).await?;
    }
    Ok(())
}

async fn scheduled_timestamp(
    ctx: &dyn SolverContext,
    env: &VariableEnv,
    attributes: &crate::model::Attributes,
) -> Result<Option<u64>, SolverError> {
    let mut scheduled = None;

    if let Some(idx) = attributes.with_timestamp {
        if let Some(value) = env.peek(idx).await {
            if let Ok(ts) = value.as_uint256() {
                if ts <= alloy::primitives::U256::from(u64::MAX) {
                    scheduled = Some(ts.to::<u64>());
                }
            }
        }
    }

    if let Some(required) = &attributes.required_filler_until {
        if ctx.filler_address() != required.exclusive_filler.address {
            scheduled = Some(scheduled.map_or(required.deadline, |s| s.max(required.deadline)));
        }
    }

    Ok(scheduled)
}

async fn sleep_until(deadline_secs: u64) {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_secs();
    if deadline_secs <= now {
        return;
    }
    tokio::time::sleep(std::time::Duration::from_secs(deadline_secs - now)).await;
}

fn handle_revert(
    step_index: usize,
    attributes: &crate::model::Attributes,
    revert_data: Option<Bytes>,
) -> Result<StepOutcome, SolverError> {
    let Some(data) = revert_data else {
        return Err(FillError::NoRevertData(step_index).into());
    };

    warn!(step_index, reason = %describe_revert(&data), "step reverted");

    let matched = attributes
        .revert_policy
        .iter()
        .find(|entry| is_prefix_case_insensitive(&entry.expected_reason, &data));

    match matched.map(|e| e.policy) {
        Some(RevertPolicyKind::Drop) => {
            info!(step_index, "revert policy: drop");
            Ok(StepOutcome::Dropped)
        }
        Some(RevertPolicyKind::Ignore) => {
            info!(step_index, "revert policy: ignore");
            Ok(StepOutcome::Ignored)
        }
        None => Err(FillError::UnmatchedRevert(step_index).into()),
    }
}

fn is_prefix_case_insensitive(prefix: &[u8], data: &[u8]) -> bool {
    if prefix.len() > data.len() {
        return false;
    }
    prefix
        .iter()
        .zip(&data[..prefix.len()])
        .all(|(a, b)| a.to_ascii_lowercase() == b.to_ascii_lowercase())
}

const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];
const PANIC_UINT256_SELECTOR: [u8; 4] = [0x4e, 0x48, 0x7b, 0x71];

/// Best-effort human-readable description of revert data, recognizing the
/// standard `Error(string)` and `Panic(uint256)` forms. Never used for
/// policy matching — that always operates on the raw bytes, per the
/// literal prefix rule.
fn describe_revert(data: &[u8]) -> String {
    if data.len() >= 4 && data[0..4] == ERROR_STRING_SELECTOR {
        use alloy::sol_types::{sol_data, SolType};
        if let Ok(reason) = sol_data::String::abi_decode(&data[4..], true) {
            return format!("Error({reason:?})");
        }
    }
    if data.len() >= 36 && data[0..4] == PANIC_UINT256_SELECTOR {
        let code = U256::from_be_slice(&data[4..36]);
        return format!("Panic({code})");
    }
    format!("0x{}", hex::encode(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Account, Attributes, RevertPolicyEntry};
    use crate::test_support::StubContext;
    use alloy::primitives::Address;

    fn account(byte: u8, chain_id: u64) -> Account {
        Account { address: Address::repeat_byte(byte), chain_id }
    }

    #[tokio::test]
    async fn scenario_s5_drop_halts_fill() {
        let step = Step::Call {
            target: account(0x01, 1),
            selector: [0u8; 4],
            arguments: vec![],
            attributes: Attributes {
                revert_policy: vec![RevertPolicyEntry {
                    policy: RevertPolicyKind::Drop,
                    expected_reason: Bytes::from(vec![0xDE, 0xAD]),
                }],
                ..Default::default()
            },
            payments: vec![],
        };
        let second_step = step.clone();
        let plan = ResolvedOrder {
            steps: vec![step, second_step],
            variables: vec![],
            assumptions: vec![],
            payments: vec![],
        };
        let ctx = StubContext::new().with_revert_data(vec![0xDE, 0xAD, 0xBE, 0xEF]);
        let env = VariableEnv::new(plan.variables.clone());
        let outcome = fill(&ctx, &plan, &env).await.unwrap();
        assert!(!outcome.completed());
        match outcome {
            FillOutcome::Dropped { at_step, steps } => {
                assert_eq!(at_step, 0);
                assert!(steps.is_empty());
            }
            _ => panic!("expected drop"),
        }
        assert_eq!(ctx.send_count(), 0, "no transaction should be sent after drop");
    }

    #[tokio::test]
    async fn scenario_s6_receipt_extraction() {
        let step = Step::Call {
            target: account(0x01, 1),
            selector: [0u8; 4],
            arguments: vec![],
            attributes: Attributes {
                with_block_number: Some(0),
                with_timestamp: Some(1),
                with_effective_gas_price: Some(2),
                ..Default::default()
            },
            payments: vec![],
        };
        let plan = ResolvedOrder {
            steps: vec![step],
            variables: vec![VariableRole::TxOutput, VariableRole::TxOutput, VariableRole::TxOutput],
            assumptions: vec![],
            payments: vec![],
        };
        let ctx = StubContext::new()
            .with_receipt_block_number(1000)
            .with_receipt_effective_gas_price(7)
            .with_block_timestamp(12345);
        let env = VariableEnv::new(plan.variables.clone());
        let outcome = fill(&ctx, &plan, &env).await.unwrap();
        assert!(outcome.completed());

        assert_eq!(env.get(&ctx, 0).await.unwrap().as_uint256().unwrap(), U256::from(1000u64));
        assert_eq!(env.get(&ctx, 1).await.unwrap().as_uint256().unwrap(), U256::from(12345u64));
        assert_eq!(env.get(&ctx, 2).await.unwrap().as_uint256().unwrap(), U256::from(7u64));
    }

    #[test]
    fn prefix_match_is_case_insensitive() {
        assert!(is_prefix_case_insensitive(&[0xDE, 0xAD], &[0xde, 0xad, 0xbe, 0xef]));
        assert!(!is_prefix_case_insensitive(&[0xDE, 0xAD], &[0xbe, 0xef]));
    }
}
