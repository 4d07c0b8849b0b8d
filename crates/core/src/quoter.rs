//! Collects a plan's asset flows, evaluates their amounts, prices them in
//! USD, and gates on non-negative profit.

use alloy::primitives::Address;

use crate::call_builder::build_call_data;
use crate::context::SolverContext;
use crate::env::VariableEnv;
use crate::error::{QuoteError, SolverError};
use crate::model::{AbiEncodedValue, Account, Formula, ResolvedOrder, Step, VariableRole};

/// A single signed, chain-qualified flow contributing to the plan's PnL.
#[derive(Debug, Clone, Copy)]
pub enum FlowKind {
    Gas { step_index: usize },
    Token { token: Address },
}

/// An evaluated flow: amount in the token's smallest unit (or gas units),
/// signed, chain-qualified.
#[derive(Debug, Clone, Copy)]
pub struct EvaluatedFlow {
    pub kind: FlowKind,
    pub chain_id: u64,
    pub sign: i8,
    pub amount: u128,
}

/// The result of `quote`: the populated environment (reused by `fill`) and
/// the evaluated flows that justified acceptance.
pub struct Quote {
    pub env: VariableEnv,
    pub flows: Vec<EvaluatedFlow>,
    pub pnl_usd: i128,
}

struct PendingFlow {
    kind: FlowKind,
    chain_id: u64,
    sign: i8,
    formula: Option<Formula>,
}

/// `quote(ctx, plan) -> {env, flows}`.
pub async fn quote(
    ctx: &dyn SolverContext,
    plan: &ResolvedOrder,
) -> Result<Quote, SolverError> {
    if let Some(idx) = plan
        .variables
        .iter()
        .position(|role| matches!(role, VariableRole::Pricing))
    {
        return Err(QuoteError::PricingVariableUnsupported(idx).into());
    }

    let env = VariableEnv::new(plan.variables.clone());

    let mut pending = Vec::new();
    for (step_index, step) in plan.steps.iter().enumerate() {
        let Step::Call { target, payments, attributes, .. } = step;

        pending.push(PendingFlow {
            kind: FlowKind::Gas { step_index },
            chain_id: target.chain_id,
            sign: -1,
            formula: attributes.spends_estimated_gas,
        });

        for spend in &attributes.spends_erc20 {
            pending.push(PendingFlow {
                kind: FlowKind::Token { token: spend.token.address },
                chain_id: spend.token.chain_id,
                sign: -1,
                formula: Some(spend.amount_formula),
            });
        }

        for payment in payments {
            if payment.estimated_delay_seconds != 0 {
                return Err(QuoteError::DelayedPaymentUnsupported(payment.estimated_delay_seconds).into());
            }
            pending.push(PendingFlow {
                kind: FlowKind::Token { token: payment.token.address },
                chain_id: payment.token.chain_id,
                sign: 1,
                formula: Some(payment.amount_formula),
            });
        }
    }
    for payment in &plan.payments {
        if payment.estimated_delay_seconds != 0 {
            return Err(QuoteError::DelayedPaymentUnsupported(payment.estimated_delay_seconds).into());
        }
        pending.push(PendingFlow {
            kind: FlowKind::Token { token: payment.token.address },
            chain_id: payment.token.chain_id,
            sign: 1,
            formula: Some(payment.amount_formula),
        });
    }

    let mut flows = Vec::with_capacity(pending.len());
    for item in pending {
        let amount = match (&item.kind, item.formula) {
            (_, Some(formula)) => eval_formula(&env, ctx, formula).await?,
            (FlowKind::Gas { step_index }, None) => {
                simulate_gas(&env, ctx, plan, *step_index).await?
            }
            (FlowKind::Token { .. }, None) => unreachable!("token flows always carry a formula"),
        };
        flows.push(EvaluatedFlow {
            kind: item.kind,
            chain_id: item.chain_id,
            sign: item.sign,
            amount,
        });
    }

    let mut pnl_usd: i128 = 0;
    for flow in &flows {
        let price = match flow.kind {
            FlowKind::Gas { .. } => ctx.gas_price_usd(flow.chain_id).await?,
            FlowKind::Token { token } => {
                ctx.token_price_usd(Account { address: token, chain_id: flow.chain_id }).await?
            }
        };
        if price > alloy::primitives::U256::from(u128::MAX) {
            return Err(QuoteError::AmountOutOfRange(price).into());
        }
        let price: i128 = price.to::<u128>() as i128;
        let amount: i128 = flow.amount as i128;
        let signed_amount = amount
            .checked_mul(flow.sign as i128)
            .and_then(|v| v.checked_mul(price))
            .ok_or(QuoteError::PnlOverflow)?;
        pnl_usd = pnl_usd.checked_add(signed_amount).ok_or(QuoteError::PnlOverflow)?;
    }

    if pnl_usd < 0 {
        return Err(QuoteError::NegativePnl(pnl_usd).into());
    }

    Ok(Quote { env, flows, pnl_usd })
}

/// Evaluate a [`Formula`] to `uint256`. `Constant` is immediate; `Variable`
/// requires the resolved value to be Static and to decode as `uint256`.
async fn eval_formula(
    env: &VariableEnv,
    ctx: &dyn SolverContext,
    formula: Formula,
) -> Result<u128, SolverError> {
    let value = match formula {
        Formula::Constant(v) => v,
        Formula::Variable(idx) => {
            let resolved = env.get(ctx, idx).await?;
            match resolved {
                AbiEncodedValue::Static(ref bytes) if bytes.len() == 32 => {
                    alloy::primitives::U256::from_be_slice(bytes)
                }
                AbiEncodedValue::Static(_) => return Err(QuoteError::FormulaNotUint256.into()),
                AbiEncodedValue::Dynamic(_) => return Err(QuoteError::FormulaValueNotStatic.into()),
            }
        }
    };
    if value > alloy::primitives::U256::from(u128::MAX) {
        return Err(QuoteError::AmountOutOfRange(value).into());
    }
    Ok(value.to::<u128>())
}

/// Simulate a step's call to obtain `gasUsed`, used only when no explicit
/// `SpendsEstimatedGas` formula is present.
async fn simulate_gas(
    env: &VariableEnv,
    ctx: &dyn SolverContext,
    plan: &ResolvedOrder,
    step_index: usize,
) -> Result<u128, SolverError> {
    let Step::Call { target, selector, arguments, .. } = &plan.steps[step_index];
    let calldata = build_call_data(env, ctx, *selector, arguments).await?;
    let result = ctx
        .simulate(target.chain_id, ctx.filler_address(), target.address, calldata.into(), None)
        .await?;
    if !result.success {
        return Err(QuoteError::GasSimulationFailed(step_index).into());
    }
    Ok(result.gas_used as u128)
}
