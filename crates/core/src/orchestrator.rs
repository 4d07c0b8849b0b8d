//! `process(ctx, plan)`: preflight validation, then quote, then fill.
//!
//! Preflight rejections are fatal per plan and never reach `quote`/`fill`:
//! an out-of-bounds variable index, a malformed revert-policy ordering, a
//! deadline too close to now, an unwhitelisted assumption, or a `Witness`
//! kind with no registered resolver.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::config;
use crate::context::SolverContext;
use crate::error::{PreflightError, SolverError};
use crate::filler::{self, FillOutcome};
use crate::model::{Argument, Formula, ResolvedOrder, RevertPolicyKind, Step, VariableRole};
use crate::quoter::{self, Quote};

/// The result of `process`: the quote that justified filling, and the
/// outcome of the fill itself.
pub struct ProcessOutcome {
    pub pnl_usd: i128,
    pub fill: FillOutcome,
}

pub async fn process(
    ctx: &dyn SolverContext,
    plan: &ResolvedOrder,
) -> Result<ProcessOutcome, SolverError> {
    check_variable_indices(plan)?;
    check_revert_policy_ordering(plan)?;
    check_deadline_slack(ctx, plan)?;
    check_assumptions(ctx, plan).await?;
    check_witness_resolvers(ctx, plan)?;

    let Quote { env, pnl_usd, .. } = quoter::quote(ctx, plan).await?;
    let fill = filler::fill(ctx, plan, &env).await?;

    Ok(ProcessOutcome { pnl_usd, fill })
}

/// Invariant (a): every `varIdx` referenced anywhere is `< plan.variables.len()`.
fn check_variable_indices(plan: &ResolvedOrder) -> Result<(), SolverError> {
    let len = plan.variables.len();
    let mut check = |idx: usize| -> Result<(), SolverError> {
        if idx >= len {
            return Err(PreflightError::VarIndexOutOfBounds(idx, len).into());
        }
        Ok(())
    };

    let check_argument = |idx: &mut dyn FnMut(usize) -> Result<(), SolverError>, arg: &Argument| {
        if let Argument::Variable(v) = arg {
            idx(*v)
        } else {
            Ok(())
        }
    };

    for step in &plan.steps {
        let Step::Call { arguments, attributes, payments, .. } = step;
        for arg in arguments {
            check_argument(&mut check, arg)?;
        }
        for spend in &attributes.spends_erc20 {
            if let Formula::Variable(idx) = spend.amount_formula {
                check(idx)?;
            }
        }
        if let Some(Formula::Variable(idx)) = attributes.spends_estimated_gas {
            check(idx)?;
        }
        if let Some(idx) = attributes.with_timestamp {
            check(idx)?;
        }
        if let Some(idx) = attributes.with_block_number {
            check(idx)?;
        }
        if let Some(idx) = attributes.with_effective_gas_price {
            check(idx)?;
        }
        if let Some(required) = &attributes.required_call_result {
            for arg in &required.arguments {
                check_argument(&mut check, arg)?;
            }
        }
        for payment in payments {
            if let Formula::Variable(idx) = payment.amount_formula {
                check(idx)?;
            }
            check(payment.recipient_var_idx)?;
        }
    }

    for payment in &plan.payments {
        if let Formula::Variable(idx) = payment.amount_formula {
            check(idx)?;
        }
        check(payment.recipient_var_idx)?;
    }

    for role in &plan.variables {
        if let VariableRole::Query { arguments, .. } = role {
            for arg in arguments {
                check_argument(&mut check, arg)?;
            }
        }
        if let VariableRole::Witness { variables, .. } = role {
            for idx in variables {
                check(*idx)?;
            }
        }
    }

    Ok(())
}

/// Invariant (c): `lastIndex(revertPolicy contains drop) <= firstIndex(has SpendsERC20)`.
fn check_revert_policy_ordering(plan: &ResolvedOrder) -> Result<(), SolverError> {
    let last_drop = plan
        .steps
        .iter()
        .enumerate()
        .filter(|(_, step)| {
            step.attributes()
                .revert_policy
                .iter()
                .any(|entry| entry.policy == RevertPolicyKind::Drop)
        })
        .map(|(idx, _)| idx)
        .last();

    let first_spend = plan
        .steps
        .iter()
        .enumerate()
        .find(|(_, step)| !step.attributes().spends_erc20.is_empty())
        .map(|(idx, _)| idx);

    if let (Some(drop_idx), Some(spend_idx)) = (last_drop, first_spend) {
        if drop_idx > spend_idx {
            return Err(PreflightError::InvalidRevertPolicyOrdering { drop_idx, spend_idx }.into());
        }
    }

    Ok(())
}

fn check_deadline_slack(ctx: &dyn SolverContext, plan: &ResolvedOrder) -> Result<(), SolverError> {
    let earliest = plan
        .steps
        .iter()
        .filter_map(|step| step.attributes().required_before.map(|r| r.deadline))
        .min();

    let Some(earliest) = earliest else { return Ok(()) };

    let _ = ctx; // deadline is evaluated against wall-clock now, not the context
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_secs();
    let required = now + config::config().max_fill_time_secs;

    if required >= earliest {
        return Err(PreflightError::DeadlineTooClose { required, earliest }.into());
    }
    Ok(())
}

async fn check_assumptions(ctx: &dyn SolverContext, plan: &ResolvedOrder) -> Result<(), SolverError> {
    for assumption in &plan.assumptions {
        if !ctx.is_whitelisted(assumption.trusted, &assumption.kind).await? {
            return Err(PreflightError::UntrustedAssumption {
                kind: assumption.kind.clone(),
                chain_id: assumption.trusted.chain_id,
            }
            .into());
        }
    }
    Ok(())
}

fn check_witness_resolvers(ctx: &dyn SolverContext, plan: &ResolvedOrder) -> Result<(), SolverError> {
    for role in &plan.variables {
        if let VariableRole::Witness { kind, .. } = role {
            if ctx.witness_resolver(kind).is_none() {
                return Err(PreflightError::UnsupportedWitnessKind(kind.clone()).into());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Account, Attributes, RevertPolicyEntry};
    use crate::test_support::StubContext;
    use alloy::primitives::{Address, Bytes, U256};

    fn account(byte: u8, chain_id: u64) -> Account {
        Account { address: Address::repeat_byte(byte), chain_id }
    }

    fn bare_step(target: Account, attributes: Attributes) -> Step {
        Step::Call {
            target,
            selector: [0u8; 4],
            arguments: vec![],
            attributes,
            payments: vec![],
        }
    }

    #[test]
    fn out_of_bounds_variable_index_is_rejected() {
        let plan = ResolvedOrder {
            steps: vec![Step::Call {
                target: account(0x01, 1),
                selector: [0u8; 4],
                arguments: vec![Argument::Variable(5)],
                attributes: Attributes::default(),
                payments: vec![],
            }],
            variables: vec![],
            assumptions: vec![],
            payments: vec![],
        };
        assert!(matches!(
            check_variable_indices(&plan),
            Err(SolverError::Preflight(PreflightError::VarIndexOutOfBounds(5, 0)))
        ));
    }

    #[test]
    fn drop_before_spend_is_rejected_property_invariant_c() {
        let plan = ResolvedOrder {
            steps: vec![
                bare_step(
                    account(0x01, 1),
                    Attributes {
                        revert_policy: vec![RevertPolicyEntry {
                            policy: RevertPolicyKind::Drop,
                            expected_reason: Bytes::new(),
                        }],
                        ..Default::default()
                    },
                ),
                bare_step(
                    account(0x02, 1),
                    Attributes {
                        spends_erc20: vec![crate::model::SpendsErc20 {
                            token: account(0xAA, 1),
                            amount_formula: Formula::Constant(U256::ZERO),
                            spender: account(0x02, 1),
                            receiver: account(0x03, 1),
                        }],
                        ..Default::default()
                    },
                ),
            ],
            variables: vec![],
            assumptions: vec![],
            payments: vec![],
        };
        assert!(matches!(
            check_revert_policy_ordering(&plan),
            Err(SolverError::Preflight(PreflightError::InvalidRevertPolicyOrdering { .. }))
        ));
    }

    #[test]
    fn drop_after_spend_is_accepted() {
        let plan = ResolvedOrder {
            steps: vec![
                bare_step(
                    account(0x02, 1),
                    Attributes {
                        spends_erc20: vec![crate::model::SpendsErc20 {
                            token: account(0xAA, 1),
                            amount_formula: Formula::Constant(U256::ZERO),
                            spender: account(0x02, 1),
                            receiver: account(0x03, 1),
                        }],
                        ..Default::default()
                    },
                ),
                bare_step(
                    account(0x01, 1),
                    Attributes {
                        revert_policy: vec![RevertPolicyEntry {
                            policy: RevertPolicyKind::Drop,
                            expected_reason: Bytes::new(),
                        }],
                        ..Default::default()
                    },
                ),
            ],
            variables: vec![],
            assumptions: vec![],
            payments: vec![],
        };
        assert!(check_revert_policy_ordering(&plan).is_ok());
    }

    #[tokio::test]
    async fn unwhitelisted_assumption_is_rejected() {
        let plan = ResolvedOrder {
            steps: vec![],
            variables: vec![],
            assumptions: vec![crate::model::Assumption {
                trusted: account(0x01, 1),
                kind: "oracle".into(),
            }],
            payments: vec![],
        };
        let ctx = StubContext::new();
        assert!(matches!(
            check_assumptions(&ctx, &plan).await,
            Err(SolverError::Preflight(PreflightError::UntrustedAssumption { .. }))
        ));
    }

    #[tokio::test]
    async fn whitelisted_assumption_is_accepted() {
        let trusted = account(0x01, 1);
        let plan = ResolvedOrder {
            steps: vec![],
            variables: vec![],
            assumptions: vec![crate::model::Assumption {
                trusted,
                kind: "oracle".into(),
            }],
            payments: vec![],
        };
        let ctx = StubContext::new();
        ctx.whitelist(trusted, "oracle");
        assert!(check_assumptions(&ctx, &plan).await.is_ok());
    }

    #[test]
    fn missing_witness_resolver_is_rejected() {
        let plan = ResolvedOrder {
            steps: vec![],
            variables: vec![VariableRole::Witness {
                kind: "signature".into(),
                data: Bytes::new(),
                variables: vec![],
            }],
            assumptions: vec![],
            payments: vec![],
        };
        let ctx = StubContext::new();
        assert!(matches!(
            check_witness_resolvers(&ctx, &plan),
            Err(SolverError::Preflight(PreflightError::UnsupportedWitnessKind(_)))
        ));
    }
}
