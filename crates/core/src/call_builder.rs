//! Composes ABI-encoded call data from a selector plus a mixed list of
//! literal and variable-bound arguments, using the head/tail layout: static
//! values are emitted inline, dynamic values are emitted as an offset in
//! the head and appended to the tail.

use alloy::primitives::U256;

use crate::context::SolverContext;
use crate::env::VariableEnv;
use crate::error::{CodecError, SolverError};
use crate::model::{AbiEncodedValue, Argument};

/// Resolve an [`Argument`] to its [`AbiEncodedValue`]: `Variable` pulls
/// from the environment (computing if necessary), `Literal` is already
/// known.
pub async fn resolve_argument(
    env: &VariableEnv,
    ctx: &dyn SolverContext,
    argument: &Argument,
) -> Result<AbiEncodedValue, SolverError> {
    match argument {
        Argument::Variable(idx) => env.get(ctx, *idx).await,
        Argument::Literal(value) => Ok(value.clone()),
    }
}

/// Build calldata for `selector` applied to `arguments`, resolving each
/// argument through `env` as needed.
pub async fn build_call_data(
    env: &VariableEnv,
    ctx: &dyn SolverContext,
    selector: [u8; 4],
    arguments: &[Argument],
) -> Result<Vec<u8>, SolverError> {
    let mut values = Vec::with_capacity(arguments.len());
    for argument in arguments {
        values.push(resolve_argument(env, ctx, argument).await?);
    }
    Ok(encode_call(selector, &values))
}

/// Pure encoder: selector ∥ heads ∥ tails, given already-resolved values.
pub fn encode_call(selector: [u8; 4], values: &[AbiEncodedValue]) -> Vec<u8> {
    let heads_size: usize = values
        .iter()
        .map(|v| if v.is_dynamic() { 32 } else { v.encoding().len() })
        .sum();

    let mut heads = Vec::with_capacity(heads_size);
    let mut tails = Vec::new();
    let mut tail_cursor = heads_size;

    for value in values {
        if value.is_dynamic() {
            heads.extend_from_slice(&U256::from(tail_cursor).to_be_bytes::<32>());
            tails.extend_from_slice(value.encoding());
            tail_cursor += value.encoding().len();
        } else {
            heads.extend_from_slice(value.encoding());
        }
    }

    let mut out = Vec::with_capacity(4 + heads.len() + tails.len());
    out.extend_from_slice(&selector);
    out.extend_from_slice(&heads);
    out.extend_from_slice(&tails);
    out
}

/// Validate a selector's length, surfacing the codec's literal invariant
/// ("selector must be 4 bytes") at the one place a selector is accepted
/// from outside the plan's own typed fields.
pub fn validate_selector(selector: &[u8]) -> Result<[u8; 4], CodecError> {
    selector
        .try_into()
        .map_err(|_| CodecError::BadSelectorLength(selector.len()))
}
