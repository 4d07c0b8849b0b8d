//! Decodes a resolver contract's response into a typed [`ResolvedOrder`].
//!
//! Every entity (step, attribute, formula, payment, variable role) is
//! itself ABI-encoded as a call whose function name is the entity's kind
//! tag; `alloy::sol!` gives each kind a typed decoder and a selector that
//! `SolCall::abi_decode` validates for us, so dispatch is just "try each
//! kind's decoder until one claims the blob's selector."

use alloy::primitives::{Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::error::CodecError;
use crate::model::{
    decode_erc7930, Account, AbiEncodedValue, Argument, Attributes, Formula, Payment,
    RequiredBefore, RequiredCallResult, RequiredFillerUntil, ResolvedOrder, RevertPolicyEntry,
    RevertPolicyKind, SpendsErc20, Step, VariableRole, Assumption,
};

sol! {
    function resolve(bytes payload) external view returns (
        bytes[] steps,
        bytes[] variables,
        ResolverAssumption[] assumptions,
        bytes[] payments
    );

    #[derive(Debug)]
    struct ResolverAssumption {
        bytes trusted;
        string kind;
    }

    function Call(bytes target, bytes4 selector, bytes[] arguments, bytes[] attributes, bytes[] payments);

    function SpendsERC20(bytes token, bytes amountFormula, bytes spender, bytes receiver);
    function SpendsEstimatedGas(bytes amountFormula);
    function RevertPolicy(uint8 policy, bytes expectedReason);
    function RequiredBefore(uint256 deadline);
    function RequiredFillerUntil(bytes exclusiveFiller, uint256 deadline);
    function RequiredCallResult(bytes target, bytes4 selector, bytes[] arguments, bytes result);
    function WithTimestamp(uint256 varIdx);
    function WithBlockNumber(uint256 varIdx);
    function WithEffectiveGasPrice(uint256 varIdx);

    function FormulaConstant(uint256 value);
    function FormulaVariable(uint256 varIdx);

    function Payment(bytes token, bytes sender, bytes amountFormula, uint256 recipientVarIdx, uint256 estimatedDelaySeconds);

    function RolePaymentRecipient(uint256 chainId);
    function RolePaymentChain();
    function RolePricing();
    function RoleTxOutput();
    function RoleWitness(string kind, bytes data, uint256[] variables);
    function RoleQuery(bytes target, bytes4 selector, bytes[] arguments, bool hasBlockNumber, uint256 blockNumber);
}

/// `53`-bit ceiling on indices transported as `uint256`, per the safe
/// integer range of an `f64`/JS number — kept even though this is Rust so
/// plan bytes stay interoperable with other implementations of the wire
/// format.
const MAX_SAFE_INDEX: u64 = (1u64 << 53) - 1;

fn safe_index(value: U256) -> Result<usize, CodecError> {
    if value > U256::from(MAX_SAFE_INDEX) {
        return Err(CodecError::IntegerOutOfRange(value));
    }
    Ok(value.to::<u64>() as usize)
}

/// Checked narrowing of a wire `uint256` to `u64`, for deadlines/chain ids/
/// delays — these are ordinary integers, not the 53-bit-ceilinged indices
/// `safe_index` guards, but `U256::to::<u64>()` panics on overflow so the
/// bound still needs to be checked before narrowing.
fn u256_to_u64(value: U256) -> Result<u64, CodecError> {
    if value > U256::from(u64::MAX) {
        return Err(CodecError::IntegerOutOfRange(value));
    }
    Ok(value.to::<u64>())
}

fn abi_decode<T: SolCall>(bytes: &[u8]) -> Result<T, CodecError> {
    T::abi_decode(bytes, true).map_err(|e| CodecError::AbiDecode(e.to_string()))
}

/// The dynamic-prefix marker for an ABI-encoded `(string "", T)` tuple:
/// offset-to-string (0x40), offset-to-T (0x60), string length (0x00).
fn dynamic_prefix() -> [u8; 96] {
    let mut buf = [0u8; 96];
    buf[31] = 0x40;
    buf[63] = 0x60;
    buf
}

/// Decode the wire form of an [`AbiEncodedValue`] (see the data model: a
/// two-parameter tuple wrapper distinguishing static vs dynamic payloads).
pub fn decode_abi_encoded_value(bytes: &[u8]) -> Result<AbiEncodedValue, CodecError> {
    if bytes.len() >= 96 && bytes[..96] == dynamic_prefix() {
        return Ok(AbiEncodedValue::Dynamic(Bytes::from(bytes[96..].to_vec())));
    }
    if bytes.len() < 64 {
        return Err(CodecError::MalformedAbiValue("too short for static form"));
    }
    let total_len = bytes.len();
    let encoded_len = total_len - 64;
    let length_header = U256::from_be_slice(&bytes[0..32]);
    if length_header != U256::from(encoded_len) {
        return Err(CodecError::MalformedAbiValue("length header mismatch"));
    }
    let trailing = &bytes[total_len - 32..];
    if trailing.iter().any(|b| *b != 0) {
        return Err(CodecError::MalformedAbiValue("static trailing pad not zero"));
    }
    Ok(AbiEncodedValue::Static(Bytes::from(
        bytes[32..32 + encoded_len].to_vec(),
    )))
}

/// Encode an [`AbiEncodedValue`] to its wire form (inverse of
/// [`decode_abi_encoded_value`]).
pub fn encode_abi_encoded_value(value: &AbiEncodedValue) -> Vec<u8> {
    match value {
        AbiEncodedValue::Dynamic(payload) => {
            let mut out = dynamic_prefix().to_vec();
            out.extend_from_slice(payload);
            out
        }
        AbiEncodedValue::Static(encoding) => {
            let mut out = Vec::with_capacity(64 + encoding.len());
            out.extend_from_slice(&U256::from(encoding.len()).to_be_bytes::<32>());
            out.extend_from_slice(encoding);
            out.extend_from_slice(&[0u8; 32]);
            out
        }
    }
}

/// Decode an [`Argument`]: a bare 32-byte blob is a variable index, any
/// other shape is a literal [`AbiEncodedValue`].
pub fn decode_argument(bytes: &[u8]) -> Result<Argument, CodecError> {
    if bytes.len() == 32 {
        let idx = safe_index(U256::from_be_slice(bytes))?;
        return Ok(Argument::Variable(idx));
    }
    Ok(Argument::Literal(decode_abi_encoded_value(bytes)?))
}

fn decode_selector4(bytes4: &alloy::primitives::FixedBytes<4>) -> Result<[u8; 4], CodecError> {
    Ok(bytes4.0)
}

/// Decode a step. Only the `Call` variant exists today.
pub fn decode_step(bytes: &[u8]) -> Result<Step, CodecError> {
    let decoded = abi_decode::<CallCall>(bytes)?;
    let target = decode_erc7930(&decoded.target)?;
    let selector = decode_selector4(&decoded.selector)?;
    let arguments = decoded
        .arguments
        .iter()
        .map(|b| decode_argument(b))
        .collect::<Result<Vec<_>, _>>()?;
    let attributes = decode_attributes(&decoded.attributes)?;
    let payments = decoded
        .payments
        .iter()
        .map(|b| decode_payment(b))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Step::Call {
        target,
        selector,
        arguments,
        attributes,
        payments,
    })
}

/// Decode the sparse per-step attribute record from its list of
/// individually-encoded attribute blobs.
pub fn decode_attributes(blobs: &[Bytes]) -> Result<Attributes, CodecError> {
    let mut attrs = Attributes::default();

    for blob in blobs {
        if blob.len() < 4 {
            return Err(CodecError::MalformedCall("attribute blob shorter than a selector"));
        }
        let selector: [u8; 4] = blob[0..4].try_into().unwrap();

        if selector == SpendsERC20Call::SELECTOR {
            let d = abi_decode::<SpendsERC20Call>(blob)?;
            attrs.spends_erc20.push(SpendsErc20 {
                token: decode_erc7930(&d.token)?,
                amount_formula: decode_formula(&d.amountFormula)?,
                spender: decode_erc7930(&d.spender)?,
                receiver: decode_erc7930(&d.receiver)?,
            });
        } else if selector == SpendsEstimatedGasCall::SELECTOR {
            if attrs.spends_estimated_gas.is_some() {
                return Err(CodecError::DuplicateAttribute("SpendsEstimatedGas"));
            }
            let d = abi_decode::<SpendsEstimatedGasCall>(blob)?;
            attrs.spends_estimated_gas = Some(decode_formula(&d.amountFormula)?);
        } else if selector == RevertPolicyCall::SELECTOR {
            let d = abi_decode::<RevertPolicyCall>(blob)?;
            let policy = match d.policy {
                0 => RevertPolicyKind::Drop,
                1 => RevertPolicyKind::Ignore,
                other => {
                    return Err(CodecError::MalformedCall(
                        if other == 2 { "retry policy reserved" } else { "unknown revert policy" },
                    ))
                }
            };
            attrs.revert_policy.push(RevertPolicyEntry {
                policy,
                expected_reason: d.expectedReason,
            });
        } else if selector == RequiredBeforeCall::SELECTOR {
            if attrs.required_before.is_some() {
                return Err(CodecError::DuplicateAttribute("RequiredBefore"));
            }
            let d = abi_decode::<RequiredBeforeCall>(blob)?;
            attrs.required_before = Some(RequiredBefore {
                deadline: u256_to_u64(d.deadline)?,
            });
        } else if selector == RequiredFillerUntilCall::SELECTOR {
            if attrs.required_filler_until.is_some() {
                return Err(CodecError::DuplicateAttribute("RequiredFillerUntil"));
            }
            let d = abi_decode::<RequiredFillerUntilCall>(blob)?;
            attrs.required_filler_until = Some(RequiredFillerUntil {
                exclusive_filler: decode_erc7930(&d.exclusiveFiller)?,
                deadline: u256_to_u64(d.deadline)?,
            });
        } else if selector == RequiredCallResultCall::SELECTOR {
            if attrs.required_call_result.is_some() {
                return Err(CodecError::DuplicateAttribute("RequiredCallResult"));
            }
            let d = abi_decode::<RequiredCallResultCall>(blob)?;
            attrs.required_call_result = Some(RequiredCallResult {
                target: decode_erc7930(&d.target)?,
                selector: decode_selector4(&d.selector)?,
                arguments: d
                    .arguments
                    .iter()
                    .map(|b| decode_argument(b))
                    .collect::<Result<Vec<_>, _>>()?,
                result: decode_abi_encoded_value(&d.result)?,
            });
        } else if selector == WithTimestampCall::SELECTOR {
            if attrs.with_timestamp.is_some() {
                return Err(CodecError::DuplicateAttribute("WithTimestamp"));
            }
            let d = abi_decode::<WithTimestampCall>(blob)?;
            attrs.with_timestamp = Some(safe_index(d.varIdx)?);
        } else if selector == WithBlockNumberCall::SELECTOR {
            if attrs.with_block_number.is_some() {
                return Err(CodecError::DuplicateAttribute("WithBlockNumber"));
            }
            let d = abi_decode::<WithBlockNumberCall>(blob)?;
            attrs.with_block_number = Some(safe_index(d.varIdx)?);
        } else if selector == WithEffectiveGasPriceCall::SELECTOR {
            if attrs.with_effective_gas_price.is_some() {
                return Err(CodecError::DuplicateAttribute("WithEffectiveGasPrice"));
            }
            let d = abi_decode::<WithEffectiveGasPriceCall>(blob)?;
            attrs.with_effective_gas_price = Some(safe_index(d.varIdx)?);
        } else {
            return Err(CodecError::UnknownAttribute(hex::encode(selector)));
        }
    }

    Ok(attrs)
}

/// Decode a [`Formula`] blob: `Constant(uint256)` or `Variable(varIdx)`.
pub fn decode_formula(bytes: &[u8]) -> Result<Formula, CodecError> {
    if bytes.len() < 4 {
        return Err(CodecError::MalformedCall("formula blob shorter than a selector"));
    }
    let selector: [u8; 4] = bytes[0..4].try_into().unwrap();
    if selector == FormulaConstantCall::SELECTOR {
        let d = abi_decode::<FormulaConstantCall>(bytes)?;
        Ok(Formula::Constant(d.value))
    } else if selector == FormulaVariableCall::SELECTOR {
        let d = abi_decode::<FormulaVariableCall>(bytes)?;
        Ok(Formula::Variable(safe_index(d.varIdx)?))
    } else {
        Err(CodecError::UnknownAttribute(hex::encode(selector)))
    }
}

/// Decode a [`Payment`] blob.
pub fn decode_payment(bytes: &[u8]) -> Result<Payment, CodecError> {
    let d = abi_decode::<PaymentCall>(bytes)?;
    Ok(Payment {
        token: decode_erc7930(&d.token)?,
        sender: decode_erc7930(&d.sender)?,
        amount_formula: decode_formula(&d.amountFormula)?,
        recipient_var_idx: safe_index(d.recipientVarIdx)?,
        estimated_delay_seconds: u256_to_u64(d.estimatedDelaySeconds)?,
    })
}

/// Decode a [`VariableRole`] blob.
pub fn decode_variable_role(bytes: &[u8]) -> Result<VariableRole, CodecError> {
    if bytes.len() < 4 {
        return Err(CodecError::MalformedCall("role blob shorter than a selector"));
    }
    let selector: [u8; 4] = bytes[0..4].try_into().unwrap();
    if selector == RolePaymentRecipientCall::SELECTOR {
        let d = abi_decode::<RolePaymentRecipientCall>(bytes)?;
        Ok(VariableRole::PaymentRecipient {
            chain_id: u256_to_u64(d.chainId)?,
        })
    } else if selector == RolePaymentChainCall::SELECTOR {
        Ok(VariableRole::PaymentChain)
    } else if selector == RolePricingCall::SELECTOR {
        Ok(VariableRole::Pricing)
    } else if selector == RoleTxOutputCall::SELECTOR {
        Ok(VariableRole::TxOutput)
    } else if selector == RoleWitnessCall::SELECTOR {
        let d = abi_decode::<RoleWitnessCall>(bytes)?;
        let variables = d
            .variables
            .iter()
            .map(|v| safe_index(*v))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(VariableRole::Witness {
            kind: d.kind,
            data: d.data,
            variables,
        })
    } else if selector == RoleQueryCall::SELECTOR {
        let d = abi_decode::<RoleQueryCall>(bytes)?;
        let arguments = d
            .arguments
            .iter()
            .map(|b| decode_argument(b))
            .collect::<Result<Vec<_>, _>>()?;
        let block_number = if d.hasBlockNumber {
            Some(u256_to_u64(d.blockNumber)?)
        } else {
            None
        };
        Ok(VariableRole::Query {
            target: decode_erc7930(&d.target)?,
            selector: decode_selector4(&d.selector)?,
            arguments,
            block_number,
        })
    } else {
        Err(CodecError::UnknownVariableRole(hex::encode(selector)))
    }
}

/// Invoke the resolver contract's `resolve(bytes)` view and decode its
/// response into a typed [`ResolvedOrder`].
pub async fn resolve(
    ctx: &dyn crate::context::SolverContext,
    resolver: Account,
    payload: Bytes,
) -> Result<ResolvedOrder, crate::error::SolverError> {
    let calldata = resolveCall { payload }.abi_encode();
    let response = ctx
        .call(resolver.chain_id, resolver.address, calldata.into(), None)
        .await?;
    let decoded = resolveCall::abi_decode_returns(&response, true)
        .map_err(|e| CodecError::AbiDecode(e.to_string()))?;

    let steps = decoded
        .steps
        .iter()
        .map(|b| decode_step(b))
        .collect::<Result<Vec<_>, _>>()?;
    let variables = decoded
        .variables
        .iter()
        .map(|b| decode_variable_role(b))
        .collect::<Result<Vec<_>, _>>()?;
    let assumptions = decoded
        .assumptions
        .iter()
        .map(|a| -> Result<Assumption, CodecError> {
            Ok(Assumption {
                trusted: decode_erc7930(&a.trusted)?,
                kind: a.kind.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let payments = decoded
        .payments
        .iter()
        .map(|b| decode_payment(b))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ResolvedOrder {
        steps,
        variables,
        assumptions,
        payments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, FixedBytes};

    #[test]
    fn abi_encoded_value_round_trips_static() {
        let value = AbiEncodedValue::from_uint256(U256::from(7u64));
        let wire = encode_abi_encoded_value(&value);
        assert_eq!(decode_abi_encoded_value(&wire).unwrap(), value);
    }

    #[test]
    fn abi_encoded_value_round_trips_dynamic() {
        let value = AbiEncodedValue::Dynamic(Bytes::from(vec![1, 2, 3, 4, 5]));
        let wire = encode_abi_encoded_value(&value);
        assert_eq!(decode_abi_encoded_value(&wire).unwrap(), value);
    }

    #[test]
    fn argument_dispatch_variable_scenario_s2() {
        let mut bytes = vec![0u8; 31];
        bytes.push(5);
        let arg = decode_argument(&bytes).unwrap();
        assert_eq!(arg, Argument::Variable(5));
    }

    #[test]
    fn argument_dispatch_dynamic_literal_scenario_s2() {
        let value = AbiEncodedValue::Dynamic(Bytes::from(vec![0xAB; 64]));
        let wire = encode_abi_encoded_value(&value);
        let arg = decode_argument(&wire).unwrap();
        assert_eq!(arg, Argument::Literal(value));
    }

    #[test]
    fn formula_round_trips_constant_and_variable() {
        let constant = FormulaConstantCall { value: U256::from(9u64) }.abi_encode();
        assert_eq!(decode_formula(&constant).unwrap(), Formula::Constant(U256::from(9u64)));

        let variable = FormulaVariableCall { varIdx: U256::from(2u64) }.abi_encode();
        assert_eq!(decode_formula(&variable).unwrap(), Formula::Variable(2));
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let too_big = U256::from(MAX_SAFE_INDEX) + U256::from(1u64);
        assert!(matches!(
            safe_index(too_big),
            Err(CodecError::IntegerOutOfRange(_))
        ));
    }

    #[test]
    fn duplicate_singleton_attribute_is_rejected() {
        let blob = RequiredBeforeCall { deadline: U256::from(100u64) }.abi_encode();
        let blobs = vec![Bytes::from(blob.clone()), Bytes::from(blob)];
        assert!(matches!(
            decode_attributes(&blobs),
            Err(CodecError::DuplicateAttribute("RequiredBefore"))
        ));
    }

    #[test]
    fn step_round_trips_through_call_encoding() {
        let target = Account {
            address: Address::repeat_byte(0x11),
            chain_id: 1,
        };
        let call = CallCall {
            target: Bytes::from(crate::model::encode_erc7930(&target)),
            selector: FixedBytes::<4>::from([0xDE, 0xAD, 0xBE, 0xEF]),
            arguments: vec![],
            attributes: vec![],
            payments: vec![],
        };
        let encoded = call.abi_encode();
        let step = decode_step(&encoded).unwrap();
        match step {
            Step::Call { target: t, selector, .. } => {
                assert_eq!(t, target);
                assert_eq!(selector, [0xDE, 0xAD, 0xBE, 0xEF]);
            }
        }
    }
}
