//! Plan data model: the typed shape a resolver response decodes into.
//!
//! Every type here is a tagged variant or a plain struct of tagged
//! variants; `codec` is the only place that ever inspects raw bytes to
//! produce them. `VariableEnv`, `call_builder`, `quoter`, and `filler`
//! consume these types exclusively.

use alloy::primitives::{Address, Bytes, U256};

use crate::error::CodecError;

/// A chain-qualified account: `(address, chainId)`, the decoded form of an
/// ERC-7930 binary address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Account {
    pub address: Address,
    pub chain_id: u64,
}

const ERC7930_VERSION: u16 = 0x0001;
const ERC7930_CHAIN_TYPE: u16 = 0x0000;

/// Decode an ERC-7930 binary chain-qualified address.
///
/// Wire form: `version(2) || chainType(2) || len(1) || chainRef || len(1) || address`.
/// Only `version == 0x0001` and `chainType == 0x0000` are accepted; `chainRef`
/// is a big-endian unsigned integer and `address` must be exactly 20 bytes.
pub fn decode_erc7930(bytes: &[u8]) -> Result<Account, CodecError> {
    if bytes.len() < 5 {
        return Err(CodecError::TruncatedAddress);
    }
    let version = u16::from_be_bytes([bytes[0], bytes[1]]);
    if version != ERC7930_VERSION {
        return Err(CodecError::UnsupportedAddressVersion(version));
    }
    let chain_type = u16::from_be_bytes([bytes[2], bytes[3]]);
    if chain_type != ERC7930_CHAIN_TYPE {
        return Err(CodecError::UnsupportedChainType(chain_type));
    }

    let mut cursor = 4usize;
    let chain_ref_len = *bytes.get(cursor).ok_or(CodecError::TruncatedAddress)? as usize;
    cursor += 1;
    let chain_ref_bytes = bytes
        .get(cursor..cursor + chain_ref_len)
        .ok_or(CodecError::TruncatedAddress)?;
    cursor += chain_ref_len;
    let chain_id = be_bytes_to_u64(chain_ref_bytes);

    let addr_len = *bytes.get(cursor).ok_or(CodecError::TruncatedAddress)? as usize;
    cursor += 1;
    let addr_bytes = bytes
        .get(cursor..cursor + addr_len)
        .ok_or(CodecError::TruncatedAddress)?;
    if addr_bytes.len() != 20 {
        return Err(CodecError::BadAddressLength(addr_bytes.len()));
    }

    Ok(Account {
        address: Address::from_slice(addr_bytes),
        chain_id,
    })
}

/// Encode an [`Account`] back into ERC-7930 binary form.
pub fn encode_erc7930(account: &Account) -> Vec<u8> {
    let chain_ref = u64_to_minimal_be_bytes(account.chain_id);
    let mut out = Vec::with_capacity(4 + 1 + chain_ref.len() + 1 + 20);
    out.extend_from_slice(&ERC7930_VERSION.to_be_bytes());
    out.extend_from_slice(&ERC7930_CHAIN_TYPE.to_be_bytes());
    out.push(chain_ref.len() as u8);
    out.extend_from_slice(&chain_ref);
    out.push(20);
    out.extend_from_slice(account.address.as_slice());
    out
}

fn be_bytes_to_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    let start = 8usize.saturating_sub(bytes.len());
    let take = &bytes[bytes.len().saturating_sub(8)..];
    buf[start..].copy_from_slice(take);
    u64::from_be_bytes(buf)
}

fn u64_to_minimal_be_bytes(value: u64) -> Vec<u8> {
    if value == 0 {
        return vec![0];
    }
    let full = value.to_be_bytes();
    let first_nonzero = full.iter().position(|b| *b != 0).unwrap();
    full[first_nonzero..].to_vec()
}

/// A discriminated wrapper over a byte string distinguishing static vs
/// dynamic ABI encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiEncodedValue {
    Static(Bytes),
    Dynamic(Bytes),
}

impl AbiEncodedValue {
    pub fn encoding(&self) -> &Bytes {
        match self {
            AbiEncodedValue::Static(b) => b,
            AbiEncodedValue::Dynamic(b) => b,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, AbiEncodedValue::Dynamic(_))
    }

    /// Decode a Static value as a `uint256`, as required when evaluating a
    /// `Variable` formula.
    pub fn as_uint256(&self) -> Result<U256, CodecError> {
        match self {
            AbiEncodedValue::Static(b) if b.len() == 32 => Ok(U256::from_be_slice(b)),
            AbiEncodedValue::Static(_) => Err(CodecError::MalformedAbiValue(
                "static value is not 32 bytes",
            )),
            AbiEncodedValue::Dynamic(_) => Err(CodecError::MalformedAbiValue(
                "dynamic value cannot decode as uint256",
            )),
        }
    }

    /// Wrap a plain `uint256` as a Static ABI value.
    pub fn from_uint256(value: U256) -> Self {
        AbiEncodedValue::Static(Bytes::from(value.to_be_bytes_vec()))
    }

    /// Wrap a plain address as a Static ABI value, left-padded to 32 bytes.
    pub fn from_address(address: Address) -> Self {
        let mut buf = [0u8; 32];
        buf[12..].copy_from_slice(address.as_slice());
        AbiEncodedValue::Static(Bytes::from(buf.to_vec()))
    }
}

/// An argument to a call: either a reference to a variable, or a literal
/// value known at codec time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    Variable(usize),
    Literal(AbiEncodedValue),
}

/// A trivial expression evaluated to `uint256`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formula {
    Constant(U256),
    Variable(usize),
}

/// Drop/ignore (retry reserved) disposition for a step's revert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevertPolicyKind {
    Drop,
    Ignore,
}

/// One entry in a step's revert policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevertPolicyEntry {
    pub policy: RevertPolicyKind,
    pub expected_reason: Bytes,
}

/// A planned ERC-20 outflow from a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendsErc20 {
    pub token: Account,
    pub amount_formula: Formula,
    pub spender: Account,
    pub receiver: Account,
}

/// `RequiredBefore` attribute: the step (and therefore the plan) must
/// complete before this deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredBefore {
    pub deadline: u64,
}

/// `RequiredFillerUntil` attribute: only `exclusive_filler` may fill this
/// step until `deadline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredFillerUntil {
    pub exclusive_filler: Account,
    pub deadline: u64,
}

/// `RequiredCallResult` attribute: a side-condition the plan depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredCallResult {
    pub target: Account,
    pub selector: [u8; 4],
    pub arguments: Vec<Argument>,
    pub result: AbiEncodedValue,
}

/// Sparse per-step attribute record. At most one of each singleton field is
/// ever populated; duplicates are rejected by the codec before this type is
/// constructed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    pub spends_erc20: Vec<SpendsErc20>,
    pub spends_estimated_gas: Option<Formula>,
    pub revert_policy: Vec<RevertPolicyEntry>,
    pub required_before: Option<RequiredBefore>,
    pub required_filler_until: Option<RequiredFillerUntil>,
    pub required_call_result: Option<RequiredCallResult>,
    pub with_timestamp: Option<usize>,
    pub with_block_number: Option<usize>,
    pub with_effective_gas_price: Option<usize>,
}

/// A single chain call, the only variant of [`Step`] today.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Call {
        target: Account,
        selector: [u8; 4],
        arguments: Vec<Argument>,
        attributes: Attributes,
        payments: Vec<Payment>,
    },
}

impl Step {
    pub fn attributes(&self) -> &Attributes {
        match self {
            Step::Call { attributes, .. } => attributes,
        }
    }

    pub fn target(&self) -> Account {
        match self {
            Step::Call { target, .. } => *target,
        }
    }
}

/// An ERC-20 payment, either plan-level or attached to a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    pub token: Account,
    pub sender: Account,
    pub amount_formula: Formula,
    pub recipient_var_idx: usize,
    pub estimated_delay_seconds: u64,
}

/// How a variable's value is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableRole {
    PaymentRecipient { chain_id: u64 },
    PaymentChain,
    Pricing,
    TxOutput,
    Witness {
        kind: String,
        data: Bytes,
        variables: Vec<usize>,
    },
    Query {
        target: Account,
        selector: [u8; 4],
        arguments: Vec<Argument>,
        block_number: Option<u64>,
    },
}

impl VariableRole {
    /// Variable indices this role's computation directly depends on. Only
    /// `Query` has intrinsic dependencies; everything else is either
    /// context-derived or populated externally via `set`.
    pub fn dependencies(&self) -> Vec<usize> {
        match self {
            VariableRole::Query { arguments, .. } => arguments
                .iter()
                .filter_map(|a| match a {
                    Argument::Variable(idx) => Some(*idx),
                    Argument::Literal(_) => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// An account whose behavior the plan depends on; must be whitelisted for
/// `kind` before the plan may run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assumption {
    pub trusted: Account,
    pub kind: String,
}

/// The typed execution graph produced by decoding a resolver response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOrder {
    pub steps: Vec<Step>,
    pub variables: Vec<VariableRole>,
    pub assumptions: Vec<Assumption>,
    pub payments: Vec<Payment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn erc7930_round_trip() {
        let account = Account {
            address: Address::repeat_byte(0xAA),
            chain_id: 42,
        };
        let encoded = encode_erc7930(&account);
        let decoded = decode_erc7930(&encoded).unwrap();
        assert_eq!(decoded, account);
    }

    #[test]
    fn erc7930_decode_scenario_s1() {
        let mut bytes = vec![0x00, 0x01, 0x00, 0x00, 0x01, 0x2a, 0x14];
        bytes.extend_from_slice(&[0xAA; 20]);
        let account = decode_erc7930(&bytes).unwrap();
        assert_eq!(account.chain_id, 42);
        assert_eq!(account.address, Address::repeat_byte(0xAA));
    }

    #[test]
    fn erc7930_rejects_wrong_version() {
        let mut bytes = vec![0x00, 0x02, 0x00, 0x00, 0x01, 0x2a, 0x14];
        bytes.extend_from_slice(&[0xAA; 20]);
        assert!(matches!(
            decode_erc7930(&bytes),
            Err(CodecError::UnsupportedAddressVersion(2))
        ));
    }

    #[test]
    fn abi_value_uint256_round_trip() {
        let value = U256::from(12345u64);
        let wrapped = AbiEncodedValue::from_uint256(value);
        assert_eq!(wrapped.as_uint256().unwrap(), value);
    }

    #[test]
    fn query_role_dependencies_follow_arguments() {
        let role = VariableRole::Query {
            target: Account {
                address: Address::ZERO,
                chain_id: 1,
            },
            selector: [0u8; 4],
            arguments: vec![Argument::Variable(3), Argument::Variable(7)],
            block_number: None,
        };
        assert_eq!(role.dependencies(), vec![3, 7]);
    }
}
