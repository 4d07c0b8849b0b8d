//! Error taxonomy for the solver core, grounded on the `domain::*::Error`
//! pattern used throughout `cowprotocol-services` (e.g.
//! `crates/autopilot/src/domain/settlement/trade.rs`): one `thiserror` enum
//! per pipeline stage so callers can match on kind, plus a top-level enum
//! that wraps each stage for `process`'s single error type.

use alloy::primitives::U256;
use thiserror::Error;

/// Errors raised while decoding a resolver response into a typed plan.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unsupported ERC-7930 version {0:#06x}")]
    UnsupportedAddressVersion(u16),
    #[error("unsupported ERC-7930 chain type {0:#06x}")]
    UnsupportedChainType(u16),
    #[error("ERC-7930 address payload truncated")]
    TruncatedAddress,
    #[error("ERC-7930 address must be exactly 20 bytes, got {0}")]
    BadAddressLength(usize),
    #[error("selector must be 4 bytes, got {0}")]
    BadSelectorLength(usize),
    #[error("malformed AbiEncodedValue: {0}")]
    MalformedAbiValue(&'static str),
    #[error("duplicate singleton attribute: {0}")]
    DuplicateAttribute(&'static str),
    #[error("unknown attribute kind: {0}")]
    UnknownAttribute(String),
    #[error("unknown variable role kind: {0}")]
    UnknownVariableRole(String),
    #[error("integer {0} exceeds the safe-integer range")]
    IntegerOutOfRange(U256),
    #[error("malformed call encoding: {0}")]
    MalformedCall(&'static str),
    #[error("abi decoding error: {0}")]
    AbiDecode(String),
}

/// Errors raised during `process`'s preflight validation, before quoting.
#[derive(Debug, Error)]
pub enum PreflightError {
    #[error("variable index {0} out of bounds (len {1})")]
    VarIndexOutOfBounds(usize, usize),
    #[error("revert policy ordering invalid: drop at step {drop_idx} must not precede SpendsERC20 at step {spend_idx}")]
    InvalidRevertPolicyOrdering { drop_idx: usize, spend_idx: usize },
    #[error("deadline too close: now + MAX_FILL_TIME_SECONDS ({required}) >= earliest deadline ({earliest})")]
    DeadlineTooClose { required: u64, earliest: u64 },
    #[error("assumption not whitelisted: {kind} for account in chain {chain_id}")]
    UntrustedAssumption { kind: String, chain_id: u64 },
    #[error("no witness resolver registered for kind {0}")]
    UnsupportedWitnessKind(String),
}

/// Errors raised while evaluating flows and pricing during `quote`.
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("pricing-variable search is not supported (variable {0})")]
    PricingVariableUnsupported(usize),
    #[error("delayed payment not supported: estimatedDelaySeconds = {0}")]
    DelayedPaymentUnsupported(u64),
    #[error("formula evaluation requires a Static value")]
    FormulaValueNotStatic,
    #[error("formula value failed to decode as uint256")]
    FormulaNotUint256,
    #[error("gas simulation failed for step {0}")]
    GasSimulationFailed(usize),
    #[error("negative PnL: {0}")]
    NegativePnl(i128),
    #[error("amount {0} exceeds u128 range")]
    AmountOutOfRange(U256),
    #[error("PnL accumulator overflowed")]
    PnlOverflow,
}

/// Errors/terminal outcomes raised while running `fill`.
#[derive(Debug, Error)]
pub enum FillError {
    #[error("no witness resolver registered for kind {0}")]
    MissingWitnessResolver(String),
    #[error("witness resolution failed for kind {0}: {1}")]
    WitnessResolutionFailed(String, String),
    #[error("step {0} reverted and no revert policy matched: resolver error")]
    UnmatchedRevert(usize),
    #[error("step {0} reverted with no recoverable revert data")]
    NoRevertData(usize),
    #[error("variable {0} is not settable for its role")]
    NotSettable(usize),
    #[error("variable {0} has no value and no role produces one")]
    VariableNotSet(usize),
}

/// The union of everything that can cause `process` to fail. Transport
/// errors from the `SolverContext` clients surface through `Context` and
/// are wrapped at the boundary rather than modeled here, since they carry
/// no taxonomy the core can usefully match on.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Preflight(#[from] PreflightError),
    #[error(transparent)]
    Quote(#[from] QuoteError),
    #[error(transparent)]
    Fill(#[from] FillError),
    #[error("transport error: {0}")]
    Transport(#[from] anyhow::Error),
}
