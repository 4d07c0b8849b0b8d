//! Cross-chain intent solver core.
//!
//! This crate implements the chain-agnostic decision logic of a solver:
//! - Resolver-response decoding into a typed execution plan
//! - A lazily-computed, tick-versioned variable dependency environment
//! - Plan profitability quoting
//! - Step-by-step fill execution with revert-policy handling
//! - Orchestration (`process`): preflight validation, then quote, then fill
//!
//! Everything this crate needs from chain RPC transports, price oracles,
//! whitelist sources, and witness-kind plugins is named by the
//! [`context::SolverContext`] trait; this crate depends on no concrete
//! transport implementation.

mod call_builder;
mod codec;
pub mod config;
pub mod context;
mod env;
pub mod error;
mod filler;
mod model;
mod orchestrator;
mod quoter;

#[cfg(test)]
mod test_support;

pub use call_builder::{build_call_data, encode_call, resolve_argument, validate_selector};
pub use codec::{decode_abi_encoded_value, encode_abi_encoded_value, resolve};
pub use config::{config as runtime_config, init_config, RuntimeConfig};
pub use context::{
    PriceOracle, SimulationResult, SolverContext, TxReceipt, WhitelistSource, WitnessResolver,
};
pub use env::VariableEnv;
pub use error::{CodecError, FillError, PreflightError, QuoteError, SolverError};
pub use filler::{fill, FillOutcome, StepResult, StepTrace};
pub use model::{
    decode_erc7930, encode_erc7930, AbiEncodedValue, Account, Argument, Assumption, Attributes,
    Formula, Payment, RequiredBefore, RequiredCallResult, RequiredFillerUntil, ResolvedOrder,
    RevertPolicyEntry, RevertPolicyKind, SpendsErc20, Step, VariableRole,
};
pub use orchestrator::{process, ProcessOutcome};
pub use quoter::{quote, EvaluatedFlow, FlowKind, Quote};
