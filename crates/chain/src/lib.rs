//! Concrete chain interaction layer wiring [`solver_core::SolverContext`] to
//! real Alloy providers and a signing wallet.
//!
//! - Provider management per chain (HTTP RPC, one provider per chain id)
//! - Gas strategy abstraction (Legacy vs EIP-1559), pluggable per chain
//! - Transaction signing and sending, with a locally cached nonce
//! - [`LiveSolverContext`]: the production `SolverContext` implementation

pub mod gas;
mod live;
mod provider;
mod signer;

pub use gas::{create_gas_strategy, Eip1559GasStrategy, GasParams, GasStrategy, LegacyGasStrategy};
pub use live::LiveSolverContext;
pub use provider::ChainProvider;
pub use signer::{NonceManager, TransactionSender};
