//! Concrete implementations of `solver-core`'s out-of-scope external
//! collaborators: a price oracle, a whitelist source, and a witness-resolver
//! registry — the "process-level" plugins spec §1 names but leaves to the
//! outer ingestion layer. `solver-chain::LiveSolverContext` is generic over
//! these via the `PriceOracle`/`WhitelistSource`/`WitnessResolver` traits
//! `solver-core` defines; this crate supplies the HTTP- and config-backed
//! implementations `main.rs` wires in.

mod price;
mod whitelist;
mod witness;

pub use price::HttpPriceOracle;
pub use whitelist::StaticWhitelist;
pub use witness::{HttpWitnessResolver, WitnessRegistry};
