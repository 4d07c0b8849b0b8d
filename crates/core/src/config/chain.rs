//! Per-chain configuration: RPC endpoints and gas pricing.

use serde::{Deserialize, Serialize};

/// Configuration for a single chain the solver can act on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Chain details.
    pub chain: ChainDetails,
}

/// Chain details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainDetails {
    /// Chain ID.
    pub chain_id: u64,
    /// Human-readable name.
    pub name: String,
    /// RPC configuration.
    pub rpc: RpcConfig,
    /// Gas configuration.
    pub gas: GasConfig,
}

/// RPC endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Primary HTTP RPC endpoint.
    pub http: String,
    /// WebSocket RPC endpoint for subscriptions.
    #[serde(default)]
    pub ws: String,
}

/// Gas pricing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasConfig {
    /// Gas pricing model.
    pub pricing: GasPricingModel,
    /// Gas limit multiplier (e.g. 1.1 for 10% buffer) applied to simulated gas.
    #[serde(default = "default_limit_multiplier")]
    pub limit_multiplier: f64,
    /// Maximum gas price willing to pay, in gwei.
    #[serde(default = "default_max_gas_price")]
    pub max_gas_price_gwei: f64,
    /// Default gas price for legacy transactions, in gwei.
    #[serde(default = "default_gas_price")]
    pub default_gas_price_gwei: f64,
    /// Priority fee for EIP-1559 transactions, in gwei.
    #[serde(default)]
    pub priority_fee_gwei: Option<f64>,
}

fn default_limit_multiplier() -> f64 {
    1.1
}

fn default_max_gas_price() -> f64 {
    100.0
}

fn default_gas_price() -> f64 {
    1.0
}

/// Gas pricing model for a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GasPricingModel {
    /// Legacy gas pricing (gas price only).
    Legacy,
    /// EIP-1559 (base fee + priority fee).
    Eip1559,
}

/// Expand `${VAR_NAME}` patterns with environment variable values.
pub(crate) fn expand_env(s: &str) -> String {
    let mut result = s.to_string();
    let re = regex_lite::Regex::new(r"\$\{([^}]+)\}").unwrap();

    for cap in re.captures_iter(s) {
        if let (Some(full_match), Some(var_match)) = (cap.get(0), cap.get(1)) {
            let var_name = var_match.as_str();
            if let Ok(value) = std::env::var(var_name) {
                result = result.replace(full_match.as_str(), &value);
            }
        }
    }

    result
}
