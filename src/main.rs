//! Cross-chain intent solver
//!
//! Resolves a payload via an on-chain resolver contract into a typed
//! execution plan, quotes it for profitability, and fills it on the target
//! chains. The outer order-ingestion loop (watching a mempool or intent feed
//! for new payloads) is out of scope; this binary is a thin, single-shot
//! demonstration entrypoint — `process()` runs once per CLI-supplied payload.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use solver_api::{HttpPriceOracle, StaticWhitelist, WitnessRegistry};
use solver_chain::LiveSolverContext;
use solver_core::config::{init_config, DeploymentLoader, RuntimeConfig};

/// Environment variable names read directly by the binary.
mod env {
    pub const PRICE_ORACLE_URL: &str = "SOLVER_PRICE_ORACLE_URL";
    pub const PRICE_CACHE_TTL_SECS: &str = "SOLVER_PRICE_CACHE_TTL_SECS";
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,solver_core=debug,solver_chain=debug")),
        )
        .init();

    let runtime_config = RuntimeConfig::from_env();
    runtime_config.log_config();
    init_config(runtime_config);

    info!("starting cross-chain intent solver");

    let payload = read_payload_arg()?;

    let deployment = DeploymentLoader::load_from_env().context("loading deployment manifest")?;
    info!(deployment = %deployment.name, resolver = %deployment.resolver.address, "deployment loaded");

    let price_oracle_url = std::env::var(env::PRICE_ORACLE_URL)
        .unwrap_or_else(|_| "https://price.example.invalid".to_string());
    let cache_ttl_secs: u64 = std::env::var(env::PRICE_CACHE_TTL_SECS)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(30);
    let price_oracle = Arc::new(HttpPriceOracle::new(price_oracle_url, cache_ttl_secs));

    let whitelist = Arc::new(StaticWhitelist::new(deployment.whitelist.clone()));

    // No witness kinds are registered by default; deployments that need one
    // configure an `HttpWitnessResolver` per kind before calling `connect`.
    let witness_resolvers: HashMap<_, _> = WitnessRegistry::new().build();

    let ctx = LiveSolverContext::connect(deployment.clone(), price_oracle, whitelist, witness_resolvers)
        .await
        .context("wiring live solver context")?;

    let resolver = deployment.resolver;
    let plan = solver_core::resolve(&ctx, resolver, payload.into())
        .await
        .context("resolving payload into execution plan")?;
    info!(
        steps = plan.steps.len(),
        variables = plan.variables.len(),
        "plan resolved"
    );

    let outcome = solver_core::process(&ctx, &plan)
        .await
        .context("processing plan")?;

    match &outcome.fill {
        solver_core::FillOutcome::Completed { steps } => {
            info!(
                pnl_usd = outcome.pnl_usd,
                steps = steps.len(),
                "plan filled successfully"
            );
        }
        solver_core::FillOutcome::Dropped { at_step, steps } => {
            info!(
                pnl_usd = outcome.pnl_usd,
                at_step,
                steps_run = steps.len(),
                "plan dropped by revert policy"
            );
        }
    }

    Ok(())
}

/// Read the resolver payload from the first CLI argument, as a `0x`-prefixed
/// hex string.
fn read_payload_arg() -> Result<Vec<u8>> {
    let hex_arg = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: solver <0x-prefixed payload hex>"))?;
    let trimmed = hex_arg.trim_start_matches("0x");
    hex::decode(trimmed).context("payload is not valid hex")
}

fn print_banner() {
    println!(
        r#"
    ┌─┐┌─┐┬  ┬  ┬┌─┐┬─┐
    └─┐│ ││  └┐┌┘├┤ ├┬┘
    └─┘└─┘┴─┘ └┘ └─┘┴└─
    cross-chain intent solver
    "#
    );
}
