//! HTTP-backed [`PriceOracle`]: fetches USD prices from an off-chain price
//! API and caches them briefly, the same cache-then-fetch shape the teacher
//! uses for its oracle price cache.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::U256;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use tracing::debug;

use solver_core::{Account, PriceOracle};

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[derive(Clone, Copy)]
struct CachedPrice {
    value: U256,
    cached_at: u64,
}

/// Queries `{base_url}/price/token/{chainId}/{address}` and
/// `{base_url}/price/gas/{chainId}` for USD prices at an agreed fixed-point
/// scale (spec §9 open question (a): the scale is a contract between this
/// oracle and the context's caller, not something the core inspects).
pub struct HttpPriceOracle {
    client: reqwest::Client,
    base_url: String,
    cache_ttl_secs: u64,
    token_cache: DashMap<(u64, alloy::primitives::Address), CachedPrice>,
    gas_cache: DashMap<u64, CachedPrice>,
    requests_served: AtomicU64,
    cache_hits: AtomicU64,
}

#[derive(Deserialize)]
struct PriceResponse {
    /// Decimal-string USD price at the oracle's fixed-point scale.
    price: String,
}

impl HttpPriceOracle {
    pub fn new(base_url: impl Into<String>, cache_ttl_secs: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            cache_ttl_secs,
            token_cache: DashMap::new(),
            gas_cache: DashMap::new(),
            requests_served: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
        }
    }

    async fn fetch(&self, path: &str) -> anyhow::Result<U256> {
        self.requests_served.fetch_add(1, Ordering::Relaxed);
        let url = format!("{}{path}", self.base_url);
        let resp: PriceResponse = self.client.get(&url).send().await?.json().await?;
        resp.price
            .parse()
            .map_err(|e| anyhow::anyhow!("malformed price {:?} from {url}: {e}", resp.price))
    }

    pub fn cache_hit_rate(&self) -> f64 {
        let served = self.requests_served.load(Ordering::Relaxed);
        if served == 0 {
            return 0.0;
        }
        self.cache_hits.load(Ordering::Relaxed) as f64 / served as f64
    }
}

#[async_trait]
impl PriceOracle for HttpPriceOracle {
    async fn token_price_usd(&self, account: Account) -> anyhow::Result<U256> {
        let key = (account.chain_id, account.address);
        if let Some(entry) = self.token_cache.get(&key) {
            if now_secs().saturating_sub(entry.cached_at) < self.cache_ttl_secs {
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
                return Ok(entry.value);
            }
        }

        let value = self
            .fetch(&format!("/price/token/{}/{}", account.chain_id, account.address))
            .await?;
        self.token_cache.insert(
            key,
            CachedPrice {
                value,
                cached_at: now_secs(),
            },
        );
        debug!(chain_id = account.chain_id, token = %account.address, %value, "token price fetched");
        Ok(value)
    }

    async fn gas_price_usd(&self, chain_id: u64) -> anyhow::Result<U256> {
        if let Some(entry) = self.gas_cache.get(&chain_id) {
            if now_secs().saturating_sub(entry.cached_at) < self.cache_ttl_secs {
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
                return Ok(entry.value);
            }
        }

        let value = self.fetch(&format!("/price/gas/{chain_id}")).await?;
        self.gas_cache.insert(
            chain_id,
            CachedPrice {
                value,
                cached_at: now_secs(),
            },
        );
        debug!(chain_id, %value, "gas price fetched");
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_hit_rate_is_zero_with_no_requests() {
        let oracle = HttpPriceOracle::new("http://example.invalid", 30);
        assert_eq!(oracle.cache_hit_rate(), 0.0);
    }

    #[test]
    fn price_response_parses_decimal_string() {
        let json = r#"{"price": "1234567890123456789"}"#;
        let parsed: PriceResponse = serde_json::from_str(json).unwrap();
        let value: U256 = parsed.price.parse().unwrap();
        assert_eq!(value, U256::from(1234567890123456789u128));
    }
}
