//! Witness-resolver registry and an HTTP-backed resolver implementation.
//!
//! A `Witness` variable (spec §3, §6) names a `kind`; the filler looks up a
//! resolver for that kind and calls `resolve(data, values)`. `solver-core`
//! only defines the `WitnessResolver` trait — every concrete kind (a
//! signature service, an attestation feed, a merkle-proof server) is a
//! plugin registered here, never compiled into the core.

use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::Bytes;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use solver_core::{AbiEncodedValue, WitnessResolver};

/// Builds the `kind -> resolver` map [`solver_chain::LiveSolverContext`]
/// takes at construction.
#[derive(Default)]
pub struct WitnessRegistry {
    resolvers: HashMap<String, Arc<dyn WitnessResolver>>,
}

impl WitnessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resolver(mut self, kind: impl Into<String>, resolver: Arc<dyn WitnessResolver>) -> Self {
        self.resolvers.insert(kind.into(), resolver);
        self
    }

    pub fn build(self) -> HashMap<String, Arc<dyn WitnessResolver>> {
        self.resolvers
    }
}

#[derive(Serialize)]
struct ResolveRequest<'a> {
    data: &'a str,
    values: Vec<&'a str>,
}

#[derive(Deserialize)]
struct ResolveResponse {
    /// Hex-encoded resolved value.
    value: String,
    /// Whether `value` is ABI-dynamic encoding (length-prefixed) or static
    /// (fixed 32-byte word).
    dynamic: bool,
}

/// Resolves a witness by posting the `data` blob and the values of its
/// declared dependency variables to an external attestation/signature
/// service, and decoding its hex response back into an [`AbiEncodedValue`].
pub struct HttpWitnessResolver {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpWitnessResolver {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl WitnessResolver for HttpWitnessResolver {
    async fn resolve(
        &self,
        data: &Bytes,
        values: &[AbiEncodedValue],
    ) -> anyhow::Result<AbiEncodedValue> {
        let data_hex = format!("0x{}", hex::encode(data));
        let value_hexes: Vec<String> = values
            .iter()
            .map(|v| format!("0x{}", hex::encode(v.encoding())))
            .collect();
        let request = ResolveRequest {
            data: &data_hex,
            values: value_hexes.iter().map(String::as_str).collect(),
        };

        let response: ResolveResponse = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?
            .json()
            .await?;

        let raw = response.value.trim_start_matches("0x");
        let bytes = Bytes::from(hex::decode(raw)?);
        Ok(if response.dynamic {
            AbiEncodedValue::Dynamic(bytes)
        } else {
            AbiEncodedValue::Static(bytes)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubResolver;

    #[async_trait]
    impl WitnessResolver for StubResolver {
        async fn resolve(
            &self,
            _data: &Bytes,
            _values: &[AbiEncodedValue],
        ) -> anyhow::Result<AbiEncodedValue> {
            Ok(AbiEncodedValue::from_uint256(alloy::primitives::U256::from(7u64)))
        }
    }

    #[test]
    fn registry_builds_expected_kinds() {
        let registry = WitnessRegistry::new()
            .with_resolver("signature", Arc::new(StubResolver))
            .with_resolver("merkle", Arc::new(StubResolver))
            .build();

        assert_eq!(registry.len(), 2);
        assert!(registry.contains_key("signature"));
        assert!(registry.contains_key("merkle"));
    }

    #[tokio::test]
    async fn resolve_response_decodes_static_hex() {
        let raw = r#"{"value": "0x0000000000000000000000000000000000000000000000000000000000000007", "dynamic": false}"#;
        let parsed: ResolveResponse = serde_json::from_str(raw).unwrap();
        let bytes = Bytes::from(hex::decode(parsed.value.trim_start_matches("0x")).unwrap());
        let value = AbiEncodedValue::Static(bytes);
        assert_eq!(value.as_uint256().unwrap(), alloy::primitives::U256::from(7u64));
    }
}
