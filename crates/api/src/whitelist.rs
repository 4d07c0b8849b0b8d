//! [`WhitelistSource`] backed by the deployment manifest's static
//! `[[whitelist]]` table. A config-driven whitelist is the common case for a
//! single deployment; an HTTP-backed source can implement the same trait
//! when trust needs to be looked up from a registry service instead.

use async_trait::async_trait;

use solver_core::config::ResolvedWhitelistEntry;
use solver_core::{Account, WhitelistSource};

pub struct StaticWhitelist {
    entries: Vec<ResolvedWhitelistEntry>,
}

impl StaticWhitelist {
    pub fn new(entries: Vec<ResolvedWhitelistEntry>) -> Self {
        Self { entries }
    }
}

#[async_trait]
impl WhitelistSource for StaticWhitelist {
    async fn is_whitelisted(&self, account: Account, kind: &str) -> anyhow::Result<bool> {
        Ok(self
            .entries
            .iter()
            .any(|w| w.account == account && w.kind == kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;

    #[tokio::test]
    async fn matches_address_chain_and_kind() {
        let account = Account {
            address: Address::repeat_byte(0x11),
            chain_id: 1,
        };
        let whitelist = StaticWhitelist::new(vec![ResolvedWhitelistEntry {
            account,
            kind: "oracle".to_string(),
        }]);

        assert!(whitelist.is_whitelisted(account, "oracle").await.unwrap());
        assert!(!whitelist.is_whitelisted(account, "filler").await.unwrap());

        let other = Account {
            address: Address::repeat_byte(0x22),
            chain_id: 1,
        };
        assert!(!whitelist.is_whitelisted(other, "oracle").await.unwrap());
    }
}
