//! Phone-to-account lookup capability.
//!
//! Callers are identified by nothing but their phone number, so resolving a
//! number to a mailbox account is the gate for the whole call. The mapping
//! source is injected behind [`AccountLookup`] so deployments can back it with
//! whatever store they have; [`StaticLookup`] covers the simple
//! file-configured case and doubles as the test fake.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Call-scoped credentials and identity for one mailbox account.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AccountContext {
    pub account_id: String,
    pub email: String,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Resolves a caller's phone number to an account, if one is mapped.
#[async_trait]
pub trait AccountLookup: Send + Sync {
    /// Returns the account for `phone_number`, or `None` when no mapping
    /// exists. An `Err` means the lookup itself failed, not that the number
    /// is unknown.
    async fn resolve(&self, phone_number: &str) -> Result<Option<AccountContext>>;
}

/// An [`AccountLookup`] backed by an in-memory table loaded at startup.
#[derive(Debug, Default)]
pub struct StaticLookup {
    accounts: HashMap<String, AccountContext>,
}

impl StaticLookup {
    pub fn new(accounts: HashMap<String, AccountContext>) -> Self {
        Self { accounts }
    }

    /// Parses a JSON object of `{ "<phone number>": { ...account } }`.
    pub fn from_json(json: &str) -> Result<Self> {
        let accounts: HashMap<String, AccountContext> =
            serde_json::from_str(json).context("Invalid phone account mapping JSON")?;
        Ok(Self { accounts })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read account mapping from {}", path.display()))?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl AccountLookup for StaticLookup {
    async fn resolve(&self, phone_number: &str) -> Result<Option<AccountContext>> {
        Ok(self.accounts.get(phone_number).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAPPING: &str = r#"{
        "+18185550199": {
            "account_id": "0f2a3874-8106-441c-86d7-ecad65d063f0",
            "email": "pat@example.com",
            "access_token": "ya29.test-token"
        }
    }"#;

    #[tokio::test]
    async fn resolves_mapped_number() {
        let lookup = StaticLookup::from_json(MAPPING).unwrap();
        let account = lookup.resolve("+18185550199").await.unwrap().unwrap();
        assert_eq!(account.email, "pat@example.com");
        assert_eq!(account.refresh_token, None);
    }

    #[tokio::test]
    async fn unmapped_number_is_none_not_error() {
        let lookup = StaticLookup::from_json(MAPPING).unwrap();
        assert!(lookup.resolve("+15550000000").await.unwrap().is_none());
    }

    #[test]
    fn rejects_malformed_mapping() {
        assert!(StaticLookup::from_json(r#"{"+1555": {"email": 3}}"#).is_err());
    }
}
