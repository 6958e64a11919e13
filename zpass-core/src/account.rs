//! Account identity: a private key and the address and view key derived from it.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::{
    config::PRIVATE_KEY_PREFIX,
    engine::ProvingEngine,
    error::{ZPassError, ZPassResult},
};

/// Prefix of every account address.
pub const ADDRESS_PREFIX: &str = "aleo1";

/// An account private key. Never printed; `Debug` is redacted.
pub struct PrivateKey(SecretString);

impl PrivateKey {
    /// Checks the prefix convention and wraps the key.
    ///
    /// This does not ask the proving engine whether the key material is valid;
    /// that happens in [`Account::from_private_key`].
    ///
    /// # Errors
    /// Returns [`ZPassError::InvalidKeyFormat`] if the key does not start with `APrivateKey1`.
    pub fn parse(key: &str) -> ZPassResult<Self> {
        if !key.starts_with(PRIVATE_KEY_PREFIX) {
            return Err(ZPassError::InvalidKeyFormat {
                expected_prefix: PRIVATE_KEY_PREFIX,
            });
        }
        Ok(Self(SecretString::from(key.to_string())))
    }

    /// Exposes the key string. Only proving engines should call this.
    #[must_use]
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for PrivateKey {
    fn clone(&self) -> Self {
        Self(SecretString::from(self.expose_secret().to_string()))
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey([REDACTED])")
    }
}

/// A view key: decrypts records owned by the matching address. Never printed.
pub struct ViewKey(SecretString);

impl ViewKey {
    /// Wraps a view key string produced by a proving engine.
    #[must_use]
    pub fn new(view_key: impl Into<String>) -> Self {
        Self(SecretString::from(view_key.into()))
    }

    /// Exposes the view key string. Only proving engines should call this.
    #[must_use]
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for ViewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ViewKey([REDACTED])")
    }
}

/// A public account address (`aleo1…`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Parses an address string, checking its prefix.
    ///
    /// # Errors
    /// Returns [`ZPassError::InvalidInput`] if the string is not an `aleo1…` address.
    pub fn parse(address: &str) -> ZPassResult<Self> {
        let valid = address.starts_with(ADDRESS_PREFIX)
            && address.len() > ADDRESS_PREFIX.len()
            && address.chars().all(|c| c.is_ascii_alphanumeric());
        if !valid {
            return Err(ZPassError::invalid_input(
                "address",
                format!("{address} is not an {ADDRESS_PREFIX} address"),
            ));
        }
        Ok(Self(address.to_string()))
    }

    /// Returns the address string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The identity an [`Issuer`](crate::Issuer) acts as. Immutable once constructed.
#[derive(Debug)]
pub struct Account {
    private_key: PrivateKey,
    view_key: ViewKey,
    address: Address,
}

impl Account {
    /// Validates a private key string and derives its view key and address.
    ///
    /// Checks run in order: key prefix (no engine call), engine environment,
    /// then key material.
    ///
    /// # Errors
    /// - [`ZPassError::InvalidKeyFormat`] if the prefix is wrong.
    /// - [`ZPassError::UnsupportedEnvironment`] if the engine cannot run here.
    /// - [`ZPassError::InvalidKey`] if the engine rejects the key.
    pub fn from_private_key<E: ProvingEngine + ?Sized>(
        engine: &E,
        private_key: &str,
    ) -> ZPassResult<Self> {
        let private_key = PrivateKey::parse(private_key)?;
        engine
            .check_environment()
            .map_err(ZPassError::UnsupportedEnvironment)?;
        let view_key = engine
            .derive_view_key(&private_key)
            .map_err(ZPassError::InvalidKey)?;
        let address = engine
            .derive_address(&private_key)
            .map_err(ZPassError::InvalidKey)?;

        tracing::debug!(%address, "account loaded");
        Ok(Self {
            private_key,
            view_key,
            address,
        })
    }

    /// The account's public address.
    #[must_use]
    pub const fn address(&self) -> &Address {
        &self.address
    }

    /// The account's view key.
    #[must_use]
    pub const fn view_key(&self) -> &ViewKey {
        &self.view_key
    }

    pub(crate) const fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockEngine;

    const KEY: &str = "APrivateKey1zkp8CZNn3yeCseEtxuVPbDCwSyhGW6yZKUYKfgXmcpoGPWH";

    #[test]
    fn test_account_derives_address_and_view_key() {
        let engine = MockEngine::new();
        let account = Account::from_private_key(&engine, KEY).unwrap();

        assert!(account.address().as_str().starts_with(ADDRESS_PREFIX));
        assert_eq!(account.address().as_str().len(), 63);
        assert!(account.view_key().expose_secret().starts_with("AViewKey1"));

        let again = Account::from_private_key(&engine, KEY).unwrap();
        assert_eq!(account.address(), again.address());
    }

    #[test]
    fn test_account_rejects_prefix_before_engine_call() {
        let engine = MockEngine::unsupported();
        let result = Account::from_private_key(&engine, "invalid_private_key");
        assert!(matches!(result, Err(ZPassError::InvalidKeyFormat { .. })));
    }

    #[test]
    fn test_account_unsupported_environment() {
        let engine = MockEngine::unsupported();
        let result = Account::from_private_key(&engine, KEY);
        assert!(matches!(result, Err(ZPassError::UnsupportedEnvironment(_))));
    }

    #[test]
    fn test_account_invalid_key_material() {
        let engine = MockEngine::new();
        let result = Account::from_private_key(&engine, "APrivateKey1short");
        assert!(matches!(result, Err(ZPassError::InvalidKey(_))));
    }

    #[test]
    fn test_debug_never_prints_secrets() {
        let engine = MockEngine::new();
        let account = Account::from_private_key(&engine, KEY).unwrap();
        let debug = format!("{account:?}");
        assert!(!debug.contains("zkp8CZNn3"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_address_parse() {
        assert!(Address::parse(
            "aleo1rhgdu77hgyqd3xjj8ucu3jj9r2krwz6mnzyd80gncr5fxcwlh5rsvzp9px"
        )
        .is_ok());
        assert!(Address::parse("0x1234").is_err());
        assert!(Address::parse("aleo1").is_err());
    }
}
