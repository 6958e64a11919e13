//! Configuration records for the SDK and its network client.
//!
//! Every field is enumerated and defaulted; [`SdkOptions::validate`] runs at
//! construction so later calls never see a half-valid configuration.

use std::{num::NonZeroUsize, time::Duration};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use strum::{Display, EnumString};

use crate::error::{ZPassError, ZPassResult};

/// Explorer endpoint used when no host is configured.
pub const DEFAULT_HOST: &str = "https://api.explorer.provable.com/v1";

/// Every private key string starts with this prefix.
pub const PRIVATE_KEY_PREFIX: &str = "APrivateKey1";

/// Ledger network the explorer endpoints are scoped to.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, Display, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum Network {
    /// Production network.
    #[default]
    Mainnet,
    /// Public test network.
    Testnet,
    /// Canary network.
    Canary,
}

/// Connection settings for [`AleoNetworkClient`](crate::network::AleoNetworkClient).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    /// Base URL of the explorer API, without the network segment.
    pub host: String,
    /// Network segment appended to `host`.
    pub network: Network,
    /// Per-request timeout.
    #[serde(rename = "timeout_secs", deserialize_with = "deserialize_secs")]
    pub timeout: Duration,
    /// Retries for idempotent reads (total attempts = `max_retries + 1`).
    pub max_retries: u32,
    /// Allows plain `http://` hosts. Only meant for local nodes and tests.
    pub allow_insecure: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            network: Network::Mainnet,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            allow_insecure: false,
        }
    }
}

impl NetworkConfig {
    /// Default configuration pointed at `host`.
    #[must_use]
    pub fn with_host(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// Checks the host URL and the timeout.
    ///
    /// # Errors
    /// Returns [`ZPassError::InvalidInput`] when the host is not an absolute
    /// `http(s)` URL, uses plain HTTP without `allow_insecure`, or the timeout is zero.
    pub fn validate(&self) -> ZPassResult<()> {
        validate_host(&self.host, self.allow_insecure)?;
        if self.timeout.is_zero() {
            return Err(ZPassError::invalid_input(
                "timeout_secs",
                "timeout must be greater than zero",
            ));
        }
        Ok(())
    }
}

pub(crate) fn validate_host(host: &str, allow_insecure: bool) -> ZPassResult<()> {
    let url = reqwest::Url::parse(host)
        .map_err(|e| ZPassError::invalid_input("host", e.to_string()))?;
    match url.scheme() {
        "https" => Ok(()),
        "http" if allow_insecure => Ok(()),
        "http" => Err(ZPassError::invalid_input(
            "host",
            "plain http hosts require allow_insecure",
        )),
        other => Err(ZPassError::invalid_input(
            "host",
            format!("unsupported scheme {other}"),
        )),
    }
}

/// Built-in key cache retention policies. See [`crate::key_cache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CachePolicy {
    /// Only the most recently synthesized program's keys are kept.
    #[default]
    SingleSlot,
    /// Least-recently-used retention with a fixed capacity.
    Lru {
        /// Maximum number of key pairs retained.
        capacity: NonZeroUsize,
    },
    /// Keeps every key pair ever synthesized.
    Unbounded,
    /// Keeps nothing; every call synthesizes.
    Disabled,
}

/// Options used to construct an [`Issuer`](crate::Issuer).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SdkOptions {
    /// Account private key (`APrivateKey1…`).
    #[serde(deserialize_with = "deserialize_secret")]
    pub private_key: SecretString,
    /// Network client settings.
    #[serde(default)]
    pub network: NetworkConfig,
    /// Key cache retention.
    #[serde(default)]
    pub cache_policy: CachePolicy,
}

impl SdkOptions {
    /// Options with every default applied and the given private key.
    #[must_use]
    pub fn new(private_key: impl Into<String>) -> Self {
        Self {
            private_key: SecretString::from(private_key.into()),
            network: NetworkConfig::default(),
            cache_policy: CachePolicy::default(),
        }
    }

    /// Replaces the explorer host, keeping other network settings.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.network.host = host.into();
        self
    }

    /// Replaces the key cache policy.
    #[must_use]
    pub const fn with_cache_policy(mut self, cache_policy: CachePolicy) -> Self {
        self.cache_policy = cache_policy;
        self
    }

    /// Deserializes options from a JSON document.
    ///
    /// # Errors
    /// Returns [`ZPassError::InvalidInput`] if the JSON is malformed or has unknown fields.
    pub fn from_json(json: &str) -> ZPassResult<Self> {
        serde_json::from_str(json).map_err(|e| {
            ZPassError::invalid_input("options", format!("invalid options json: {e}"))
        })
    }

    /// Validates the options without touching the proving engine or the network.
    ///
    /// # Errors
    /// Returns [`ZPassError::InvalidKeyFormat`] for a key without the expected prefix
    /// and [`ZPassError::InvalidInput`] for invalid network settings.
    pub fn validate(&self) -> ZPassResult<()> {
        if !self.private_key.expose_secret().starts_with(PRIVATE_KEY_PREFIX) {
            return Err(ZPassError::InvalidKeyFormat {
                expected_prefix: PRIVATE_KEY_PREFIX,
            });
        }
        self.network.validate()
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

fn deserialize_secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_secs)
}
