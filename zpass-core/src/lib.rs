//! zPass credential issuance and verification.
//!
//! An [`Issuer`] signs credentials and proves their issuance, either on-chain
//! through a deployed program or locally with a program source. A [`Verifier`]
//! checks the results without an account. Cryptography is delegated to a
//! [`ProvingEngine`]; ledger access to a [`NetworkClient`].

pub mod account;
pub use account::{Account, Address, PrivateKey, ViewKey};

mod blocking;

pub mod config;
pub use config::{CachePolicy, Network, NetworkConfig, SdkOptions};

pub mod credential;
pub use credential::{
    string_to_field, CredentialPayload, CredentialSigner, HashAlgorithm, Literal,
    SignCredentialRequest, SignatureResult,
};

pub mod engine;
pub use engine::{KeyPair, OfflineQuery, Program, ProgramImports, ProvingEngine};

mod error;
pub use error::*;

pub mod issuer;
pub use issuer::{
    credential_inputs, Issuer, ProofResult, ProveOffChainRequest, ProveOnChainRequest,
};

pub mod key_cache;
pub use key_cache::{CacheKey, CacheStats, EvictionPolicy, KeyCache};

/// Logging utilities
pub mod logger;

pub mod mock;

pub mod network;
pub use network::{AleoNetworkClient, NetworkClient, NetworkError};

pub mod verifier;
pub use verifier::{
    verify_on_chain, OnChainVerification, Verifier, VerifyOffChainRequest,
    VerifyOnChainRequest,
};

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!("zpass_core");
