//! Interface to the external proving engine.
//!
//! Hashing, signing, key synthesis, proof generation and verification, record
//! decryption and program parsing are all supplied by an engine implementation.
//! The orchestrator only sequences these calls; it never looks inside a key, a
//! proof or a ciphertext.
//!
//! Engine calls are synchronous and may take seconds (key synthesis, proving).
//! The orchestrator runs the slow ones on tokio's blocking pool.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::{
    account::{Address, PrivateKey, ViewKey},
    credential::{CredentialPayload, HashAlgorithm},
    error::EngineError,
};

/// Sources of the programs imported by a program, keyed by program id.
pub type ProgramImports = BTreeMap<String, String>;

/// A parsed program: its identifier, declared functions and imports, and the source it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    id: String,
    source: String,
    functions: Vec<String>,
    imports: Vec<String>,
}

impl Program {
    /// Assembles a program description. Called by engines after parsing `source`.
    #[must_use]
    pub const fn new(
        id: String,
        source: String,
        functions: Vec<String>,
        imports: Vec<String>,
    ) -> Self {
        Self {
            id,
            source,
            functions,
            imports,
        }
    }

    /// Program identifier, e.g. `verify_poseidon2_zpass.aleo`.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The program source this description was parsed from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Names of the functions the program declares.
    #[must_use]
    pub fn functions(&self) -> &[String] {
        &self.functions
    }

    /// Identifiers of the programs this program imports directly.
    #[must_use]
    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    /// Whether the program declares `function`.
    #[must_use]
    pub fn has_function(&self, function: &str) -> bool {
        self.functions.iter().any(|f| f == function)
    }
}

/// Returns the program ids named by `import <id>;` declarations in `source`, in order.
#[must_use]
pub fn declared_imports(source: &str) -> Vec<String> {
    source
        .lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix("import "))
        .filter_map(|rest| rest.trim().strip_suffix(';'))
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect()
}

/// A serialized proving key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProvingKey(String);

/// A serialized verifying key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerifyingKey(String);

macro_rules! opaque_key {
    ($name:ident) => {
        impl $name {
            /// Wraps a serialized key.
            #[must_use]
            pub fn new(key: impl Into<String>) -> Self {
                Self(key.into())
            }

            /// The serialized key.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                // Keys run to megabytes; print a prefix only.
                let shown: String = self.0.chars().take(16).collect();
                write!(f, "{}({shown}…, {} bytes)", stringify!($name), self.0.len())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_key!(ProvingKey);
opaque_key!(VerifyingKey);

/// Proving and verifying key for one program function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    /// Key used to produce proofs.
    pub proving_key: ProvingKey,
    /// Key used to check proofs.
    pub verifying_key: VerifyingKey,
}

/// A program function call: the common argument of synthesis, fee estimation,
/// transaction building and local execution.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionContext<'a> {
    /// Program being executed.
    pub program: &'a Program,
    /// Function being executed.
    pub function: &'a str,
    /// Function inputs, in the engine's literal encoding.
    pub inputs: &'a [String],
    /// Sources of every program `program` imports, transitively.
    pub imports: &'a ProgramImports,
}

/// How the execution fee is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSpec<'a> {
    /// Fee amount in microcredits.
    pub amount: u64,
    /// Pay from a private record instead of the public balance.
    pub private: bool,
    /// Record to pay a private fee from. When absent the engine selects one.
    pub record: Option<&'a str>,
}

/// A built transaction, ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Transaction identifier (`at1…`).
    pub id: String,
    /// JSON serialization, as broadcast to the network.
    pub payload: String,
}

/// Result of executing a function locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResponse {
    /// Function outputs, in the engine's literal encoding.
    pub outputs: Vec<String>,
    /// Serialized proof of the execution.
    pub execution: String,
}

/// Pre-fetched ledger state that lets the engine prove without network access.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineQuery {
    /// Height the state snapshot was taken at.
    pub block_height: u32,
    /// Global state root at that height.
    pub state_root: String,
    /// State paths for the records consumed by the execution, keyed by commitment.
    #[serde(default)]
    pub state_paths: BTreeMap<String, String>,
}

/// The external proving engine.
///
/// Implementations wrap a zero-knowledge VM. [`crate::mock::MockEngine`] is a
/// deterministic stand-in used for tests and offline development.
pub trait ProvingEngine: Send + Sync + 'static {
    /// Fails if the engine cannot run in the current environment.
    ///
    /// # Errors
    /// Returns the reason the environment is unsupported.
    fn check_environment(&self) -> Result<(), EngineError>;

    /// Derives the view key for a private key.
    ///
    /// # Errors
    /// Fails if the key material is invalid.
    fn derive_view_key(&self, private_key: &PrivateKey) -> Result<ViewKey, EngineError>;

    /// Derives the address for a private key.
    ///
    /// # Errors
    /// Fails if the key material is invalid.
    fn derive_address(&self, private_key: &PrivateKey) -> Result<Address, EngineError>;

    /// Hashes a credential payload. Must be deterministic for equal inputs.
    ///
    /// # Errors
    /// Fails if the payload cannot be encoded for `algorithm`.
    fn hash(
        &self,
        payload: &CredentialPayload,
        algorithm: HashAlgorithm,
    ) -> Result<String, EngineError>;

    /// Signs a hash produced by [`ProvingEngine::hash`].
    ///
    /// # Errors
    /// Fails if the key or the hash is malformed.
    fn sign(&self, private_key: &PrivateKey, hash: &str) -> Result<String, EngineError>;

    /// Checks a signature over `hash` against `address`.
    ///
    /// # Errors
    /// Fails only if the signature or hash is malformed; a wrong signature is `Ok(false)`.
    fn verify_signature(
        &self,
        signature: &str,
        address: &Address,
        hash: &str,
    ) -> Result<bool, EngineError>;

    /// Parses program source.
    ///
    /// # Errors
    /// Fails if the source is not a valid program.
    fn parse_program(&self, source: &str) -> Result<Program, EngineError>;

    /// Synthesizes the proving and verifying key for a function.
    ///
    /// `private_key` is absent when a verifier synthesizes a verifying key.
    ///
    /// # Errors
    /// Fails if the function cannot be synthesized with the given inputs.
    fn synthesize_keys(
        &self,
        context: ExecutionContext<'_>,
        private_key: Option<&PrivateKey>,
    ) -> Result<KeyPair, EngineError>;

    /// Estimates the fee, in microcredits, of executing a function on-chain.
    ///
    /// # Errors
    /// Fails if the execution cost cannot be computed.
    fn estimate_execution_fee(
        &self,
        context: ExecutionContext<'_>,
        keys: &KeyPair,
    ) -> Result<u64, EngineError>;

    /// Proves a function execution and wraps it, with a fee, in a transaction.
    ///
    /// # Errors
    /// Fails if proving or fee authorization fails.
    fn build_execution_transaction(
        &self,
        context: ExecutionContext<'_>,
        keys: &KeyPair,
        private_key: &PrivateKey,
        fee: FeeSpec<'_>,
    ) -> Result<Transaction, EngineError>;

    /// Executes and proves a function locally, without a fee or submission.
    ///
    /// # Errors
    /// Fails if execution or proving fails.
    fn run(
        &self,
        context: ExecutionContext<'_>,
        keys: &KeyPair,
        private_key: &PrivateKey,
        offline_query: Option<&OfflineQuery>,
    ) -> Result<ExecutionResponse, EngineError>;

    /// Checks a serialized execution against a verifying key.
    ///
    /// # Errors
    /// Fails only on malformed input; a proof that does not verify is `Ok(false)`.
    fn verify_execution(
        &self,
        execution: &str,
        verifying_key: &VerifyingKey,
        program: &Program,
        function: &str,
    ) -> Result<bool, EngineError>;

    /// Decrypts a record ciphertext owned by the view key's address.
    ///
    /// # Errors
    /// Fails if the ciphertext is malformed or not owned by this view key.
    fn decrypt_record(
        &self,
        view_key: &ViewKey,
        ciphertext: &str,
    ) -> Result<String, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_imports() {
        let source = "import credits.aleo;\nimport  zpass_helpers.aleo ;\nprogram main.aleo;\n\nfunction f:\n    input r0 as u32.private;\n";
        assert_eq!(
            declared_imports(source),
            vec!["credits.aleo".to_string(), "zpass_helpers.aleo".to_string()]
        );
        assert!(declared_imports("program main.aleo;").is_empty());
    }

    #[test]
    fn test_key_debug_is_truncated() {
        let key = VerifyingKey::new("verifier1".repeat(100));
        let debug = format!("{key:?}");
        assert!(debug.starts_with("VerifyingKey(verifier1verifie"));
        assert!(debug.contains("900 bytes"));
    }
}
