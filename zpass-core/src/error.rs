use thiserror::Error;

use crate::network::NetworkError;

/// Result alias used across the crate.
pub type ZPassResult<T, E = ZPassError> = std::result::Result<T, E>;

/// Failure reported by a [`ProvingEngine`](crate::engine::ProvingEngine) implementation.
///
/// The orchestrator never inspects the message; it wraps the error in the
/// [`ZPassError`] variant matching the step that failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EngineError {
    message: String,
}

impl EngineError {
    /// Creates a new engine error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the engine's failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Error outputs from the zPass SDK
#[derive(Debug, Error)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error))]
#[cfg_attr(feature = "ffi", uniffi(flat_error))]
pub enum ZPassError {
    /// The private key does not carry the expected `APrivateKey1` prefix.
    #[error("invalid_key_format: private key must start with \"{expected_prefix}\"")]
    InvalidKeyFormat {
        /// The prefix every private key must start with.
        expected_prefix: &'static str,
    },
    /// The proving engine rejected the private key material.
    #[error("invalid_key: {0}")]
    InvalidKey(#[source] EngineError),
    /// The proving engine cannot be loaded in this environment.
    #[error("unsupported_environment: {0}")]
    UnsupportedEnvironment(#[source] EngineError),
    /// Neither the request nor the signer carries a private key.
    #[error("no_private_key_available")]
    NoPrivateKeyAvailable,
    /// The presented input is not valid for the requested operation
    #[error("invalid_input_{attribute}: {reason}")]
    InvalidInput {
        /// The attribute (field, option or payload member) that is invalid.
        attribute: String,
        /// Why it was rejected.
        reason: String,
    },
    /// The network does not know the requested program.
    #[error("program_not_found: {program}")]
    ProgramNotFound {
        /// Program identifier that was requested.
        program: String,
    },
    /// The program source could not be parsed by the engine.
    #[error("program_parse_error: {0}")]
    ProgramParseError(#[source] EngineError),
    /// The program does not declare the requested function.
    #[error("function_not_found: {program} does not contain function {function}")]
    FunctionNotFound {
        /// Program identifier.
        program: String,
        /// Function that was requested.
        function: String,
    },
    /// Proving/verifying key synthesis failed.
    #[error("key_synthesis_failed: {0}")]
    KeySynthesisFailed(#[source] EngineError),
    /// Hashing or signing a credential failed.
    #[error("signing_failed: {0}")]
    SigningFailed(#[source] EngineError),
    /// The execution fee could not be estimated.
    #[error("fee_estimation_failed: {0}")]
    FeeEstimationFailed(#[source] EngineError),
    /// The execution transaction could not be built.
    #[error("transaction_build_failed: {0}")]
    TransactionBuildFailed(#[source] EngineError),
    /// The network refused or failed to accept the transaction.
    #[error("transaction_submission_failed: {0}")]
    TransactionSubmissionFailed(#[source] NetworkError),
    /// The endpoint does not know the transaction.
    #[error("transaction_not_found: {transaction_id}")]
    TransactionNotFound {
        /// Transaction identifier that was requested.
        transaction_id: String,
    },
    /// Local execution of a program function failed.
    #[error("execution_failed: {0}")]
    ExecutionFailed(#[source] EngineError),
    /// Off-chain verification needs either inputs or a verifying key.
    #[error("missing_verification_material: provide inputs or a verifying key")]
    MissingVerificationMaterial,
    /// The proof, key or program handed to the verifier is malformed.
    #[error("proof_verification_error: {0}")]
    ProofVerificationError(#[source] EngineError),
    /// The transaction has no output of kind `record`.
    #[error("no_record_output: transaction {transaction_id} has no record output")]
    NoRecordOutput {
        /// Transaction identifier that was inspected.
        transaction_id: String,
    },
    /// The record could not be decrypted with this account's view key.
    #[error("decryption_failed: {0}")]
    DecryptionFailed(#[source] EngineError),
    /// Network connection error with details
    #[error(transparent)]
    Network(#[from] NetworkError),
    /// Unexpected error serializing information
    #[error("serialization_error: {error}")]
    SerializationError {
        /// Error details.
        error: String,
    },
}

impl ZPassError {
    pub(crate) fn invalid_input(attribute: &str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            attribute: attribute.to_string(),
            reason: reason.into(),
        }
    }

    /// Maps a failed program fetch: a 404 means the program does not exist.
    pub(crate) fn program_lookup(program: &str, error: NetworkError) -> Self {
        if error.is_not_found() {
            Self::ProgramNotFound {
                program: program.to_string(),
            }
        } else {
            Self::Network(error)
        }
    }

    /// Maps a failed transaction fetch: a 404 means the transaction is unknown.
    pub(crate) fn transaction_lookup(transaction_id: &str, error: NetworkError) -> Self {
        if error.is_not_found() {
            Self::TransactionNotFound {
                transaction_id: transaction_id.to_string(),
            }
        } else {
            Self::Network(error)
        }
    }
}
