//! Verification without an account.
//!
//! A [`Verifier`] checks on-chain transactions, local execution proofs and
//! credential signatures. It holds no identity and no key cache.

use std::sync::Arc;

use serde::Serialize;

use crate::{
    account::Address,
    config::NetworkConfig,
    credential::SignatureResult,
    blocking::{spawn_engine, EngineCall},
    engine::{ProvingEngine, VerifyingKey},
    error::{ZPassError, ZPassResult},
    network::{resolve_imports, AleoNetworkClient, NetworkClient, Output, TransactionRecord},
};

/// A request to look up a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOnChainRequest {
    /// Transaction identifier.
    pub transaction_id: String,
    /// Queries this host instead of the client's.
    pub url: Option<String>,
}

impl VerifyOnChainRequest {
    /// A lookup against the client's host.
    #[must_use]
    pub fn new(transaction_id: impl Into<String>) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            url: None,
        }
    }

    /// Queries `url` instead of the client's host.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// What the ledger reports for a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OnChainVerification {
    /// Whether the transaction is an execution.
    pub has_execution: bool,
    /// Outputs of every transition, in order.
    pub outputs: Vec<Output>,
    /// The transaction as returned by the ledger.
    pub transaction: TransactionRecord,
}

/// A request to check a local execution proof.
///
/// Either `inputs` or `verifying_key` must be present. A supplied key is used
/// as-is; otherwise a verifying key is synthesized from `inputs`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyOffChainRequest {
    /// Serialized execution proof.
    pub execution: String,
    /// Source of the program that was executed.
    pub program: String,
    /// Function that was executed.
    pub function_name: String,
    /// Inputs used to synthesize a verifying key.
    pub inputs: Option<Vec<String>>,
    /// Key to verify against.
    pub verifying_key: Option<VerifyingKey>,
    /// Host imports are resolved from when a key has to be synthesized.
    pub url: Option<String>,
}

impl VerifyOffChainRequest {
    /// A request without verification material; add inputs or a key.
    #[must_use]
    pub fn new(
        execution: impl Into<String>,
        program: impl Into<String>,
        function_name: impl Into<String>,
    ) -> Self {
        Self {
            execution: execution.into(),
            program: program.into(),
            function_name: function_name.into(),
            ..Self::default()
        }
    }

    /// Verifies against `verifying_key`.
    #[must_use]
    pub fn with_verifying_key(mut self, verifying_key: VerifyingKey) -> Self {
        self.verifying_key = Some(verifying_key);
        self
    }

    /// Synthesizes the verifying key from `inputs`.
    #[must_use]
    pub fn with_inputs(mut self, inputs: Vec<String>) -> Self {
        self.inputs = Some(inputs);
        self
    }

    /// Resolves imports from `url`.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

fn client_for<N: NetworkClient>(network: &N, url: Option<&str>) -> N {
    url.map_or_else(|| network.clone(), |url| network.with_host(url))
}

/// Looks up a transaction and reports whether it carries an execution.
///
/// Needs no engine and no account.
///
/// # Errors
/// Returns [`ZPassError::TransactionNotFound`] if the ledger does not know the transaction.
pub async fn verify_on_chain<N: NetworkClient>(
    network: &N,
    request: VerifyOnChainRequest,
) -> ZPassResult<OnChainVerification> {
    let network = client_for(network, request.url.as_deref());
    let transaction = network
        .get_transaction(&request.transaction_id)
        .await
        .map_err(|e| ZPassError::transaction_lookup(&request.transaction_id, e))?;

    tracing::debug!(transaction_id = %request.transaction_id, kind = %transaction.kind, "transaction found");
    Ok(OnChainVerification {
        has_execution: transaction.is_execution(),
        outputs: transaction.execution_outputs().cloned().collect(),
        transaction,
    })
}

/// Checks proofs and signatures. Stateless; clones are cheap.
#[derive(Debug)]
pub struct Verifier<E, N = AleoNetworkClient> {
    engine: Arc<E>,
    network: N,
}

impl<E, N: Clone> Clone for Verifier<E, N> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            network: self.network.clone(),
        }
    }
}

impl<E: ProvingEngine> Verifier<E, AleoNetworkClient> {
    /// A verifier talking to the explorer configured in `config`.
    ///
    /// # Errors
    /// Returns [`ZPassError::InvalidInput`] if the configuration is invalid.
    pub fn new(engine: Arc<E>, config: &NetworkConfig) -> ZPassResult<Self> {
        Ok(Self::with_network_client(
            engine,
            AleoNetworkClient::new(config)?,
        ))
    }
}

impl<E: ProvingEngine, N: NetworkClient> Verifier<E, N> {
    /// A verifier using a caller-supplied network client.
    #[must_use]
    pub const fn with_network_client(engine: Arc<E>, network: N) -> Self {
        Self { engine, network }
    }

    /// See [`verify_on_chain`].
    ///
    /// # Errors
    /// See [`verify_on_chain`].
    pub async fn verify_on_chain(
        &self,
        request: VerifyOnChainRequest,
    ) -> ZPassResult<OnChainVerification> {
        verify_on_chain(&self.network, request).await
    }

    /// Checks a local execution proof.
    ///
    /// Returns `Ok(false)` when the proof does not verify.
    ///
    /// # Errors
    /// - [`ZPassError::MissingVerificationMaterial`] if neither inputs nor a key is given.
    /// - [`ZPassError::ProofVerificationError`] if the program, execution or key is malformed.
    /// - [`ZPassError::FunctionNotFound`] if the program lacks the function.
    /// - [`ZPassError::KeySynthesisFailed`] if a verifying key cannot be synthesized.
    pub async fn verify_off_chain(&self, request: VerifyOffChainRequest) -> ZPassResult<bool> {
        let VerifyOffChainRequest {
            execution,
            program,
            function_name,
            inputs,
            verifying_key,
            url,
        } = request;

        if inputs.is_none() && verifying_key.is_none() {
            return Err(ZPassError::MissingVerificationMaterial);
        }

        let program = self
            .engine
            .parse_program(&program)
            .map_err(ZPassError::ProofVerificationError)?;
        if !program.has_function(&function_name) {
            return Err(ZPassError::FunctionNotFound {
                program: program.id().to_string(),
                function: function_name,
            });
        }

        let program_id = program.id().to_string();
        let verified = match (verifying_key, inputs) {
            (Some(verifying_key), _) => {
                let function = function_name.clone();
                spawn_engine(&self.engine, move |engine| {
                    engine.verify_execution(&execution, &verifying_key, &program, &function)
                })
                .await
                .map_err(ZPassError::ProofVerificationError)?
            }
            (None, Some(inputs)) => {
                let network = client_for(&self.network, url.as_deref());
                let imports = resolve_imports(&network, program.source()).await?;
                tracing::debug!(program = %program_id, function = %function_name, "synthesizing verifying key");
                let call = EngineCall::new(program, function_name.clone(), inputs, imports);
                let synthesis = Arc::clone(&call);
                let verifying_key = spawn_engine(&self.engine, move |engine| {
                    engine.synthesize_keys(synthesis.context(), None)
                })
                .await
                .map_err(ZPassError::KeySynthesisFailed)?
                .verifying_key;
                spawn_engine(&self.engine, move |engine| {
                    engine.verify_execution(
                        &execution,
                        &verifying_key,
                        &call.program,
                        &call.function,
                    )
                })
                .await
                .map_err(ZPassError::ProofVerificationError)?
            }
            (None, None) => return Err(ZPassError::MissingVerificationMaterial),
        };
        tracing::debug!(program = %program_id, function = %function_name, verified, "execution checked");
        Ok(verified)
    }

    /// Checks a credential signature against the issuer's address.
    ///
    /// # Errors
    /// Returns [`ZPassError::ProofVerificationError`] if the signature or hash is malformed.
    pub fn verify_credential_signature(
        &self,
        signed: &SignatureResult,
        issuer: &Address,
    ) -> ZPassResult<bool> {
        self.engine
            .verify_signature(&signed.signature, issuer, &signed.hash)
            .map_err(ZPassError::ProofVerificationError)
    }
}
