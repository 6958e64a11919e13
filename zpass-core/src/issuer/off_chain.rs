use serde::Serialize;

use crate::{
    blocking::{spawn_engine, EngineCall},
    engine::{OfflineQuery, ProgramImports, ProvingEngine, ProvingKey, VerifyingKey},
    error::{ZPassError, ZPassResult},
    network::{resolve_imports, NetworkClient},
};

use super::Issuer;

/// A request to execute and prove a program function locally, without submitting anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProveOffChainRequest {
    /// Program source. It need not be deployed.
    pub local_program: String,
    /// Function to execute.
    pub function_name: String,
    /// Function inputs.
    pub inputs: Vec<String>,
    /// Ledger state snapshot for proving without network access.
    pub offline_query: Option<OfflineQuery>,
    /// Sources of the imported programs. When present the network is not contacted.
    pub imports: Option<ProgramImports>,
    /// Return the proving key alongside the verifying key.
    pub include_proving_key: bool,
}

impl ProveOffChainRequest {
    /// A request resolving imports through the network.
    #[must_use]
    pub fn new(
        local_program: impl Into<String>,
        function_name: impl Into<String>,
        inputs: Vec<String>,
    ) -> Self {
        Self {
            local_program: local_program.into(),
            function_name: function_name.into(),
            inputs,
            ..Self::default()
        }
    }

    /// Proves against a ledger state snapshot.
    #[must_use]
    pub fn with_offline_query(mut self, offline_query: OfflineQuery) -> Self {
        self.offline_query = Some(offline_query);
        self
    }

    /// Supplies the imported programs up front.
    #[must_use]
    pub fn with_imports(mut self, imports: ProgramImports) -> Self {
        self.imports = Some(imports);
        self
    }

    /// Requests the proving key in the result.
    #[must_use]
    pub const fn with_proving_key(mut self) -> Self {
        self.include_proving_key = true;
        self
    }
}

/// Outcome of a local execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProofResult {
    /// Function outputs.
    pub outputs: Vec<String>,
    /// Serialized execution proof.
    pub execution: String,
    /// Key that verifies `execution`.
    pub verifying_key: VerifyingKey,
    /// Key used to produce `execution`, if requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proving_key: Option<ProvingKey>,
}

impl<E: ProvingEngine, N: NetworkClient> Issuer<E, N> {
    /// Executes and proves a function of a local program.
    ///
    /// Keys are cached under the local program's own id and source, so a local
    /// program never reuses keys of a deployed program with the same id but different source.
    ///
    /// # Errors
    /// - [`ZPassError::ProgramParseError`] / [`ZPassError::FunctionNotFound`] for an unusable program.
    /// - [`ZPassError::Network`] if imports must be fetched and cannot be.
    /// - [`ZPassError::KeySynthesisFailed`] if keys cannot be synthesized.
    /// - [`ZPassError::ExecutionFailed`] if execution or proving fails.
    pub async fn prove_off_chain(
        &self,
        request: ProveOffChainRequest,
    ) -> ZPassResult<ProofResult> {
        let ProveOffChainRequest {
            local_program,
            function_name,
            inputs,
            offline_query,
            imports,
            include_proving_key,
        } = request;

        let program = self.load_program(&local_program, &function_name)?;
        let imports = match imports {
            Some(imports) => imports,
            None => resolve_imports(&self.network, program.source()).await?,
        };
        let call = EngineCall::new(program, function_name, inputs, imports);
        let keys = self.keys_for(&call).await?;

        tracing::debug!(program = call.program.id(), function = %call.function, offline = offline_query.is_some(), "executing locally");
        let private_key = self.account.private_key().clone();
        let run_keys = keys.clone();
        let response = spawn_engine(&self.engine, move |engine| {
            engine.run(
                call.context(),
                &run_keys,
                &private_key,
                offline_query.as_ref(),
            )
        })
        .await
        .map_err(ZPassError::ExecutionFailed)?;

        Ok(ProofResult {
            outputs: response.outputs,
            execution: response.execution,
            verifying_key: keys.verifying_key,
            proving_key: include_proving_key.then_some(keys.proving_key),
        })
    }
}
