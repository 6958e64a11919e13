use std::sync::Arc;

use crate::{
    blocking::{spawn_engine, EngineCall},
    credential::{CredentialPayload, SignatureResult},
    engine::{FeeSpec, ProvingEngine},
    error::{ZPassError, ZPassResult},
    network::{resolve_imports, NetworkClient},
};

use super::Issuer;

const PROGRAM_SUFFIX: &str = ".aleo";

fn is_identifier(value: &str) -> bool {
    value.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A request to prove a deployed program function and submit the execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProveOnChainRequest {
    /// Deployed program identifier, always with its `.aleo` suffix.
    pub program_name: String,
    /// Function to execute.
    pub function_name: String,
    /// Function inputs.
    pub inputs: Vec<String>,
    /// Fee in microcredits. Estimated by the engine when absent.
    pub fee: Option<u64>,
    /// Pay the fee from a private record.
    pub private_fee: bool,
    /// Record to pay a private fee from.
    pub fee_record: Option<String>,
}

impl ProveOnChainRequest {
    /// A request with an estimated public fee.
    ///
    /// `program_name` may omit the `.aleo` suffix.
    ///
    /// # Errors
    /// Returns [`ZPassError::InvalidInput`] if the program or function name is not an identifier.
    pub fn new(
        program_name: &str,
        function_name: &str,
        inputs: Vec<String>,
    ) -> ZPassResult<Self> {
        let stem = program_name
            .strip_suffix(PROGRAM_SUFFIX)
            .unwrap_or(program_name);
        if !is_identifier(stem) {
            return Err(ZPassError::invalid_input(
                "program_name",
                format!("{program_name} is not a program identifier"),
            ));
        }
        if !is_identifier(function_name) {
            return Err(ZPassError::invalid_input(
                "function_name",
                format!("{function_name} is not a function identifier"),
            ));
        }
        Ok(Self {
            program_name: format!("{stem}{PROGRAM_SUFFIX}"),
            function_name: function_name.to_string(),
            inputs,
            fee: None,
            private_fee: false,
            fee_record: None,
        })
    }

    /// Pays exactly `fee` microcredits instead of the estimate.
    #[must_use]
    pub const fn with_fee(mut self, fee: u64) -> Self {
        self.fee = Some(fee);
        self
    }

    /// Pays the fee privately, from `record` or from a record the engine selects.
    #[must_use]
    pub fn with_private_fee(mut self, record: Option<String>) -> Self {
        self.private_fee = true;
        self.fee_record = record;
        self
    }
}

/// Inputs of an issuance function taking the signature and the credential struct, in that order.
#[must_use]
pub fn credential_inputs(
    payload: &CredentialPayload,
    signature: &SignatureResult,
) -> Vec<String> {
    vec![signature.signature.clone(), payload.to_string()]
}

impl<E: ProvingEngine, N: NetworkClient> Issuer<E, N> {
    /// Proves a deployed program function and submits the execution.
    ///
    /// Returns the transaction identifier. The submission is never retried.
    ///
    /// # Errors
    /// - [`ZPassError::ProgramNotFound`] if the program is not deployed.
    /// - [`ZPassError::ProgramParseError`] / [`ZPassError::FunctionNotFound`] for an unusable program.
    /// - [`ZPassError::KeySynthesisFailed`] if keys cannot be synthesized.
    /// - [`ZPassError::FeeEstimationFailed`] if no fee was given and estimation fails.
    /// - [`ZPassError::TransactionBuildFailed`] if proving or fee authorization fails.
    /// - [`ZPassError::TransactionSubmissionFailed`] if the network rejects the transaction.
    pub async fn prove_on_chain(&self, request: ProveOnChainRequest) -> ZPassResult<String> {
        let ProveOnChainRequest {
            program_name,
            function_name,
            inputs,
            fee,
            private_fee,
            fee_record,
        } = request;

        let source = self
            .network
            .get_program(&program_name)
            .await
            .map_err(|e| ZPassError::program_lookup(&program_name, e))?;
        let program = self.load_program(&source, &function_name)?;
        let imports = resolve_imports(&self.network, program.source()).await?;
        let call = EngineCall::new(program, function_name, inputs, imports);
        let keys = self.keys_for(&call).await?;

        let amount = match fee {
            Some(fee) => fee,
            None => {
                let (call, keys) = (Arc::clone(&call), keys.clone());
                spawn_engine(&self.engine, move |engine| {
                    engine.estimate_execution_fee(call.context(), &keys)
                })
                .await
                .map_err(ZPassError::FeeEstimationFailed)?
            }
        };
        tracing::debug!(program = %program_name, function = %call.function, fee = amount, private_fee, "building execution");

        let private_key = self.account.private_key().clone();
        let transaction = spawn_engine(&self.engine, move |engine| {
            engine.build_execution_transaction(
                call.context(),
                &keys,
                &private_key,
                FeeSpec {
                    amount,
                    private: private_fee,
                    record: fee_record.as_deref(),
                },
            )
        })
        .await
        .map_err(ZPassError::TransactionBuildFailed)?;

        let transaction_id = self
            .network
            .submit_transaction(&transaction)
            .await
            .map_err(ZPassError::TransactionSubmissionFailed)?;
        tracing::info!(%transaction_id, program = %program_name, "transaction submitted");
        Ok(transaction_id)
    }

    /// Alias of [`Issuer::prove_on_chain`], for issuance programs.
    ///
    /// # Errors
    /// See [`Issuer::prove_on_chain`].
    pub async fn issue(&self, request: ProveOnChainRequest) -> ZPassResult<String> {
        self.prove_on_chain(request).await
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("verify_poseidon2_zpass", "verify_poseidon2_zpass.aleo" ; "suffix appended")]
    #[test_case("verify_poseidon2_zpass.aleo", "verify_poseidon2_zpass.aleo" ; "suffix kept")]
    fn test_program_name_normalized(name: &str, expected: &str) {
        let request = ProveOnChainRequest::new(name, "issue", vec![]).unwrap();
        assert_eq!(request.program_name, expected);
        assert_eq!(request.fee, None);
        assert!(!request.private_fee);
    }

    #[test_case("", "issue" ; "empty program")]
    #[test_case("1zpass", "issue" ; "program starts with digit")]
    #[test_case("zpass.aleo.aleo", "issue" ; "double suffix")]
    #[test_case("zpass", "is-sue" ; "bad function")]
    fn test_invalid_names_rejected(program: &str, function: &str) {
        assert!(matches!(
            ProveOnChainRequest::new(program, function, vec![]),
            Err(ZPassError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_private_fee() {
        let request = ProveOnChainRequest::new("zpass", "issue", vec![])
            .unwrap()
            .with_fee(50_000)
            .with_private_fee(Some("record1abc".to_string()));
        assert_eq!(request.fee, Some(50_000));
        assert!(request.private_fee);
        assert_eq!(request.fee_record.as_deref(), Some("record1abc"));
    }
}
