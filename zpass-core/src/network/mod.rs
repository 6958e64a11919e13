//! Access to the ledger through an explorer API.
//!
//! [`NetworkClient`] is the seam the orchestrator depends on; [`AleoNetworkClient`]
//! is the HTTP implementation. Tests substitute [`crate::mock::MockNetwork`].

use std::future::Future;

use thiserror::Error;

use crate::engine::{declared_imports, ProgramImports, Transaction};

mod aleo;
mod http;
mod models;

pub use aleo::AleoNetworkClient;
pub use models::{
    ExecutionRecord, Output, TransactionRecord, Transition, RECORD_OUTPUT_KIND,
};

/// Failure talking to the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// The endpoint answered 404.
    #[error("not_found: {url}")]
    NotFound {
        /// Requested URL.
        url: String,
    },
    /// Transport failure or unexpected status.
    #[error("network_error: {url} (status {status:?}): {error}")]
    Http {
        /// Requested URL.
        url: String,
        /// HTTP status, absent for transport failures.
        status: Option<u16>,
        /// Error details.
        error: String,
    },
    /// The response body was not what the endpoint documents.
    #[error("decode_error: {url}: {error}")]
    Decode {
        /// Requested URL.
        url: String,
        /// Error details.
        error: String,
    },
    /// A plain `http://` URL was used without allowing insecure hosts.
    #[error("insecure_url: {url}")]
    InsecureUrl {
        /// Rejected URL.
        url: String,
    },
}

impl NetworkError {
    /// Whether the endpoint reported the resource as missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Read and write access to a ledger.
///
/// Clones share the underlying connection pool.
pub trait NetworkClient: Clone + Send + Sync {
    /// Base URL requests are sent to.
    fn host(&self) -> &str;

    /// A client identical to this one but pointed at `host`.
    #[must_use]
    fn with_host(&self, host: &str) -> Self;

    /// Fetches the source of a deployed program.
    fn get_program(
        &self,
        program_id: &str,
    ) -> impl Future<Output = Result<String, NetworkError>> + Send;

    /// Fetches the sources of every program `program_id` imports, transitively.
    fn get_program_imports(
        &self,
        program_id: &str,
    ) -> impl Future<Output = Result<ProgramImports, NetworkError>> + Send {
        async move {
            let source = self.get_program(program_id).await?;
            resolve_imports(self, &source).await
        }
    }

    /// Fetches a confirmed transaction.
    fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> impl Future<Output = Result<TransactionRecord, NetworkError>> + Send;

    /// Broadcasts a transaction and returns the identifier the network reports.
    ///
    /// Broadcasts are never retried.
    fn submit_transaction(
        &self,
        transaction: &Transaction,
    ) -> impl Future<Output = Result<String, NetworkError>> + Send;
}

/// Fetches every program imported by `source`, transitively. Each program is
/// fetched once even if several programs import it.
///
/// # Errors
/// Returns the first network error encountered.
pub async fn resolve_imports<N: NetworkClient>(
    network: &N,
    source: &str,
) -> Result<ProgramImports, NetworkError> {
    let mut imports = ProgramImports::new();
    let mut pending = declared_imports(source);
    while let Some(program_id) = pending.pop() {
        if imports.contains_key(&program_id) {
            continue;
        }
        let import_source = network.get_program(&program_id).await?;
        pending.extend(
            declared_imports(&import_source)
                .into_iter()
                .filter(|id| !imports.contains_key(id)),
        );
        tracing::trace!(program = %program_id, "resolved import");
        imports.insert(program_id, import_source);
    }
    Ok(imports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockNetwork;

    #[tokio::test]
    async fn test_resolve_imports_is_transitive_and_deduplicated() {
        let network = MockNetwork::new();
        network.add_program("leaf.aleo", "program leaf.aleo;\n");
        network.add_program(
            "left.aleo",
            "import leaf.aleo;\nprogram left.aleo;\n",
        );
        network.add_program(
            "right.aleo",
            "import leaf.aleo;\nprogram right.aleo;\n",
        );
        network.add_program(
            "main.aleo",
            "import left.aleo;\nimport right.aleo;\nprogram main.aleo;\n",
        );

        let imports = network.get_program_imports("main.aleo").await.unwrap();

        assert_eq!(
            imports.keys().collect::<Vec<_>>(),
            vec!["leaf.aleo", "left.aleo", "right.aleo"]
        );
        // main, left, right, leaf: each exactly once
        assert_eq!(network.get_program_calls(), 4);
    }

    #[tokio::test]
    async fn test_resolve_imports_missing_program() {
        let network = MockNetwork::new();
        let result = resolve_imports(&network, "import gone.aleo;\nprogram a.aleo;").await;
        assert!(matches!(result, Err(NetworkError::NotFound { .. })));
    }
}
