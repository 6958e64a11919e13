use reqwest::{header, Response, StatusCode};
use serde::de::DeserializeOwned;

use super::{http::Request, NetworkClient, NetworkError, TransactionRecord};
use crate::{
    config::{Network, NetworkConfig},
    engine::Transaction,
    error::ZPassResult,
};

/// Explorer API client.
///
/// Endpoints are scoped to a network: `{host}/{network}/program/{id}`,
/// `{host}/{network}/transaction/{id}` and `{host}/{network}/transaction/broadcast`.
#[derive(Debug, Clone)]
pub struct AleoNetworkClient {
    host: String,
    network: Network,
    allow_insecure: bool,
    request: Request,
}

impl AleoNetworkClient {
    /// Creates a client from validated settings.
    ///
    /// # Errors
    /// Returns [`crate::ZPassError::InvalidInput`] if the configuration is invalid.
    pub fn new(config: &NetworkConfig) -> ZPassResult<Self> {
        config.validate()?;
        Ok(Self {
            host: config.host.trim_end_matches('/').to_string(),
            network: config.network,
            allow_insecure: config.allow_insecure,
            request: Request::new(config.timeout, config.max_retries),
        })
    }

    /// The network segment requests are scoped to.
    #[must_use]
    pub const fn network(&self) -> Network {
        self.network
    }

    fn endpoint(&self, path: &str) -> Result<String, NetworkError> {
        let url = format!("{}/{}/{path}", self.host, self.network);
        if !self.allow_insecure && !url.starts_with("https://") {
            return Err(NetworkError::InsecureUrl { url });
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, NetworkError> {
        let response = self
            .request
            .send_with_retries(self.request.get(url))
            .await?;
        decode(url, response).await
    }
}

async fn decode<T: DeserializeOwned>(
    url: &str,
    response: Response,
) -> Result<T, NetworkError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(NetworkError::NotFound {
            url: url.to_string(),
        });
    }
    if !status.is_success() {
        let error = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("Unknown error"));
        return Err(NetworkError::Http {
            url: url.to_string(),
            status: Some(status.as_u16()),
            error,
        });
    }

    let body = response.text().await.map_err(|e| NetworkError::Http {
        url: url.to_string(),
        status: Some(status.as_u16()),
        error: format!("failed to read response body: {e}"),
    })?;
    serde_json::from_str(&body).map_err(|e| NetworkError::Decode {
        url: url.to_string(),
        error: e.to_string(),
    })
}

impl NetworkClient for AleoNetworkClient {
    fn host(&self) -> &str {
        &self.host
    }

    fn with_host(&self, host: &str) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
            ..self.clone()
        }
    }

    async fn get_program(&self, program_id: &str) -> Result<String, NetworkError> {
        let url = self.endpoint(&format!("program/{program_id}"))?;
        tracing::debug!(%url, "fetching program");
        self.get_json(&url).await
    }

    async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<TransactionRecord, NetworkError> {
        let url = self.endpoint(&format!("transaction/{transaction_id}"))?;
        tracing::debug!(%url, "fetching transaction");
        self.get_json(&url).await
    }

    async fn submit_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<String, NetworkError> {
        let url = self.endpoint("transaction/broadcast")?;
        tracing::debug!(%url, transaction_id = %transaction.id, "broadcasting transaction");
        let request = self
            .request
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(transaction.payload.clone());
        let response = self.request.send_once(request).await?;
        decode(&url, response).await
    }
}
