use crate::{
    engine::ProvingEngine,
    error::{EngineError, ZPassError, ZPassResult},
    network::NetworkClient,
};

use super::Issuer;

impl<E: ProvingEngine, N: NetworkClient> Issuer<E, N> {
    /// Fetches a transaction and decrypts its first `record` output with the account view key.
    ///
    /// # Errors
    /// - [`ZPassError::TransactionNotFound`] if the transaction is unknown.
    /// - [`ZPassError::NoRecordOutput`] if it has no record output.
    /// - [`ZPassError::DecryptionFailed`] if the record cannot be decrypted with this view key.
    pub async fn get_zpass_record(&self, transaction_id: &str) -> ZPassResult<String> {
        let transaction = self
            .network
            .get_transaction(transaction_id)
            .await
            .map_err(|e| ZPassError::transaction_lookup(transaction_id, e))?;

        let ciphertext = transaction
            .first_record_output()
            .ok_or_else(|| ZPassError::NoRecordOutput {
                transaction_id: transaction_id.to_string(),
            })?
            .value
            .as_deref()
            .ok_or_else(|| {
                ZPassError::DecryptionFailed(EngineError::new("record output has no value"))
            })?;

        tracing::debug!(transaction_id, "decrypting record");
        self.engine
            .decrypt_record(self.account.view_key(), ciphertext)
            .map_err(ZPassError::DecryptionFailed)
    }
}
