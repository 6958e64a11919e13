//! Deterministic stand-ins for the proving engine and the network.
//!
//! [`MockEngine`] derives keys, addresses and proofs from SHA-256 digests, so
//! everything it produces is checkable but nothing is zero-knowledge. Records
//! are really encrypted (XChaCha20-Poly1305 under a key derived from the owner
//! address), so decrypting with the wrong view key fails as it would on a real
//! ledger. Do not use either type outside tests and offline development.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    thread,
    time::Duration,
};

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    Key, XChaCha20Poly1305, XNonce,
};
use hkdf::Hkdf;
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::{
    account::{Address, PrivateKey, ViewKey, ADDRESS_PREFIX},
    config::PRIVATE_KEY_PREFIX,
    credential::{CredentialPayload, HashAlgorithm},
    engine::{
        declared_imports, ExecutionContext, ExecutionResponse, FeeSpec, KeyPair,
        OfflineQuery, Program, ProvingEngine, ProvingKey, Transaction, VerifyingKey,
    },
    error::EngineError,
    network::{NetworkClient, NetworkError, TransactionRecord},
};

const BASE58_ALPHABET: &str =
    "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
const PRIVATE_KEY_LEN: usize = 59;
const VIEW_KEY_PREFIX: &str = "AViewKey1";
const SIGNATURE_PREFIX: &str = "sign1";
const EXECUTION_PREFIX: &str = "execution1";
const RECORD_PREFIX: &str = "record1";
const PROVER_PREFIX: &str = "prover1";
const VERIFIER_PREFIX: &str = "verifier1";
const NONCE_LEN: usize = 24;

/// Base fee charged by [`MockEngine::estimate_execution_fee`], in microcredits.
pub const MOCK_BASE_FEE: u64 = 1_000;
/// Additional fee per function input, in microcredits.
pub const MOCK_FEE_PER_INPUT: u64 = 250;

fn sha256_hex(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

fn to_field(digest_hex: &str) -> Result<String, EngineError> {
    let bytes = hex::decode(&digest_hex[..32]).map_err(|e| EngineError::new(e.to_string()))?;
    let mut buf = [0u8; 16];
    buf.copy_from_slice(&bytes);
    Ok(format!("{}field", u128::from_be_bytes(buf)))
}

fn check_private_key(private_key: &PrivateKey) -> Result<&str, EngineError> {
    let key = private_key.expose_secret();
    let valid = key.len() == PRIVATE_KEY_LEN
        && key
            .strip_prefix(PRIVATE_KEY_PREFIX)
            .is_some_and(|body| body.chars().all(|c| BASE58_ALPHABET.contains(c)));
    if valid {
        Ok(key)
    } else {
        Err(EngineError::new(
            "private key must be 59 base58 characters starting with APrivateKey1",
        ))
    }
}

fn view_key_string(private_key: &PrivateKey) -> Result<String, EngineError> {
    let key = check_private_key(private_key)?;
    Ok(format!(
        "{VIEW_KEY_PREFIX}{}",
        sha256_hex(&[b"view_key", key.as_bytes()])
    ))
}

fn address_for_view_key(view_key: &str) -> Result<Address, EngineError> {
    if !view_key.starts_with(VIEW_KEY_PREFIX) {
        return Err(EngineError::new("malformed view key"));
    }
    let digest = sha256_hex(&[b"address", view_key.as_bytes()]);
    Address::parse(&format!("{ADDRESS_PREFIX}{}", &digest[..58]))
        .map_err(|e| EngineError::new(e.to_string()))
}

fn record_key(owner: &Address) -> Result<Key, EngineError> {
    let hkdf = Hkdf::<Sha256>::new(Some(b"zpass-mock-record"), owner.as_str().as_bytes());
    let mut okm = [0u8; 32];
    hkdf.expand(b"record encryption key", &mut okm)
        .map_err(|e| EngineError::new(e.to_string()))?;
    Ok(*Key::from_slice(&okm))
}

/// Claims carried inside a mock execution.
#[derive(Debug, Serialize, Deserialize)]
struct ExecutionClaims {
    program: String,
    function: String,
    verifying_key_digest: String,
    outputs: Vec<String>,
}

/// A deterministic [`ProvingEngine`] with per-operation call counters.
#[derive(Debug, Default)]
pub struct MockEngine {
    unsupported: bool,
    fail_synthesis: AtomicBool,
    fail_execution: AtomicBool,
    synthesis_delay_ms: AtomicU64,
    syntheses_in_flight: AtomicUsize,
    max_syntheses_in_flight: AtomicUsize,
    synthesize_calls: AtomicUsize,
    estimate_fee_calls: AtomicUsize,
    build_calls: AtomicUsize,
    run_calls: AtomicUsize,
    verify_calls: AtomicUsize,
    decrypt_calls: AtomicUsize,
}

impl MockEngine {
    /// An engine that supports every operation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine whose environment check fails, as if the runtime were missing.
    #[must_use]
    pub fn unsupported() -> Self {
        Self {
            unsupported: true,
            ..Self::default()
        }
    }

    /// Makes every subsequent key synthesis fail.
    pub fn set_fail_synthesis(&self, fail: bool) {
        self.fail_synthesis.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent local execution and transaction build fail.
    pub fn set_fail_execution(&self, fail: bool) {
        self.fail_execution.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent key synthesis block its thread for `delay`,
    /// like a real circuit synthesis.
    pub fn set_synthesis_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.synthesis_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Highest number of `synthesize_keys` calls observed running at the same time.
    #[must_use]
    pub fn max_concurrent_syntheses(&self) -> usize {
        self.max_syntheses_in_flight.load(Ordering::SeqCst)
    }

    /// Number of `synthesize_keys` calls, including failed ones.
    #[must_use]
    pub fn synthesize_calls(&self) -> usize {
        self.synthesize_calls.load(Ordering::SeqCst)
    }

    /// Number of `estimate_execution_fee` calls.
    #[must_use]
    pub fn estimate_fee_calls(&self) -> usize {
        self.estimate_fee_calls.load(Ordering::SeqCst)
    }

    /// Number of `build_execution_transaction` calls.
    #[must_use]
    pub fn build_calls(&self) -> usize {
        self.build_calls.load(Ordering::SeqCst)
    }

    /// Number of `run` calls.
    #[must_use]
    pub fn run_calls(&self) -> usize {
        self.run_calls.load(Ordering::SeqCst)
    }

    /// Number of `verify_execution` calls.
    #[must_use]
    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    /// Number of `decrypt_record` calls.
    #[must_use]
    pub fn decrypt_calls(&self) -> usize {
        self.decrypt_calls.load(Ordering::SeqCst)
    }

    /// Seals a record plaintext to `owner`, producing a `record1…` ciphertext.
    ///
    /// # Errors
    /// Fails only if encryption fails.
    pub fn encrypt_record(owner: &Address, plaintext: &str) -> Result<String, EngineError> {
        let cipher = XChaCha20Poly1305::new(&record_key(owner)?);
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let ciphertext = cipher
            .encrypt(
                XNonce::from_slice(&nonce_bytes),
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: owner.as_str().as_bytes(),
                },
            )
            .map_err(|e| EngineError::new(e.to_string()))?;
        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(format!("{RECORD_PREFIX}{}", hex::encode(out)))
    }

    /// The keys [`ProvingEngine::synthesize_keys`] returns for `context`.
    ///
    /// They depend on the program id, the function and the program source, not on the inputs.
    #[must_use]
    pub fn keys_for(context: ExecutionContext<'_>) -> KeyPair {
        let source_digest = sha256_hex(&[context.program.source().as_bytes()]);
        let digest = sha256_hex(&[
            context.program.id().as_bytes(),
            context.function.as_bytes(),
            source_digest.as_bytes(),
        ]);
        KeyPair {
            proving_key: ProvingKey::new(format!("{PROVER_PREFIX}{digest}")),
            verifying_key: VerifyingKey::new(format!("{VERIFIER_PREFIX}{digest}")),
        }
    }

    fn outputs(context: ExecutionContext<'_>) -> Result<Vec<String>, EngineError> {
        let mut parts: Vec<&[u8]> = vec![
            context.program.id().as_bytes(),
            context.function.as_bytes(),
        ];
        parts.extend(context.inputs.iter().map(String::as_bytes));
        Ok(vec![to_field(&sha256_hex(&parts))?])
    }

    fn check_call(
        &self,
        context: ExecutionContext<'_>,
        keys: &KeyPair,
    ) -> Result<(), EngineError> {
        if self.fail_execution.load(Ordering::SeqCst) {
            return Err(EngineError::new("execution failed"));
        }
        if !context.program.has_function(context.function) {
            return Err(EngineError::new(format!(
                "function {} not found in {}",
                context.function,
                context.program.id()
            )));
        }
        if keys != &Self::keys_for(context) {
            return Err(EngineError::new("keys do not match the program function"));
        }
        Ok(())
    }
}

impl ProvingEngine for MockEngine {
    fn check_environment(&self) -> Result<(), EngineError> {
        if self.unsupported {
            return Err(EngineError::new("proving runtime is not available"));
        }
        Ok(())
    }

    fn derive_view_key(&self, private_key: &PrivateKey) -> Result<ViewKey, EngineError> {
        view_key_string(private_key).map(ViewKey::new)
    }

    fn derive_address(&self, private_key: &PrivateKey) -> Result<Address, EngineError> {
        address_for_view_key(&view_key_string(private_key)?)
    }

    fn hash(
        &self,
        payload: &CredentialPayload,
        algorithm: HashAlgorithm,
    ) -> Result<String, EngineError> {
        let mut hasher = Sha256::new();
        hasher.update(algorithm.to_string().as_bytes());
        for (name, value) in payload.iter() {
            hasher.update(format!("{name}={value};").as_bytes());
        }
        to_field(&hex::encode(hasher.finalize()))
    }

    fn sign(&self, private_key: &PrivateKey, hash: &str) -> Result<String, EngineError> {
        if !hash.ends_with("field") {
            return Err(EngineError::new("hash must be a field element"));
        }
        let address = self.derive_address(private_key)?;
        let mut nonce = [0u8; 16];
        OsRng.fill_bytes(&mut nonce);
        let nonce = hex::encode(nonce);
        let digest = sha256_hex(&[
            address.as_str().as_bytes(),
            nonce.as_bytes(),
            hash.as_bytes(),
        ]);
        Ok(format!("{SIGNATURE_PREFIX}{nonce}{digest}"))
    }

    fn verify_signature(
        &self,
        signature: &str,
        address: &Address,
        hash: &str,
    ) -> Result<bool, EngineError> {
        let body = signature
            .strip_prefix(SIGNATURE_PREFIX)
            .filter(|body| body.len() == 96 && body.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| EngineError::new("malformed signature"))?;
        if !hash.ends_with("field") {
            return Err(EngineError::new("hash must be a field element"));
        }
        let (nonce, digest) = body.split_at(32);
        let expected = sha256_hex(&[
            address.as_str().as_bytes(),
            nonce.as_bytes(),
            hash.as_bytes(),
        ]);
        Ok(digest == expected)
    }

    fn parse_program(&self, source: &str) -> Result<Program, EngineError> {
        let mut id = None;
        let mut functions = Vec::new();
        for line in source.lines().map(str::trim) {
            if let Some(rest) = line.strip_prefix("program ") {
                let program_id = rest
                    .strip_suffix(';')
                    .map(str::trim)
                    .filter(|p| p.ends_with(".aleo"))
                    .ok_or_else(|| EngineError::new(format!("invalid program declaration: {line}")))?;
                id = Some(program_id.to_string());
            } else if let Some(rest) = line.strip_prefix("function ") {
                if let Some(name) = rest.strip_suffix(':') {
                    functions.push(name.trim().to_string());
                }
            }
        }
        let id = id.ok_or_else(|| EngineError::new("missing program declaration"))?;
        Ok(Program::new(
            id,
            source.to_string(),
            functions,
            declared_imports(source),
        ))
    }

    fn synthesize_keys(
        &self,
        context: ExecutionContext<'_>,
        private_key: Option<&PrivateKey>,
    ) -> Result<KeyPair, EngineError> {
        self.synthesize_calls.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.syntheses_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_syntheses_in_flight
            .fetch_max(in_flight, Ordering::SeqCst);
        let delay = self.synthesis_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            thread::sleep(Duration::from_millis(delay));
        }
        self.syntheses_in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_synthesis.load(Ordering::SeqCst) {
            return Err(EngineError::new("synthesis failed"));
        }
        if let Some(private_key) = private_key {
            check_private_key(private_key)?;
        }
        if !context.program.has_function(context.function) {
            return Err(EngineError::new(format!(
                "function {} not found in {}",
                context.function,
                context.program.id()
            )));
        }
        Ok(Self::keys_for(context))
    }

    fn estimate_execution_fee(
        &self,
        context: ExecutionContext<'_>,
        _keys: &KeyPair,
    ) -> Result<u64, EngineError> {
        self.estimate_fee_calls.fetch_add(1, Ordering::SeqCst);
        let inputs = u64::try_from(context.inputs.len())
            .map_err(|e| EngineError::new(e.to_string()))?;
        Ok(MOCK_BASE_FEE + MOCK_FEE_PER_INPUT * inputs)
    }

    fn build_execution_transaction(
        &self,
        context: ExecutionContext<'_>,
        keys: &KeyPair,
        private_key: &PrivateKey,
        fee: FeeSpec<'_>,
    ) -> Result<Transaction, EngineError> {
        self.build_calls.fetch_add(1, Ordering::SeqCst);
        self.check_call(context, keys)?;
        let owner = self.derive_address(private_key)?;
        let outputs = Self::outputs(context)?;

        let mut nonce = [0u8; 16];
        OsRng.fill_bytes(&mut nonce);
        let nonce = hex::encode(nonce);
        let id = format!(
            "at1{}",
            &sha256_hex(&[context.program.id().as_bytes(), nonce.as_bytes()])[..58]
        );
        let transition_id = format!(
            "au1{}",
            &sha256_hex(&[id.as_bytes(), context.function.as_bytes()])[..58]
        );
        let plaintext = format!(
            "{{ owner: {owner}.private, program: {}, function: {}, outputs: {}.private }}",
            context.program.id(),
            context.function,
            outputs.join(", "),
        );
        let record = Self::encrypt_record(&owner, &plaintext)?;

        let payload = json!({
            "type": "execute",
            "id": id,
            "execution": {
                "transitions": [{
                    "id": transition_id,
                    "program": context.program.id(),
                    "function": context.function,
                    "outputs": [
                        {"type": "private", "id": format!("{}0", transition_id), "value": outputs[0]},
                        {"type": "record", "id": format!("{}1", transition_id), "value": record},
                    ],
                }],
            },
            "fee": {
                "amount": fee.amount,
                "private": fee.private,
                "record": fee.record,
            },
        });
        let payload =
            serde_json::to_string(&payload).map_err(|e| EngineError::new(e.to_string()))?;
        Ok(Transaction { id, payload })
    }

    fn run(
        &self,
        context: ExecutionContext<'_>,
        keys: &KeyPair,
        private_key: &PrivateKey,
        _offline_query: Option<&OfflineQuery>,
    ) -> Result<ExecutionResponse, EngineError> {
        self.run_calls.fetch_add(1, Ordering::SeqCst);
        self.check_call(context, keys)?;
        check_private_key(private_key)?;
        let outputs = Self::outputs(context)?;
        let claims = ExecutionClaims {
            program: context.program.id().to_string(),
            function: context.function.to_string(),
            verifying_key_digest: sha256_hex(&[keys.verifying_key.as_str().as_bytes()]),
            outputs: outputs.clone(),
        };
        let encoded =
            serde_json::to_vec(&claims).map_err(|e| EngineError::new(e.to_string()))?;
        Ok(ExecutionResponse {
            outputs,
            execution: format!("{EXECUTION_PREFIX}{}", hex::encode(encoded)),
        })
    }

    fn verify_execution(
        &self,
        execution: &str,
        verifying_key: &VerifyingKey,
        program: &Program,
        function: &str,
    ) -> Result<bool, EngineError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        if !verifying_key.as_str().starts_with(VERIFIER_PREFIX) {
            return Err(EngineError::new("malformed verifying key"));
        }
        let encoded = execution
            .strip_prefix(EXECUTION_PREFIX)
            .ok_or_else(|| EngineError::new("malformed execution"))?;
        let bytes = hex::decode(encoded).map_err(|e| EngineError::new(e.to_string()))?;
        let claims: ExecutionClaims =
            serde_json::from_slice(&bytes).map_err(|e| EngineError::new(e.to_string()))?;

        Ok(claims.program == program.id()
            && claims.function == function
            && claims.verifying_key_digest
                == sha256_hex(&[verifying_key.as_str().as_bytes()]))
    }

    fn decrypt_record(
        &self,
        view_key: &ViewKey,
        ciphertext: &str,
    ) -> Result<String, EngineError> {
        self.decrypt_calls.fetch_add(1, Ordering::SeqCst);
        let owner = address_for_view_key(view_key.expose_secret())?;
        let bytes = ciphertext
            .strip_prefix(RECORD_PREFIX)
            .map(hex::decode)
            .transpose()
            .map_err(|e| EngineError::new(e.to_string()))?
            .filter(|bytes| bytes.len() > NONCE_LEN)
            .ok_or_else(|| EngineError::new("malformed record ciphertext"))?;
        let (nonce, sealed) = bytes.split_at(NONCE_LEN);
        let cipher = XChaCha20Poly1305::new(&record_key(&owner)?);
        let plaintext = cipher
            .decrypt(
                XNonce::from_slice(nonce),
                Payload {
                    msg: sealed,
                    aad: owner.as_str().as_bytes(),
                },
            )
            .map_err(|_| EngineError::new("record is not owned by this view key"))?;
        String::from_utf8(plaintext).map_err(|e| EngineError::new(e.to_string()))
    }
}

#[derive(Debug, Default)]
struct Ledger {
    programs: HashMap<String, String>,
    transactions: HashMap<String, TransactionRecord>,
    requested_hosts: Vec<String>,
    get_program_calls: usize,
    get_transaction_calls: usize,
    submit_calls: usize,
    fail_submit: bool,
}

/// An in-memory ledger implementing [`NetworkClient`].
///
/// Clones and [`NetworkClient::with_host`] copies share one ledger.
#[derive(Debug, Clone)]
pub struct MockNetwork {
    host: String,
    ledger: Arc<Mutex<Ledger>>,
}

impl Default for MockNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl MockNetwork {
    /// An empty ledger reachable at `https://ledger.mock`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            host: "https://ledger.mock".to_string(),
            ledger: Arc::default(),
        }
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deploys a program.
    pub fn add_program(&self, program_id: &str, source: &str) {
        self.ledger()
            .programs
            .insert(program_id.to_string(), source.to_string());
    }

    /// Stores a confirmed transaction.
    pub fn add_transaction(&self, transaction: TransactionRecord) {
        self.ledger()
            .transactions
            .insert(transaction.id.clone(), transaction);
    }

    /// Returns a stored transaction.
    #[must_use]
    pub fn transaction(&self, transaction_id: &str) -> Option<TransactionRecord> {
        self.ledger().transactions.get(transaction_id).cloned()
    }

    /// Makes every subsequent submission fail with a server error.
    pub fn set_fail_submit(&self, fail: bool) {
        self.ledger().fail_submit = fail;
    }

    /// Number of `get_program` calls, including misses.
    #[must_use]
    pub fn get_program_calls(&self) -> usize {
        self.ledger().get_program_calls
    }

    /// Number of `get_transaction` calls, including misses.
    #[must_use]
    pub fn get_transaction_calls(&self) -> usize {
        self.ledger().get_transaction_calls
    }

    /// Number of `submit_transaction` calls, including failures.
    #[must_use]
    pub fn submit_calls(&self) -> usize {
        self.ledger().submit_calls
    }

    /// Hosts that reads were addressed to, in call order.
    #[must_use]
    pub fn requested_hosts(&self) -> Vec<String> {
        self.ledger().requested_hosts.clone()
    }
}

impl NetworkClient for MockNetwork {
    fn host(&self) -> &str {
        &self.host
    }

    fn with_host(&self, host: &str) -> Self {
        Self {
            host: host.to_string(),
            ledger: Arc::clone(&self.ledger),
        }
    }

    async fn get_program(&self, program_id: &str) -> Result<String, NetworkError> {
        let mut ledger = self.ledger();
        ledger.get_program_calls += 1;
        ledger.requested_hosts.push(self.host.clone());
        ledger
            .programs
            .get(program_id)
            .cloned()
            .ok_or_else(|| NetworkError::NotFound {
                url: format!("{}/program/{program_id}", self.host),
            })
    }

    async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<TransactionRecord, NetworkError> {
        let mut ledger = self.ledger();
        ledger.get_transaction_calls += 1;
        ledger.requested_hosts.push(self.host.clone());
        ledger
            .transactions
            .get(transaction_id)
            .cloned()
            .ok_or_else(|| NetworkError::NotFound {
                url: format!("{}/transaction/{transaction_id}", self.host),
            })
    }

    async fn submit_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<String, NetworkError> {
        let url = format!("{}/transaction/broadcast", self.host);
        let mut ledger = self.ledger();
        ledger.submit_calls += 1;
        if ledger.fail_submit {
            return Err(NetworkError::Http {
                url,
                status: Some(500),
                error: "transaction rejected".to_string(),
            });
        }
        let record: TransactionRecord = serde_json::from_str(&transaction.payload)
            .map_err(|e| NetworkError::Decode {
                url,
                error: e.to_string(),
            })?;
        let id = record.id.clone();
        ledger.transactions.insert(id.clone(), record);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "APrivateKey1zkp8CZNn3yeCseEtxuVPbDCwSyhGW6yZKUYKfgXmcpoGPWH";
    const OTHER_KEY: &str = "APrivateKey1zkpJkyYRGYtkeHDaFfwsKtUJzia7csiWhfBWPXWhXJzy9Ly";

    #[test]
    fn test_rejects_non_base58_key() {
        let engine = MockEngine::new();
        let key = PrivateKey::parse("APrivateKey1zkp0CZNn3yeCseEtxuVPbDCwSyhGW6yZKUYKfgXmcpoGPWH")
            .unwrap();
        assert!(engine.derive_address(&key).is_err());
    }

    #[test]
    fn test_signature_is_bound_to_address() {
        let engine = MockEngine::new();
        let key = PrivateKey::parse(KEY).unwrap();
        let other = engine
            .derive_address(&PrivateKey::parse(OTHER_KEY).unwrap())
            .unwrap();
        let address = engine.derive_address(&key).unwrap();

        let signature = engine.sign(&key, "1field").unwrap();
        assert!(engine.verify_signature(&signature, &address, "1field").unwrap());
        assert!(!engine.verify_signature(&signature, &address, "2field").unwrap());
        assert!(!engine.verify_signature(&signature, &other, "1field").unwrap());
        assert!(engine.verify_signature("sign1zz", &address, "1field").is_err());
    }

    #[test]
    fn test_record_decrypts_only_for_owner() {
        let engine = MockEngine::new();
        let key = PrivateKey::parse(KEY).unwrap();
        let other_key = PrivateKey::parse(OTHER_KEY).unwrap();
        let owner = engine.derive_address(&key).unwrap();

        let ciphertext = MockEngine::encrypt_record(&owner, "{ owner: x }").unwrap();
        let view_key = engine.derive_view_key(&key).unwrap();
        assert_eq!(
            engine.decrypt_record(&view_key, &ciphertext).unwrap(),
            "{ owner: x }"
        );

        let other_view_key = engine.derive_view_key(&other_key).unwrap();
        assert!(engine.decrypt_record(&other_view_key, &ciphertext).is_err());
        assert!(engine.decrypt_record(&view_key, "record1nothex").is_err());
        assert_eq!(engine.decrypt_calls(), 3);
    }

    #[test]
    fn test_parse_program() {
        let engine = MockEngine::new();
        let program = engine
            .parse_program("import credits.aleo;\nprogram zpass.aleo;\n\nfunction issue:\n    input r0 as field.private;\n\nfunction revoke:\n")
            .unwrap();
        assert_eq!(program.id(), "zpass.aleo");
        assert_eq!(program.functions(), ["issue", "revoke"]);
        assert_eq!(program.imports(), ["credits.aleo"]);

        assert!(engine.parse_program("function issue:").is_err());
        assert!(engine.parse_program("program zpass;").is_err());
    }
}
