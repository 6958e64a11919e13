//! The Issuer is the main component with which credential issuers interact with zPass.
//!
//! An [`Issuer`] holds an [`Account`], a proving engine, a network client and a
//! [`KeyCache`]. It signs credentials, proves program executions on-chain or
//! locally, and retrieves the records those executions produce. Verification
//! needs no account and lives in [`Verifier`].

use std::sync::Arc;

use secrecy::ExposeSecret;
use tokio::sync::Mutex;

use crate::{
    account::{Account, Address},
    config::{validate_host, SdkOptions},
    credential::{CredentialSigner, SignCredentialRequest, SignatureResult},
    blocking::{spawn_engine, EngineCall},
    engine::{KeyPair, Program, ProgramImports, ProvingEngine},
    error::{ZPassError, ZPassResult},
    key_cache::{CacheKey, CacheStats, EvictionPolicy, KeyCache},
    network::{AleoNetworkClient, NetworkClient},
    verifier::Verifier,
};

mod off_chain;
mod on_chain;
mod record;

pub use off_chain::{ProofResult, ProveOffChainRequest};
pub use on_chain::{credential_inputs, ProveOnChainRequest};

/// Signs credentials and proves their issuance.
///
/// Each issuer owns its key cache; instances share nothing. Key synthesis is
/// serialized per issuer: the cache lock is held while keys are synthesized.
/// Engine calls run on tokio's blocking pool, so every async method must be
/// polled inside a tokio runtime.
pub struct Issuer<E, N = AleoNetworkClient> {
    account: Account,
    engine: Arc<E>,
    network: N,
    cache: Arc<Mutex<KeyCache>>,
}

impl<E: ProvingEngine> Issuer<E, AleoNetworkClient> {
    /// Initializes an issuer talking to the explorer configured in `options`.
    ///
    /// # Errors
    /// - [`ZPassError::InvalidKeyFormat`] if the key does not start with `APrivateKey1`.
    /// - [`ZPassError::InvalidInput`] if the network settings are invalid.
    /// - [`ZPassError::UnsupportedEnvironment`] if the engine cannot run here.
    /// - [`ZPassError::InvalidKey`] if the engine rejects the key.
    pub fn new(engine: Arc<E>, options: SdkOptions) -> ZPassResult<Self> {
        options.validate()?;
        let network = AleoNetworkClient::new(&options.network)?;
        Self::with_network_client(engine, options, network)
    }
}

impl<E: ProvingEngine, N: NetworkClient> Issuer<E, N> {
    /// Initializes an issuer using a caller-supplied network client.
    ///
    /// `options.network` is validated but otherwise unused.
    ///
    /// # Errors
    /// Same as [`Issuer::new`].
    pub fn with_network_client(
        engine: Arc<E>,
        options: SdkOptions,
        network: N,
    ) -> ZPassResult<Self> {
        options.validate()?;
        let account =
            Account::from_private_key(engine.as_ref(), options.private_key.expose_secret())?;
        let policy: Box<dyn EvictionPolicy> = options.cache_policy.into();
        tracing::info!(address = %account.address(), host = network.host(), "issuer initialized");
        Ok(Self {
            account,
            engine,
            network,
            cache: Arc::new(Mutex::new(KeyCache::with_policy(policy))),
        })
    }

    /// Replaces the key cache with an empty one using `policy`.
    #[must_use]
    pub fn with_eviction_policy(mut self, policy: Box<dyn EvictionPolicy>) -> Self {
        self.cache = Arc::new(Mutex::new(KeyCache::with_policy(policy)));
        self
    }

    /// The account this issuer acts as.
    #[must_use]
    pub const fn account(&self) -> &Account {
        &self.account
    }

    /// The account's public address.
    #[must_use]
    pub const fn address(&self) -> &Address {
        self.account.address()
    }

    /// The network client in use.
    #[must_use]
    pub const fn network(&self) -> &N {
        &self.network
    }

    /// The proving engine in use.
    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Points later network calls at `host`. The key cache is untouched.
    ///
    /// # Errors
    /// Returns [`ZPassError::InvalidInput`] if `host` is not an absolute `http(s)` URL.
    pub fn set_host(&mut self, host: &str) -> ZPassResult<()> {
        validate_host(host, true)?;
        self.network = self.network.with_host(host);
        tracing::debug!(host, "host updated");
        Ok(())
    }

    /// A signer that signs with this issuer's account key.
    #[must_use]
    pub fn signer(&self) -> CredentialSigner<E> {
        CredentialSigner::with_private_key(
            Arc::clone(&self.engine),
            self.account.private_key().clone(),
        )
    }

    /// Signs a credential with the account key unless the request carries its own.
    ///
    /// # Errors
    /// See [`CredentialSigner::sign_credential`].
    pub fn sign_credential(
        &self,
        request: SignCredentialRequest,
    ) -> ZPassResult<SignatureResult> {
        self.signer().sign_credential(request)
    }

    /// A verifier sharing this issuer's engine and network client.
    #[must_use]
    pub fn verifier(&self) -> Verifier<E, N> {
        Verifier::with_network_client(Arc::clone(&self.engine), self.network.clone())
    }

    /// Counters of the key cache.
    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.lock().await.stats()
    }

    /// Cache key of the most recently synthesized keys still held.
    pub async fn active_cache_key(&self) -> Option<CacheKey> {
        self.cache.lock().await.active_key().cloned()
    }

    /// Returns the keys for `function` of `program`, synthesizing them on a cache miss.
    ///
    /// Keys are cached under `program_id:function` and only reused for the exact
    /// program source they were synthesized from.
    ///
    /// # Errors
    /// Returns [`ZPassError::KeySynthesisFailed`] if synthesis fails; the cache is left unchanged.
    pub async fn ensure_keys(
        &self,
        program: &Program,
        function: &str,
        inputs: &[String],
        imports: &ProgramImports,
    ) -> ZPassResult<KeyPair> {
        let call = EngineCall::new(
            program.clone(),
            function.to_string(),
            inputs.to_vec(),
            imports.clone(),
        );
        self.keys_for(&call).await
    }

    /// The cache guard travels with the synthesis task: if the caller stops
    /// waiting, the lock is held until synthesis ends and the finished keys
    /// are still cached.
    pub(crate) async fn keys_for(&self, call: &Arc<EngineCall>) -> ZPassResult<KeyPair> {
        let cache_key = CacheKey::new(call.program.id(), &call.function);
        let mut cache = Arc::clone(&self.cache).lock_owned().await;
        if let Some(keys) = cache.get(&cache_key, call.program.source()) {
            tracing::debug!(%cache_key, "using cached keys");
            return Ok(keys);
        }

        tracing::info!(%cache_key, "synthesizing keys");
        let call = Arc::clone(call);
        let private_key = self.account.private_key().clone();
        spawn_engine(&self.engine, move |engine| {
            let keys = engine.synthesize_keys(call.context(), Some(&private_key))?;
            cache.insert(cache_key, call.program.source(), keys.clone());
            Ok(keys)
        })
        .await
        .map_err(ZPassError::KeySynthesisFailed)
    }

    fn load_program(&self, source: &str, function: &str) -> ZPassResult<Program> {
        let program = self
            .engine
            .parse_program(source)
            .map_err(ZPassError::ProgramParseError)?;
        if !program.has_function(function) {
            return Err(ZPassError::FunctionNotFound {
                program: program.id().to_string(),
                function: function.to_string(),
            });
        }
        Ok(program)
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::{
        config::CachePolicy,
        engine::ExecutionContext,
        mock::{MockEngine, MockNetwork},
    };

    const KEY: &str = "APrivateKey1zkp8CZNn3yeCseEtxuVPbDCwSyhGW6yZKUYKfgXmcpoGPWH";

    fn issuer(engine: &Arc<MockEngine>) -> Issuer<MockEngine, MockNetwork> {
        Issuer::with_network_client(Arc::clone(engine), SdkOptions::new(KEY), MockNetwork::new())
            .unwrap()
    }

    fn program(engine: &MockEngine, id: &str) -> Program {
        engine
            .parse_program(&format!("program {id};\n\nfunction issue:\n"))
            .unwrap()
    }

    fn issue_keys(program: &Program, imports: &ProgramImports) -> KeyPair {
        MockEngine::keys_for(ExecutionContext {
            program,
            function: "issue",
            inputs: &[],
            imports,
        })
    }

    #[test]
    fn test_invalid_prefix_constructs_nothing() {
        let engine = Arc::new(MockEngine::unsupported());
        let result = Issuer::with_network_client(
            engine,
            SdkOptions::new("invalid_private_key"),
            MockNetwork::new(),
        );
        assert!(matches!(result, Err(ZPassError::InvalidKeyFormat { .. })));
    }

    #[test]
    fn test_new_rejects_insecure_host() {
        let options = SdkOptions::new(KEY).with_host("http://127.0.0.1:3030");
        let result = Issuer::new(Arc::new(MockEngine::new()), options);
        assert!(matches!(result, Err(ZPassError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_ensure_keys_hits_cache_for_same_program() {
        let engine = Arc::new(MockEngine::new());
        let issuer = issuer(&engine);
        let program = program(&engine, "a.aleo");

        let first = issuer
            .ensure_keys(&program, "issue", &[], &ProgramImports::new())
            .await
            .unwrap();
        let second = issuer
            .ensure_keys(&program, "issue", &[], &ProgramImports::new())
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(engine.synthesize_calls(), 1);
        assert_eq!(issuer.cache_stats().await.hits, 1);
    }

    #[tokio::test]
    async fn test_ensure_keys_single_slot_resynthesizes_after_switch() {
        let engine = Arc::new(MockEngine::new());
        let issuer = issuer(&engine);
        let a = program(&engine, "a.aleo");
        let b = program(&engine, "b.aleo");
        let imports = ProgramImports::new();

        issuer.ensure_keys(&a, "issue", &[], &imports).await.unwrap();
        issuer.ensure_keys(&b, "issue", &[], &imports).await.unwrap();
        issuer.ensure_keys(&a, "issue", &[], &imports).await.unwrap();

        assert_eq!(engine.synthesize_calls(), 3);
        assert_eq!(
            issuer.active_cache_key().await,
            Some(CacheKey::new("a.aleo", "issue"))
        );
    }

    #[tokio::test]
    async fn test_ensure_keys_unbounded_retains_both_programs() {
        let engine = Arc::new(MockEngine::new());
        let issuer = Issuer::with_network_client(
            Arc::clone(&engine),
            SdkOptions::new(KEY).with_cache_policy(CachePolicy::Unbounded),
            MockNetwork::new(),
        )
        .unwrap();
        let a = program(&engine, "a.aleo");
        let b = program(&engine, "b.aleo");
        let imports = ProgramImports::new();

        issuer.ensure_keys(&a, "issue", &[], &imports).await.unwrap();
        issuer.ensure_keys(&b, "issue", &[], &imports).await.unwrap();
        issuer.ensure_keys(&a, "issue", &[], &imports).await.unwrap();

        assert_eq!(engine.synthesize_calls(), 2);
    }

    #[tokio::test]
    async fn test_ensure_keys_failure_leaves_cache_unchanged() {
        let engine = Arc::new(MockEngine::new());
        let issuer = issuer(&engine);
        let a = program(&engine, "a.aleo");
        let b = program(&engine, "b.aleo");
        let imports = ProgramImports::new();

        issuer.ensure_keys(&a, "issue", &[], &imports).await.unwrap();
        engine.set_fail_synthesis(true);
        let result = issuer.ensure_keys(&b, "issue", &[], &imports).await;
        assert!(matches!(result, Err(ZPassError::KeySynthesisFailed(_))));

        engine.set_fail_synthesis(false);
        issuer.ensure_keys(&a, "issue", &[], &imports).await.unwrap();
        assert_eq!(engine.synthesize_calls(), 2);
        assert_eq!(
            issuer.active_cache_key().await,
            Some(CacheKey::new("a.aleo", "issue"))
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_syntheses_are_serialized() {
        let engine = Arc::new(MockEngine::new());
        engine.set_synthesis_delay(Duration::from_millis(100));
        let issuer = issuer(&engine);
        let a = program(&engine, "a.aleo");
        let b = program(&engine, "b.aleo");
        let imports = ProgramImports::new();

        let (keys_a, keys_b) = tokio::join!(
            issuer.ensure_keys(&a, "issue", &[], &imports),
            issuer.ensure_keys(&b, "issue", &[], &imports),
        );

        assert_eq!(keys_a.unwrap(), issue_keys(&a, &imports));
        assert_eq!(keys_b.unwrap(), issue_keys(&b, &imports));
        assert_eq!(engine.synthesize_calls(), 2);
        assert_eq!(engine.max_concurrent_syntheses(), 1);
        // b queued behind a and finished last
        assert_eq!(
            issuer.active_cache_key().await,
            Some(CacheKey::new("b.aleo", "issue"))
        );
    }

    #[tokio::test]
    async fn test_timeout_fires_during_slow_synthesis() {
        let engine = Arc::new(MockEngine::new());
        engine.set_synthesis_delay(Duration::from_millis(500));
        let issuer = issuer(&engine);
        let a = program(&engine, "a.aleo");
        let imports = ProgramImports::new();

        let started = Instant::now();
        let result = tokio::time::timeout(
            Duration::from_millis(50),
            issuer.ensure_keys(&a, "issue", &[], &imports),
        )
        .await;
        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_millis(400));

        // the abandoned synthesis finishes under the cache lock and is kept
        engine.set_synthesis_delay(Duration::ZERO);
        let keys = issuer.ensure_keys(&a, "issue", &[], &imports).await.unwrap();
        assert_eq!(keys, issue_keys(&a, &imports));
        assert_eq!(engine.synthesize_calls(), 1);
        assert_eq!(engine.max_concurrent_syntheses(), 1);
    }

    #[tokio::test]
    async fn test_set_host_keeps_cache() {
        let engine = Arc::new(MockEngine::new());
        let mut issuer = issuer(&engine);
        let a = program(&engine, "a.aleo");
        let imports = ProgramImports::new();
        issuer.ensure_keys(&a, "issue", &[], &imports).await.unwrap();

        issuer.set_host("https://other.node").unwrap();
        assert_eq!(issuer.network().host(), "https://other.node");
        assert!(matches!(
            issuer.set_host("not a url"),
            Err(ZPassError::InvalidInput { .. })
        ));

        issuer.ensure_keys(&a, "issue", &[], &imports).await.unwrap();
        assert_eq!(engine.synthesize_calls(), 1);
    }

    #[test]
    fn test_signature_verifies_against_issuer_address() {
        let engine = Arc::new(MockEngine::new());
        let issuer = issuer(&engine);
        let payload = crate::credential::CredentialPayload::new()
            .with("key", crate::credential::Literal::Field(1))
            .unwrap();

        let signed = issuer
            .sign_credential(SignCredentialRequest::new(
                payload,
                crate::credential::HashAlgorithm::Poseidon2,
            ))
            .unwrap();

        assert!(issuer
            .verifier()
            .verify_credential_signature(&signed, issuer.address())
            .unwrap());
    }
}
