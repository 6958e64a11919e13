//! Common test utilities shared across integration tests.

#![allow(dead_code, missing_docs)]

use std::sync::Arc;

use serde_json::json;
use zpass_core::{
    mock::{MockEngine, MockNetwork},
    CredentialPayload, Issuer, SdkOptions,
};

pub const PRIVATE_KEY: &str = "APrivateKey1zkp8CZNn3yeCseEtxuVPbDCwSyhGW6yZKUYKfgXmcpoGPWH";
pub const OTHER_PRIVATE_KEY: &str =
    "APrivateKey1zkpJkyYRGYtkeHDaFfwsKtUJzia7csiWhfBWPXWhXJzy9Ly";
pub const SUBJECT: &str = "aleo1rhgdu77hgyqd3xjj8ucu3jj9r2krwz6mnzyd80gncr5fxcwlh5rsvzp9px";

pub const ZPASS_PROGRAM_ID: &str = "verify_poseidon2_zpass.aleo";

pub const ZPASS_PROGRAM: &str = r"import zpass_credential.aleo;
program verify_poseidon2_zpass.aleo;

record ZPass:
    owner as address.private;
    issuer as address.private;
    dob as u32.private;
    nationality as field.private;
    expiry as u32.private;

function issue:
    input r0 as signature.private;
    input r1 as zpass_credential.aleo/Credential.private;
    output r2 as ZPass.record;
";

pub const CREDENTIAL_PROGRAM: &str = r"import credits.aleo;
program zpass_credential.aleo;

struct Credential:
    issuer as address;
    subject as address;
    dob as u32;
    nationality as field;
    expiry as u32;
    salt as scalar;

function noop:
";

pub const CREDITS_PROGRAM: &str = r"program credits.aleo;

function transfer_public:
    input r0 as address.public;
    input r1 as u64.public;
";

pub const LOCAL_PROGRAM: &str = r"program verify_poseidon2.aleo;

function verify:
    input r0 as u32.private;
    input r1 as u32.public;
    output r2 as boolean.public;
";

/// Initializes tracing for a test run; safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// A ledger with the zPass issuance program and its imports deployed.
pub fn ledger() -> MockNetwork {
    let network = MockNetwork::new();
    network.add_program(ZPASS_PROGRAM_ID, ZPASS_PROGRAM);
    network.add_program("zpass_credential.aleo", CREDENTIAL_PROGRAM);
    network.add_program("credits.aleo", CREDITS_PROGRAM);
    network
}

pub struct TestIssuer {
    pub engine: Arc<MockEngine>,
    pub network: MockNetwork,
    pub issuer: Issuer<MockEngine, MockNetwork>,
}

pub fn issuer() -> TestIssuer {
    init_tracing();
    let engine = Arc::new(MockEngine::new());
    let network = ledger();
    let issuer = Issuer::with_network_client(
        Arc::clone(&engine),
        SdkOptions::new(PRIVATE_KEY),
        network.clone(),
    )
    .expect("issuer should initialize");
    TestIssuer {
        engine,
        network,
        issuer,
    }
}

/// The credential of the reference issuance scenario.
pub fn credential(issuer: &str) -> CredentialPayload {
    CredentialPayload::from_json(&json!({
        "issuer": issuer,
        "subject": SUBJECT,
        "dob": 20_000_101,
        "nationality": "123field",
        "expiry": 20_000_101,
        "salt": "123scalar",
    }))
    .expect("credential should type")
}
