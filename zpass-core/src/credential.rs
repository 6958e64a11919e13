//! Credential payloads and the credential signer.
//!
//! A payload is an ordered list of typed attributes. Order matters: it is the
//! member order of the struct that gets hashed, and it must match the struct
//! declared by the verifying program.

use std::{fmt, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use strum::{Display, EnumString};

use crate::{
    account::{Address, PrivateKey, ADDRESS_PREFIX},
    engine::ProvingEngine,
    error::{ZPassError, ZPassResult},
};

/// Maximum length of an attribute identifier.
const MAX_IDENTIFIER_LEN: usize = 31;

/// Hash algorithms a payload can be hashed with before signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum HashAlgorithm {
    /// Poseidon over 2-element chunks. The reference algorithm for zPass programs.
    Poseidon2,
    /// Bowe-Hopwood-Pedersen over 1024-bit chunks.
    Bhp1024,
    /// SHA3-256, mapped into a field element through a BHP256 group hash.
    #[strum(serialize = "sha3_256")]
    #[serde(rename = "sha3_256")]
    Sha3_256,
    /// Keccak-256, mapped into a field element through a BHP256 group hash.
    Keccak256,
}

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    /// An account address.
    Address(Address),
    /// A base field element.
    Field(u128),
    /// A scalar field element, kept in its decimal form.
    Scalar(String),
    /// A group element, kept in its textual form.
    Group(String),
    /// A boolean.
    Boolean(bool),
    /// Unsigned 8-bit integer.
    U8(u8),
    /// Unsigned 16-bit integer.
    U16(u16),
    /// Unsigned 32-bit integer.
    U32(u32),
    /// Unsigned 64-bit integer.
    U64(u64),
    /// Unsigned 128-bit integer.
    U128(u128),
    /// Signed 8-bit integer.
    I8(i8),
    /// Signed 16-bit integer.
    I16(i16),
    /// Signed 32-bit integer.
    I32(i32),
    /// Signed 64-bit integer.
    I64(i64),
    /// Signed 128-bit integer.
    I128(i128),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(address) => write!(f, "{address}"),
            Self::Field(value) => write!(f, "{value}field"),
            Self::Scalar(value) => write!(f, "{value}scalar"),
            Self::Group(value) => write!(f, "{value}group"),
            Self::Boolean(value) => write!(f, "{value}"),
            Self::U8(value) => write!(f, "{value}u8"),
            Self::U16(value) => write!(f, "{value}u16"),
            Self::U32(value) => write!(f, "{value}u32"),
            Self::U64(value) => write!(f, "{value}u64"),
            Self::U128(value) => write!(f, "{value}u128"),
            Self::I8(value) => write!(f, "{value}i8"),
            Self::I16(value) => write!(f, "{value}i16"),
            Self::I32(value) => write!(f, "{value}i32"),
            Self::I64(value) => write!(f, "{value}i64"),
            Self::I128(value) => write!(f, "{value}i128"),
        }
    }
}

fn parse_number<T: FromStr>(attribute: &str, digits: &str, kind: &str) -> ZPassResult<T>
where
    T::Err: fmt::Display,
{
    digits.parse::<T>().map_err(|e| {
        ZPassError::invalid_input(attribute, format!("failed to parse {kind}: {e}"))
    })
}

fn is_decimal(digits: &str) -> bool {
    let digits = digits.strip_prefix('-').unwrap_or(digits);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

impl Literal {
    /// Types a string attribute value.
    ///
    /// `aleo1…` strings are addresses; a type suffix (`field`, `scalar`, `group`,
    /// `bool`, `u8`…`u128`, `i8`…`i128`) selects the literal type; anything else
    /// becomes a field through [`string_to_field`].
    ///
    /// # Errors
    /// Returns [`ZPassError::InvalidInput`] naming `attribute` if the value does not parse.
    pub fn parse(attribute: &str, value: &str) -> ZPassResult<Self> {
        if value.starts_with(ADDRESS_PREFIX) {
            return Address::parse(value)
                .map(Self::Address)
                .map_err(|e| ZPassError::invalid_input(attribute, e.to_string()));
        }

        macro_rules! integer {
            ($($suffix:literal => $variant:ident),* $(,)?) => {
                $(
                    if let Some(digits) = value.strip_suffix($suffix) {
                        if is_decimal(digits) {
                            return parse_number(attribute, digits, $suffix).map(Self::$variant);
                        }
                    }
                )*
            };
        }
        // Longer suffixes first so `u128` is never read as `…u8` with digits "12".
        integer!(
            "u128" => U128, "i128" => I128,
            "u16" => U16, "u32" => U32, "u64" => U64,
            "i16" => I16, "i32" => I32, "i64" => I64,
            "u8" => U8, "i8" => I8,
        );

        if let Some(digits) = value.strip_suffix("field") {
            return string_to_field(digits)
                .map(Self::Field)
                .map_err(|e| ZPassError::invalid_input(attribute, e.to_string()));
        }
        if let Some(digits) = value.strip_suffix("scalar") {
            if !is_decimal(digits) || digits.starts_with('-') {
                return Err(ZPassError::invalid_input(
                    attribute,
                    format!("{value} is not a scalar"),
                ));
            }
            return Ok(Self::Scalar(digits.to_string()));
        }
        if let Some(element) = value.strip_suffix("group") {
            if element.is_empty() {
                return Err(ZPassError::invalid_input(
                    attribute,
                    "empty group element",
                ));
            }
            return Ok(Self::Group(element.to_string()));
        }
        if let Some(flag) = value.strip_suffix("bool") {
            return parse_number(attribute, flag, "bool").map(Self::Boolean);
        }

        string_to_field(value)
            .map(Self::Field)
            .map_err(|e| ZPassError::invalid_input(attribute, e.to_string()))
    }

    /// Types a JSON attribute value.
    ///
    /// Strings go through [`Literal::parse`]; booleans map to booleans; integers
    /// become `u32` when they fit, else `u64`, and negatives `i64`.
    ///
    /// # Errors
    /// Returns [`ZPassError::InvalidInput`] for floats, nulls, arrays and objects.
    pub fn from_json(attribute: &str, value: &JsonValue) -> ZPassResult<Self> {
        match value {
            JsonValue::String(s) => Self::parse(attribute, s),
            JsonValue::Bool(b) => Ok(Self::Boolean(*b)),
            JsonValue::Number(n) => {
                if let Some(unsigned) = n.as_u64() {
                    Ok(u32::try_from(unsigned).map_or(Self::U64(unsigned), Self::U32))
                } else if let Some(signed) = n.as_i64() {
                    Ok(Self::I64(signed))
                } else {
                    Err(ZPassError::invalid_input(
                        attribute,
                        format!("unsupported number {n}"),
                    ))
                }
            }
            other => Err(ZPassError::invalid_input(
                attribute,
                format!("unsupported data type: {other}"),
            )),
        }
    }
}

/// Encodes a string as a field element.
///
/// Decimal strings are read as numbers. Any other string is read as the
/// big-endian integer of its UTF-8 bytes, which must fit in 128 bits
/// (at most 16 bytes).
///
/// # Errors
/// Returns [`ZPassError::InvalidInput`] if the value does not fit.
pub fn string_to_field(value: &str) -> ZPassResult<u128> {
    if let Ok(number) = value.parse::<u128>() {
        return Ok(number);
    }
    let bytes = value.as_bytes();
    if bytes.len() > 16 {
        return Err(ZPassError::invalid_input(
            "field",
            format!("string to field conversion error: {value} is longer than 16 bytes"),
        ));
    }
    Ok(bytes
        .iter()
        .fold(0u128, |acc, byte| (acc << 8) | u128::from(*byte)))
}

fn validate_identifier(name: &str) -> ZPassResult<()> {
    let mut chars = name.chars();
    let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    if !starts_with_letter
        || name.len() > MAX_IDENTIFIER_LEN
        || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ZPassError::invalid_input(
            name,
            "attribute names must be identifiers of at most 31 characters",
        ));
    }
    Ok(())
}

/// An ordered set of typed credential attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialPayload {
    attributes: Vec<(String, Literal)>,
}

impl CredentialPayload {
    /// An empty payload.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            attributes: Vec::new(),
        }
    }

    /// Appends an attribute.
    ///
    /// # Errors
    /// Returns [`ZPassError::InvalidInput`] if `name` is not an identifier or is already present.
    pub fn insert(&mut self, name: &str, value: Literal) -> ZPassResult<()> {
        validate_identifier(name)?;
        if self.get(name).is_some() {
            return Err(ZPassError::invalid_input(name, "duplicate attribute"));
        }
        self.attributes.push((name.to_string(), value));
        Ok(())
    }

    /// Builder-style [`CredentialPayload::insert`].
    ///
    /// # Errors
    /// See [`CredentialPayload::insert`].
    pub fn with(mut self, name: &str, value: Literal) -> ZPassResult<Self> {
        self.insert(name, value)?;
        Ok(self)
    }

    /// Builds a payload from a JSON object, keeping its member order.
    ///
    /// # Errors
    /// Returns [`ZPassError::InvalidInput`] if `data` is not an object or a member does not type.
    pub fn from_json(data: &JsonValue) -> ZPassResult<Self> {
        let object = data.as_object().ok_or_else(|| {
            ZPassError::invalid_input("data", "credential data must be a JSON object")
        })?;
        let mut payload = Self::new();
        for (name, value) in object {
            payload.insert(name, Literal::from_json(name, value)?)?;
        }
        Ok(payload)
    }

    /// Looks up an attribute by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Literal> {
        self.attributes
            .iter()
            .find(|(attribute, _)| attribute == name)
            .map(|(_, value)| value)
    }

    /// Attributes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Literal)> {
        self.attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Whether the payload has no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl fmt::Display for CredentialPayload {
    /// Renders the payload as a struct literal: `{ issuer: aleo1…, dob: 20000101u32 }`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{ ")?;
        for (i, (name, value)) in self.attributes.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        f.write_str(" }")
    }
}

/// A request to sign a credential.
#[derive(Debug)]
pub struct SignCredentialRequest {
    /// Attributes to sign.
    pub data: CredentialPayload,
    /// Algorithm the payload is hashed with.
    pub hash_type: HashAlgorithm,
    /// Credential subject. Appended as the `subject` attribute when the payload has none.
    pub subject: Option<Address>,
    /// Signs with this key instead of the signer's own.
    pub private_key: Option<PrivateKey>,
}

impl SignCredentialRequest {
    /// A request hashing `data` with `hash_type`, no subject, signed by the signer's key.
    #[must_use]
    pub const fn new(data: CredentialPayload, hash_type: HashAlgorithm) -> Self {
        Self {
            data,
            hash_type,
            subject: None,
            private_key: None,
        }
    }

    /// Sets the credential subject.
    #[must_use]
    pub fn with_subject(mut self, subject: Address) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Signs with `private_key` instead of the signer's key.
    #[must_use]
    pub fn with_private_key(mut self, private_key: PrivateKey) -> Self {
        self.private_key = Some(private_key);
        self
    }
}

/// A signature over the hash of a credential payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct SignatureResult {
    /// Signature over `hash`.
    pub signature: String,
    /// Hash of the payload.
    pub hash: String,
}

/// Hashes and signs credential payloads.
pub struct CredentialSigner<E> {
    engine: Arc<E>,
    private_key: Option<PrivateKey>,
}

impl<E: ProvingEngine> CredentialSigner<E> {
    /// A signer without a key of its own; every request must carry one.
    #[must_use]
    pub const fn new(engine: Arc<E>) -> Self {
        Self {
            engine,
            private_key: None,
        }
    }

    /// A signer that signs with `private_key` unless a request supplies another key.
    #[must_use]
    pub const fn with_private_key(engine: Arc<E>, private_key: PrivateKey) -> Self {
        Self {
            engine,
            private_key: Some(private_key),
        }
    }

    /// Hashes the payload with the requested algorithm and signs the hash.
    ///
    /// # Errors
    /// - [`ZPassError::NoPrivateKeyAvailable`] if neither the request nor the signer has a key.
    /// - [`ZPassError::SigningFailed`] if the engine fails to hash or sign.
    pub fn sign_credential(
        &self,
        request: SignCredentialRequest,
    ) -> ZPassResult<SignatureResult> {
        let SignCredentialRequest {
            mut data,
            hash_type,
            subject,
            private_key,
        } = request;

        let private_key = private_key
            .as_ref()
            .or(self.private_key.as_ref())
            .ok_or(ZPassError::NoPrivateKeyAvailable)?;

        if let Some(subject) = subject {
            if data.get("subject").is_none() {
                data.insert("subject", Literal::Address(subject))?;
            }
        }

        tracing::debug!(algorithm = %hash_type, attributes = data.len(), "hashing credential");
        let hash = self
            .engine
            .hash(&data, hash_type)
            .map_err(ZPassError::SigningFailed)?;
        let signature = self
            .engine
            .sign(private_key, &hash)
            .map_err(ZPassError::SigningFailed)?;

        Ok(SignatureResult { signature, hash })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use test_case::test_case;

    use super::*;
    use crate::mock::MockEngine;

    const KEY: &str = "APrivateKey1zkp8CZNn3yeCseEtxuVPbDCwSyhGW6yZKUYKfgXmcpoGPWH";
    const SUBJECT: &str = "aleo1rhgdu77hgyqd3xjj8ucu3jj9r2krwz6mnzyd80gncr5fxcwlh5rsvzp9px";

    #[test]
    fn test_string_to_field_with_valid_u128() {
        assert_eq!(string_to_field("12345").unwrap(), 12345);
    }

    #[test]
    fn test_string_to_field_with_text() {
        assert_eq!(string_to_field("American").unwrap(), 4_714_535_926_995_575_150);
        assert_eq!(
            Literal::parse("nationality", "American").unwrap().to_string(),
            "4714535926995575150field"
        );
    }

    #[test]
    fn test_string_to_field_rejects_long_text() {
        assert!(string_to_field("a string longer than sixteen bytes").is_err());
    }

    #[test_case("123field", Literal::Field(123) ; "field")]
    #[test_case("123scalar", Literal::Scalar("123".to_string()) ; "scalar")]
    #[test_case("20000101u32", Literal::U32(20_000_101) ; "u32")]
    #[test_case("255u8", Literal::U8(255) ; "u8")]
    #[test_case("12u128", Literal::U128(12) ; "u128 not u8")]
    #[test_case("-5i64", Literal::I64(-5) ; "negative i64")]
    #[test_case("truebool", Literal::Boolean(true) ; "bool")]
    #[test_case("2group", Literal::Group("2".to_string()) ; "group")]
    #[test_case("hello", Literal::Field(448_378_203_247) ; "text as field")]
    fn test_literal_parse(value: &str, expected: Literal) {
        assert_eq!(Literal::parse("attr", value).unwrap(), expected);
    }

    #[test_case("256u8" ; "u8 overflow")]
    #[test_case("-1scalar" ; "negative scalar")]
    #[test_case("aleo1!!" ; "bad address")]
    #[test_case("maybebool" ; "bad bool")]
    fn test_literal_parse_rejects(value: &str) {
        assert!(matches!(
            Literal::parse("attr", value),
            Err(ZPassError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_payload_from_json_keeps_order_and_types() {
        let payload = CredentialPayload::from_json(&json!({
            "issuer": SUBJECT,
            "subject": SUBJECT,
            "dob": 20_000_101,
            "nationality": "123field",
            "expiry": 20_000_101,
            "salt": "123scalar",
        }))
        .unwrap();

        let names: Vec<&str> = payload.iter().map(|(name, _)| name).collect();
        assert_eq!(
            names,
            vec!["issuer", "subject", "dob", "nationality", "expiry", "salt"]
        );
        assert_eq!(payload.get("dob"), Some(&Literal::U32(20_000_101)));
        assert_eq!(payload.get("nationality"), Some(&Literal::Field(123)));
        assert_eq!(
            payload.to_string(),
            format!(
                "{{ issuer: {SUBJECT}, subject: {SUBJECT}, dob: 20000101u32, nationality: 123field, expiry: 20000101u32, salt: 123scalar }}"
            )
        );
    }

    #[test]
    fn test_payload_rejects_unsupported_values() {
        assert!(CredentialPayload::from_json(&json!({ "score": 1.5 })).is_err());
        assert!(CredentialPayload::from_json(&json!({ "tags": ["a"] })).is_err());
        assert!(CredentialPayload::from_json(&json!(["not", "an", "object"])).is_err());
    }

    #[test]
    fn test_payload_rejects_bad_identifiers() {
        let mut payload = CredentialPayload::new();
        assert!(payload.insert("1abc", Literal::U8(1)).is_err());
        assert!(payload.insert("with-dash", Literal::U8(1)).is_err());
        payload.insert("name", Literal::U8(1)).unwrap();
        assert!(payload.insert("name", Literal::U8(2)).is_err());
    }

    #[test]
    fn test_sign_credential_without_key() {
        let signer = CredentialSigner::new(Arc::new(MockEngine::new()));
        let payload = CredentialPayload::new().with("key", Literal::U8(1)).unwrap();
        let result =
            signer.sign_credential(SignCredentialRequest::new(payload, HashAlgorithm::Poseidon2));
        assert!(matches!(result, Err(ZPassError::NoPrivateKeyAvailable)));
    }

    #[test]
    fn test_sign_credential_with_request_key_verifies() {
        let engine = Arc::new(MockEngine::new());
        let signer = CredentialSigner::new(engine.clone());
        let private_key = PrivateKey::parse(KEY).unwrap();
        let address = engine.derive_address(&private_key).unwrap();

        let payload = CredentialPayload::new().with("key", Literal::U8(1)).unwrap();
        let result = signer
            .sign_credential(
                SignCredentialRequest::new(payload, HashAlgorithm::Poseidon2)
                    .with_private_key(private_key),
            )
            .unwrap();

        assert!(engine
            .verify_signature(&result.signature, &address, &result.hash)
            .unwrap());
    }

    #[test]
    fn test_subject_is_appended_once() {
        let engine = Arc::new(MockEngine::new());
        let signer =
            CredentialSigner::with_private_key(engine.clone(), PrivateKey::parse(KEY).unwrap());
        let subject = Address::parse(SUBJECT).unwrap();

        let bare = CredentialPayload::new().with("dob", Literal::U32(1)).unwrap();
        let with_subject = bare
            .clone()
            .with("subject", Literal::Address(subject.clone()))
            .unwrap();

        let appended = signer
            .sign_credential(
                SignCredentialRequest::new(bare, HashAlgorithm::Bhp1024)
                    .with_subject(subject.clone()),
            )
            .unwrap();
        let explicit = signer
            .sign_credential(
                SignCredentialRequest::new(with_subject, HashAlgorithm::Bhp1024)
                    .with_subject(subject),
            )
            .unwrap();

        assert_eq!(appended.hash, explicit.hash);
    }

    #[test]
    fn test_hash_algorithm_names() {
        assert_eq!(HashAlgorithm::Sha3_256.to_string(), "sha3_256");
        assert_eq!(
            HashAlgorithm::from_str("poseidon2").unwrap(),
            HashAlgorithm::Poseidon2
        );
        assert_eq!(
            serde_json::to_string(&HashAlgorithm::Keccak256).unwrap(),
            "\"keccak256\""
        );
    }
}
