//! Fluent builders for creating customizable test inputs
//!
//! Each builder starts from a valid structure and lets a test change one
//! piece of it. CBOR is produced with `ciborium`, which always emits the
//! shortest header form, so only map ordering needs care.

use crate::passkey::authenticator_data::AuthenticatorFlags;
use crate::passkey::canonical::canonical_cmp;
use crate::passkey::{crypto, HashAlgorithm};
use ciborium::value::Value;

use super::constants::{TEST_AAGUID, TEST_CREDENTIAL_ID, TEST_RP_ID};
use super::fixtures::TestKeyPair;

fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

fn encode(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    ciborium::ser::into_writer(value, &mut out).expect("CBOR encoding into a Vec should succeed");
    out
}

/// Builder for COSE key maps with integer labels
///
/// Entries are emitted in canonical label order regardless of the order they
/// were added in. Setting an existing label replaces its value.
#[derive(Debug, Clone, Default)]
pub struct CoseKeyBuilder {
    entries: Vec<(i64, Value)>,
}

impl CoseKeyBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_entry(mut self, label: i64, value: Value) -> Self {
        match self.entries.iter().position(|(l, _)| *l == label) {
            Some(index) => self.entries[index].1 = value,
            None => self.entries.push((label, value)),
        }
        self
    }

    #[must_use]
    pub fn with_int(self, label: i64, value: i64) -> Self {
        self.with_entry(label, Value::Integer(value.into()))
    }

    #[must_use]
    pub fn with_bytes(self, label: i64, value: Vec<u8>) -> Self {
        self.with_entry(label, Value::Bytes(value))
    }

    #[must_use]
    pub fn without(mut self, label: i64) -> Self {
        self.entries.retain(|(existing, _)| *existing != label);
        self
    }

    /// Encode the map in canonical order
    ///
    /// # Panics
    ///
    /// Panics if CBOR encoding fails
    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let mut entries = self.entries.clone();
        entries.sort_by(|(a, _), (b, _)| canonical_cmp(*a, *b));
        let map = entries
            .into_iter()
            .map(|(label, value)| (Value::Integer(label.into()), value))
            .collect();
        encode(&Value::Map(map))
    }

    /// Encode the map in insertion order
    ///
    /// # Panics
    ///
    /// Panics if CBOR encoding fails
    #[must_use]
    pub fn build_unsorted(&self) -> Vec<u8> {
        let map = self
            .entries
            .iter()
            .map(|(label, value)| (Value::Integer((*label).into()), value.clone()))
            .collect();
        encode(&Value::Map(map))
    }
}

/// Builder for the attested credential data block
#[derive(Debug, Clone)]
pub struct AttestedCredentialDataBuilder {
    aaguid: [u8; 16],
    credential_id: Vec<u8>,
    public_key: Vec<u8>,
}

impl AttestedCredentialDataBuilder {
    /// Block carrying `pair`'s public key under the test credential ID
    #[must_use]
    pub fn new(pair: &TestKeyPair) -> Self {
        Self {
            aaguid: TEST_AAGUID,
            credential_id: TEST_CREDENTIAL_ID.to_vec(),
            public_key: pair.cose_key(),
        }
    }

    #[must_use]
    pub fn with_aaguid(mut self, aaguid: [u8; 16]) -> Self {
        self.aaguid = aaguid;
        self
    }

    #[must_use]
    pub fn with_credential_id(mut self, credential_id: Vec<u8>) -> Self {
        self.credential_id = credential_id;
        self
    }

    /// Replace the encoded public key, e.g. with malformed bytes
    #[must_use]
    pub fn with_public_key(mut self, public_key: Vec<u8>) -> Self {
        self.public_key = public_key;
        self
    }

    /// # Panics
    ///
    /// Panics if the credential ID is longer than `u16::MAX`
    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let id_len =
            u16::try_from(self.credential_id.len()).expect("Credential ID length should fit a u16");
        let mut out = Vec::with_capacity(18 + self.credential_id.len() + self.public_key.len());
        out.extend_from_slice(&self.aaguid);
        out.extend_from_slice(&id_len.to_be_bytes());
        out.extend_from_slice(&self.credential_id);
        out.extend_from_slice(&self.public_key);
        out
    }
}

/// Builder for authenticator data
///
/// The AT and ED flags are set automatically when attested credential data
/// or extensions are supplied.
#[derive(Debug, Clone)]
pub struct AuthenticatorDataBuilder {
    rp_id_hash: Vec<u8>,
    flags: AuthenticatorFlags,
    sign_count: u32,
    attested_credential_data: Option<Vec<u8>>,
    extensions: Option<Vec<u8>>,
}

impl Default for AuthenticatorDataBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthenticatorDataBuilder {
    /// User-present authenticator data for the test RP ID
    #[must_use]
    pub fn new() -> Self {
        Self {
            rp_id_hash: crypto::digest(HashAlgorithm::Sha256, TEST_RP_ID.as_bytes()),
            flags: AuthenticatorFlags::USER_PRESENT,
            sign_count: 0,
            attested_credential_data: None,
            extensions: None,
        }
    }

    #[must_use]
    pub fn with_rp_id_hash(mut self, rp_id_hash: Vec<u8>) -> Self {
        self.rp_id_hash = rp_id_hash;
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: AuthenticatorFlags) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn with_sign_count(mut self, sign_count: u32) -> Self {
        self.sign_count = sign_count;
        self
    }

    #[must_use]
    pub fn with_attested_credential(self, pair: &TestKeyPair) -> Self {
        self.with_attested_credential_bytes(AttestedCredentialDataBuilder::new(pair).build())
    }

    #[must_use]
    pub fn with_attested_credential_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.attested_credential_data = Some(bytes);
        self
    }

    /// Raw CBOR encoding of the extensions map
    #[must_use]
    pub fn with_extensions(mut self, extensions: Vec<u8>) -> Self {
        self.extensions = Some(extensions);
        self
    }

    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let mut flags = self.flags;
        if self.attested_credential_data.is_some() {
            flags = flags | AuthenticatorFlags::HAS_ATTESTED_CREDENTIAL_DATA;
        }
        if self.extensions.is_some() {
            flags = flags | AuthenticatorFlags::HAS_EXTENSION_DATA;
        }

        let mut out = self.rp_id_hash.clone();
        out.push(flags.bits());
        out.extend_from_slice(&self.sign_count.to_be_bytes());
        if let Some(data) = &self.attested_credential_data {
            out.extend_from_slice(data);
        }
        if let Some(extensions) = &self.extensions {
            out.extend_from_slice(extensions);
        }
        out
    }
}

/// Builder for attestation objects
///
/// Defaults to a `none` attestation with an empty statement and user-present
/// authenticator data. Entries are encoded in insertion order.
#[derive(Debug, Clone)]
pub struct AttestationObjectBuilder {
    entries: Vec<(Value, Value)>,
}

impl Default for AttestationObjectBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AttestationObjectBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: vec![
                (text("fmt"), text("none")),
                (text("attStmt"), Value::Map(Vec::new())),
                (
                    text("authData"),
                    Value::Bytes(AuthenticatorDataBuilder::new().build()),
                ),
            ],
        }
    }

    /// Set `key` to `value`, replacing an existing entry or appending a new one
    #[must_use]
    pub fn with_entry(mut self, key: Value, value: Value) -> Self {
        match self.entries.iter().position(|(k, _)| *k == key) {
            Some(index) => self.entries[index].1 = value,
            None => self.entries.push((key, value)),
        }
        self
    }

    #[must_use]
    pub fn with_format(self, format: &str) -> Self {
        self.with_entry(text("fmt"), text(format))
    }

    #[must_use]
    pub fn with_statement(self, statement: Value) -> Self {
        self.with_entry(text("attStmt"), statement)
    }

    #[must_use]
    pub fn with_auth_data(self, auth_data: Vec<u8>) -> Self {
        self.with_entry(text("authData"), Value::Bytes(auth_data))
    }

    /// Remove a text-keyed entry
    #[must_use]
    pub fn without(mut self, key: &str) -> Self {
        self.entries.retain(|(k, _)| k.as_text() != Some(key));
        self
    }

    /// # Panics
    ///
    /// Panics if CBOR encoding fails
    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        encode(&Value::Map(self.entries.clone()))
    }
}
