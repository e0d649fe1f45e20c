//! Passkey credential decoding
//!
//! This module decodes the binary structures produced by `WebAuthn`
//! authenticators during registration and authentication, and verifies
//! assertion signatures with the decoded credential public key.
//!
//! ## Organization
//!
//! - [`cbor`] and [`canonical`] - CBOR readers; the canonical cursor enforces
//!   the strict ordering COSE keys must follow
//! - [`public_key`] - COSE credential public keys and signature verification
//! - [`attested_credential`], [`authenticator_data`], [`attestation`] - the
//!   registration structures that embed them
//! - [`policy`] and [`settings`] - relying party acceptance rules

pub mod attestation;
pub mod attested_credential;
pub mod authenticator_data;
pub mod buffer;
pub mod canonical;
pub mod cbor;
pub mod cose;
pub mod crypto;
mod errors;
pub mod policy;
pub mod public_key;
mod settings;

pub use attestation::AttestationObject;
pub use attested_credential::AttestedCredentialData;
pub use authenticator_data::{AuthenticatorData, AuthenticatorFlags};
pub use buffer::ByteBuffer;
pub use cose::{CoseAlgorithm, CoseCurve, CoseKeyType, HashAlgorithm};
pub use crypto::KeyMaterial;
pub use errors::PasskeyError;
pub use policy::CredentialPolicy;
pub use public_key::CredentialPublicKey;
pub use settings::{CredentialBackupPolicy, PasskeySettings};

/// Parse an attestation object
///
/// # Errors
///
/// See [`AttestationObject::parse`]
pub fn parse_attestation_object(bytes: &[u8]) -> Result<AttestationObject, PasskeyError> {
    AttestationObject::parse(bytes)
}

/// Parse authenticator data
///
/// # Errors
///
/// See [`AuthenticatorData::parse`]
pub fn parse_authenticator_data(bytes: &[u8]) -> Result<AuthenticatorData, PasskeyError> {
    AuthenticatorData::parse(bytes)
}

/// Decode a COSE credential public key
///
/// # Errors
///
/// See [`CredentialPublicKey::decode`]
pub fn decode_credential_public_key(bytes: &[u8]) -> Result<CredentialPublicKey, PasskeyError> {
    CredentialPublicKey::decode(bytes)
}
