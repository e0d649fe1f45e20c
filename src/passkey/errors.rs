//! Passkey error types
//!
//! Every decode and verify entry point in this crate reports failures through
//! [`PasskeyError`]. Low-level CBOR and crypto errors are mapped into it at the
//! boundary of the parser that observed them, so callers only ever see the
//! variants below.

use thiserror::Error;

/// Errors raised while decoding or verifying passkey credential data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasskeyError {
    /// The CBOR encoding itself is broken or not in the required form
    #[error("Malformed CBOR: {0}")]
    MalformedCbor(String),

    /// A COSE key map did not contain the label expected at this position.
    /// `None` stands for the end of the map on either side.
    #[error("Expected COSE label {}, found {}", describe_label(.expected), describe_label(.found))]
    UnexpectedLabel {
        expected: Option<i64>,
        found: Option<i64>,
    },

    /// Bytes remained after a structure was fully decoded
    #[error("The authenticator data had an invalid format: {consumed} of {total} bytes consumed")]
    TrailingData { consumed: usize, total: usize },

    /// Input shorter than the minimum size of the structure being decoded
    #[error(
        "The {structure} had an invalid byte count of {actual} (expected at least {expected})"
    )]
    InvalidLength {
        structure: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Credential ID length prefix above the 1023 byte ceiling
    #[error("Expected the credential ID to be at most 1023 bytes long, but got {0}")]
    InvalidCredentialIdLength(usize),

    #[error("The authenticator data had an invalid format: {0}")]
    InvalidAuthenticatorData(String),

    #[error("The attestation object had an invalid format: {0}")]
    InvalidAttestationObject(String),

    #[error("The attestation object did not include an attestation statement format")]
    MissingAttestationStatementFormat,

    #[error("The attestation object did not include an attestation statement")]
    MissingAttestationStatement,

    #[error("The attestation object did not include authenticator data")]
    MissingAuthenticatorData,

    #[error("The COSE key type {0} is not supported")]
    UnsupportedKeyType(i64),

    #[error("The curve {curve} is not supported for COSE key type {key_type}")]
    UnsupportedCurve { key_type: i64, curve: i64 },

    /// The COSE key carries private key components
    #[error("The credential public key contains private key material")]
    PrivateKeyDetected,

    #[error(
        "The credential public key algorithm {0} does not match any of the supported algorithms"
    )]
    UnsupportedAlgorithm(i64),

    #[error("The credential public key had an invalid format: {0}")]
    InvalidCredentialPublicKey(String),

    /// Algorithm is known but not permitted by the configured policy
    #[error("The credential public key algorithm {0} is not allowed by the credential policy")]
    DisallowedAlgorithm(i64),

    #[error("The authenticator data flags violate the backup policy: {0}")]
    BackupPolicyViolation(String),

    #[error("The authenticator data did not include attested credential data")]
    MissingAttestedCredentialData,

    /// Invalid settings
    #[error("Configuration error: {0}")]
    Configuration(String),
}

fn describe_label(found: &Option<i64>) -> String {
    found.map_or_else(|| "end of map".to_string(), |label| label.to_string())
}

impl PasskeyError {
    /// Whether this error already carries a specific decode/verify kind.
    ///
    /// Parsers wrap everything else into their own generic variant when an
    /// error crosses their boundary.
    #[must_use]
    pub fn is_domain_specific(&self) -> bool {
        !matches!(self, Self::MalformedCbor(_) | Self::Configuration(_))
    }

    /// Wrap a non-specific error as an invalid credential public key
    pub(crate) fn into_public_key_error(self) -> Self {
        if self.is_domain_specific() {
            self
        } else {
            Self::InvalidCredentialPublicKey(self.to_string())
        }
    }

    /// Wrap a non-specific error as an invalid attestation object
    pub(crate) fn into_attestation_error(self) -> Self {
        if self.is_domain_specific() {
            self
        } else {
            Self::InvalidAttestationObject(self.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_cbor_is_wrapped_once() {
        let wrapped = PasskeyError::MalformedCbor("bad header".to_string()).into_public_key_error();
        assert_eq!(
            wrapped,
            PasskeyError::InvalidCredentialPublicKey("Malformed CBOR: bad header".to_string())
        );

        // A second pass leaves the domain error alone
        assert_eq!(wrapped.clone().into_public_key_error(), wrapped);
    }

    #[test]
    fn test_domain_errors_pass_through() {
        assert_eq!(
            PasskeyError::PrivateKeyDetected.into_public_key_error(),
            PasskeyError::PrivateKeyDetected
        );
        assert_eq!(
            PasskeyError::MissingAuthenticatorData.into_attestation_error(),
            PasskeyError::MissingAuthenticatorData
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            PasskeyError::InvalidCredentialIdLength(1024).to_string(),
            "Expected the credential ID to be at most 1023 bytes long, but got 1024"
        );
        assert_eq!(
            PasskeyError::UnexpectedLabel {
                expected: Some(3),
                found: None
            }
            .to_string(),
            "Expected COSE label 3, found end of map"
        );
        assert_eq!(
            PasskeyError::UnexpectedLabel {
                expected: None,
                found: Some(-4)
            }
            .to_string(),
            "Expected COSE label end of map, found -4"
        );
        assert_eq!(
            PasskeyError::InvalidLength {
                structure: "authenticator data",
                expected: 37,
                actual: 0
            }
            .to_string(),
            "The authenticator data had an invalid byte count of 0 (expected at least 37)"
        );
    }
}
