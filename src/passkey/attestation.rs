//! Attestation object parsing
//!
//! The attestation object returned at registration is a CBOR map:
//!
//! ```text
//! {
//!   "fmt": text,          attestation statement format
//!   "attStmt": any,       format-specific statement, kept as raw CBOR
//!   "authData": bytes,    authenticator data
//! }
//! ```
//!
//! Other keys are skipped so that new fields do not break parsing.

use super::authenticator_data::AuthenticatorData;
use super::buffer::ByteBuffer;
use super::cbor::CborReader;
use super::errors::PasskeyError;
use crate::utils::logging::LoggingHelper;
use ciborium_ll::Header;

/// Decoded attestation object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationObject {
    pub format: String,
    /// Raw CBOR encoding of `attStmt`
    pub attestation_statement: ByteBuffer,
    pub authenticator_data: ByteBuffer,
}

impl AttestationObject {
    /// Parse an attestation object that makes up all of `bytes`
    ///
    /// # Errors
    ///
    /// Returns `MissingAttestationStatementFormat`,
    /// `MissingAttestationStatement` or `MissingAuthenticatorData` naming an
    /// absent field, and `InvalidAttestationObject` for any other problem
    pub fn parse(bytes: &[u8]) -> Result<Self, PasskeyError> {
        Self::parse_map(bytes)
            .map_err(PasskeyError::into_attestation_error)
            .inspect(|object| {
                LoggingHelper::log_attestation_parsed(
                    &object.format,
                    object.authenticator_data.len(),
                );
            })
            .inspect_err(|e| LoggingHelper::log_decode_rejected("attestation object", e))
    }

    fn parse_map(bytes: &[u8]) -> Result<Self, PasskeyError> {
        let mut reader = CborReader::new(bytes);
        let entries = reader.read_map_start()?;

        let mut format = None;
        let mut attestation_statement = None;
        let mut authenticator_data = None;

        let mut index = 0;
        loop {
            match entries {
                Some(count) if index == count => break,
                None if reader.try_read_break()? => break,
                _ => {}
            }
            index += 1;

            // Keys of any type are allowed; only text keys can be ours
            let (key_header, key_width) = reader.read_header()?;
            let key = match key_header {
                Header::Text(len) => Some(reader.read_text_body(len)?),
                other => {
                    reader.skip_rest(other, key_width, false)?;
                    None
                }
            };

            match key.as_deref() {
                Some("fmt") => format = Some(reader.read_text_string()?),
                Some("attStmt") => {
                    attestation_statement =
                        Some(ByteBuffer::copy_from_slice(reader.read_encoded_value()?));
                }
                Some("authData") => {
                    authenticator_data = Some(ByteBuffer::from(reader.read_byte_string()?));
                }
                _ => reader.skip_value()?,
            }
        }

        if reader.bytes_remaining() != 0 {
            return Err(PasskeyError::InvalidAttestationObject(format!(
                "{} unexpected bytes after the map",
                reader.bytes_remaining()
            )));
        }

        Ok(Self {
            format: format.ok_or(PasskeyError::MissingAttestationStatementFormat)?,
            attestation_statement: attestation_statement
                .ok_or(PasskeyError::MissingAttestationStatement)?,
            authenticator_data: authenticator_data.ok_or(PasskeyError::MissingAuthenticatorData)?,
        })
    }

    /// Parse the embedded authenticator data
    ///
    /// # Errors
    ///
    /// Returns the authenticator data parsing error
    pub fn parse_authenticator_data(&self) -> Result<AuthenticatorData, PasskeyError> {
        AuthenticatorData::parse(&self.authenticator_data)
    }
}
