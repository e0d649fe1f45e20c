//! Authenticator data parsing
//!
//! The format is:
//! - 32 bytes: RP ID hash
//! - 1 byte: flags
//! - 4 bytes: signature counter (big-endian)
//! - variable: attested credential data (if the AT flag is set)
//! - variable: extensions, one CBOR value (if the ED flag is set)
//!
//! Nothing may follow the last present field.

use super::attested_credential::AttestedCredentialData;
use super::buffer::ByteBuffer;
use super::cbor::CborReader;
use super::errors::PasskeyError;
use crate::utils::logging::LoggingHelper;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const RP_ID_HASH_LEN: usize = 32;

/// Size of the fixed-layout prefix
pub const MIN_AUTHENTICATOR_DATA_LEN: usize = RP_ID_HASH_LEN + 1 + 4;

/// The authenticator data flags byte
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthenticatorFlags(u8);

impl AuthenticatorFlags {
    pub const USER_PRESENT: Self = Self(0x01);
    pub const USER_VERIFIED: Self = Self(0x04);
    pub const BACKUP_ELIGIBLE: Self = Self(0x08);
    pub const BACKED_UP: Self = Self(0x10);
    pub const HAS_ATTESTED_CREDENTIAL_DATA: Self = Self(0x40);
    pub const HAS_EXTENSION_DATA: Self = Self(0x80);

    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn is_user_present(self) -> bool {
        self.contains(Self::USER_PRESENT)
    }

    #[must_use]
    pub const fn is_user_verified(self) -> bool {
        self.contains(Self::USER_VERIFIED)
    }

    #[must_use]
    pub const fn is_backup_eligible(self) -> bool {
        self.contains(Self::BACKUP_ELIGIBLE)
    }

    #[must_use]
    pub const fn is_backed_up(self) -> bool {
        self.contains(Self::BACKED_UP)
    }

    #[must_use]
    pub const fn has_attested_credential_data(self) -> bool {
        self.contains(Self::HAS_ATTESTED_CREDENTIAL_DATA)
    }

    #[must_use]
    pub const fn has_extension_data(self) -> bool {
        self.contains(Self::HAS_EXTENSION_DATA)
    }
}

impl std::ops::BitOr for AuthenticatorFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl fmt::Debug for AuthenticatorFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(AuthenticatorFlags, &str); 6] = [
            (AuthenticatorFlags::USER_PRESENT, "UP"),
            (AuthenticatorFlags::USER_VERIFIED, "UV"),
            (AuthenticatorFlags::BACKUP_ELIGIBLE, "BE"),
            (AuthenticatorFlags::BACKED_UP, "BS"),
            (AuthenticatorFlags::HAS_ATTESTED_CREDENTIAL_DATA, "AT"),
            (AuthenticatorFlags::HAS_EXTENSION_DATA, "ED"),
        ];
        write!(f, "AuthenticatorFlags(0x{:02x}", self.0)?;
        for (flag, name) in NAMES {
            if self.contains(flag) {
                write!(f, " {name}")?;
            }
        }
        f.write_str(")")
    }
}

/// Parsed authenticator data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatorData {
    pub rp_id_hash: ByteBuffer,
    pub flags: AuthenticatorFlags,
    pub sign_count: u32,
    pub attested_credential_data: Option<AttestedCredentialData>,
    /// Raw CBOR encoding of the extensions map
    pub extensions: Option<ByteBuffer>,
}

impl AuthenticatorData {
    /// Parse authenticator data, which must make up all of `bytes`
    ///
    /// # Errors
    ///
    /// Returns `InvalidLength` for input under 37 bytes, `TrailingData` if
    /// bytes remain after the last present field, or the error from the
    /// attested credential data or extensions
    pub fn parse(bytes: &[u8]) -> Result<Self, PasskeyError> {
        Self::parse_fields(bytes)
            .inspect(|data| {
                LoggingHelper::log_authenticator_data_parsed(data.flags, data.sign_count);
            })
            .inspect_err(|e| LoggingHelper::log_decode_rejected("authenticator data", e))
    }

    fn parse_fields(bytes: &[u8]) -> Result<Self, PasskeyError> {
        if bytes.len() < MIN_AUTHENTICATOR_DATA_LEN {
            return Err(PasskeyError::InvalidLength {
                structure: "authenticator data",
                expected: MIN_AUTHENTICATOR_DATA_LEN,
                actual: bytes.len(),
            });
        }

        let rp_id_hash = ByteBuffer::copy_from_slice(&bytes[..RP_ID_HASH_LEN]);
        let flags = AuthenticatorFlags::from_bits(bytes[RP_ID_HASH_LEN]);
        let sign_count = u32::from_be_bytes([bytes[33], bytes[34], bytes[35], bytes[36]]);
        let mut offset = MIN_AUTHENTICATOR_DATA_LEN;

        let attested_credential_data = if flags.has_attested_credential_data() {
            let (data, consumed) = AttestedCredentialData::parse(&bytes[offset..])?;
            offset += consumed;
            Some(data)
        } else {
            None
        };

        let extensions = if flags.has_extension_data() {
            let mut reader = CborReader::new(&bytes[offset..]);
            let encoded = reader.read_encoded_value().map_err(|e| {
                PasskeyError::InvalidAuthenticatorData(format!("invalid extensions: {e}"))
            })?;
            offset += encoded.len();
            Some(ByteBuffer::copy_from_slice(encoded))
        } else {
            None
        };

        if offset != bytes.len() {
            return Err(PasskeyError::TrailingData {
                consumed: offset,
                total: bytes.len(),
            });
        }

        Ok(Self {
            rp_id_hash,
            flags,
            sign_count,
            attested_credential_data,
            extensions,
        })
    }

    /// Encode back to the wire layout
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(MIN_AUTHENTICATOR_DATA_LEN);
        out.extend_from_slice(&self.rp_id_hash);
        out.push(self.flags.bits());
        out.extend_from_slice(&self.sign_count.to_be_bytes());
        if let Some(data) = &self.attested_credential_data {
            out.extend_from_slice(&data.to_bytes());
        }
        if let Some(extensions) = &self.extensions {
            out.extend_from_slice(extensions);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passkey::CoseAlgorithm;
    use crate::testing::builders::AuthenticatorDataBuilder;
    use crate::testing::fixtures::TestKeyPair;

    fn minimal_bytes() -> Vec<u8> {
        let mut bytes = vec![0xaa; 32];
        bytes.push(0x00);
        bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x05]);
        bytes
    }

    #[test]
    fn test_minimal_authenticator_data() {
        let data = AuthenticatorData::parse(&minimal_bytes()).unwrap();
        assert_eq!(data.sign_count, 5);
        assert_eq!(data.flags.bits(), 0);
        assert_eq!(data.rp_id_hash.as_slice(), &[0xaa; 32]);
        assert!(data.attested_credential_data.is_none());
        assert!(data.extensions.is_none());
    }

    #[test]
    fn test_truncated_to_36_bytes() {
        let bytes = minimal_bytes();
        assert_eq!(
            AuthenticatorData::parse(&bytes[..36]),
            Err(PasskeyError::InvalidLength {
                structure: "authenticator data",
                expected: 37,
                actual: 36
            })
        );
        assert!(matches!(
            AuthenticatorData::parse(&[]),
            Err(PasskeyError::InvalidLength { actual: 0, .. })
        ));
    }

    #[test]
    fn test_trailing_bytes_are_rejected() {
        let mut bytes = minimal_bytes();
        bytes.push(0x00);
        assert_eq!(
            AuthenticatorData::parse(&bytes),
            Err(PasskeyError::TrailingData {
                consumed: 37,
                total: 38
            })
        );
    }

    #[test]
    fn test_trailing_bytes_after_public_key() {
        let pair = TestKeyPair::new(CoseAlgorithm::Es256);
        let mut bytes = AuthenticatorDataBuilder::new()
            .with_attested_credential(&pair)
            .build();
        bytes.extend_from_slice(&[0x01, 0x02]);
        assert!(matches!(
            AuthenticatorData::parse(&bytes),
            Err(PasskeyError::TrailingData { .. })
        ));
    }

    #[test]
    fn test_attested_credential_and_extensions() {
        let pair = TestKeyPair::new(CoseAlgorithm::Es256);
        // {"credProtect": 2}
        let extensions = vec![
            0xa1, 0x6b, b'c', b'r', b'e', b'd', b'P', b'r', b'o', b't', b'e', b'c', b't', 0x02,
        ];
        let bytes = AuthenticatorDataBuilder::new()
            .with_flags(AuthenticatorFlags::USER_PRESENT | AuthenticatorFlags::USER_VERIFIED)
            .with_sign_count(42)
            .with_attested_credential(&pair)
            .with_extensions(extensions.clone())
            .build();

        let data = AuthenticatorData::parse(&bytes).unwrap();
        assert!(data.flags.is_user_present());
        assert!(data.flags.is_user_verified());
        assert!(data.flags.has_attested_credential_data());
        assert!(data.flags.has_extension_data());
        assert_eq!(data.sign_count, 42);
        assert_eq!(data.extensions.as_deref(), Some(extensions.as_slice()));

        let credential = data.attested_credential_data.as_ref().unwrap();
        assert_eq!(
            credential.credential_public_key.algorithm(),
            CoseAlgorithm::Es256
        );

        // Re-encoding reproduces the input and parses to the same value
        assert_eq!(data.to_bytes(), bytes);
        assert_eq!(AuthenticatorData::parse(&data.to_bytes()).unwrap(), data);
    }

    #[test]
    fn test_flag_set_without_data() {
        let mut bytes = minimal_bytes();
        bytes[32] = AuthenticatorFlags::HAS_ATTESTED_CREDENTIAL_DATA.bits();
        assert!(matches!(
            AuthenticatorData::parse(&bytes),
            Err(PasskeyError::InvalidLength { .. })
        ));

        bytes[32] = AuthenticatorFlags::HAS_EXTENSION_DATA.bits();
        assert!(matches!(
            AuthenticatorData::parse(&bytes),
            Err(PasskeyError::InvalidAuthenticatorData(_))
        ));
    }

    #[test]
    fn test_extensions_without_flag_are_trailing() {
        let mut bytes = minimal_bytes();
        bytes.push(0xa0);
        assert!(matches!(
            AuthenticatorData::parse(&bytes),
            Err(PasskeyError::TrailingData { .. })
        ));
    }

    #[test]
    fn test_reserved_flag_bits_are_preserved() {
        let mut bytes = minimal_bytes();
        bytes[32] = 0x22;
        let data = AuthenticatorData::parse(&bytes).unwrap();
        assert_eq!(data.flags.bits(), 0x22);
        assert_eq!(data.to_bytes(), bytes);
    }

    #[test]
    fn test_flags_debug() {
        let flags = AuthenticatorFlags::USER_PRESENT | AuthenticatorFlags::BACKED_UP;
        assert_eq!(format!("{flags:?}"), "AuthenticatorFlags(0x11 UP BS)");
    }
}
