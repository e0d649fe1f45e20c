//! Attested credential data
//!
//! Layout inside authenticator data:
//!
//! - 16 bytes: AAGUID
//! - 2 bytes: credential ID length `L`, big-endian
//! - `L` bytes: credential ID
//! - variable: COSE credential public key

use super::buffer::ByteBuffer;
use super::errors::PasskeyError;
use super::public_key::CredentialPublicKey;

pub const AAGUID_LEN: usize = 16;

/// Largest credential ID WebAuthn allows
pub const MAX_CREDENTIAL_ID_LEN: usize = 1023;

const HEADER_LEN: usize = AAGUID_LEN + 2;

/// Credential created by the authenticator during registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestedCredentialData {
    pub aaguid: ByteBuffer,
    pub credential_id: ByteBuffer,
    pub credential_public_key: CredentialPublicKey,
}

impl AttestedCredentialData {
    /// Parse the block at the start of `bytes`.
    ///
    /// Returns the data and the number of bytes it occupied, so the caller
    /// can continue with whatever follows the public key.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLength` if the input is too short,
    /// `InvalidCredentialIdLength` for an ID length above 1023, or the public
    /// key decoding error
    pub fn parse(bytes: &[u8]) -> Result<(Self, usize), PasskeyError> {
        if bytes.len() < HEADER_LEN {
            return Err(PasskeyError::InvalidLength {
                structure: "attested credential data",
                expected: HEADER_LEN,
                actual: bytes.len(),
            });
        }

        let aaguid = ByteBuffer::copy_from_slice(&bytes[..AAGUID_LEN]);
        let id_len = usize::from(u16::from_be_bytes([bytes[AAGUID_LEN], bytes[AAGUID_LEN + 1]]));
        if id_len > MAX_CREDENTIAL_ID_LEN {
            return Err(PasskeyError::InvalidCredentialIdLength(id_len));
        }

        let id_end = HEADER_LEN + id_len;
        let credential_id = bytes
            .get(HEADER_LEN..id_end)
            .map(ByteBuffer::copy_from_slice)
            .ok_or(PasskeyError::InvalidLength {
                structure: "attested credential data",
                expected: id_end,
                actual: bytes.len(),
            })?;

        let credential_public_key = CredentialPublicKey::decode(&bytes[id_end..])?;
        let consumed = id_end + credential_public_key.encoded_len();

        Ok((
            Self {
                aaguid,
                credential_id,
                credential_public_key,
            },
            consumed,
        ))
    }

    /// Encode back to the wire layout
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let key = self.credential_public_key.canonical_bytes();
        let mut out = Vec::with_capacity(HEADER_LEN + self.credential_id.len() + key.len());
        out.extend_from_slice(&self.aaguid);
        // Parsed IDs never exceed 1023 bytes
        let id_len = u16::try_from(self.credential_id.len()).unwrap_or(u16::MAX);
        out.extend_from_slice(&id_len.to_be_bytes());
        out.extend_from_slice(&self.credential_id);
        out.extend_from_slice(key);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passkey::CoseAlgorithm;
    use crate::testing::builders::AttestedCredentialDataBuilder;
    use crate::testing::fixtures::TestKeyPair;

    #[test]
    fn test_parse_reports_consumed_bytes() {
        let pair = TestKeyPair::new(CoseAlgorithm::Es256);
        let mut bytes = AttestedCredentialDataBuilder::new(&pair)
            .with_credential_id(vec![7; 20])
            .build();
        let block_len = bytes.len();
        bytes.extend_from_slice(&[0xa0]);

        let (data, consumed) = AttestedCredentialData::parse(&bytes).unwrap();
        assert_eq!(consumed, block_len);
        assert_eq!(consumed, 18 + 20 + pair.cose_key().len());
        assert_eq!(data.credential_id.as_slice(), &[7; 20]);
        assert_eq!(data.to_bytes(), bytes[..block_len]);
    }

    #[test]
    fn test_too_short() {
        assert_eq!(
            AttestedCredentialData::parse(&[0; 17]),
            Err(PasskeyError::InvalidLength {
                structure: "attested credential data",
                expected: 18,
                actual: 17
            })
        );
    }

    #[test]
    fn test_credential_id_ceiling_checked_before_slicing() {
        // Only the 18 header bytes are present
        for id_len in [1024u16, 2048, u16::MAX] {
            let mut bytes = vec![0u8; 16];
            bytes.extend_from_slice(&id_len.to_be_bytes());
            assert_eq!(
                AttestedCredentialData::parse(&bytes),
                Err(PasskeyError::InvalidCredentialIdLength(usize::from(id_len)))
            );
        }
    }

    #[test]
    fn test_credential_id_longer_than_input() {
        let mut bytes = vec![0u8; 16];
        bytes.extend_from_slice(&100u16.to_be_bytes());
        bytes.extend_from_slice(&[1; 10]);
        assert!(matches!(
            AttestedCredentialData::parse(&bytes),
            Err(PasskeyError::InvalidLength { .. })
        ));
    }

    #[test]
    fn test_max_credential_id() {
        let pair = TestKeyPair::new(CoseAlgorithm::Es256);
        let bytes = AttestedCredentialDataBuilder::new(&pair)
            .with_credential_id(vec![1; MAX_CREDENTIAL_ID_LEN])
            .build();
        let (data, consumed) = AttestedCredentialData::parse(&bytes).unwrap();
        assert_eq!(data.credential_id.len(), MAX_CREDENTIAL_ID_LEN);
        assert_eq!(consumed, bytes.len());
    }

    #[test]
    fn test_empty_credential_id() {
        let pair = TestKeyPair::new(CoseAlgorithm::Es256);
        let bytes = AttestedCredentialDataBuilder::new(&pair)
            .with_credential_id(Vec::new())
            .build();
        let (data, consumed) = AttestedCredentialData::parse(&bytes).unwrap();
        assert!(data.credential_id.is_empty());
        assert_eq!(consumed, 18 + pair.cose_key().len());
    }

    #[test]
    fn test_missing_public_key() {
        let pair = TestKeyPair::new(CoseAlgorithm::Es256);
        let bytes = AttestedCredentialDataBuilder::new(&pair)
            .with_public_key(Vec::new())
            .build();
        assert!(matches!(
            AttestedCredentialData::parse(&bytes),
            Err(PasskeyError::InvalidCredentialPublicKey(_))
        ));
    }
}
