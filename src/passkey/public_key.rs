//! COSE credential public key decoding and signature verification
//!
//! A credential public key arrives as a CTAP2 canonical COSE key map. The
//! decoder reads it label by label in canonical order:
//!
//! - EC2: `kty`, `alg`, optional `key_ops`, `crv`, `x`, `y`
//! - RSA: `kty`, `alg`, optional `key_ops`, `n`, `e`
//!
//! and turns it into a [`KeyMaterial`] that can check signatures. Maps that
//! carry private key components are refused outright.

use super::buffer::ByteBuffer;
use super::canonical::CanonicalCursor;
use super::cose::{labels, CoseAlgorithm, CoseCurve, CoseKeyType, HashAlgorithm};
use super::crypto::{self, KeyMaterial};
use super::errors::PasskeyError;
use crate::utils::logging::LoggingHelper;

/// A decoded, verification-ready credential public key
#[derive(Debug, Clone)]
pub struct CredentialPublicKey {
    key_type: CoseKeyType,
    algorithm: CoseAlgorithm,
    curve: Option<CoseCurve>,
    material: KeyMaterial,
    canonical_bytes: ByteBuffer,
}

impl PartialEq for CredentialPublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.algorithm == other.algorithm && self.canonical_bytes == other.canonical_bytes
    }
}

impl Eq for CredentialPublicKey {}

impl CredentialPublicKey {
    /// Decode the COSE key at the start of `bytes`.
    ///
    /// Bytes after the key map are not consumed; [`Self::encoded_len`] tells
    /// how far the key extends.
    ///
    /// # Errors
    ///
    /// Returns the specific decode error (`UnsupportedKeyType`,
    /// `UnsupportedCurve`, `UnsupportedAlgorithm`, `PrivateKeyDetected`,
    /// `UnexpectedLabel`) or `InvalidCredentialPublicKey` for anything else
    pub fn decode(bytes: &[u8]) -> Result<Self, PasskeyError> {
        Self::decode_map(bytes)
            .map_err(PasskeyError::into_public_key_error)
            .inspect(|key| LoggingHelper::log_public_key_decoded(key.algorithm, key.encoded_len()))
            .inspect_err(|e| LoggingHelper::log_decode_rejected("credential public key", e))
    }

    fn decode_map(bytes: &[u8]) -> Result<Self, PasskeyError> {
        let mut cursor = CanonicalCursor::new(bytes)?;

        cursor.read_required_label(labels::KTY)?;
        let kty = cursor.read_int()?;
        cursor.read_required_label(labels::ALG)?;
        let alg = cursor.read_int()?;
        if cursor.try_read_optional_label(labels::KEY_OPS)? {
            cursor.skip_value()?;
        }

        let key_type = CoseKeyType::from_i64(kty).ok_or(PasskeyError::UnsupportedKeyType(kty))?;
        let (algorithm, curve, material) = match key_type {
            CoseKeyType::Ec2 | CoseKeyType::Okp => {
                let (algorithm, curve, material) =
                    Self::decode_curve_key(&mut cursor, key_type, alg)?;
                (algorithm, Some(curve), material)
            }
            CoseKeyType::Rsa => {
                let (algorithm, material) = Self::decode_rsa_key(&mut cursor, alg)?;
                (algorithm, None, material)
            }
        };
        cursor.finish()?;

        let consumed = bytes.len() - cursor.bytes_remaining();
        Ok(Self {
            key_type,
            algorithm,
            curve,
            material,
            canonical_bytes: ByteBuffer::copy_from_slice(&bytes[..consumed]),
        })
    }

    fn decode_curve_key(
        cursor: &mut CanonicalCursor<'_>,
        key_type: CoseKeyType,
        alg: i64,
    ) -> Result<(CoseAlgorithm, CoseCurve, KeyMaterial), PasskeyError> {
        cursor.read_required_label(labels::CRV)?;
        let crv = cursor.read_int()?;

        // Only the NIST curves are usable, and only under kty EC2
        let curve = CoseCurve::from_i64(crv)
            .filter(|curve| {
                curve.key_type() == key_type
                    && key_type == CoseKeyType::Ec2
                    && curve.coordinate_len().is_some()
            })
            .ok_or(PasskeyError::UnsupportedCurve {
                key_type: key_type.to_i64(),
                curve: crv,
            })?;

        let algorithm = CoseAlgorithm::from_i64(alg)
            .filter(|algorithm| algorithm.curve() == Some(curve))
            .ok_or(PasskeyError::UnsupportedAlgorithm(alg))?;

        cursor.read_required_label(labels::X)?;
        let x = cursor.read_byte_string()?;
        cursor.read_required_label(labels::Y)?;
        let y = cursor.read_byte_string()?;
        if cursor.try_read_optional_label(labels::D)? {
            return Err(PasskeyError::PrivateKeyDetected);
        }

        let material = KeyMaterial::from_ec_coordinates(curve, &x, &y)?;
        Ok((algorithm, curve, material))
    }

    fn decode_rsa_key(
        cursor: &mut CanonicalCursor<'_>,
        alg: i64,
    ) -> Result<(CoseAlgorithm, KeyMaterial), PasskeyError> {
        let algorithm = CoseAlgorithm::from_i64(alg)
            .filter(|algorithm| algorithm.key_type() == CoseKeyType::Rsa)
            .ok_or(PasskeyError::UnsupportedAlgorithm(alg))?;

        cursor.read_required_label(labels::N)?;
        let n = cursor.read_byte_string()?;
        // A key without its public exponent is treated as private key material
        if !cursor.try_read_optional_label(labels::E)? {
            return Err(PasskeyError::PrivateKeyDetected);
        }
        let e = cursor.read_byte_string()?;
        if cursor.try_read_optional_label(labels::RSA_D)? {
            return Err(PasskeyError::PrivateKeyDetected);
        }

        let material = KeyMaterial::from_rsa_components(&n, &e)?;
        Ok((algorithm, material))
    }

    /// Check `signature` over `signed_data`.
    ///
    /// The hash and signature scheme come from the key's algorithm. ECDSA
    /// signatures are expected in DER form. A signature that does not verify
    /// yields `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedAlgorithm` if the algorithm has no verifier for
    /// this key's material
    pub fn verify(&self, signed_data: &[u8], signature: &[u8]) -> Result<bool, PasskeyError> {
        let verified =
            crypto::verify_signature(&self.material, self.algorithm, signed_data, signature)?;
        if !verified {
            LoggingHelper::log_signature_rejected(self.algorithm);
        }
        Ok(verified)
    }

    /// Check a WebAuthn assertion signature, which covers the authenticator
    /// data followed by the SHA-256 hash of the client data JSON
    ///
    /// # Errors
    ///
    /// Same as [`Self::verify`]
    pub fn verify_assertion(
        &self,
        authenticator_data: &[u8],
        client_data_json: &[u8],
        signature: &[u8],
    ) -> Result<bool, PasskeyError> {
        let client_data_hash = crypto::digest(HashAlgorithm::Sha256, client_data_json);
        let mut signed_data = Vec::with_capacity(authenticator_data.len() + client_data_hash.len());
        signed_data.extend_from_slice(authenticator_data);
        signed_data.extend_from_slice(&client_data_hash);
        self.verify(&signed_data, signature)
    }

    #[must_use]
    pub fn key_type(&self) -> CoseKeyType {
        self.key_type
    }

    #[must_use]
    pub fn algorithm(&self) -> CoseAlgorithm {
        self.algorithm
    }

    /// Curve of an EC key, `None` for RSA
    #[must_use]
    pub fn curve(&self) -> Option<CoseCurve> {
        self.curve
    }

    #[must_use]
    pub fn material(&self) -> &KeyMaterial {
        &self.material
    }

    /// The exact bytes the key was decoded from
    #[must_use]
    pub fn canonical_bytes(&self) -> &ByteBuffer {
        &self.canonical_bytes
    }

    #[must_use]
    pub fn encoded_len(&self) -> usize {
        self.canonical_bytes.len()
    }
}
