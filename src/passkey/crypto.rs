//! Signature verification primitives
//!
//! Hashing and signature checks for the algorithms in [`CoseAlgorithm`]. The
//! message is hashed according to the algorithm, then checked with the
//! RustCrypto verifier for the key family: ECDSA over P-256, P-384 or P-521
//! with DER signatures, or RSA with PKCS#1 v1.5 or PSS padding.

use super::cose::{CoseAlgorithm, CoseCurve, HashAlgorithm};
use super::errors::PasskeyError;
use p256::ecdsa::signature::hazmat::PrehashVerifier;
use rsa::{BigUint, Pkcs1v15Sign, Pss, RsaPublicKey};
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::fmt;

/// Public key ready for verification
#[derive(Clone)]
pub enum KeyMaterial {
    P256(p256::ecdsa::VerifyingKey),
    P384(p384::ecdsa::VerifyingKey),
    P521(p521::ecdsa::VerifyingKey),
    Rsa(RsaPublicKey),
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::P256(_) => f.write_str("KeyMaterial::P256"),
            Self::P384(_) => f.write_str("KeyMaterial::P384"),
            Self::P521(_) => f.write_str("KeyMaterial::P521"),
            Self::Rsa(key) => {
                use rsa::traits::PublicKeyParts;
                write!(f, "KeyMaterial::Rsa({} bits)", key.n().bits())
            }
        }
    }
}

impl KeyMaterial {
    /// Build an EC key from its affine coordinates
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentialPublicKey` if the coordinates have the wrong
    /// length or the point is not on the curve, and `UnsupportedCurve` for
    /// curves without a verifier
    pub fn from_ec_coordinates(curve: CoseCurve, x: &[u8], y: &[u8]) -> Result<Self, PasskeyError> {
        let expected = curve
            .coordinate_len()
            .ok_or(PasskeyError::UnsupportedCurve {
                key_type: curve.key_type().to_i64(),
                curve: curve.to_i64(),
            })?;
        if x.len() != expected || y.len() != expected {
            return Err(PasskeyError::InvalidCredentialPublicKey(format!(
                "EC coordinates must be {expected} bytes, got {} and {}",
                x.len(),
                y.len()
            )));
        }

        // Uncompressed SEC1 point: 0x04 || x || y
        let mut point = Vec::with_capacity(1 + x.len() + y.len());
        point.push(0x04);
        point.extend_from_slice(x);
        point.extend_from_slice(y);

        match curve {
            CoseCurve::P256 => p256::ecdsa::VerifyingKey::from_sec1_bytes(&point)
                .map(Self::P256)
                .map_err(invalid_point),
            CoseCurve::P384 => p384::ecdsa::VerifyingKey::from_sec1_bytes(&point)
                .map(Self::P384)
                .map_err(invalid_point),
            CoseCurve::P521 => p521::ecdsa::VerifyingKey::from_sec1_bytes(&point)
                .map(Self::P521)
                .map_err(invalid_point),
            other => Err(PasskeyError::UnsupportedCurve {
                key_type: other.key_type().to_i64(),
                curve: other.to_i64(),
            }),
        }
    }

    /// Build an RSA key from big-endian modulus and exponent
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentialPublicKey` if the key is rejected by the RSA
    /// implementation (modulus over 4096 bits, bad exponent)
    pub fn from_rsa_components(n: &[u8], e: &[u8]) -> Result<Self, PasskeyError> {
        RsaPublicKey::new(BigUint::from_bytes_be(n), BigUint::from_bytes_be(e))
            .map(Self::Rsa)
            .map_err(|e| PasskeyError::InvalidCredentialPublicKey(format!("invalid RSA key: {e}")))
    }
}

fn invalid_point<E>(_: E) -> PasskeyError {
    PasskeyError::InvalidCredentialPublicKey("EC point is not on the curve".to_string())
}

/// Hash `data` with the given algorithm
#[must_use]
pub fn digest(hash: HashAlgorithm, data: &[u8]) -> Vec<u8> {
    match hash {
        HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
        HashAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
        HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
    }
}

/// Check `signature` over `data` with `material` under `algorithm`.
///
/// Signatures that do not verify, including malformed ones, give
/// `Ok(false)`.
///
/// # Errors
///
/// Returns `UnsupportedAlgorithm` if the key cannot be used with `algorithm`
pub fn verify_signature(
    material: &KeyMaterial,
    algorithm: CoseAlgorithm,
    data: &[u8],
    signature: &[u8],
) -> Result<bool, PasskeyError> {
    let hashed = digest(algorithm.hash(), data);

    let verified = match (algorithm, material) {
        (CoseAlgorithm::Es256, KeyMaterial::P256(key)) => {
            p256::ecdsa::Signature::from_der(signature)
                .is_ok_and(|sig| key.verify_prehash(&hashed, &sig).is_ok())
        }
        (CoseAlgorithm::Es384, KeyMaterial::P384(key)) => {
            p384::ecdsa::Signature::from_der(signature)
                .is_ok_and(|sig| key.verify_prehash(&hashed, &sig).is_ok())
        }
        (CoseAlgorithm::Es512, KeyMaterial::P521(key)) => {
            p521::ecdsa::Signature::from_der(signature)
                .is_ok_and(|sig| key.verify_prehash(&hashed, &sig).is_ok())
        }
        (CoseAlgorithm::Rs256, KeyMaterial::Rsa(key)) => key
            .verify(Pkcs1v15Sign::new::<Sha256>(), &hashed, signature)
            .is_ok(),
        (CoseAlgorithm::Rs384, KeyMaterial::Rsa(key)) => key
            .verify(Pkcs1v15Sign::new::<Sha384>(), &hashed, signature)
            .is_ok(),
        (CoseAlgorithm::Rs512, KeyMaterial::Rsa(key)) => key
            .verify(Pkcs1v15Sign::new::<Sha512>(), &hashed, signature)
            .is_ok(),
        (CoseAlgorithm::Ps256, KeyMaterial::Rsa(key)) => {
            key.verify(Pss::new::<Sha256>(), &hashed, signature).is_ok()
        }
        (CoseAlgorithm::Ps384, KeyMaterial::Rsa(key)) => {
            key.verify(Pss::new::<Sha384>(), &hashed, signature).is_ok()
        }
        (CoseAlgorithm::Ps512, KeyMaterial::Rsa(key)) => {
            key.verify(Pss::new::<Sha512>(), &hashed, signature).is_ok()
        }
        (
            CoseAlgorithm::Es256
            | CoseAlgorithm::Es384
            | CoseAlgorithm::Es512
            | CoseAlgorithm::Rs256
            | CoseAlgorithm::Rs384
            | CoseAlgorithm::Rs512
            | CoseAlgorithm::Ps256
            | CoseAlgorithm::Ps384
            | CoseAlgorithm::Ps512,
            _,
        ) => return Err(PasskeyError::UnsupportedAlgorithm(algorithm.to_i64())),
    };

    Ok(verified)
}
