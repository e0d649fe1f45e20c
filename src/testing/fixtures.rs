//! Test key pairs
//!
//! Deterministic signing keys for every algorithm in
//! [`CoseAlgorithm::ALL`], with helpers to produce the matching COSE key and
//! signatures in the form authenticators emit them.

use crate::passkey::cose::labels;
use crate::passkey::{crypto, CoseAlgorithm, CoseCurve, CredentialPublicKey, HashAlgorithm};
use p256::ecdsa::signature::Signer;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{Pkcs1v15Sign, Pss, RsaPrivateKey};
use sha2::{Sha256, Sha384, Sha512};
use std::sync::OnceLock;

use super::builders::CoseKeyBuilder;
use super::constants::{
    TEST_P256_SCALAR, TEST_P384_SCALAR, TEST_P521_SCALAR_TAIL, TEST_RSA_PRIVATE_KEY_PEM,
};

enum TestSigner {
    P256(p256::ecdsa::SigningKey),
    P384(p384::ecdsa::SigningKey),
    P521(p521::ecdsa::SigningKey),
    Rsa(&'static RsaPrivateKey),
}

/// A private key together with the COSE algorithm it signs for
pub struct TestKeyPair {
    algorithm: CoseAlgorithm,
    signer: TestSigner,
}

/// 66 bytes: the top bit of a P-521 scalar lives in the first byte
fn p521_scalar() -> Vec<u8> {
    let mut scalar = vec![0x00];
    scalar.extend_from_slice(&TEST_P521_SCALAR_TAIL);
    scalar
}

fn rsa_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| {
        RsaPrivateKey::from_pkcs1_pem(TEST_RSA_PRIVATE_KEY_PEM).expect("Test RSA key should parse")
    })
}

impl TestKeyPair {
    /// Key pair for `algorithm`; the same algorithm always yields the same key
    ///
    /// # Panics
    ///
    /// Panics if a built-in test key fails to load
    #[must_use]
    pub fn new(algorithm: CoseAlgorithm) -> Self {
        let signer = match algorithm {
            CoseAlgorithm::Es256 => TestSigner::P256(
                p256::ecdsa::SigningKey::from_slice(&TEST_P256_SCALAR)
                    .expect("P-256 test scalar should be valid"),
            ),
            CoseAlgorithm::Es384 => TestSigner::P384(
                p384::ecdsa::SigningKey::from_slice(&TEST_P384_SCALAR)
                    .expect("P-384 test scalar should be valid"),
            ),
            CoseAlgorithm::Es512 => TestSigner::P521(
                p521::ecdsa::SigningKey::from_slice(&p521_scalar())
                    .expect("P-521 test scalar should be valid"),
            ),
            CoseAlgorithm::Rs256
            | CoseAlgorithm::Rs384
            | CoseAlgorithm::Rs512
            | CoseAlgorithm::Ps256
            | CoseAlgorithm::Ps384
            | CoseAlgorithm::Ps512 => TestSigner::Rsa(rsa_key()),
        };
        Self { algorithm, signer }
    }

    /// One pair per supported algorithm
    #[must_use]
    pub fn all() -> Vec<Self> {
        CoseAlgorithm::ALL.iter().copied().map(Self::new).collect()
    }

    #[must_use]
    pub fn algorithm(&self) -> CoseAlgorithm {
        self.algorithm
    }

    /// Builder preloaded with this key's public COSE entries
    #[must_use]
    pub fn cose_key_builder(&self) -> CoseKeyBuilder {
        let builder = CoseKeyBuilder::new()
            .with_int(labels::KTY, self.algorithm.key_type().to_i64())
            .with_int(labels::ALG, self.algorithm.to_i64());

        match &self.signer {
            TestSigner::P256(key) => {
                let point = key.verifying_key().to_encoded_point(false);
                ec_entries(builder, CoseCurve::P256, point.x(), point.y())
            }
            TestSigner::P384(key) => {
                let point = key.verifying_key().to_encoded_point(false);
                ec_entries(builder, CoseCurve::P384, point.x(), point.y())
            }
            TestSigner::P521(key) => {
                let point = p521::ecdsa::VerifyingKey::from(key).to_encoded_point(false);
                ec_entries(builder, CoseCurve::P521, point.x(), point.y())
            }
            TestSigner::Rsa(key) => builder
                .with_bytes(labels::N, key.n().to_bytes_be())
                .with_bytes(labels::E, key.e().to_bytes_be()),
        }
    }

    /// Canonical COSE encoding of the public key
    #[must_use]
    pub fn cose_key(&self) -> Vec<u8> {
        self.cose_key_builder().build()
    }

    /// The decoded public key
    ///
    /// # Panics
    ///
    /// Panics if the fixture key does not decode
    #[must_use]
    pub fn public_key(&self) -> CredentialPublicKey {
        CredentialPublicKey::decode(&self.cose_key()).expect("Test COSE key should decode")
    }

    /// Private scalar (EC) or private exponent (RSA), big-endian
    #[must_use]
    pub fn private_scalar(&self) -> Vec<u8> {
        match &self.signer {
            TestSigner::P256(_) => TEST_P256_SCALAR.to_vec(),
            TestSigner::P384(_) => TEST_P384_SCALAR.to_vec(),
            TestSigner::P521(_) => p521_scalar(),
            TestSigner::Rsa(key) => key.d().to_bytes_be(),
        }
    }

    /// Sign `message` under this pair's algorithm. ECDSA signatures are DER.
    ///
    /// # Panics
    ///
    /// Panics if the RSA signing operation fails
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        match &self.signer {
            TestSigner::P256(key) => {
                let signature: p256::ecdsa::Signature = key.sign(message);
                signature.to_der().as_bytes().to_vec()
            }
            TestSigner::P384(key) => {
                let signature: p384::ecdsa::Signature = key.sign(message);
                signature.to_der().as_bytes().to_vec()
            }
            TestSigner::P521(key) => {
                let signature: p521::ecdsa::Signature = key.sign(message);
                signature.to_der().as_bytes().to_vec()
            }
            TestSigner::Rsa(key) => sign_rsa(key, self.algorithm, message),
        }
    }

    /// Sign an assertion: authenticator data followed by the SHA-256 of the
    /// client data JSON
    #[must_use]
    pub fn sign_assertion(&self, authenticator_data: &[u8], client_data_json: &[u8]) -> Vec<u8> {
        let mut signed = authenticator_data.to_vec();
        signed.extend_from_slice(&crypto::digest(HashAlgorithm::Sha256, client_data_json));
        self.sign(&signed)
    }
}

fn ec_entries(
    builder: CoseKeyBuilder,
    curve: CoseCurve,
    x: Option<&impl AsRef<[u8]>>,
    y: Option<&impl AsRef<[u8]>>,
) -> CoseKeyBuilder {
    let x = x.map(|x| x.as_ref().to_vec()).unwrap_or_default();
    let y = y.map(|y| y.as_ref().to_vec()).unwrap_or_default();
    builder
        .with_int(labels::CRV, curve.to_i64())
        .with_bytes(labels::X, x)
        .with_bytes(labels::Y, y)
}

fn sign_rsa(key: &RsaPrivateKey, algorithm: CoseAlgorithm, message: &[u8]) -> Vec<u8> {
    let hashed = crypto::digest(algorithm.hash(), message);
    let mut rng = rsa::rand_core::OsRng;
    let result = match algorithm {
        CoseAlgorithm::Rs256 => key.sign(Pkcs1v15Sign::new::<Sha256>(), &hashed),
        CoseAlgorithm::Rs384 => key.sign(Pkcs1v15Sign::new::<Sha384>(), &hashed),
        CoseAlgorithm::Rs512 => key.sign(Pkcs1v15Sign::new::<Sha512>(), &hashed),
        CoseAlgorithm::Ps256 => key.sign_with_rng(&mut rng, Pss::new::<Sha256>(), &hashed),
        CoseAlgorithm::Ps384 => key.sign_with_rng(&mut rng, Pss::new::<Sha384>(), &hashed),
        CoseAlgorithm::Ps512 => key.sign_with_rng(&mut rng, Pss::new::<Sha512>(), &hashed),
        CoseAlgorithm::Es256 | CoseAlgorithm::Es384 | CoseAlgorithm::Es512 => {
            unreachable!("ECDSA algorithms use an EC signer")
        }
    };
    result.expect("RSA test signature should succeed")
}
