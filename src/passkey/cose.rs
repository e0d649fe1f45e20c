//! COSE identifiers used by credential public keys
//!
//! Values are from the IANA COSE registries. Only the algorithms this crate
//! can verify have a [`CoseAlgorithm`] variant.

use std::fmt;

/// Map labels of a COSE key
pub mod labels {
    pub const KTY: i64 = 1;
    pub const ALG: i64 = 3;
    pub const KEY_OPS: i64 = 4;

    /// EC2 and OKP key parameters
    pub const CRV: i64 = -1;
    pub const X: i64 = -2;
    pub const Y: i64 = -3;
    pub const D: i64 = -4;

    /// RSA key parameters
    pub const N: i64 = -1;
    pub const E: i64 = -2;
    pub const RSA_D: i64 = -3;
}

/// COSE key type (`kty`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoseKeyType {
    Okp,
    Ec2,
    Rsa,
}

impl CoseKeyType {
    #[must_use]
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::Okp),
            2 => Some(Self::Ec2),
            3 => Some(Self::Rsa),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_i64(self) -> i64 {
        match self {
            Self::Okp => 1,
            Self::Ec2 => 2,
            Self::Rsa => 3,
        }
    }
}

/// Elliptic curves from the COSE registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoseCurve {
    P256,
    P384,
    P521,
    X25519,
    X448,
    Ed25519,
    Ed448,
    Secp256k1,
}

impl CoseCurve {
    #[must_use]
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::P256),
            2 => Some(Self::P384),
            3 => Some(Self::P521),
            4 => Some(Self::X25519),
            5 => Some(Self::X448),
            6 => Some(Self::Ed25519),
            7 => Some(Self::Ed448),
            8 => Some(Self::Secp256k1),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_i64(self) -> i64 {
        match self {
            Self::P256 => 1,
            Self::P384 => 2,
            Self::P521 => 3,
            Self::X25519 => 4,
            Self::X448 => 5,
            Self::Ed25519 => 6,
            Self::Ed448 => 7,
            Self::Secp256k1 => 8,
        }
    }

    /// The key type this curve belongs to
    #[must_use]
    pub fn key_type(self) -> CoseKeyType {
        match self {
            Self::P256 | Self::P384 | Self::P521 | Self::Secp256k1 => CoseKeyType::Ec2,
            Self::X25519 | Self::X448 | Self::Ed25519 | Self::Ed448 => CoseKeyType::Okp,
        }
    }

    /// Length in bytes of one affine coordinate, for curves we verify with
    #[must_use]
    pub fn coordinate_len(self) -> Option<usize> {
        match self {
            Self::P256 => Some(32),
            Self::P384 => Some(48),
            Self::P521 => Some(66),
            _ => None,
        }
    }
}

/// Signature algorithms a credential public key can be verified with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoseAlgorithm {
    /// ECDSA with SHA-256
    Es256,
    /// ECDSA with SHA-384
    Es384,
    /// ECDSA with SHA-512
    Es512,
    /// RSASSA-PSS with SHA-256
    Ps256,
    /// RSASSA-PSS with SHA-384
    Ps384,
    /// RSASSA-PSS with SHA-512
    Ps512,
    /// RSASSA-PKCS1-v1_5 with SHA-256
    Rs256,
    /// RSASSA-PKCS1-v1_5 with SHA-384
    Rs384,
    /// RSASSA-PKCS1-v1_5 with SHA-512
    Rs512,
}

/// Hash functions used by the supported algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
    Sha384,
    Sha512,
}

impl CoseAlgorithm {
    pub const ALL: [Self; 9] = [
        Self::Es256,
        Self::Es384,
        Self::Es512,
        Self::Ps256,
        Self::Ps384,
        Self::Ps512,
        Self::Rs256,
        Self::Rs384,
        Self::Rs512,
    ];

    #[must_use]
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            -7 => Some(Self::Es256),
            -35 => Some(Self::Es384),
            -36 => Some(Self::Es512),
            -37 => Some(Self::Ps256),
            -38 => Some(Self::Ps384),
            -39 => Some(Self::Ps512),
            -257 => Some(Self::Rs256),
            -258 => Some(Self::Rs384),
            -259 => Some(Self::Rs512),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_i64(self) -> i64 {
        match self {
            Self::Es256 => -7,
            Self::Es384 => -35,
            Self::Es512 => -36,
            Self::Ps256 => -37,
            Self::Ps384 => -38,
            Self::Ps512 => -39,
            Self::Rs256 => -257,
            Self::Rs384 => -258,
            Self::Rs512 => -259,
        }
    }

    #[must_use]
    pub fn hash(self) -> HashAlgorithm {
        match self {
            Self::Es256 | Self::Ps256 | Self::Rs256 => HashAlgorithm::Sha256,
            Self::Es384 | Self::Ps384 | Self::Rs384 => HashAlgorithm::Sha384,
            Self::Es512 | Self::Ps512 | Self::Rs512 => HashAlgorithm::Sha512,
        }
    }

    /// Key type the algorithm signs with
    #[must_use]
    pub fn key_type(self) -> CoseKeyType {
        match self {
            Self::Es256 | Self::Es384 | Self::Es512 => CoseKeyType::Ec2,
            Self::Ps256
            | Self::Ps384
            | Self::Ps512
            | Self::Rs256
            | Self::Rs384
            | Self::Rs512 => CoseKeyType::Rsa,
        }
    }

    /// Curve an ECDSA algorithm is bound to in WebAuthn
    #[must_use]
    pub fn curve(self) -> Option<CoseCurve> {
        match self {
            Self::Es256 => Some(CoseCurve::P256),
            Self::Es384 => Some(CoseCurve::P384),
            Self::Es512 => Some(CoseCurve::P521),
            _ => None,
        }
    }
}

impl fmt::Display for CoseAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Es256 => "ES256",
            Self::Es384 => "ES384",
            Self::Es512 => "ES512",
            Self::Ps256 => "PS256",
            Self::Ps384 => "PS384",
            Self::Ps512 => "PS512",
            Self::Rs256 => "RS256",
            Self::Rs384 => "RS384",
            Self::Rs512 => "RS512",
        };
        f.write_str(name)
    }
}
