//! Passkey credential decoding and signature verification
//!
//! [`passkey`] holds the decoders, verifiers and [`CredentialPolicy`]. Everything
//! in it works on the bytes and values it is given and never reads files,
//! environment variables or other process state.
//!
//! [`settings`] is the optional layer that loads [`PasskeyCoreSettings`] from
//! `Settings.toml` and `PASSKEY_*` environment variables and installs
//! `env_logger`. Hosts that configure the crate themselves can skip it and
//! build a [`CredentialPolicy`] from [`passkey::PasskeySettings`] directly.

#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the passkey-core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod passkey;
pub mod settings;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use passkey::{
    decode_credential_public_key, parse_attestation_object, parse_authenticator_data,
    AttestationObject, AuthenticatorData, AuthenticatorFlags, CoseAlgorithm, CredentialPolicy,
    CredentialPublicKey, PasskeyError,
};
pub use settings::PasskeyCoreSettings;
