// Centralized logging for the passkey decoders
use crate::passkey::{AuthenticatorFlags, CoseAlgorithm, PasskeyError};
use log::{debug, info, warn};

pub struct LoggingHelper;

impl LoggingHelper {
    /// Log a rejected input at a parser boundary
    pub fn log_decode_rejected(structure: &str, error: &PasskeyError) {
        warn!("Rejected {structure}: {error}");
    }

    /// Log a successfully decoded credential public key
    pub fn log_public_key_decoded(algorithm: CoseAlgorithm, encoded_len: usize) {
        debug!("Decoded {algorithm} credential public key ({encoded_len} bytes)");
    }

    /// Log successfully parsed authenticator data
    pub fn log_authenticator_data_parsed(flags: AuthenticatorFlags, sign_count: u32) {
        debug!("Parsed authenticator data: flags={flags:?}, sign_count={sign_count}");
    }

    /// Log a successfully parsed attestation object
    pub fn log_attestation_parsed(format: &str, auth_data_len: usize) {
        debug!("Parsed attestation object: fmt={format}, authData={auth_data_len} bytes");
    }

    /// Log a signature that failed verification
    pub fn log_signature_rejected(algorithm: CoseAlgorithm) {
        debug!("{algorithm} signature did not verify");
    }

    /// Log a credential rejected by policy
    pub fn log_policy_rejected(error: &PasskeyError) {
        warn!("Credential rejected by policy: {error}");
    }

    /// Log the effective passkey settings at startup
    pub fn log_settings_loaded(supported_algorithms: &[i64]) {
        info!("Passkey settings loaded, supported algorithms: {supported_algorithms:?}");
    }
}
