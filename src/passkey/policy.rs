//! Credential acceptance policy
//!
//! Checks a relying party applies on top of successful decoding: the
//! credential's algorithm must be one it accepts, and the backup flags in the
//! authenticator data must agree with its backup policies.

use super::attestation::AttestationObject;
use super::authenticator_data::{AuthenticatorData, AuthenticatorFlags};
use super::cose::CoseAlgorithm;
use super::errors::PasskeyError;
use super::public_key::CredentialPublicKey;
use super::settings::{CredentialBackupPolicy, PasskeySettings};
use crate::utils::logging::LoggingHelper;

const BACKED_UP_NOT_ELIGIBLE: &str =
    "The credential is backed up, but the authenticator data did not set the 'BackupEligible' flag";
const ELIGIBILITY_REQUIRED: &str =
    "Backup eligibility is required, but the credential was not eligible for backup";
const ELIGIBILITY_DISALLOWED: &str =
    "Backup eligibility is disallowed, but the credential was eligible for backup";
const BACKUP_REQUIRED: &str = "Backup is required, but the credential was not backed up";
const BACKUP_DISALLOWED: &str = "Backup is disallowed, but the credential was backed up";

/// Policy built from [`PasskeySettings`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPolicy {
    supported_algorithms: Vec<CoseAlgorithm>,
    backup_eligible: CredentialBackupPolicy,
    backed_up: CredentialBackupPolicy,
}

impl Default for CredentialPolicy {
    fn default() -> Self {
        Self {
            supported_algorithms: CoseAlgorithm::ALL.to_vec(),
            backup_eligible: CredentialBackupPolicy::Allowed,
            backed_up: CredentialBackupPolicy::Allowed,
        }
    }
}

impl CredentialPolicy {
    /// Build a policy from settings
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the settings are invalid
    pub fn from_settings(settings: &PasskeySettings) -> Result<Self, PasskeyError> {
        settings.validate()?;
        Ok(Self {
            supported_algorithms: settings.algorithms()?,
            backup_eligible: settings.backup_eligible_policy,
            backed_up: settings.backed_up_policy,
        })
    }

    #[must_use]
    pub fn supported_algorithms(&self) -> &[CoseAlgorithm] {
        &self.supported_algorithms
    }

    /// Require that the key's algorithm is accepted
    ///
    /// # Errors
    ///
    /// Returns `DisallowedAlgorithm` otherwise
    pub fn check_algorithm(&self, key: &CredentialPublicKey) -> Result<(), PasskeyError> {
        if self.supported_algorithms.contains(&key.algorithm()) {
            Ok(())
        } else {
            Err(PasskeyError::DisallowedAlgorithm(key.algorithm().to_i64()))
        }
    }

    /// Check the backup flags against the backup policies
    ///
    /// # Errors
    ///
    /// Returns `BackupPolicyViolation` describing the violated rule
    pub fn check_flags(&self, flags: AuthenticatorFlags) -> Result<(), PasskeyError> {
        let consistency = if flags.is_backed_up() && !flags.is_backup_eligible() {
            Err(BACKED_UP_NOT_ELIGIBLE)
        } else {
            Ok(())
        };
        let eligibility = match (self.backup_eligible, flags.is_backup_eligible()) {
            (CredentialBackupPolicy::Required, false) => Err(ELIGIBILITY_REQUIRED),
            (CredentialBackupPolicy::Disallowed, true) => Err(ELIGIBILITY_DISALLOWED),
            _ => Ok(()),
        };
        let backup = match (self.backed_up, flags.is_backed_up()) {
            (CredentialBackupPolicy::Required, false) => Err(BACKUP_REQUIRED),
            (CredentialBackupPolicy::Disallowed, true) => Err(BACKUP_DISALLOWED),
            _ => Ok(()),
        };

        // First violated rule wins
        consistency
            .and(eligibility)
            .and(backup)
            .map_err(|message| PasskeyError::BackupPolicyViolation(message.to_string()))
    }

    /// Parse and check the authenticator data of a registration
    ///
    /// # Errors
    ///
    /// Returns the authenticator data parsing error,
    /// `MissingAttestedCredentialData` if no credential is attached, or the
    /// flag or algorithm policy violation
    pub fn check_attestation(
        &self,
        attestation: &AttestationObject,
    ) -> Result<AuthenticatorData, PasskeyError> {
        let authenticator_data = attestation.parse_authenticator_data()?;
        let credential = authenticator_data
            .attested_credential_data
            .as_ref()
            .ok_or(PasskeyError::MissingAttestedCredentialData)?;

        self.check_flags(authenticator_data.flags)
            .and_then(|()| self.check_algorithm(&credential.credential_public_key))
            .inspect_err(LoggingHelper::log_policy_rejected)?;

        Ok(authenticator_data)
    }
}
