//! Passkey settings
//!
//! This module defines the settings that control which credentials are
//! accepted: the signature algorithms and the backup flag policies.

use super::cose::CoseAlgorithm;
use super::errors::PasskeyError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a backup-related authenticator flag is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackupPolicy {
    /// The flag must be set
    Required,
    /// The flag may or may not be set
    #[default]
    Allowed,
    /// The flag must not be set
    Disallowed,
}

impl FromStr for CredentialBackupPolicy {
    type Err = PasskeyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "required" => Ok(Self::Required),
            "allowed" => Ok(Self::Allowed),
            "disallowed" => Ok(Self::Disallowed),
            other => Err(PasskeyError::Configuration(format!(
                "unknown backup policy '{other}' (expected required, allowed or disallowed)"
            ))),
        }
    }
}

impl fmt::Display for CredentialBackupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Required => "required",
            Self::Allowed => "allowed",
            Self::Disallowed => "disallowed",
        })
    }
}

/// Passkey settings for credential acceptance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasskeySettings {
    /// COSE algorithm identifiers accepted for new credentials
    #[serde(default = "default_supported_algorithms")]
    pub supported_algorithms: Vec<i64>,
    #[serde(default)]
    pub backup_eligible_policy: CredentialBackupPolicy,
    #[serde(default)]
    pub backed_up_policy: CredentialBackupPolicy,
}

fn default_supported_algorithms() -> Vec<i64> {
    CoseAlgorithm::ALL
        .iter()
        .map(|algorithm| algorithm.to_i64())
        .collect()
}

impl Default for PasskeySettings {
    fn default() -> Self {
        Self {
            supported_algorithms: default_supported_algorithms(),
            backup_eligible_policy: CredentialBackupPolicy::Allowed,
            backed_up_policy: CredentialBackupPolicy::Allowed,
        }
    }
}

impl PasskeySettings {
    /// Resolve the configured algorithm identifiers
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the list is empty or names an algorithm
    /// this crate cannot verify
    pub fn algorithms(&self) -> Result<Vec<CoseAlgorithm>, PasskeyError> {
        if self.supported_algorithms.is_empty() {
            return Err(PasskeyError::Configuration(
                "at least one supported algorithm is required".to_string(),
            ));
        }
        self.supported_algorithms
            .iter()
            .map(|&id| {
                CoseAlgorithm::from_i64(id).ok_or_else(|| {
                    PasskeyError::Configuration(format!("unsupported COSE algorithm {id}"))
                })
            })
            .collect()
    }

    /// Check the settings for consistency
    ///
    /// # Errors
    ///
    /// Returns `Configuration` describing the first problem found
    pub fn validate(&self) -> Result<(), PasskeyError> {
        self.algorithms()?;
        if self.backup_eligible_policy == CredentialBackupPolicy::Disallowed
            && self.backed_up_policy == CredentialBackupPolicy::Required
        {
            return Err(PasskeyError::Configuration(
                "backed up credentials cannot be required while backup eligibility is disallowed"
                    .to_string(),
            ));
        }
        Ok(())
    }
}
