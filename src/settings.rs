use crate::passkey::{CredentialBackupPolicy, PasskeyError, PasskeySettings};
use crate::utils::logging::LoggingHelper;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE_NAME: &str = "Settings.toml";
pub const SETTINGS_DIR_ENV: &str = "PASSKEY_SETTINGS_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PasskeyCoreSettings {
    #[serde(default)]
    pub passkeys: PasskeySettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl PasskeyCoreSettings {
    /// Load settings from configuration files and environment variables
    ///
    /// Also installs `env_logger` at the configured level unless a logger is
    /// already set.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if:
    /// - A settings file cannot be read or parsed
    /// - An environment override has an invalid value
    /// - The resulting settings fail validation
    pub fn load() -> Result<Self, PasskeyError> {
        let mut settings = Self::load_base_settings()?;
        settings.apply_env_overrides()?;

        Self::initialize_logging(&settings.logging);

        settings.validate()?;
        LoggingHelper::log_settings_loaded(&settings.passkeys.supported_algorithms);
        Ok(settings)
    }

    /// Read settings from a single TOML file
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the file cannot be read or parsed
    pub fn from_toml_file(path: &Path) -> Result<Self, PasskeyError> {
        let content = fs::read_to_string(path).map_err(|e| {
            PasskeyError::Configuration(format!("failed to read {}: {e}", path.display()))
        })?;
        basic_toml::from_str(&content).map_err(|e| {
            PasskeyError::Configuration(format!("failed to parse {}: {e}", path.display()))
        })
    }

    /// Load base settings from TOML file(s) or use defaults
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `PASSKEY_SETTINGS_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    fn load_base_settings() -> Result<Self, PasskeyError> {
        let mut settings = Self::default();

        let default_config_path = PathBuf::from(SETTINGS_FILE_NAME);
        if default_config_path.exists() {
            settings = Self::from_toml_file(&default_config_path)?;
            log::debug!(
                "Loaded base settings from {}",
                default_config_path.display()
            );
        }

        if let Ok(settings_dir) = std::env::var(SETTINGS_DIR_ENV) {
            let override_path = Path::new(&settings_dir).join(SETTINGS_FILE_NAME);
            if override_path.exists() {
                settings = Self::from_toml_file(&override_path)?;
                log::debug!("Overriding settings from {}", override_path.display());
            } else {
                log::debug!(
                    "{SETTINGS_DIR_ENV} set but no {SETTINGS_FILE_NAME} found at: {}",
                    override_path.display()
                );
            }
        }

        Ok(settings)
    }

    fn apply_env_overrides(&mut self) -> Result<(), PasskeyError> {
        if let Ok(algorithms) = std::env::var("PASSKEY_SUPPORTED_ALGORITHMS") {
            self.passkeys.supported_algorithms = parse_algorithm_list(&algorithms)?;
        }
        Self::apply_policy_env_override(
            "PASSKEY_BACKUP_ELIGIBLE_POLICY",
            &mut self.passkeys.backup_eligible_policy,
        )?;
        Self::apply_policy_env_override(
            "PASSKEY_BACKED_UP_POLICY",
            &mut self.passkeys.backed_up_policy,
        )?;
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            self.logging.level = log_level;
        }
        Ok(())
    }

    fn apply_policy_env_override(
        env_var: &str,
        target: &mut CredentialBackupPolicy,
    ) -> Result<(), PasskeyError> {
        if let Ok(value) = std::env::var(env_var) {
            *target = value.parse()?;
        }
        Ok(())
    }

    fn initialize_logging(logging: &LoggingSettings) {
        // Another logger may already be installed by the host application
        let _ = env_logger::Builder::new()
            .parse_filters(&logging.level)
            .try_init();
    }

    /// Validate the passkey settings
    ///
    /// # Errors
    ///
    /// Returns `Configuration` describing the first problem found
    pub fn validate(&self) -> Result<(), PasskeyError> {
        self.passkeys.validate()
    }
}

/// Parse a comma-separated list of COSE algorithm ids, e.g. `-7,-257`
fn parse_algorithm_list(value: &str) -> Result<Vec<i64>, PasskeyError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<i64>().map_err(|_| {
                PasskeyError::Configuration(format!("invalid COSE algorithm id '{item}'"))
            })
        })
        .collect()
}
