//! Tool configuration loaded via `ortho-config`.
//!
//! [`FixtureConfig`] names the external programs the pipeline shells out to
//! and the SSH settings used for remote locations. Values merge defaults,
//! configuration files and `SYNC_FIXTURE_*` environment variables; command
//! line flags are applied on top by the binary.

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::hash::{SHA1_HEX_LEN, SHA256_HEX_LEN};

/// Default content hashing command.
pub const DEFAULT_HASH_BIN: &str = "sha1sum";

/// External programs and SSH settings loaded via `ortho-config`.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "SYNC_FIXTURE",
    discovery(
        app_name = "sync-fixture",
        env_var = "SYNC_FIXTURE_CONFIG_PATH",
        config_file_name = "sync-fixture.toml",
        dotfile_name = ".sync-fixture.toml",
        project_file_name = "sync-fixture.toml"
    )
)]
pub struct FixtureConfig {
    /// Command printing a file's content hash as the first token of stdout.
    #[ortho_config(default = DEFAULT_HASH_BIN.to_owned())]
    pub hash_bin: String,
    /// Number of hex digits in a hash produced by `hash_bin`.
    #[ortho_config(default = 40)]
    pub hash_length: usize,
    /// Path to the `ssh` executable.
    #[ortho_config(default = "ssh".to_owned())]
    pub ssh_bin: String,
    /// Path to the `scp` executable.
    #[ortho_config(default = "scp".to_owned())]
    pub scp_bin: String,
    /// Path to the `mkdir` executable used for local directories.
    #[ortho_config(default = "mkdir".to_owned())]
    pub mkdir_bin: String,
    /// Path to the `cp` executable used for local copies.
    #[ortho_config(default = "cp".to_owned())]
    pub cp_bin: String,
    /// Path to the `rm` executable used for local removals.
    #[ortho_config(default = "rm".to_owned())]
    pub rm_bin: String,
    /// Whether to force batch mode for SSH to avoid password prompts.
    #[ortho_config(default = true)]
    pub ssh_batch_mode: bool,
    /// Whether to enforce host key checking.
    #[ortho_config(default = true)]
    pub ssh_strict_host_key_checking: bool,
    /// Known hosts file override; empty keeps the SSH default.
    #[ortho_config(default = String::new())]
    pub ssh_known_hosts_file: String,
    /// Path to the SSH private key. Supports `~/` expansion. When absent SSH
    /// falls back to its default key locations.
    pub ssh_identity_file: Option<String>,
    /// SSH port for remote locations; absent keeps the SSH default.
    pub ssh_port: Option<u16>,
    /// Force the legacy SCP protocol (`scp -O`), whose remote paths pass
    /// through the remote shell and are therefore quoted.
    #[ortho_config(default = false)]
    pub scp_legacy_protocol: bool,
}

/// Errors raised when loading the configuration from layered sources.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigLoadError {
    /// Indicates that parsing or merging configuration layers failed.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

/// Errors raised when a loaded configuration is unusable.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// A required value is empty.
    #[error("missing {field}: set SYNC_FIXTURE_{env_suffix} or add {field} to sync-fixture.toml", env_suffix = field.to_uppercase())]
    Missing {
        /// Configuration field that failed validation.
        field: String,
    },
    /// The hash length is not one this tool understands.
    #[error("unsupported hash_length {0}: expected {SHA1_HEX_LEN} or {SHA256_HEX_LEN}")]
    HashLength(usize),
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            hash_bin: DEFAULT_HASH_BIN.to_owned(),
            hash_length: SHA1_HEX_LEN,
            ssh_bin: String::from("ssh"),
            scp_bin: String::from("scp"),
            mkdir_bin: String::from("mkdir"),
            cp_bin: String::from("cp"),
            rm_bin: String::from("rm"),
            ssh_batch_mode: true,
            ssh_strict_host_key_checking: true,
            ssh_known_hosts_file: String::new(),
            ssh_identity_file: None,
            ssh_port: None,
            scp_legacy_protocol: false,
        }
    }
}

impl FixtureConfig {
    /// Loads configuration from defaults, configuration files and
    /// environment variables, ignoring the process arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigLoadError::Parse`] when merging sources fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigLoadError> {
        Self::load_from_iter([std::ffi::OsString::from("sync-fixture")])
            .map_err(|err| ConfigLoadError::Parse(err.to_string()))
    }

    /// Ensures required values are present after trimming whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when a required field is empty and
    /// [`ConfigError::HashLength`] for an unsupported digest length.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_value(&self.hash_bin, "hash_bin")?;
        Self::require_value(&self.ssh_bin, "ssh_bin")?;
        Self::require_value(&self.scp_bin, "scp_bin")?;
        Self::require_value(&self.mkdir_bin, "mkdir_bin")?;
        Self::require_value(&self.cp_bin, "cp_bin")?;
        Self::require_value(&self.rm_bin, "rm_bin")?;
        Self::require_optional_value(self.ssh_identity_file.as_deref(), "ssh_identity_file")?;
        if !matches!(self.hash_length, SHA1_HEX_LEN | SHA256_HEX_LEN) {
            return Err(ConfigError::HashLength(self.hash_length));
        }
        Ok(())
    }

    fn require_optional_value(value: Option<&str>, field: &str) -> Result<(), ConfigError> {
        match value {
            None => Ok(()),
            Some(v) if !v.trim().is_empty() => Ok(()),
            Some(_) => Err(ConfigError::Missing {
                field: field.to_owned(),
            }),
        }
    }

    fn require_value(value: &str, field: &str) -> Result<(), ConfigError> {
        Self::require_optional_value(Some(value), field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn base_config() -> FixtureConfig {
        FixtureConfig::default()
    }

    #[rstest]
    fn defaults_validate(base_config: FixtureConfig) {
        assert!(base_config.validate().is_ok());
    }

    #[rstest]
    #[case("hash_bin")]
    #[case("ssh_bin")]
    #[case("scp_bin")]
    #[case("cp_bin")]
    fn validation_rejects_blank_programs(base_config: FixtureConfig, #[case] field: &str) {
        for invalid in ["", "  "] {
            let mut cfg = base_config.clone();
            match field {
                "hash_bin" => cfg.hash_bin = invalid.to_owned(),
                "ssh_bin" => cfg.ssh_bin = invalid.to_owned(),
                "scp_bin" => cfg.scp_bin = invalid.to_owned(),
                _ => cfg.cp_bin = invalid.to_owned(),
            }
            let err = cfg.validate().expect_err("blank value should fail");
            assert_eq!(
                err,
                ConfigError::Missing {
                    field: field.to_owned()
                }
            );
        }
    }

    #[rstest]
    fn missing_value_message_is_actionable(base_config: FixtureConfig) {
        let cfg = FixtureConfig {
            ssh_identity_file: Some(String::from(" ")),
            ..base_config
        };
        let message = cfg
            .validate()
            .expect_err("blank identity should fail")
            .to_string();
        assert!(
            message.contains("SYNC_FIXTURE_SSH_IDENTITY_FILE"),
            "error should mention env var: {message}"
        );
        assert!(
            message.contains("sync-fixture.toml"),
            "error should mention config file: {message}"
        );
    }

    #[rstest]
    #[case(40, true)]
    #[case(64, true)]
    #[case(32, false)]
    fn hash_length_must_be_known(
        base_config: FixtureConfig,
        #[case] hash_length: usize,
        #[case] ok: bool,
    ) {
        let cfg = FixtureConfig {
            hash_length,
            ..base_config
        };
        assert_eq!(cfg.validate().is_ok(), ok);
    }
}
