//! Explicit configuration for a sync job

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::report::DEFAULT_INLINE_LIMIT;
use crate::types::*;
use crate::utils::{validate_address, validate_id_field};

/// Environment variable overriding `source_path`
pub const ENV_SOURCE: &str = "PROPERTY_SYNC_SOURCE";
/// Environment variable overriding `store.database_path`
pub const ENV_DATABASE: &str = "PROPERTY_SYNC_DATABASE";
/// Environment variable overriding `mail.recipient`
pub const ENV_RECIPIENT: &str = "PROPERTY_SYNC_RECIPIENT";

fn default_id_field() -> String {
    "zpid".to_string()
}

/// Everything a sync run needs, passed explicitly to the job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// JSON export holding the batch
    pub source_path: PathBuf,
    /// Attribute carrying each record's identifier
    #[serde(default = "default_id_field")]
    pub id_field: String,
    pub store: StoreConfig,
    pub mail: MailConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub database_path: PathBuf,
}

/// Who the report comes from and goes to, and where it is queued
///
/// Relay authentication is not kept here; the relay draining the outbox
/// owns its own credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailConfig {
    pub sender: String,
    pub recipient: String,
    pub outbox_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "ReportConfig::default_inline_limit")]
    pub inline_limit: usize,
    #[serde(default = "ReportConfig::default_attachment_dir")]
    pub attachment_dir: PathBuf,
}

impl ReportConfig {
    fn default_inline_limit() -> usize {
        DEFAULT_INLINE_LIMIT
    }

    fn default_attachment_dir() -> PathBuf {
        PathBuf::from(".")
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            inline_limit: Self::default_inline_limit(),
            attachment_dir: Self::default_attachment_dir(),
        }
    }
}

/// Where the dated run log is written and how verbose it is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_directory")]
    pub directory: PathBuf,
    /// Log files are named `<file_prefix>.YYYY-MM-DD.log`
    #[serde(default = "LoggingConfig::default_file_prefix")]
    pub file_prefix: String,
    /// `tracing-subscriber` filter directive, e.g. `info` or `property_sync=debug`
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_directory() -> PathBuf {
        PathBuf::from(".")
    }

    fn default_file_prefix() -> String {
        "property_sync".to_string()
    }

    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: Self::default_directory(),
            file_prefix: Self::default_file_prefix(),
            level: Self::default_level(),
        }
    }
}

impl SyncConfig {
    /// Parse and validate a TOML document
    pub fn from_toml(text: &str) -> SyncResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| SyncError::Config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file, apply environment overrides, then validate
    pub fn load(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SyncError::Config(format!("cannot read {}: {e}", path.display())))?;
        let mut config: Self = toml::from_str(&text)
            .map_err(|e| SyncError::Config(format!("{}: {e}", path.display())))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Override selected fields from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Override selected fields from any key lookup
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(source) = lookup(ENV_SOURCE) {
            self.source_path = PathBuf::from(source);
        }
        if let Some(database) = lookup(ENV_DATABASE) {
            self.store.database_path = PathBuf::from(database);
        }
        if let Some(recipient) = lookup(ENV_RECIPIENT) {
            self.mail.recipient = recipient;
        }
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> SyncResult<()> {
        validate_id_field(&self.id_field)?;
        validate_address("Sender", &self.mail.sender)?;
        validate_address("Recipient", &self.mail.recipient)?;
        if self.report.inline_limit == 0 {
            return Err(SyncError::Config(
                "Inline limit must be at least 1".to_string(),
            ));
        }
        if self.logging.file_prefix.trim().is_empty() {
            return Err(SyncError::Config(
                "Log file prefix cannot be empty".to_string(),
            ));
        }
        crate::logging::env_filter(&self.logging)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const MINIMAL: &str = r#"
source_path = "export.json"

[store]
database_path = "properties.db"

[mail]
sender = "sync@example.com"
recipient = "ops@example.com"
outbox_dir = "outbox"
"#;

    #[test]
    fn test_defaults_applied() {
        let config = SyncConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.id_field, "zpid");
        assert_eq!(config.report.inline_limit, 100);
        assert_eq!(config.report.attachment_dir, PathBuf::from("."));
    }

    #[test]
    fn test_explicit_report_section() {
        let text = format!(
            "{MINIMAL}\n[report]\ninline_limit = 25\nattachment_dir = \"/tmp/reports\"\n"
        );
        let config = SyncConfig::from_toml(&text).unwrap();
        assert_eq!(config.report.inline_limit, 25);
        assert_eq!(config.report.attachment_dir, PathBuf::from("/tmp/reports"));
    }

    #[test]
    fn test_missing_section_is_config_error() {
        let result = SyncConfig::from_toml("source_path = \"x.json\"");
        assert!(matches!(result, Err(SyncError::Config(_))));
    }

    #[test]
    fn test_invalid_recipient_rejected() {
        let text = MINIMAL.replace("ops@example.com", "ops");
        assert!(matches!(
            SyncConfig::from_toml(&text),
            Err(SyncError::Config(_))
        ));
    }

    #[test]
    fn test_zero_inline_limit_rejected() {
        let text = format!("{MINIMAL}\n[report]\ninline_limit = 0\n");
        assert!(SyncConfig::from_toml(&text).is_err());
    }

    #[test]
    fn test_mail_section_keeps_identities_only() {
        let text = MINIMAL.replace(
            "outbox_dir = \"outbox\"",
            "outbox_dir = \"outbox\"\nusername = \"relay\"\npassword = \"secret\"",
        );
        let config = SyncConfig::from_toml(&text).unwrap();

        let mail = serde_json::to_value(&config.mail).unwrap();
        let mut keys: Vec<_> = mail.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["outbox_dir", "recipient", "sender"]);
        assert!(!serde_json::to_string(&config).unwrap().contains("secret"));
    }

    #[test]
    fn test_logging_section() {
        let config = SyncConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.logging, LoggingConfig::default());
        assert_eq!(config.logging.file_prefix, "property_sync");

        let text = format!(
            "{MINIMAL}\n[logging]\ndirectory = \"/var/log/sync\"\nlevel = \"property_sync=debug\"\n"
        );
        let config = SyncConfig::from_toml(&text).unwrap();
        assert_eq!(config.logging.directory, PathBuf::from("/var/log/sync"));
        assert_eq!(config.logging.level, "property_sync=debug");
        assert_eq!(config.logging.file_prefix, "property_sync");
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let text = format!("{MINIMAL}\n[logging]\nlevel = \"property_sync=loud\"\n");
        assert!(matches!(
            SyncConfig::from_toml(&text),
            Err(SyncError::Config(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let mut config = SyncConfig::from_toml(MINIMAL).unwrap();
        let vars: HashMap<&str, &str> = [
            (ENV_SOURCE, "/data/today.json"),
            (ENV_RECIPIENT, "alerts@example.com"),
        ]
        .into_iter()
        .collect();

        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.source_path, PathBuf::from("/data/today.json"));
        assert_eq!(config.mail.recipient, "alerts@example.com");
        assert_eq!(config.store.database_path, PathBuf::from("properties.db"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync.toml");
        std::fs::write(&path, MINIMAL).unwrap();

        let config = SyncConfig::load(&path).unwrap();
        assert_eq!(config.mail.sender, "sync@example.com");
    }
}
