// Settings - defaults, then an optional TOML file, then BILLING_* variables
//
// Example billing.toml:
//
//   [database]
//   path = "customer.db"
//
//   [export]
//   directory = "bills"
//   default_format = "text"
//
//   [accounts]
//   id_min = 100000
//   id_max = 999999
//
// Environment overrides use "__" between section and key, e.g.
// BILLING_DATABASE__PATH=/var/lib/billing/customer.db

use crate::export::ExportFormat;
use crate::store::{DEFAULT_ID_MAX, DEFAULT_ID_MIN};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_CONFIG_FILE: &str = "billing.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub export: ExportSettings,
    pub accounts: AccountSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSettings {
    pub directory: PathBuf,
    pub default_format: ExportFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSettings {
    pub id_min: u32,
    pub id_max: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database: DatabaseSettings {
                path: PathBuf::from("customer.db"),
            },
            export: ExportSettings {
                directory: PathBuf::from("bills"),
                default_format: ExportFormat::Text,
            },
            accounts: AccountSettings {
                id_min: DEFAULT_ID_MIN,
                id_max: DEFAULT_ID_MAX,
            },
        }
    }
}

impl Settings {
    /// Load settings. `path` must exist when given; otherwise `billing.toml`
    /// in the working directory is read if present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                File::from(path).required(true)
            }
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        Self::builder(file)?.build()?.try_deserialize()
    }

    fn builder(
        file: File<config::FileSourceFile, config::FileFormat>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let defaults = Settings::default();

        Ok(Config::builder()
            .set_default("database.path", defaults.database.path.to_string_lossy().into_owned())?
            .set_default(
                "export.directory",
                defaults.export.directory.to_string_lossy().into_owned(),
            )?
            .set_default("export.default_format", "text")?
            .set_default("accounts.id_min", i64::from(defaults.accounts.id_min))?
            .set_default("accounts.id_max", i64::from(defaults.accounts.id_max))?
            .add_source(file)
            .add_source(
                Environment::with_prefix("BILLING")
                    .prefix_separator("_")
                    .separator("__"),
            ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_without_file() {
        let file = File::with_name("definitely-missing-billing-config").required(false);
        let settings: Settings = Settings::builder(file)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.accounts.id_min, 100_000);
        assert_eq!(settings.accounts.id_max, 999_999);
        assert_eq!(settings.export.default_format, ExportFormat::Text);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[database]\npath = \"/tmp/test-billing.db\"\n\n[export]\ndefault_format = \"html\"\n\n[accounts]\nid_min = 10\nid_max = 20"
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();

        assert_eq!(settings.database.path, PathBuf::from("/tmp/test-billing.db"));
        assert_eq!(settings.export.default_format, ExportFormat::Html);
        assert_eq!(settings.export.directory, PathBuf::from("bills"));
        assert_eq!(settings.accounts.id_min, 10);
        assert_eq!(settings.accounts.id_max, 20);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let file = NamedTempFile::new().unwrap();
        let missing = file.path().with_extension("absent.toml");
        assert!(Settings::load(Some(&missing)).is_err());
    }
}
