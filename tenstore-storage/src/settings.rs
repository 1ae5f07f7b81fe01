//! Local development settings.

use serde::{Deserialize, Serialize};
use tenstore_config::ConfigManager;

/// Settings section read by [`LocalDevelopmentSettings::from_config`].
pub const SETTINGS_SECTION: &str = "local";

/// Publicly documented key of the document and graph emulators.
pub const EMULATOR_ACCOUNT_KEY: &str =
    "C2y6yDjf5/R+ob0N8A7Cgv30VRDJIWEHLM+4QDU5DE2nQ9nDuVTqobD4b8mGGyPMbIZnqyMsEcaGQy67XIw/Jw==";

/// Emulator endpoints used when a tenant's configuration names no
/// credential at all. Never meant for production tenants.
///
/// Overridable through the `local` settings section, e.g.
/// `TENSTORE_LOCAL__GREMLIN_PORT=65400`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalDevelopmentSettings {
    /// Blob and table emulator
    pub storage_connection_string: String,
    /// Document database emulator
    pub cosmos_connection_string: String,
    /// Local relational server
    pub sql_connection_string: String,
    pub gremlin_host: String,
    pub gremlin_port: u16,
    pub gremlin_auth_key: String,
}

impl Default for LocalDevelopmentSettings {
    fn default() -> Self {
        Self {
            storage_connection_string: "UseDevelopmentStorage=true".to_string(),
            cosmos_connection_string: format!(
                "AccountEndpoint=https://localhost:8081/;AccountKey={}",
                EMULATOR_ACCOUNT_KEY
            ),
            sql_connection_string:
                "Server=(localdb)\\MSSQLLocalDB;Trusted_Connection=True;TrustServerCertificate=True"
                    .to_string(),
            gremlin_host: "localhost".to_string(),
            gremlin_port: 8901,
            gremlin_auth_key: EMULATOR_ACCOUNT_KEY.to_string(),
        }
    }
}

impl LocalDevelopmentSettings {
    /// Read the `local` section; missing keys keep their defaults.
    pub fn from_config(config: &ConfigManager) -> tenstore_config::Result<Self> {
        config.section(SETTINGS_SECTION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenstore_config::FileFormat;

    #[test]
    fn test_defaults_without_section() {
        let config = ConfigManager::new();
        let settings = LocalDevelopmentSettings::from_config(&config).unwrap();
        assert_eq!(settings, LocalDevelopmentSettings::default());
        assert_eq!(settings.storage_connection_string, "UseDevelopmentStorage=true");
    }

    #[test]
    fn test_partial_override() {
        let config = ConfigManager::new();
        config
            .load_str("[local]\ngremlin_port = 65400\n", FileFormat::Toml)
            .unwrap();

        let settings = LocalDevelopmentSettings::from_config(&config).unwrap();
        assert_eq!(settings.gremlin_port, 65400);
        assert_eq!(settings.gremlin_host, "localhost");
    }

    #[test]
    fn test_env_style_override() {
        let config = ConfigManager::new();
        config
            .load_str(
                "LOCAL__STORAGE_CONNECTION_STRING=AccountName=devacct;AccountKey=a2V5\n",
                FileFormat::Env,
            )
            .unwrap();

        let settings = LocalDevelopmentSettings::from_config(&config).unwrap();
        assert_eq!(
            settings.storage_connection_string,
            "AccountName=devacct;AccountKey=a2V5"
        );
    }
}
