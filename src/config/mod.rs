//! Configuration du chargeur de ROM sets

use serde::{Deserialize, Serialize};
use anyhow::Result;
use std::fs;

use crate::rom::LoadOptions;

/// Configuration principale
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RomLoaderConfig {
    pub catalog: CatalogConfig,
    pub loading: LoadingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogConfig {
    /// Fichier JSON du catalogue des jeux
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoadingConfig {
    /// Exiger que toutes les ROMs soient placées
    pub load_all: bool,

    /// Refuser les fichiers dont le CRC est incorrect à l'extraction
    #[serde(default)]
    pub reject_corrupt_files: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Filtre env_logger par défaut ("info", "debug", ...)
    pub level: String,
}

impl Default for RomLoaderConfig {
    fn default() -> Self {
        Self {
            catalog: CatalogConfig {
                path: "games.json".to_string(),
            },
            loading: LoadingConfig {
                load_all: true,
                reject_corrupt_files: false,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl From<&LoadingConfig> for LoadOptions {
    fn from(config: &LoadingConfig) -> Self {
        LoadOptions {
            load_all: config.load_all,
            reject_corrupt: config.reject_corrupt_files,
        }
    }
}

impl RomLoaderConfig {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: RomLoaderConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn load_or_default(path: &str) -> Self {
        Self::load_from_file(path).unwrap_or_default()
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions::from(&self.loading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_round_trip() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("romloader.toml");
        let path = path.to_string_lossy().to_string();

        let mut config = RomLoaderConfig::default();
        config.loading.reject_corrupt_files = true;
        config.save_to_file(&path)?;

        assert_eq!(RomLoaderConfig::load_from_file(&path)?, config);
        Ok(())
    }

    #[test]
    fn test_partial_file_uses_serde_defaults() {
        let config: RomLoaderConfig = toml::from_str(
            r#"
            [catalog]
            path = "model3.json"

            [loading]
            load_all = false

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.catalog.path, "model3.json");
        assert_eq!(
            config.load_options(),
            LoadOptions {
                load_all: false,
                reject_corrupt: false,
            }
        );
    }

    #[test]
    fn test_missing_file_falls_back_to_default() {
        let config = RomLoaderConfig::load_or_default("/nonexistent/romloader.toml");
        assert_eq!(config, RomLoaderConfig::default());
    }
}
