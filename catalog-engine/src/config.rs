//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: `CATALOG_`, nesting separator: `__`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/catalog-engine/{service_name}/config.toml
//! 4. System directory: /etc/catalog-engine/{service_name}/config.toml
//! 5. Default values
//!
//! Entities are declared under `[entities.<key>]`:
//!
//! ```toml
//! [service]
//! name = "catalog"
//! log_level = "debug"
//!
//! [entities.orientation]
//! entity_name = "Orientation"
//! collection = "orientations"
//! references = [{ collection = "products", field = "orientations" }]
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::entity::EntityConfig;
use crate::error::{Error, Result};

/// Prefix for XDG and system config directories
pub const CONFIG_PREFIX: &str = "catalog-engine";

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "CATALOG_";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    pub service: ServiceConfig,

    /// Entities keyed by a short lowercase name
    #[serde(default)]
    pub entities: BTreeMap<String, EntityConfig>,
}

/// Service-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    pub name: String,

    /// Log level or `EnvFilter` directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format
    #[serde(default)]
    pub log_format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event
    #[default]
    Json,
    /// Human-readable multi-line output
    Pretty,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from all sources
    ///
    /// The service name is inferred from the binary name.
    pub fn load() -> Result<Self> {
        let service_name = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| CONFIG_PREFIX.to_string());

        Self::load_for_service(&service_name)
    }

    /// Load configuration for a specific service name
    pub fn load_for_service(service_name: &str) -> Result<Self> {
        let config_paths = Self::find_config_paths(service_name);

        tracing::debug!(service = %service_name, "Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // lowest priority first
        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        let config: Config = figment.merge(Self::env()).extract()?;
        config.log_summary();
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// Bypasses directory discovery. Environment variables still apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Self::env())
            .extract()?;

        config.log_summary();
        Ok(config)
    }

    fn env() -> Env {
        Env::prefixed(ENV_PREFIX).split("__")
    }

    fn log_summary(&self) {
        tracing::debug!(
            service = %self.service.name,
            entities = ?self.entities.keys().collect::<Vec<_>>(),
            "Configuration loaded"
        );
    }

    /// Candidate config file paths, highest priority first
    fn find_config_paths(service_name: &str) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix(CONFIG_PREFIX);
        let config_file_path = Path::new(service_name).join("config.toml");
        if let Ok(path) = xdg_dirs.place_config_file(&config_file_path) {
            paths.push(path);
        }

        paths.push(
            PathBuf::from("/etc")
                .join(CONFIG_PREFIX)
                .join(service_name)
                .join("config.toml"),
        );

        paths
    }

    /// Where a service's config file should live
    ///
    /// Returns: ~/.config/catalog-engine/{service_name}/config.toml
    pub fn recommended_path(service_name: &str) -> PathBuf {
        let xdg_dirs = xdg::BaseDirectories::with_prefix(CONFIG_PREFIX);
        let config_file_path = Path::new(service_name).join("config.toml");

        xdg_dirs.place_config_file(&config_file_path).unwrap_or_else(|_| {
            PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| String::from("~")))
                .join(".config")
                .join(CONFIG_PREFIX)
                .join(service_name)
                .join("config.toml")
        })
    }

    /// Look up an entity by key
    pub fn entity(&self, key: &str) -> Result<&EntityConfig> {
        self.entities
            .get(key)
            .ok_or_else(|| Error::UnknownEntity(key.to_string()))
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut entities = BTreeMap::new();
        entities.insert("orientation".to_string(), EntityConfig::orientation());

        Self {
            service: ServiceConfig {
                name: CONFIG_PREFIX.to_string(),
                log_level: default_log_level(),
                log_format: LogFormat::default(),
            },
            entities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{BulkSlugPolicy, MissingPolicy};
    use figment::Jail;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service.log_level, "info");
        assert_eq!(config.service.log_format, LogFormat::Json);
        assert_eq!(config.entity("orientation").unwrap().collection, "orientations");
    }

    #[test]
    fn test_unknown_entity() {
        let err = Config::default().entity("brand").unwrap_err();
        assert!(matches!(err, Error::UnknownEntity(ref key) if key == "brand"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[service]
name = "catalog"
log_format = "pretty"

[entities.brand]
entity_name = "Brand"
collection = "brands"
bulk_slug_policy = "per_item"
missing_by_id = "null"
default_sort = [{{ field = "name", direction = "asc" }}]
references = [{{ collection = "products", field = "brands" }}]
"#
        )
        .unwrap();

        Jail::expect_with(|_| {
            let config = Config::load_from(file.path()).map_err(|e| e.to_string())?;
            assert_eq!(config.service.name, "catalog");
            assert_eq!(config.service.log_format, LogFormat::Pretty);
            assert_eq!(config.service.log_level, "info");

            let brand = config.entity("brand").unwrap();
            assert_eq!(brand.collection, "brands");
            assert_eq!(brand.search_field, "name");
            assert_eq!(brand.bulk_slug_policy, BulkSlugPolicy::PerItem);
            assert_eq!(brand.missing_by_id, MissingPolicy::Null);
            assert_eq!(brand.references[0].field, "brands");
            // defaults survive alongside file-declared entities
            assert!(config.entities.contains_key("orientation"));
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "catalog.toml",
                r#"
[service]
name = "catalog"
log_level = "warn"
"#,
            )?;
            jail.set_env("CATALOG_SERVICE__LOG_LEVEL", "debug");
            jail.set_env("CATALOG_ENTITIES__ORIENTATION__SEARCH_FIELD", "slug");

            let config = Config::load_from("catalog.toml").map_err(|e| e.to_string())?;
            assert_eq!(config.service.name, "catalog");
            assert_eq!(config.service.log_level, "debug");
            assert_eq!(config.entity("orientation").unwrap().search_field, "slug");
            Ok(())
        });
    }

    #[test]
    fn test_recommended_path_under_xdg_home() {
        Jail::expect_with(|jail| {
            let home = jail.directory().join("xdg");
            jail.set_env("XDG_CONFIG_HOME", home.display().to_string());

            let path = Config::recommended_path("catalog");
            assert_eq!(path, home.join(CONFIG_PREFIX).join("catalog").join("config.toml"));
            assert!(path.parent().is_some_and(Path::is_dir));
            Ok(())
        });
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        Jail::expect_with(|_| {
            let config = Config::load_from("absent.toml").map_err(|e| e.to_string())?;
            assert_eq!(config, Config::default());
            Ok(())
        });
    }
}
