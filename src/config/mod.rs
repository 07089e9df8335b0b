//! Configuration for the converter.
//!
//! Configuration is loaded with precedence: CLI args > Env vars > Config file > Defaults
//!
//! # Example config file (isni-convert.toml)
//! ```toml
//! max_resources = 10
//! identity_types = "organisations"
//! # Unset by default: merge chains stop after the root's relations
//! merge_chain_identity_type = "organisation"
//!
//! [vocabulary]
//! person_relations = "/etc/isni/person_relations.csv"
//! organisation_relations = "/etc/isni/organisation_relations.csv"
//! ```

mod defaults;

pub use defaults::*;

use crate::builder::IdentityTypeFilter;
use crate::error::{ConversionError, Result};
use crate::model::IdentityType;
use crate::vocabulary::{TermTable, Vocabulary};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// Main configuration for a conversion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Maximum resources kept per identity
    pub max_resources: usize,
    /// Identity types converted in this run
    pub identity_types: IdentityTypeFilter,
    /// Declared target type followed past the first hop of a merge chain
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_chain_identity_type: Option<IdentityType>,
    /// Relation vocabulary files
    pub vocabulary: VocabularyConfig,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            max_resources: DEFAULT_MAX_RESOURCES,
            identity_types: IdentityTypeFilter::default(),
            merge_chain_identity_type: DEFAULT_MERGE_CHAIN_IDENTITY_TYPE,
            vocabulary: VocabularyConfig::default(),
        }
    }
}

/// Paths to `term;code` vocabulary files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularyConfig {
    pub person_relations: Option<PathBuf>,
    pub organisation_relations: Option<PathBuf>,
}

impl ConverterConfig {
    /// Load configuration with precedence: CLI args > Env > File > Defaults
    ///
    /// # Arguments
    /// * `config_path` - Optional path to TOML config file
    /// * `overrides` - CLI overrides to apply on top
    pub fn load(config_path: Option<&str>, overrides: ConfigOverrides) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(ConverterConfig::default()));

        // Layer 1: Config file (if provided)
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Layer 2: Environment variables with ISNI_CONVERT_ prefix
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        // Layer 3: CLI overrides
        figment = figment.merge(Serialized::defaults(overrides));

        let config: ConverterConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment and optional config file only (no CLI overrides)
    pub fn from_env(config_path: Option<&str>) -> Result<Self> {
        Self::load(config_path, ConfigOverrides::default())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_resources == 0 {
            return Err(ConversionError::InvalidConfig {
                field: "max_resources".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Load the configured vocabulary files into one table.
    ///
    /// A vocabulary without a configured file stays unloaded, so encoding
    /// against it fails at conversion time.
    pub fn load_vocabularies(&self) -> Result<TermTable> {
        let mut table = TermTable::new();
        let files = [
            (Vocabulary::PersonRelations, &self.vocabulary.person_relations),
            (
                Vocabulary::OrganisationRelations,
                &self.vocabulary.organisation_relations,
            ),
        ];
        for (vocabulary, path) in files {
            if let Some(path) = path {
                let terms = table.load_file(vocabulary, path)?;
                info!(%vocabulary, path = %path.display(), terms, "vocabulary loaded");
            }
        }
        Ok(table)
    }
}

/// CLI overrides that take precedence over file and env config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_resources: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_types: Option<IdentityTypeFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vocabulary: Option<VocabularyOverrides>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularyOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person_relations: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organisation_relations: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConverterConfig::default();
        assert_eq!(config.max_resources, DEFAULT_MAX_RESOURCES);
        assert_eq!(config.identity_types, IdentityTypeFilter::Both);
        assert_eq!(config.merge_chain_identity_type, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_max_resources_is_invalid() {
        let config = ConverterConfig {
            max_resources: 0,
            ..ConverterConfig::default()
        };
        match config.validate() {
            Err(ConversionError::InvalidConfig { field, .. }) => assert_eq!(field, "max_resources"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_overrides_take_precedence() {
        let overrides = ConfigOverrides {
            max_resources: Some(3),
            identity_types: Some(IdentityTypeFilter::Organisations),
            vocabulary: None,
        };
        let config = ConverterConfig::load(None, overrides).unwrap();
        assert_eq!(config.max_resources, 3);
        assert_eq!(config.identity_types, IdentityTypeFilter::Organisations);
    }

    #[test]
    fn test_chain_identity_type_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("isni-convert.toml");
        std::fs::write(&path, "merge_chain_identity_type = \"organisation\"\n").unwrap();

        let config = ConverterConfig::from_env(path.to_str()).unwrap();
        assert_eq!(
            config.merge_chain_identity_type,
            Some(IdentityType::Organisation)
        );
    }

    #[test]
    fn test_filter_serde() {
        let json = serde_json::to_string(&IdentityTypeFilter::Organisations).unwrap();
        assert_eq!(json, "\"organisations\"");
    }
}
