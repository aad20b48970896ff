//! Matcher configuration.
//!
//! A [`Config`] is read from YAML (or JSON) and builds the configured
//! [`PatchMaker`], [`ObjectMatcher`] and ignore rule pipeline. Every field
//! has a default, so an empty document is a valid configuration.

use crate::annotation::{Annotator, LAST_APPLIED_CONFIG};
use crate::codec::{Codec, CodecConfig};
use crate::defaults::{BuiltinDefaults, Defaulter, NoDefaults};
use crate::error::{Error, Result};
use crate::objectmatch::ObjectMatcher;
use crate::patch::{
    ignore_field, ignore_pdb_selector, ignore_status_fields,
    ignore_volume_claim_template_type_meta_and_status, CalculateOption, PatchMaker,
};
use crate::strategic::Catalog;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Annotation holding the last applied configuration.
    pub annotation_key: String,
    pub codec: CodecConfig,
    pub ignore: IgnoreConfig,
    pub defaults: DefaultsMode,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            annotation_key: LAST_APPLIED_CONFIG.to_string(),
            codec: CodecConfig::default(),
            ignore: IgnoreConfig::default(),
            defaults: DefaultsMode::default(),
        }
    }
}

/// IgnoreConfig selects the ignore rules run before a patch is calculated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IgnoreConfig {
    pub status: bool,
    pub volume_claim_templates: bool,
    pub pdb_selector: bool,
    /// Dotted field paths removed from both objects, e.g. `spec.replicas`.
    pub fields: Vec<String>,
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        IgnoreConfig {
            status: true,
            volume_claim_templates: true,
            pdb_selector: true,
            fields: Vec::new(),
        }
    }
}

/// Server defaults applied to desired objects by the matchers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultsMode {
    #[default]
    Builtin,
    None,
}

impl DefaultsMode {
    pub fn defaulter(self) -> Arc<dyn Defaulter> {
        match self {
            DefaultsMode::Builtin => Arc::new(BuiltinDefaults),
            DefaultsMode::None => Arc::new(NoDefaults),
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Config> {
        if yaml.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(yaml).map_err(|source| Error::Config { source })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|source| Error::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        Config::from_yaml(&data)
    }

    pub fn codec(&self) -> Codec {
        Codec::new(&self.codec)
    }

    /// Builds the ignore rule pipeline, in a fixed order.
    pub fn options(&self) -> Vec<Box<dyn CalculateOption>> {
        let mut opts = Vec::new();
        if self.ignore.status {
            opts.push(ignore_status_fields());
        }
        if self.ignore.volume_claim_templates {
            opts.push(ignore_volume_claim_template_type_meta_and_status());
        }
        if self.ignore.pdb_selector {
            opts.push(ignore_pdb_selector());
        }
        opts.extend(self.ignore.fields.iter().map(|f| ignore_field(f)));
        opts
    }

    pub fn patch_maker(&self) -> PatchMaker {
        PatchMaker::new(
            Annotator::new(self.annotation_key.clone(), self.codec()),
            Catalog::builtin(),
        )
    }

    pub fn object_matcher(&self) -> ObjectMatcher {
        ObjectMatcher::new(self.codec(), Catalog::builtin(), self.defaults.defaulter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
        assert_eq!(Config::from_yaml("{}").unwrap(), Config::default());

        let names: Vec<String> = Config::default()
            .options()
            .iter()
            .map(|o| o.name().to_string())
            .collect();
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn test_from_yaml() {
        let config = Config::from_yaml(
            r#"annotationKey: example.com/last-applied
codec:
  intOrStringFields: [ports.targetPort]
ignore:
  status: false
  pdbSelector: false
  fields: [spec.replicas, metadata.labels]
defaults: none
"#,
        )
        .unwrap();

        assert_eq!(config.annotation_key, "example.com/last-applied");
        assert_eq!(config.codec.int_or_string_fields, vec!["ports.targetPort".to_string()]);
        assert_eq!(
            config.ignore,
            IgnoreConfig {
                status: false,
                volume_claim_templates: true,
                pdb_selector: false,
                fields: vec!["spec.replicas".to_string(), "metadata.labels".to_string()],
            }
        );
        assert_eq!(config.defaults, DefaultsMode::None);
        assert_eq!(config.options().len(), 3);
        assert_eq!(config.patch_maker().annotator().key(), "example.com/last-applied");
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            Config::from_yaml("defaults: sometimes\n"),
            Err(Error::Config { .. })
        ));
        assert!(matches!(
            Config::load("/nonexistent/objmatch.yaml"),
            Err(Error::ConfigIo { .. })
        ));
    }
}
