use std::collections::HashMap;
use std::fs;

use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::Value as YamlValue;
use validator::{Validate, ValidationError};

use crate::core::error::{AppError, AppResult};
use crate::core::locale::DEFAULT_SOURCE_LANGUAGE;
use crate::{config_error, internal_error};

/// Language codes look like `en` or `en_us`.
static LANGUAGE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z]{2,3}(_[a-z]{2,4})?$").unwrap());

#[derive(Debug, Serialize, Deserialize, Validate)]
#[validate(schema(function = "AppConfig::validate_languages"))]
pub struct AppConfig {
    /// Root directory of the application. Must exist.
    #[validate(length(min = 1))]
    pub base_path: String,

    #[serde(default = "AppConfig::default_name")]
    pub name: String,

    /// Explicit application id. Derived from the base path and name when
    /// absent.
    pub id: Option<String>,

    /// Writable working directory. Defaults to `{base_path}/runtime`.
    pub runtime_path: Option<String>,

    #[serde(default = "AppConfig::default_source_language")]
    pub source_language: String,

    /// Initial effective-language override.
    pub language: Option<String>,

    pub time_zone: Option<String>,

    /// Component names resolved eagerly, in order, during initialization.
    #[serde(default)]
    pub preload: Vec<String>,

    /// Component descriptors merged over the core set.
    #[serde(default)]
    pub components: HashMap<String, ComponentSpec>,

    #[serde(default)]
    pub log: Log,
}

// Config file load and validation
impl AppConfig {
    pub fn load_from_yaml<P>(path: P) -> AppResult<Self>
    where
        P: AsRef<std::path::Path> + std::fmt::Display,
    {
        let conf_str = fs::read_to_string(&path)
            .map_err(|e| config_error!("unable to read conf file from {path}: {e}"))?;
        debug!("Conf file read from {path}");
        Self::from_yaml(&conf_str)
    }

    pub fn from_yaml(conf_str: &str) -> AppResult<Self> {
        trace!("Read conf file: {conf_str}");
        let conf: AppConfig = serde_yaml::from_str(conf_str)
            .map_err(|e| config_error!("unable to parse yaml conf: {e}"))?;

        trace!("Loaded conf: {conf:?}");

        conf.validate()
            .map_err(|e| AppError::Validation(format!("conf file validation failed: {e}")))?;

        Ok(conf)
    }

    #[allow(dead_code)]
    pub fn to_yaml(&self) -> AppResult<String> {
        serde_yaml::to_string(self).map_err(|e| internal_error!("unable to serialize conf: {e}"))
    }

    fn default_name() -> String {
        "My Application".to_string()
    }

    fn default_source_language() -> String {
        DEFAULT_SOURCE_LANGUAGE.to_string()
    }

    fn validate_languages(&self) -> Result<(), ValidationError> {
        if !LANGUAGE_CODE.is_match(&self.source_language) {
            return Err(ValidationError::new("invalid_source_language"));
        }
        if let Some(language) = &self.language {
            if !LANGUAGE_CODE.is_match(language) {
                return Err(ValidationError::new("invalid_language"));
            }
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_path: String::new(),
            name: Self::default_name(),
            id: None,
            runtime_path: None,
            source_language: Self::default_source_language(),
            language: None,
            time_zone: None,
            preload: Vec::new(),
            components: HashMap::new(),
            log: Log::default(),
        }
    }
}

/// A component configuration descriptor: the type identifier resolved
/// through the factory table, plus the options handed to the factory.
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct ComponentSpec {
    #[serde(rename = "type")]
    #[validate(length(min = 1))]
    pub type_id: String,

    #[serde(default)]
    pub options: YamlValue,
}

impl ComponentSpec {
    pub fn new(type_id: &str) -> Self {
        Self {
            type_id: type_id.to_string(),
            options: YamlValue::Null,
        }
    }

    pub fn with_options(type_id: &str, options: YamlValue) -> Self {
        Self {
            type_id: type_id.to_string(),
            options,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Log {
    #[serde(default = "Log::default_level")]
    pub level: String,
}

impl Log {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_conf() {
        let conf = AppConfig::from_yaml("base_path: /srv/app\n").unwrap();
        assert_eq!(conf.base_path, "/srv/app");
        assert_eq!(conf.name, "My Application");
        assert_eq!(conf.source_language, DEFAULT_SOURCE_LANGUAGE);
        assert!(conf.preload.is_empty());
        assert!(conf.components.is_empty());
    }

    #[test]
    fn test_full_conf() {
        let conf = AppConfig::from_yaml(
            r#"
base_path: /srv/app
name: billing
id: billing-prod
source_language: en_us
language: fr_fr
time_zone: Europe/Paris
preload:
  - errorHandler
  - statePersister
components:
  db:
    type: db
    options:
      dsn: postgres://localhost/billing
log:
  level: debug
"#,
        )
        .unwrap();
        assert_eq!(conf.id.as_deref(), Some("billing-prod"));
        assert_eq!(conf.preload, vec!["errorHandler", "statePersister"]);
        assert_eq!(conf.components["db"].type_id, "db");
        assert_eq!(conf.log.level, "debug");
    }

    #[test]
    fn test_empty_base_path_rejected() {
        let err = AppConfig::from_yaml("base_path: \"\"\n").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_bad_language_rejected() {
        let err = AppConfig::from_yaml("base_path: /srv/app\nsource_language: English\n")
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_malformed_yaml_rejected() {
        let err = AppConfig::from_yaml("base_path: [unclosed\n").unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }
}
