use std::any::Any;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use log::{debug, warn};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use validator::Validate;

use crate::application::Application;
use crate::core::error::AppResult;
use crate::core::locale::DEFAULT_SOURCE_LANGUAGE;

use super::{parse_options, ApplicationComponent};

pub const COMPONENT_TYPE: &str = "messageSource";

pub fn create_message_source_component(
    cfg: serde_yaml::Value,
) -> AppResult<Arc<dyn ApplicationComponent>> {
    let config: MessageSourceConfig = parse_options(cfg, COMPONENT_TYPE)?;
    config
        .validate()
        .map_err(|e| crate::config_error!("invalid `{COMPONENT_TYPE}` component options: {e}"))?;

    Ok(Arc::new(MessageSource::new(
        PathBuf::from(config.base_path),
        config.force_translation,
    )))
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
struct MessageSourceConfig {
    /// Directory holding one subdirectory per language, each with one
    /// YAML file per message category.
    #[validate(length(min = 1))]
    base_path: String,
    /// Translate even when the target language equals the source language.
    force_translation: bool,
}

type MessageMap = Arc<HashMap<String, String>>;

/// Translates messages by category and language, backed by YAML files
/// laid out as `{base_path}/{language}/{category}.yaml`. Loaded files are
/// memoized per language and category.
pub struct MessageSource {
    base_path: PathBuf,
    force_translation: bool,
    source_language: OnceCell<String>,
    loaded: DashMap<String, MessageMap>,
}

impl MessageSource {
    pub(crate) fn new(base_path: PathBuf, force_translation: bool) -> Self {
        Self {
            base_path,
            force_translation,
            source_language: OnceCell::new(),
            loaded: DashMap::new(),
        }
    }

    /// Translate `message` in `category` to `language`. Returns the input
    /// message unchanged when the target language is the source language
    /// or when no translation exists.
    pub fn translate(&self, category: &str, message: &str, language: &str) -> String {
        let source = self
            .source_language
            .get()
            .map(String::as_str)
            .unwrap_or(DEFAULT_SOURCE_LANGUAGE);
        if language == source && !self.force_translation {
            return message.to_string();
        }

        match self.messages_for(language, category).get(message) {
            Some(translated) => translated.clone(),
            None => message.to_string(),
        }
    }

    fn messages_for(&self, language: &str, category: &str) -> MessageMap {
        let key = format!("{language}/{category}");
        if let Some(entry) = self.loaded.get(&key) {
            return entry.value().clone();
        }

        let path = self.base_path.join(language).join(format!("{category}.yaml"));
        let messages = Arc::new(Self::load_file(&path));
        self.loaded.insert(key, messages.clone());
        messages
    }

    fn load_file(path: &Path) -> HashMap<String, String> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => {
                debug!("No message file at {}", path.display());
                return HashMap::new();
            }
        };
        match serde_yaml::from_str(&raw) {
            Ok(messages) => messages,
            Err(e) => {
                warn!("Ignoring malformed message file {}: {e}", path.display());
                HashMap::new()
            }
        }
    }
}

impl ApplicationComponent for MessageSource {
    fn name(&self) -> &str {
        COMPONENT_TYPE
    }

    fn init(&self, app: &Application) -> AppResult<()> {
        let _ = self.source_language.set(app.source_language().to_string());
        Ok(())
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_messages_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("appcore-messages-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(dir.join("fr_fr")).unwrap();
        fs::write(
            dir.join("fr_fr/app.yaml"),
            "\"Hello\": \"Bonjour\"\n\"Goodbye\": \"Au revoir\"\n",
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_translate_hit_and_fallback() {
        let dir = temp_messages_dir();
        let source = MessageSource::new(dir.clone(), false);

        assert_eq!(source.translate("app", "Hello", "fr_fr"), "Bonjour");
        assert_eq!(source.translate("app", "Untranslated", "fr_fr"), "Untranslated");
        // Missing category falls back to the input message.
        assert_eq!(source.translate("other", "Hello", "fr_fr"), "Hello");

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_source_language_passthrough() {
        let source = MessageSource::new(PathBuf::from("/nonexistent"), false);
        assert_eq!(source.translate("app", "Hello", DEFAULT_SOURCE_LANGUAGE), "Hello");
    }
}
