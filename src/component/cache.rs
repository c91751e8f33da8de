use std::any::Any;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Deserialize;

use crate::core::error::AppResult;

use super::{parse_options, ApplicationComponent};

pub const COMPONENT_TYPE: &str = "cache";

pub fn create_cache_component(cfg: serde_yaml::Value) -> AppResult<Arc<dyn ApplicationComponent>> {
    let config: CacheConfig = parse_options(cfg, COMPONENT_TYPE)?;

    Ok(Arc::new(MemoryCache {
        key_prefix: config.key_prefix,
        entries: DashMap::new(),
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct CacheConfig {
    /// Prefix applied to every key, so multiple applications can share a
    /// cache namespace.
    key_prefix: String,
}

/// In-process key/value cache.
pub struct MemoryCache {
    key_prefix: String,
    entries: DashMap<String, String>,
}

impl MemoryCache {
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries
            .get(&self.build_key(key))
            .map(|entry| entry.value().clone())
    }

    pub fn set(&self, key: &str, value: &str) {
        self.entries.insert(self.build_key(key), value.to_string());
    }

    pub fn delete(&self, key: &str) -> bool {
        self.entries.remove(&self.build_key(key)).is_some()
    }

    pub fn flush(&self) {
        self.entries.clear();
    }

    fn build_key(&self, key: &str) -> String {
        format!("{}{key}", self.key_prefix)
    }
}

impl ApplicationComponent for MemoryCache {
    fn name(&self) -> &str {
        COMPONENT_TYPE
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
