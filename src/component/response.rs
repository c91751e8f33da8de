use std::any::Any;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde::Deserialize;
use validator::Validate;

use crate::core::error::AppResult;

use super::{parse_options, ApplicationComponent};

pub const COMPONENT_TYPE: &str = "response";

pub fn create_response_component(
    cfg: serde_yaml::Value,
) -> AppResult<Arc<dyn ApplicationComponent>> {
    let config: ResponseConfig = parse_options(cfg, COMPONENT_TYPE)?;
    config
        .validate()
        .map_err(|e| crate::config_error!("invalid `{COMPONENT_TYPE}` component options: {e}"))?;

    Ok(Arc::new(ResponseComponent {
        status: AtomicU16::new(config.default_status),
        headers: DashMap::new(),
    }))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
struct ResponseConfig {
    #[validate(range(min = 100, max = 599))]
    default_status: u16,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self { default_status: 200 }
    }
}

/// Response state accumulated by the request handler: status code and
/// headers.
pub struct ResponseComponent {
    status: AtomicU16,
    headers: DashMap<String, String>,
}

impl ResponseComponent {
    pub fn status(&self) -> u16 {
        self.status.load(Ordering::Relaxed)
    }

    pub fn set_status(&self, status: u16) {
        self.status.store(status, Ordering::Relaxed);
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.headers.get(name).map(|entry| entry.value().clone())
    }

    pub fn set_header(&self, name: &str, value: &str) {
        self.headers.insert(name.to_string(), value.to_string());
    }
}

impl ApplicationComponent for ResponseComponent {
    fn name(&self) -> &str {
        COMPONENT_TYPE
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
