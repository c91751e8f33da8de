use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Deserialize;
use uuid::Uuid;

use crate::core::error::AppResult;

use super::{parse_options, ApplicationComponent};

pub const COMPONENT_TYPE: &str = "request";

pub fn create_request_component(
    cfg: serde_yaml::Value,
) -> AppResult<Arc<dyn ApplicationComponent>> {
    let config: RequestConfig = parse_options(cfg, COMPONENT_TYPE)?;

    let params = DashMap::new();
    for (key, value) in config.params {
        params.insert(key, value);
    }

    Ok(Arc::new(RequestComponent {
        id: Uuid::new_v4().to_string(),
        params,
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RequestConfig {
    /// Parameters seeded into the request before processing starts.
    params: HashMap<String, String>,
}

/// Per-request metadata: a unique id and a mutable parameter bag.
pub struct RequestComponent {
    id: String,
    params: DashMap<String, String>,
}

impl RequestComponent {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn param(&self, key: &str) -> Option<String> {
        self.params.get(key).map(|entry| entry.value().clone())
    }

    pub fn set_param(&self, key: &str, value: &str) {
        self.params.insert(key.to_string(), value.to_string());
    }
}

impl ApplicationComponent for RequestComponent {
    fn name(&self) -> &str {
        COMPONENT_TYPE
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
