use std::any::Any;
use std::sync::Arc;

use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use validator::Validate;

use crate::core::error::AppResult;

use super::{parse_options, ApplicationComponent};

pub const COMPONENT_TYPE: &str = "securityManager";

const DIGEST_HEX_LEN: usize = 64;

pub fn create_security_manager_component(
    cfg: serde_yaml::Value,
) -> AppResult<Arc<dyn ApplicationComponent>> {
    let config: SecurityManagerConfig = parse_options(cfg, COMPONENT_TYPE)?;
    config
        .validate()
        .map_err(|e| crate::config_error!("invalid `{COMPONENT_TYPE}` component options: {e}"))?;

    let validation_key = match config.validation_key {
        Some(key) => key,
        None => rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect(),
    };

    Ok(Arc::new(SecurityManager { validation_key }))
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
struct SecurityManagerConfig {
    /// Key used for data integrity hashes. Generated at construction when
    /// not configured, which invalidates previously hashed data across
    /// restarts.
    #[validate(length(min = 8))]
    validation_key: Option<String>,
}

/// Keyed data integrity hashing: prefixes data with a digest over the
/// data and the validation key, and verifies such prefixes.
pub struct SecurityManager {
    validation_key: String,
}

impl SecurityManager {
    pub fn validation_key(&self) -> &str {
        &self.validation_key
    }

    /// Prefix `data` with its keyed digest.
    pub fn hash_data(&self, data: &str) -> String {
        format!("{}{data}", self.digest(data))
    }

    /// Verify a `hash_data` result and return the embedded payload, or
    /// `None` when the prefix does not match.
    pub fn validate_data(&self, data: &str) -> Option<String> {
        if data.len() < DIGEST_HEX_LEN || !data.is_char_boundary(DIGEST_HEX_LEN) {
            return None;
        }
        let (digest, payload) = data.split_at(DIGEST_HEX_LEN);
        if digest == self.digest(payload) {
            Some(payload.to_string())
        } else {
            None
        }
    }

    fn digest(&self, data: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data.as_bytes());
        hasher.update(self.validation_key.as_bytes());
        hasher
            .finalize()
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect()
    }
}

impl ApplicationComponent for SecurityManager {
    fn name(&self) -> &str {
        COMPONENT_TYPE
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
