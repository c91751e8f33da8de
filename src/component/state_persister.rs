use std::any::Any;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use log::debug;
use once_cell::sync::OnceCell;
use serde::Deserialize;
use serde_yaml::Value as YamlValue;

use crate::application::Application;
use crate::core::error::{AppError, AppResult};
use crate::internal_error;

use super::{parse_options, ApplicationComponent};

pub const COMPONENT_TYPE: &str = "statePersister";

const DEFAULT_STATE_FILE: &str = "state.yaml";

pub fn create_state_persister_component(
    cfg: serde_yaml::Value,
) -> AppResult<Arc<dyn ApplicationComponent>> {
    let config: StatePersisterConfig = parse_options(cfg, COMPONENT_TYPE)?;

    Ok(Arc::new(StatePersister {
        configured_file: config.state_file.map(PathBuf::from),
        state_file: OnceCell::new(),
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct StatePersisterConfig {
    /// Explicit state file location. Defaults to `state.yaml` under the
    /// application runtime path.
    state_file: Option<String>,
}

/// Persists a global key/value state map to a YAML file under the runtime
/// path.
pub struct StatePersister {
    configured_file: Option<PathBuf>,
    state_file: OnceCell<PathBuf>,
}

impl StatePersister {
    pub fn state_file(&self) -> AppResult<&PathBuf> {
        self.state_file.get().ok_or_else(|| {
            AppError::Component("state persister used before initialization".to_string())
        })
    }

    /// Load the persisted state. A missing state file is an empty state.
    pub fn load(&self) -> AppResult<HashMap<String, YamlValue>> {
        let path = self.state_file()?;
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e.into()),
        };
        serde_yaml::from_str(&raw)
            .map_err(|e| internal_error!("malformed state file {}: {e}", path.display()))
    }

    pub fn save(&self, state: &HashMap<String, YamlValue>) -> AppResult<()> {
        let path = self.state_file()?;
        let raw = serde_yaml::to_string(state)
            .map_err(|e| internal_error!("unable to serialize state: {e}"))?;
        fs::write(path, raw)?;
        debug!("State written to {}", path.display());
        Ok(())
    }
}

impl ApplicationComponent for StatePersister {
    fn name(&self) -> &str {
        COMPONENT_TYPE
    }

    fn init(&self, app: &Application) -> AppResult<()> {
        let path = match &self.configured_file {
            Some(path) => path.clone(),
            None => app.runtime_path()?.join(DEFAULT_STATE_FILE),
        };
        let _ = self.state_file.set(path);
        Ok(())
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
