pub mod cache;
pub mod error_handler;
pub mod formatter;
pub mod message_source;
pub mod request;
pub mod response;
pub mod security_manager;
pub mod state_persister;

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_yaml::Value as YamlValue;

use crate::application::Application;
use crate::config_error;
use crate::core::error::AppResult;

/// A named service owned by the application.
///
/// `init` runs once, after construction and before the instance is
/// memoized in the registry; it receives the application so components can
/// read paths, locale state, or resolve sibling components.
pub trait ApplicationComponent: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn init(&self, _app: &Application) -> AppResult<()> {
        Ok(())
    }

    /// Upcast for the typed accessors on the application.
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl fmt::Debug for dyn ApplicationComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationComponent")
            .field("name", &self.name())
            .finish()
    }
}

/// Factory function resolving a component's configuration options into an
/// instance.
pub type ComponentCreateFn = fn(YamlValue) -> AppResult<Arc<dyn ApplicationComponent>>;

/// Built-in component factories, keyed by type identifier.
pub fn builtin_factories() -> HashMap<&'static str, ComponentCreateFn> {
    let arr: Vec<(&str, ComponentCreateFn)> = vec![
        (cache::COMPONENT_TYPE, cache::create_cache_component),
        (
            error_handler::COMPONENT_TYPE,
            error_handler::create_error_handler_component,
        ),
        (formatter::COMPONENT_TYPE, formatter::create_formatter_component),
        (
            message_source::COMPONENT_TYPE,
            message_source::create_message_source_component,
        ),
        (request::COMPONENT_TYPE, request::create_request_component),
        (response::COMPONENT_TYPE, response::create_response_component),
        (
            security_manager::COMPONENT_TYPE,
            security_manager::create_security_manager_component,
        ),
        (
            state_persister::COMPONENT_TYPE,
            state_persister::create_state_persister_component,
        ),
    ];
    arr.into_iter().collect()
}

/// Deserialize a component's options, treating an absent options block as
/// an empty mapping so serde field defaults apply.
pub(crate) fn parse_options<T: DeserializeOwned>(options: YamlValue, type_id: &str) -> AppResult<T> {
    let options = if options.is_null() {
        YamlValue::Mapping(Default::default())
    } else {
        options
    };
    serde_yaml::from_value(options)
        .map_err(|e| config_error!("invalid `{type_id}` component options: {e}"))
}
