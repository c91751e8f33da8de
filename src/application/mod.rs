//! Application composition root
//!
//! The [`Application`] owns the component registry, the lifecycle
//! controller, and the locale resolver, and wires them together: it
//! registers the core component descriptors at construction, preloads the
//! configured components during initialization, and drives one request
//! through the pre-process / process / post-process sequence.

use std::any::type_name;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use log::{debug, info};
use once_cell::sync::OnceCell;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::component::{
    cache::MemoryCache, error_handler::ErrorHandler, formatter::Formatter,
    message_source::MessageSource, request::RequestComponent, response::ResponseComponent,
    security_manager::SecurityManager, state_persister::StatePersister, ApplicationComponent,
};
use crate::component::{
    error_handler, formatter, message_source, request, response, security_manager, state_persister,
};
use crate::config::{AppConfig, ComponentSpec};
use crate::config_error;
use crate::core::error::AppResult;
use crate::core::lifecycle::{LifecycleController, LifecyclePhase, Observer, ObserverId};
use crate::core::locale::{DiskFileStore, FileStore, LocaleResolver};
use crate::core::registry::ComponentRegistry;

/// Processes one request on behalf of the application. The kernel itself
/// performs no request work; this is the seam the hosting program fills.
pub trait RequestHandler {
    fn process_request(&mut self, app: &Application) -> AppResult<()>;
}

/// Handler that does nothing, for hosts that only need the lifecycle
/// notifications.
pub struct NoopHandler;

impl RequestHandler for NoopHandler {
    fn process_request(&mut self, _app: &Application) -> AppResult<()> {
        Ok(())
    }
}

/// Root lifecycle object of a request-processing application.
pub struct Application {
    config: AppConfig,
    base_path: PathBuf,
    runtime_path: RwLock<Option<PathBuf>>,
    id: OnceCell<String>,
    registry: ComponentRegistry,
    lifecycle: LifecycleController,
    locale: LocaleResolver,
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("base_path", &self.base_path)
            .finish()
    }
}

impl Application {
    /// Build an application from its configuration. The base path must be
    /// an existing directory; the core component descriptors are
    /// registered unconstructed, then the configured descriptors are
    /// merged over them.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        Self::with_file_store(config, Arc::new(DiskFileStore))
    }

    /// Same as [`Application::new`] with an explicit file store backing
    /// localized file lookup.
    pub fn with_file_store(config: AppConfig, files: Arc<dyn FileStore>) -> AppResult<Self> {
        let base_path = fs::canonicalize(&config.base_path).map_err(|e| {
            config_error!(
                "application base path `{}` is not a valid directory: {e}",
                config.base_path
            )
        })?;
        if !base_path.is_dir() {
            return Err(config_error!(
                "application base path `{}` is not a directory",
                config.base_path
            ));
        }

        let locale = LocaleResolver::new(config.source_language.clone(), files);
        if let Some(language) = &config.language {
            locale.set_language(Some(language));
        }
        if let Some(time_zone) = &config.time_zone {
            locale.set_time_zone(time_zone);
        }

        let registry = ComponentRegistry::new();
        registry.set_components(core_component_specs(&base_path));
        registry.set_components(config.components.clone());

        let app = Self {
            config,
            base_path,
            runtime_path: RwLock::new(None),
            id: OnceCell::new(),
            registry,
            lifecycle: LifecycleController::new(),
            locale,
        };

        if let Some(runtime_path) = app.config.runtime_path.clone() {
            app.set_runtime_path(runtime_path)?;
        }

        Ok(app)
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Application id: the configured one, or a stable hex digest derived
    /// from the base path and name. The derivation is deterministic, not
    /// collision-free.
    pub fn id(&self) -> &str {
        self.id.get_or_init(|| match &self.config.id {
            Some(id) => id.clone(),
            None => {
                let mut hasher = Sha256::new();
                hasher.update(self.base_path.to_string_lossy().as_bytes());
                hasher.update(self.config.name.as_bytes());
                hasher.finalize()[..8]
                    .iter()
                    .map(|byte| format!("{byte:02x}"))
                    .collect()
            }
        })
    }

    /// Working directory for files the application writes at runtime.
    /// Defaults to `{base_path}/runtime` on first read when never set.
    pub fn runtime_path(&self) -> AppResult<PathBuf> {
        if let Some(path) = self.runtime_path.read().unwrap().as_ref() {
            return Ok(path.clone());
        }
        let default = self.base_path.join("runtime");
        self.set_runtime_path(&default)?;
        Ok(default)
    }

    /// Set the runtime path. Validation is eager: the path must already
    /// be a directory writable by the current process.
    pub fn set_runtime_path(&self, path: impl AsRef<Path>) -> AppResult<()> {
        let path = path.as_ref();
        ensure_writable_dir(path)?;
        *self.runtime_path.write().unwrap() = Some(path.to_path_buf());
        Ok(())
    }

    // ---- component access -------------------------------------------------

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Bulk-register component descriptors, merging over what is already
    /// registered.
    pub fn set_components(&self, specs: HashMap<String, ComponentSpec>) {
        self.registry.set_components(specs);
    }

    pub fn has_component(&self, name: &str) -> bool {
        self.registry.has_component(name)
    }

    /// Resolve a named component, constructing and initializing it on
    /// first access.
    pub fn component(&self, name: &str) -> AppResult<Arc<dyn ApplicationComponent>> {
        self.registry
            .get_or_build_with(name, |component| component.init(self))
    }

    fn component_as<T: ApplicationComponent>(&self, name: &str) -> AppResult<Arc<T>> {
        let component = self.component(name)?;
        component.as_any().downcast::<T>().map_err(|_| {
            config_error!(
                "component `{name}` is not of the expected type {}",
                type_name::<T>()
            )
        })
    }

    pub fn db(&self) -> AppResult<Arc<dyn ApplicationComponent>> {
        self.component("db")
    }

    pub fn error_handler(&self) -> AppResult<Arc<ErrorHandler>> {
        self.component_as("errorHandler")
    }

    pub fn security_manager(&self) -> AppResult<Arc<SecurityManager>> {
        self.component_as("securityManager")
    }

    pub fn state_persister(&self) -> AppResult<Arc<StatePersister>> {
        self.component_as("statePersister")
    }

    pub fn cache(&self) -> AppResult<Arc<MemoryCache>> {
        self.component_as("cache")
    }

    pub fn core_messages(&self) -> AppResult<Arc<MessageSource>> {
        self.component_as("coreMessages")
    }

    pub fn messages(&self) -> AppResult<Arc<MessageSource>> {
        self.component_as("messages")
    }

    pub fn request(&self) -> AppResult<Arc<RequestComponent>> {
        self.component_as("request")
    }

    pub fn response(&self) -> AppResult<Arc<ResponseComponent>> {
        self.component_as("response")
    }

    pub fn formatter(&self) -> AppResult<Arc<Formatter>> {
        self.component_as("formatter")
    }

    // ---- locale -----------------------------------------------------------

    pub fn locale(&self) -> &LocaleResolver {
        &self.locale
    }

    pub fn source_language(&self) -> &str {
        self.locale.source_language()
    }

    pub fn language(&self) -> String {
        self.locale.language()
    }

    pub fn set_language(&self, language: Option<&str>) {
        self.locale.set_language(language);
    }

    pub fn time_zone(&self) -> String {
        self.locale.time_zone()
    }

    pub fn set_time_zone(&self, time_zone: &str) {
        self.locale.set_time_zone(time_zone);
    }

    pub fn find_localized_file(
        &self,
        path: &Path,
        src_language: Option<&str>,
        language: Option<&str>,
    ) -> PathBuf {
        self.locale.find_localized_file(path, src_language, language)
    }

    // ---- lifecycle --------------------------------------------------------

    pub fn phase(&self) -> LifecyclePhase {
        self.lifecycle.phase()
    }

    /// Register an observer for the `beforeRequest` notification.
    pub fn on_before_request<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&Application) + Send + Sync + 'static,
    {
        self.lifecycle.on_before_request(Arc::new(observer))
    }

    /// Register an observer for the `afterRequest` notification.
    pub fn on_after_request<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&Application) + Send + Sync + 'static,
    {
        self.lifecycle.on_after_request(Arc::new(observer))
    }

    /// Preload the configured components, in declared order. Any preload
    /// failure aborts initialization and the application must not run.
    pub fn initialize(&self) -> AppResult<()> {
        self.lifecycle.expect_phase(LifecyclePhase::Created)?;
        info!("Initializing application {}...", self.id());
        debug!("Registered components: {:?}", self.registry.component_names());

        for name in &self.config.preload {
            debug!("Preloading component `{name}`");
            self.component(name)?;
        }

        self.lifecycle
            .advance(LifecyclePhase::Created, LifecyclePhase::Initialized)?;
        info!("Application initialization completed");
        Ok(())
    }

    /// Process one request: fire `beforeRequest`, delegate to the
    /// handler, fire `afterRequest`. A handler error propagates after the
    /// `beforeRequest` notification has fired; `end` still delivers the
    /// `afterRequest` notification in that case.
    pub fn run(&self, handler: &mut dyn RequestHandler) -> AppResult<()> {
        self.lifecycle
            .advance(LifecyclePhase::Initialized, LifecyclePhase::BeforeRequestFired)?;
        self.notify(self.lifecycle.before_request_observers());

        self.lifecycle
            .advance(LifecyclePhase::BeforeRequestFired, LifecyclePhase::Processing)?;
        handler.process_request(self)?;

        self.lifecycle
            .advance(LifecyclePhase::Processing, LifecyclePhase::AfterRequestFired)?;
        self.notify(self.lifecycle.after_request_observers());
        Ok(())
    }

    /// Terminate the request. Fires the `afterRequest` notification if it
    /// has not fired yet; calling `end` again is a no-op. With `exit` the
    /// hosting process terminates with `status`.
    pub fn end(&self, status: i32, exit: bool) {
        if self.lifecycle.begin_end() {
            self.notify(self.lifecycle.after_request_observers());
        }
        if exit {
            info!("Application {} exiting with status {status}", self.id());
            std::process::exit(status);
        }
    }

    fn notify(&self, observers: Vec<Observer>) {
        for observer in observers {
            observer(self);
        }
    }
}

/// Descriptors for the components every application owns. All start
/// unconstructed; user configuration may overwrite any of them.
fn core_component_specs(base_path: &Path) -> HashMap<String, ComponentSpec> {
    let mut specs = HashMap::new();
    specs.insert(
        "errorHandler".to_string(),
        ComponentSpec::new(error_handler::COMPONENT_TYPE),
    );
    specs.insert("request".to_string(), ComponentSpec::new(request::COMPONENT_TYPE));
    specs.insert(
        "response".to_string(),
        ComponentSpec::new(response::COMPONENT_TYPE),
    );
    specs.insert(
        "formatter".to_string(),
        ComponentSpec::new(formatter::COMPONENT_TYPE),
    );
    specs.insert(
        "securityManager".to_string(),
        ComponentSpec::new(security_manager::COMPONENT_TYPE),
    );
    specs.insert(
        "statePersister".to_string(),
        ComponentSpec::new(state_persister::COMPONENT_TYPE),
    );
    for (name, dir) in [("coreMessages", "messages/core"), ("messages", "messages")] {
        specs.insert(
            name.to_string(),
            ComponentSpec::with_options(
                message_source::COMPONENT_TYPE,
                message_source_options(&base_path.join(dir)),
            ),
        );
    }
    specs
}

fn message_source_options(base_path: &Path) -> serde_yaml::Value {
    let mut options = serde_yaml::Mapping::new();
    options.insert(
        serde_yaml::Value::from("base_path"),
        serde_yaml::Value::from(base_path.to_string_lossy().into_owned()),
    );
    serde_yaml::Value::Mapping(options)
}

fn ensure_writable_dir(path: &Path) -> AppResult<()> {
    if !path.is_dir() {
        return Err(config_error!(
            "application runtime path `{}` is not an existing directory",
            path.display()
        ));
    }
    let probe = path.join(format!(".runtime-probe-{}", Uuid::new_v4()));
    fs::write(&probe, b"").map_err(|e| {
        config_error!(
            "application runtime path `{}` is not writable: {e}",
            path.display()
        )
    })?;
    let _ = fs::remove_file(&probe);
    Ok(())
}
