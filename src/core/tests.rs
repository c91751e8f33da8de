//! Tests for the core module
//!
//! Registry memoization and merge semantics, preload ordering, the
//! lifecycle state machine, locale resolution, and the composition root.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use serde_yaml::Value as YamlValue;

    use crate::application::{Application, NoopHandler, RequestHandler};
    use crate::component::ApplicationComponent;
    use crate::config::{AppConfig, ComponentSpec};
    use crate::core::error::{AppError, AppResult};
    use crate::core::lifecycle::LifecyclePhase;
    use crate::core::locale::{FileStore, LocaleResolver, DEFAULT_SOURCE_LANGUAGE};
    use crate::core::registry::ComponentRegistry;

    struct Probe {
        label: &'static str,
    }

    impl ApplicationComponent for Probe {
        fn name(&self) -> &str {
            self.label
        }

        fn as_any(self: Arc<Self>) -> Arc<dyn std::any::Any + Send + Sync> {
            self
        }
    }

    fn probe_factory(_cfg: YamlValue) -> AppResult<Arc<dyn ApplicationComponent>> {
        Ok(Arc::new(Probe { label: "probe" }))
    }

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("appcore-{tag}-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn test_app(tag: &str) -> (Application, PathBuf) {
        let dir = temp_dir(tag);
        let mut config = AppConfig::default();
        config.base_path = dir.to_string_lossy().into_owned();
        (Application::new(config).unwrap(), dir)
    }

    /// In-memory file store that records how often it was queried.
    struct CountingStore {
        known: Vec<PathBuf>,
        queries: AtomicUsize,
    }

    impl CountingStore {
        fn new(known: Vec<&str>) -> Self {
            Self {
                known: known.into_iter().map(PathBuf::from).collect(),
                queries: AtomicUsize::new(0),
            }
        }
    }

    impl FileStore for CountingStore {
        fn exists(&self, path: &Path) -> bool {
            self.queries.fetch_add(1, Ordering::Relaxed);
            self.known.iter().any(|known| known == path)
        }
    }

    // ---- registry ---------------------------------------------------------

    #[test]
    fn test_unregistered_component_fails() {
        let registry = ComponentRegistry::new();
        let err = registry.get_or_build("nonexistent").unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn test_unknown_type_identifier_fails() {
        let registry = ComponentRegistry::new();
        registry.set_component("widget".to_string(), ComponentSpec::new("noSuchType"));
        let err = registry.get_or_build("widget").unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    static MEMO_BUILDS: AtomicUsize = AtomicUsize::new(0);

    fn memo_factory(_cfg: YamlValue) -> AppResult<Arc<dyn ApplicationComponent>> {
        MEMO_BUILDS.fetch_add(1, Ordering::Relaxed);
        Ok(Arc::new(Probe { label: "memo" }))
    }

    #[test]
    fn test_memoization_constructs_once() {
        let registry = ComponentRegistry::new();
        registry.register_factory("memoProbe", memo_factory);
        registry.set_component("memo".to_string(), ComponentSpec::new("memoProbe"));

        assert!(!registry.is_constructed("memo"));
        let first = registry.get_or_build("memo").unwrap();
        let second = registry.get_or_build("memo").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(registry.is_constructed("memo"));
        assert_eq!(MEMO_BUILDS.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_reregistration_discards_instance() {
        let registry = ComponentRegistry::new();
        registry.register_factory("probe", probe_factory);
        registry.set_component("p".to_string(), ComponentSpec::new("probe"));

        let first = registry.get_or_build("p").unwrap();
        registry.set_component("p".to_string(), ComponentSpec::new("probe"));
        assert!(!registry.is_constructed("p"));

        let second = registry.get_or_build("p").unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_set_components_merges() {
        let registry = ComponentRegistry::new();
        registry.register_factory("probe", probe_factory);

        let mut first = HashMap::new();
        first.insert("a".to_string(), ComponentSpec::new("probe"));
        registry.set_components(first);

        let mut second = HashMap::new();
        second.insert("b".to_string(), ComponentSpec::new("probe"));
        registry.set_components(second);

        assert!(registry.has_component("a"));
        assert!(registry.has_component("b"));
        assert!(!registry.has_component("c"));
    }

    #[test]
    fn test_registered_instance_is_returned_as_is() {
        let registry = ComponentRegistry::new();
        let instance: Arc<dyn ApplicationComponent> = Arc::new(Probe { label: "direct" });
        registry.set_instance("direct".to_string(), instance.clone());

        assert!(registry.is_constructed("direct"));
        let resolved = registry.get_or_build("direct").unwrap();
        assert!(Arc::ptr_eq(&instance, &resolved));
    }

    // ---- preload ordering -------------------------------------------------

    static FWD_ALPHA_BUILT: AtomicBool = AtomicBool::new(false);

    fn fwd_alpha_factory(_cfg: YamlValue) -> AppResult<Arc<dyn ApplicationComponent>> {
        FWD_ALPHA_BUILT.store(true, Ordering::Relaxed);
        Ok(Arc::new(Probe { label: "alpha" }))
    }

    fn fwd_beta_factory(_cfg: YamlValue) -> AppResult<Arc<dyn ApplicationComponent>> {
        if !FWD_ALPHA_BUILT.load(Ordering::Relaxed) {
            return Err(AppError::Component(
                "beta requires alpha to be constructed first".to_string(),
            ));
        }
        Ok(Arc::new(Probe { label: "beta" }))
    }

    #[test]
    fn test_preload_runs_in_declared_order() {
        let dir = temp_dir("preload-fwd");
        let mut config = AppConfig::default();
        config.base_path = dir.to_string_lossy().into_owned();
        config.preload = vec!["alpha".to_string(), "beta".to_string()];
        config.components.insert("alpha".to_string(), ComponentSpec::new("fwdAlpha"));
        config.components.insert("beta".to_string(), ComponentSpec::new("fwdBeta"));

        let app = Application::new(config).unwrap();
        app.registry().register_factory("fwdAlpha", fwd_alpha_factory);
        app.registry().register_factory("fwdBeta", fwd_beta_factory);

        app.initialize().unwrap();
        assert_eq!(app.phase(), LifecyclePhase::Initialized);
        assert!(app.registry().is_constructed("beta"));
    }

    static REV_ALPHA_BUILT: AtomicBool = AtomicBool::new(false);

    fn rev_alpha_factory(_cfg: YamlValue) -> AppResult<Arc<dyn ApplicationComponent>> {
        REV_ALPHA_BUILT.store(true, Ordering::Relaxed);
        Ok(Arc::new(Probe { label: "alpha" }))
    }

    fn rev_beta_factory(_cfg: YamlValue) -> AppResult<Arc<dyn ApplicationComponent>> {
        if !REV_ALPHA_BUILT.load(Ordering::Relaxed) {
            return Err(AppError::Component(
                "beta requires alpha to be constructed first".to_string(),
            ));
        }
        Ok(Arc::new(Probe { label: "beta" }))
    }

    #[test]
    fn test_preload_order_reversal_fails() {
        let dir = temp_dir("preload-rev");
        let mut config = AppConfig::default();
        config.base_path = dir.to_string_lossy().into_owned();
        config.preload = vec!["beta".to_string(), "alpha".to_string()];
        config.components.insert("alpha".to_string(), ComponentSpec::new("revAlpha"));
        config.components.insert("beta".to_string(), ComponentSpec::new("revBeta"));

        let app = Application::new(config).unwrap();
        app.registry().register_factory("revAlpha", rev_alpha_factory);
        app.registry().register_factory("revBeta", rev_beta_factory);

        let err = app.initialize().unwrap_err();
        assert!(matches!(err, AppError::Component(_)));
        assert_ne!(app.phase(), LifecyclePhase::Initialized);
    }

    #[test]
    fn test_preload_of_unregistered_name_fails() {
        let dir = temp_dir("preload-missing");
        let mut config = AppConfig::default();
        config.base_path = dir.to_string_lossy().into_owned();
        config.preload = vec!["ghost".to_string()];

        let app = Application::new(config).unwrap();
        let err = app.initialize().unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    // ---- lifecycle --------------------------------------------------------

    #[test]
    fn test_run_walks_the_phases() {
        let (app, _dir) = test_app("run");
        app.initialize().unwrap();

        struct PhaseHandler {
            seen: LifecyclePhase,
        }
        impl RequestHandler for PhaseHandler {
            fn process_request(&mut self, app: &Application) -> AppResult<()> {
                self.seen = app.phase();
                Ok(())
            }
        }

        let mut handler = PhaseHandler {
            seen: LifecyclePhase::Created,
        };
        app.run(&mut handler).unwrap();

        assert_eq!(handler.seen, LifecyclePhase::Processing);
        assert_eq!(app.phase(), LifecyclePhase::AfterRequestFired);

        // One request per application instance
        let err = app.run(&mut handler).unwrap_err();
        assert!(matches!(err, AppError::Lifecycle(_)));
    }

    #[test]
    fn test_run_before_initialize_fails() {
        let (app, _dir) = test_app("run-early");
        let err = app.run(&mut NoopHandler).unwrap_err();
        assert!(matches!(err, AppError::Lifecycle(_)));
    }

    #[test]
    fn test_observers_fire_in_registration_order() {
        let (app, _dir) = test_app("observers");
        app.initialize().unwrap();

        let order = Arc::new(Mutex::new(Vec::new()));
        for n in 1..=3 {
            let order = order.clone();
            app.on_before_request(move |_| order.lock().unwrap().push(n));
        }
        let order_after = order.clone();
        app.on_after_request(move |_| order_after.lock().unwrap().push(99));

        app.run(&mut NoopHandler).unwrap();
        assert_eq!(*order.lock().unwrap(), vec![1, 2, 3, 99]);
    }

    #[test]
    fn test_end_fires_after_request_exactly_once() {
        let (app, _dir) = test_app("end-twice");
        app.initialize().unwrap();

        let fired = Arc::new(AtomicUsize::new(0));
        let fired_obs = fired.clone();
        app.on_after_request(move |_| {
            fired_obs.fetch_add(1, Ordering::Relaxed);
        });

        app.end(0, false);
        app.end(0, false);

        assert_eq!(fired.load(Ordering::Relaxed), 1);
        assert_eq!(app.phase(), LifecyclePhase::Ended);
    }

    #[test]
    fn test_end_after_normal_run_does_not_refire() {
        let (app, _dir) = test_app("end-after-run");
        app.initialize().unwrap();

        let fired = Arc::new(AtomicUsize::new(0));
        let fired_obs = fired.clone();
        app.on_after_request(move |_| {
            fired_obs.fetch_add(1, Ordering::Relaxed);
        });

        app.run(&mut NoopHandler).unwrap();
        app.end(0, false);

        assert_eq!(fired.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_end_after_aborted_request_still_notifies() {
        let (app, _dir) = test_app("end-abort");
        app.initialize().unwrap();

        struct FailingHandler;
        impl RequestHandler for FailingHandler {
            fn process_request(&mut self, _app: &Application) -> AppResult<()> {
                Err(AppError::Component("boom".to_string()))
            }
        }

        let fired = Arc::new(AtomicUsize::new(0));
        let fired_obs = fired.clone();
        app.on_after_request(move |_| {
            fired_obs.fetch_add(1, Ordering::Relaxed);
        });

        assert!(app.run(&mut FailingHandler).is_err());
        assert_eq!(fired.load(Ordering::Relaxed), 0);

        app.end(1, false);
        assert_eq!(fired.load(Ordering::Relaxed), 1);
    }

    // ---- locale -----------------------------------------------------------

    #[test]
    fn test_language_fallback() {
        let resolver = LocaleResolver::new(
            DEFAULT_SOURCE_LANGUAGE.to_string(),
            Arc::new(CountingStore::new(vec![])),
        );
        assert_eq!(resolver.language(), "en_us");

        resolver.set_language(Some("fr_fr"));
        assert_eq!(resolver.language(), "fr_fr");

        resolver.set_language(None);
        assert_eq!(resolver.language(), "en_us");

        // The empty string is the clearing sentinel as well
        resolver.set_language(Some("fr_fr"));
        resolver.set_language(Some(""));
        assert_eq!(resolver.language(), "en_us");
    }

    #[test]
    fn test_localized_file_equal_language_fast_path() {
        let store = Arc::new(CountingStore::new(vec!["a/b/en_us/view.php"]));
        let resolver = LocaleResolver::new("en_us".to_string(), store.clone());

        let found =
            resolver.find_localized_file(Path::new("a/b/view.php"), Some("en_us"), Some("en_us"));
        assert_eq!(found, PathBuf::from("a/b/view.php"));
        assert_eq!(store.queries.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_localized_file_fallback_and_hit() {
        let store = Arc::new(CountingStore::new(vec!["a/b/fr_fr/view.php"]));
        let resolver = LocaleResolver::new("en_us".to_string(), store);

        let hit =
            resolver.find_localized_file(Path::new("a/b/view.php"), Some("en_us"), Some("fr_fr"));
        assert_eq!(hit, PathBuf::from("a/b/fr_fr/view.php"));

        let miss =
            resolver.find_localized_file(Path::new("a/b/view.php"), Some("en_us"), Some("de_de"));
        assert_eq!(miss, PathBuf::from("a/b/view.php"));
    }

    #[test]
    fn test_localized_file_defaults_to_effective_language() {
        let store = Arc::new(CountingStore::new(vec!["views/fr_fr/index.php"]));
        let resolver = LocaleResolver::new("en_us".to_string(), store);
        resolver.set_language(Some("fr_fr"));

        let found = resolver.find_localized_file(Path::new("views/index.php"), None, None);
        assert_eq!(found, PathBuf::from("views/fr_fr/index.php"));
    }

    #[test]
    fn test_time_zone_accessors() {
        let resolver =
            LocaleResolver::new("en_us".to_string(), Arc::new(CountingStore::new(vec![])));
        assert_eq!(resolver.time_zone(), "UTC");
        resolver.set_time_zone("Europe/Paris");
        assert_eq!(resolver.time_zone(), "Europe/Paris");
    }

    // ---- application ------------------------------------------------------

    #[test]
    fn test_missing_base_path_rejected() {
        let mut config = AppConfig::default();
        config.base_path = "/nonexistent/appcore/base".to_string();
        let err = Application::new(config).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn test_runtime_path_validation() {
        let (app, dir) = test_app("runtime");

        let err = app.set_runtime_path(dir.join("does-not-exist")).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));

        let runtime = dir.join("var");
        std::fs::create_dir_all(&runtime).unwrap();
        app.set_runtime_path(&runtime).unwrap();
        assert_eq!(app.runtime_path().unwrap(), runtime);
    }

    #[test]
    fn test_runtime_path_lazy_default() {
        let (app, dir) = test_app("runtime-default");
        std::fs::create_dir_all(dir.join("runtime")).unwrap();

        let resolved = app.runtime_path().unwrap();
        assert!(resolved.ends_with("runtime"));
        assert!(resolved.starts_with(app.base_path()));
    }

    #[test]
    fn test_derived_id_is_stable() {
        let (app, _dir) = test_app("id");
        let first = app.id().to_string();
        assert_eq!(app.id(), first);
        assert_eq!(first.len(), 16);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_explicit_id_wins() {
        let dir = temp_dir("id-explicit");
        let mut config = AppConfig::default();
        config.base_path = dir.to_string_lossy().into_owned();
        config.id = Some("my-app".to_string());
        let app = Application::new(config).unwrap();
        assert_eq!(app.id(), "my-app");
    }

    #[test]
    fn test_core_components_are_registered_lazily() {
        let (app, _dir) = test_app("core-components");
        for name in [
            "errorHandler",
            "request",
            "response",
            "formatter",
            "coreMessages",
            "messages",
            "securityManager",
            "statePersister",
        ] {
            assert!(app.has_component(name), "missing core component {name}");
            assert!(!app.registry().is_constructed(name));
        }

        let handler = app.error_handler().unwrap();
        let again = app.error_handler().unwrap();
        assert!(Arc::ptr_eq(&handler, &again));
        assert!(app.registry().is_constructed("errorHandler"));
    }

    #[test]
    fn test_cache_requires_configuration() {
        let (app, _dir) = test_app("cache");
        assert!(app.cache().is_err());

        let mut specs = HashMap::new();
        specs.insert("cache".to_string(), ComponentSpec::new("cache"));
        app.set_components(specs);

        let cache = app.cache().unwrap();
        cache.set("k", "v");
        assert_eq!(cache.get("k"), Some("v".to_string()));
    }

    #[test]
    fn test_request_component_has_unique_id() {
        let (app, _dir) = test_app("request-id");
        let (other, _other_dir) = test_app("request-id");
        let request = app.request().unwrap();
        let other_request = other.request().unwrap();
        assert_ne!(request.id(), other_request.id());
    }
}
