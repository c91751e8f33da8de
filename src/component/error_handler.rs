use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, error};
use serde::Deserialize;
use validator::Validate;

use crate::application::Application;
use crate::core::error::{AppError, AppResult};

use super::{parse_options, ApplicationComponent};

pub const COMPONENT_TYPE: &str = "errorHandler";

pub fn create_error_handler_component(
    cfg: serde_yaml::Value,
) -> AppResult<Arc<dyn ApplicationComponent>> {
    let config: ErrorHandlerConfig = parse_options(cfg, COMPONENT_TYPE)?;
    config
        .validate()
        .map_err(|e| crate::config_error!("invalid `{COMPONENT_TYPE}` component options: {e}"))?;

    Ok(Arc::new(ErrorHandler {
        config,
        last_error: Mutex::new(None),
        handled: AtomicUsize::new(0),
    }))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
struct ErrorHandlerConfig {
    /// Suppress error details in externally visible output, keeping them
    /// in the log only.
    discard_output: bool,
    /// Upper bound on recorded error messages length.
    #[validate(range(min = 64))]
    max_message_len: usize,
}

impl Default for ErrorHandlerConfig {
    fn default() -> Self {
        Self {
            discard_output: false,
            max_message_len: 2048,
        }
    }
}

/// Central sink for request-time errors. Records the most recent error and
/// logs every handled one.
pub struct ErrorHandler {
    config: ErrorHandlerConfig,
    last_error: Mutex<Option<String>>,
    handled: AtomicUsize,
}

impl ErrorHandler {
    /// Record and log an error. Returns the message as it would be shown
    /// to the outside: the full text, or a generic one when output is
    /// discarded.
    pub fn handle(&self, err: &AppError) -> String {
        let mut message = err.to_string();
        if message.len() > self.config.max_message_len {
            let mut cut = self.config.max_message_len;
            while !message.is_char_boundary(cut) {
                cut -= 1;
            }
            message.truncate(cut);
        }

        error!("{message}");
        *self.last_error.lock().unwrap() = Some(message.clone());
        self.handled.fetch_add(1, Ordering::Relaxed);

        if self.config.discard_output {
            "An internal error occurred.".to_string()
        } else {
            message
        }
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().unwrap().clone()
    }

    pub fn handled_count(&self) -> usize {
        self.handled.load(Ordering::Relaxed)
    }
}

impl ApplicationComponent for ErrorHandler {
    fn name(&self) -> &str {
        COMPONENT_TYPE
    }

    fn init(&self, app: &Application) -> AppResult<()> {
        debug!("Error handler installed for application {}", app.id());
        Ok(())
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
