//! Core abstractions for the application kernel
//!
//! This module provides the component registry, the lifecycle state
//! machine, the locale resolver, and the error types they share.

pub mod error;
pub mod lifecycle;
pub mod locale;
pub mod registry;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use error::{AppError, AppResult};
pub use lifecycle::{LifecycleController, LifecyclePhase, ObserverId};
pub use locale::{DiskFileStore, FileStore, LocaleResolver, DEFAULT_SOURCE_LANGUAGE};
pub use registry::{ComponentRegistry, ComponentSlot};
