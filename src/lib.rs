//! This module contains the core logic of the appcore application kernel.
//!
//! It defines the component registry, the request lifecycle, locale
//! resolution, and the built-in application components.

pub mod application;
pub mod component;
pub mod config;
pub mod core;
pub mod logging;
