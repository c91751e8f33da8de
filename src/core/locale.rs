//! Language resolution and localized file lookup
//!
//! Effective language is the override when one is set, the source language
//! otherwise. Localized file lookup inserts a language directory between
//! the directory and file-name components of a path and falls back to the
//! original path when no localized variant exists.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use arc_swap::ArcSwapOption;

/// Language the application's own messages are written in, unless
/// configured otherwise.
pub const DEFAULT_SOURCE_LANGUAGE: &str = "en_us";

const DEFAULT_TIME_ZONE: &str = "UTC";

/// Existence query against the backing file store. Localized file lookup
/// never reads or writes through this seam.
pub trait FileStore: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
}

/// The real filesystem.
pub struct DiskFileStore;

impl FileStore for DiskFileStore {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// Resolves the effective language and localized file paths.
pub struct LocaleResolver {
    source_language: String,
    override_language: ArcSwapOption<String>,
    time_zone: RwLock<String>,
    files: Arc<dyn FileStore>,
}

impl LocaleResolver {
    pub fn new(source_language: String, files: Arc<dyn FileStore>) -> Self {
        Self {
            source_language,
            override_language: ArcSwapOption::empty(),
            time_zone: RwLock::new(DEFAULT_TIME_ZONE.to_string()),
            files,
        }
    }

    /// Language the source messages are written in. Fixed at configuration
    /// time.
    pub fn source_language(&self) -> &str {
        &self.source_language
    }

    /// Effective language: the override when set, else the source language.
    pub fn language(&self) -> String {
        match self.override_language.load().as_deref() {
            Some(lang) => lang.clone(),
            None => self.source_language.clone(),
        }
    }

    /// Set or clear the language override. `None` or an empty string
    /// reverts to the source language.
    pub fn set_language(&self, language: Option<&str>) {
        match language {
            Some(lang) if !lang.is_empty() => {
                self.override_language.store(Some(Arc::new(lang.to_string())));
            }
            _ => self.override_language.store(None),
        }
    }

    pub fn time_zone(&self) -> String {
        self.time_zone.read().unwrap().clone()
    }

    pub fn set_time_zone(&self, time_zone: &str) {
        *self.time_zone.write().unwrap() = time_zone.to_string();
    }

    /// Find the localized variant of a file.
    ///
    /// `src_language` defaults to the source language and `language` to the
    /// effective language. When the two are equal the input path is
    /// returned unchanged without consulting the file store. Otherwise the
    /// candidate `dirname/{language}/basename` is returned when it exists,
    /// the input path when it does not.
    pub fn find_localized_file(
        &self,
        path: &Path,
        src_language: Option<&str>,
        language: Option<&str>,
    ) -> PathBuf {
        let src = src_language.unwrap_or(&self.source_language);
        let lang = match language {
            Some(lang) => lang.to_string(),
            None => self.language(),
        };
        if src == lang {
            return path.to_path_buf();
        }

        let file_name = match path.file_name() {
            Some(name) => name,
            None => return path.to_path_buf(),
        };
        let candidate = match path.parent() {
            Some(dir) => dir.join(&lang).join(file_name),
            None => Path::new(&lang).join(file_name),
        };

        if self.files.exists(&candidate) {
            candidate
        } else {
            path.to_path_buf()
        }
    }
}
