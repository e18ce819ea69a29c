//! Source store: resolves a class name to source text and a content hash

use crate::source::ContentHash;
use crate::{Error, Result};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Source text of one shader class, with its content hash
#[derive(Debug, Clone)]
pub struct SourceText {
    /// The source text
    pub text: Arc<str>,
    /// Hash of the text, used for cache invalidation
    pub hash: ContentHash,
}

impl SourceText {
    /// Wraps text, computing its hash.
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        let text = text.into();
        let hash = ContentHash::of_text(&text);
        SourceText { text, hash }
    }
}

/// Resolves shader class names to source text
///
/// The only blocking I/O in the compiler happens behind this trait.
/// Implementations must tolerate concurrent lookups.
pub trait SourceStore: Send + Sync {
    /// Loads the source of the named class.
    fn load(&self, class_name: &str) -> Result<SourceText>;
}

/// File system store resolving classes from search directories
///
/// A class `PointLight` is looked up as `PointLight.mixsl.json` in each
/// search path in order.
///
/// # Example
/// ```no_run
/// use mixsl::FileSystemStore;
///
/// let store = FileSystemStore::new()
///     .with_path("shaders")
///     .with_path("/usr/local/share/mixsl");
/// ```
#[derive(Debug, Clone, Default)]
pub struct FileSystemStore {
    search_paths: Vec<PathBuf>,
}

/// File extension class documents are stored under
pub const CLASS_EXTENSION: &str = "mixsl.json";

impl FileSystemStore {
    /// Creates a store with no search paths.
    pub fn new() -> Self {
        FileSystemStore {
            search_paths: Vec::new(),
        }
    }

    /// Adds a search path (builder pattern).
    pub fn with_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.search_paths.push(path.into());
        self
    }

    /// Adds a search path.
    pub fn add_path<P: Into<PathBuf>>(&mut self, path: P) {
        self.search_paths.push(path.into());
    }

    /// Returns the search paths.
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }
}

impl SourceStore for FileSystemStore {
    fn load(&self, class_name: &str) -> Result<SourceText> {
        let file_name = format!("{class_name}.{CLASS_EXTENSION}");
        for search_path in &self.search_paths {
            let path = search_path.join(&file_name);
            if path.exists() {
                let text = std::fs::read_to_string(&path)?;
                return Ok(SourceText::new(text));
            }
        }
        Err(Error::ClassNotFound(class_name.to_string()))
    }
}

/// In-memory store for testing or embedded class sources
///
/// Classes can be replaced after creation; pair with
/// [`crate::EffectCompiler::invalidate`] to model incremental edits.
///
/// # Example
/// ```
/// use mixsl::{MemoryStore, SourceStore};
///
/// let store = MemoryStore::new();
/// store.add("White", r#"{"name": "White"}"#);
/// assert!(store.load("White").is_ok());
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: RwLock<FxHashMap<String, Arc<str>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Adds or replaces a class source.
    pub fn add(&self, class_name: &str, text: &str) {
        self.files
            .write()
            .insert(class_name.to_string(), Arc::from(text));
    }

    /// Adds a class source (builder pattern).
    pub fn with_class(self, class_name: &str, text: &str) -> Self {
        self.add(class_name, text);
        self
    }
}

impl SourceStore for MemoryStore {
    fn load(&self, class_name: &str) -> Result<SourceText> {
        let files = self.files.read();
        let text = files
            .get(class_name)
            .cloned()
            .ok_or_else(|| Error::ClassNotFound(class_name.to_string()))?;
        let hash = ContentHash::of_text(&text);
        Ok(SourceText { text, hash })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new().with_class("White", "{}");
        let loaded = store.load("White").unwrap();
        assert_eq!(&*loaded.text, "{}");
        assert!(matches!(
            store.load("Missing"),
            Err(Error::ClassNotFound(_))
        ));
    }

    #[test]
    fn test_memory_store_replacement_changes_hash() {
        let store = MemoryStore::new().with_class("A", "{}");
        let first = store.load("A").unwrap().hash;
        store.add("A", r#"{"name": "A"}"#);
        let second = store.load("A").unwrap().hash;
        assert_ne!(first, second);
    }
}
