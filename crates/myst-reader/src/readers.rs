//! Host-side reader registration.
//!
//! A host keeps one [`Readers`] table mapping file extensions to readers and
//! calls [`add_reader`] once at startup to hand `.md` files to MyST.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use myst_config::Settings;

use crate::error::ReadError;
use crate::reader::{MystReader, ParsedDocument};

/// A document reader a host can dispatch to by file extension.
pub trait Reader: Send + Sync {
    /// Extensions (without the dot) this reader handles.
    fn file_extensions(&self) -> &[&str];

    /// Read and parse one document.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be read or parsed.
    fn read(&self, path: &Path) -> Result<ParsedDocument, ReadError>;
}

impl Reader for MystReader {
    fn file_extensions(&self) -> &[&str] {
        Self::FILE_EXTENSIONS
    }

    fn read(&self, path: &Path) -> Result<ParsedDocument, ReadError> {
        MystReader::read(self, path)
    }
}

/// Extension to reader table.
#[derive(Clone, Default)]
pub struct Readers {
    readers: HashMap<String, Arc<dyn Reader>>,
}

impl Readers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `extension` to `reader`, replacing any previous reader.
    pub fn insert(&mut self, extension: &str, reader: Arc<dyn Reader>) {
        self.readers.insert(extension.to_ascii_lowercase(), reader);
    }

    pub fn get(&self, extension: &str) -> Option<&Arc<dyn Reader>> {
        self.readers.get(&extension.to_ascii_lowercase())
    }

    /// Registered extensions, sorted.
    pub fn extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<&str> = self.readers.keys().map(String::as_str).collect();
        extensions.sort_unstable();
        extensions
    }

    /// Read `path` with the reader registered for its extension.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::UnsupportedExtension`] if no reader handles the
    /// file, or the reader's own error.
    pub fn read_file(&self, path: &Path) -> Result<ParsedDocument, ReadError> {
        let reader = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.get(ext))
            .ok_or_else(|| ReadError::UnsupportedExtension(path.to_path_buf()))?;
        reader.read(path)
    }
}

impl std::fmt::Debug for Readers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Readers")
            .field("extensions", &self.extensions())
            .finish()
    }
}

/// Register a [`MystReader`] for every extension it handles.
///
/// All extensions share one reader, so the Markup Engine is built once.
pub fn add_reader(readers: &mut Readers, settings: Settings) {
    let reader: Arc<dyn Reader> = Arc::new(MystReader::new(settings));
    for extension in MystReader::FILE_EXTENSIONS {
        tracing::debug!(extension, "Registering MyST reader");
        readers.insert(extension, Arc::clone(&reader));
    }
}
