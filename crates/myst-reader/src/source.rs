//! Document text sources.

use std::io;
use std::path::Path;

/// Provides raw document text for a path.
pub trait Source: Send + Sync {
    /// Read the whole document.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn read_text(&self, path: &Path) -> io::Result<String>;
}

/// Reads documents from the filesystem.
///
/// The file is closed before the text is returned. A leading byte order mark
/// is dropped.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsSource;

impl Source for FsSource {
    fn read_text(&self, path: &Path) -> io::Result<String> {
        let text = std::fs::read_to_string(path)?;
        Ok(match text.strip_prefix('\u{feff}') {
            Some(stripped) => stripped.to_owned(),
            None => text,
        })
    }
}
