//! Error types for reading documents.

use std::path::PathBuf;

/// Error building metadata from YAML front matter.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Malformed YAML.
    #[error("YAML syntax error at line {line}, column {column}: {message}")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
    },
    /// A node carries a tag with no registered handler.
    #[error("unknown YAML tag: {0}")]
    UnknownTag(String),
    /// A scalar was required but a sequence or mapping was found.
    #[error("expected a scalar node")]
    ExpectedScalar,
    /// A scalar can't be read as the type its tag names.
    #[error("invalid value {value:?} for tag {tag}")]
    InvalidValue { tag: String, value: String },
    /// Error raised by a registered tag handler.
    #[error("{0}")]
    Custom(String),
}

impl From<yaml_rust2::ScanError> for LoadError {
    fn from(err: yaml_rust2::ScanError) -> Self {
        let marker = err.marker();
        Self::Syntax {
            message: err.info().to_owned(),
            line: marker.line(),
            column: marker.col() + 1,
        }
    }
}

/// Error reading a document.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// The source file couldn't be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The front matter is not valid.
    #[error(transparent)]
    Yaml(#[from] LoadError),
    /// No reader is registered for the file extension.
    #[error("no reader for {}", .0.display())]
    UnsupportedExtension(PathBuf),
}
