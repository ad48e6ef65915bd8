//! MyST Markdown reader with YAML front matter.
//!
//! [`MystReader`] turns a document into body HTML plus a metadata map:
//! - the leading `---` block is loaded as YAML and normalized into
//!   [`Metadata`] (lower-cased names, a title derived from a leading
//!   heading, Markdown rendering of formatted fields)
//! - the body is rendered by a [`myst_renderer::MarkupEngine`] configured
//!   from [`myst_config::Settings`]
//!
//! YAML tags can be extended at runtime through [`TagRegistry`]. Literal
//! block scalars (`|`) and `!md` scalars are rendered as Markdown.
//!
//! # Example
//!
//! ```
//! use myst_config::Settings;
//! use myst_reader::MystReader;
//! use serde_yaml::Value;
//!
//! let reader = MystReader::new(Settings::default());
//! let document = reader
//!     .parse("---\nTitle: Hello\nsummary: A *short* intro\n---\nBody text\n")
//!     .unwrap();
//!
//! assert_eq!(document.content, "<p>Body text</p>");
//! assert_eq!(document.metadata.get("title"), Some(&Value::from("Hello")));
//! assert_eq!(
//!     document.metadata.get("summary"),
//!     Some(&Value::from("<p>A <em>short</em> intro</p>"))
//! );
//! ```

mod error;
mod loader;
mod metadata;
mod reader;
mod readers;
mod source;
mod tags;

pub use error::{LoadError, ReadError};
pub use loader::{
    BOOL_TAG, FLOAT_TAG, INT_TAG, Loader, MAP_TAG, MARKDOWN_TAG, NULL_TAG, Node, SEQ_TAG,
    STR_TAG, Scalar, ScalarStyle,
};
pub use metadata::{Identity, Metadata, MetadataProcessor};
pub use reader::{MystReader, ParsedDocument};
pub use readers::{Reader, Readers, add_reader};
pub use source::{FsSource, Source};
pub use tags::{Constructor, RegistrationId, TagRegistry};
