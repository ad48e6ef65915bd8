//! The MyST document reader.

use std::path::Path;
use std::sync::OnceLock;

use myst_config::Settings;
use myst_renderer::{
    Extensions, HighlightContainer, HighlightOptions, MarkupEngine, RenderEnv, SyntectHighlighter,
    TaskListOptions,
};

use crate::error::ReadError;
use crate::loader::Loader;
use crate::metadata::{Identity, Metadata, MetadataProcessor, Normalizer};
use crate::source::{FsSource, Source};
use crate::tags::TagRegistry;

/// Rendered content and metadata of one document.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedDocument {
    /// Body HTML, without leading or trailing whitespace.
    pub content: String,
    /// Normalized front matter.
    pub metadata: Metadata,
}

/// Reader for MyST Markdown files with YAML front matter.
///
/// The Markup Engine is built on first use and reused for every document.
/// The YAML loader is rebuilt per document so changes to [`TagRegistry`]
/// apply from the next read.
pub struct MystReader {
    settings: Settings,
    tags: TagRegistry,
    processor: Box<dyn MetadataProcessor>,
    source: Box<dyn Source>,
    engine: OnceLock<MarkupEngine>,
}

impl MystReader {
    /// Extensions handled by this reader.
    pub const FILE_EXTENSIONS: &'static [&'static str] = &["md"];

    /// Create a reader that reads from the filesystem and keeps metadata
    /// values as loaded.
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            tags: TagRegistry::new(),
            processor: Box::new(Identity),
            source: Box::new(FsSource),
            engine: OnceLock::new(),
        }
    }

    /// Set the metadata post-processing step.
    #[must_use]
    pub fn with_processor<P: MetadataProcessor + 'static>(mut self, processor: P) -> Self {
        self.processor = Box::new(processor);
        self
    }

    /// Set where document text comes from.
    #[must_use]
    pub fn with_source<S: Source + 'static>(mut self, source: S) -> Self {
        self.source = Box::new(source);
        self
    }

    /// Replace the YAML tag handler registry.
    #[must_use]
    pub fn with_tags(mut self, tags: TagRegistry) -> Self {
        self.tags = tags;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn tags(&self) -> &TagRegistry {
        &self.tags
    }

    pub fn tags_mut(&mut self) -> &mut TagRegistry {
        &mut self.tags
    }

    /// Read and parse a document.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be read or its front matter is
    /// invalid.
    pub fn read(&self, path: &Path) -> Result<ParsedDocument, ReadError> {
        let text = self.source.read_text(path).map_err(|source| ReadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Reading document");
        self.parse(&text)
    }

    /// Parse document text.
    ///
    /// # Errors
    ///
    /// Returns an error if the front matter is invalid.
    pub fn parse(&self, text: &str) -> Result<ParsedDocument, ReadError> {
        let text = text.trim();
        let env = self.render_env();
        let engine = self.engine();

        let document = engine.parse(text, &env);
        let loader = Loader::new(
            engine,
            &env,
            self.settings.myst.frontmatter_parse_literal,
            &self.tags,
        );
        let raw = loader.load(&document.frontmatter)?;

        let metadata = Normalizer {
            loader: &loader,
            settings: &self.settings,
            processor: self.processor.as_ref(),
        }
        .normalize(raw, document.leading_heading());

        let content = engine.render(&document.tokens, &env).trim().to_owned();
        Ok(ParsedDocument { content, metadata })
    }

    fn render_env(&self) -> RenderEnv {
        RenderEnv {
            highlight: self.settings.highlight_resolved.is_some(),
        }
    }

    fn engine(&self) -> &MarkupEngine {
        self.engine.get_or_init(|| build_engine(&self.settings))
    }
}

fn build_engine(settings: &Settings) -> MarkupEngine {
    let extensions = Extensions {
        tasklist: settings
            .extensions
            .tasklist
            .as_ref()
            .map(|tasklist| TaskListOptions {
                enabled: tasklist.enabled,
                label: tasklist.label,
                label_after: tasklist.label_after,
            }),
        deflist: settings.extensions.deflist,
    };
    let formatter = settings.highlight_resolved.as_ref();
    let highlight = formatter.map(|formatter| HighlightOptions {
        line_numbers: formatter.line_numbers,
        line_number_start: formatter.line_number_start,
        class_prefix: formatter.class_prefix.clone(),
    });
    let container = formatter.map_or_else(HighlightContainer::default, |formatter| {
        HighlightContainer::new(formatter.css_class.as_str())
    });

    tracing::debug!(
        tasklist = extensions.tasklist.is_some(),
        deflist = extensions.deflist,
        highlight = highlight.is_some(),
        "Building markup engine"
    );
    MarkupEngine::new()
        .with_extensions(extensions)
        .with_highlighter(SyntectHighlighter::from_options(highlight))
        .with_fence_renderer(container)
}
