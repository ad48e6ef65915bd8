//! YAML front matter loader.
//!
//! The loader builds `serde_yaml` values from `yaml-rust2` parser events
//! rather than from a finished document tree, because tag handlers need the
//! scalar style (`|`, `>`, quoted, plain) that the tree throws away.
//!
//! Every node goes through a constructor chosen by its tag:
//! - explicit tags (`!md`, `!!int`, custom `!name`) pick their constructor
//! - untagged plain scalars are resolved with the YAML core schema, plus
//!   the YAML 1.1 boolean spellings (`yes`, `no`, `on`, `off`)
//! - untagged quoted and block scalars are strings
//!
//! Mappings keep their declaration order.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use myst_renderer::{MarkupEngine, RenderEnv};
use regex::Regex;
use serde_yaml::{Mapping, Number, Value};
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser, Tag};
use yaml_rust2::scanner::{Marker, TScalarStyle};

use crate::error::LoadError;
use crate::tags::{Constructor, TagRegistry, is_valid_tag};

/// Prefix of the YAML core schema tags (`!!name`).
const CORE_PREFIX: &str = "tag:yaml.org,2002:";

pub const STR_TAG: &str = "tag:yaml.org,2002:str";
pub const INT_TAG: &str = "tag:yaml.org,2002:int";
pub const FLOAT_TAG: &str = "tag:yaml.org,2002:float";
pub const BOOL_TAG: &str = "tag:yaml.org,2002:bool";
pub const NULL_TAG: &str = "tag:yaml.org,2002:null";
pub const SEQ_TAG: &str = "tag:yaml.org,2002:seq";
pub const MAP_TAG: &str = "tag:yaml.org,2002:map";

/// Tag that renders its scalar as Markdown.
pub const MARKDOWN_TAG: &str = "!md";

static INT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[-+]?[0-9]+|0o[0-7]+|0x[0-9a-fA-F]+)$").unwrap());

static FLOAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:[-+]?(?:\.[0-9]+|[0-9]+(?:\.[0-9]*)?)(?:[eE][-+]?[0-9]+)?|[-+]?\.(?:inf|Inf|INF)|\.(?:nan|NaN|NAN))$",
    )
    .unwrap()
});

/// How a scalar was written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarStyle {
    Plain,
    SingleQuoted,
    DoubleQuoted,
    /// Block literal (`|`).
    Literal,
    /// Block folded (`>`).
    Folded,
}

impl From<TScalarStyle> for ScalarStyle {
    fn from(style: TScalarStyle) -> Self {
        match style {
            TScalarStyle::SingleQuoted => Self::SingleQuoted,
            TScalarStyle::DoubleQuoted => Self::DoubleQuoted,
            TScalarStyle::Literal => Self::Literal,
            TScalarStyle::Folded => Self::Folded,
            _ => Self::Plain,
        }
    }
}

/// A scalar's text and style.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scalar {
    pub value: String,
    pub style: ScalarStyle,
}

/// A YAML node as handed to a tag constructor.
///
/// Collection children are already constructed.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Scalar(Scalar),
    Sequence(Vec<Value>),
    Mapping(Mapping),
}

/// Front matter loader.
///
/// A loader is cheap to build and is rebuilt for every document from the
/// built-in constructors and the current [`TagRegistry`] entries.
pub struct Loader<'a> {
    engine: &'a MarkupEngine,
    env: &'a RenderEnv,
    constructors: HashMap<String, Constructor>,
}

impl<'a> Loader<'a> {
    /// Build a loader.
    ///
    /// With `parse_literal`, untagged or `!!str` scalars written in literal
    /// block style are rendered as Markdown. Registry handlers are installed
    /// last and override the built-ins.
    pub fn new(
        engine: &'a MarkupEngine,
        env: &'a RenderEnv,
        parse_literal: bool,
        registry: &TagRegistry,
    ) -> Self {
        let mut constructors: HashMap<String, Constructor> = HashMap::new();
        constructors.insert(MARKDOWN_TAG.to_owned(), Arc::new(construct_markdown));
        if parse_literal {
            constructors.insert(STR_TAG.to_owned(), Arc::new(construct_literal_markdown));
        }

        for (tag, constructor) in registry.snapshot() {
            if !is_valid_tag(tag) {
                tracing::warn!(tag, "Ignoring malformed YAML tag registration");
                continue;
            }
            constructors.insert(expand_tag(tag), Arc::clone(constructor));
        }

        Self {
            engine,
            env,
            constructors,
        }
    }

    /// Parse front matter into an ordered mapping.
    ///
    /// Blank input and documents whose root is not a mapping yield an empty
    /// mapping.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed YAML, unknown tags and values a
    /// constructor rejects.
    pub fn load(&self, text: &str) -> Result<Mapping, LoadError> {
        if text.trim().is_empty() {
            return Ok(Mapping::new());
        }

        let mut builder = Builder::new(self);
        Parser::new_from_str(text).load(&mut builder, false)?;
        if let Some(err) = builder.error {
            return Err(err);
        }

        match builder.root {
            Some(Value::Mapping(mapping)) => Ok(mapping),
            Some(Value::Null) | None => Ok(Mapping::new()),
            Some(_) => {
                tracing::debug!("Ignoring front matter whose root is not a mapping");
                Ok(Mapping::new())
            }
        }
    }

    /// Text of a scalar node.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::ExpectedScalar`] for sequences and mappings.
    pub fn construct_scalar<'n>(&self, node: &'n Node) -> Result<&'n str, LoadError> {
        match node {
            Node::Scalar(scalar) => Ok(&scalar.value),
            Node::Sequence(_) | Node::Mapping(_) => Err(LoadError::ExpectedScalar),
        }
    }

    /// Render Markdown to trimmed HTML with the reader's engine.
    pub fn render(&self, text: &str) -> String {
        self.engine
            .render_markdown(text, self.env)
            .trim()
            .to_owned()
    }

    /// Build a value for `node`.
    ///
    /// `tag` is the node's full tag, `None` when untagged.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown tags and values a constructor rejects.
    pub fn construct(&self, tag: Option<&str>, node: Node) -> Result<Value, LoadError> {
        let tag = match tag {
            None => implicit_tag(&node),
            Some("!") => non_specific_tag(&node),
            Some(tag) => tag,
        };

        if let Some(constructor) = self.constructors.get(tag) {
            return constructor(self, &node);
        }
        construct_core(tag, node)
    }
}

fn construct_markdown(loader: &Loader<'_>, node: &Node) -> Result<Value, LoadError> {
    Ok(Value::String(loader.render(loader.construct_scalar(node)?)))
}

fn construct_literal_markdown(loader: &Loader<'_>, node: &Node) -> Result<Value, LoadError> {
    match node {
        Node::Scalar(Scalar {
            value,
            style: ScalarStyle::Literal,
        }) => Ok(Value::String(loader.render(value))),
        Node::Scalar(Scalar { value, .. }) => Ok(Value::String(value.clone())),
        Node::Sequence(_) | Node::Mapping(_) => Err(LoadError::ExpectedScalar),
    }
}

/// Constructors for the YAML core schema tags.
fn construct_core(tag: &str, node: Node) -> Result<Value, LoadError> {
    let invalid = |value: &str| LoadError::InvalidValue {
        tag: tag.to_owned(),
        value: value.to_owned(),
    };

    match (tag, node) {
        (SEQ_TAG, Node::Sequence(items)) => Ok(Value::Sequence(items)),
        (MAP_TAG, Node::Mapping(mapping)) => Ok(Value::Mapping(mapping)),
        (SEQ_TAG | MAP_TAG | STR_TAG | INT_TAG | FLOAT_TAG | BOOL_TAG | NULL_TAG, node)
            if !matches!(node, Node::Scalar(_)) =>
        {
            Err(LoadError::Custom(format!("node does not match tag {tag}")))
        }
        (SEQ_TAG | MAP_TAG, Node::Scalar(scalar)) => Err(invalid(&scalar.value)),
        (STR_TAG, Node::Scalar(scalar)) => Ok(Value::String(scalar.value)),
        (NULL_TAG, Node::Scalar(_)) => Ok(Value::Null),
        (BOOL_TAG, Node::Scalar(scalar)) => {
            parse_bool(&scalar.value).ok_or_else(|| invalid(&scalar.value))
        }
        (INT_TAG, Node::Scalar(scalar)) => {
            parse_int(&scalar.value).ok_or_else(|| invalid(&scalar.value))
        }
        (FLOAT_TAG, Node::Scalar(scalar)) => {
            parse_float(&scalar.value).ok_or_else(|| invalid(&scalar.value))
        }
        (tag, _) => Err(LoadError::UnknownTag(tag.to_owned())),
    }
}

/// Tag of an untagged node.
fn implicit_tag(node: &Node) -> &'static str {
    match node {
        Node::Scalar(Scalar {
            value,
            style: ScalarStyle::Plain,
        }) => resolve_plain(value),
        Node::Scalar(_) => STR_TAG,
        Node::Sequence(_) => SEQ_TAG,
        Node::Mapping(_) => MAP_TAG,
    }
}

/// Tag of a node marked with the non-specific `!` tag.
fn non_specific_tag(node: &Node) -> &'static str {
    match node {
        Node::Scalar(_) => STR_TAG,
        Node::Sequence(_) => SEQ_TAG,
        Node::Mapping(_) => MAP_TAG,
    }
}

/// Resolve a plain scalar with the core schema and YAML 1.1 booleans.
fn resolve_plain(value: &str) -> &'static str {
    match value {
        "" | "~" | "null" | "Null" | "NULL" => NULL_TAG,
        _ if parse_bool(value).is_some() => BOOL_TAG,
        _ if INT.is_match(value) => INT_TAG,
        _ if FLOAT.is_match(value) => FLOAT_TAG,
        _ => STR_TAG,
    }
}

fn parse_bool(value: &str) -> Option<Value> {
    match value {
        "true" | "True" | "TRUE" | "yes" | "Yes" | "YES" | "on" | "On" | "ON" => {
            Some(Value::Bool(true))
        }
        "false" | "False" | "FALSE" | "no" | "No" | "NO" | "off" | "Off" | "OFF" => {
            Some(Value::Bool(false))
        }
        _ => None,
    }
}

fn parse_int(value: &str) -> Option<Value> {
    let parsed = if let Some(octal) = value.strip_prefix("0o") {
        i64::from_str_radix(octal, 8).ok().map(Number::from)
    } else if let Some(hex) = value.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok().map(Number::from)
    } else {
        value
            .parse::<i64>()
            .map(Number::from)
            .or_else(|_| value.parse::<u64>().map(Number::from))
            .ok()
            .or_else(|| value.parse::<f64>().ok().map(Number::from))
    };
    parsed.map(Value::Number)
}

fn parse_float(value: &str) -> Option<Value> {
    let number = match value {
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" => f64::INFINITY,
        "-.inf" | "-.Inf" | "-.INF" => f64::NEG_INFINITY,
        ".nan" | ".NaN" | ".NAN" => f64::NAN,
        _ => value.parse::<f64>().ok()?,
    };
    Some(Value::Number(Number::from(number)))
}

/// Full form of a registered tag: `!!name` becomes a core schema URI.
fn expand_tag(tag: &str) -> String {
    match tag.strip_prefix("!!") {
        Some(suffix) => format!("{CORE_PREFIX}{suffix}"),
        None => tag.to_owned(),
    }
}

/// Full form of a parsed node tag.
fn full_tag(tag: &Tag) -> String {
    if tag.handle == "!!" {
        format!("{CORE_PREFIX}{}", tag.suffix)
    } else {
        format!("{}{}", tag.handle, tag.suffix)
    }
}

/// Collection being built.
enum Frame {
    Sequence {
        anchor: usize,
        tag: Option<String>,
        items: Vec<Value>,
    },
    Mapping {
        anchor: usize,
        tag: Option<String>,
        entries: Mapping,
        key: Option<Value>,
    },
}

/// Event receiver that constructs values bottom-up.
struct Builder<'l, 'a> {
    loader: &'l Loader<'a>,
    stack: Vec<Frame>,
    anchors: HashMap<usize, Value>,
    root: Option<Value>,
    /// First construction error; later events are ignored.
    error: Option<LoadError>,
}

impl<'l, 'a> Builder<'l, 'a> {
    fn new(loader: &'l Loader<'a>) -> Self {
        Self {
            loader,
            stack: Vec::new(),
            anchors: HashMap::new(),
            root: None,
            error: None,
        }
    }

    fn construct(&mut self, tag: Option<&str>, node: Node, anchor: usize) {
        match self.loader.construct(tag, node) {
            Ok(value) => self.complete(value, anchor),
            Err(err) => self.error = Some(err),
        }
    }

    fn finish_collection(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        match frame {
            Frame::Sequence { anchor, tag, items } => {
                self.construct(tag.as_deref(), Node::Sequence(items), anchor);
            }
            Frame::Mapping {
                anchor,
                tag,
                entries,
                ..
            } => {
                self.construct(tag.as_deref(), Node::Mapping(entries), anchor);
            }
        }
    }

    /// Attach a finished value to its parent.
    fn complete(&mut self, value: Value, anchor: usize) {
        if anchor != 0 {
            self.anchors.insert(anchor, value.clone());
        }

        match self.stack.last_mut() {
            None => self.root = Some(value),
            Some(Frame::Sequence { items, .. }) => items.push(value),
            Some(Frame::Mapping { entries, key, .. }) => match key.take() {
                Some(key) => {
                    entries.insert(key, value);
                }
                None => *key = Some(value),
            },
        }
    }
}

impl MarkedEventReceiver for Builder<'_, '_> {
    fn on_event(&mut self, event: Event, _marker: Marker) {
        if self.error.is_some() {
            return;
        }

        match event {
            Event::Scalar(value, style, anchor, tag) => {
                let tag = tag.as_ref().map(full_tag);
                let node = Node::Scalar(Scalar {
                    value,
                    style: style.into(),
                });
                self.construct(tag.as_deref(), node, anchor);
            }
            Event::SequenceStart(anchor, tag) => self.stack.push(Frame::Sequence {
                anchor,
                tag: tag.as_ref().map(full_tag),
                items: Vec::new(),
            }),
            Event::MappingStart(anchor, tag) => self.stack.push(Frame::Mapping {
                anchor,
                tag: tag.as_ref().map(full_tag),
                entries: Mapping::new(),
                key: None,
            }),
            Event::SequenceEnd | Event::MappingEnd => self.finish_collection(),
            Event::Alias(anchor) => {
                let value = self.anchors.get(&anchor).cloned().unwrap_or(Value::Null);
                self.complete(value, 0);
            }
            _ => {}
        }
    }
}
