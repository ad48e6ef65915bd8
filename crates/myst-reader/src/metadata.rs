//! Metadata normalization.
//!
//! Turns the raw front matter mapping into the final metadata:
//! 1. a missing `title` is taken from the leading heading of the body
//! 2. field names are lower-cased
//! 3. formatted fields are rendered as Markdown
//! 4. every value goes through the [`MetadataProcessor`]

use indexmap::IndexMap;
use myst_config::Settings;
use serde_yaml::{Mapping, Value};

use crate::loader::Loader;

/// Final document metadata, in declaration order.
pub type Metadata = IndexMap<String, Value>;

/// Post-processing step applied to every metadata value.
///
/// This is where a host coerces values into its own types (dates, numbers,
/// author objects). Closures implement the trait.
pub trait MetadataProcessor: Send + Sync {
    fn process(&self, name: &str, value: Value) -> Value;
}

impl<F> MetadataProcessor for F
where
    F: Fn(&str, Value) -> Value + Send + Sync,
{
    fn process(&self, name: &str, value: Value) -> Value {
        self(name, value)
    }
}

/// Processor that returns values unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

impl MetadataProcessor for Identity {
    fn process(&self, _name: &str, value: Value) -> Value {
        value
    }
}

/// Normalizes raw front matter for one document.
pub(crate) struct Normalizer<'a> {
    pub(crate) loader: &'a Loader<'a>,
    pub(crate) settings: &'a Settings,
    pub(crate) processor: &'a dyn MetadataProcessor,
}

impl Normalizer<'_> {
    /// Build the final metadata from `raw`, deriving the title from
    /// `leading_heading` when the front matter has none.
    pub(crate) fn normalize(&self, mut raw: Mapping, leading_heading: Option<&str>) -> Metadata {
        let has_title = raw
            .keys()
            .filter_map(Value::as_str)
            .any(|key| key.eq_ignore_ascii_case("title"));
        if !has_title && let Some(heading) = leading_heading {
            raw.insert(Value::from("title"), Value::from(heading));
        }

        let mut metadata = Metadata::with_capacity(raw.len());
        for (key, value) in raw {
            let Some(name) = key_name(&key) else {
                tracing::warn!(key = ?key, "Skipping metadata field with a non-scalar name");
                continue;
            };
            let name = name.to_lowercase();

            let value = if self.settings.is_formatted_field(&name) {
                self.render_field(value)
            } else {
                value
            };
            let value = self.processor.process(&name, value);
            metadata.insert(name, value);
        }
        metadata
    }

    /// Render a formatted field. Collections and nulls pass through.
    fn render_field(&self, value: Value) -> Value {
        match value {
            Value::String(text) => Value::String(self.loader.render(&text)),
            Value::Bool(flag) => Value::String(self.loader.render(&flag.to_string())),
            Value::Number(number) => Value::String(self.loader.render(&number.to_string())),
            other => other,
        }
    }
}

/// Field name for a mapping key. Scalars are stringified.
fn key_name(key: &Value) -> Option<String> {
    match key {
        Value::String(name) => Some(name.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null => Some("null".to_owned()),
        Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => None,
    }
}
