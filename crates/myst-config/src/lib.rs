//! Settings for the MyST Markdown reader.
//!
//! Parses `myst.toml` files with serde and provides auto-discovery of the
//! settings file in parent directories.
//!
//! ```toml
//! formatted_fields = ["summary", "abstract"]
//!
//! [myst]
//! plugins = ["tasklist"]
//! highlight = { linenos = "inline" }
//! frontmatter_parse_literal = true
//! ```
//!
//! `myst.plugins` is either a list of extension names or a table of
//! extension name to options. `myst.highlight` is either a flag or a table of
//! formatter options: `linenos`, `linenostart`, `cssclass` and `classprefix`.
//! An empty table enables highlighting with defaults; other keys are ignored
//! with a warning.
//! Both unions are resolved into typed values when the file is loaded, so a
//! bad option is reported before any document is read.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Settings filename to search for.
const CONFIG_FILENAME: &str = "myst.toml";

/// Reader settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Metadata fields whose values are rendered as Markdown.
    pub formatted_fields: Vec<String>,
    /// Markup engine settings.
    pub myst: MystConfig,

    /// Resolved extension set (set after loading).
    #[serde(skip)]
    pub extensions: ExtensionSet,
    /// Resolved highlighting options, `None` when highlighting is off (set after loading).
    #[serde(skip)]
    pub highlight_resolved: Option<FormatterConfig>,
    /// Path to the settings file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            formatted_fields: vec!["summary".to_owned()],
            myst: MystConfig::default(),
            extensions: ExtensionSet::default(),
            highlight_resolved: None,
            config_path: None,
        }
    }
}

/// The `[myst]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MystConfig {
    /// Optional markup extensions.
    pub plugins: PluginSelection,
    /// External syntax highlighting.
    pub highlight: HighlightSetting,
    /// Render plain string scalars written in literal block style (`|`).
    pub frontmatter_parse_literal: bool,
}

impl Default for MystConfig {
    fn default() -> Self {
        Self {
            plugins: PluginSelection::default(),
            highlight: HighlightSetting::default(),
            frontmatter_parse_literal: true,
        }
    }
}

/// Optional extensions as written in the settings file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PluginSelection {
    /// Extension names, each with default options.
    Names(Vec<String>),
    /// Extension name to options table.
    WithOptions(BTreeMap<String, toml::Table>),
}

impl Default for PluginSelection {
    fn default() -> Self {
        Self::Names(Vec::new())
    }
}

impl PluginSelection {
    /// Resolve into the typed extension set.
    ///
    /// Names outside the known set are skipped. Options that don't match the
    /// extension's schema are a validation error.
    pub fn resolve(&self) -> Result<ExtensionSet, ConfigError> {
        let mut set = ExtensionSet::default();
        match self {
            Self::Names(names) => {
                for name in names {
                    set.enable(name, None)?;
                }
            }
            Self::WithOptions(table) => {
                for (name, options) in table {
                    set.enable(name, Some(options))?;
                }
            }
        }
        Ok(set)
    }
}

/// Optional markup extensions after validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionSet {
    /// Task list checkboxes (`- [ ]` / `- [x]`).
    pub tasklist: Option<TaskListConfig>,
    /// Definition lists.
    pub deflist: bool,
}

impl ExtensionSet {
    fn enable(&mut self, name: &str, options: Option<&toml::Table>) -> Result<(), ConfigError> {
        match name {
            "tasklist" => {
                let config = match options {
                    Some(table) => parse_options(name, table)?,
                    None => TaskListConfig::default(),
                };
                self.tasklist = Some(config);
            }
            "deflist" => {
                if let Some(table) = options
                    && !table.is_empty()
                {
                    return Err(ConfigError::Validation(
                        "myst.plugins.deflist takes no options".to_owned(),
                    ));
                }
                self.deflist = true;
            }
            _ => {
                tracing::debug!(extension = name, "Ignoring unknown markup extension");
            }
        }
        Ok(())
    }
}

/// Options for the `tasklist` extension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[allow(clippy::struct_excessive_bools)]
pub struct TaskListConfig {
    /// Leave checkboxes clickable (omit `disabled`).
    pub enabled: bool,
    /// Wrap the item text in a `<label>`.
    pub label: bool,
    /// Place the label after the checkbox, linked by `for`/`id`.
    pub label_after: bool,
}

/// Highlighting switch as written in the settings file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum HighlightSetting {
    /// `highlight = true` / `highlight = false`.
    Enabled(bool),
    /// `highlight = { ... }`; presence of the table enables highlighting.
    Options(FormatterTable),
}

impl Default for HighlightSetting {
    fn default() -> Self {
        Self::Enabled(false)
    }
}

impl HighlightSetting {
    /// Resolve into formatter options, `None` when highlighting is disabled.
    pub fn resolve(&self) -> Result<Option<FormatterConfig>, ConfigError> {
        match self {
            Self::Enabled(false) => Ok(None),
            Self::Enabled(true) => Ok(Some(FormatterConfig::default())),
            Self::Options(table) => table.resolve().map(Some),
        }
    }
}

/// Raw formatter options table.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FormatterTable {
    /// Line numbering: `true`, `false` or `"inline"`.
    pub linenos: Option<LineNumbers>,
    /// First line number.
    pub linenostart: Option<usize>,
    /// Class of the `<div>` wrapping highlighted code.
    pub cssclass: Option<String>,
    /// Prefix added to every token class.
    pub classprefix: Option<String>,
    /// Options with no highlighting counterpart, ignored with a warning.
    #[serde(flatten)]
    pub unsupported: toml::Table,
}

/// Line number setting.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LineNumbers {
    Flag(bool),
    Mode(String),
}

impl FormatterTable {
    fn resolve(&self) -> Result<FormatterConfig, ConfigError> {
        let line_numbers = match &self.linenos {
            None | Some(LineNumbers::Flag(false)) => false,
            Some(LineNumbers::Flag(true)) => true,
            Some(LineNumbers::Mode(mode)) if mode == "inline" => true,
            Some(LineNumbers::Mode(mode)) => {
                return Err(ConfigError::Validation(format!(
                    "myst.highlight.linenos: unsupported mode \"{mode}\" (expected \"inline\")"
                )));
            }
        };
        let line_number_start = self.linenostart.unwrap_or(1);
        if line_number_start == 0 {
            return Err(ConfigError::Validation(
                "myst.highlight.linenostart must be at least 1".to_owned(),
            ));
        }

        let css_class = match &self.cssclass {
            Some(class) => {
                require_non_empty(class, "myst.highlight.cssclass")?;
                require_attribute_safe(class, "myst.highlight.cssclass")?;
                class.clone()
            }
            None => DEFAULT_CSS_CLASS.to_owned(),
        };
        let class_prefix = self.classprefix.clone().unwrap_or_default();
        require_attribute_safe(&class_prefix, "myst.highlight.classprefix")?;

        for option in self.unsupported.keys() {
            tracing::warn!(option = %option, "Ignoring unsupported highlight option");
        }

        Ok(FormatterConfig {
            line_numbers,
            line_number_start,
            css_class,
            class_prefix,
        })
    }
}

/// Default class of the highlighted code wrapper.
pub const DEFAULT_CSS_CLASS: &str = "highlight";

/// Resolved highlighting formatter options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatterConfig {
    /// Prefix each line with its number.
    pub line_numbers: bool,
    /// Number of the first line.
    pub line_number_start: usize,
    /// Class of the wrapping `<div>`.
    pub css_class: String,
    /// Prefix of token classes, empty for none.
    pub class_prefix: String,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            line_numbers: false,
            line_number_start: 1,
            css_class: DEFAULT_CSS_CLASS.to_owned(),
            class_prefix: String::new(),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
}

/// Deserialize an extension's options table into its typed options.
fn parse_options<T: DeserializeOwned>(name: &str, table: &toml::Table) -> Result<T, ConfigError> {
    toml::Value::Table(table.clone())
        .try_into()
        .map_err(|e| ConfigError::Validation(format!("myst.plugins.{name}: {e}")))
}

/// Reject characters that would break out of an HTML class attribute.
fn require_attribute_safe(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.contains(['"', '<', '>', '&']) {
        return Err(ConfigError::Validation(format!(
            "{field} contains characters not allowed in a class name"
        )));
    }
    Ok(())
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Settings {
    /// Load settings from file.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `myst.toml` in current directory and parents,
    /// falling back to defaults when none is found.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or validation fails.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and resolve settings from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut settings: Self = toml::from_str(content)?;
        settings.resolve()?;
        Ok(settings)
    }

    /// Whether `field` (already lower-cased) is rendered as Markdown.
    pub fn is_formatted_field(&self, field: &str) -> bool {
        self.formatted_fields
            .iter()
            .any(|f| f.eq_ignore_ascii_case(field))
    }

    /// Search for settings file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load settings from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut settings = Self::from_toml_str(&content)?;
        settings.config_path = Some(path.to_path_buf());
        Ok(settings)
    }

    /// Validate raw values and fill the resolved fields.
    fn resolve(&mut self) -> Result<(), ConfigError> {
        for field in &self.formatted_fields {
            require_non_empty(field, "formatted_fields entry")?;
        }
        self.extensions = self.myst.plugins.resolve()?;
        self.highlight_resolved = self.myst.highlight.resolve()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(toml: &str) -> Settings {
        Settings::from_toml_str(toml).unwrap()
    }

    fn assert_validation_error(toml: &str, expected: &str) {
        let err = Settings::from_toml_str(toml).unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(_)),
            "Expected ConfigError::Validation, got {err:?}"
        );
        let msg = err.to_string();
        assert!(
            msg.contains(expected),
            "Expected error to contain '{expected}', got: {msg}"
        );
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.formatted_fields, vec!["summary".to_owned()]);
        assert!(settings.myst.frontmatter_parse_literal);
        assert_eq!(settings.extensions, ExtensionSet::default());
        assert_eq!(settings.highlight_resolved, None);
    }

    #[test]
    fn test_parse_empty_settings() {
        let settings = parse("");
        assert_eq!(settings.formatted_fields, vec!["summary".to_owned()]);
        assert_eq!(settings.myst.plugins, PluginSelection::Names(Vec::new()));
        assert!(settings.myst.frontmatter_parse_literal);
        assert_eq!(settings.highlight_resolved, None);
    }

    #[test]
    fn test_parse_formatted_fields() {
        let settings = parse(r#"formatted_fields = ["summary", "abstract"]"#);
        assert!(settings.is_formatted_field("abstract"));
        assert!(settings.is_formatted_field("summary"));
        assert!(!settings.is_formatted_field("title"));
    }

    #[test]
    fn test_empty_formatted_field_rejected() {
        assert_validation_error(r#"formatted_fields = ["summary", " "]"#, "cannot be empty");
    }

    #[test]
    fn test_disable_literal_rendering() {
        let settings = parse(
            r"
[myst]
frontmatter_parse_literal = false
",
        );
        assert!(!settings.myst.frontmatter_parse_literal);
    }

    // ── plugins ──

    #[test]
    fn test_plugins_as_names() {
        let settings = parse(
            r#"
[myst]
plugins = ["tasklist"]
"#,
        );
        assert_eq!(
            settings.extensions,
            ExtensionSet {
                tasklist: Some(TaskListConfig::default()),
                deflist: false,
            }
        );
    }

    #[test]
    fn test_plugins_with_options() {
        let settings = parse(
            r"
[myst.plugins.tasklist]
enabled = true
label = true

[myst.plugins.deflist]
",
        );
        assert_eq!(
            settings.extensions,
            ExtensionSet {
                tasklist: Some(TaskListConfig {
                    enabled: true,
                    label: true,
                    label_after: false,
                }),
                deflist: true,
            }
        );
    }

    #[test]
    fn test_unknown_plugin_ignored() {
        let settings = parse(
            r#"
[myst]
plugins = ["footnote", "deflist"]
"#,
        );
        assert_eq!(settings.extensions.tasklist, None);
        assert!(settings.extensions.deflist);
    }

    #[test]
    fn test_unknown_plugin_with_options_ignored() {
        let settings = parse(
            r"
[myst.plugins.anchors]
max_level = 2
",
        );
        assert_eq!(settings.extensions, ExtensionSet::default());
    }

    #[test]
    fn test_tasklist_bad_option() {
        assert_validation_error(
            r"
[myst.plugins.tasklist]
checked = true
",
            "myst.plugins.tasklist",
        );
    }

    #[test]
    fn test_deflist_rejects_options() {
        assert_validation_error(
            r"
[myst.plugins.deflist]
compact = true
",
            "takes no options",
        );
    }

    // ── highlight ──

    #[test]
    fn test_highlight_flag() {
        let on = parse("[myst]\nhighlight = true\n");
        assert_eq!(on.highlight_resolved, Some(FormatterConfig::default()));

        let off = parse("[myst]\nhighlight = false\n");
        assert_eq!(off.highlight_resolved, None);
    }

    #[test]
    fn test_highlight_empty_table_enables() {
        let settings = parse("[myst.highlight]\n");
        assert_eq!(settings.highlight_resolved, Some(FormatterConfig::default()));
    }

    #[test]
    fn test_highlight_inline_line_numbers() {
        let settings = parse(
            r#"
[myst.highlight]
linenos = "inline"
linenostart = 10
"#,
        );
        assert_eq!(
            settings.highlight_resolved,
            Some(FormatterConfig {
                line_numbers: true,
                line_number_start: 10,
                ..FormatterConfig::default()
            })
        );
    }

    #[test]
    fn test_highlight_class_options() {
        let settings = parse(
            r#"
[myst.highlight]
cssclass = "code"
classprefix = "hl-"
"#,
        );
        assert_eq!(
            settings.highlight_resolved,
            Some(FormatterConfig {
                css_class: "code".to_owned(),
                class_prefix: "hl-".to_owned(),
                ..FormatterConfig::default()
            })
        );
    }

    #[test]
    fn test_highlight_unsupported_options_ignored() {
        let settings = parse(
            r#"
[myst.highlight]
cssclass = "code"
noclasses = true
style = "monokai"
"#,
        );
        let HighlightSetting::Options(table) = &settings.myst.highlight else {
            panic!("expected an options table");
        };
        let mut unsupported: Vec<&str> = table.unsupported.keys().map(String::as_str).collect();
        unsupported.sort_unstable();
        assert_eq!(unsupported, vec!["noclasses", "style"]);
        assert_eq!(
            settings.highlight_resolved,
            Some(FormatterConfig {
                css_class: "code".to_owned(),
                ..FormatterConfig::default()
            })
        );
    }

    #[test]
    fn test_highlight_bad_css_class_rejected() {
        assert_validation_error("[myst.highlight]\ncssclass = \"\"\n", "cannot be empty");
        assert_validation_error(
            "[myst.highlight]\ncssclass = 'a\"b'\n",
            "not allowed in a class name",
        );
    }

    #[test]
    fn test_highlight_table_line_numbers_rejected() {
        assert_validation_error(
            r#"
[myst.highlight]
linenos = "table"
"#,
            "unsupported mode",
        );
    }

    #[test]
    fn test_highlight_zero_line_start_rejected() {
        assert_validation_error(
            r"
[myst.highlight]
linenostart = 0
",
            "at least 1",
        );
    }

    // ── loading ──

    #[test]
    fn test_load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("myst.toml");
        std::fs::write(
            &path,
            r#"
formatted_fields = ["summary", "description"]

[myst]
plugins = ["tasklist"]
highlight = true
"#,
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();

        assert_eq!(settings.config_path, Some(path));
        assert!(settings.is_formatted_field("description"));
        assert!(settings.extensions.tasklist.is_some());
        assert!(settings.highlight_resolved.is_some());
    }

    #[test]
    fn test_load_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        let err = Settings::load(Some(&path)).unwrap_err();

        assert!(matches!(err, ConfigError::NotFound(p) if p == path));
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("myst.toml");
        std::fs::write(&path, "formatted_fields = [").unwrap();

        let err = Settings::load(Some(&path)).unwrap_err();

        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
