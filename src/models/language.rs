//! Language descriptors reported by the host

use std::fmt;

use serde::{Deserialize, Serialize};

/// Delimiter between segments of a [`ModePattern`]
pub const MODE_DELIMITER: char = '|';

/// Host-reported metadata for one configured programming language
///
/// Serializes in the host's wire shape (`lsp`, `suffix`, `alias`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireLanguage")]
pub struct LanguageDescriptor {
    pub id: String,
    pub display: String,
    #[serde(rename = "lsp")]
    pub lsp_command: Vec<String>,
    #[serde(rename = "suffix")]
    pub file_suffixes: Vec<String>,
    #[serde(rename = "alias")]
    pub aliases: Vec<String>,
}

impl LanguageDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            display: id.clone(),
            id,
            lsp_command: Vec::new(),
            file_suffixes: Vec::new(),
            aliases: Vec::new(),
        }
    }

    pub fn with_lsp<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lsp_command = command.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_suffixes<I, S>(mut self, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_suffixes = suffixes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = display.into();
        self
    }

    /// A language gets a server connection only when it has a command
    pub fn has_lsp(&self) -> bool {
        !self.lsp_command.is_empty()
    }

    pub fn mode_pattern(&self) -> ModePattern {
        ModePattern::new(&self.aliases, &self.id)
    }
}

/// Aliases followed by the language id, joined with `|`
///
/// The editor routes a document to a connection when the document's mode
/// equals one of the segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ModePattern(String);

impl ModePattern {
    pub fn new(aliases: &[String], id: &str) -> Self {
        let mut segments: Vec<&str> = aliases.iter().map(String::as_str).collect();
        segments.push(id);
        Self(segments.join(&MODE_DELIMITER.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(MODE_DELIMITER)
    }

    pub fn matches(&self, mode: &str) -> bool {
        self.segments().any(|segment| segment == mode)
    }
}

impl fmt::Display for ModePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Deserialize)]
struct WireLanguage {
    id: String,
    #[serde(default)]
    display: Option<String>,
    #[serde(default)]
    lsp: WireLsp,
    #[serde(default)]
    suffix: Vec<String>,
    #[serde(default)]
    alias: Vec<String>,
}

/// Hosts report the server command as an argv list, a single command line,
/// or a `{ "command": ... }` table.
#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
enum WireLsp {
    Args(Vec<String>),
    Line(String),
    Table {
        #[serde(default)]
        command: Option<Box<WireLsp>>,
    },
    #[default]
    Missing,
}

impl WireLsp {
    fn into_command(self) -> Vec<String> {
        match self {
            Self::Args(args) => args,
            Self::Line(line) => line.split_whitespace().map(str::to_string).collect(),
            Self::Table { command: Some(inner) } => inner.into_command(),
            Self::Table { command: None } | Self::Missing => Vec::new(),
        }
    }
}

impl From<WireLanguage> for LanguageDescriptor {
    fn from(wire: WireLanguage) -> Self {
        let display = wire
            .display
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| wire.id.clone());
        Self {
            id: wire.id,
            display,
            lsp_command: wire.lsp.into_command(),
            file_suffixes: wire.suffix,
            aliases: wire.alias,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_pattern_places_id_last() {
        let lang = LanguageDescriptor::new("python").with_aliases(["py", "py3"]);
        assert_eq!(lang.mode_pattern().as_str(), "py|py3|python");
    }

    #[test]
    fn test_mode_pattern_without_aliases() {
        let lang = LanguageDescriptor::new("json");
        assert_eq!(lang.mode_pattern().as_str(), "json");
    }

    #[test]
    fn test_mode_pattern_does_not_mutate_aliases() {
        let lang = LanguageDescriptor::new("cpp").with_aliases(["c++"]);
        let _ = lang.mode_pattern();
        let _ = lang.mode_pattern();
        assert_eq!(lang.aliases, vec!["c++".to_string()]);
        assert_eq!(lang.mode_pattern().as_str(), "c++|cpp");
    }

    #[test]
    fn test_mode_pattern_matches_whole_segments() {
        let pattern = LanguageDescriptor::new("python")
            .with_aliases(["py", "python3"])
            .mode_pattern();
        assert!(pattern.matches("py"));
        assert!(pattern.matches("python"));
        assert!(pattern.matches("python3"));
        assert!(!pattern.matches("pyth"));
        assert!(!pattern.matches("py|python3"));
    }

    #[test]
    fn test_decode_list_command() {
        let lang: LanguageDescriptor = serde_json::from_str(
            r#"{"id":"python","display":"Python Source","lsp":["pylsp","-v"],"suffix":[".py"],"alias":["py"]}"#,
        )
        .unwrap();
        assert_eq!(lang.lsp_command, vec!["pylsp", "-v"]);
        assert_eq!(lang.display, "Python Source");
        assert_eq!(lang.file_suffixes, vec![".py"]);
        assert!(lang.has_lsp());
    }

    #[test]
    fn test_decode_command_table() {
        let lang: LanguageDescriptor =
            serde_json::from_str(r#"{"id":"cpp","lsp":{"command":"clangd --background-index"}}"#)
                .unwrap();
        assert_eq!(lang.lsp_command, vec!["clangd", "--background-index"]);
        assert_eq!(lang.display, "cpp");
        assert!(lang.aliases.is_empty());
    }

    #[test]
    fn test_decode_without_lsp() {
        let empty_list: LanguageDescriptor =
            serde_json::from_str(r#"{"id":"json","lsp":[]}"#).unwrap();
        let empty_table: LanguageDescriptor =
            serde_json::from_str(r#"{"id":"json","lsp":{}}"#).unwrap();
        let blank_line: LanguageDescriptor =
            serde_json::from_str(r#"{"id":"json","lsp":"  "}"#).unwrap();
        let missing: LanguageDescriptor = serde_json::from_str(r#"{"id":"json"}"#).unwrap();
        let null: LanguageDescriptor =
            serde_json::from_str(r#"{"id":"json","lsp":null}"#).unwrap();

        for lang in [empty_list, empty_table, blank_line, missing, null] {
            assert!(!lang.has_lsp(), "{:?}", lang);
        }
    }

    #[test]
    fn test_argv_list_is_kept_verbatim() {
        let blank: LanguageDescriptor =
            serde_json::from_str(r#"{"id":"x","lsp":[""]}"#).unwrap();
        assert_eq!(blank.lsp_command, vec![""]);
        assert!(blank.has_lsp());

        let padded: LanguageDescriptor =
            serde_json::from_str(r#"{"id":"python","lsp":[" pylsp "]}"#).unwrap();
        assert_eq!(padded.lsp_command, vec![" pylsp "]);
    }

    #[test]
    fn test_serializes_in_host_shape() {
        let lang = LanguageDescriptor::new("python")
            .with_lsp(["pylsp"])
            .with_aliases(["py"]);
        let value = serde_json::to_value(&lang).unwrap();
        assert_eq!(value["lsp"], serde_json::json!(["pylsp"]));
        assert_eq!(value["alias"], serde_json::json!(["py"]));

        let back: LanguageDescriptor = serde_json::from_value(value).unwrap();
        assert_eq!(back, lang);
    }
}
