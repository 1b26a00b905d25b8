use serde::{Deserialize, Serialize};

/// Ordinal warning level used to decide whether build output stays visible.
///
/// The numeric values are part of the external contract: callers compare
/// [`Severity::level`] against a user-configured threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    None = 0,
    /// Overfull or underfull box.
    BadBox = 1,
    /// LaTeX or package warning.
    Warning = 2,
}

impl Severity {
    pub fn level(self) -> u8 {
        self as u8
    }
}

/// Which classification rule produced a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// `! ...` header opening a fatal-error block.
    Error,
    /// `... Warning: ...`
    Warning,
    /// `Overfull ...` / `Underfull ...`
    BadBox,
    /// `file:line: message` emitted with `-file-line-error`.
    Locator,
    /// `l.<N> ...` context line closing a fatal-error block.
    LineReference,
}

/// A single piece of build feedback attributed to a source location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Source file. `None` until the pipeline resolves it from tracker state,
    /// except for locator lines which carry their own file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    pub message: String,
    pub severity: Severity,
    pub kind: DiagnosticKind,
}

/// How a line of compiler output was typed by the executor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineKind {
    #[default]
    Output,
    /// Version banner printed by the engine before any real output.
    Banner,
}

/// What the caller should display for one line of output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// Print the raw line unchanged.
    Verbatim,
    /// Print nothing.
    Empty,
    /// Print this HTML fragment.
    Html(String),
}

impl Rendered {
    /// Text to emit for `raw`: `None` means "echo the raw line".
    pub fn as_output(&self) -> Option<&str> {
        match self {
            Rendered::Verbatim => None,
            Rendered::Empty => Some(""),
            Rendered::Html(html) => Some(html),
        }
    }

    /// Resolves the rendering against the raw line it was produced from.
    pub fn text<'a>(&'a self, raw: &'a str) -> &'a str {
        self.as_output().unwrap_or(raw)
    }
}
