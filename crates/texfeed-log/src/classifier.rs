use crate::ir::{Diagnostic, DiagnosticKind, Severity};
use once_cell::sync::Lazy;
use regex::Regex;

static LINE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"lines? (\d+)").expect("line number regex"));
static WARNING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^.*Warning: (.*)$").expect("warning regex"));
static LOCATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^:]+):(\d+): (.*)$").expect("file-line-error regex"));
static LINE_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^l\.(\d+)(.*)$").expect("l.N regex"));
static HEADLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-->(.*)$").expect("headline regex"));
static SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-+$").expect("separator regex"));

/// Returns `true` for a `!` line that opens a fatal-error block.
///
/// `! ==>` lines are trace output, not errors.
pub fn is_fatal_header(line: &str) -> bool {
    line.strip_prefix('!')
        .is_some_and(|rest| !rest.trim_start().starts_with("==>"))
}

fn line_number(text: &str) -> Option<u32> {
    LINE_NUMBER
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClassifierMode {
    #[default]
    Normal,
    /// Between a `!` header and its `l.<N>` context line.
    InsideFatalError,
}

/// Outcome of classifying one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Diagnostic(Diagnostic),
    /// Section heading announced by a `-->` line.
    Headline(String),
    /// Line made only of dashes.
    Separator,
    /// Echo the line unchanged.
    PassThrough,
    /// Show nothing for this line.
    Suppress,
}

/// Maps lines of compiler output to diagnostics, tracking fatal-error blocks
/// and the highest warning severity seen so far.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    mode: ClassifierMode,
    highest: Severity,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> ClassifierMode {
        self.mode
    }

    pub fn is_inside_fatal_error(&self) -> bool {
        self.mode == ClassifierMode::InsideFatalError
    }

    pub fn highest_severity(&self) -> Severity {
        self.highest
    }

    fn raise(&mut self, severity: Severity) {
        self.highest = self.highest.max(severity);
    }

    /// Classifies one line; surrounding whitespace is ignored.
    ///
    /// Rules are tried in order and the first match wins. Diagnostics other
    /// than `file:line:` locators come back without a file; attributing them
    /// is up to the caller.
    pub fn classify(&mut self, line: &str) -> Classification {
        let line = line.trim();

        if is_fatal_header(line) {
            self.mode = ClassifierMode::InsideFatalError;
            return Classification::Diagnostic(Diagnostic {
                file: None,
                line: line_number(line),
                message: line.to_string(),
                severity: Severity::None,
                kind: DiagnosticKind::Error,
            });
        }

        if let Some(caps) = WARNING.captures(line) {
            self.raise(Severity::Warning);
            return Classification::Diagnostic(Diagnostic {
                file: None,
                line: line_number(line),
                message: caps[1].to_string(),
                severity: Severity::Warning,
                kind: DiagnosticKind::Warning,
            });
        }

        if line.starts_with("Overfull") || line.starts_with("Underfull") {
            self.raise(Severity::BadBox);
            return Classification::Diagnostic(Diagnostic {
                file: None,
                line: line_number(line),
                message: line.to_string(),
                severity: Severity::BadBox,
                kind: DiagnosticKind::BadBox,
            });
        }

        if let Some(caps) = LOCATOR.captures(line) {
            return Classification::Diagnostic(Diagnostic {
                file: Some(caps[1].to_string()),
                line: caps[2].parse().ok(),
                message: caps[3].to_string(),
                severity: Severity::None,
                kind: DiagnosticKind::Locator,
            });
        }

        if let Some(caps) = LINE_REFERENCE.captures(line) {
            self.mode = ClassifierMode::Normal;
            return Classification::Diagnostic(Diagnostic {
                file: None,
                line: caps[1].parse().ok(),
                message: caps[2].trim().to_string(),
                severity: Severity::None,
                kind: DiagnosticKind::LineReference,
            });
        }

        if let Some(caps) = HEADLINE.captures(line) {
            return Classification::Headline(caps[1].to_string());
        }

        if SEPARATOR.is_match(line) {
            return Classification::Separator;
        }

        match self.mode {
            ClassifierMode::InsideFatalError => Classification::PassThrough,
            ClassifierMode::Normal => Classification::Suppress,
        }
    }
}
