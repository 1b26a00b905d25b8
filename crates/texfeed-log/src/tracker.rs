//! Tracking of the file the engine is currently reading.
//!
//! TeX reports every file it opens as `(path` and every file it closes as a
//! bare `)`, interleaved with whatever else it prints. Replaying those tokens
//! over a stack yields the file any later message belongs to.
//!
//! Two trackers implement [`FileTracker`]:
//!
//! - [`FragmentTracker`] (the default) copes with paths that the engine
//!   wrapped at [`WRAP_WIDTH`] columns and with closes whose opens scrolled
//!   out of view.
//! - [`StrictTracker`] only follows absolute paths and never joins lines.
//!
//! Both scan a line with an explicit loop that stops once no rule applies.

use crate::error::TrackerError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Column at which TeX breaks log lines (`max_print_line` minus the newline).
///
/// A line at least this long that ends inside a path token is assumed to
/// continue on the next line. 8-bit engines count bytes, not characters, so
/// the width is compared against the byte length of the line. A multi-byte
/// character split across the break is not repaired.
pub const WRAP_WIDTH: usize = 79;

static STRICT_BALANCED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\([^\n()]*?\)").expect("balanced pair regex"));
static LEADING_CLOSE_WS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\)").expect("leading close regex"));
static STRICT_OPEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\((/[^\n()]*?)(?:\s*\[\d+\])?(\(|$)").expect("absolute open regex")
});

static LEADING_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^ *\)").expect("close regex"));
static OPEN_AT_EOL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^()\n]*?)(?:\s*\[\d+\])?$").expect("trailing open regex"));
static OPEN_NESTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^()\n]*?)\s*\(").expect("nested open regex"));

/// Common interface of the file trackers.
pub trait FileTracker: std::fmt::Debug {
    /// Updates the stack from one line of output.
    ///
    /// On error the stack reflects every token consumed before the fault.
    fn consume(&mut self, line: &str) -> Result<(), TrackerError>;

    /// The file currently being processed, if any.
    fn current_file(&mut self) -> Option<&str>;

    /// Open files, outermost first.
    fn stack(&self) -> &[String];

    /// Consumes `line` and reports the resulting current file.
    fn advance(&mut self, line: &str) -> Result<Option<&str>, TrackerError> {
        self.consume(line)?;
        Ok(self.current_file())
    }

    fn depth(&self) -> usize {
        self.stack().len()
    }
}

/// Selects a [`FileTracker`] implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerKind {
    Strict,
    #[default]
    Fragment,
}

impl TrackerKind {
    pub fn build(self) -> Box<dyn FileTracker + Send> {
        match self {
            TrackerKind::Strict => Box::new(StrictTracker::new()),
            TrackerKind::Fragment => Box::new(FragmentTracker::new()),
        }
    }
}

/// Ordered stack of open files; the last entry is the active one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileStack {
    entries: Vec<String>,
}

impl FileStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: &str) {
        let path = path.trim_end();
        log::debug!("enter {:?} (depth {})", path, self.entries.len() + 1);
        self.entries.push(path.to_string());
    }

    pub fn pop(&mut self) -> Result<String, TrackerError> {
        let popped = self.entries.pop().ok_or(TrackerError::Underflow)?;
        log::debug!("leave {:?} (depth {})", popped, self.entries.len());
        Ok(popped)
    }

    /// Top of the stack, discarding any empty entries sitting above it.
    pub fn current(&mut self) -> Option<&str> {
        while self.entries.last().is_some_and(|path| path.is_empty()) {
            self.entries.pop();
        }
        self.entries.last().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Single-pass tracker that only recognises absolute paths.
#[derive(Debug, Clone, Default)]
pub struct StrictTracker {
    stack: FileStack,
}

impl StrictTracker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FileTracker for StrictTracker {
    fn consume(&mut self, line: &str) -> Result<(), TrackerError> {
        let mut rest = line.trim_end_matches(['\r', '\n']);
        loop {
            if let Some(pair) = STRICT_BALANCED.find(rest) {
                rest = &rest[pair.end()..];
            } else if let Some(close) = LEADING_CLOSE_WS.find(rest) {
                self.stack.pop()?;
                rest = &rest[close.end()..];
            } else if let Some(caps) = STRICT_OPEN.captures(rest) {
                self.stack.push(&caps[1]);
                // Resume at the delimiter so a nested `(` is seen again.
                let resume = caps.get(2).map_or(rest.len(), |m| m.start());
                rest = &rest[resume..];
            } else {
                break;
            }
        }
        Ok(())
    }

    fn current_file(&mut self) -> Option<&str> {
        self.stack.current()
    }

    fn stack(&self) -> &[String] {
        self.stack.as_slice()
    }
}

/// Tracker that joins paths wrapped across lines.
#[derive(Debug, Clone, Default)]
pub struct FragmentTracker {
    stack: FileStack,
    fragment: Option<String>,
}

impl FragmentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Head of a wrapped path waiting for its continuation.
    pub fn pending_fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// Completes the pending fragment with the start of `line` and returns
    /// what is left of the line.
    fn continue_fragment<'a>(
        &mut self,
        fragment: String,
        line: &'a str,
    ) -> Result<&'a str, TrackerError> {
        if line.contains('\n') {
            return Err(TrackerError::MalformedFragment {
                fragment,
                line: line.to_string(),
            });
        }
        match line.find(['(', ')']) {
            Some(idx) if line[idx..].starts_with(')') => {
                let path = format!("{fragment}{}", &line[..idx]);
                log::debug!("wrapped file {path:?} opened and closed");
                Ok(&line[idx + 1..])
            }
            Some(idx) => {
                self.stack.push(&format!("{fragment}{}", &line[..idx]));
                Ok(&line[idx..])
            }
            None => {
                self.stack.push(&format!("{fragment}{line}"));
                Ok("")
            }
        }
    }
}

impl FileTracker for FragmentTracker {
    fn consume(&mut self, line: &str) -> Result<(), TrackerError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let wrapped = line.len() >= WRAP_WIDTH;
        let mut rest = line;

        loop {
            if let Some(fragment) = self.fragment.take() {
                rest = self.continue_fragment(fragment, rest)?;
                continue;
            }

            while let Some(close) = LEADING_CLOSE.find(rest) {
                self.stack.pop()?;
                rest = &rest[close.end()..];
            }
            if let Some(caps) = OPEN_AT_EOL.captures(rest) {
                if wrapped {
                    log::debug!("path {:?} wrapped at end of line", &caps[1]);
                    self.fragment = Some(caps[1].to_string());
                } else {
                    self.stack.push(&caps[1]);
                }
            } else if let Some(caps) = OPEN_NESTED.captures(rest) {
                self.stack.push(&caps[1]);
            }
            break;
        }

        // Closes for files whose opens are no longer in view.
        while rest.ends_with("))") {
            self.stack.pop()?;
            rest = &rest[..rest.len() - 1];
        }
        Ok(())
    }

    fn current_file(&mut self) -> Option<&str> {
        self.stack.current()
    }

    fn stack(&self) -> &[String] {
        self.stack.as_slice()
    }
}
