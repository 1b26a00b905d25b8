use anyhow::{Context, Result};
use std::path::Path;

pub const PDFLATEX: &str = "pdflatex";
pub const XELATEX: &str = "xelatex";

/// Picks an engine from the document source: `fontspec` needs XeTeX.
pub fn detect_engine(source: &str) -> &'static str {
    if source.contains("fontspec") {
        XELATEX
    } else {
        PDFLATEX
    }
}

/// The configured engine, or one detected from `document`.
pub fn resolve_engine(configured: Option<&str>, document: &Path) -> Result<String> {
    if let Some(engine) = configured {
        return Ok(engine.to_string());
    }
    let source = std::fs::read(document)
        .with_context(|| format!("Failed to read {}", document.display()))?;
    let engine = detect_engine(&String::from_utf8_lossy(&source));
    log::debug!("detected engine {} for {}", engine, document.display());
    Ok(engine.to_string())
}
