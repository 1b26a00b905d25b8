use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use texfeed_log::{TrackerKind, TrackingPolicy};

/// Name of the optional per-project configuration file, looked up next to
/// the document being compiled.
pub const CONFIG_FILE_NAME: &str = "texfeed.json";

/// Flags passed to the engine when none are configured.
pub const DEFAULT_FLAGS: &[&str] = &["-interaction=nonstopmode"];

/// Settings for one compile run.
///
/// Layers, lowest precedence first: [`Default`], `texfeed.json`, `TEXFEED_*`
/// environment variables, then whatever the caller overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct BuildConfig {
    /// Engine executable; detected from the document when unset.
    pub engine: Option<String>,
    pub flags: Vec<String>,
    /// Highest severity that still lets a successful build be dismissed.
    pub warn_level: u8,
    /// Project master compiled instead of the current file.
    pub master: Option<PathBuf>,
    /// Echo the raw engine output.
    pub debug: bool,
    pub tracker: TrackerKind,
    pub policy: TrackingPolicy,
    /// Link template for diagnostics, see `texfeed_log::render::Renderer`.
    pub link_template: Option<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            engine: None,
            flags: DEFAULT_FLAGS.iter().map(|flag| flag.to_string()).collect(),
            warn_level: 0,
            master: None,
            debug: false,
            tracker: TrackerKind::default(),
            policy: TrackingPolicy::default(),
            link_template: None,
        }
    }
}

impl BuildConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Invalid build configuration in {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Loads `texfeed.json` from the document's directory, or the defaults
    /// when there is none.
    pub fn discover(document: &Path) -> Result<Self> {
        let dir = document.parent().unwrap_or_else(|| Path::new("."));
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            log::info!("Using build configuration {}", candidate.display());
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    /// Configuration file layered with the process environment.
    pub fn resolve(document: &Path) -> Result<Self> {
        let mut config = Self::discover(document)?;
        config.apply_env(std::env::vars())?;
        Ok(config)
    }

    /// Applies `TEXFEED_*` overrides from `vars`; other variables are ignored.
    pub fn apply_env<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let value = value.as_ref();
            match key.as_ref() {
                "TEXFEED_ENGINE" if !value.trim().is_empty() => {
                    self.engine = Some(value.trim().to_string());
                }
                "TEXFEED_FLAGS" => {
                    self.flags = shlex::split(value).ok_or_else(|| {
                        anyhow!("TEXFEED_FLAGS has unbalanced quotes: {value:?}")
                    })?;
                }
                "TEXFEED_WARN_LEVEL" if !value.trim().is_empty() => {
                    self.warn_level = value.trim().parse().with_context(|| {
                        format!("TEXFEED_WARN_LEVEL must be a small integer, got {value:?}")
                    })?;
                }
                "TEXFEED_MASTER" if !value.is_empty() => {
                    self.master = Some(PathBuf::from(value));
                }
                // Presence alone switches debug output on.
                "TEXFEED_DEBUG" => self.debug = true,
                "TEXFEED_LINK" if !value.is_empty() => {
                    self.link_template = Some(value.to_string());
                }
                _ => {}
            }
        }
        Ok(())
    }
}
