use crate::artifacts::FileArtifact;
use crate::compiler::{CommandRunner, Compiler, Stream};
use crate::config::BuildConfig;
use crate::engine::resolve_engine;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use texfeed_log::ir::{LineKind, Rendered, Severity};
use texfeed_log::{FeedbackPipeline, PipelineOptions, PipelineSummary};

/// What to compile, with what, and where the PDF will land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    /// The document handed to the engine: the master if one is configured.
    pub document: PathBuf,
    pub compiler: Compiler,
    pub pdf: PathBuf,
}

impl BuildPlan {
    /// Resolves the compile for `current_file` under `config`.
    ///
    /// A relative master is taken relative to the current file's directory.
    pub fn new(current_file: &Path, config: &BuildConfig) -> Result<Self> {
        let document = match &config.master {
            Some(master) if master.is_absolute() => master.clone(),
            Some(master) => parent_dir(current_file).join(master),
            None => current_file.to_path_buf(),
        };
        let file_name = document
            .file_name()
            .with_context(|| format!("{} does not name a file", document.display()))?;
        let engine = resolve_engine(config.engine.as_deref(), &document)?;

        let mut args = config.flags.clone();
        args.push(file_name.to_string_lossy().into_owned());

        Ok(Self {
            compiler: Compiler::new(&engine, parent_dir(&document)).with_args(args),
            pdf: document.with_extension("pdf"),
            document,
        })
    }

    fn pipeline_options(&self, config: &BuildConfig) -> PipelineOptions {
        PipelineOptions {
            default_file: Some(self.document.to_string_lossy().into_owned()),
            base_dir: Some(self.compiler.working_dir.clone()),
            tracker: config.tracker,
            policy: config.policy,
            link_template: config.link_template.clone(),
            raw: config.debug,
        }
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Whether the build window can be closed automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Dismiss,
    Show,
}

#[derive(Debug, Clone)]
pub struct BuildOutcome {
    /// The engine exited with status zero.
    pub success: bool,
    pub summary: PipelineSummary,
    /// The PDF as it exists after the run.
    pub pdf: Option<FileArtifact>,
    /// The PDF was created or its content changed during the run.
    pub pdf_updated: bool,
    /// Set when feedback fell back to raw output part-way through.
    pub degraded: Option<String>,
}

impl BuildOutcome {
    pub fn highest(&self) -> Severity {
        self.summary.highest
    }

    /// Successful builds whose warnings do not exceed `warn_level` are dismissed.
    pub fn disposition(&self, warn_level: u8) -> Disposition {
        if self.success && warn_level >= self.summary.highest.level() {
            Disposition::Dismiss
        } else {
            Disposition::Show
        }
    }
}

/// Runs `plan`, calling `emit` with every raw line and its rendering in
/// output order.
///
/// A pipeline error does not abort the build: the error is logged and the
/// rest of the output is echoed verbatim.
pub fn run_build(
    plan: &BuildPlan,
    config: &BuildConfig,
    runner: &dyn CommandRunner,
    emit: &mut dyn FnMut(&str, &Rendered),
) -> Result<BuildOutcome> {
    let before = FileArtifact::probe(&plan.pdf);
    let mut pipeline = FeedbackPipeline::new(plan.pipeline_options(config));
    let mut seen_banner = false;
    let mut degraded: Option<String> = None;

    log::info!("Typesetting {} with {}", plan.document.display(), plan.compiler.engine);
    let success = runner.run(&plan.compiler, &mut |line: &str, stream: Stream| -> Result<()> {
        let kind = if stream == Stream::Stdout && !seen_banner && !line.trim().is_empty() {
            seen_banner = true;
            LineKind::Banner
        } else {
            LineKind::Output
        };
        if degraded.is_some() {
            emit(line, &Rendered::Verbatim);
            return Ok(());
        }
        match pipeline.process(line, kind) {
            Ok(rendered) => emit(line, &rendered),
            Err(err) => {
                log::error!("Build feedback disabled for the rest of the run: {err}");
                degraded = Some(err.to_string());
                emit(line, &Rendered::Verbatim);
            }
        }
        Ok(())
    })?;

    let summary = pipeline.finish();
    let pdf = FileArtifact::probe(&plan.pdf);
    let pdf_updated = pdf
        .as_ref()
        .is_some_and(|after| after.changed_since(before.as_ref()));
    log::info!(
        "Build finished: success={} highest={:?} diagnostics={}",
        success,
        summary.highest,
        summary.diagnostics
    );

    Ok(BuildOutcome {
        success,
        summary,
        pdf,
        pdf_updated,
        degraded,
    })
}
