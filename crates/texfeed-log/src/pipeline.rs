use crate::classifier::{Classification, Classifier, is_fatal_header};
use crate::error::PipelineError;
use crate::ir::{Diagnostic, LineKind, Rendered, Severity};
use crate::render::Renderer;
use crate::tracker::{FileTracker, TrackerKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What to do when the tracker reports malformed output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingPolicy {
    /// Fail the line with [`PipelineError::Tracker`].
    Strict,
    /// Log a warning and keep attributing to the last known file.
    #[default]
    Lenient,
}

/// Settings for one [`FeedbackPipeline`].
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// File diagnostics are attributed to while no file is open.
    pub default_file: Option<String>,
    /// Directory `.`-relative paths are resolved against.
    pub base_dir: Option<PathBuf>,
    pub tracker: TrackerKind,
    pub policy: TrackingPolicy,
    pub link_template: Option<String>,
    /// Echo every line without tracking or classifying it.
    pub raw: bool,
}

/// Result of processing one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub rendered: Rendered,
    /// The diagnostic behind `rendered`, with its file resolved.
    pub diagnostic: Option<Diagnostic>,
}

impl Feedback {
    fn plain(rendered: Rendered) -> Self {
        Self {
            rendered,
            diagnostic: None,
        }
    }
}

/// Counters reported once the compiler output is exhausted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineSummary {
    pub lines: usize,
    pub diagnostics: usize,
    pub tracker_faults: usize,
    pub highest: Severity,
}

/// Tracker, classifier and renderer for a single compiler run.
///
/// Lines must be fed in the order the compiler printed them. A pipeline is
/// never reused across runs.
#[derive(Debug)]
pub struct FeedbackPipeline {
    tracker: Box<dyn FileTracker + Send>,
    classifier: Classifier,
    renderer: Renderer,
    default_file: Option<String>,
    policy: TrackingPolicy,
    raw: bool,
    summary: PipelineSummary,
}

impl Default for FeedbackPipeline {
    fn default() -> Self {
        Self::new(PipelineOptions::default())
    }
}

impl FeedbackPipeline {
    pub fn new(options: PipelineOptions) -> Self {
        let mut renderer = Renderer::new(options.base_dir);
        if let Some(template) = options.link_template {
            renderer = renderer.with_link_template(template);
        }
        Self {
            tracker: options.tracker.build(),
            classifier: Classifier::new(),
            renderer,
            default_file: options.default_file,
            policy: options.policy,
            raw: options.raw,
            summary: PipelineSummary::default(),
        }
    }

    pub fn highest_severity(&self) -> Severity {
        self.classifier.highest_severity()
    }

    pub fn is_inside_fatal_error(&self) -> bool {
        self.classifier.is_inside_fatal_error()
    }

    /// Files the tracker currently considers open, outermost first.
    pub fn open_files(&self) -> &[String] {
        self.tracker.stack()
    }

    /// Processes one line and returns what to display for it.
    pub fn process(&mut self, line: &str, kind: LineKind) -> Result<Rendered, PipelineError> {
        self.step(line, kind).map(|feedback| feedback.rendered)
    }

    /// Like [`process`](Self::process), also returning the diagnostic.
    pub fn step(&mut self, line: &str, kind: LineKind) -> Result<Feedback, PipelineError> {
        self.summary.lines += 1;
        if self.raw || kind == LineKind::Banner {
            return Ok(Feedback::plain(Rendered::Verbatim));
        }

        // Inside an error block the engine echoes source text, whose
        // parentheses say nothing about open files.
        if !self.classifier.is_inside_fatal_error() && !is_fatal_header(line.trim()) {
            self.track(line)?;
        }

        match self.classifier.classify(line) {
            Classification::Diagnostic(mut diagnostic) => {
                let file = match diagnostic.file.take() {
                    Some(file) => file,
                    None => self.current_file().ok_or_else(|| PipelineError::MissingFile {
                        message: diagnostic.message.clone(),
                    })?,
                };
                let file = self.renderer.normalize(&file);
                let html = self.renderer.diagnostic(&file, &diagnostic);
                diagnostic.file = Some(file);
                self.summary.diagnostics += 1;
                Ok(Feedback {
                    rendered: Rendered::Html(html),
                    diagnostic: Some(diagnostic),
                })
            }
            Classification::Headline(text) => {
                Ok(Feedback::plain(Rendered::Html(self.renderer.headline(&text))))
            }
            Classification::Separator => {
                Ok(Feedback::plain(Rendered::Html(self.renderer.separator())))
            }
            Classification::PassThrough => Ok(Feedback::plain(Rendered::Verbatim)),
            Classification::Suppress => Ok(Feedback::plain(Rendered::Empty)),
        }
    }

    fn track(&mut self, line: &str) -> Result<(), PipelineError> {
        match self.tracker.consume(line) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.summary.tracker_faults += 1;
                match self.policy {
                    TrackingPolicy::Strict => Err(err.into()),
                    TrackingPolicy::Lenient => {
                        log::warn!("malformed compiler output {line:?}: {err}");
                        Ok(())
                    }
                }
            }
        }
    }

    fn current_file(&mut self) -> Option<String> {
        self.tracker
            .current_file()
            .map(str::to_string)
            .or_else(|| self.default_file.clone())
    }

    /// Final counters, including the highest severity seen.
    pub fn finish(self) -> PipelineSummary {
        PipelineSummary {
            highest: self.classifier.highest_severity(),
            ..self.summary
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrackerError;

    fn pipeline(default_file: Option<&str>) -> FeedbackPipeline {
        FeedbackPipeline::new(PipelineOptions {
            default_file: default_file.map(str::to_string),
            base_dir: Some(PathBuf::from("/work")),
            ..PipelineOptions::default()
        })
    }

    #[test]
    fn attributes_to_innermost_file() {
        let mut pipeline = pipeline(Some("/work/main.tex"));
        pipeline.process("(./main.tex", LineKind::Output).unwrap();
        pipeline.process("(./chapter.tex", LineKind::Output).unwrap();
        let feedback = pipeline
            .step("LaTeX Warning: Citation `knuth' undefined on input line 4.", LineKind::Output)
            .unwrap();
        let diagnostic = feedback.diagnostic.unwrap();
        assert_eq!(diagnostic.file.as_deref(), Some("/work/chapter.tex"));
        assert_eq!(diagnostic.line, Some(4));
    }

    #[test]
    fn falls_back_to_default_file() {
        let mut pipeline = pipeline(Some("/work/main.tex"));
        let feedback = pipeline
            .step("Overfull \\hbox (1.0pt too wide) in paragraph at lines 3--4", LineKind::Output)
            .unwrap();
        assert_eq!(feedback.diagnostic.unwrap().file.as_deref(), Some("/work/main.tex"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let mut pipeline = pipeline(None);
        let err = pipeline.process("LaTeX Warning: oops", LineKind::Output).unwrap_err();
        assert!(matches!(err, PipelineError::MissingFile { .. }));
        // Suppressed lines never need a file.
        assert_eq!(pipeline.process("chatter", LineKind::Output), Ok(Rendered::Empty));
    }

    #[test]
    fn tracker_is_frozen_inside_error_block() {
        let mut pipeline = pipeline(Some("/work/main.tex"));
        pipeline.process("(./main.tex", LineKind::Output).unwrap();
        pipeline.process("! Missing $ inserted.", LineKind::Output).unwrap();
        assert_eq!(
            pipeline.process("<inserted text> (./not-a-file.tex", LineKind::Output),
            Ok(Rendered::Verbatim)
        );
        pipeline.process("l.9 x_1", LineKind::Output).unwrap();
        assert_eq!(pipeline.open_files(), ["./main.tex"]);
    }

    #[test]
    fn lenient_policy_survives_underflow() {
        let mut pipeline = pipeline(Some("/work/main.tex"));
        assert_eq!(pipeline.process(")", LineKind::Output), Ok(Rendered::Empty));
        assert_eq!(pipeline.finish().tracker_faults, 1);
    }

    #[test]
    fn strict_policy_reports_underflow() {
        let mut pipeline = FeedbackPipeline::new(PipelineOptions {
            policy: TrackingPolicy::Strict,
            ..PipelineOptions::default()
        });
        assert_eq!(
            pipeline.process(")", LineKind::Output),
            Err(PipelineError::Tracker(TrackerError::Underflow))
        );
    }

    #[test]
    fn raw_mode_and_banner_are_verbatim() {
        let mut raw = FeedbackPipeline::new(PipelineOptions {
            raw: true,
            ..PipelineOptions::default()
        });
        assert_eq!(
            raw.process("! Undefined control sequence.", LineKind::Output),
            Ok(Rendered::Verbatim)
        );
        assert!(!raw.is_inside_fatal_error());

        let mut pipeline = pipeline(None);
        assert_eq!(
            pipeline.process("This is pdfTeX, Version 3.141592653", LineKind::Banner),
            Ok(Rendered::Verbatim)
        );
        assert_eq!(pipeline.open_files().len(), 0);
    }

    #[test]
    fn summary_counts_lines_and_diagnostics() {
        let mut pipeline = pipeline(Some("/work/main.tex"));
        for line in [
            "(./main.tex",
            "Underfull \\hbox (badness 10000) in paragraph at lines 1--2",
            ")",
        ] {
            pipeline.process(line, LineKind::Output).unwrap();
        }
        let summary = pipeline.finish();
        assert_eq!(summary.lines, 3);
        assert_eq!(summary.diagnostics, 1);
        assert_eq!(summary.highest, Severity::BadBox);
    }
}
