//! # texfeed build log feedback
//!
//! Turns the streaming output of a LaTeX engine into inline build feedback.
//!
//! ## Overview
//!
//! TeX engines interleave three kinds of information on stdout:
//!
//! - **File tokens**: `(path` when a file is opened, `)` when it is closed
//! - **Messages**: `!` errors, `... Warning:` lines, overfull/underfull boxes
//! - **Chatter**: everything else, which is hidden unless an error is being shown
//!
//! A [`FeedbackPipeline`] consumes that output one line at a time, keeps track
//! of the file being processed and emits one [`Rendered`](ir::Rendered) value
//! per line.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  line   ┌─────────────┐ current file ┌────────────┐
//! │ engine stdout│ ──────► │ FileTracker │ ───────────► │            │
//! │  (streaming) │         └─────────────┘              │  Renderer  │ ──► Rendered
//! │              │  line   ┌─────────────┐  Diagnostic  │            │
//! │              │ ──────► │ Classifier  │ ───────────► │            │
//! └──────────────┘         └─────────────┘              └────────────┘
//! ```
//!
//! - [`tracker`] keeps the stack of open files. [`FragmentTracker`] is the
//!   default and joins paths the engine wrapped across lines.
//! - [`classifier`] maps each line to a [`Diagnostic`](ir::Diagnostic),
//!   a headline, a separator, a pass-through or a suppression, and remembers
//!   the highest [`Severity`](ir::Severity) seen.
//! - [`render`] produces the HTML fragments.
//!
//! ## Examples
//!
//! ```
//! use texfeed_log::{FeedbackPipeline, PipelineOptions};
//! use texfeed_log::ir::{LineKind, Rendered, Severity};
//!
//! let mut pipeline = FeedbackPipeline::new(PipelineOptions {
//!     default_file: Some("/doc/main.tex".into()),
//!     base_dir: Some("/doc".into()),
//!     ..PipelineOptions::default()
//! });
//!
//! let output = [
//!     "(./main.tex",
//!     "LaTeX Warning: Reference `fig:a' on page 1 undefined on input line 7.",
//!     ")",
//! ];
//! for line in output {
//!     match pipeline.process(line, LineKind::Output)? {
//!         Rendered::Html(html) => println!("{html}"),
//!         Rendered::Verbatim => println!("{line}"),
//!         Rendered::Empty => {}
//!     }
//! }
//! assert_eq!(pipeline.highest_severity(), Severity::Warning);
//! # Ok::<(), texfeed_log::PipelineError>(())
//! ```

pub mod classifier;
pub mod error;
/// Diagnostic and rendering value types.
pub mod ir;
pub mod pipeline;
pub mod render;
pub mod tracker;


pub use classifier::{Classification, Classifier};
pub use error::{PipelineError, TrackerError};
pub use pipeline::{FeedbackPipeline, PipelineOptions, PipelineSummary, TrackingPolicy};
pub use tracker::{FileTracker, FragmentTracker, StrictTracker, TrackerKind};
