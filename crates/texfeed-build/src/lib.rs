//! Compiling LaTeX documents with live build feedback.
//!
//! A [`BuildPlan`] resolves which document to compile, which engine to use and
//! where the PDF ends up. [`run_build`] runs the engine through a
//! [`CommandRunner`] and feeds its output, line by line and in order, into a
//! fresh [`texfeed_log::FeedbackPipeline`].
//!
//! ```no_run
//! use std::path::Path;
//! use texfeed_build::{BuildConfig, BuildPlan, Disposition, ProcessRunner, run_build};
//! use texfeed_log::ir::Rendered;
//!
//! let document = Path::new("/home/me/paper/main.tex");
//! let config = BuildConfig::resolve(document)?;
//! let plan = BuildPlan::new(document, &config)?;
//! let outcome = run_build(&plan, &config, &ProcessRunner, &mut |raw: &str, rendered: &Rendered| {
//!     let text = rendered.text(raw);
//!     if !text.is_empty() {
//!         println!("{text}");
//!     }
//! })?;
//! if outcome.disposition(config.warn_level) == Disposition::Show {
//!     eprintln!("build needs attention");
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod artifacts;
pub mod compiler;
pub mod config;
pub mod engine;
pub mod session;

pub use artifacts::FileArtifact;
pub use compiler::{CommandRunner, Compiler, ProcessRunner, Stream};
pub use config::BuildConfig;
pub use session::{BuildOutcome, BuildPlan, Disposition, run_build};
