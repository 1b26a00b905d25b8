use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use texfeed_build::{BuildConfig, BuildPlan, Disposition, ProcessRunner, run_build};
use texfeed_log::ir::{LineKind, Rendered};
use texfeed_log::{FeedbackPipeline, PipelineOptions, TrackerKind, TrackingPolicy};

#[derive(Parser)]
#[command(name = "texfeed")]
#[command(about = "Typeset LaTeX documents with inline build feedback", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum TrackerArg {
    Strict,
    Fragment,
}

impl From<TrackerArg> for TrackerKind {
    fn from(arg: TrackerArg) -> Self {
        match arg {
            TrackerArg::Strict => TrackerKind::Strict,
            TrackerArg::Fragment => TrackerKind::Fragment,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Typeset a document and stream feedback as HTML
    Build {
        /// The document being edited
        #[arg(value_name = "FILE")]
        path: PathBuf,
        /// Engine executable (detected from the document by default)
        #[arg(long)]
        engine: Option<String>,
        /// Engine flag; repeat for several. Replaces configured flags
        #[arg(long = "flag", value_name = "FLAG", allow_hyphen_values = true)]
        flags: Vec<String>,
        /// Highest severity (0-2) that still counts as a clean build
        #[arg(long)]
        warn_level: Option<u8>,
        /// Project master to compile instead of FILE
        #[arg(long)]
        master: Option<PathBuf>,
        /// Print the raw engine output
        #[arg(long)]
        debug: bool,
        /// Stop interpreting output at the first malformed file token
        #[arg(long)]
        strict: bool,
        #[arg(long, value_enum)]
        tracker: Option<TrackerArg>,
        /// Link template with {url}, {path} and {line} placeholders
        #[arg(long)]
        link: Option<String>,
    },
    /// Replay saved engine output and emit feedback
    Parse {
        /// Saved engine output or .log file
        #[arg(value_name = "FILE")]
        path: PathBuf,
        /// File to attribute messages to while no file is open
        /// (defaults to the .tex file next to FILE)
        #[arg(long)]
        file: Option<String>,
        /// Directory relative paths are resolved against
        /// (defaults to the directory of FILE)
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Emit diagnostics as JSON lines instead of HTML
        #[arg(long)]
        json: bool,
        /// Stop at the first malformed file token
        #[arg(long)]
        strict: bool,
        #[arg(long, value_enum)]
        tracker: Option<TrackerArg>,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            path,
            engine,
            flags,
            warn_level,
            master,
            debug,
            strict,
            tracker,
            link,
        } => {
            let path = std::path::absolute(&path)
                .with_context(|| format!("Cannot resolve {}", path.display()))?;
            let mut config = BuildConfig::resolve(&path)?;
            if engine.is_some() {
                config.engine = engine;
            }
            if !flags.is_empty() {
                config.flags = flags;
            }
            if let Some(level) = warn_level {
                config.warn_level = level;
            }
            if master.is_some() {
                config.master = master;
            }
            if let Some(tracker) = tracker {
                config.tracker = tracker.into();
            }
            if link.is_some() {
                config.link_template = link;
            }
            config.debug |= debug;
            if strict {
                config.policy = TrackingPolicy::Strict;
            }
            build(&path, &config)
        }
        Commands::Parse {
            path,
            file,
            dir,
            json,
            strict,
            tracker,
        } => {
            let default_file = file
                .unwrap_or_else(|| path.with_extension("tex").to_string_lossy().into_owned());
            let options = PipelineOptions {
                default_file: Some(default_file),
                base_dir: Some(dir.unwrap_or_else(|| log_dir(&path))),
                tracker: tracker.map(Into::into).unwrap_or_default(),
                policy: if strict { TrackingPolicy::Strict } else { TrackingPolicy::Lenient },
                link_template: None,
                raw: false,
            };
            parse(&path, options, json)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn log_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn build(path: &Path, config: &BuildConfig) -> anyhow::Result<ExitCode> {
    let plan = BuildPlan::new(path, config)?;
    let mut out = io::stdout().lock();
    let mut write_error = None;

    let outcome = run_build(&plan, config, &ProcessRunner, &mut |raw: &str, rendered: &Rendered| {
        if *rendered == Rendered::Empty || write_error.is_some() {
            return;
        }
        if let Err(err) = writeln!(out, "{}", rendered.text(raw)) {
            write_error = Some(err);
        }
    })?;
    if let Some(err) = write_error {
        return Err(err).context("Failed to write build feedback");
    }

    if let Some(reason) = &outcome.degraded {
        log::warn!("Feedback fell back to raw output: {reason}");
    }
    if let Some(pdf) = &outcome.pdf {
        log::info!("PDF {} (updated: {})", pdf.path.display(), outcome.pdf_updated);
    }

    let code = match (outcome.success, outcome.disposition(config.warn_level)) {
        (false, _) => ExitCode::FAILURE,
        (true, Disposition::Show) => ExitCode::from(2),
        (true, Disposition::Dismiss) => ExitCode::SUCCESS,
    };
    Ok(code)
}

fn parse(path: &Path, options: PipelineOptions, json: bool) -> anyhow::Result<()> {
    let content = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let content = String::from_utf8_lossy(&content);
    let mut pipeline = FeedbackPipeline::new(options);
    let mut out = io::stdout().lock();
    let mut seen_banner = false;

    for (index, line) in content.lines().enumerate() {
        let kind = if !seen_banner && !line.trim().is_empty() {
            seen_banner = true;
            LineKind::Banner
        } else {
            LineKind::Output
        };
        let feedback = pipeline
            .step(line, kind)
            .with_context(|| format!("{}:{}: cannot interpret output", path.display(), index + 1))?;

        if json {
            if let Some(diagnostic) = &feedback.diagnostic {
                writeln!(out, "{}", serde_json::to_string(diagnostic)?)?;
            }
        } else if feedback.rendered != Rendered::Empty {
            writeln!(out, "{}", feedback.rendered.text(line))?;
        }
    }

    let summary = pipeline.finish();
    if json {
        writeln!(out, "{}", serde_json::to_string(&summary)?)?;
    }
    if summary.tracker_faults > 0 {
        log::warn!("{} malformed file token(s) ignored", summary.tracker_faults);
    }
    if summary.lines == 0 {
        bail!("{} is empty", path.display());
    }
    Ok(())
}
