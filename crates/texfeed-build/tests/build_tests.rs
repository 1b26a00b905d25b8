use anyhow::Result;
use std::cell::RefCell;
use std::path::Path;
use texfeed_build::{
    BuildConfig, BuildPlan, CommandRunner, Compiler, Disposition, Stream, run_build,
};
use texfeed_log::ir::{Rendered, Severity};
use texfeed_log::TrackingPolicy;

/// Replays canned engine output and optionally writes the PDF.
#[derive(Debug, Default)]
struct ScriptedRunner {
    stdout: Vec<&'static str>,
    stderr: Vec<&'static str>,
    success: bool,
    writes_pdf: Option<&'static str>,
    invoked: RefCell<Vec<Compiler>>,
}

impl CommandRunner for ScriptedRunner {
    fn run(
        &self,
        compiler: &Compiler,
        on_line: &mut dyn FnMut(&str, Stream) -> Result<()>,
    ) -> Result<bool> {
        self.invoked.borrow_mut().push(compiler.clone());
        for line in &self.stdout {
            on_line(line, Stream::Stdout)?;
        }
        for line in &self.stderr {
            on_line(line, Stream::Stderr)?;
        }
        if let Some(content) = self.writes_pdf {
            let name = compiler.args.last().unwrap().replace(".tex", ".pdf");
            std::fs::write(compiler.working_dir.join(name), content)?;
        }
        Ok(self.success)
    }
}

fn document(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("main.tex");
    std::fs::write(&path, "\\documentclass{article}\\begin{document}x\\end{document}").unwrap();
    path
}

fn collect(
    plan: &BuildPlan,
    config: &BuildConfig,
    runner: &ScriptedRunner,
) -> (Vec<(String, Rendered)>, texfeed_build::BuildOutcome) {
    let mut seen = Vec::new();
    let outcome = run_build(plan, config, runner, &mut |raw: &str, rendered: &Rendered| {
        seen.push((raw.to_string(), rendered.clone()));
    })
    .unwrap();
    (seen, outcome)
}

#[test]
fn test_clean_build_is_dismissed() {
    let dir = tempfile::tempdir().unwrap();
    let config = BuildConfig::default();
    let plan = BuildPlan::new(&document(dir.path()), &config).unwrap();
    let runner = ScriptedRunner {
        stdout: vec![
            "This is pdfTeX, Version 3.141592653-2.6-1.40.25 (TeX Live 2023)",
            "(./main.tex",
            "(/usr/share/texmf/tex/latex/base/article.cls",
            "(/usr/share/texmf/tex/latex/base/size10.clo))",
            ")",
            "Output written on main.pdf (1 page, 1024 bytes).",
        ],
        success: true,
        writes_pdf: Some("%PDF-1.5"),
        ..ScriptedRunner::default()
    };

    let (seen, outcome) = collect(&plan, &config, &runner);
    assert_eq!(seen[0].1, Rendered::Verbatim, "banner is echoed");
    assert!(seen[1..].iter().all(|(_, rendered)| *rendered == Rendered::Empty));
    assert_eq!(outcome.highest(), Severity::None);
    assert_eq!(outcome.disposition(config.warn_level), Disposition::Dismiss);
    assert!(outcome.pdf_updated);
    assert!(outcome.pdf.is_some());

    let invoked = runner.invoked.borrow();
    assert_eq!(invoked[0].engine, "pdflatex");
    assert_eq!(invoked[0].working_dir, dir.path());
}

#[test]
fn test_warnings_above_threshold_are_shown() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = BuildConfig::default();
    config.warn_level = 1;
    let plan = BuildPlan::new(&document(dir.path()), &config).unwrap();
    let runner = ScriptedRunner {
        stdout: vec![
            "This is XeTeX, Version 3.141592653-2.6-0.999995",
            "(./main.tex",
            "Underfull \\hbox (badness 10000) in paragraph at lines 3--4",
            "LaTeX Warning: Citation `knuth84' on page 1 undefined on input line 9.",
            ")",
        ],
        success: true,
        ..ScriptedRunner::default()
    };

    let (seen, outcome) = collect(&plan, &config, &runner);
    let html: Vec<_> = seen
        .iter()
        .filter_map(|(_, rendered)| match rendered {
            Rendered::Html(html) => Some(html.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(html.len(), 2);
    assert!(html[0].contains(">main.tex:3</a> Underfull"));
    assert!(html[1].contains(">main.tex:9</a> Citation"));
    assert_eq!(outcome.highest(), Severity::Warning);
    assert_eq!(outcome.disposition(config.warn_level), Disposition::Show);
    assert!(!outcome.pdf_updated);
}

#[test]
fn test_failed_build_echoes_error_context() {
    let dir = tempfile::tempdir().unwrap();
    let config = BuildConfig::default();
    let plan = BuildPlan::new(&document(dir.path()), &config).unwrap();
    let runner = ScriptedRunner {
        stdout: vec![
            "This is pdfTeX, Version 3.141592653",
            "(./main.tex",
            "! Undefined control sequence.",
            "<recently read> \\foo",
            "l.12 \\foo",
            ")",
        ],
        stderr: vec!["kpathsea: Running mktexfmt pdflatex.fmt"],
        success: false,
        ..ScriptedRunner::default()
    };

    let (seen, outcome) = collect(&plan, &config, &runner);
    assert!(matches!(seen[2].1, Rendered::Html(_)));
    assert_eq!(seen[3].1, Rendered::Verbatim);
    assert!(matches!(&seen[4].1, Rendered::Html(html) if html.contains(">main.tex:12</a> \\foo")));
    assert_eq!(seen[6], ("kpathsea: Running mktexfmt pdflatex.fmt".to_string(), Rendered::Empty));
    assert_eq!(outcome.disposition(2), Disposition::Show);
}

#[test]
fn test_strict_tracking_degrades_to_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = BuildConfig::default();
    config.policy = TrackingPolicy::Strict;
    let plan = BuildPlan::new(&document(dir.path()), &config).unwrap();
    let runner = ScriptedRunner {
        stdout: vec!["This is pdfTeX", ")", "LaTeX Warning: ignored after the fault"],
        success: true,
        ..ScriptedRunner::default()
    };

    let (seen, outcome) = collect(&plan, &config, &runner);
    assert_eq!(seen.len(), 3);
    assert!(seen.iter().all(|(_, rendered)| *rendered == Rendered::Verbatim));
    assert!(outcome.degraded.is_some());
    assert_eq!(outcome.highest(), Severity::None);
}

#[test]
fn test_debug_mode_is_raw() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = BuildConfig::default();
    config.debug = true;
    let plan = BuildPlan::new(&document(dir.path()), &config).unwrap();
    let runner = ScriptedRunner {
        stdout: vec![
            "This is pdfTeX",
            "(./main.tex",
            "Overfull \\hbox (1pt too wide) in paragraph at lines 1--2",
        ],
        success: true,
        ..ScriptedRunner::default()
    };

    let (seen, outcome) = collect(&plan, &config, &runner);
    assert!(seen.iter().all(|(_, rendered)| *rendered == Rendered::Verbatim));
    assert_eq!(outcome.highest(), Severity::None);
}
