use anyhow::{Context, Result, anyhow};
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Which stream of the engine a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// A fully resolved engine invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compiler {
    pub engine: String, // e.g., "pdflatex", "xelatex"
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl Compiler {
    pub fn new(engine: &str, working_dir: PathBuf) -> Self {
        Self {
            engine: engine.to_string(),
            args: Vec::new(),
            working_dir,
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}

/// Runs an engine and hands its output over line by line.
///
/// Implementations must call `on_line` in output order and stop reading as
/// soon as it fails. Returns whether the engine exited successfully.
pub trait CommandRunner: std::fmt::Debug {
    fn run(
        &self,
        compiler: &Compiler,
        on_line: &mut dyn FnMut(&str, Stream) -> Result<()>,
    ) -> Result<bool>;
}

/// [`CommandRunner`] backed by `std::process::Command`.
///
/// Stdout is streamed as the engine writes it. Stderr is drained on a helper
/// thread so a chatty engine cannot block on a full pipe, and is delivered
/// after stdout closes.
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(
        &self,
        compiler: &Compiler,
        on_line: &mut dyn FnMut(&str, Stream) -> Result<()>,
    ) -> Result<bool> {
        let program = which::which(&compiler.engine)
            .with_context(|| format!("`{}` was not found on PATH", compiler.engine))?;
        log::info!(
            "Running {} {:?} in {}",
            program.display(),
            compiler.args,
            compiler.working_dir.display()
        );

        let mut child = Command::new(&program)
            .args(&compiler.args)
            .current_dir(&compiler.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to spawn {}", compiler.engine))?;

        let stdout = child.stdout.take().context("engine stdout was not captured")?;
        let mut stderr = child.stderr.take().context("engine stderr was not captured")?;
        let stderr_reader = std::thread::spawn(move || {
            let mut buf = Vec::new();
            stderr.read_to_end(&mut buf).map(|_| buf)
        });

        // TeX output is not guaranteed to be UTF-8.
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .context("Failed to read engine output")?;
            if read == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            if let Err(err) = on_line(line.trim_end_matches(['\n', '\r']), Stream::Stdout) {
                let _ = child.kill();
                let _ = child.wait();
                return Err(err);
            }
        }

        let stderr = stderr_reader
            .join()
            .map_err(|_| anyhow!("stderr reader panicked"))?
            .context("Failed to read engine stderr")?;
        for line in String::from_utf8_lossy(&stderr).lines() {
            on_line(line, Stream::Stderr)?;
        }

        let status = child.wait().context("Failed to wait for engine")?;
        log::info!("{} exited with {}", compiler.engine, status);
        Ok(status.success())
    }
}
