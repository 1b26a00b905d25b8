use thiserror::Error;

/// Malformed compiler output detected while tracking open files.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    /// A `)` arrived while no file was open.
    #[error("closing parenthesis with no open file")]
    Underflow,
    /// The line after a wrapped path did not continue it in a recognisable way.
    #[error("cannot continue wrapped path `{fragment}` with {line:?}")]
    MalformedFragment { fragment: String, line: String },
}

/// Failure while turning one line of output into feedback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Tracker(#[from] TrackerError),
    /// Neither the tracker nor the configured default names a file.
    #[error("no current file to attribute `{message}` to")]
    MissingFile { message: String },
}
