use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// Failure talking to a classifier. The advisor logs these and falls back to
/// heuristic results; callers never see them from its public methods.
#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("starting classifier command {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("classifier io: {0}")]
    Io(#[from] std::io::Error),

    #[error("classifier exited with {status}: {stderr}")]
    CommandFailed { status: ExitStatus, stderr: String },

    #[error("classifier timed out after {0:?}")]
    Timeout(Duration),
}
