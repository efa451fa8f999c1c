use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Transport failure for a single URL.
    #[error("network error requesting {url}: {message}")]
    Network { url: String, message: String },

    /// The remote answered with a non-2xx status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Body was not JSON, or JSON of an unexpected shape.
    #[error("malformed response from {url}: {message}")]
    MalformedResponse { url: String, message: String },

    /// No `traffic` segment preceded by owner/name was found.
    #[error("cannot derive repository from URL {url}")]
    MalformedUrl { url: String },

    #[error("failed to write report to {}: {source}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("preview command `{command}` failed: {message}")]
    Preview { command: String, message: String },
}

impl Error {
    /// Per-URL failures that leave a metric slot empty instead of aborting the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::Status { .. } | Self::MalformedResponse { .. }
        )
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::Config(err.to_string())
    }
}
