//! Persisting the rendered document and handing it to a previewer.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{info, warn};

use crate::error::{Error, Result};

/// Truncate-and-overwrite `path` with `document`, flushing before returning.
pub fn write_report(document: &str, path: &Path) -> Result<()> {
    let wrap = |source: std::io::Error| Error::OutputWrite {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(wrap)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(document.as_bytes()).map_err(wrap)?;
    writer.flush().map_err(wrap)?;

    info!(path = %path.display(), bytes = document.len(), "report written");
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewOutcome {
    /// The previewer exited on its own.
    Finished,
    /// Ctrl-C while the previewer was running; it was stopped.
    Interrupted,
}

/// Run `<command> <path> -b` and wait for it, or for Ctrl-C.
///
/// An interrupt is a normal way to leave the preview. Spawn failures and
/// unsuccessful exits are returned as [`Error::Preview`].
pub async fn preview(command: &str, path: &Path) -> Result<PreviewOutcome> {
    let failed = |message: String| Error::Preview {
        command: command.to_string(),
        message,
    };

    let mut child = Command::new(command)
        .arg(path)
        .arg("-b")
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| failed(e.to_string()))?;

    tokio::select! {
        status = child.wait() => {
            let status = status.map_err(|e| failed(e.to_string()))?;
            if status.success() {
                Ok(PreviewOutcome::Finished)
            } else {
                Err(failed(format!("exited with {status}")))
            }
        }
        _ = tokio::signal::ctrl_c() => {
            if let Err(e) = child.kill().await {
                warn!(error = %e, "could not stop preview");
            }
            Ok(PreviewOutcome::Interrupted)
        }
    }
}
