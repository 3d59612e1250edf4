//! Spawn the tool, merge stdout and stderr into one line stream, and wait.

use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::RunError;
use crate::progress::OutputLog;

/// Runs `program args...`, calling `on_line` for every line printed on
/// either stream. Returns the full output on exit status zero.
///
/// The tool runs in its own process group (on unix) so that cancelling
/// `cancel` kills it together with any helper it started (an `ffmpeg`
/// merge, say), then returns [`RunError::Cancelled`] without waiting for
/// the output pipes to drain.
pub(crate) async fn run_streaming<F>(
    program: &Path,
    args: &[String],
    cancel: &CancellationToken,
    mut on_line: F,
) -> Result<OutputLog, RunError>
where
    F: FnMut(&str),
{
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);
    let mut child = command
        .spawn()
        .map_err(|source| RunError::Spawn {
            program: program.to_path_buf(),
            source,
        })?;

    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
    let mut readers = JoinSet::new();
    if let Some(stdout) = child.stdout.take() {
        readers.spawn(forward_lines(stdout, line_tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.spawn(forward_lines(stderr, line_tx.clone()));
    }
    drop(line_tx);

    let mut log = OutputLog::default();
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                terminate(&mut child).await;
                readers.abort_all();
                while let Ok(line) = line_rx.try_recv() {
                    log.push(&line);
                }
                return Err(RunError::Cancelled { output: log.into_string() });
            }
            line = line_rx.recv() => match line {
                Some(line) => {
                    tracing::trace!(target: "vidfetch::ytdlp", "{}", line);
                    log.push(&line);
                    on_line(&line);
                }
                None => break,
            },
        }
    }

    let status = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            terminate(&mut child).await;
            return Err(RunError::Cancelled { output: log.into_string() });
        }
        status = child.wait() => status?,
    };

    if status.success() {
        Ok(log)
    } else {
        Err(RunError::Exited {
            status,
            output: log.into_string(),
        })
    }
}

/// Kills the child's process group, then the child itself, and reaps it.
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // The child leads its own group (`process_group(0)`), so its pid is the group id.
        let r = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
        if r != 0 {
            tracing::debug!(pid, error = %std::io::Error::last_os_error(), "killpg failed");
        }
    }
    if let Err(e) = child.kill().await {
        tracing::warn!("failed to kill yt-dlp: {}", e);
    }
}

/// Reads `reader` line by line (lossy UTF-8, trailing `\r` trimmed) into `tx`.
async fn forward_lines<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut segments = BufReader::new(reader).split(b'\n');
    loop {
        match segments.next_segment().await {
            Ok(Some(bytes)) => {
                let line = String::from_utf8_lossy(&bytes);
                if tx.send(line.trim_end_matches('\r').to_string()).is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!("output pipe read failed: {}", e);
                break;
            }
        }
    }
}
