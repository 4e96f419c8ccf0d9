// makemkvcon rip process management
// Handles spawning the rip process, draining its output and stopping it on cancel

use crate::error::{Result, RipError};
use crate::makemkv::{decode_progress, message_text, parse_record, ProgressSample};
use log::{debug, warn};
use std::ffi::OsString;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, watch};

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x08000000;

#[derive(Debug, Clone, PartialEq)]
pub enum WorkerMessage {
    Progress(ProgressSample),
    /// Latest human-readable line: a MSG text, a non-record stdout line or a stderr line
    Diagnostic(String),
}

#[derive(Debug)]
pub enum WorkerExit {
    Exited(ExitStatus),
    /// Stopped because cancellation was signalled
    Cancelled,
}

/// Spawn the rip process from a prebuilt argv. No shell is involved.
pub fn spawn_rip_worker(args: &[OsString]) -> Result<Child> {
    let (program, rest) = args.split_first().ok_or_else(|| RipError::Spawn {
        program: String::new(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command line"),
    })?;

    let mut cmd = Command::new(program);
    cmd.args(rest)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(windows)]
    cmd.creation_flags(CREATE_NO_WINDOW);

    let child = cmd.spawn().map_err(|source| RipError::Spawn {
        program: program.to_string_lossy().to_string(),
        source,
    })?;

    debug!("Spawned rip process {:?}: {:?}", child.id(), args);
    Ok(child)
}

/// Turn one stdout line into a message for the job, if it carries anything
fn stdout_message(line: &str) -> Option<WorkerMessage> {
    if let Some(sample) = decode_progress(line) {
        return Some(WorkerMessage::Progress(sample));
    }
    if let Some(text) = message_text(line) {
        return Some(WorkerMessage::Diagnostic(text));
    }

    let trimmed = line.trim();
    if trimmed.is_empty() || parse_record(trimmed).is_some() {
        None
    } else {
        Some(WorkerMessage::Diagnostic(trimmed.to_string()))
    }
}

fn stderr_message(line: &str) -> Option<WorkerMessage> {
    let trimmed = line.trim();
    (!trimmed.is_empty()).then(|| WorkerMessage::Diagnostic(trimmed.to_string()))
}

/// Line reader over raw bytes. Invalid UTF-8 is replaced rather than
/// ending the stream. The buffer outlives each read so a read dropped by
/// `select!` loses nothing.
struct LineReader<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }

    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        let read = self.reader.read_until(b'\n', &mut self.buf).await?;
        if read == 0 && self.buf.is_empty() {
            return Ok(None);
        }

        let line = String::from_utf8_lossy(&self.buf)
            .trim_end_matches(['\r', '\n'])
            .to_string();
        self.buf.clear();
        Ok(Some(line))
    }
}

/// Next line from an open stream. A read error closes the stream so the
/// process gets EPIPE instead of blocking on a full pipe.
async fn next_line<R: AsyncBufRead + Unpin>(
    stream: &mut Option<LineReader<R>>,
    name: &str,
) -> Option<String> {
    let reader = stream.as_mut()?;
    match reader.next_line().await {
        Ok(line) => line,
        Err(e) => {
            warn!("Reading rip process {} failed: {}", name, e);
            *stream = None;
            None
        }
    }
}

/// Resolves once the cancel flag is set. Never resolves if the sender is gone.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(unix)]
fn request_stop(child: &mut Child) {
    if let Some(pid) = child.id() {
        // SAFETY: plain kill(2) on the pid of a child we have not reaped yet
        let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        if rc != 0 {
            warn!("SIGTERM to rip process {} failed: {}", pid, std::io::Error::last_os_error());
        }
    }
}

#[cfg(not(unix))]
fn request_stop(child: &mut Child) {
    let _ = child.start_kill();
}

/// Ask the process to stop, then force it after `grace`
async fn terminate(child: &mut Child, grace: Duration) -> std::io::Result<ExitStatus> {
    request_stop(child);

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(status) => status,
        Err(_) => {
            warn!(
                "Rip process {:?} still running {:?} after SIGTERM, killing",
                child.id(),
                grace
            );
            child.kill().await?;
            child.wait().await
        }
    }
}

/// Drain the process output until it exits or cancellation is signalled.
/// Messages are sent in the order the process wrote them on each stream.
pub async fn run_rip_worker(
    mut child: Child,
    mut cancel: watch::Receiver<bool>,
    grace: Duration,
    messages: mpsc::Sender<WorkerMessage>,
) -> std::io::Result<WorkerExit> {
    let mut stdout = child.stdout.take().map(|s| LineReader::new(BufReader::new(s)));
    let mut stderr = child.stderr.take().map(|s| LineReader::new(BufReader::new(s)));
    let mut stdout_open = stdout.is_some();
    let mut stderr_open = stderr.is_some();

    loop {
        let message = tokio::select! {
            biased;

            _ = cancelled(&mut cancel) => {
                let status = terminate(&mut child, grace).await?;
                debug!("Cancelled rip process ended with {}", status);
                return Ok(WorkerExit::Cancelled);
            }
            line = next_line(&mut stdout, "stdout"), if stdout_open => match line {
                Some(line) => stdout_message(&line),
                None => {
                    stdout_open = false;
                    None
                }
            },
            line = next_line(&mut stderr, "stderr"), if stderr_open => match line {
                Some(line) => stderr_message(&line),
                None => {
                    stderr_open = false;
                    None
                }
            },
            status = child.wait(), if !stdout_open && !stderr_open => {
                let status = status?;
                debug!("Rip process exited with {}", status);
                return Ok(WorkerExit::Exited(status));
            }
        };

        if let Some(message) = message {
            let _ = messages.send(message).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stdout_lines() {
        assert!(matches!(
            stdout_message("PRGV:0,250,1000"),
            Some(WorkerMessage::Progress(ProgressSample { percent: 25, .. }))
        ));
        assert_eq!(
            stdout_message(r#"MSG:5036,0,1,"Copy complete. 1 titles saved.","Copy complete. %1 titles saved.","1""#),
            Some(WorkerMessage::Diagnostic("Copy complete. 1 titles saved.".to_string()))
        );
        assert_eq!(stdout_message(r#"PRGT:5018,0,"Saving to MKV file""#), None);
        assert_eq!(stdout_message("   "), None);
        assert_eq!(
            stdout_message("libmmbd: unexpected failure"),
            Some(WorkerMessage::Diagnostic("libmmbd: unexpected failure".to_string()))
        );
    }

    #[test]
    fn test_stderr_lines() {
        assert_eq!(stderr_message(""), None);
        assert_eq!(
            stderr_message("permission denied\n"),
            Some(WorkerMessage::Diagnostic("permission denied".to_string()))
        );
    }

    #[tokio::test]
    async fn test_line_reader_replaces_invalid_utf8() {
        let mut reader = LineReader::new(&b"MSG:1,0,0,\"Vol \xe9t\xe9\"\r\nPRGV:0,900,1000\nlast"[..]);

        assert_eq!(
            reader.next_line().await.unwrap().as_deref(),
            Some("MSG:1,0,0,\"Vol \u{FFFD}t\u{FFFD}\"")
        );
        assert_eq!(
            reader.next_line().await.unwrap().as_deref(),
            Some("PRGV:0,900,1000")
        );
        assert_eq!(reader.next_line().await.unwrap().as_deref(), Some("last"));
        assert_eq!(reader.next_line().await.unwrap(), None);
    }

    #[test]
    fn test_empty_argv_is_spawn_error() {
        assert!(matches!(spawn_rip_worker(&[]), Err(RipError::Spawn { .. })));
    }
}
