//! Shell command execution with a hard timeout and bounded output.
//!
//! The [`CommandRunner`] trait decouples the gate from real process spawning.
//! Tests use scripted runners that record requests without running anything.

use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// Parameters for one command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    /// Raw command line, run through the platform shell.
    pub command: String,
    pub workdir: PathBuf,
    pub timeout: Duration,
    /// Bytes of stdout/stderr kept in memory; the rest is drained and dropped.
    pub output_limit_bytes: usize,
}

/// Captured child process output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal (including on timeout).
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    pub fn stdout_text(&self) -> String {
        with_notice(&self.stdout, self.stdout_truncated, "stdout")
    }

    pub fn stderr_text(&self) -> String {
        with_notice(&self.stderr, self.stderr_truncated, "stderr")
    }
}

fn with_notice(bytes: &[u8], truncated: usize, label: &str) -> String {
    let mut text = String::from_utf8_lossy(bytes).into_owned();
    if truncated > 0 {
        text.push_str(&format!("\n[{label} truncated {truncated} bytes]\n"));
    }
    text
}

/// Abstraction over command execution backends.
pub trait CommandRunner {
    fn run(&self, request: &CommandRequest) -> Result<CommandOutput>;
}

/// Runs commands through `sh -c` (`cmd /C` on Windows).
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&self, request: &CommandRequest) -> Result<CommandOutput> {
        let mut cmd = shell_command(&request.command);
        cmd.current_dir(&request.workdir);
        run_command_with_timeout(cmd, request.timeout, request.output_limit_bytes)
    }
}

#[cfg(not(windows))]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

/// Run a command with a timeout and capture stdout/stderr without risking pipe deadlocks.
///
/// Output is read concurrently while the child runs. The child leads its own
/// process group; on timeout the whole group is killed and `timed_out` is set.
/// Output still held open by an escaped descendant after the kill is dropped.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs(), output_limit_bytes = output_limit_bytes))]
pub fn run_command_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    own_process_group(&mut cmd);

    debug!("spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).context("spawn command");
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let stdout_rx = spawn_reader(stdout, output_limit_bytes);
    let stderr_rx = spawn_reader(stderr, output_limit_bytes);

    let mut timed_out = false;
    let status = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => status,
        None => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "command timed out, killing"
            );
            timed_out = true;
            kill_process_group(&mut child)?;
            child.wait().context("wait command after kill")?
        }
    };

    let grace = timed_out.then_some(KILL_GRACE);
    let (stdout, stdout_truncated) = collect_output(&stdout_rx, grace).context("join stdout")?;
    let (stderr, stderr_truncated) = collect_output(&stderr_rx, grace).context("join stderr")?;

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        exit_code: status.code(),
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
        timed_out,
    })
}

/// How long readers may keep draining after a timeout kill.
const KILL_GRACE: Duration = Duration::from_secs(1);

type ReaderResult = Result<(Vec<u8>, usize)>;

#[cfg(unix)]
fn own_process_group(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn own_process_group(_cmd: &mut Command) {}

/// Kill the child and every process in its group.
fn kill_process_group(child: &mut Child) -> Result<()> {
    #[cfg(unix)]
    {
        let group = format!("-{}", child.id());
        let killed = Command::new("kill")
            .args(["-s", "KILL", "--", group.as_str()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match killed {
            Ok(status) if status.success() => {}
            Ok(status) => warn!(%status, "process group kill failed, killing child only"),
            Err(err) => warn!(err = %err, "process group kill failed, killing child only"),
        }
    }
    child.kill().context("kill command")
}

fn spawn_reader<R: Read + Send + 'static>(reader: R, limit: usize) -> Receiver<ReaderResult> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(read_stream_limited(reader, limit));
    });
    rx
}

/// Wait for a reader; with `grace`, give up after it and return no output.
fn collect_output(rx: &Receiver<ReaderResult>, grace: Option<Duration>) -> ReaderResult {
    let Some(grace) = grace else {
        return rx
            .recv()
            .map_err(|_| anyhow!("output reader thread panicked"))?;
    };
    match rx.recv_timeout(grace) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            warn!("output pipe still open after kill, dropping it");
            Ok((Vec::new(), 0))
        }
        Err(RecvTimeoutError::Disconnected) => Err(anyhow!("output reader thread panicked")),
    }
}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((buf, truncated))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn request(command: &str, timeout: Duration, limit: usize) -> CommandRequest {
        CommandRequest {
            command: command.to_string(),
            workdir: std::env::temp_dir(),
            timeout,
            output_limit_bytes: limit,
        }
    }

    #[test]
    fn captures_stdout_and_exit_code() {
        let output = ShellRunner
            .run(&request("echo hello", Duration::from_secs(5), 1000))
            .expect("run");
        assert!(output.success());
        assert_eq!(output.exit_code, Some(0));
        assert_eq!(output.stdout_text(), "hello\n");
    }

    #[test]
    fn captures_stderr_on_failure() {
        let output = ShellRunner
            .run(&request("echo oops >&2; exit 3", Duration::from_secs(5), 1000))
            .expect("run");
        assert!(!output.success());
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stderr_text(), "oops\n");
    }

    #[test]
    fn kills_on_timeout() {
        let output = ShellRunner
            .run(&request("exec sleep 2", Duration::from_millis(200), 1000))
            .expect("run");
        assert!(output.timed_out);
        assert!(!output.success());
    }

    #[test]
    fn timeout_kills_forked_descendants() {
        let started = std::time::Instant::now();
        let output = ShellRunner
            .run(&request(
                "sleep 5; echo done",
                Duration::from_millis(300),
                1000,
            ))
            .expect("run");
        let elapsed = started.elapsed();
        assert!(output.timed_out);
        assert!(!output.success());
        assert!(elapsed < Duration::from_secs(3), "took {elapsed:?}");
        assert!(!output.stdout_text().contains("done"));
    }

    #[test]
    fn timeout_kills_pipelines() {
        let started = std::time::Instant::now();
        let output = ShellRunner
            .run(&request(
                "sleep 5 | cat && echo done",
                Duration::from_millis(300),
                1000,
            ))
            .expect("run");
        assert!(output.timed_out);
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn truncates_large_output() {
        let output = ShellRunner
            .run(&request("printf '0123456789'", Duration::from_secs(5), 4))
            .expect("run");
        assert_eq!(output.stdout, b"0123");
        assert_eq!(output.stdout_truncated, 6);
        assert!(output.stdout_text().contains("[stdout truncated 6 bytes]"));
    }
}
