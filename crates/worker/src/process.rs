//! Child-process implementation of [`Worker`].
//!
//! [`ProcessWorker`] spawns the configured scraper program, pipes the
//! [`MonitorConfig`] to its stdin as one JSON line, and forwards every
//! stdout/stderr line to the run's [`LogSink`]. Runs are tagged with a
//! generation so that a run finishing after `stop` cannot clear the state
//! of a newer run. [`ProcessWorker::shutdown`] waits for every run to tear
//! down, so the final lines of a run reach the sink before the process exits.

use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use hirewatch_core::log_entry::LogSink;
use hirewatch_core::monitor::MonitorConfig;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;
use crate::handle::Worker;

/// Default wait for output readers after the child has exited.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Program, arguments and environment of the scraper process.
#[derive(Debug, Clone)]
pub struct WorkerCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory for the child process (uses current dir if `None`).
    pub working_directory: Option<String>,
    /// Additional environment variables set for the child process.
    pub env_vars: Vec<(String, String)>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            working_directory: None,
            env_vars: Vec::new(),
        }
    }
}

struct ActiveRun {
    generation: u64,
    cancel: CancellationToken,
}

type RunSlot = Arc<Mutex<Option<ActiveRun>>>;

/// Runs the scraper as a child process, one run at a time.
pub struct ProcessWorker {
    command: WorkerCommand,
    active: RunSlot,
    /// Supervisor tasks of runs that may still be tearing down.
    supervisors: Mutex<Vec<JoinHandle<()>>>,
    next_generation: AtomicU64,
    drain_timeout: Duration,
}

impl ProcessWorker {
    pub fn new(command: WorkerCommand) -> Self {
        Self {
            command,
            active: Arc::new(Mutex::new(None)),
            supervisors: Mutex::new(Vec::new()),
            next_generation: AtomicU64::new(1),
            drain_timeout: DRAIN_TIMEOUT,
        }
    }

    /// How long output readers may keep running after the child exits.
    ///
    /// A reader still open after this (a grandchild holding the pipe) is
    /// aborted.
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Stop the active run, if any, and wait for every run to finish
    /// tearing down.
    ///
    /// Returns `false` if some run was still busy after `timeout`; those
    /// runs are aborted, which kills their child.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        let active = lock(&self.active).take();
        if let Some(run) = active {
            tracing::debug!(generation = run.generation, "Stopping worker process for shutdown");
            run.cancel.cancel();
        }

        let supervisors = std::mem::take(&mut *lock_supervisors(&self.supervisors));
        let deadline = Instant::now() + timeout;
        let mut clean = true;
        for mut supervisor in supervisors {
            match tokio::time::timeout_at(deadline, &mut supervisor).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "Worker supervisor failed");
                    clean = false;
                }
                Err(_) => {
                    tracing::warn!("Worker run did not finish in time, aborting");
                    supervisor.abort();
                    clean = false;
                }
            }
        }
        clean
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        for (key, value) in &self.command.env_vars {
            cmd.env(key, value);
        }
        if let Some(dir) = &self.command.working_directory {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl Worker for ProcessWorker {
    fn start(&self, config: MonitorConfig, sink: Arc<dyn LogSink>) -> Result<(), WorkerError> {
        let mut active = lock(&self.active);
        if active.is_some() {
            return Err(WorkerError::AlreadyRunning);
        }

        let child = self.build_command().spawn().map_err(WorkerError::Spawn)?;
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();

        *active = Some(ActiveRun {
            generation,
            cancel: cancel.clone(),
        });
        drop(active);

        tracing::debug!(
            generation,
            program = %self.command.program,
            target_url = %config.target_url,
            "Worker process spawned",
        );

        let supervisor = tokio::spawn(supervise(
            child,
            config,
            sink,
            cancel,
            Arc::clone(&self.active),
            generation,
            self.drain_timeout,
        ));
        let mut supervisors = lock_supervisors(&self.supervisors);
        supervisors.retain(|s| !s.is_finished());
        supervisors.push(supervisor);
        Ok(())
    }

    fn stop(&self) -> Result<(), WorkerError> {
        let run = lock(&self.active).take().ok_or(WorkerError::NotRunning)?;
        tracing::debug!(generation = run.generation, "Stopping worker process");
        run.cancel.cancel();
        Ok(())
    }

    fn is_running(&self) -> bool {
        lock(&self.active).is_some()
    }
}

/// A poisoned slot only means a panic elsewhere; the `Option` is still valid.
fn lock(slot: &Mutex<Option<ActiveRun>>) -> MutexGuard<'_, Option<ActiveRun>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn lock_supervisors(
    supervisors: &Mutex<Vec<JoinHandle<()>>>,
) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
    supervisors
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

enum RunOutcome {
    Exited(std::io::Result<std::process::ExitStatus>),
    Stopped,
}

/// Drive one run from spawn to exit.
async fn supervise(
    mut child: Child,
    config: MonitorConfig,
    sink: Arc<dyn LogSink>,
    cancel: CancellationToken,
    active: RunSlot,
    generation: u64,
    drain_timeout: Duration,
) {
    // Config goes in as a single JSON line, then stdin is closed.
    if let Some(mut stdin) = child.stdin.take() {
        match serde_json::to_vec(&config) {
            Ok(mut bytes) => {
                bytes.push(b'\n');
                // Best-effort write; the process may not read stdin at all.
                let _ = stdin.write_all(&bytes).await;
            }
            Err(e) => sink.line(&format!("Failed to encode monitor config: {e}")),
        }
        drop(stdin);
    }

    // Announced before the readers exist, so no output line can precede it.
    sink.line(&format!(
        "Monitoring started for {} ({})",
        config.target_url,
        config.target_positions.join(", ")
    ));

    let readers: Vec<_> = [
        child
            .stdout
            .take()
            .map(|out| tokio::spawn(forward_lines(out, Arc::clone(&sink), None))),
        child
            .stderr
            .take()
            .map(|err| tokio::spawn(forward_lines(err, Arc::clone(&sink), Some("stderr")))),
    ]
    .into_iter()
    .flatten()
    .collect();

    let outcome = tokio::select! {
        status = child.wait() => RunOutcome::Exited(status),
        () = cancel.cancelled() => {
            if let Err(e) = child.kill().await {
                tracing::warn!(generation, error = %e, "Failed to kill worker process");
            }
            RunOutcome::Stopped
        }
    };

    for mut reader in readers {
        if tokio::time::timeout(drain_timeout, &mut reader).await.is_err() {
            tracing::warn!(generation, "Worker output reader did not finish, aborting");
            reader.abort();
        }
    }

    match outcome {
        RunOutcome::Exited(Ok(status)) if status.success() => {
            sink.line("Monitoring finished");
        }
        RunOutcome::Exited(Ok(status)) => {
            sink.line(&format!("Worker failed: process exited with {status}"));
        }
        RunOutcome::Exited(Err(e)) => {
            sink.line(&format!("Worker failed: {e}"));
        }
        RunOutcome::Stopped => {
            sink.line("Monitoring stopped");
        }
    }

    let mut slot = lock(&active);
    if slot.as_ref().map(|run| run.generation) == Some(generation) {
        *slot = None;
    }
    tracing::debug!(generation, "Worker run ended");
}

/// Forward each non-blank line of `reader` to `sink`.
async fn forward_lines<R>(reader: R, sink: Arc<dyn LogSink>, label: Option<&'static str>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim_end();
                if line.is_empty() {
                    continue;
                }
                match label {
                    Some(label) => sink.line(&format!("[{label}] {line}")),
                    None => sink.line(line),
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read worker output");
                break;
            }
        }
    }
}
