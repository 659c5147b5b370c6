use std::{
    io,
    process::{ExitStatus, Stdio},
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::RwLock;
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::{Child, Command},
    sync::{Notify, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use super::status::{ScanState, ScanStatus};

/// Grace period between the termination signal and a hard kill.
const TERMINATE_GRACE: Duration = Duration::from_secs(5);
/// Upper bound on waiting for output pipes to close once the child is gone.
/// A grandchild holding the pipe open must not keep the run non-terminal.
const DRAIN_GRACE: Duration = Duration::from_secs(2);
const READ_CHUNK: usize = 8 * 1024;
/// Longest a stopped run can take to record its outcome, with slack for the
/// final reap.
pub(crate) const EXIT_SETTLE: Duration =
    TERMINATE_GRACE.saturating_add(DRAIN_GRACE).saturating_add(
        Duration::from_secs(1),
    );

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunOutcome {
    Exited(Option<i32>),
    Killed,
    TimedOut,
    LaunchFailed,
}

#[derive(Debug, Clone, Copy)]
enum OutputStream {
    Stdout,
    Stderr,
}

/// Output and outcome share one lock so a reader never sees a terminal
/// outcome paired with partially drained buffers.
#[derive(Debug, Default)]
struct RunRecord {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    stop_requested: bool,
    outcome: Option<RunOutcome>,
}

enum Trigger {
    Exited(io::Result<ExitStatus>),
    Stop,
    Timeout,
}

/// One launch of the reporter executable.
///
/// Kept after the process ends so its final status and output stay readable
/// until the next launch replaces it.
#[derive(Debug)]
pub(crate) struct RescanRun {
    record: RwLock<RunRecord>,
    stop: Notify,
    finished: watch::Sender<bool>,
    started_at: Instant,
}

impl RescanRun {
    fn new() -> Self {
        let (finished, _) = watch::channel(false);
        Self {
            record: RwLock::new(RunRecord::default()),
            stop: Notify::new(),
            finished,
            started_at: Instant::now(),
        }
    }

    /// Spawn `program` and start supervising it. Spawn errors are recorded on
    /// the returned run rather than returned.
    pub(crate) fn launch(
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Arc<Self> {
        let run = Arc::new(Self::new());

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(err) => {
                warn!(program, error = %err, "failed to launch rescan");
                run.append(
                    OutputStream::Stderr,
                    format!("failed to launch {program}: {err}\n").as_bytes(),
                );
                run.finish(RunOutcome::LaunchFailed);
                return run;
            }
        };

        info!(
            program,
            pid = child.id(),
            timeout = %humantime::format_duration(timeout),
            "rescan started"
        );

        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(pump(
                Arc::clone(&run),
                OutputStream::Stdout,
                stdout,
            )));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(pump(
                Arc::clone(&run),
                OutputStream::Stderr,
                stderr,
            )));
        }

        tokio::spawn(supervise(Arc::clone(&run), child, readers, timeout));
        run
    }

    pub(crate) fn is_running(&self) -> bool {
        let record = self.record.read();
        record.outcome.is_none() && !record.stop_requested
    }

    /// True once the outcome is recorded and the child has been reaped.
    pub(crate) fn is_finished(&self) -> bool {
        self.record.read().outcome.is_some()
    }

    pub(crate) fn state(&self) -> ScanState {
        state_of(&self.record.read())
    }

    pub(crate) fn snapshot(&self) -> ScanStatus {
        let record = self.record.read();
        ScanStatus::from_buffers(
            state_of(&record),
            &record.stdout,
            &record.stderr,
        )
    }

    /// Flag the run as killed and wake the supervising task. Returns false
    /// when the run had already ended or was already being stopped.
    pub(crate) fn request_stop(&self) -> bool {
        {
            let mut record = self.record.write();
            if record.outcome.is_some() || record.stop_requested {
                return false;
            }
            record.stop_requested = true;
        }
        self.stop.notify_one();
        true
    }

    /// Resolves once the outcome has been recorded.
    pub(crate) async fn wait_finished(&self) {
        let mut finished = self.finished.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = finished.wait_for(|done| *done).await;
    }

    fn append(&self, stream: OutputStream, chunk: &[u8]) {
        let mut record = self.record.write();
        match stream {
            OutputStream::Stdout => record.stdout.extend_from_slice(chunk),
            OutputStream::Stderr => record.stderr.extend_from_slice(chunk),
        }
    }

    fn finish(&self, outcome: RunOutcome) {
        self.record.write().outcome = Some(outcome);
        self.finished.send_replace(true);
    }
}

fn state_of(record: &RunRecord) -> ScanState {
    match record.outcome {
        _ if record.stop_requested => ScanState::Error,
        None => ScanState::Running,
        Some(RunOutcome::Exited(Some(0))) => ScanState::Success,
        Some(_) => ScanState::Error,
    }
}

async fn pump<R>(run: Arc<RescanRun>, stream: OutputStream, mut reader: R)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => run.append(stream, &buf[..n]),
            Err(err) => {
                warn!(?stream, error = %err, "rescan output read failed");
                break;
            }
        }
    }
}

async fn supervise(
    run: Arc<RescanRun>,
    mut child: Child,
    readers: Vec<JoinHandle<()>>,
    timeout: Duration,
) {
    let trigger = tokio::select! {
        status = child.wait() => Trigger::Exited(status),
        _ = run.stop.notified() => Trigger::Stop,
        _ = tokio::time::sleep(timeout) => Trigger::Timeout,
    };

    let outcome = match trigger {
        Trigger::Exited(Ok(status)) => RunOutcome::Exited(status.code()),
        Trigger::Exited(Err(err)) => {
            warn!(error = %err, "failed to wait for rescan");
            run.append(
                OutputStream::Stderr,
                format!("failed to wait for rescan: {err}\n").as_bytes(),
            );
            RunOutcome::Exited(None)
        }
        Trigger::Stop => {
            info!("rescan stop requested");
            terminate(&mut child).await;
            RunOutcome::Killed
        }
        Trigger::Timeout => {
            let limit = humantime::format_duration(timeout);
            warn!(timeout = %limit, "rescan timed out");
            run.append(
                OutputStream::Stderr,
                format!("rescan timed out after {limit}\n").as_bytes(),
            );
            terminate(&mut child).await;
            RunOutcome::TimedOut
        }
    };

    for reader in readers {
        let abort = reader.abort_handle();
        if tokio::time::timeout(DRAIN_GRACE, reader).await.is_err() {
            debug!("rescan output still open after exit; detaching reader");
            abort.abort();
        }
    }

    info!(
        ?outcome,
        elapsed = %humantime::format_duration(run.started_at.elapsed()),
        "rescan finished"
    );
    run.finish(outcome);
}

/// Ask the child to exit, escalating to a hard kill after [`TERMINATE_GRACE`].
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            Ok(()) => {
                if tokio::time::timeout(TERMINATE_GRACE, child.wait())
                    .await
                    .is_ok()
                {
                    return;
                }
                warn!(pid, "rescan ignored SIGTERM; killing");
            }
            Err(err) => warn!(pid, error = %err, "failed to signal rescan"),
        }
    }

    if let Err(err) = child.start_kill() {
        warn!(error = %err, "failed to kill rescan");
    }
    if let Err(err) = child.wait().await {
        warn!(error = %err, "failed to reap rescan");
    }
}
