//! Chat source supervisor with capped exponential backoff.
//!
//! Keeps the chat source alive under transient failure. Every exit of the
//! child counts as a failure (the source is expected to run until stopped).
//! Restart delays double from `initial_delay` up to `max_delay`; the
//! failure counter resets once a child stays up for `stable_after`. After
//! `max_attempts` consecutive failures the supervisor gives up and reports
//! [`SourceState::Failed`].

use std::sync::Arc;
use std::time::Duration;

use tokio::process::Child;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

use crate::config::SourceConfig;
use crate::models::status::SourceState;
use crate::pipeline::state::PipelineState;
use crate::source::reader::run_reader;
use crate::source::spawner::{spawn_source, SourceProcess, SourceTarget};

/// Time allowed for a terminated child to exit before it is killed.
const TERMINATE_GRACE: Duration = Duration::from_secs(2);

/// Time allowed for readers to drain buffered output after the child exits.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Restart timing and budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartPolicy {
    /// Delay after the first failure.
    pub initial_delay: Duration,
    /// Cap on the delay.
    pub max_delay: Duration,
    /// Consecutive failures before giving up; 0 means unlimited.
    pub max_attempts: u32,
    /// Uptime after which the failure counter resets.
    pub stable_after: Duration,
}

impl RestartPolicy {
    /// Delay before restart number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.initial_delay
            .checked_mul(1u32 << exponent)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Whether `failures` consecutive failures exhaust the budget.
    #[must_use]
    pub fn exhausted(&self, failures: u32) -> bool {
        self.max_attempts > 0 && failures >= self.max_attempts
    }
}

impl From<&SourceConfig> for RestartPolicy {
    fn from(config: &SourceConfig) -> Self {
        Self {
            initial_delay: config.initial_delay(),
            max_delay: config.max_delay(),
            max_attempts: config.max_attempts,
            stable_after: config.stable_after(),
        }
    }
}

/// Handle to a running supervisor.
#[derive(Debug)]
pub struct SupervisorHandle {
    target: SourceTarget,
    cancel: CancellationToken,
    join: JoinHandle<()>,
    state_rx: watch::Receiver<SourceState>,
}

impl SupervisorHandle {
    /// Token being monitored.
    #[must_use]
    pub fn target(&self) -> &SourceTarget {
        &self.target
    }

    /// Current subprocess state.
    #[must_use]
    pub fn source_state(&self) -> SourceState {
        self.state_rx.borrow().clone()
    }

    /// Subscribe to subprocess state changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<SourceState> {
        self.state_rx.clone()
    }

    /// Stop the supervisor and terminate the child; waits for both.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(err) = self.join.await {
            warn!(%err, "source supervisor task ended abnormally");
        }
    }
}

/// Start supervising the chat source for `target`.
///
/// `parent` cancels the supervisor along with the rest of the server.
#[must_use]
pub fn spawn_supervisor(
    config: SourceConfig,
    target: SourceTarget,
    state: Arc<PipelineState>,
    parent: &CancellationToken,
) -> SupervisorHandle {
    let cancel = parent.child_token();
    let (state_tx, state_rx) = watch::channel(SourceState::Starting);
    let policy = RestartPolicy::from(&config);

    let span = info_span!("source_supervisor", token = %target.token_address);
    let join = tokio::spawn(
        supervise(config, target.clone(), policy, state, state_tx, cancel.clone()).instrument(span),
    );

    SupervisorHandle {
        target,
        cancel,
        join,
        state_rx,
    }
}

async fn supervise(
    config: SourceConfig,
    target: SourceTarget,
    policy: RestartPolicy,
    state: Arc<PipelineState>,
    state_tx: watch::Sender<SourceState>,
    cancel: CancellationToken,
) {
    let mut failures: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            break;
        }

        state_tx.send_replace(SourceState::Starting);
        let reason = match spawn_source(&config, &target) {
            Ok(process) => {
                state_tx.send_replace(SourceState::Running {
                    pid: process.child.id(),
                });
                let started = Instant::now();

                let Some(reason) = run_until_exit(process, &state, &cancel).await else {
                    break;
                };

                if started.elapsed() >= policy.stable_after {
                    failures = 0;
                }
                reason
            }
            Err(err) => err.to_string(),
        };

        failures = failures.saturating_add(1);
        warn!(failures, %reason, "chat source exited unexpectedly");

        if policy.exhausted(failures) {
            error!(failures, %reason, "chat source restart budget exhausted; giving up");
            state_tx.send_replace(SourceState::Failed { reason });
            return;
        }

        let delay = policy.delay_for(failures);
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        state_tx.send_replace(SourceState::Backoff {
            attempt: failures,
            delay_ms,
        });
        info!(delay_ms, "restarting chat source after delay");

        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
    }

    state_tx.send_replace(SourceState::Stopped);
    info!("source supervisor stopped");
}

/// Pump both output streams into the pipeline until the child exits.
///
/// Returns the exit description, or `None` if stopped by cancellation.
async fn run_until_exit(
    process: SourceProcess,
    state: &Arc<PipelineState>,
    cancel: &CancellationToken,
) -> Option<String> {
    let SourceProcess {
        mut child,
        stdout,
        stderr,
    } = process;

    let readers_cancel = cancel.child_token();
    let stdout_task = tokio::spawn(run_reader(
        "stdout",
        stdout,
        Arc::clone(state),
        readers_cancel.clone(),
    ));
    let stderr_task = tokio::spawn(run_reader(
        "stderr",
        stderr,
        Arc::clone(state),
        readers_cancel.clone(),
    ));

    let exit = tokio::select! {
        result = child.wait() => Some(match result {
            Ok(status) => status.code().map_or_else(
                || "process terminated by signal".to_owned(),
                |code| format!("process exited with code {code}"),
            ),
            Err(err) => format!("wait error: {err}"),
        }),
        () = cancel.cancelled() => {
            terminate(&mut child).await;
            None
        }
    };

    // Let readers drain what the child wrote before exiting.
    let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
        let _ = tokio::join!(stdout_task, stderr_task);
    })
    .await;
    if drained.is_err() {
        readers_cancel.cancel();
    }

    exit
}

/// Ask the child to exit, then kill it after [`TERMINATE_GRACE`].
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = child.id().and_then(|pid| i32::try_from(pid).ok()) {
            if let Err(err) = kill(Pid::from_raw(pid), Signal::SIGTERM) {
                warn!(pid, %err, "failed to send SIGTERM to chat source");
            } else if tokio::time::timeout(TERMINATE_GRACE, child.wait())
                .await
                .is_ok()
            {
                info!(pid, "chat source terminated");
                return;
            }
        }
    }

    if let Err(err) = child.kill().await {
        warn!(%err, "failed to kill chat source");
    } else {
        info!("chat source killed");
    }
}
