use std::{
    fmt,
    path::{Path, PathBuf},
    process::Stdio,
    sync::Arc,
    time::Duration,
};

use krom_core::Platform;
use parking_lot::Mutex;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::Child,
    sync::watch,
};
use tokio_util::sync::CancellationToken;

use crate::{detach, ensure_executable, helper, ProcessError, SpawnRequest, SpawnStrategy};

const DEBUGGEE_TARGET: &str = "krom.debuggee";
const HELPER_LABEL: &str = "[krom_spawn_helper]";

/// How a supervised process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessExit {
    /// `code` is `None` when the process was killed by a signal.
    Exited { code: Option<i32> },
    /// Waiting on the process failed, or the spawn helper could not start
    /// the debuggee.
    Error(String),
}

impl fmt::Display for ProcessExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessExit::Exited { code: Some(code) } => write!(f, "exited with code {code}"),
            ProcessExit::Exited { code: None } => f.write_str("killed by a signal"),
            ProcessExit::Error(message) => f.write_str(message),
        }
    }
}

/// Called when the supervised debuggee ends on its own (not after
/// `terminate`/`release`).
pub type ExitHook = Arc<dyn Fn(&ProcessExit) + Send + Sync + 'static>;

/// A running (or recently running) debuggee.
///
/// Cheap to clone; clones observe the same process.
#[derive(Clone)]
pub struct ProcessHandle {
    id: u64,
    request: Arc<SpawnRequest>,
    child_pid: Option<u32>,
    pid: watch::Receiver<Option<u32>>,
    exit: watch::Receiver<Option<ProcessExit>>,
    kill: CancellationToken,
}

impl ProcessHandle {
    pub fn program(&self) -> &Path {
        &self.request.program
    }

    pub fn args(&self) -> &[String] {
        &self.request.args
    }

    pub fn cwd(&self) -> Option<&Path> {
        self.request.cwd.as_deref()
    }

    pub fn strategy(&self) -> &SpawnStrategy {
        &self.request.strategy
    }

    /// Pid of the process we spawned ourselves (the helper, when one is used).
    pub fn child_pid(&self) -> Option<u32> {
        self.child_pid
    }

    /// Pid of the debuggee, if known yet.
    ///
    /// Known immediately for direct spawns. With the helper strategy it stays
    /// `None` until the helper reports it.
    pub fn resolved_pid(&self) -> Option<u32> {
        *self.pid.borrow()
    }

    /// Wait up to `timeout` for the debuggee pid to be reported.
    pub async fn wait_for_pid(&self, timeout: Duration) -> Option<u32> {
        let mut rx = self.pid.clone();
        let pid = match tokio::time::timeout(timeout, rx.wait_for(Option::is_some)).await {
            Ok(Ok(pid)) => *pid,
            _ => self.resolved_pid(),
        };
        pid
    }

    /// How the process ended, once it has.
    pub fn exit_status(&self) -> Option<ProcessExit> {
        self.exit.borrow().clone()
    }

    /// Wait until the process ends.
    ///
    /// Returns `None` when the end cannot be observed: a debuggee started
    /// through the helper is not our child, so only a helper failure is
    /// reported for it.
    pub async fn wait_for_exit(&self) -> Option<ProcessExit> {
        let mut rx = self.exit.clone();
        let exit = match rx.wait_for(Option::is_some).await {
            Ok(exit) => exit.clone(),
            Err(_) => self.exit_status(),
        };
        exit
    }

    pub fn is_running(&self) -> bool {
        self.exit.borrow().is_none()
    }

    /// Forcefully kill the process we spawned ourselves.
    pub fn start_kill(&self) {
        self.kill.cancel();
    }
}

#[derive(Default)]
struct Slot {
    current: Option<ProcessHandle>,
    on_exit: Option<ExitHook>,
}

/// Owns the debuggee for one debug session.
///
/// The handle is cleared on `terminate`, on `release` and when the debuggee
/// exits by itself.
pub struct ProcessSupervisor {
    platform: Platform,
    next_id: u64,
    slot: Arc<Mutex<Slot>>,
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self::with_platform(Platform::current())
    }

    pub fn with_platform(platform: Platform) -> Self {
        Self {
            platform,
            next_id: 0,
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Pick the spawn strategy for a launch. The helper is only used on
    /// platforms that need it, when it can be found, and when the caller did
    /// not ask for a direct spawn.
    pub fn strategy_for(&self, force_direct: bool, helper: Option<PathBuf>) -> SpawnStrategy {
        match helper {
            Some(helper) if self.platform.uses_spawn_helper() && !force_direct => {
                SpawnStrategy::Helper { helper }
            }
            _ => SpawnStrategy::Direct,
        }
    }

    /// The current debuggee, if one is supervised.
    pub fn handle(&self) -> Option<ProcessHandle> {
        self.slot.lock().current.clone()
    }

    /// Install `hook`, replacing any previous one.
    pub fn on_exit<F>(&mut self, hook: F)
    where
        F: Fn(&ProcessExit) + Send + Sync + 'static,
    {
        self.slot.lock().on_exit = Some(Arc::new(hook));
    }

    /// Start the debuggee. Must be called from within a tokio runtime.
    ///
    /// A debuggee left over from an earlier start is terminated first.
    pub fn start(&mut self, request: SpawnRequest) -> Result<ProcessHandle, ProcessError> {
        if self.slot.lock().current.is_some() {
            tracing::debug!(target: "krom.process", "replacing previous debuggee");
            self.terminate();
        }

        ensure_executable(&request.program)?;
        if let SpawnStrategy::Helper { helper } = &request.strategy {
            ensure_executable(helper)?;
        }

        self.next_id += 1;
        let id = self.next_id;

        // Held until the handle is stored so a process that dies right away
        // cannot be reported before it is supervised.
        let mut slot = self.slot.lock();
        let handle = match request.strategy.clone() {
            SpawnStrategy::Direct => spawn_direct(id, request, &self.slot)?,
            SpawnStrategy::Helper { helper } => spawn_via_helper(id, &helper, request, &self.slot)?,
        };
        slot.current = Some(handle.clone());
        Ok(handle)
    }

    /// Kill the debuggee. Idempotent; failures are logged and dropped since
    /// the process may well have exited on its own already.
    ///
    /// With the helper strategy and a known pid the whole process tree is
    /// killed forcefully: a cooperative signal is not reliably delivered to a
    /// runtime that is stopped in the debugger.
    pub fn terminate(&mut self) {
        let Some(handle) = self.slot.lock().current.take() else {
            return;
        };

        match (handle.strategy().is_helper(), handle.resolved_pid()) {
            (true, Some(pid)) => {
                tracing::info!(target: "krom.process", pid, "killing Krom process tree");
                kill_tree(pid);
            }
            _ => {
                tracing::info!(target: "krom.process", "interrupting Krom process");
                interrupt(&handle);
            }
        }
    }

    /// Forget the debuggee without killing it.
    pub fn release(&mut self) {
        if let Some(handle) = self.slot.lock().current.take() {
            tracing::debug!(
                target: "krom.process",
                program = %handle.program().display(),
                "releasing debuggee handle"
            );
        }
    }
}

/// Record how process `id` ended. If `id` is still the supervised debuggee
/// the slot is cleared and the exit hook runs.
fn finish(
    slot: &Mutex<Slot>,
    id: u64,
    exit: ProcessExit,
    exit_tx: &watch::Sender<Option<ProcessExit>>,
) {
    let hook = {
        let mut slot = slot.lock();
        if slot.current.as_ref().is_some_and(|current| current.id == id) {
            slot.current = None;
            Some(slot.on_exit.clone())
        } else {
            None
        }
    };
    // Sent after the slot is cleared so waiters never see a finished
    // process still supervised.
    let _ = exit_tx.send(Some(exit.clone()));
    let Some(hook) = hook else {
        return;
    };

    tracing::info!(target: "krom.process", "Krom {exit}");
    if let Some(hook) = hook {
        hook(&exit);
    }
}

fn exit_of(status: std::io::Result<std::process::ExitStatus>) -> ProcessExit {
    match status {
        Ok(status) => ProcessExit::Exited {
            code: status.code(),
        },
        Err(err) => ProcessExit::Error(format!("failed to wait for Krom: {err}")),
    }
}

async fn wait_or_kill(
    child: &mut Child,
    kill: &CancellationToken,
) -> std::io::Result<std::process::ExitStatus> {
    tokio::select! {
        status = child.wait() => status,
        _ = kill.cancelled() => {
            if let Err(err) = child.start_kill() {
                tracing::debug!(target: "krom.process", error = %err, "failed to kill child");
            }
            child.wait().await
        }
    }
}

fn spawn_direct(
    id: u64,
    request: SpawnRequest,
    slot: &Arc<Mutex<Slot>>,
) -> Result<ProcessHandle, ProcessError> {
    tracing::info!(target: "krom.process", command = %request, "spawning Krom");

    let mut cmd = std::process::Command::new(&request.program);
    cmd.args(&request.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(cwd) = &request.cwd {
        cmd.current_dir(cwd);
    }
    if request.detached {
        detach(&mut cmd);
    }

    let mut child = tokio::process::Command::from(cmd)
        .spawn()
        .map_err(|source| ProcessError::SpawnFailed {
            command: request.to_string(),
            source,
        })?;

    if let Some(stdout) = child.stdout.take() {
        forward_lines(stdout, |line| tracing::info!(target: DEBUGGEE_TARGET, "{line}"));
    }
    if let Some(stderr) = child.stderr.take() {
        forward_lines(stderr, |line| tracing::warn!(target: DEBUGGEE_TARGET, "{line}"));
    }

    let child_pid = child.id();
    let (_, pid) = watch::channel(child_pid);
    let (exit_tx, exit) = watch::channel(None);
    let kill = CancellationToken::new();

    let monitor_slot = Arc::clone(slot);
    let monitor_kill = kill.clone();
    tokio::spawn(async move {
        let status = wait_or_kill(&mut child, &monitor_kill).await;
        finish(&monitor_slot, id, exit_of(status), &exit_tx);
    });

    Ok(ProcessHandle {
        id,
        request: Arc::new(request),
        child_pid,
        pid,
        exit,
        kill,
    })
}

fn spawn_via_helper(
    id: u64,
    helper_path: &Path,
    request: SpawnRequest,
    slot: &Arc<Mutex<Slot>>,
) -> Result<ProcessHandle, ProcessError> {
    tracing::info!(
        target: "krom.process",
        helper = %helper_path.display(),
        command = %request,
        "spawning Krom through helper"
    );

    // The helper detaches the debuggee itself and exits right after.
    let mut cmd = std::process::Command::new(helper_path);
    cmd.arg(&request.program)
        .args(&request.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(cwd) = &request.cwd {
        cmd.current_dir(cwd);
    }

    let mut child = tokio::process::Command::from(cmd)
        .spawn()
        .map_err(|source| ProcessError::SpawnFailed {
            command: format!("{} {request}", helper_path.display()),
            source,
        })?;

    let (pid_tx, pid) = watch::channel(None);
    if let Some(stdout) = child.stdout.take() {
        forward_lines(stdout, move |line| match helper::parse_pid_message(&line) {
            Some(pid) => {
                tracing::info!(target: "krom.process", pid, "got Krom pid");
                let _ = pid_tx.send(Some(pid));
            }
            None => tracing::info!(target: DEBUGGEE_TARGET, "{HELPER_LABEL} {line}"),
        });
    }
    if let Some(stderr) = child.stderr.take() {
        forward_lines(stderr, |line| {
            tracing::error!(target: DEBUGGEE_TARGET, "{HELPER_LABEL} {line}")
        });
    }

    let child_pid = child.id();
    let (exit_tx, exit) = watch::channel(None);
    let kill = CancellationToken::new();

    // The debuggee is not our child. Only a failing helper says anything
    // about it; a helper that exits cleanly leaves the exit unobserved.
    let monitor_slot = Arc::clone(slot);
    let monitor_kill = kill.clone();
    tokio::spawn(async move {
        match wait_or_kill(&mut child, &monitor_kill).await {
            Ok(status) if status.success() => {}
            Ok(status) => {
                let exit = ProcessExit::Error(format!("krom_spawn_helper failed: {status}"));
                finish(&monitor_slot, id, exit, &exit_tx);
            }
            Err(err) => {
                let exit = ProcessExit::Error(format!("failed to wait for krom_spawn_helper: {err}"));
                finish(&monitor_slot, id, exit, &exit_tx);
            }
        }
    });

    Ok(ProcessHandle {
        id,
        request: Arc::new(request),
        child_pid,
        pid,
        exit,
        kill,
    })
}

fn forward_lines<R, F>(reader: R, mut on_line: F)
where
    R: AsyncRead + Unpin + Send + 'static,
    F: FnMut(String) + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            on_line(line);
        }
    });
}

fn interrupt(handle: &ProcessHandle) {
    #[cfg(unix)]
    {
        let Some(pid) = handle.child_pid().filter(|_| handle.is_running()) else {
            tracing::debug!(target: "krom.process", "debuggee already exited");
            return;
        };
        // SAFETY: plain syscall on a pid we spawned and have not reaped yet.
        if unsafe { libc::kill(pid as libc::pid_t, libc::SIGINT) } != 0 {
            tracing::debug!(
                target: "krom.process",
                pid,
                error = %std::io::Error::last_os_error(),
                "failed to interrupt debuggee"
            );
        }
    }

    #[cfg(not(unix))]
    {
        handle.start_kill();
    }
}

fn kill_tree(pid: u32) {
    #[cfg(windows)]
    {
        // Synchronous on purpose: the adapter may itself be killed right after
        // disconnect, before an async kill would get to run.
        let result = std::process::Command::new("taskkill")
            .args(["/F", "/T", "/PID", &pid.to_string()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match result {
            Ok(status) if !status.success() => {
                tracing::debug!(target: "krom.process", pid, %status, "taskkill failed");
            }
            Err(err) => {
                tracing::debug!(target: "krom.process", pid, error = %err, "taskkill failed");
            }
            Ok(_) => {}
        }
    }

    #[cfg(unix)]
    {
        let pid = pid as libc::pid_t;
        // The helper starts the debuggee in a new session, so its pid is also
        // its process group id.
        // SAFETY: plain syscalls; failures are reported through errno.
        unsafe {
            if libc::kill(-pid, libc::SIGKILL) != 0 && libc::kill(pid, libc::SIGKILL) != 0 {
                tracing::debug!(
                    target: "krom.process",
                    pid,
                    error = %std::io::Error::last_os_error(),
                    "failed to kill debuggee"
                );
            }
        }
    }

    #[cfg(not(any(unix, windows)))]
    {
        tracing::debug!(target: "krom.process", pid, "process tree kill unsupported here");
    }
}
