//! Spawning and terminating the Krom debuggee.
//!
//! The supervisor owns at most one debuggee at a time. It starts the process
//! detached from the adapter (so an adapter crash does not take the game down
//! with it) while keeping a handle around for an explicit kill when the debug
//! session ends.
//!
//! On Windows the debuggee is normally started through `krom_spawn_helper`.
//! The handle returned by the spawn call then belongs to the helper, and the
//! real process id arrives later as a message on the helper's stdout. See
//! [`ProcessHandle::resolved_pid`].

use std::{
    fmt, io,
    path::{Path, PathBuf},
};

use thiserror::Error;

pub mod helper;
mod supervisor;

pub use supervisor::{ExitHook, ProcessExit, ProcessHandle, ProcessSupervisor};

/// How the debuggee is brought up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpawnStrategy {
    /// Spawn the program ourselves; the child's pid is the debuggee's pid.
    Direct,
    /// Spawn `helper <program> <args...>` and learn the debuggee's pid from
    /// the helper's pid message.
    Helper { helper: PathBuf },
}

impl SpawnStrategy {
    pub fn is_helper(&self) -> bool {
        matches!(self, SpawnStrategy::Helper { .. })
    }
}

/// A debuggee invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Put the debuggee in its own session / process group so signals aimed
    /// at the adapter don't reach it.
    pub detached: bool,
    pub strategy: SpawnStrategy,
}

impl SpawnRequest {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            cwd: None,
            detached: true,
            strategy: SpawnStrategy::Direct,
        }
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn strategy(mut self, strategy: SpawnStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

impl fmt::Display for SpawnRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Human-readable only, not a round-trippable shell command.
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.contains(' ') || arg.contains('\t') {
                write!(f, " \"{}\"", arg.replace('"', "\\\""))?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("executable not found: {}", .program.display())]
    NotFound { program: PathBuf },

    #[error("failed to spawn `{command}`: {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: io::Error,
    },
}

/// File name of the spawn helper binary on this platform.
pub fn spawn_helper_file_name() -> String {
    format!("krom_spawn_helper{}", std::env::consts::EXE_SUFFIX)
}

/// Locate `krom_spawn_helper` next to the running executable, or one
/// directory up (where cargo puts binaries relative to test executables).
pub fn default_spawn_helper_path() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let dir = exe.parent()?;
    let name = spawn_helper_file_name();
    let found = [Some(dir), dir.parent()]
        .into_iter()
        .flatten()
        .map(|dir| dir.join(&name))
        .find(|candidate| candidate.is_file());
    found
}

/// Configure `cmd` so the spawned process outlives the adapter.
pub fn detach(cmd: &mut std::process::Command) {
    #[cfg(unix)]
    unsafe {
        use std::os::unix::process::CommandExt;

        cmd.pre_exec(|| {
            // SAFETY: `setsid` and `signal` are async-signal-safe and do not
            // allocate. Runs in the child between `fork` and `exec`. The new
            // session also makes the child a process group leader, which the
            // forced kill relies on.
            if libc::setsid() == -1 {
                return Err(io::Error::last_os_error());
            }
            // An ignored SIGPIPE survives `exec`. Output pipes close when the
            // adapter exits; the debuggee must see EPIPE, not die.
            if libc::signal(libc::SIGPIPE, libc::SIG_IGN) == libc::SIG_ERR {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        });
    }

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;

        const DETACHED_PROCESS: u32 = 0x0000_0008;
        const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
        cmd.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
    }

    #[cfg(not(any(unix, windows)))]
    {
        let _ = cmd;
    }
}

pub(crate) fn ensure_executable(program: &Path) -> Result<(), ProcessError> {
    if program.is_file() {
        Ok(())
    } else {
        Err(ProcessError::NotFound {
            program: program.to_path_buf(),
        })
    }
}
