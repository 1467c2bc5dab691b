use std::{
    path::{Path, PathBuf},
    process::Stdio,
    sync::Arc,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::{Child, Command},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::{BuildArtifact, BuildError, BuildLog, BuildOptions, BuildTool, Result};

#[derive(Default)]
struct State {
    cancel: CancellationToken,
    watcher: Option<Child>,
}

/// Runs Kha's `make.js` with Node.
pub struct KhamakeBuildTool {
    node: PathBuf,
    state: Mutex<State>,
}

impl KhamakeBuildTool {
    pub fn new(node: impl Into<PathBuf>) -> Self {
        Self {
            node: node.into(),
            state: Mutex::new(State::default()),
        }
    }

    fn command(&self, script: &Path, options: &BuildOptions, watch: bool) -> Command {
        let mut cmd = Command::new(&self.node);
        cmd.arg(script)
            .args(options.to_args(watch))
            .current_dir(&options.from)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn start_watcher(&self, script: &Path, options: &BuildOptions, log: Arc<dyn BuildLog>) {
        let mut child = match self.command(script, options, true).spawn() {
            Ok(child) => child,
            Err(err) => {
                log.error(&format!("failed to start khamake watcher: {err}"));
                return;
            }
        };
        forward_output(&mut child, log);

        let previous = self.state.lock().watcher.replace(child);
        if let Some(mut previous) = previous {
            let _ = previous.start_kill();
        }
    }
}

impl Default for KhamakeBuildTool {
    fn default() -> Self {
        Self::new("node")
    }
}

#[async_trait]
impl BuildTool for KhamakeBuildTool {
    async fn run(&self, options: BuildOptions, log: Arc<dyn BuildLog>) -> Result<BuildArtifact> {
        let script = options.make_script();
        if !script.is_file() {
            return Err(BuildError::KhamakeNotFound(script));
        }

        let cancel = self.state.lock().cancel.clone();
        tracing::debug!(
            target: "krom.build",
            node = %self.node.display(),
            script = %script.display(),
            "running khamake"
        );

        let mut child = self.command(&script, &options, false).spawn()?;
        let forwarders = forward_output(&mut child, log.clone());

        let status = tokio::select! {
            status = child.wait() => Some(status),
            _ = cancel.cancelled() => None,
        };
        let Some(status) = status else {
            let _ = child.kill().await;
            return Err(BuildError::Cancelled);
        };
        let status = status?;

        // Drain whatever output is left before reporting the result.
        for forwarder in forwarders {
            let _ = forwarder.await;
        }

        if !status.success() {
            return Err(BuildError::Failed {
                code: status.code(),
            });
        }

        if options.watch {
            self.start_watcher(&script, &options, log);
        }

        Ok(BuildArtifact {
            output_dir: options.to.clone(),
        })
    }

    async fn close(&self) {
        let watcher = {
            let mut state = self.state.lock();
            state.cancel.cancel();
            state.cancel = CancellationToken::new();
            state.watcher.take()
        };

        if let Some(mut watcher) = watcher {
            tracing::debug!(target: "krom.build", "stopping khamake watcher");
            let _ = watcher.kill().await;
        }
    }
}

fn forward_output(child: &mut Child, log: Arc<dyn BuildLog>) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        let log = log.clone();
        handles.push(forward_lines(stdout, move |line| log.info(&line)));
    }
    if let Some(stderr) = child.stderr.take() {
        handles.push(forward_lines(stderr, move |line| log.error(&line)));
    }
    handles
}

fn forward_lines<R, F>(reader: R, on_line: F) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
    F: Fn(String) + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            on_line(line);
        }
    })
}
