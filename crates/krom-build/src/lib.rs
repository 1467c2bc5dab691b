//! The build step that runs before Krom is launched.
//!
//! The adapter never loads the build tool directly; it is handed a
//! [`BuildTool`] and only relies on `run`/`close`. [`KhamakeBuildTool`] is the
//! implementation used in practice: it drives Kha's `make.js` through Node.

use std::{io, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

mod khamake;
mod options;

pub use khamake::KhamakeBuildTool;
pub use options::BuildOptions;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("khamake not found at {}", .0.display())]
    KhamakeNotFound(PathBuf),

    #[error("khamake failed with exit code {code:?}")]
    Failed { code: Option<i32> },

    #[error("build cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, BuildError>;

/// What a successful build produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifact {
    /// Directory holding the `krom` and `krom-resources` outputs.
    pub output_dir: PathBuf,
}

/// Receives the build tool's output, line by line.
pub trait BuildLog: Send + Sync {
    fn info(&self, line: &str);
    fn error(&self, line: &str);
}

/// Forwards build output to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingBuildLog;

impl BuildLog for TracingBuildLog {
    fn info(&self, line: &str) {
        tracing::info!(target: "krom.build", "{line}");
    }

    fn error(&self, line: &str) {
        tracing::error!(target: "krom.build", "{line}");
    }
}

#[async_trait]
pub trait BuildTool: Send + Sync {
    /// Build the project described by `options`.
    async fn run(&self, options: BuildOptions, log: Arc<dyn BuildLog>) -> Result<BuildArtifact>;

    /// Release everything the tool holds: cancels an in-flight build and
    /// stops file watching. Safe to call at any time, repeatedly.
    async fn close(&self);
}
