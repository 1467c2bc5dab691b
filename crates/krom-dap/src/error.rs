use std::{fmt, time::Duration};

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{cdp::CdpError, engine::EngineError};

pub type AdapterResult<T> = Result<T, AdapterError>;

/// Structured launch failure, shaped like a DAP error message so the client
/// can show `format` to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchFailure {
    pub id: u32,
    pub format: String,
}

impl LaunchFailure {
    pub const COMPILATION_FAILED: &'static str = "Compilation failed.";

    pub fn compilation_failed() -> Self {
        Self {
            id: rand::thread_rng().gen_range(0..100_000),
            format: Self::COMPILATION_FAILED.to_owned(),
        }
    }
}

impl fmt::Display for LaunchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format)
    }
}

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("{0}")]
    SpawnFailed(String),

    #[error("{0}")]
    Launch(LaunchFailure),

    #[error("debug engine: {0}")]
    Engine(#[from] EngineError),

    #[error("timed out after {0:?} waiting to attach to Krom")]
    AttachTimeout(Duration),

    #[error("not attached to Krom")]
    NotAttached,

    #[error("script did not compile: {0}")]
    ScriptCompile(String),

    #[error(transparent)]
    Cdp(#[from] CdpError),
}
