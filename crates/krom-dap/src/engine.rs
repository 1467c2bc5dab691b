use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use krom_core::{AttachArgs, CommonArgs, KromLaunchArgs};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cdp::{CdpError, CdpTransport};

/// Failure reported by the wrapped engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Cdp(#[from] CdpError),
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

/// Arguments of the DAP `initialize` request that the adapter looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitializeArgs {
    #[serde(rename = "clientID")]
    pub client_id: Option<String>,
    #[serde(rename = "adapterID")]
    pub adapter_id: String,
    pub lines_start_at1: Option<bool>,
    pub columns_start_at1: Option<bool>,
    pub path_format: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub supports_configuration_done_request: bool,
    pub supports_restart_request: bool,
    pub supports_conditional_breakpoints: bool,
    pub supports_evaluate_for_hovers: bool,
}

/// Where and how long to look for the inspector endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachTarget {
    pub port: u16,
    /// The engine picks the first inspector target whose URL matches.
    pub target_url: String,
    pub address: Option<String>,
    pub timeout: Duration,
}

impl AttachTarget {
    pub fn host(&self) -> &str {
        self.address.as_deref().unwrap_or("127.0.0.1")
    }
}

/// `Debugger.paused`, as far as the adapter cares.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PausedEvent {
    pub reason: String,
    #[serde(default)]
    pub hit_breakpoints: Vec<String>,
}

/// The generic debug engine the adapter specializes.
///
/// The adapter calls these hooks in the order the DAP client drives the
/// session; the engine owns the DAP protocol and the CDP connection.
#[async_trait]
pub trait DebugEngine: Send {
    async fn initialize(&mut self, args: &InitializeArgs) -> Result<Capabilities, EngineError>;

    /// Engine-side launch preparation. Runs before the build.
    async fn launch(&mut self, args: &KromLaunchArgs) -> Result<(), EngineError>;

    async fn attach(&mut self, args: &AttachArgs) -> Result<(), EngineError>;

    /// Receives the common arguments after the adapter has filled in its
    /// defaults.
    async fn common_args(&mut self, args: &CommonArgs) -> Result<(), EngineError>;

    /// Connect to the inspector endpoint. Once this returns `Ok`,
    /// [`DebugEngine::transport`] must return the live connection.
    async fn do_attach(&mut self, target: &AttachTarget) -> Result<(), EngineError>;

    async fn on_paused(&mut self, event: &PausedEvent);

    async fn on_resumed(&mut self);

    async fn disconnect(&mut self);

    /// End the session from the adapter side, e.g. because the debuggee
    /// could not be started.
    async fn terminate_session(&mut self, reason: &str);

    /// Whether the session already ended on the debuggee side.
    fn has_terminated(&self) -> bool;

    fn transport(&self) -> Option<Arc<dyn CdpTransport>>;
}
