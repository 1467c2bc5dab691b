//! Engine used by the `krom-dap` binary when it runs without a DAP client.
//!
//! It has no CDP connection of its own; "attaching" just means waiting until
//! Krom's inspector port accepts connections.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use krom_core::{AttachArgs, CommonArgs, KromLaunchArgs};
use tokio::net::TcpStream;

use crate::{
    cdp::CdpTransport,
    engine::{AttachTarget, Capabilities, DebugEngine, EngineError, InitializeArgs, PausedEvent},
};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Default)]
pub struct StandaloneEngine {
    attached_port: Option<u16>,
    terminated: bool,
}

impl StandaloneEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Port of the inspector endpoint once attached.
    pub fn attached_port(&self) -> Option<u16> {
        self.attached_port
    }
}

#[async_trait]
impl DebugEngine for StandaloneEngine {
    async fn initialize(&mut self, _args: &InitializeArgs) -> Result<Capabilities, EngineError> {
        Ok(Capabilities::default())
    }

    async fn launch(&mut self, args: &KromLaunchArgs) -> Result<(), EngineError> {
        tracing::debug!(target: "krom.dap", cwd = %args.cwd.display(), "standalone launch");
        Ok(())
    }

    async fn attach(&mut self, _args: &AttachArgs) -> Result<(), EngineError> {
        Ok(())
    }

    async fn common_args(&mut self, _args: &CommonArgs) -> Result<(), EngineError> {
        Ok(())
    }

    /// Polls until the port accepts a connection. Never gives up on its own;
    /// the adapter bounds it with the attach timeout.
    async fn do_attach(&mut self, target: &AttachTarget) -> Result<(), EngineError> {
        loop {
            match TcpStream::connect((target.host(), target.port)).await {
                Ok(_) => {
                    tracing::info!(target: "krom.dap", port = target.port, "Krom inspector is up");
                    self.attached_port = Some(target.port);
                    return Ok(());
                }
                Err(err) => {
                    tracing::trace!(target: "krom.dap", error = %err, "inspector not ready");
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
            }
        }
    }

    async fn on_paused(&mut self, _event: &PausedEvent) {}

    async fn on_resumed(&mut self) {}

    async fn disconnect(&mut self) {
        self.attached_port = None;
    }

    async fn terminate_session(&mut self, reason: &str) {
        tracing::warn!(target: "krom.dap", reason, "session terminated");
        self.terminated = true;
    }

    fn has_terminated(&self) -> bool {
        self.terminated
    }

    fn transport(&self) -> Option<Arc<dyn CdpTransport>> {
        None
    }
}
