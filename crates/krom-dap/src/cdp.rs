//! The slice of the Chrome DevTools Protocol the adapter calls directly.
//!
//! Everything else (breakpoints, stepping, scopes) goes through the engine.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CdpError {
    #[error("CDP connection closed")]
    Closed,

    #[error("CDP error {code}: {message}")]
    Protocol { code: i64, message: String },
}

/// `Page.configureOverlay`. No message hides the overlay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureOverlayParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReloadParams {
    pub ignore_cache: bool,
}

/// Payload of `Log.entryAdded`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub source: String,
    pub level: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileScriptParams {
    pub expression: String,
    #[serde(rename = "sourceURL")]
    pub source_url: String,
    pub persist_script: bool,
    pub execution_context_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileScriptResult {
    #[serde(default)]
    pub script_id: Option<String>,
    #[serde(default)]
    pub exception_details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunScriptParams {
    pub script_id: String,
    pub execution_context_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunScriptResult {
    #[serde(default)]
    pub result: serde_json::Value,
    #[serde(default)]
    pub exception_details: Option<serde_json::Value>,
}

pub type LogEntryHandler = Box<dyn Fn(LogEntry) + Send + Sync + 'static>;

/// CDP calls made on an attached connection.
#[async_trait]
pub trait CdpTransport: Send + Sync {
    async fn page_configure_overlay(&self, params: ConfigureOverlayParams) -> Result<(), CdpError>;

    async fn page_reload(&self, params: ReloadParams) -> Result<(), CdpError>;

    /// Register a handler for `Log.entryAdded` events.
    fn log_on_entry_added(&self, handler: LogEntryHandler);

    async fn runtime_compile_script(
        &self,
        params: CompileScriptParams,
    ) -> Result<CompileScriptResult, CdpError>;

    async fn runtime_run_script(&self, params: RunScriptParams) -> Result<RunScriptResult, CdpError>;
}
