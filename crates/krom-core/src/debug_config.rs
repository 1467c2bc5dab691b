use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::source_map::SourceMapPathOverrides;

/// URL the engine filters inspector targets by when attaching to a Krom it
/// launched itself.
pub const DEFAULT_ATTACH_TARGET_URL: &str = "http://krom";

/// Scripts the engine should never step into.
pub const SKIP_FILE_REGEXPS: &[&str] = &["^chrome-extension:.*"];

/// URL prefix to local directory mapping.
pub type PathMapping = IndexMap<String, String>;

/// Arguments shared by `launch` and `attach` requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonArgs {
    pub web_root: Option<String>,
    pub path_mapping: Option<PathMapping>,
    /// Source maps are enabled unless explicitly turned off.
    pub source_maps: Option<bool>,
    pub source_map_path_overrides: Option<SourceMapPathOverrides>,
    #[serde(default, rename = "skipFileRegExps")]
    pub skip_file_regexps: Vec<String>,
}

/// `launch` request arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KromLaunchArgs {
    #[serde(flatten)]
    pub common: CommonArgs,
    /// Project directory containing `khafile.js`.
    pub cwd: PathBuf,
    /// Kha checkout used to build the project.
    pub kha: Option<PathBuf>,
    /// Krom distribution root (the directory holding `linux/`, `win32/`, `macos/`).
    pub krom: Option<PathBuf>,
    /// ffmpeg binary handed to khamake for video/audio conversion.
    pub ffmpeg: Option<String>,
    /// Explicit runtime binary. When set it replaces the binary resolved
    /// from `krom` and is always spawned directly.
    pub runtime_executable: Option<PathBuf>,
    /// Extra arguments appended after the ones the adapter computes.
    #[serde(default)]
    pub runtime_args: Vec<String>,
    /// Inspector port. A random port is chosen when unset.
    pub port: Option<u16>,
    pub address: Option<String>,
    /// Only run the game; skip the debugger attach.
    #[serde(default)]
    pub no_debug: bool,
    /// Attach timeout in milliseconds.
    pub timeout: Option<u64>,
}

/// `attach` request arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachArgs {
    #[serde(flatten)]
    pub common: CommonArgs,
    pub port: u16,
    pub address: Option<String>,
    pub url: Option<String>,
    /// Takes precedence over `url` when set.
    pub url_filter: Option<String>,
    /// Attach timeout in milliseconds.
    pub timeout: Option<u64>,
}

/// An inspector target as listed by the runtime's `/json` endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugTarget {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub url: Option<String>,
    pub web_socket_debugger_url: Option<String>,
}

/// Accept targets that are pages, or that don't report a type at all.
pub fn target_filter(target: &DebugTarget) -> bool {
    match target.kind.as_deref() {
        None | Some("") => true,
        Some(kind) => kind == "page",
    }
}
