//! Core shared types for the Krom debug adapter.
//!
//! Nothing in here spawns processes or talks to the debuggee; the crate only
//! knows how Krom is laid out on disk and what launch/attach requests carry.

mod debug_config;
mod platform;
mod source_map;

pub use debug_config::{
    target_filter, AttachArgs, CommonArgs, DebugTarget, KromLaunchArgs, PathMapping,
    DEFAULT_ATTACH_TARGET_URL, SKIP_FILE_REGEXPS,
};
pub use platform::{resolve_executable_path, Platform, KROM_EXECUTABLE_NAME};
pub use source_map::{
    default_source_map_path_overrides, resolve_source_map_path_overrides, resolve_web_root_pattern,
    ResolvedOverrides, SourceMapPathOverrides, WEB_ROOT_PATTERN,
};
