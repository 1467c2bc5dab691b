use std::fmt;
use std::path::{Path, PathBuf};

/// File stem of the Krom runtime binary on every platform.
pub const KROM_EXECUTABLE_NAME: &str = "Krom";

/// Operating system families Krom ships binaries for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Linux,
    Windows,
    MacOs,
}

impl Platform {
    /// The platform this binary was compiled for. Anything that is neither
    /// Windows nor macOS uses the Linux layout.
    pub const fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }

    /// Directory (relative to a Krom distribution root) holding the binary.
    pub fn executable_dir(self) -> PathBuf {
        match self {
            Platform::Linux => PathBuf::from("linux"),
            Platform::Windows => PathBuf::from("win32"),
            Platform::MacOs => ["macos", "Krom.app", "Contents", "MacOS"].iter().collect(),
        }
    }

    pub fn executable_suffix(self) -> &'static str {
        match self {
            Platform::Windows => ".exe",
            Platform::Linux | Platform::MacOs => "",
        }
    }

    /// Whether launches on this platform go through the spawn helper by
    /// default, because the handle returned by a direct spawn does not
    /// reliably identify the debuggee.
    pub fn uses_spawn_helper(self) -> bool {
        matches!(self, Platform::Windows)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Linux => "linux",
            Platform::Windows => "win32",
            Platform::MacOs => "macos",
        };
        f.write_str(name)
    }
}

/// Path of the Krom binary inside the distribution rooted at `krom_dir`.
pub fn resolve_executable_path(platform: Platform, krom_dir: &Path) -> PathBuf {
    krom_dir.join(platform.executable_dir()).join(format!(
        "{KROM_EXECUTABLE_NAME}{}",
        platform.executable_suffix()
    ))
}
