//! Wire format shared by the supervisor and `krom_spawn_helper`.
//!
//! The helper is invoked as `krom_spawn_helper <program> [args...]`. Once the
//! real process is running it writes a single pid line to stdout. Anything
//! else it prints is diagnostics.

/// Prefix of the stdout line carrying the debuggee's pid.
pub const PID_MESSAGE_PREFIX: &str = "krom-spawn-helper:pid=";

pub fn format_pid_message(pid: u32) -> String {
    format!("{PID_MESSAGE_PREFIX}{pid}")
}

/// Extract the pid from a helper stdout line, if it is a pid message.
pub fn parse_pid_message(line: &str) -> Option<u32> {
    line.trim_end_matches(['\r', '\n'])
        .strip_prefix(PID_MESSAGE_PREFIX)?
        .trim()
        .parse()
        .ok()
}
