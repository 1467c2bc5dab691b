//! Starts a program detached from this process and reports its pid.
//!
//! Usage: `krom_spawn_helper <program> [args...]`
//!
//! On success a single `krom-spawn-helper:pid=<n>` line is written to stdout
//! and the helper exits, leaving the program running on its own.

use std::{
    env,
    io::{self, Write},
    process::{self, Command, Stdio},
};

use krom_process::{detach, helper::format_pid_message};

fn main() {
    let mut args = env::args_os().skip(1);
    let Some(program) = args.next() else {
        eprintln!("usage: krom_spawn_helper <program> [args...]");
        process::exit(2);
    };

    let mut cmd = Command::new(&program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    detach(&mut cmd);

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            eprintln!("failed to spawn {}: {err}", program.to_string_lossy());
            process::exit(1);
        }
    };

    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{}", format_pid_message(child.id()));
    let _ = stdout.flush();
}
