//! Stands in for the Krom runtime.
//!
//! Records its argv and pid in `krom-argv.txt` / `krom.pid` inside its
//! working directory (the project directory), then sleeps.

use std::{env, fs, thread, time::Duration};

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();

    let mut sleep_ms: u64 = 60_000;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--sleep-ms" {
            sleep_ms = iter
                .next()
                .and_then(|v| v.parse().ok())
                .unwrap_or(sleep_ms);
        }
    }

    fs::write("krom-argv.txt", args.join("\n")).expect("write argv file");
    // Written last: once the pid is there the argv is complete too.
    fs::write("krom.pid", std::process::id().to_string()).expect("write pid file");

    println!("krom-dap test helper started");
    thread::sleep(Duration::from_millis(sleep_ms));
}
