use std::{
    env, fs,
    io::{self, Write},
    process, thread,
    time::Duration,
};

fn main() {
    let mut pid_file: Option<String> = None;
    let mut argv_file: Option<String> = None;
    let mut sleep_ms: u64 = 60_000;
    let mut exit_code: i32 = 0;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--pid-file" => pid_file = args.next(),
            "--argv-file" => argv_file = args.next(),
            "--sleep-ms" => {
                sleep_ms = args
                    .next()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(sleep_ms);
            }
            "--exit-code" => {
                exit_code = args
                    .next()
                    .and_then(|v| v.parse::<i32>().ok())
                    .unwrap_or(exit_code);
            }
            _ => {}
        }
    }

    let pid = process::id();
    if let Some(path) = argv_file {
        let argv: Vec<String> = env::args().collect();
        fs::write(path, argv.join("\n")).expect("write argv file");
    }
    // Written last: tests poll for this file to know the helper is up.
    if let Some(path) = pid_file {
        fs::write(path, pid.to_string()).expect("write pid file");
    }

    println!("krom-process test helper started pid={pid}");
    let _ = io::stdout().flush();

    thread::sleep(Duration::from_millis(sleep_ms));
    process::exit(exit_code);
}
