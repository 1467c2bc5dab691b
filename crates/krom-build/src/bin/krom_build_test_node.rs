//! Stand-in for `node` in build tests.
//!
//! The first argument is a "script" with one instruction per line:
//! `stdout <text>`, `stderr <text>`, `sleep <ms>`, `argv <file>`,
//! `pid <file>` or `exit <code>`. Prefixing an instruction with `if-watch`
//! runs it only when `--watch` was passed.

use std::{env, fs, process, thread, time::Duration};

fn run(op: &str, rest: &str, argv: &[String]) {
    match op {
        "stdout" => println!("{rest}"),
        "stderr" => eprintln!("{rest}"),
        "sleep" => thread::sleep(Duration::from_millis(rest.parse().unwrap_or(0))),
        "argv" => fs::write(rest, argv[2..].join("\n")).expect("write argv file"),
        "pid" => fs::write(rest, process::id().to_string()).expect("write pid file"),
        "exit" => process::exit(rest.parse().unwrap_or(1)),
        "if-watch" => {
            if argv.iter().any(|arg| arg == "--watch") {
                let (op, rest) = rest.split_once(' ').unwrap_or((rest, ""));
                run(op, rest, argv);
            }
        }
        _ => {}
    }
}

fn main() {
    let argv: Vec<String> = env::args().collect();
    let Some(script) = argv.get(1) else {
        eprintln!("missing script");
        process::exit(2);
    };
    let text = fs::read_to_string(script).unwrap_or_default();

    for line in text.lines() {
        let (op, rest) = line.split_once(' ').unwrap_or((line, ""));
        run(op, rest, &argv);
    }
}
