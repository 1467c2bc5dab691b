use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use krom_build::KhamakeBuildTool;
use krom_config::{KromConfig, CONFIG_ENV_VAR};
use krom_core::KromLaunchArgs;
use krom_dap::{standalone::StandaloneEngine, InitializeArgs, KromDebugAdapter};

/// Build a Kha project, start it in Krom with the inspector enabled and keep
/// it running until Ctrl-C or until Krom exits.
#[derive(Debug, Parser)]
#[command(name = "krom-dap", version, about)]
struct Cli {
    /// Path to a TOML config file.
    ///
    /// If unset, `KROM_DAP_CONFIG` is used as a fallback. When neither is
    /// provided the adapter uses in-memory defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Project directory (the one holding `khafile.js`).
    #[arg(long, default_value = ".")]
    cwd: PathBuf,

    /// Kha checkout. Defaults to `<cwd>/Kha`.
    #[arg(long)]
    kha: Option<PathBuf>,

    /// Krom directory holding the per-platform builds.
    #[arg(long)]
    krom: Option<PathBuf>,

    /// Run this executable instead of the Krom found under `--krom`.
    #[arg(long)]
    runtime_executable: Option<PathBuf>,

    #[arg(long)]
    ffmpeg: Option<String>,

    /// Inspector port. Random when unset.
    #[arg(long)]
    port: Option<u16>,

    /// Start Krom without waiting for the inspector.
    #[arg(long)]
    no_debug: bool,

    /// Extra arguments passed to Krom.
    #[arg(last = true)]
    runtime_args: Vec<String>,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.clone());
    krom_dap::hardening::init(&config);

    let cwd = std::path::absolute(&cli.cwd)
        .with_context(|| format!("invalid project directory {}", cli.cwd.display()))?;
    let args = KromLaunchArgs {
        cwd,
        kha: cli.kha,
        krom: cli.krom,
        ffmpeg: cli.ffmpeg,
        runtime_executable: cli.runtime_executable,
        runtime_args: cli.runtime_args,
        port: cli.port,
        no_debug: cli.no_debug,
        ..KromLaunchArgs::default()
    };

    let build = Arc::new(KhamakeBuildTool::new(config.build.node.clone()));
    let mut adapter = KromDebugAdapter::new(StandaloneEngine::new(), build, &config);
    adapter.initialize(&InitializeArgs::default()).await?;

    let launched = adapter.launch(args).await;
    if let Err(err) = launched {
        adapter.disconnect().await;
        return Err(err.into());
    }

    match adapter.engine().attached_port() {
        Some(port) => println!("Krom inspector listening on port {port}"),
        None => println!("Krom started"),
    }

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("failed to wait for Ctrl-C")?;
        }
        Some(exit) = adapter.wait_for_debuggee_exit() => {
            eprintln!("Krom {exit}");
            adapter.on_debuggee_exit(&exit).await;
        }
    }
    adapter.disconnect().await;
    Ok(())
}

fn load_config(cli_path: Option<PathBuf>) -> KromConfig {
    let path = cli_path.or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));
    let Some(path) = path else {
        return KromConfig::default();
    };

    match KromConfig::load_from_path(&path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!(
                "krom-dap: failed to load config from {}: {err}; continuing with defaults",
                path.display()
            );
            KromConfig::default()
        }
    }
}
