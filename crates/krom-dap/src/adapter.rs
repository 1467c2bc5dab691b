//! Krom-specific behavior layered over a [`DebugEngine`].

use std::{path::PathBuf, sync::Arc, time::Duration};

use krom_build::{BuildLog, BuildOptions, BuildTool, TracingBuildLog};
use krom_config::{AdapterConfig, BuildConfig, KromConfig};
use krom_core::{
    resolve_executable_path, resolve_source_map_path_overrides, AttachArgs, CommonArgs,
    KromLaunchArgs, DEFAULT_ATTACH_TARGET_URL, SKIP_FILE_REGEXPS,
};
use krom_process::{
    default_spawn_helper_path, ProcessExit, ProcessHandle, ProcessSupervisor, SpawnRequest,
    SpawnStrategy,
};
use rand::Rng;

use crate::{
    cdp::{
        CdpTransport, CompileScriptParams, ConfigureOverlayParams, ReloadParams, RunScriptParams,
        RunScriptResult,
    },
    debounce::DebounceGate,
    engine::{AttachTarget, Capabilities, DebugEngine, InitializeArgs, PausedEvent},
    error::{AdapterError, AdapterResult, LaunchFailure},
};

pub const KROM_THREAD_NAME: &str = "Krom";

const KROM_NOT_FOUND: &str = "Can't find Krom.";
/// Krom runs a single JavaScript context.
const KROM_EXECUTION_CONTEXT_ID: i64 = 1;

pub struct KromDebugAdapter<E, B> {
    engine: E,
    build: Arc<B>,
    build_log: Arc<dyn BuildLog>,
    supervisor: ProcessSupervisor,
    config: AdapterConfig,
    build_config: BuildConfig,
    overlay: Option<DebounceGate>,
    debuggee: Option<ProcessHandle>,
}

impl<E, B> KromDebugAdapter<E, B>
where
    E: DebugEngine,
    B: BuildTool,
{
    pub fn new(engine: E, build: Arc<B>, config: &KromConfig) -> Self {
        Self {
            engine,
            build,
            build_log: Arc::new(TracingBuildLog),
            supervisor: ProcessSupervisor::new(),
            config: config.adapter.clone(),
            build_config: config.build.clone(),
            overlay: None,
            debuggee: None,
        }
    }

    pub fn with_supervisor(mut self, supervisor: ProcessSupervisor) -> Self {
        self.supervisor = supervisor;
        self
    }

    pub fn with_build_log(mut self, log: Arc<dyn BuildLog>) -> Self {
        self.build_log = log;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn supervisor(&self) -> &ProcessSupervisor {
        &self.supervisor
    }

    pub fn supervisor_mut(&mut self) -> &mut ProcessSupervisor {
        &mut self.supervisor
    }

    pub fn overlay(&self) -> Option<&DebounceGate> {
        self.overlay.as_ref()
    }

    pub fn thread_name(&self) -> &'static str {
        KROM_THREAD_NAME
    }

    pub async fn initialize(&mut self, args: &InitializeArgs) -> AdapterResult<Capabilities> {
        self.overlay = Some(DebounceGate::new(self.config.overlay_debounce()));
        let mut capabilities = self.engine.initialize(args).await?;
        capabilities.supports_restart_request = true;
        Ok(capabilities)
    }

    /// Build the project, start Krom and attach to it.
    ///
    /// Only build and spawn failures are reported; the build failure comes
    /// back as [`AdapterError::Launch`] with a user-facing message.
    pub async fn launch(&mut self, mut args: KromLaunchArgs) -> AdapterResult<()> {
        self.common_args(&mut args.common).await?;
        self.engine.launch(&args).await?;

        let kha = args.kha.clone().unwrap_or_else(|| args.cwd.join("Kha"));
        tracing::info!(target: "krom.dap", "Using Kha from {}", kha.display());

        let mut options = BuildOptions::for_krom(&args.cwd, &kha, args.ffmpeg.clone());
        options.graphics = self.build_config.graphics.clone();
        options.visual_studio = self.build_config.visualstudio.clone();

        if let Err(err) = self.build.run(options, Arc::clone(&self.build_log)).await {
            tracing::error!(target: "krom.dap", error = %err, "Launch canceled.");
            self.build.close().await;
            return Err(AdapterError::Launch(LaunchFailure::compilation_failed()));
        }

        let port = self.start_krom(&args).await?;
        if args.no_debug {
            tracing::info!(target: "krom.dap", port, "started Krom without debugging");
            return Ok(());
        }

        let timeout = args
            .timeout
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.config.attach_timeout());
        self.do_attach(AttachTarget {
            port,
            target_url: DEFAULT_ATTACH_TARGET_URL.to_owned(),
            address: args.address.clone(),
            timeout,
        })
        .await
    }

    pub async fn attach(&mut self, mut args: AttachArgs) -> AdapterResult<()> {
        if let Some(filter) = &args.url_filter {
            args.url = Some(filter.clone());
        }
        self.common_args(&mut args.common).await?;
        self.engine.attach(&args).await?;

        let timeout = args
            .timeout
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.config.attach_timeout());
        self.do_attach(AttachTarget {
            port: args.port,
            target_url: args
                .url
                .clone()
                .unwrap_or_else(|| DEFAULT_ATTACH_TARGET_URL.to_owned()),
            address: args.address.clone(),
            timeout,
        })
        .await
    }

    /// Fill in the Krom defaults for the arguments shared by launch and
    /// attach, then hand them to the engine.
    pub async fn common_args(&mut self, args: &mut CommonArgs) -> AdapterResult<()> {
        if args.web_root.is_none() {
            args.web_root = args
                .path_mapping
                .as_ref()
                .and_then(|mapping| mapping.get("/"))
                .cloned();
        }
        args.source_maps = Some(args.source_maps.unwrap_or(true));

        let resolved = resolve_source_map_path_overrides(
            args.web_root.as_deref(),
            args.source_map_path_overrides.as_ref(),
        );
        args.source_map_path_overrides = Some(resolved.overrides);
        args.skip_file_regexps = SKIP_FILE_REGEXPS.iter().map(|re| (*re).to_owned()).collect();

        self.engine.common_args(args).await?;
        Ok(())
    }

    pub async fn do_attach(&mut self, target: AttachTarget) -> AdapterResult<()> {
        tracing::debug!(
            target: "krom.dap",
            port = target.port,
            host = target.host(),
            url = %target.target_url,
            "attaching"
        );
        match tokio::time::timeout(target.timeout, self.engine.do_attach(&target)).await {
            Ok(result) => result?,
            Err(_) => return Err(AdapterError::AttachTimeout(target.timeout)),
        }

        if let Some(transport) = self.engine.transport() {
            transport.log_on_entry_added(Box::new(|entry| {
                tracing::info!(target: "krom.console", level = %entry.level, "{}", entry.text);
            }));
        }
        Ok(())
    }

    pub async fn on_paused(&mut self, event: &PausedEvent) {
        let action = overlay_action(
            self.engine.transport(),
            ConfigureOverlayParams {
                message: Some(self.config.pause_message.clone()),
            },
        );
        self.overlay_gate().do_and_cancel(action);
        self.engine.on_paused(event).await;
    }

    pub async fn on_resumed(&mut self) {
        let action = overlay_action(self.engine.transport(), ConfigureOverlayParams::default());
        self.overlay_gate().wait(action);
        self.engine.on_resumed().await;
    }

    /// End the session. Krom is only killed when the disconnect came from the
    /// client; if the debuggee side already went away it is left alone.
    pub async fn disconnect(&mut self) {
        let had_terminated = self.engine.has_terminated();

        // Disconnect first: a paused Krom does not always die from a kill.
        self.engine.disconnect().await;

        self.debuggee = None;
        if had_terminated {
            self.supervisor.release();
        } else {
            self.supervisor.terminate();
        }
        self.build.close().await;
    }

    /// Resolves once the Krom started by [`launch`](Self::launch) ends on its
    /// own. `None` when there is no such process or its end cannot be
    /// observed.
    pub async fn wait_for_debuggee_exit(&self) -> Option<ProcessExit> {
        let debuggee = self.debuggee.clone()?;
        debuggee.wait_for_exit().await
    }

    /// Krom went away without being asked to: end the debug session.
    pub async fn on_debuggee_exit(&mut self, exit: &ProcessExit) {
        self.debuggee = None;
        self.supervisor.release();
        let reason = match exit {
            ProcessExit::Error(message) => format!("Krom error: {message}"),
            exit => format!("Krom {exit}."),
        };
        self.engine.terminate_session(&reason).await;
    }

    /// Reload the game, bypassing the cache.
    pub async fn restart(&mut self) -> AdapterResult<()> {
        let transport = self.transport()?;
        transport
            .page_reload(ReloadParams { ignore_cache: true })
            .await?;
        Ok(())
    }

    /// Compile `expression` as a persistent script and run it in Krom.
    pub async fn run_script(
        &mut self,
        expression: &str,
        source_url: &str,
    ) -> AdapterResult<RunScriptResult> {
        let transport = self.transport()?;
        let compiled = transport
            .runtime_compile_script(CompileScriptParams {
                expression: expression.to_owned(),
                source_url: source_url.to_owned(),
                persist_script: true,
                execution_context_id: KROM_EXECUTION_CONTEXT_ID,
            })
            .await?;

        let Some(script_id) = compiled.script_id else {
            let details = compiled
                .exception_details
                .map(|details| details.to_string())
                .unwrap_or_else(|| source_url.to_owned());
            return Err(AdapterError::ScriptCompile(details));
        };

        let result = transport
            .runtime_run_script(RunScriptParams {
                script_id,
                execution_context_id: KROM_EXECUTION_CONTEXT_ID,
            })
            .await?;
        Ok(result)
    }

    fn transport(&self) -> AdapterResult<Arc<dyn CdpTransport>> {
        self.engine.transport().ok_or(AdapterError::NotAttached)
    }

    fn overlay_gate(&mut self) -> &DebounceGate {
        let delay = self.config.overlay_debounce();
        self.overlay.get_or_insert_with(|| DebounceGate::new(delay))
    }

    async fn start_krom(&mut self, args: &KromLaunchArgs) -> AdapterResult<u16> {
        let (program, force_direct) = match (&args.runtime_executable, &args.krom) {
            (Some(executable), _) => (executable.clone(), true),
            (None, Some(krom)) => (
                resolve_executable_path(self.supervisor.platform(), krom),
                false,
            ),
            (None, None) => {
                tracing::error!(target: "krom.dap", "{KROM_NOT_FOUND}");
                self.engine.terminate_session(KROM_NOT_FOUND).await;
                return Err(AdapterError::SpawnFailed(KROM_NOT_FOUND.to_owned()));
            }
        };
        if !program.is_file() {
            tracing::error!(target: "krom.dap", program = %program.display(), "{KROM_NOT_FOUND}");
            self.engine.terminate_session(KROM_NOT_FOUND).await;
            return Err(AdapterError::SpawnFailed(KROM_NOT_FOUND.to_owned()));
        }

        // Port 0 means "pick one", same as no port.
        let port = args
            .port
            .filter(|&port| port != 0)
            .unwrap_or_else(|| self.random_port());
        let build_dir = args.cwd.join("build");
        let mut krom_args = vec![
            build_dir.join("krom").display().to_string(),
            build_dir.join("krom-resources").display().to_string(),
            "--debug".to_owned(),
            port.to_string(),
            "--watch".to_owned(),
        ];
        krom_args.extend(args.runtime_args.iter().cloned());

        let strategy = spawn_strategy(&self.supervisor, force_direct, self.spawn_helper_path());
        let request = SpawnRequest::new(program, krom_args)
            .cwd(&args.cwd)
            .strategy(strategy);

        self.supervisor.on_exit(|exit| {
            tracing::info!(target: "krom.dap", %exit, "Krom ended");
        });
        match self.supervisor.start(request) {
            Ok(handle) => {
                self.debuggee = Some(handle);
                Ok(port)
            }
            Err(err) => {
                let message = format!("Krom error: {err}");
                tracing::error!(target: "krom.dap", "{message}");
                self.engine.terminate_session(&message).await;
                Err(AdapterError::SpawnFailed(message))
            }
        }
    }

    fn spawn_helper_path(&self) -> Option<PathBuf> {
        if !self.supervisor.platform().uses_spawn_helper() {
            return None;
        }
        self.config
            .spawn_helper
            .clone()
            .or_else(default_spawn_helper_path)
    }

    fn random_port(&self) -> u16 {
        let start = self.config.port_range_start;
        let end = self.config.port_range_end;
        if start >= end {
            return start;
        }
        rand::thread_rng().gen_range(start..end)
    }
}

fn spawn_strategy(
    supervisor: &ProcessSupervisor,
    force_direct: bool,
    helper: Option<PathBuf>,
) -> SpawnStrategy {
    if helper.is_none() && supervisor.platform().uses_spawn_helper() && !force_direct {
        tracing::warn!(
            target: "krom.dap",
            "krom_spawn_helper not found, starting Krom directly"
        );
    }
    supervisor.strategy_for(force_direct, helper)
}

/// Fire-and-forget `Page.configureOverlay`. Failures only matter for
/// cosmetics and are dropped.
fn overlay_action(
    transport: Option<Arc<dyn CdpTransport>>,
    params: ConfigureOverlayParams,
) -> impl FnOnce() + Send + 'static {
    move || {
        let Some(transport) = transport else {
            return;
        };
        tokio::spawn(async move {
            if let Err(err) = transport.page_configure_overlay(params).await {
                tracing::debug!(target: "krom.dap", error = %err, "configureOverlay failed");
            }
        });
    }
}
