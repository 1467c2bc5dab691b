use std::{sync::Arc, time::Duration};

use krom_config::KromConfig;
use krom_dap::{AdapterError, AttachTarget};
use krom_process::ProcessExit;
use tempfile::TempDir;

use super::{adapter, adapter_with_config, krom_argv, launch_args, FakeBuild, FakeEngine};

#[tokio::test]
async fn successful_build_spawns_krom_with_the_debug_port_and_attaches() {
    let project = TempDir::new().unwrap();
    let build = Arc::new(FakeBuild::default());
    let mut adapter = adapter(FakeEngine::new(), build.clone());

    let mut args = launch_args(&project);
    args.port = Some(12345);
    args.timeout = Some(5_000);
    adapter.launch(args).await.unwrap();

    let build_dir = project.path().join("build");
    assert_eq!(
        krom_argv(&project).await,
        vec![
            build_dir.join("krom").display().to_string(),
            build_dir.join("krom-resources").display().to_string(),
            "--debug".to_owned(),
            "12345".to_owned(),
            "--watch".to_owned(),
        ]
    );

    let handle = adapter.supervisor().handle().expect("Krom is running");
    assert!(handle.args().iter().any(|arg| arg == "12345"));
    assert_eq!(handle.cwd(), Some(project.path()));

    assert_eq!(
        adapter.engine().attach_targets,
        vec![AttachTarget {
            port: 12345,
            target_url: "http://krom".to_owned(),
            address: None,
            timeout: Duration::from_secs(5),
        }]
    );
    assert_eq!(
        adapter.engine().hooks,
        vec!["common_args", "launch", "do_attach"]
    );

    {
        let runs = build.runs.lock();
        assert_eq!(runs.len(), 1);
        let options = &runs[0];
        assert_eq!(options.from, project.path());
        assert_eq!(options.to, build_dir);
        assert_eq!(options.kha, project.path().join("Kha"));
        assert_eq!(options.target, "krom");
        assert_eq!(options.project_file, "khafile.js");
        assert!(options.watch);
    }

    adapter.disconnect().await;
}

#[tokio::test]
async fn failed_build_spawns_nothing_and_reports_compilation_failure() {
    let project = TempDir::new().unwrap();
    let build = Arc::new(FakeBuild::failing());
    let mut adapter = adapter(FakeEngine::new(), build.clone());

    let err = adapter.launch(launch_args(&project)).await.unwrap_err();
    let AdapterError::Launch(failure) = err else {
        panic!("expected a launch failure, got {err:?}");
    };
    assert!(!failure.format.is_empty());
    assert!(failure.id < 100_000);

    assert!(adapter.supervisor().handle().is_none());
    assert!(!project.path().join("krom.pid").exists());
    assert!(adapter.engine().attach_targets.is_empty());
    assert_eq!(build.close_count(), 1);
}

#[tokio::test]
async fn no_debug_starts_krom_without_attaching() {
    let project = TempDir::new().unwrap();
    let mut adapter = adapter(FakeEngine::new(), Arc::new(FakeBuild::default()));

    let mut args = launch_args(&project);
    args.no_debug = true;
    adapter.launch(args).await.unwrap();

    krom_argv(&project).await;
    assert!(adapter.supervisor().handle().is_some());
    assert!(adapter.engine().attach_targets.is_empty());

    adapter.disconnect().await;
}

#[tokio::test]
async fn missing_krom_binary_fails_the_launch() {
    let project = TempDir::new().unwrap();
    let mut adapter = adapter(FakeEngine::new(), Arc::new(FakeBuild::default()));

    let mut args = launch_args(&project);
    args.runtime_executable = None;
    args.krom = Some(project.path().join("Krom"));

    let err = adapter.launch(args).await.unwrap_err();
    assert!(matches!(&err, AdapterError::SpawnFailed(message) if message == "Can't find Krom."));
    assert!(adapter.supervisor().handle().is_none());
    assert_eq!(adapter.engine().terminate_reasons, vec!["Can't find Krom.".to_owned()]);
}

#[tokio::test]
async fn launch_without_any_krom_location_terminates_the_session() {
    let project = TempDir::new().unwrap();
    let mut adapter = adapter(FakeEngine::new(), Arc::new(FakeBuild::default()));

    let mut args = launch_args(&project);
    args.runtime_executable = None;
    args.krom = None;

    let err = adapter.launch(args).await.unwrap_err();
    assert!(matches!(&err, AdapterError::SpawnFailed(message) if message == "Can't find Krom."));
    assert_eq!(adapter.engine().terminate_reasons, vec!["Can't find Krom.".to_owned()]);
    assert!(adapter.engine().attach_targets.is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn spawn_errors_terminate_the_session() {
    use std::os::unix::fs::PermissionsExt;

    let project = TempDir::new().unwrap();
    let not_executable = project.path().join("Krom");
    std::fs::write(&not_executable, "not a program").unwrap();
    std::fs::set_permissions(&not_executable, std::fs::Permissions::from_mode(0o644)).unwrap();

    let mut adapter = adapter(FakeEngine::new(), Arc::new(FakeBuild::default()));
    let mut args = launch_args(&project);
    args.runtime_executable = Some(not_executable);

    let err = adapter.launch(args).await.unwrap_err();
    let AdapterError::SpawnFailed(message) = err else {
        panic!("expected a spawn failure, got {err:?}");
    };
    assert!(message.starts_with("Krom error: "), "{message}");
    assert_eq!(adapter.engine().terminate_reasons, vec![message]);
    assert!(adapter.engine().attach_targets.is_empty());
}

#[tokio::test]
async fn port_and_attach_timeout_default_from_config() {
    let project = TempDir::new().unwrap();
    let config = KromConfig::load_from_str(
        r#"
[adapter]
port_range_start = 30000
port_range_end = 30100
attach_timeout_ms = 1234
"#,
    )
    .unwrap();
    let mut adapter = adapter_with_config(FakeEngine::new(), Arc::new(FakeBuild::default()), &config);

    adapter.launch(launch_args(&project)).await.unwrap();

    let target = adapter.engine().attach_targets[0].clone();
    assert!((30000..30100).contains(&target.port), "{}", target.port);
    assert_eq!(target.timeout, Duration::from_millis(1234));

    let argv = krom_argv(&project).await;
    assert_eq!(argv[3], target.port.to_string());

    adapter.disconnect().await;
}

#[tokio::test]
async fn port_zero_picks_a_port_from_the_configured_range() {
    let project = TempDir::new().unwrap();
    let config = KromConfig::load_from_str(
        r#"
[adapter]
port_range_start = 31000
port_range_end = 31010
"#,
    )
    .unwrap();
    let mut adapter = adapter_with_config(FakeEngine::new(), Arc::new(FakeBuild::default()), &config);

    let mut args = launch_args(&project);
    args.port = Some(0);
    adapter.launch(args).await.unwrap();

    let port = adapter.engine().attach_targets[0].port;
    assert!((31000..31010).contains(&port), "{port}");
    let argv = krom_argv(&project).await;
    assert_eq!(argv[3], port.to_string());

    adapter.disconnect().await;
}

#[tokio::test]
async fn krom_exiting_on_its_own_ends_the_session() {
    let project = TempDir::new().unwrap();
    let mut adapter = adapter(FakeEngine::new(), Arc::new(FakeBuild::default()));

    let mut args = launch_args(&project);
    args.no_debug = true;
    args.runtime_args = vec!["--sleep-ms".to_owned(), "50".to_owned()];
    adapter.launch(args).await.unwrap();

    let exit = tokio::time::timeout(Duration::from_secs(10), adapter.wait_for_debuggee_exit())
        .await
        .expect("Krom exits after its sleep")
        .expect("exit of a direct spawn is observed");
    assert_eq!(exit, ProcessExit::Exited { code: Some(0) });
    assert!(adapter.supervisor().handle().is_none());

    adapter.on_debuggee_exit(&exit).await;
    assert_eq!(
        adapter.engine().terminate_reasons,
        vec!["Krom exited with code 0.".to_owned()]
    );
    assert!(adapter.wait_for_debuggee_exit().await.is_none());

    adapter.disconnect().await;
}

#[tokio::test]
async fn runtime_args_follow_the_krom_arguments() {
    let project = TempDir::new().unwrap();
    let mut adapter = adapter(FakeEngine::new(), Arc::new(FakeBuild::default()));

    let mut args = launch_args(&project);
    args.no_debug = true;
    args.runtime_args = vec!["--sleep-ms".to_owned(), "30000".to_owned()];
    adapter.launch(args).await.unwrap();

    let argv = krom_argv(&project).await;
    assert_eq!(&argv[2..], ["--debug", argv[3].as_str(), "--watch", "--sleep-ms", "30000"]);

    adapter.disconnect().await;
}

#[tokio::test]
async fn attach_that_never_completes_times_out() {
    let project = TempDir::new().unwrap();
    let mut engine = FakeEngine::new();
    engine.attach_delay = Some(Duration::from_secs(60));
    let mut adapter = adapter(engine, Arc::new(FakeBuild::default()));

    let mut args = launch_args(&project);
    args.timeout = Some(50);
    let err = adapter.launch(args).await.unwrap_err();
    let AdapterError::AttachTimeout(timeout) = err else {
        panic!("expected an attach timeout, got {err:?}");
    };
    assert_eq!(timeout, Duration::from_millis(50));

    adapter.disconnect().await;
}
