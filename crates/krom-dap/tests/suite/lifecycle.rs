use std::sync::Arc;

use krom_core::{AttachArgs, CommonArgs, PathMapping, SourceMapPathOverrides};
use krom_dap::{AdapterError, InitializeArgs, KROM_THREAD_NAME};

use super::{adapter, FakeBuild, FakeEngine};

#[tokio::test]
async fn initialize_advertises_restart() {
    let mut adapter = adapter(FakeEngine::new(), Arc::new(FakeBuild::default()));
    let capabilities = adapter
        .initialize(&InitializeArgs::default())
        .await
        .unwrap();

    assert!(capabilities.supports_restart_request);
    assert!(capabilities.supports_configuration_done_request);
    assert!(adapter.overlay().is_some());
    assert_eq!(adapter.thread_name(), KROM_THREAD_NAME);
    assert_eq!(KROM_THREAD_NAME, "Krom");
}

#[tokio::test]
async fn attach_uses_url_filter_as_the_target_url() {
    let mut adapter = adapter(FakeEngine::new(), Arc::new(FakeBuild::default()));

    adapter
        .attach(AttachArgs {
            port: 9222,
            url: Some("http://other".to_owned()),
            url_filter: Some("http://krom/*".to_owned()),
            ..AttachArgs::default()
        })
        .await
        .unwrap();

    let engine = adapter.engine();
    assert_eq!(engine.attach_args[0].url.as_deref(), Some("http://krom/*"));
    assert_eq!(engine.attach_targets[0].port, 9222);
    assert_eq!(engine.attach_targets[0].target_url, "http://krom/*");
    assert_eq!(engine.hooks, vec!["common_args", "attach", "do_attach"]);
}

#[tokio::test]
async fn attach_without_a_filter_keeps_the_url() {
    let mut adapter = adapter(FakeEngine::new(), Arc::new(FakeBuild::default()));

    adapter
        .attach(AttachArgs {
            port: 9222,
            url: Some("http://krom/index.html".to_owned()),
            ..AttachArgs::default()
        })
        .await
        .unwrap();

    assert_eq!(
        adapter.engine().attach_targets[0].target_url,
        "http://krom/index.html"
    );
}

#[tokio::test]
async fn common_args_fill_in_krom_defaults() {
    let mut adapter = adapter(FakeEngine::new(), Arc::new(FakeBuild::default()));

    let mut args = CommonArgs {
        path_mapping: Some(PathMapping::from([("/".to_owned(), "/proj/web".to_owned())])),
        skip_file_regexps: vec!["node_modules".to_owned()],
        ..CommonArgs::default()
    };
    adapter.common_args(&mut args).await.unwrap();

    assert_eq!(args.web_root.as_deref(), Some("/proj/web"));
    assert_eq!(args.source_maps, Some(true));
    assert_eq!(args.skip_file_regexps, vec!["^chrome-extension:.*".to_owned()]);

    let overrides = args.source_map_path_overrides.as_ref().unwrap();
    assert_eq!(overrides.len(), 5);
    assert_eq!(overrides["webpack:///./*"], "/proj/web/*");
    assert_eq!(overrides["webpack:///*"], "*");

    assert_eq!(adapter.engine().common_args, vec![args]);
}

#[tokio::test]
async fn common_args_keep_explicit_settings() {
    let mut adapter = adapter(FakeEngine::new(), Arc::new(FakeBuild::default()));

    let mut args = CommonArgs {
        web_root: Some("/explicit".to_owned()),
        path_mapping: Some(PathMapping::from([("/".to_owned(), "/mapped".to_owned())])),
        source_maps: Some(false),
        source_map_path_overrides: Some(SourceMapPathOverrides::from([(
            "krom:///*".to_owned(),
            "${webRoot}/src/*".to_owned(),
        )])),
        ..CommonArgs::default()
    };
    adapter.common_args(&mut args).await.unwrap();

    assert_eq!(args.web_root.as_deref(), Some("/explicit"));
    assert_eq!(args.source_maps, Some(false));
    let overrides = args.source_map_path_overrides.unwrap();
    assert_eq!(overrides.len(), 1);
    assert_eq!(overrides["krom:///*"], "/explicit/src/*");
}

#[tokio::test]
async fn restart_reloads_ignoring_the_cache() {
    let engine = FakeEngine::attached();
    let transport = engine.transport.clone();
    let mut adapter = adapter(engine, Arc::new(FakeBuild::default()));

    adapter.restart().await.unwrap();

    let reloads = transport.reloads.lock();
    assert_eq!(reloads.len(), 1);
    assert!(reloads[0].ignore_cache);
}

#[tokio::test]
async fn cdp_calls_need_a_connection() {
    let mut adapter = adapter(FakeEngine::new(), Arc::new(FakeBuild::default()));

    assert!(matches!(
        adapter.restart().await,
        Err(AdapterError::NotAttached)
    ));
    assert!(matches!(
        adapter.run_script("1 + 1", "repl.js").await,
        Err(AdapterError::NotAttached)
    ));
}

#[tokio::test]
async fn run_script_compiles_then_runs_in_the_krom_context() {
    let engine = FakeEngine::attached();
    let transport = engine.transport.clone();
    let mut adapter = adapter(engine, Arc::new(FakeBuild::default()));

    let result = adapter.run_script("1 + 1", "repl.js").await.unwrap();
    assert_eq!(result.result["value"], 2);

    let compiled = transport.compiled.lock();
    assert_eq!(compiled.len(), 1);
    assert!(compiled[0].persist_script);
    assert_eq!(compiled[0].execution_context_id, 1);
    assert_eq!(compiled[0].source_url, "repl.js");

    let ran = transport.ran.lock();
    assert_eq!(ran.len(), 1);
    assert_eq!(ran[0].script_id, "42");
    assert_eq!(ran[0].execution_context_id, 1);
}

#[tokio::test]
async fn run_script_reports_compile_errors() {
    let engine = FakeEngine::attached();
    let transport = engine.transport.clone();
    let mut adapter = adapter(engine, Arc::new(FakeBuild::default()));

    let err = adapter
        .run_script("syntax error (", "broken.js")
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::ScriptCompile(_)));
    assert!(transport.ran.lock().is_empty());
}

#[tokio::test]
async fn console_entries_are_subscribed_after_attach() {
    let engine = FakeEngine::new();
    let transport = engine.transport.clone();
    let mut adapter = adapter(engine, Arc::new(FakeBuild::default()));

    adapter
        .attach(AttachArgs {
            port: 9222,
            ..AttachArgs::default()
        })
        .await
        .unwrap();

    let handlers = transport.log_handlers.lock();
    assert_eq!(handlers.len(), 1);
    handlers[0](krom_dap::cdp::LogEntry {
        source: "javascript".to_owned(),
        level: "info".to_owned(),
        text: "hello from Krom".to_owned(),
        url: None,
    });
}
