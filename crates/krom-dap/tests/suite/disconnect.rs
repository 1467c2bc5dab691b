use std::sync::Arc;

use tempfile::TempDir;

use super::{adapter, launch_args, FakeBuild, FakeEngine};

#[tokio::test]
async fn disconnect_without_a_launch_only_closes_the_build() {
    let build = Arc::new(FakeBuild::default());
    let mut adapter = adapter(FakeEngine::new(), build.clone());

    adapter.disconnect().await;
    adapter.disconnect().await;

    assert_eq!(build.close_count(), 2);
    assert_eq!(adapter.engine().hooks, vec!["disconnect", "disconnect"]);
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn client_disconnect_kills_krom() {
    use super::{krom_pid, wait_until_gone};

    let project = TempDir::new().unwrap();
    let build = Arc::new(FakeBuild::default());
    let mut adapter = adapter(FakeEngine::new(), build.clone());

    adapter.launch(launch_args(&project)).await.unwrap();
    let pid = krom_pid(&project).await;

    adapter.disconnect().await;

    assert!(wait_until_gone(pid).await, "Krom (pid {pid}) survived disconnect");
    assert!(adapter.supervisor().handle().is_none());
    assert_eq!(build.close_count(), 1);
    assert_eq!(adapter.engine().hooks.last(), Some(&"disconnect"));
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn disconnect_after_the_debuggee_ended_the_session_leaves_krom_alone() {
    use std::time::Duration;

    use super::{krom_pid, process_is_gone, wait_until_gone};

    let project = TempDir::new().unwrap();
    let build = Arc::new(FakeBuild::default());
    let mut adapter = adapter(FakeEngine::new(), build.clone());

    adapter.launch(launch_args(&project)).await.unwrap();
    let pid = krom_pid(&project).await;

    adapter.engine_mut().terminated = true;
    adapter.disconnect().await;

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!process_is_gone(pid), "Krom was killed");
    assert!(adapter.supervisor().handle().is_none());
    assert_eq!(build.close_count(), 1);

    // SAFETY: plain syscall on the pid the fixture reported for itself.
    unsafe {
        libc::kill(pid as libc::pid_t, libc::SIGKILL);
    }
    assert!(wait_until_gone(pid).await);
}
