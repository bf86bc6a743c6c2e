//! End-to-end lifecycle flow against a real on-disk module tree.

use std::sync::Arc;
use std::time::Duration;

use patchboard::dispatch::CommandDispatcher;
use patchboard::files;
use patchboard::registry::ModuleRegistry;

#[cfg(unix)]
fn install_script(root: &std::path::Path, name: &str, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    let dir = root.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    let script = dir.join(format!("{}.sh", name));
    std::fs::write(&script, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
}

fn dispatcher_for(
    root: &std::path::Path,
    names: &[&str],
) -> (Arc<ModuleRegistry>, CommandDispatcher) {
    let registry = Arc::new(ModuleRegistry::new(root, names.iter().copied()));
    let dispatcher = CommandDispatcher::new(registry.clone());
    (registry, dispatcher)
}

#[cfg(unix)]
#[tokio::test]
async fn full_lifecycle_start_status_stop() {
    let dir = tempfile::tempdir().unwrap();
    install_script(
        dir.path(),
        "redis",
        "case \"$1\" in\n\
         \tstart) echo started ;;\n\
         \tstatus) echo running ;;\n\
         \tstop) echo stopped ;;\n\
         \trestart) echo restarted ;;\n\
         esac",
    );
    let (_registry, dispatcher) = dispatcher_for(dir.path(), &["redis"]);

    for (verb, expected) in [
        ("start", "started\n"),
        ("status", "running\n"),
        ("restart", "restarted\n"),
        ("stop", "stopped\n"),
    ] {
        let result = dispatcher.execute("redis", verb).await;
        assert!(result.success, "verb '{}' should succeed", verb);
        assert_eq!(result.output, expected);
    }
}

#[cfg(unix)]
#[tokio::test]
async fn script_sees_the_config_written_through_the_collaborator() {
    let dir = tempfile::tempdir().unwrap();
    install_script(dir.path(), "buffer", "cat \"$(dirname \"$0\")/buffer.ini\"");
    let (registry, dispatcher) = dispatcher_for(dir.path(), &["buffer"]);

    let module = registry.resolve("buffer").unwrap();
    let ini = "[general]\ndelay = 0.05\n";
    files::write_config(module, ini).unwrap();

    let result = dispatcher.execute("buffer", "status").await;
    assert!(result.success);
    assert_eq!(result.output, ini);
}

#[cfg(unix)]
#[tokio::test]
async fn log_written_by_the_script_is_readable() {
    let dir = tempfile::tempdir().unwrap();
    install_script(
        dir.path(),
        "heartrate",
        "echo \"module started\" >> \"$(dirname \"$0\")/heartrate.log\"",
    );
    let (registry, dispatcher) = dispatcher_for(dir.path(), &["heartrate"]);

    assert_eq!(
        files::read_log(registry.resolve("heartrate").unwrap()).unwrap(),
        None
    );

    let result = dispatcher.execute("heartrate", "start").await;
    assert!(result.success);

    let log = files::read_log(registry.resolve("heartrate").unwrap())
        .unwrap()
        .expect("log should exist after start");
    assert!(log.contains("module started"));
}

#[cfg(unix)]
#[tokio::test]
async fn concurrent_dispatches_run_independently() {
    let dir = tempfile::tempdir().unwrap();
    install_script(dir.path(), "alpha", "echo alpha");
    install_script(dir.path(), "beta", "echo beta");
    let registry = Arc::new(ModuleRegistry::new(dir.path(), ["alpha", "beta"]));
    let dispatcher = Arc::new(CommandDispatcher::with_timeout(
        registry,
        Duration::from_millis(2000),
    ));

    let mut handles = Vec::new();
    for name in ["alpha", "beta", "alpha", "beta"] {
        let dispatcher = dispatcher.clone();
        handles.push(tokio::spawn(
            async move { dispatcher.execute(name, "status").await },
        ));
    }

    for handle in handles {
        let result = handle.await.unwrap();
        assert!(result.success);
    }
}

#[tokio::test]
async fn unvalidated_names_never_reach_the_filesystem() {
    let dir = tempfile::tempdir().unwrap();
    let (_registry, dispatcher) = dispatcher_for(dir.path(), &["redis"]);

    for name in ["../../etc/passwd", "redis/../other", "unknown"] {
        let result = dispatcher.execute(name, "start").await;
        assert!(!result.success);
        assert_eq!(result.output, format!("failed {}", name));
    }
}
