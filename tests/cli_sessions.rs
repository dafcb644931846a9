// Exercises the `sessions list`/`sessions prune` subcommands against the
// compiled binary, including config resolution via `$PICOCLAW_CONFIG_PATH`.

use assert_cmd::Command;
use tempfile::tempdir;

fn write_config(dir: &std::path::Path, storage_dir: &std::path::Path) -> std::path::PathBuf {
    let config_path = dir.join("picoclaw.toml");
    std::fs::write(
        &config_path,
        format!("[session]\nstorage_dir = {:?}\nbacklog_limit = 20\n", storage_dir.display().to_string()),
    )
    .unwrap();
    config_path
}

#[test]
fn list_reports_no_sessions_for_an_empty_scope() {
    let dir = tempdir().unwrap();
    let storage_dir = dir.path().join("sessions");
    let config_path = write_config(dir.path(), &storage_dir);

    let mut cmd = Command::cargo_bin("picoclaw").unwrap();
    let output = cmd
        .env("PICOCLAW_CONFIG_PATH", &config_path)
        .arg("sessions")
        .arg("list")
        .arg("--scope")
        .arg("agent:main:cli:u1")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let text = String::from_utf8(output).unwrap();
    assert!(text.contains("No sessions found"), "unexpected output: {text}");
}

#[test]
fn list_and_prune_reflect_sessions_created_through_the_library() {
    let dir = tempdir().unwrap();
    let storage_dir = dir.path().join("sessions");
    let config_path = write_config(dir.path(), &storage_dir);
    let scope = "agent:main:cli:u1";

    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(async {
        let manager = picoclaw::session::SessionManager::open(storage_dir.display().to_string()).await.unwrap();
        manager.resolve_active(scope).await.unwrap();
        manager.start_new(scope).await.unwrap();
        manager.start_new(scope).await.unwrap();
    });

    let mut list_cmd = Command::cargo_bin("picoclaw").unwrap();
    let list_output = list_cmd
        .env("PICOCLAW_CONFIG_PATH", &config_path)
        .arg("sessions")
        .arg("list")
        .arg("--scope")
        .arg(scope)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let list_text = String::from_utf8(list_output).unwrap();
    assert_eq!(list_text.lines().count(), 3, "expected three sessions listed, got: {list_text}");

    let mut prune_cmd = Command::cargo_bin("picoclaw").unwrap();
    let prune_output = prune_cmd
        .env("PICOCLAW_CONFIG_PATH", &config_path)
        .arg("sessions")
        .arg("prune")
        .arg("--scope")
        .arg(scope)
        .arg("--limit")
        .arg("2")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let prune_text = String::from_utf8(prune_output).unwrap();
    assert!(prune_text.contains("Pruned 1 session"), "unexpected output: {prune_text}");
}
