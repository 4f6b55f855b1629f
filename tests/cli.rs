use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn storyconnect() -> Command {
    Command::cargo_bin("storyconnect").expect("binary under test")
}

#[test]
fn init_bootstraps_an_admin_account() {
    let dir = TempDir::new().expect("temp dir");

    storyconnect()
        .args(["admin", "init", "--non-interactive"])
        .args(["--email", "root@example.com"])
        .arg("--data-dir")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Admin account created: root@example.com"))
        .stdout(predicate::str::contains("Generated password"));

    assert!(dir.path().join("storyconnect.db").exists());
}

#[test]
fn init_refuses_to_run_twice() {
    let dir = TempDir::new().expect("temp dir");

    storyconnect()
        .args(["admin", "init", "--non-interactive"])
        .args(["--email", "root@example.com"])
        .arg("--data-dir")
        .arg(dir.path())
        .assert()
        .success();

    storyconnect()
        .args(["admin", "init", "--non-interactive"])
        .args(["--email", "root2@example.com"])
        .arg("--data-dir")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn init_non_interactive_requires_an_email() {
    let dir = TempDir::new().expect("temp dir");

    storyconnect()
        .args(["admin", "init", "--non-interactive"])
        .arg("--data-dir")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("--email is required"));
}

#[test]
fn serve_refuses_an_uninitialized_data_dir() {
    let dir = TempDir::new().expect("temp dir");

    storyconnect()
        .args(["serve", "--port", "0", "--data-dir"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}
