use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::LazyLock;

use serde_json::Value;
use tempfile::TempDir;

pub const ADMIN_EMAIL: &str = "admin@example.com";

pub struct TestServer {
    pub temp_dir: TempDir,
    pub base_url: String,
    pub admin_token: String,
    server_process: Option<Child>,
}

static BUILD_RELEASE: LazyLock<()> = LazyLock::new(|| {
    let build_status = Command::new("cargo")
        .args(["build", "--release"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .expect("build release binary");
    assert!(build_status.success(), "Failed to build release binary");
});

impl TestServer {
    pub async fn start() -> Self {
        LazyLock::force(&BUILD_RELEASE);

        let temp_dir = TempDir::new().expect("create temp dir");
        let data_dir = temp_dir.path();
        let binary = Path::new(env!("CARGO_MANIFEST_DIR")).join("target/release/storyconnect");

        let init_output = Command::new(&binary)
            .args(["admin", "init", "--data-dir"])
            .arg(data_dir)
            .args(["--email", ADMIN_EMAIL, "--non-interactive"])
            .output()
            .expect("run init");
        assert!(
            init_output.status.success(),
            "Failed to initialize database"
        );

        let admin_password = extract_generated_password(&init_output.stdout);

        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        drop(listener);

        let base_url = format!("http://127.0.0.1:{}", port);

        let server_process = Command::new(&binary)
            .args(["serve", "--data-dir"])
            .arg(data_dir)
            .args(["--host", "127.0.0.1", "--port"])
            .arg(port.to_string())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("start server");

        Self::wait_for_ready(&base_url).await;

        let admin_token = signin(&base_url, ADMIN_EMAIL, &admin_password).await;

        Self {
            temp_dir,
            base_url,
            admin_token,
            server_process: Some(server_process),
        }
    }

    async fn wait_for_ready(base_url: &str) {
        let client = reqwest::Client::new();
        for _ in 0..50 {
            if client
                .get(format!("{}/health", base_url))
                .send()
                .await
                .is_ok()
            {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
        panic!("Server did not become ready");
    }

    pub fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(mut process) = self.server_process.take() {
            let _ = process.kill();
            let _ = process.wait();
        }
    }
}

/// `admin init --non-interactive` prints the generated password on the
/// only indented line of its banner.
fn extract_generated_password(stdout: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    stdout
        .lines()
        .filter(|line| line.starts_with("  "))
        .map(str::trim)
        .find(|line| !line.is_empty())
        .expect("generated password in init output")
        .to_string()
}

pub async fn signin(base_url: &str, email: &str, password: &str) -> String {
    let client = reqwest::Client::new();
    let resp: Value = client
        .post(format!("{}/api/v1/auth/signin", base_url))
        .json(&serde_json::json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("signin")
        .json()
        .await
        .expect("parse signin response");
    resp["data"]["token"]
        .as_str()
        .expect("session token")
        .to_string()
}

/// Registers an account with the given starting role and returns
/// (token, user_id).
pub async fn signup(base_url: &str, email: &str, role: &str) -> (String, String) {
    let client = reqwest::Client::new();
    let resp: Value = client
        .post(format!("{}/api/v1/auth/signup", base_url))
        .json(&serde_json::json!({
            "email": email,
            "password": "correct-horse-battery",
            "display_name": "Test User",
            "role": role,
        }))
        .send()
        .await
        .expect("signup")
        .json()
        .await
        .expect("parse signup response");
    let token = resp["data"]["token"]
        .as_str()
        .expect("session token")
        .to_string();
    let user_id = resp["data"]["user"]["id"]
        .as_str()
        .expect("user id")
        .to_string();
    (token, user_id)
}
