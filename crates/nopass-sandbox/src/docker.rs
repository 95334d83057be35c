//! Docker-backed executor.
//!
//! Every call gets a fresh, single-use container:
//!
//! 1. the prompt pair is written to a new temp directory
//!    (`system.txt`, `user.txt`)
//! 2. `docker run --rm --network none` mounts that directory read-only at
//!    `/app/input` and runs the model image
//! 3. stdout is the answer, stderr is kept for diagnostics
//! 4. the container and the temp directory are removed whatever happens
//!
//! If the budget elapses, or the caller drops the future, the docker CLI
//! process is killed and the named container is force-removed, since
//! killing the CLI alone does not stop a running container.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use nopass_firewall::SandboxPrompt;
use tokio::process::Command;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DispatchError, Result};
use crate::executor::{effective_budget, Executor};

/// File name of the system prompt inside the input mount.
pub const SYSTEM_FILE: &str = "system.txt";
/// File name of the user content inside the input mount.
pub const USER_FILE: &str = "user.txt";

/// Configuration for [`DockerExecutor`].
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use nopass_sandbox::SandboxConfig;
///
/// let config = SandboxConfig::new()
///     .with_image("my-llm:1.2")
///     .with_timeout(Duration::from_secs(10));
/// assert_eq!(config.image, "my-llm:1.2");
/// ```
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Docker CLI binary.
    pub docker_bin: String,
    /// Model image.
    pub image: String,
    /// Hard limit for one execution.
    pub timeout: Duration,
    /// Where the input directory is mounted inside the container.
    pub mount_point: String,
    /// Container memory limit (docker syntax, e.g. `2g`).
    pub memory: String,
    /// Container process limit.
    pub pids_limit: u32,
}

impl SandboxConfig {
    /// Creates a new config with default values.
    ///
    /// Defaults:
    /// - Image: `nopass-llm-sandbox:latest`
    /// - Timeout: 15 seconds
    /// - Mount point: `/app/input`
    /// - Memory: `2g`, pids limit: 128
    #[must_use]
    pub fn new() -> Self {
        Self {
            docker_bin: "docker".to_string(),
            image: "nopass-llm-sandbox:latest".to_string(),
            timeout: Duration::from_secs(15),
            mount_point: "/app/input".to_string(),
            memory: "2g".to_string(),
            pids_limit: 128,
        }
    }

    /// Sets the model image.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// Sets the execution timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the docker binary.
    #[must_use]
    pub fn with_docker_bin(mut self, bin: impl Into<String>) -> Self {
        self.docker_bin = bin.into();
        self
    }

    /// Sets the container memory limit.
    #[must_use]
    pub fn with_memory(mut self, memory: impl Into<String>) -> Self {
        self.memory = memory.into();
        self
    }

    /// Sets the container process limit.
    #[must_use]
    pub fn with_pids_limit(mut self, limit: u32) -> Self {
        self.pids_limit = limit;
        self
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs prompts in a network-less, read-only, single-use container.
#[derive(Debug, Clone)]
pub struct DockerExecutor {
    config: SandboxConfig,
}

impl DockerExecutor {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Arguments for `docker` (excluding the binary itself).
    pub fn run_args(&self, container: &str, input_dir: &Path) -> Vec<String> {
        vec![
            "run".to_string(),
            "--rm".to_string(),
            "--name".to_string(),
            container.to_string(),
            "--network".to_string(),
            "none".to_string(),
            "--read-only".to_string(),
            "--cap-drop".to_string(),
            "ALL".to_string(),
            "--security-opt".to_string(),
            "no-new-privileges".to_string(),
            "--pids-limit".to_string(),
            self.config.pids_limit.to_string(),
            "--memory".to_string(),
            self.config.memory.clone(),
            "-v".to_string(),
            format!("{}:{}:ro", input_dir.display(), self.config.mount_point),
            self.config.image.clone(),
        ]
    }
}

/// Write both prompt artifacts into `dir`, owner-readable only.
pub fn write_inputs(dir: &Path, prompt: &SandboxPrompt) -> std::io::Result<()> {
    write_private(&dir.join(SYSTEM_FILE), prompt.system_prompt())?;
    write_private(&dir.join(USER_FILE), prompt.user_content())?;
    Ok(())
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents.as_bytes())
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    std::fs::write(path, contents)
}

/// Force-removes the container when dropped while armed.
struct ContainerGuard {
    docker_bin: String,
    name: String,
    armed: bool,
}

impl ContainerGuard {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ContainerGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let bin = std::mem::take(&mut self.docker_bin);
        let name = std::mem::take(&mut self.name);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    remove_container(&bin, &name).await;
                });
            }
            Err(_) => {
                let _ = std::process::Command::new(&bin)
                    .args(["rm", "-f", &name])
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status();
            }
        }
    }
}

async fn remove_container(bin: &str, name: &str) {
    let result = Command::new(bin)
        .args(["rm", "-f", name])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    match result {
        Ok(status) if status.success() => debug!(container = %name, "sandbox container removed"),
        Ok(status) => debug!(container = %name, %status, "sandbox container removal returned nonzero"),
        Err(e) => warn!(container = %name, error = %e, "failed to remove sandbox container"),
    }
}

#[async_trait]
impl Executor for DockerExecutor {
    async fn execute(&self, prompt: &SandboxPrompt, deadline: Instant) -> Result<String> {
        let budget = effective_budget(self.config.timeout, deadline, Instant::now()).ok_or(
            DispatchError::Timeout {
                budget: Duration::ZERO,
            },
        )?;

        let input_dir = tempfile::Builder::new()
            .prefix("nopass-llm-input-")
            .tempdir()
            .map_err(|e| DispatchError::setup("create input dir", e))?;
        write_inputs(input_dir.path(), prompt)
            .map_err(|e| DispatchError::setup("write prompt files", e))?;

        let container = format!("nopass-{}", Uuid::new_v4());
        debug!(container = %container, budget = ?budget, image = %self.config.image, "starting sandbox");

        let child = Command::new(&self.config.docker_bin)
            .args(self.run_args(&container, input_dir.path()))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DispatchError::setup("spawn sandbox", e))?;

        let mut guard = ContainerGuard {
            docker_bin: self.config.docker_bin.clone(),
            name: container.clone(),
            armed: true,
        };

        let output = match tokio::time::timeout(budget, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(DispatchError::setup("wait for sandbox", e)),
            Err(_) => {
                warn!(container = %container, budget = ?budget, "sandbox timed out, tearing down");
                return Err(DispatchError::Timeout { budget });
            }
        };

        // --rm already removed the container once the process exited
        guard.disarm();

        if !output.status.success() {
            return Err(DispatchError::failure(
                format!("sandbox exited with {}", output.status),
                String::from_utf8_lossy(&output.stderr),
            ));
        }

        debug!(container = %container, bytes = output.stdout.len(), "sandbox finished");
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn name(&self) -> &'static str {
        "docker"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nopass_firewall::{IsolationInput, PromptFirewall};

    fn prompt() -> SandboxPrompt {
        PromptFirewall::new().build_prompt(&IsolationInput {
            user_message: "hello",
            assessment: None,
            external: &[],
            user_id: "u1",
            session_id: "s1",
        })
    }

    #[test]
    fn test_default_config() {
        let config = SandboxConfig::default();
        assert_eq!(config.image, "nopass-llm-sandbox:latest");
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert_eq!(config.mount_point, "/app/input");
    }

    #[test]
    fn test_run_args_isolation() {
        let executor = DockerExecutor::new(SandboxConfig::new().with_image("img:1"));
        let args = executor.run_args("nopass-x", Path::new("/tmp/in"));
        let joined = args.join(" ");

        assert_eq!(args[0], "run");
        assert!(joined.contains("--rm"));
        assert!(joined.contains("--network none"));
        assert!(joined.contains("--read-only"));
        assert!(joined.contains("--cap-drop ALL"));
        assert!(joined.contains("--name nopass-x"));
        assert!(joined.contains("-v /tmp/in:/app/input:ro"));
        assert_eq!(args.last().unwrap(), "img:1");
    }

    #[test]
    fn test_write_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let prompt = prompt();
        write_inputs(dir.path(), &prompt).unwrap();

        let system = std::fs::read_to_string(dir.path().join(SYSTEM_FILE)).unwrap();
        let user = std::fs::read_to_string(dir.path().join(USER_FILE)).unwrap();
        assert_eq!(system, prompt.system_prompt());
        assert_eq!(user, prompt.user_content());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(dir.path().join(USER_FILE))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[tokio::test]
    async fn test_expired_deadline_is_timeout() {
        let executor = DockerExecutor::new(SandboxConfig::new().with_docker_bin("false"));
        let err = executor.execute(&prompt(), Instant::now()).await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stdout_is_answer() {
        // echo stands in for docker: the "answer" is the argument list
        let executor = DockerExecutor::new(SandboxConfig::new().with_docker_bin("echo"));
        let answer = executor
            .execute(&prompt(), Instant::now() + Duration::from_secs(5))
            .await
            .unwrap();
        assert!(answer.starts_with("run --rm --name nopass-"));
        assert!(answer.contains("--network none"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let executor = DockerExecutor::new(SandboxConfig::new().with_docker_bin("false"));
        let err = executor
            .execute(&prompt(), Instant::now() + Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::ExecutionFailure { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_tears_down_container() {
        use std::os::unix::fs::PermissionsExt;

        let bin_dir = tempfile::tempdir().unwrap();
        let log = bin_dir.path().join("calls.log");
        let script = bin_dir.path().join("docker");
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\necho \"$*\" >> '{}'\nif [ \"$1\" = run ]; then exec sleep 30; fi\nexit 0\n",
                log.display()
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let budget = Duration::from_millis(300);
        let executor = DockerExecutor::new(
            SandboxConfig::new()
                .with_docker_bin(script.display().to_string())
                .with_timeout(budget),
        );

        let started = std::time::Instant::now();
        let err = executor
            .execute(&prompt(), Instant::now() + Duration::from_secs(30))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Timeout { budget: b } if b == budget));
        assert!(started.elapsed() < budget + Duration::from_secs(5));

        // removal runs on a spawned task; give it a moment
        let mut calls = String::new();
        for _ in 0..50 {
            calls = std::fs::read_to_string(&log).unwrap_or_default();
            if calls.contains("rm -f") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        let run_line = calls
            .lines()
            .find(|line| line.starts_with("run "))
            .expect("docker run was invoked");
        let args: Vec<&str> = run_line.split_whitespace().collect();
        let name = args[args.iter().position(|a| *a == "--name").unwrap() + 1];
        assert!(name.starts_with("nopass-"));
        assert!(
            calls.lines().any(|line| line == format!("rm -f {}", name)),
            "no removal recorded in {:?}",
            calls
        );

        let mount = args[args.iter().position(|a| *a == "-v").unwrap() + 1];
        let input_dir = mount.trim_end_matches(":/app/input:ro");
        assert!(input_dir.contains("nopass-llm-input-"));
        assert!(!Path::new(input_dir).exists());
    }

    #[tokio::test]
    async fn test_missing_binary_is_failure() {
        let executor = DockerExecutor::new(
            SandboxConfig::new().with_docker_bin("/nonexistent/nopass-docker"),
        );
        let err = executor
            .execute(&prompt(), Instant::now() + Duration::from_secs(5))
            .await
            .unwrap_err();
        match err {
            DispatchError::ExecutionFailure { reason, .. } => assert!(reason.contains("spawn")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
