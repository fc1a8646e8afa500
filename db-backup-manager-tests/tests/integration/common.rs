//! Common utilities for integration tests
//!
//! Cleanup guards, readiness polling, and a helper that runs the real
//! resolver and pipeline against a configuration.

use anyhow::Result;
use chrono::Local;
use db_backup_manager::managers::logging::TracingLogger;
use db_backup_manager::resolver::{BackendResolver, DeclarativeSelection};
use db_backup_manager::utils::executor::RealExecutor;
use std::process::Command as Process;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use test_utils::{BackupJob, Command, Config, JobState, Pipeline};

/// Guard that ensures Docker container cleanup on drop (even on panic)
pub struct ContainerGuard {
    name: String,
}

impl ContainerGuard {
    pub fn new(name: &str) -> Self {
        // Leftover from an aborted run
        cleanup_container(name);
        Self {
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for ContainerGuard {
    fn drop(&mut self) {
        cleanup_container(&self.name);
    }
}

/// Helper to stop and remove a Docker container
/// The -v flag also removes anonymous volumes associated with the container
fn cleanup_container(name: &str) {
    let _ = Process::new("docker").args(["stop", name]).output();
    let _ = Process::new("docker").args(["rm", "-v", name]).output();
}

/// Docker daemon reachable and the engine's client tools on PATH
pub fn tools_available(programs: &[&str]) -> bool {
    let docker = Process::new("docker")
        .arg("ps")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false);
    docker && programs.iter().all(|p| which::which(p).is_ok())
}

/// Start a detached container publishing `host_port` to `container_port`
pub fn start_container(
    guard: &ContainerGuard,
    image: &str,
    host_port: u16,
    container_port: u16,
    env: &[&str],
) -> Result<()> {
    let publish = format!("{}:{}", host_port, container_port);
    let mut cmd = Process::new("docker");
    cmd.args(["run", "-d", "--name", guard.name(), "-p", publish.as_str()]);
    for var in env {
        cmd.args(["-e", *var]);
    }
    let output = cmd.arg(image).output()?;
    if !output.status.success() {
        anyhow::bail!(
            "docker run {} failed: {}",
            image,
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(())
}

/// Poll `docker exec <container> <probe...>` until it succeeds
pub fn wait_until_ready(guard: &ContainerGuard, probe: &[&str]) -> Result<()> {
    for _ in 0..60 {
        let ready = Process::new("docker")
            .arg("exec")
            .arg(guard.name())
            .args(probe)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false);
        if ready {
            // Servers accept local socket connections before TCP
            thread::sleep(Duration::from_secs(2));
            return Ok(());
        }
        thread::sleep(Duration::from_secs(1));
    }
    anyhow::bail!("Container {} failed to become ready", guard.name())
}

/// Run `docker exec` and return trimmed stdout
pub fn docker_exec(guard: &ContainerGuard, args: &[&str]) -> Result<String> {
    let output = Process::new("docker")
        .arg("exec")
        .arg(guard.name())
        .args(args)
        .output()?;
    if !output.status.success() {
        anyhow::bail!("{}", String::from_utf8_lossy(&output.stderr).trim());
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Resolve backends from `config` and run one job with the real client tools
pub fn run_job(config: &Config, command: Command) -> Result<(JobState, BackupJob)> {
    let resolver = BackendResolver::new(DeclarativeSelection, Arc::new(RealExecutor::new()));
    let database = resolver.resolve_database_connector(config)?;
    let storage = resolver.resolve_storage_connector(config)?;

    let mut job = BackupJob::new(command, &storage.working_dir, Local::now());
    let mut pipeline = Pipeline::new(database, storage.connector, Box::new(TracingLogger))
        .keep_working_file(config.keep_working_file)
        .with_restore_key(storage.restore_key);
    let state = pipeline.run(&mut job);
    Ok((state, job))
}
