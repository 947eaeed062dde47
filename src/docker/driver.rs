/*
 * This file is part of the BotHive platform.
 *
 * Copyright (C) 2026 Kovács Dávid <kapcsolat@kovacsdavid.dev>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published
 * by the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */
use crate::app::config::DockerConfig;
use crate::docker::spec::ContainerSpec;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Log line the bot image prints once it is polling Telegram.
const READY_MARKERS: [&str; 2] = ["Bot started successfully", "🤖"];
/// Lowercased substrings treated as a startup failure.
const ERROR_MARKERS: [&str; 3] = ["error", "exception", "traceback"];

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("Container not found: {0}")]
    NotFound(String),

    #[error("Container runtime unavailable: {0}")]
    Unavailable(String),

    #[error("Container command failed: {0}")]
    Command(String),

    #[error("Container operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Unexpected runtime output: {0}")]
    InvalidOutput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ContainerResult<T> = Result<T, ContainerError>;

/// Outcome of waiting for a freshly started container to become ready.
#[derive(Debug, Clone, PartialEq)]
pub enum HealthStatus {
    RunningHealthy,
    Exited { logs: String },
    UnhealthyWithErrors { logs: String },
    TimedOut,
}

/// Runtime status as reported by `docker inspect`.
#[derive(Debug, Clone, PartialEq)]
pub enum ContainerState {
    Running,
    Exited,
    Created,
    Restarting,
    Paused,
    Dead,
    Other(String),
}

impl ContainerState {
    pub fn parse(raw: &str) -> ContainerState {
        match raw.trim() {
            "running" => ContainerState::Running,
            "exited" => ContainerState::Exited,
            "created" => ContainerState::Created,
            "restarting" => ContainerState::Restarting,
            "paused" => ContainerState::Paused,
            "dead" => ContainerState::Dead,
            other => ContainerState::Other(other.to_string()),
        }
    }
}

/// Resource snapshot of one container, shaped for the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct ContainerStats {
    pub status: String,
    pub cpu: Option<String>,
    pub memory: Option<String>,
    pub network: Option<String>,
}

/// Narrow capability surface over the container runtime. No business
/// logic lives behind this trait; every operation maps onto a single
/// runtime command and propagates the runtime's error verbatim inside a
/// typed variant.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ContainerDriver: Send + Sync {
    async fn ensure_network(&self, name: &str) -> ContainerResult<()>;
    async fn image_available(&self, tag: &str) -> ContainerResult<bool>;
    async fn build_image(&self, context: &str, tag: &str) -> ContainerResult<()>;
    /// Creates and starts the container, returning the runtime assigned id.
    async fn create_and_start(&self, spec: &ContainerSpec) -> ContainerResult<String>;
    /// Polls runtime status and the container's own log stream until the
    /// readiness marker appears, an error marker appears, the container
    /// exits, or `timeout` elapses. Container starts routinely stall for
    /// tens of seconds, so the bound is explicit rather than inherited
    /// from some ambient cancellation.
    async fn wait_healthy(&self, name: &str, timeout: Duration) -> ContainerResult<HealthStatus>;
    async fn start(&self, name: &str) -> ContainerResult<()>;
    async fn stop(&self, name: &str, grace: Duration) -> ContainerResult<()>;
    async fn restart(&self, name: &str, grace: Duration) -> ContainerResult<()>;
    async fn remove(&self, name: &str, force: bool) -> ContainerResult<()>;
    async fn state(&self, name: &str) -> ContainerResult<ContainerState>;
    async fn stats(&self, name: &str) -> ContainerResult<ContainerStats>;
    async fn logs(&self, name: &str, tail: u32) -> ContainerResult<String>;
}

/// [`ContainerDriver`] implementation over the docker CLI.
///
/// The daemon socket is shared; docker itself serializes concurrent
/// operations, so this type is freely usable from parallel tasks.
pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    pub fn new(config: &DockerConfig) -> Self {
        Self {
            binary: config.binary.clone(),
        }
    }

    async fn exec(&self, args: &[String]) -> ContainerResult<String> {
        debug!("docker {}", args.join(" "));
        let output = tokio::process::Command::new(&self.binary)
            .args(args)
            .output()
            .await?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            Err(classify_failure(&stderr))
        }
    }

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }
}

fn classify_failure(stderr: &str) -> ContainerError {
    let trimmed = stderr.trim().to_string();
    if trimmed.contains("No such container") || trimmed.contains("No such object") {
        ContainerError::NotFound(trimmed)
    } else if trimmed.contains("Cannot connect to the Docker daemon") {
        ContainerError::Unavailable(trimmed)
    } else {
        ContainerError::Command(trimmed)
    }
}

#[async_trait]
impl ContainerDriver for DockerCli {
    async fn ensure_network(&self, name: &str) -> ContainerResult<()> {
        match self
            .exec(&Self::args(&["network", "inspect", name]))
            .await
        {
            Ok(_) => Ok(()),
            Err(ContainerError::NotFound(_)) | Err(ContainerError::Command(_)) => {
                info!("Creating bridge network: {name}");
                self.exec(&Self::args(&[
                    "network", "create", "--driver", "bridge", name,
                ]))
                .await?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn image_available(&self, tag: &str) -> ContainerResult<bool> {
        match self.exec(&Self::args(&["image", "inspect", tag])).await {
            Ok(_) => Ok(true),
            Err(ContainerError::NotFound(_)) | Err(ContainerError::Command(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn build_image(&self, context: &str, tag: &str) -> ContainerResult<()> {
        info!("Building bot image: {tag}");
        self.exec(&Self::args(&["build", "-t", tag, context])).await?;
        Ok(())
    }

    async fn create_and_start(&self, spec: &ContainerSpec) -> ContainerResult<String> {
        let mut args = vec!["run".to_string()];
        args.extend(spec.to_run_args());
        let stdout = self.exec(&args).await?;
        let container_id = stdout.trim().to_string();
        if container_id.is_empty() {
            return Err(ContainerError::InvalidOutput(
                "docker run returned no container id".to_string(),
            ));
        }
        info!("Container started: {} ({})", spec.name, container_id);
        Ok(container_id)
    }

    async fn wait_healthy(&self, name: &str, timeout: Duration) -> ContainerResult<HealthStatus> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if tokio::time::Instant::now() >= deadline {
                return Ok(HealthStatus::TimedOut);
            }
            tokio::time::sleep(Duration::from_secs(1)).await;

            match self.state(name).await? {
                ContainerState::Exited | ContainerState::Dead => {
                    let logs = self.logs(name, 50).await.unwrap_or_default();
                    return Ok(HealthStatus::Exited { logs });
                }
                ContainerState::Running => {
                    let logs = self.logs(name, 50).await?;
                    if READY_MARKERS.iter().any(|m| logs.contains(m)) {
                        return Ok(HealthStatus::RunningHealthy);
                    }
                    let lower = logs.to_lowercase();
                    if ERROR_MARKERS.iter().any(|m| lower.contains(m)) {
                        let tail = logs.chars().rev().take(500).collect::<String>();
                        return Ok(HealthStatus::UnhealthyWithErrors {
                            logs: tail.chars().rev().collect(),
                        });
                    }
                }
                _ => {}
            }
        }
    }

    async fn start(&self, name: &str) -> ContainerResult<()> {
        self.exec(&Self::args(&["start", name])).await?;
        Ok(())
    }

    async fn stop(&self, name: &str, grace: Duration) -> ContainerResult<()> {
        self.exec(&Self::args(&[
            "stop",
            "-t",
            &grace.as_secs().to_string(),
            name,
        ]))
        .await?;
        Ok(())
    }

    async fn restart(&self, name: &str, grace: Duration) -> ContainerResult<()> {
        self.exec(&Self::args(&[
            "restart",
            "-t",
            &grace.as_secs().to_string(),
            name,
        ]))
        .await?;
        Ok(())
    }

    async fn remove(&self, name: &str, force: bool) -> ContainerResult<()> {
        let mut args = vec!["rm".to_string()];
        if force {
            args.push("-f".to_string());
        }
        args.push(name.to_string());
        self.exec(&args).await?;
        Ok(())
    }

    async fn state(&self, name: &str) -> ContainerResult<ContainerState> {
        let stdout = self
            .exec(&Self::args(&[
                "inspect",
                "-f",
                "{{.State.Status}}",
                name,
            ]))
            .await?;
        Ok(ContainerState::parse(&stdout))
    }

    async fn stats(&self, name: &str) -> ContainerResult<ContainerStats> {
        let state = self.state(name).await?;
        let stdout = self
            .exec(&Self::args(&[
                "stats",
                "--no-stream",
                "--format",
                "{{.CPUPerc}};{{.MemUsage}};{{.NetIO}}",
                name,
            ]))
            .await?;
        Ok(parse_stats(&state, &stdout))
    }

    async fn logs(&self, name: &str, tail: u32) -> ContainerResult<String> {
        let output = tokio::process::Command::new(&self.binary)
            .args(["logs", "--tail", &tail.to_string(), name])
            .output()
            .await?;
        if output.status.success() {
            // The bot image logs to both streams.
            let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            Ok(combined)
        } else {
            Err(classify_failure(&String::from_utf8_lossy(&output.stderr)))
        }
    }
}

fn parse_stats(state: &ContainerState, raw: &str) -> ContainerStats {
    let status = match state {
        ContainerState::Other(s) => s.clone(),
        ContainerState::Running => "running".to_string(),
        ContainerState::Exited => "exited".to_string(),
        ContainerState::Created => "created".to_string(),
        ContainerState::Restarting => "restarting".to_string(),
        ContainerState::Paused => "paused".to_string(),
        ContainerState::Dead => "dead".to_string(),
    };
    let mut fields = raw.trim().split(';').map(|s| s.trim().to_string());
    ContainerStats {
        status,
        cpu: fields.next().filter(|s| !s.is_empty()),
        memory: fields.next().filter(|s| !s.is_empty()),
        network: fields.next().filter(|s| !s.is_empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_classify_missing_container() {
        let err = classify_failure("Error response from daemon: No such container: x");
        assert!(matches!(err, ContainerError::NotFound(_)));
    }

    #[test]
    fn test_classify_daemon_down() {
        let err = classify_failure(
            "Cannot connect to the Docker daemon at unix:///var/run/docker.sock",
        );
        assert!(matches!(err, ContainerError::Unavailable(_)));
    }

    #[test]
    fn test_classify_generic_failure() {
        let err = classify_failure("Error response from daemon: conflict");
        assert!(matches!(err, ContainerError::Command(_)));
    }

    #[test]
    fn test_container_state_parsing() {
        assert_eq!(ContainerState::parse("running\n"), ContainerState::Running);
        assert_eq!(ContainerState::parse("exited"), ContainerState::Exited);
        assert_eq!(
            ContainerState::parse("weird"),
            ContainerState::Other("weird".to_string())
        );
    }

    #[test]
    fn test_parse_stats_fields() {
        let stats = parse_stats(&ContainerState::Running, "0.07%;21MiB / 1GiB;1.2kB / 0B\n");
        assert_eq!(stats.status, "running");
        assert_eq!(stats.cpu.as_deref(), Some("0.07%"));
        assert_eq!(stats.memory.as_deref(), Some("21MiB / 1GiB"));
        assert_eq!(stats.network.as_deref(), Some("1.2kB / 0B"));
    }

    #[test]
    fn test_parse_stats_tolerates_missing_fields() {
        let stats = parse_stats(&ContainerState::Exited, "");
        assert_eq!(stats.status, "exited");
        assert_eq!(stats.cpu, None);
    }
}
