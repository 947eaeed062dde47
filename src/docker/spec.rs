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
use crate::common::error::{BuilderError, BuilderResult};

pub const LABEL_MANAGED_BY: &str = "managed_by";
pub const LABEL_TENANT_ID: &str = "tenant_id";
pub const LABEL_SCHEMA: &str = "schema";
pub const LABEL_PURPOSE: &str = "purpose";

pub const MANAGED_BY_CONTROL_PLANE: &str = "control_plane";
pub const PURPOSE_TENANT_BOT: &str = "tenant_bot";
pub const PURPOSE_WARM_POOL: &str = "warm_pool";

/// Everything the runtime needs to create one bot container.
///
/// The spec is assembled by the deploy service (tenant bots) and the pool
/// monitor (warm bots); the driver itself attaches no semantics to it.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub command: Vec<String>,
    pub env: Vec<(String, String)>,
    pub network: String,
    pub restart_policy: String,
    pub labels: Vec<(String, String)>,
    pub healthcheck_cmd: Option<String>,
    pub log_max_size: String,
    pub log_max_files: u32,
}

impl ContainerSpec {
    /// Renders the spec as `docker run` arguments (without the leading
    /// `run`).
    pub fn to_run_args(&self) -> Vec<String> {
        let mut args = vec![
            "-d".to_string(),
            "--name".to_string(),
            self.name.clone(),
            "--hostname".to_string(),
            self.name.clone(),
            "--network".to_string(),
            self.network.clone(),
            "--restart".to_string(),
            self.restart_policy.clone(),
            "--log-driver".to_string(),
            "json-file".to_string(),
            "--log-opt".to_string(),
            format!("max-size={}", self.log_max_size),
            "--log-opt".to_string(),
            format!("max-file={}", self.log_max_files),
        ];
        for (key, value) in &self.env {
            args.push("-e".to_string());
            args.push(format!("{key}={value}"));
        }
        for (key, value) in &self.labels {
            args.push("--label".to_string());
            args.push(format!("{key}={value}"));
        }
        if let Some(cmd) = &self.healthcheck_cmd {
            args.push("--health-cmd".to_string());
            args.push(cmd.clone());
            args.push("--health-interval".to_string());
            args.push("30s".to_string());
            args.push("--health-timeout".to_string());
            args.push("10s".to_string());
            args.push("--health-retries".to_string());
            args.push("3".to_string());
        }
        args.push(self.image.clone());
        args.extend(self.command.iter().cloned());
        args
    }
}

pub struct ContainerSpecBuilder {
    name: Option<String>,
    image: Option<String>,
    command: Vec<String>,
    env: Vec<(String, String)>,
    network: Option<String>,
    restart_policy: String,
    labels: Vec<(String, String)>,
    healthcheck_cmd: Option<String>,
    log_max_size: String,
    log_max_files: u32,
}

impl ContainerSpecBuilder {
    pub fn new() -> Self {
        Self {
            name: None,
            image: None,
            command: Vec::new(),
            env: Vec::new(),
            network: None,
            restart_policy: "unless-stopped".to_string(),
            labels: Vec::new(),
            healthcheck_cmd: None,
            log_max_size: "10m".to_string(),
            log_max_files: 3,
        }
    }
    pub fn name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }
    pub fn image(mut self, image: String) -> Self {
        self.image = Some(image);
        self
    }
    pub fn command(mut self, command: Vec<String>) -> Self {
        self.command = command;
        self
    }
    pub fn env(mut self, key: &str, value: String) -> Self {
        self.env.push((key.to_string(), value));
        self
    }
    pub fn network(mut self, network: String) -> Self {
        self.network = Some(network);
        self
    }
    pub fn restart_policy(mut self, restart_policy: String) -> Self {
        self.restart_policy = restart_policy;
        self
    }
    pub fn label(mut self, key: &str, value: String) -> Self {
        self.labels.push((key.to_string(), value));
        self
    }
    pub fn healthcheck_cmd(mut self, cmd: String) -> Self {
        self.healthcheck_cmd = Some(cmd);
        self
    }
    pub fn log_rotation(mut self, max_size: String, max_files: u32) -> Self {
        self.log_max_size = max_size;
        self.log_max_files = max_files;
        self
    }
    pub fn build(self) -> BuilderResult<ContainerSpec> {
        Ok(ContainerSpec {
            name: self.name.ok_or(BuilderError::MissingRequired("name"))?,
            image: self.image.ok_or(BuilderError::MissingRequired("image"))?,
            command: self.command,
            env: self.env,
            network: self.network.ok_or(BuilderError::MissingRequired("network"))?,
            restart_policy: self.restart_policy,
            labels: self.labels,
            healthcheck_cmd: self.healthcheck_cmd,
            log_max_size: self.log_max_size,
            log_max_files: self.log_max_files,
        })
    }
}

impl Default for ContainerSpecBuilder {
    fn default() -> Self {
        ContainerSpecBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_spec() -> ContainerSpec {
        ContainerSpecBuilder::new()
            .name("booking-client-a1b2c3d4".to_string())
            .image("bothive-bot:latest".to_string())
            .command(vec!["python".to_string(), "main.py".to_string()])
            .network("booking-network".to_string())
            .env("BOT_TOKEN", "100:secret".to_string())
            .label(LABEL_MANAGED_BY, MANAGED_BY_CONTROL_PLANE.to_string())
            .label(LABEL_PURPOSE, PURPOSE_TENANT_BOT.to_string())
            .healthcheck_cmd("pgrep -f main.py || exit 1".to_string())
            .build()
            .unwrap()
    }

    #[test]
    fn test_run_args_contain_identity_and_rotation() {
        let args = sample_spec().to_run_args();
        let joined = args.join(" ");
        assert!(joined.contains("--name booking-client-a1b2c3d4"));
        assert!(joined.contains("--restart unless-stopped"));
        assert!(joined.contains("--log-opt max-size=10m"));
        assert!(joined.contains("--log-opt max-file=3"));
        assert!(joined.contains("-e BOT_TOKEN=100:secret"));
        assert!(joined.contains("--label managed_by=control_plane"));
        assert!(joined.ends_with("bothive-bot:latest python main.py"));
    }

    #[test]
    fn test_builder_requires_name_image_network() {
        assert!(ContainerSpecBuilder::new().build().is_err());
        assert!(
            ContainerSpecBuilder::new()
                .name("x".to_string())
                .image("y".to_string())
                .build()
                .is_err()
        );
    }
}
