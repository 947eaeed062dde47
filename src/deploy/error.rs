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
use crate::app::cache::CacheError;
use crate::common::error::RepositoryError;
use crate::docker::ContainerError;
use std::fmt::Display;
use thiserror::Error;

/// Why a container failed to reach a healthy state.
#[derive(Debug, Clone, PartialEq)]
pub enum ContainerStartReason {
    ImageMissing,
    RuntimeError(String),
    Unhealthy(String),
    TimedOut,
    ExitedImmediately(String),
}

impl Display for ContainerStartReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerStartReason::ImageMissing => write!(f, "image missing"),
            ContainerStartReason::RuntimeError(e) => write!(f, "runtime error: {e}"),
            ContainerStartReason::Unhealthy(logs) => write!(f, "unhealthy: {logs}"),
            ContainerStartReason::TimedOut => write!(f, "timed out"),
            ContainerStartReason::ExitedImmediately(logs) => {
                write!(f, "exited immediately: {logs}")
            }
        }
    }
}

/// Error taxonomy surfaced to provisioning callers.
///
/// Anything but `Transient` is terminal for the job; `Transient` is
/// retried by the worker with backoff before it becomes the final
/// verdict.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("bot token already bound to a tenant")]
    AlreadyExists,

    #[error("no free cache partition")]
    OutOfCapacity,

    #[error("schema materialization failed: {0}")]
    SchemaFailed(String),

    #[error("container start failed: {0}")]
    ContainerStart(ContainerStartReason),

    #[error("transient infrastructure failure: {0}")]
    Transient(String),

    #[error("cancelled before execution")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl DeployError {
    pub fn kind(&self) -> &'static str {
        match self {
            DeployError::InvalidInput(_) => "invalid_input",
            DeployError::AlreadyExists => "already_exists",
            DeployError::OutOfCapacity => "out_of_capacity",
            DeployError::SchemaFailed(_) => "schema_failed",
            DeployError::ContainerStart(_) => "container_start_failed",
            DeployError::Transient(_) => "transient_infrastructure",
            DeployError::Cancelled => "cancelled",
            DeployError::Internal(_) => "internal",
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, DeployError::Transient(_))
    }

    /// Message shown to the tenant owner in the result notification.
    pub fn user_message(&self) -> String {
        match self {
            DeployError::InvalidInput(message) => message.clone(),
            DeployError::AlreadyExists => {
                "Ez a bot token már regisztrálva van a platformon.".to_string()
            }
            DeployError::OutOfCapacity => {
                "Jelenleg nincs szabad kapacitás, kérjük próbálja később.".to_string()
            }
            DeployError::SchemaFailed(_)
            | DeployError::ContainerStart(_)
            | DeployError::Transient(_)
            | DeployError::Cancelled
            | DeployError::Internal(_) => {
                "A bot telepítése nem sikerült, a csapatunk értesítést kapott.".to_string()
            }
        }
    }
}

impl From<RepositoryError> for DeployError {
    fn from(value: RepositoryError) -> Self {
        if value.is_unique_violation() {
            return match value.constraint() {
                Some("tenants_bot_token_key") => DeployError::AlreadyExists,
                Some("tenants_cache_partition_key") => {
                    DeployError::Transient("cache partition ordinal race".to_string())
                }
                _ => DeployError::Internal(value.to_string()),
            };
        }
        match value {
            RepositoryError::OutOfCapacity => DeployError::OutOfCapacity,
            RepositoryError::InvalidInput(message) => DeployError::InvalidInput(message),
            RepositoryError::Database(sqlx::Error::Io(e)) => DeployError::Transient(e.to_string()),
            RepositoryError::Database(sqlx::Error::PoolTimedOut) => {
                DeployError::Transient("database pool timed out".to_string())
            }
            other => DeployError::Internal(other.to_string()),
        }
    }
}

impl From<ContainerError> for DeployError {
    fn from(value: ContainerError) -> Self {
        match value {
            ContainerError::Unavailable(e) => DeployError::Transient(e),
            ContainerError::Io(e) => DeployError::Transient(e.to_string()),
            ContainerError::Timeout(_) => {
                DeployError::ContainerStart(ContainerStartReason::TimedOut)
            }
            other => DeployError::ContainerStart(ContainerStartReason::RuntimeError(
                other.to_string(),
            )),
        }
    }
}

impl From<CacheError> for DeployError {
    fn from(value: CacheError) -> Self {
        DeployError::Transient(value.to_string())
    }
}

/// A failed provisioning attempt together with its compensation report.
///
/// Compensation is best-effort but deterministic: every applicable step
/// is attempted and its outcome recorded, so the caller always learns
/// both why the deploy failed and what was rolled back.
#[derive(Debug, Error)]
#[error("{error} (compensation: [{}])", .compensation.join("; "))]
pub struct DeployFailure {
    pub error: DeployError,
    pub compensation: Vec<String>,
}

impl DeployFailure {
    /// A failure before any resource was created; nothing to compensate.
    pub fn clean(error: DeployError) -> Self {
        Self {
            error,
            compensation: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_kinds_are_stable() {
        assert_eq!(DeployError::AlreadyExists.kind(), "already_exists");
        assert_eq!(DeployError::OutOfCapacity.kind(), "out_of_capacity");
        assert_eq!(
            DeployError::ContainerStart(ContainerStartReason::TimedOut).kind(),
            "container_start_failed"
        );
        assert_eq!(
            DeployError::Transient("x".to_string()).kind(),
            "transient_infrastructure"
        );
    }

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(DeployError::Transient("db down".to_string()).is_transient());
        assert!(!DeployError::AlreadyExists.is_transient());
        assert!(!DeployError::OutOfCapacity.is_transient());
        assert!(!DeployError::ContainerStart(ContainerStartReason::TimedOut).is_transient());
    }

    #[test]
    fn test_repository_capacity_mapping() {
        let error = DeployError::from(RepositoryError::OutOfCapacity);
        assert!(matches!(error, DeployError::OutOfCapacity));
    }

    #[test]
    fn test_container_unavailable_is_transient() {
        let error = DeployError::from(ContainerError::Unavailable("daemon down".to_string()));
        assert!(error.is_transient());
    }

    #[test]
    fn test_user_messages_do_not_leak_internals() {
        let error = DeployError::Internal("stack trace details".to_string());
        assert!(!error.user_message().contains("stack trace"));
    }
}
