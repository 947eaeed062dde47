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
use crate::common::Notifier;
use crate::common::dto::{ErrorResponse, GeneralError};
use async_trait::async_trait;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use sqlx::migrate::MigrateError;
use std::fmt::Display;
use std::sync::Arc;
use thiserror::Error;
use tracing::Level;
use tracing::event;

/// An error wrapper that separates what the caller may see from what only
/// the operators may see.
///
/// # Variants
///
/// * `UserFacing(StatusCode, String, T)`:
///   Errors intended to be returned to the API caller. Contains the HTTP
///   status, the source location and a serializable body.
///
/// * `Internal(String, T)`:
///   Errors that must not leak details to the caller. The body is logged
///   and optionally forwarded to the platform administrator; the HTTP
///   response carries only a generic Hungarian message.
#[derive(Debug, Error, Clone)]
pub enum FriendlyError<T>
where
    T: Serialize + Display,
{
    #[error("{0}")]
    UserFacing(StatusCode, String, T),
    #[error("Váratlan hiba történt a feldolgozás során!")]
    Internal(String, T),
}

impl<T> FriendlyError<T>
where
    T: Serialize + Display,
{
    pub fn user_facing(severity: Level, status: StatusCode, loc: &str, body: T) -> Self {
        Self::UserFacing(status, loc.to_string(), body).trace(severity)
    }
    pub fn internal(loc: &str, body: T) -> Self {
        Self::Internal(loc.to_string(), body).trace(Level::ERROR)
    }
    /// Logs the internal error and forwards it to the platform admin chat.
    /// Notification failure is itself only logged; it never masks the
    /// original error.
    pub async fn internal_with_admin_notify(
        loc: &str,
        body: T,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let fe = Self::Internal(loc.to_string(), body).trace(Level::ERROR);

        if let FriendlyError::Internal(loc, body) = &fe
            && let Err(e) = notifier
                .send_admin(&format!(
                    "⚠️ Belső hiba!\nlocation={loc}\nmessage={body}"
                ))
                .await
        {
            event!(Level::ERROR, "Could not notify admin: {e}");
        }

        fe
    }

    /// Emits the error through `tracing` at the requested severity and
    /// returns `self` unchanged for further chaining.
    fn trace(self, severity: Level) -> Self {
        match &self {
            FriendlyError::UserFacing(status, loc, body) => match severity {
                Level::ERROR => {
                    event!(
                        Level::ERROR,
                        "User-facing error: http-status={status} location={loc}, message={body}",
                    );
                }
                Level::WARN => {
                    event!(
                        Level::WARN,
                        "User-facing error: http-status={status} location={loc}, message={body}",
                    );
                }
                Level::INFO => {
                    event!(
                        Level::INFO,
                        "User-facing error: http-status={status} location={loc}, message={body}",
                    );
                }
                Level::DEBUG => {
                    event!(
                        Level::DEBUG,
                        "User-facing error: http-status={status} location={loc}, message={body}",
                    );
                }
                Level::TRACE => {
                    event!(
                        Level::TRACE,
                        "User-facing error: http-status={status} location={loc}, message={body}",
                    );
                }
            },
            FriendlyError::Internal(loc, body) => match severity {
                Level::ERROR => {
                    event!(Level::ERROR, "Internal error: location={loc} message={body}");
                }
                Level::WARN => {
                    event!(Level::WARN, "Internal error: location={loc} message={body}");
                }
                Level::INFO => {
                    event!(Level::INFO, "Internal error: location={loc} message={body}");
                }
                Level::DEBUG => {
                    event!(Level::DEBUG, "Internal error: location={loc} message={body}");
                }
                Level::TRACE => {
                    event!(Level::TRACE, "Internal error: location={loc} message={body}");
                }
            },
        }
        self
    }
}

impl<T> IntoResponse for FriendlyError<T>
where
    T: Serialize + Display,
{
    fn into_response(self) -> Response {
        match self {
            FriendlyError::UserFacing(status, _, body) => ErrorResponse {
                status_code: status,
                error: body,
            }
            .into_response(),
            FriendlyError::Internal(_, _) => ErrorResponse {
                status_code: StatusCode::INTERNAL_SERVER_ERROR,
                error: GeneralError {
                    message: String::from("Váratlan hiba történt a feldolgozás során"),
                },
            }
            .into_response(),
        }
    }
}

#[async_trait]
pub trait IntoFriendlyError<T>
where
    T: Serialize + Display,
{
    async fn into_friendly_error(self, notifier: Arc<dyn Notifier>) -> FriendlyError<T>;
}

/// Represents errors that can occur while interacting with the control
/// plane database.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migrate error: {0}")]
    Migrate(#[from] MigrateError),

    #[error("InvalidInput error: {0}")]
    InvalidInput(String),

    #[error("Custom error: {0}")]
    Custom(String),

    #[error("The requested tenant does not exist")]
    TenantNotFound,

    #[error("No free cache partition remains")]
    OutOfCapacity,

    #[error("Invalid subscription transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

impl RepositoryError {
    pub fn is_unique_violation(&self) -> bool {
        if let RepositoryError::Database(sqlxe) = self
            && let sqlx::Error::Database(database_error) = sqlxe
            && database_error.is_unique_violation()
        {
            return true;
        }
        false
    }

    /// The violated constraint name, when the underlying driver reports one.
    pub fn constraint(&self) -> Option<&str> {
        if let RepositoryError::Database(sqlx::Error::Database(database_error)) = self {
            database_error.constraint()
        } else {
            None
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RepositoryError::TenantNotFound | RepositoryError::Database(sqlx::Error::RowNotFound)
        )
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[derive(Debug, Error, Serialize)]
pub enum BuilderError {
    #[error("{0} is required")]
    MissingRequired(&'static str),
}

#[async_trait]
impl IntoFriendlyError<BuilderError> for BuilderError {
    async fn into_friendly_error(
        self,
        notifier: Arc<dyn Notifier>,
    ) -> FriendlyError<BuilderError> {
        FriendlyError::internal_with_admin_notify(file!(), self, notifier).await
    }
}

pub type BuilderResult<T> = Result<T, BuilderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_matching() {
        assert!(RepositoryError::TenantNotFound.is_not_found());
        assert!(RepositoryError::Database(sqlx::Error::RowNotFound).is_not_found());
        assert!(!RepositoryError::OutOfCapacity.is_not_found());
    }

    #[test]
    fn test_constraint_absent_for_plain_errors() {
        assert!(RepositoryError::OutOfCapacity.constraint().is_none());
        assert!(
            RepositoryError::InvalidTransition {
                from: "cancelled".to_string(),
                to: "active".to_string(),
            }
            .constraint()
            .is_none()
        );
    }
}
