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
use crate::app::config::AppConfig;
use crate::common::dto::{ErrorResponse, GeneralError};
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tracing::debug;

/// Static bearer token check over the whole admin API surface.
///
/// The callers are the platform's own front-end bots, not humans, so a
/// shared secret from the configuration is the whole auth story here.
pub async fn require_api_token(
    State(config): State<Arc<AppConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let expected = format!("Bearer {}", config.auth().api_token());
    let provided = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match provided {
        Some(value) if value == expected => next.run(request).await,
        _ => {
            debug!("Rejected API request without a valid bearer token");
            ErrorResponse {
                status_code: StatusCode::UNAUTHORIZED,
                error: GeneralError {
                    message: "Hozzáférés megtagadva!".to_string(),
                },
            }
            .into_response()
        }
    }
}
