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
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use std::fmt::Display;

/// Result type shared by every axum handler in the crate: both arms are
/// fully rendered responses.
pub type HandlerResult = Result<Response, Response>;

/// A minimal error body holding a single human readable message.
#[derive(Debug, Clone, Serialize)]
pub struct GeneralError {
    pub message: String,
}

impl Display for GeneralError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Marker type for responses that carry no `meta` section.
#[derive(Debug, Clone, Serialize)]
pub struct EmptyType;

/// Envelope for error responses: `{"success": false, "error": ...}` with
/// the HTTP status taken from `status_code`.
pub struct ErrorResponse<T: Serialize> {
    pub status_code: StatusCode,
    pub error: T,
}

impl<T: Serialize> IntoResponse for ErrorResponse<T> {
    fn into_response(self) -> Response {
        (
            self.status_code,
            Json(json!({
                "success": false,
                "error": self.error,
            })),
        )
            .into_response()
    }
}

/// Envelope for success responses: `{"success": true, "meta"?: ..., "data": ...}`.
#[derive(Debug, Serialize)]
pub struct SuccessResponse<M: Serialize, D: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<M>,
    pub data: D,
    #[serde(skip)]
    status_code: StatusCode,
}

impl<M: Serialize, D: Serialize> IntoResponse for SuccessResponse<M, D> {
    fn into_response(self) -> Response {
        let status = self.status_code;
        (status, Json(self)).into_response()
    }
}

/// Builder for [`SuccessResponse`].
///
/// The builder refuses to produce a response without a payload so a
/// handler can never accidentally return an empty `200 OK` body.
pub struct SuccessResponseBuilder<M: Serialize, D: Serialize> {
    status_code: Option<StatusCode>,
    meta: Option<M>,
    data: Option<D>,
}

impl<M: Serialize, D: Serialize> SuccessResponseBuilder<M, D> {
    pub fn new() -> Self {
        Self {
            status_code: None,
            meta: None,
            data: None,
        }
    }
    pub fn status_code(mut self, status_code: StatusCode) -> Self {
        self.status_code = Some(status_code);
        self
    }
    pub fn meta(mut self, meta: M) -> Self {
        self.meta = Some(meta);
        self
    }
    pub fn data(mut self, data: D) -> Self {
        self.data = Some(data);
        self
    }
    pub fn build(self) -> BuilderResult<SuccessResponse<M, D>> {
        Ok(SuccessResponse {
            success: true,
            meta: self.meta,
            data: self.data.ok_or(BuilderError::MissingRequired("data"))?,
            status_code: self.status_code.unwrap_or(StatusCode::OK),
        })
    }
}

impl<M: Serialize, D: Serialize> Default for SuccessResponseBuilder<M, D> {
    fn default() -> Self {
        SuccessResponseBuilder::new()
    }
}
