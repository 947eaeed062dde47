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
use crate::common::dto::{EmptyType, GeneralError, HandlerResult, SuccessResponseBuilder};
use crate::common::error::FriendlyError;
use crate::deploy::DeployModule;
use crate::deploy::dto::{CreateTenantRequest, DeployRequest, DeployResultRecord, DeployTask};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use std::sync::Arc;
use tracing::Level;
use uuid::Uuid;

/// Accepts a provisioning request and hands it to the worker through the
/// queue. Validation happens before the enqueue so obviously broken
/// input never occupies the worker.
pub async fn submit(
    State(module): State<Arc<dyn DeployModule>>,
    Json(payload): Json<CreateTenantRequest>,
) -> HandlerResult {
    if let Err(message) = DeployRequest::try_from(payload.clone()) {
        return Err(FriendlyError::user_facing(
            Level::DEBUG,
            StatusCode::UNPROCESSABLE_ENTITY,
            file!(),
            GeneralError { message },
        )
        .into_response());
    }

    let task = DeployTask::from_request(payload);
    let job_id = task.job_id;
    match module.deploy_queue().enqueue(&task).await {
        Ok(()) => match SuccessResponseBuilder::<EmptyType, _>::new()
            .status_code(StatusCode::ACCEPTED)
            .data(json!({ "job_id": job_id }))
            .build()
        {
            Ok(r) => Ok(r.into_response()),
            Err(e) => Err(FriendlyError::internal(
                file!(),
                GeneralError {
                    message: e.to_string(),
                },
            )
            .into_response()),
        },
        Err(e) => Err(FriendlyError::internal_with_admin_notify(
            file!(),
            GeneralError {
                message: e.to_string(),
            },
            module,
        )
        .await
        .into_response()),
    }
}

/// Polls a job result; an unknown id reads as a still-pending job
/// because results only materialize once the worker picks the task up.
pub async fn result(
    State(module): State<Arc<dyn DeployModule>>,
    Path(job_id): Path<Uuid>,
) -> HandlerResult {
    let record = match module.deploy_queue().get_result(job_id).await {
        Ok(Some(record)) => record,
        Ok(None) => DeployResultRecord::pending(job_id),
        Err(e) => {
            return Err(FriendlyError::internal(
                file!(),
                GeneralError {
                    message: e.to_string(),
                },
            )
            .into_response());
        }
    };
    match SuccessResponseBuilder::<EmptyType, _>::new()
        .status_code(StatusCode::OK)
        .data(record)
        .build()
    {
        Ok(r) => Ok(r.into_response()),
        Err(e) => Err(FriendlyError::internal(
            file!(),
            GeneralError {
                message: e.to_string(),
            },
        )
        .into_response()),
    }
}
