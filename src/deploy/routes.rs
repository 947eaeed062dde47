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
use crate::auth::middleware::require_api_token;
use crate::deploy::DeployModule;
use crate::deploy::handler::{result as deploy_result, submit as deploy_submit};
use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use std::sync::Arc;

pub fn routes(deploy_module: Arc<dyn DeployModule>) -> Router {
    Router::new().nest(
        "/deploy",
        Router::new()
            .route("/", post(deploy_submit))
            .route("/{job_id}", get(deploy_result))
            .layer(from_fn_with_state(
                deploy_module.config(),
                require_api_token,
            ))
            .with_state(deploy_module),
    )
}
