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
use crate::tenants::TenantsModule;
use crate::tenants::handler::{
    audit as tenants_audit, container_stats as tenants_container_stats, create as tenants_create,
    delete as tenants_delete, extend as tenants_extend, get as tenants_get, list as tenants_list,
    payments as tenants_payments, reactivate as tenants_reactivate,
    registry_stats as tenants_registry_stats, restart as tenants_restart,
    suspend as tenants_suspend,
};
use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use std::sync::Arc;

pub fn routes(tenants_module: Arc<dyn TenantsModule>) -> Router {
    Router::new().nest(
        "/tenants",
        Router::new()
            .route("/", post(tenants_create).get(tenants_list))
            .route("/stats/summary", get(tenants_registry_stats))
            .route("/{id}", get(tenants_get).delete(tenants_delete))
            .route("/{id}/suspend", post(tenants_suspend))
            .route("/{id}/reactivate", post(tenants_reactivate))
            .route("/{id}/restart", post(tenants_restart))
            .route("/{id}/extend", post(tenants_extend))
            .route("/{id}/stats", get(tenants_container_stats))
            .route("/{id}/audit", get(tenants_audit))
            .route("/{id}/payments", get(tenants_payments))
            .layer(from_fn_with_state(
                tenants_module.config(),
                require_api_token,
            ))
            .with_state(tenants_module),
    )
}
