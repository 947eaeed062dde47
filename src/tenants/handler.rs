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
use crate::common::dto::{EmptyType, HandlerResult, SuccessResponseBuilder};
use crate::common::error::IntoFriendlyError;
use crate::deploy::dto::CreateTenantRequest;
use crate::tenants::TenantsModule;
use crate::tenants::dto::{ExtendRequest, SuspendRequest, TenantFilter};
use crate::tenants::service::TenantsService;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use std::sync::Arc;
use uuid::Uuid;

macro_rules! respond {
    ($module:expr, $status:expr, $result:expr) => {
        match $result {
            Ok(data) => match SuccessResponseBuilder::<EmptyType, _>::new()
                .status_code($status)
                .data(data)
                .build()
            {
                Ok(r) => Ok(r.into_response()),
                Err(e) => Err(e.into_friendly_error($module).await.into_response()),
            },
            Err(e) => Err(e.into_friendly_error($module).await.into_response()),
        }
    };
}

pub async fn create(
    State(module): State<Arc<dyn TenantsModule>>,
    Json(payload): Json<CreateTenantRequest>,
) -> HandlerResult {
    let result = TenantsService::create(&payload, module.clone()).await;
    respond!(module, StatusCode::CREATED, result)
}

pub async fn get(
    State(module): State<Arc<dyn TenantsModule>>,
    Path(id): Path<Uuid>,
) -> HandlerResult {
    let result = TenantsService::get(id, module.clone()).await;
    respond!(module, StatusCode::OK, result)
}

pub async fn list(
    State(module): State<Arc<dyn TenantsModule>>,
    Query(filter): Query<TenantFilter>,
) -> HandlerResult {
    let result = TenantsService::list(&filter, module.clone()).await;
    respond!(module, StatusCode::OK, result)
}

pub async fn suspend(
    State(module): State<Arc<dyn TenantsModule>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SuspendRequest>,
) -> HandlerResult {
    let result = TenantsService::suspend(id, payload.reason, module.clone()).await;
    respond!(module, StatusCode::OK, result)
}

pub async fn reactivate(
    State(module): State<Arc<dyn TenantsModule>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ExtendRequest>,
) -> HandlerResult {
    let result = TenantsService::reactivate(id, &payload, module.clone()).await;
    respond!(module, StatusCode::OK, result)
}

pub async fn restart(
    State(module): State<Arc<dyn TenantsModule>>,
    Path(id): Path<Uuid>,
) -> HandlerResult {
    let result = TenantsService::restart(id, module.clone()).await;
    respond!(module, StatusCode::OK, result)
}

pub async fn extend(
    State(module): State<Arc<dyn TenantsModule>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ExtendRequest>,
) -> HandlerResult {
    let result = TenantsService::extend(id, &payload, module.clone()).await;
    respond!(module, StatusCode::OK, result)
}

pub async fn delete(
    State(module): State<Arc<dyn TenantsModule>>,
    Path(id): Path<Uuid>,
) -> HandlerResult {
    let result = TenantsService::delete(id, module.clone()).await;
    respond!(module, StatusCode::OK, result)
}

pub async fn container_stats(
    State(module): State<Arc<dyn TenantsModule>>,
    Path(id): Path<Uuid>,
) -> HandlerResult {
    let result = TenantsService::container_stats(id, module.clone()).await;
    respond!(module, StatusCode::OK, result)
}

pub async fn registry_stats(State(module): State<Arc<dyn TenantsModule>>) -> HandlerResult {
    let result = TenantsService::registry_stats(module.clone()).await;
    respond!(module, StatusCode::OK, result)
}

pub async fn audit(
    State(module): State<Arc<dyn TenantsModule>>,
    Path(id): Path<Uuid>,
) -> HandlerResult {
    let result = TenantsService::audit_events(id, module.clone()).await;
    respond!(module, StatusCode::OK, result)
}

pub async fn payments(
    State(module): State<Arc<dyn TenantsModule>>,
    Path(id): Path<Uuid>,
) -> HandlerResult {
    let result = TenantsService::payments(id, module.clone()).await;
    respond!(module, StatusCode::OK, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::AppConfigBuilder;
    use crate::common::error::RepositoryError;
    use crate::deploy::dto::DeployOutcome;
    use crate::deploy::error::{DeployError, DeployFailure};
    use crate::deploy::service::MockDeployer;
    use crate::docker::MockContainerDriver;
    use crate::tenants::model::Tenant;
    use crate::tenants::repository::MockTenantsRepository;
    use crate::tenants::routes;
    use crate::tenants::tests::MockTenantsModule;
    use axum::Router;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::Utc;
    use tower::ServiceExt;

    fn sample_tenant(id: Uuid) -> Tenant {
        let now = Utc::now();
        Tenant {
            id,
            bot_token: format!("100:{}", "A".repeat(35)),
            bot_username: None,
            owner_contact_id: 42,
            display_name: "Minta Ügyfél".to_string(),
            cache_partition: 0,
            container_name: "booking-client-a1b2c3d4".to_string(),
            schema_name: "client_a1b2c3d4".to_string(),
            subscription_status: "active".to_string(),
            subscription_plan: "monthly".to_string(),
            started_at: now,
            expires_at: now + chrono::Duration::days(30),
            container_running: true,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn test_app(
        repo: MockTenantsRepository,
        driver: MockContainerDriver,
        deployer: MockDeployer,
    ) -> Router {
        let repo = Arc::new(repo);
        let driver = Arc::new(driver);
        let deployer = Arc::new(deployer);
        let config = Arc::new(AppConfigBuilder::default().build().unwrap());

        let mut module = MockTenantsModule::new();
        module.expect_config().returning(move || config.clone());
        module
            .expect_tenants_repo()
            .returning(move || repo.clone());
        module
            .expect_container_driver()
            .returning(move || driver.clone());
        module.expect_deployer().returning(move || deployer.clone());

        Router::new().nest("/api", routes::routes(Arc::new(module)))
    }

    fn authorized(request: axum::http::request::Builder) -> axum::http::request::Builder {
        request
            .header("Authorization", "Bearer test_api_token")
            .header("Content-Type", "application/json")
    }

    #[tokio::test]
    async fn test_create_returns_created_with_redacted_token() {
        let tenant_id = Uuid::new_v4();
        let tenant = sample_tenant(tenant_id);

        let mut deployer = MockDeployer::new();
        deployer.expect_deploy().times(1).returning(move |_| {
            Ok(DeployOutcome {
                tenant_id,
                container_name: "booking-client-a1b2c3d4".to_string(),
                schema_name: "client_a1b2c3d4".to_string(),
                cache_partition: 0,
                warm_claimed: false,
            })
        });

        let mut repo = MockTenantsRepository::new();
        repo.expect_get_by_id()
            .times(1)
            .returning(move |_| Ok(tenant.clone()));

        let app = test_app(repo, MockContainerDriver::new(), deployer);

        let payload = serde_json::json!({
            "bot_token": format!("100:{}", "A".repeat(35)),
            "owner_contact_id": 42,
            "display_name": "Minta Ügyfél",
            "plan": "monthly",
        });
        let request = authorized(Request::builder().method("POST").uri("/api/tenants"))
            .body(Body::from(payload.to_string()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["success"], true);
        assert_eq!(parsed["data"]["bot_token"], "[REDACTED]");
        assert_eq!(parsed["data"]["cache_partition"], 0);
    }

    #[tokio::test]
    async fn test_create_duplicate_token_conflicts() {
        let mut deployer = MockDeployer::new();
        deployer
            .expect_deploy()
            .times(1)
            .returning(|_| Err(DeployFailure::clean(DeployError::AlreadyExists)));

        let app = test_app(
            MockTenantsRepository::new(),
            MockContainerDriver::new(),
            deployer,
        );

        let payload = serde_json::json!({
            "bot_token": format!("100:{}", "A".repeat(35)),
            "owner_contact_id": 42,
        });
        let request = authorized(Request::builder().method("POST").uri("/api/tenants"))
            .body(Body::from(payload.to_string()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_missing_bearer_is_rejected() {
        let app = test_app(
            MockTenantsRepository::new(),
            MockContainerDriver::new(),
            MockDeployer::new(),
        );

        let request = Request::builder()
            .method("GET")
            .uri("/api/tenants")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_get_unknown_tenant_is_not_found() {
        let mut repo = MockTenantsRepository::new();
        repo.expect_get_by_id()
            .returning(|_| Err(RepositoryError::TenantNotFound));

        let app = test_app(repo, MockContainerDriver::new(), MockDeployer::new());
        let request = authorized(
            Request::builder()
                .method("GET")
                .uri(format!("/api/tenants/{}", Uuid::new_v4())),
        )
        .body(Body::empty())
        .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_passes_filters() {
        let mut repo = MockTenantsRepository::new();
        repo.expect_list()
            .times(1)
            .withf(|filter| {
                filter.status.as_deref() == Some("active") && filter.owner == Some(42)
            })
            .returning(|_| Ok(vec![]));

        let app = test_app(repo, MockContainerDriver::new(), MockDeployer::new());
        let request = authorized(
            Request::builder()
                .method("GET")
                .uri("/api/tenants?status=active&owner=42"),
        )
        .body(Body::empty())
        .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_out_of_capacity_maps_to_service_unavailable() {
        let mut deployer = MockDeployer::new();
        deployer
            .expect_deploy()
            .returning(|_| Err(DeployFailure::clean(DeployError::OutOfCapacity)));

        let app = test_app(
            MockTenantsRepository::new(),
            MockContainerDriver::new(),
            deployer,
        );

        let payload = serde_json::json!({
            "bot_token": format!("100:{}", "B".repeat(35)),
            "owner_contact_id": 7,
        });
        let request = authorized(Request::builder().method("POST").uri("/api/tenants"))
            .body(Body::from(payload.to_string()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
