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
use crate::common::dto::GeneralError;
use crate::common::error::{FriendlyError, IntoFriendlyError, RepositoryError};
use crate::deploy::dto::{CreateTenantRequest, DeployRequest, TeardownReport};
use crate::deploy::error::{DeployError, DeployFailure};
use crate::docker::{ContainerError, ContainerStats};
use crate::tenants::TenantsModule;
use crate::tenants::dto::{ExtendRequest, PublicTenant, RegistryStats, TenantFilter};
use crate::tenants::model::{AuditEvent, Payment, Tenant};
use crate::tenants::types::SubscriptionStatus;
use async_trait::async_trait;
use axum::http::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::Level;
use uuid::Uuid;

const STOP_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum TenantsServiceError {
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    #[error("Deploy error: {0}")]
    Deploy(#[from] DeployFailure),

    #[error("{0}")]
    Validation(String),
}

#[async_trait]
impl IntoFriendlyError<GeneralError> for TenantsServiceError {
    async fn into_friendly_error(
        self,
        notifier: Arc<dyn Notifier>,
    ) -> FriendlyError<GeneralError> {
        let user_facing = |severity, status, message: String| {
            FriendlyError::user_facing(
                severity,
                status,
                file!(),
                GeneralError { message },
            )
        };
        match &self {
            TenantsServiceError::Repository(e) if e.is_not_found() => user_facing(
                Level::DEBUG,
                StatusCode::NOT_FOUND,
                "A megadott ügyfél nem található.".to_string(),
            ),
            TenantsServiceError::Repository(RepositoryError::InvalidTransition {
                from,
                to,
            }) => user_facing(
                Level::DEBUG,
                StatusCode::CONFLICT,
                format!("Az előfizetési állapot nem módosítható: {from} -> {to}"),
            ),
            TenantsServiceError::Repository(RepositoryError::OutOfCapacity) => user_facing(
                Level::WARN,
                StatusCode::SERVICE_UNAVAILABLE,
                "Jelenleg nincs szabad kapacitás a platformon.".to_string(),
            ),
            TenantsServiceError::Validation(message) => user_facing(
                Level::DEBUG,
                StatusCode::UNPROCESSABLE_ENTITY,
                message.clone(),
            ),
            TenantsServiceError::Deploy(failure) => match &failure.error {
                DeployError::AlreadyExists => user_facing(
                    Level::DEBUG,
                    StatusCode::CONFLICT,
                    "Ez a bot token már regisztrálva van.".to_string(),
                ),
                DeployError::OutOfCapacity => user_facing(
                    Level::WARN,
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Jelenleg nincs szabad kapacitás a platformon.".to_string(),
                ),
                DeployError::InvalidInput(message) => user_facing(
                    Level::DEBUG,
                    StatusCode::UNPROCESSABLE_ENTITY,
                    message.clone(),
                ),
                _ => {
                    FriendlyError::internal_with_admin_notify(
                        file!(),
                        GeneralError {
                            message: self.to_string(),
                        },
                        notifier,
                    )
                    .await
                }
            },
            _ => {
                FriendlyError::internal_with_admin_notify(
                    file!(),
                    GeneralError {
                        message: self.to_string(),
                    },
                    notifier,
                )
                .await
            }
        }
    }
}

pub struct TenantsService;

impl TenantsService {
    /// Synchronous provisioning for the admin API; the deploy queue is
    /// the asynchronous twin of this path.
    pub async fn create(
        payload: &CreateTenantRequest,
        module: Arc<dyn TenantsModule>,
    ) -> Result<PublicTenant, TenantsServiceError> {
        let request = DeployRequest::try_from(payload.clone())
            .map_err(TenantsServiceError::Validation)?;
        let outcome = module.deployer().deploy(&request).await?;
        let tenant = module.tenants_repo().get_by_id(outcome.tenant_id).await?;
        Ok(PublicTenant::from(tenant))
    }

    pub async fn get(
        id: Uuid,
        module: Arc<dyn TenantsModule>,
    ) -> Result<PublicTenant, TenantsServiceError> {
        Ok(PublicTenant::from(module.tenants_repo().get_by_id(id).await?))
    }

    pub async fn list(
        filter: &TenantFilter,
        module: Arc<dyn TenantsModule>,
    ) -> Result<Vec<PublicTenant>, TenantsServiceError> {
        if let Some(status) = &filter.status {
            status
                .parse::<SubscriptionStatus>()
                .map_err(TenantsServiceError::Validation)?;
        }
        let tenants = module.tenants_repo().list(filter).await?;
        Ok(tenants.into_iter().map(PublicTenant::from).collect())
    }

    /// Stops the container first; only a confirmed stop (or an already
    /// missing container) may flip the registry to `suspended`, otherwise
    /// a running bot would contradict the recorded state.
    pub async fn suspend(
        id: Uuid,
        reason: Option<String>,
        module: Arc<dyn TenantsModule>,
    ) -> Result<PublicTenant, TenantsServiceError> {
        let tenant = module.tenants_repo().get_by_id(id).await?;
        match module
            .container_driver()
            .stop(&tenant.container_name, STOP_GRACE)
            .await
        {
            Ok(()) | Err(ContainerError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
        let reason = reason.unwrap_or_else(|| "manual suspend".to_string());
        let tenant = module.tenants_repo().suspend(id, &reason).await?;
        Ok(PublicTenant::from(tenant))
    }

    pub async fn reactivate(
        id: Uuid,
        payload: &ExtendRequest,
        module: Arc<dyn TenantsModule>,
    ) -> Result<PublicTenant, TenantsServiceError> {
        Self::validate_days(payload.days)?;
        let tenant = module.tenants_repo().reactivate(id, payload.days).await?;
        if let Some(payment) = &payload.payment {
            module.tenants_repo().record_payment(id, payment).await?;
        }
        module
            .container_driver()
            .start(&tenant.container_name)
            .await?;
        module.tenants_repo().mark_container(id, true).await?;
        module.tenants_repo().get_by_id(id).await.map(PublicTenant::from).map_err(Into::into)
    }

    pub async fn restart(
        id: Uuid,
        module: Arc<dyn TenantsModule>,
    ) -> Result<PublicTenant, TenantsServiceError> {
        let tenant = module.tenants_repo().get_by_id(id).await?;
        let status = tenant
            .status()
            .map_err(TenantsServiceError::Validation)?;
        if !status.allows_running_container() {
            return Err(TenantsServiceError::Validation(
                "Felfüggesztett vagy lemondott ügyfél nem indítható újra.".to_string(),
            ));
        }
        module
            .container_driver()
            .restart(&tenant.container_name, STOP_GRACE)
            .await?;
        module.tenants_repo().mark_container(id, true).await?;
        module.tenants_repo().get_by_id(id).await.map(PublicTenant::from).map_err(Into::into)
    }

    pub async fn extend(
        id: Uuid,
        payload: &ExtendRequest,
        module: Arc<dyn TenantsModule>,
    ) -> Result<PublicTenant, TenantsServiceError> {
        Self::validate_days(payload.days)?;
        let tenant = module.tenants_repo().extend(id, payload.days).await?;
        if let Some(payment) = &payload.payment {
            module.tenants_repo().record_payment(id, payment).await?;
        }
        Ok(PublicTenant::from(tenant))
    }

    /// Full teardown: container, schema, registry row, in that order.
    pub async fn delete(
        id: Uuid,
        module: Arc<dyn TenantsModule>,
    ) -> Result<TeardownReport, TenantsServiceError> {
        module.tenants_repo().get_by_id(id).await?;
        Ok(module.deployer().teardown(id).await?)
    }

    pub async fn container_stats(
        id: Uuid,
        module: Arc<dyn TenantsModule>,
    ) -> Result<ContainerStats, TenantsServiceError> {
        let tenant = module.tenants_repo().get_by_id(id).await?;
        Ok(module
            .container_driver()
            .stats(&tenant.container_name)
            .await?)
    }

    pub async fn registry_stats(
        module: Arc<dyn TenantsModule>,
    ) -> Result<RegistryStats, TenantsServiceError> {
        let partition_limit = module.config().cache().partition_limit;
        Ok(module.tenants_repo().stats(partition_limit).await?)
    }

    pub async fn audit_events(
        id: Uuid,
        module: Arc<dyn TenantsModule>,
    ) -> Result<Vec<AuditEvent>, TenantsServiceError> {
        Ok(module.tenants_repo().audit_events(id).await?)
    }

    pub async fn payments(
        id: Uuid,
        module: Arc<dyn TenantsModule>,
    ) -> Result<Vec<Payment>, TenantsServiceError> {
        Ok(module.tenants_repo().payments(id).await?)
    }

    fn validate_days(days: i64) -> Result<(), TenantsServiceError> {
        if days <= 0 || days > 3660 {
            Err(TenantsServiceError::Validation(
                "A hosszabbítás napjainak száma 1 és 3660 között lehet.".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::AppConfigBuilder;
    use crate::deploy::service::MockDeployer;
    use crate::docker::MockContainerDriver;
    use crate::tenants::repository::MockTenantsRepository;
    use crate::tenants::tests::MockTenantsModule;
    use chrono::Utc;

    pub(crate) fn sample_tenant(status: &str) -> Tenant {
        let now = Utc::now();
        Tenant {
            id: Uuid::new_v4(),
            bot_token: format!("100:{}", "A".repeat(35)),
            bot_username: Some("minta_bot".to_string()),
            owner_contact_id: 42,
            display_name: "Minta Ügyfél".to_string(),
            cache_partition: 0,
            container_name: "booking-client-a1b2c3d4".to_string(),
            schema_name: "client_a1b2c3d4".to_string(),
            subscription_status: status.to_string(),
            subscription_plan: "monthly".to_string(),
            started_at: now,
            expires_at: now + chrono::Duration::days(30),
            container_running: status == "active",
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn module_with(
        repo: MockTenantsRepository,
        driver: MockContainerDriver,
        deployer: MockDeployer,
    ) -> Arc<MockTenantsModule> {
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
        Arc::new(module)
    }

    #[tokio::test]
    async fn test_suspend_stops_container_before_registry_update() {
        let tenant = sample_tenant("active");
        let tenant_id = tenant.id;
        let container_name = tenant.container_name.clone();

        let mut repo = MockTenantsRepository::new();
        let lookup = tenant.clone();
        repo.expect_get_by_id()
            .times(1)
            .returning(move |_| Ok(lookup.clone()));
        let suspended = {
            let mut t = tenant.clone();
            t.subscription_status = "suspended".to_string();
            t.container_running = false;
            t
        };
        repo.expect_suspend()
            .times(1)
            .withf(move |id, reason| *id == tenant_id && reason.contains("lejárt"))
            .returning(move |_, _| Ok(suspended.clone()));

        let mut driver = MockContainerDriver::new();
        driver
            .expect_stop()
            .times(1)
            .withf(move |name, _| name == container_name)
            .returning(|_, _| Ok(()));

        let module = module_with(repo, driver, MockDeployer::new());
        let result = TenantsService::suspend(tenant_id, Some("lejárt".to_string()), module)
            .await
            .unwrap();
        assert_eq!(result.subscription_status, "suspended");
        assert!(!result.container_running);
    }

    #[tokio::test]
    async fn test_suspend_tolerates_missing_container() {
        let tenant = sample_tenant("active");
        let tenant_id = tenant.id;

        let mut repo = MockTenantsRepository::new();
        let lookup = tenant.clone();
        repo.expect_get_by_id()
            .returning(move |_| Ok(lookup.clone()));
        let suspended = {
            let mut t = tenant.clone();
            t.subscription_status = "suspended".to_string();
            t
        };
        repo.expect_suspend()
            .times(1)
            .returning(move |_, _| Ok(suspended.clone()));

        let mut driver = MockContainerDriver::new();
        driver
            .expect_stop()
            .returning(|name, _| Err(ContainerError::NotFound(name.to_string())));

        let module = module_with(repo, driver, MockDeployer::new());
        assert!(
            TenantsService::suspend(tenant_id, None, module)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_suspend_propagates_stop_failure() {
        let tenant = sample_tenant("active");
        let tenant_id = tenant.id;

        let mut repo = MockTenantsRepository::new();
        let lookup = tenant.clone();
        repo.expect_get_by_id()
            .returning(move |_| Ok(lookup.clone()));
        repo.expect_suspend().times(0);

        let mut driver = MockContainerDriver::new();
        driver
            .expect_stop()
            .returning(|_, _| Err(ContainerError::Command("daemon busy".to_string())));

        let module = module_with(repo, driver, MockDeployer::new());
        assert!(
            TenantsService::suspend(tenant_id, None, module)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_restart_refuses_suspended_tenant() {
        let tenant = sample_tenant("suspended");
        let tenant_id = tenant.id;

        let mut repo = MockTenantsRepository::new();
        repo.expect_get_by_id()
            .returning(move |_| Ok(tenant.clone()));

        let mut driver = MockContainerDriver::new();
        driver.expect_restart().times(0);

        let module = module_with(repo, driver, MockDeployer::new());
        let result = TenantsService::restart(tenant_id, module).await;
        assert!(matches!(
            result,
            Err(TenantsServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_extend_records_payment() {
        let tenant = sample_tenant("active");
        let tenant_id = tenant.id;

        let mut repo = MockTenantsRepository::new();
        repo.expect_extend()
            .times(1)
            .withf(move |id, days| *id == tenant_id && *days == 30)
            .returning(move |_, _| Ok(tenant.clone()));
        repo.expect_record_payment().times(1).returning(|_, _| Ok(()));

        let module = module_with(repo, MockContainerDriver::new(), MockDeployer::new());
        let payload = ExtendRequest {
            days: 30,
            payment: Some(crate::tenants::dto::PaymentInput {
                amount: bigdecimal::BigDecimal::from(10000),
                currency: None,
                payment_method: None,
                transaction_id: None,
                notes: None,
            }),
        };
        assert!(
            TenantsService::extend(tenant_id, &payload, module)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_extend_rejects_non_positive_days() {
        let module = module_with(
            MockTenantsRepository::new(),
            MockContainerDriver::new(),
            MockDeployer::new(),
        );
        let payload = ExtendRequest {
            days: 0,
            payment: None,
        };
        assert!(matches!(
            TenantsService::extend(Uuid::new_v4(), &payload, module).await,
            Err(TenantsServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_list_rejects_unknown_status_filter() {
        let module = module_with(
            MockTenantsRepository::new(),
            MockContainerDriver::new(),
            MockDeployer::new(),
        );
        let filter = TenantFilter {
            status: Some("frozen".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            TenantsService::list(&filter, module).await,
            Err(TenantsServiceError::Validation(_))
        ));
    }
}
