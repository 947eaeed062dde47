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
use crate::common::services::{retry_with_backoff, short_id};
use crate::common::types::{SchemaName, ValueObject};
use crate::deploy::dto::{DeployOutcome, DeployRequest, TeardownReport};
use crate::deploy::error::{ContainerStartReason, DeployError, DeployFailure};
use crate::deploy::schema::SchemaManager;
use crate::docker::{
    ContainerDriver, ContainerSpec, ContainerSpecBuilder, HealthStatus, LABEL_MANAGED_BY,
    LABEL_PURPOSE, LABEL_SCHEMA, LABEL_TENANT_ID, MANAGED_BY_CONTROL_PLANE, PURPOSE_TENANT_BOT,
};
use crate::pool::manager::{ActivationRecord, STATUS_ACTIVE, WarmPool};
use crate::tenants::model::Tenant;
use crate::tenants::repository::{RegisterTenant, TenantsRepository};
use async_trait::async_trait;
use chrono::Utc;
#[cfg(test)]
use mockall::automock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

const COMPENSATION_STOP_GRACE: Duration = Duration::from_secs(5);

/// End-to-end tenant provisioning and teardown.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Deployer: Send + Sync {
    /// Provisions a tenant: allocation + registration, schema
    /// materialization, then either a warm pool claim or a cold container
    /// start with a bounded health wait. Any failure after registration
    /// triggers full compensation; the returned failure carries the
    /// compensation report.
    async fn deploy(&self, request: &DeployRequest) -> Result<DeployOutcome, DeployFailure>;

    /// Removes a tenant and everything it owns: container, schema,
    /// registry row (soft delete), pool slot leftovers.
    async fn teardown(&self, tenant_id: Uuid) -> Result<TeardownReport, DeployFailure>;
}

/// Tracks how far provisioning got, so compensation only touches what
/// was actually created.
#[derive(Debug, Default)]
struct ProvisionState {
    schema_created: bool,
    container_created: bool,
}

pub struct DeployService {
    config: Arc<AppConfig>,
    repo: Arc<dyn TenantsRepository>,
    schema_manager: Arc<dyn SchemaManager>,
    driver: Arc<dyn ContainerDriver>,
    warm_pool: Arc<dyn WarmPool>,
}

impl DeployService {
    pub fn new(
        config: Arc<AppConfig>,
        repo: Arc<dyn TenantsRepository>,
        schema_manager: Arc<dyn SchemaManager>,
        driver: Arc<dyn ContainerDriver>,
        warm_pool: Arc<dyn WarmPool>,
    ) -> Self {
        Self {
            config,
            repo,
            schema_manager,
            driver,
            warm_pool,
        }
    }

    fn step_attempts(&self) -> u32 {
        self.config.worker().max_attempts
    }

    fn step_backoff(&self) -> Duration {
        Duration::from_secs(self.config.worker().backoff_initial_secs)
    }

    /// Allocation and registration in one transaction. A lost race on
    /// the cache partition ordinal surfaces as a unique violation and is
    /// simply retried with a fresh allocation.
    async fn register_tenant(&self, request: &DeployRequest) -> Result<Tenant, DeployError> {
        retry_with_backoff(
            3,
            Duration::from_millis(100),
            || async move {
                let id = Uuid::new_v4();
                let short = short_id(&id);
                let params = RegisterTenant {
                    id,
                    bot_token: request.bot_token.to_string(),
                    bot_username: request.bot_username.clone(),
                    owner_contact_id: request.owner_contact_id,
                    display_name: request.display_name.to_string(),
                    container_name: format!(
                        "{}{}",
                        self.config.deploy().container_name_prefix,
                        short
                    ),
                    schema_name: format!("{}{}", self.config.deploy().schema_prefix, short),
                    status: request.status,
                    plan: request.plan,
                    partition_limit: self.config.cache().partition_limit,
                };
                self.repo.register(&params).await.map_err(DeployError::from)
            },
            |e| e.is_transient(),
        )
        .await
    }

    async fn materialize_schema(
        &self,
        schema: &ValueObject<SchemaName>,
    ) -> Result<(), DeployError> {
        retry_with_backoff(
            self.step_attempts(),
            self.step_backoff(),
            || async move {
                self.schema_manager
                    .create(schema)
                    .await
                    .map_err(DeployError::from)
            },
            |e| e.is_transient(),
        )
        .await
        .map_err(|e| match e {
            DeployError::Transient(message) => DeployError::Transient(message),
            other => DeployError::SchemaFailed(other.to_string()),
        })
    }

    /// Fast path: claim a waiting pool bot and hand it the activation
    /// record instead of cold-starting a container. `Ok(None)` means the
    /// cold path should run; warm failures never fail the job.
    async fn try_warm_claim(
        &self,
        request: &DeployRequest,
        tenant: &Tenant,
    ) -> Result<Option<DeployOutcome>, DeployError> {
        let Some(container_name) = self.warm_pool.find_free().await? else {
            return Ok(None);
        };
        if !self.warm_pool.claim(&container_name).await? {
            info!("Pool slot {container_name} claimed by someone else; falling back");
            return Ok(None);
        }

        let record = ActivationRecord {
            bot_token: request.bot_token.to_string(),
            admin_telegram_id: request.owner_contact_id,
            client_id: tenant.id,
            company_name: request.display_name.to_string(),
            pg_schema: tenant.schema_name.clone(),
            cache_partition: tenant.cache_partition,
            redis_key_prefix: self.key_prefix_for(tenant),
            activated_at: Utc::now(),
        };
        let ttl = self.config.deploy().activation_ttl_secs;
        if !self.warm_pool.activate(&container_name, &record, ttl).await? {
            self.warm_pool.release(&container_name).await?;
            return Ok(None);
        }

        let deadline = tokio::time::Instant::now()
            + Duration::from_secs(self.config.deploy().activation_wait_secs);
        loop {
            tokio::time::sleep(Duration::from_millis(500)).await;
            if let Some(state) = self.warm_pool.slot_state(&container_name).await?
                && state.status == STATUS_ACTIVE
                && state.client_id == Some(tenant.id)
            {
                let bound = self
                    .repo
                    .bind_container(tenant.id, &container_name)
                    .await
                    .map_err(DeployError::from)?;
                info!("Warm claim bound tenant {} to {container_name}", tenant.id);
                return Ok(Some(DeployOutcome {
                    tenant_id: bound.id,
                    container_name,
                    schema_name: bound.schema_name,
                    cache_partition: bound.cache_partition,
                    warm_claimed: true,
                }));
            }
            if tokio::time::Instant::now() >= deadline {
                break;
            }
        }

        warn!("Warm activation of {container_name} timed out; reverting claim");
        self.warm_pool.release(&container_name).await?;
        self.warm_pool.clear_activation(&container_name).await?;
        Ok(None)
    }

    fn key_prefix_for(&self, tenant: &Tenant) -> Option<String> {
        if self.config.cache().partition_limit.is_some() {
            None
        } else {
            Some(format!("{}:", tenant.schema_name))
        }
    }

    fn tenant_container_spec(
        &self,
        request: &DeployRequest,
        tenant: &Tenant,
    ) -> Result<ContainerSpec, DeployError> {
        let mut builder = ContainerSpecBuilder::new()
            .name(tenant.container_name.clone())
            .image(self.config.docker().image_tag.clone())
            .command(vec!["python".to_string(), "main.py".to_string()])
            .network(self.config.docker().network.clone())
            .env("BOT_TOKEN", request.bot_token.to_string())
            .env("ADMIN_IDS", request.owner_contact_id.to_string())
            .env("DB_TYPE", "postgresql".to_string())
            .env("DATABASE_URL", self.config.database().url())
            .env("PG_SCHEMA", tenant.schema_name.clone())
            .env("REDIS_ENABLED", "true".to_string())
            .env("REDIS_HOST", self.config.cache().host.clone())
            .env("REDIS_PORT", self.config.cache().port.to_string())
            .env("TIMEZONE", self.config.deploy().timezone.clone())
            .env(
                "WORK_HOURS_START",
                self.config.deploy().work_hours_start.to_string(),
            )
            .env(
                "WORK_HOURS_END",
                self.config.deploy().work_hours_end.to_string(),
            )
            .env(
                "MAX_BOOKINGS_PER_USER",
                self.config.deploy().max_bookings_per_user.to_string(),
            )
            .env(
                "CANCELLATION_HOURS",
                self.config.deploy().cancellation_hours.to_string(),
            );
        builder = match self.key_prefix_for(tenant) {
            Some(prefix) => builder.env("REDIS_KEY_PREFIX", prefix),
            None => builder.env("REDIS_DB", tenant.cache_partition.to_string()),
        };
        builder
            .label(LABEL_MANAGED_BY, MANAGED_BY_CONTROL_PLANE.to_string())
            .label(LABEL_TENANT_ID, tenant.id.to_string())
            .label(LABEL_SCHEMA, tenant.schema_name.clone())
            .label(LABEL_PURPOSE, PURPOSE_TENANT_BOT.to_string())
            .healthcheck_cmd("pgrep -f main.py || exit 1".to_string())
            .log_rotation(
                self.config.docker().log_max_size.clone(),
                self.config.docker().log_max_files,
            )
            .build()
            .map_err(|e| DeployError::Internal(e.to_string()))
    }

    async fn start_cold_container(
        &self,
        request: &DeployRequest,
        tenant: &Tenant,
        state: &mut ProvisionState,
    ) -> Result<(), DeployError> {
        let image_tag = self.config.docker().image_tag.clone();
        let available = self
            .driver
            .image_available(&image_tag)
            .await
            .map_err(DeployError::from)?;
        if !available {
            info!("Bot image {image_tag} missing; building");
            if let Err(e) = self
                .driver
                .build_image(&self.config.docker().build_context, &image_tag)
                .await
            {
                error!("Image build failed: {e}");
                return Err(DeployError::ContainerStart(
                    ContainerStartReason::ImageMissing,
                ));
            }
        }

        let spec = self.tenant_container_spec(request, tenant)?;
        let spec = &spec;
        retry_with_backoff(
            self.step_attempts(),
            self.step_backoff(),
            || async move {
                self.driver
                    .create_and_start(spec)
                    .await
                    .map_err(DeployError::from)
            },
            |e| e.is_transient(),
        )
        .await?;
        state.container_created = true;

        let timeout = Duration::from_secs(self.config.deploy().health_timeout_secs);
        let health = self
            .driver
            .wait_healthy(&tenant.container_name, timeout)
            .await
            .map_err(DeployError::from)?;
        match health {
            HealthStatus::RunningHealthy => Ok(()),
            HealthStatus::Exited { logs } => Err(DeployError::ContainerStart(
                ContainerStartReason::ExitedImmediately(logs),
            )),
            HealthStatus::UnhealthyWithErrors { logs } => Err(DeployError::ContainerStart(
                ContainerStartReason::Unhealthy(logs),
            )),
            HealthStatus::TimedOut => Err(DeployError::ContainerStart(
                ContainerStartReason::TimedOut,
            )),
        }
    }

    async fn provision_runtime(
        &self,
        request: &DeployRequest,
        tenant: &Tenant,
        state: &mut ProvisionState,
    ) -> Result<DeployOutcome, DeployError> {
        let schema = ValueObject::new(SchemaName(tenant.schema_name.clone()))
            .map_err(DeployError::Internal)?;
        self.materialize_schema(&schema).await?;
        state.schema_created = true;

        if self.config.deploy().warm_path_enabled {
            match self.try_warm_claim(request, tenant).await {
                Ok(Some(outcome)) => return Ok(outcome),
                Ok(None) => {}
                Err(e) => warn!("Warm path unavailable, using cold path: {e}"),
            }
        }

        self.start_cold_container(request, tenant, state).await?;
        self.repo
            .mark_container(tenant.id, true)
            .await
            .map_err(DeployError::from)?;

        Ok(DeployOutcome {
            tenant_id: tenant.id,
            container_name: tenant.container_name.clone(),
            schema_name: tenant.schema_name.clone(),
            cache_partition: tenant.cache_partition,
            warm_claimed: false,
        })
    }

    /// Reverse-order rollback. Every applicable step is attempted even if
    /// an earlier one fails; the report records each outcome.
    async fn compensate(&self, tenant: &Tenant, state: &ProvisionState) -> Vec<String> {
        let mut report = Vec::new();

        if state.container_created {
            match self
                .driver
                .stop(&tenant.container_name, COMPENSATION_STOP_GRACE)
                .await
            {
                Ok(()) => report.push("container stopped".to_string()),
                Err(e) => {
                    error!("Compensation: container stop failed: {e}");
                    report.push(format!("container stop failed: {e}"));
                }
            }
            match self.driver.remove(&tenant.container_name, true).await {
                Ok(()) => report.push("container removed".to_string()),
                Err(e) => {
                    error!("Compensation: container remove failed: {e}");
                    report.push(format!("container remove failed: {e}"));
                }
            }
        }

        if state.schema_created {
            match ValueObject::new(SchemaName(tenant.schema_name.clone())) {
                Ok(schema) => match SchemaManager::drop(&*self.schema_manager, &schema).await {
                    Ok(()) => report.push("schema dropped".to_string()),
                    Err(e) => {
                        error!("Compensation: schema drop failed: {e}");
                        report.push(format!("schema drop failed: {e}"));
                    }
                },
                Err(e) => report.push(format!("schema name rejected: {e}")),
            }
        }

        match self.repo.delete(tenant.id).await {
            Ok(()) => report.push("tenant record removed, cache partition released".to_string()),
            Err(e) => {
                error!("Compensation: tenant record removal failed: {e}");
                report.push(format!("tenant record removal failed: {e}"));
            }
        }

        report
    }
}

#[async_trait]
impl Deployer for DeployService {
    async fn deploy(&self, request: &DeployRequest) -> Result<DeployOutcome, DeployFailure> {
        info!(
            "Starting deployment for owner {} ({})",
            request.owner_contact_id, request.display_name
        );

        let tenant = self
            .register_tenant(request)
            .await
            .map_err(DeployFailure::clean)?;
        info!("Tenant registered: {} (partition {})", tenant.id, tenant.cache_partition);

        let mut state = ProvisionState::default();
        match self.provision_runtime(request, &tenant, &mut state).await {
            Ok(outcome) => {
                info!(
                    "Deployment finished: tenant={} container={} warm={}",
                    outcome.tenant_id, outcome.container_name, outcome.warm_claimed
                );
                Ok(outcome)
            }
            Err(error) => {
                error!("Deployment failed for tenant {}: {error}", tenant.id);
                let compensation = self.compensate(&tenant, &state).await;
                Err(DeployFailure {
                    error,
                    compensation,
                })
            }
        }
    }

    async fn teardown(&self, tenant_id: Uuid) -> Result<TeardownReport, DeployFailure> {
        let tenant = self
            .repo
            .get_by_id(tenant_id)
            .await
            .map_err(|e| DeployFailure::clean(e.into()))?;
        let mut steps = Vec::new();

        match self
            .driver
            .stop(&tenant.container_name, COMPENSATION_STOP_GRACE)
            .await
        {
            Ok(()) => steps.push("container stopped".to_string()),
            Err(crate::docker::ContainerError::NotFound(_)) => {
                steps.push("container already absent".to_string())
            }
            Err(e) => {
                warn!("Teardown: container stop failed: {e}");
                steps.push(format!("container stop failed: {e}"));
            }
        }
        match self.driver.remove(&tenant.container_name, true).await {
            Ok(()) => steps.push("container removed".to_string()),
            Err(crate::docker::ContainerError::NotFound(_)) => {}
            Err(e) => {
                warn!("Teardown: container remove failed: {e}");
                steps.push(format!("container remove failed: {e}"));
            }
        }

        if let Err(e) = self.warm_pool.forget(&tenant.container_name).await {
            warn!("Teardown: pool slot cleanup failed: {e}");
        }

        match ValueObject::new(SchemaName(tenant.schema_name.clone())) {
            Ok(schema) => match SchemaManager::drop(&*self.schema_manager, &schema).await {
                Ok(()) => steps.push("schema dropped".to_string()),
                Err(e) => {
                    warn!("Teardown: schema drop failed: {e}");
                    steps.push(format!("schema drop failed: {e}"));
                }
            },
            Err(e) => steps.push(format!("schema name rejected: {e}")),
        }

        self.repo.delete(tenant.id).await.map_err(|e| DeployFailure {
            error: e.into(),
            compensation: steps.clone(),
        })?;
        steps.push("tenant record removed".to_string());

        info!("Teardown finished for tenant {tenant_id}");
        Ok(TeardownReport { tenant_id, steps })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::{AppConfigBuilder, DeployConfig};
    use crate::deploy::schema::MockSchemaManager;
    use crate::docker::MockContainerDriver;
    use crate::pool::manager::{BotSlotState, MockWarmPool};
    use crate::tenants::repository::MockTenantsRepository;
    use crate::tenants::types::{SubscriptionPlan, SubscriptionStatus};
    use crate::common::types::{BotToken, DisplayName};
    use pretty_assertions::assert_eq;

    fn request() -> DeployRequest {
        DeployRequest {
            bot_token: ValueObject::new(BotToken(format!("100:{}", "A".repeat(35)))).unwrap(),
            bot_username: None,
            owner_contact_id: 42,
            display_name: ValueObject::new(DisplayName("Minta Ügyfél".to_string())).unwrap(),
            plan: SubscriptionPlan::Monthly,
            status: SubscriptionStatus::Active,
        }
    }

    fn registered_tenant(params: &RegisterTenant) -> Tenant {
        let now = Utc::now();
        Tenant {
            id: params.id,
            bot_token: params.bot_token.clone(),
            bot_username: params.bot_username.clone(),
            owner_contact_id: params.owner_contact_id,
            display_name: params.display_name.clone(),
            cache_partition: 0,
            container_name: params.container_name.clone(),
            schema_name: params.schema_name.clone(),
            subscription_status: params.status.as_str().to_string(),
            subscription_plan: params.plan.as_str().to_string(),
            started_at: now,
            expires_at: now + chrono::Duration::days(params.plan.duration_days()),
            container_running: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn cold_config() -> Arc<AppConfig> {
        let deploy = DeployConfig {
            warm_path_enabled: false,
            ..DeployConfig::default()
        };
        Arc::new(AppConfigBuilder::default().deploy(deploy).build().unwrap())
    }

    fn service(
        config: Arc<AppConfig>,
        repo: MockTenantsRepository,
        schema: MockSchemaManager,
        driver: MockContainerDriver,
        warm_pool: MockWarmPool,
    ) -> DeployService {
        DeployService::new(
            config,
            Arc::new(repo),
            Arc::new(schema),
            Arc::new(driver),
            Arc::new(warm_pool),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_cold_path_happy_flow() {
        let mut repo = MockTenantsRepository::new();
        repo.expect_register()
            .times(1)
            .returning(|params| Ok(registered_tenant(params)));
        repo.expect_mark_container()
            .times(1)
            .withf(|_, running| *running)
            .returning(|_, _| Ok(()));

        let mut schema = MockSchemaManager::new();
        schema.expect_create().times(1).returning(|_| Ok(()));

        let mut driver = MockContainerDriver::new();
        driver.expect_image_available().returning(|_| Ok(true));
        driver
            .expect_create_and_start()
            .times(1)
            .withf(|spec| {
                spec.name.starts_with("booking-client-")
                    && spec.env.iter().any(|(k, _)| k == "BOT_TOKEN")
                    && spec.env.iter().any(|(k, v)| k == "REDIS_DB" && v == "0")
                    && spec
                        .labels
                        .contains(&("purpose".to_string(), "tenant_bot".to_string()))
            })
            .returning(|_| Ok("container-id".to_string()));
        driver
            .expect_wait_healthy()
            .times(1)
            .returning(|_, _| Ok(HealthStatus::RunningHealthy));

        let service = service(
            cold_config(),
            repo,
            schema,
            driver,
            MockWarmPool::new(),
        );
        let outcome = service.deploy(&request()).await.unwrap();
        assert!(!outcome.warm_claimed);
        assert_eq!(outcome.cache_partition, 0);
        assert!(outcome.schema_name.starts_with("client_"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unhealthy_container_triggers_full_compensation() {
        let mut repo = MockTenantsRepository::new();
        repo.expect_register()
            .returning(|params| Ok(registered_tenant(params)));
        repo.expect_mark_container().times(0);
        repo.expect_delete().times(1).returning(|_| Ok(()));

        let mut schema = MockSchemaManager::new();
        schema.expect_create().returning(|_| Ok(()));
        schema.expect_drop().times(1).returning(|_| Ok(()));

        let mut driver = MockContainerDriver::new();
        driver.expect_image_available().returning(|_| Ok(true));
        driver
            .expect_create_and_start()
            .returning(|_| Ok("container-id".to_string()));
        driver.expect_wait_healthy().returning(|_, _| {
            Ok(HealthStatus::UnhealthyWithErrors {
                logs: "Traceback (most recent call last)".to_string(),
            })
        });
        driver.expect_stop().times(1).returning(|_, _| Ok(()));
        driver.expect_remove().times(1).returning(|_, _| Ok(()));

        let service = service(
            cold_config(),
            repo,
            schema,
            driver,
            MockWarmPool::new(),
        );
        let failure = service.deploy(&request()).await.unwrap_err();
        assert!(matches!(
            failure.error,
            DeployError::ContainerStart(ContainerStartReason::Unhealthy(_))
        ));
        assert_eq!(failure.compensation.len(), 4);
        assert!(failure.compensation.iter().any(|s| s.contains("schema dropped")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_schema_failure_rolls_back_registration_only() {
        let mut repo = MockTenantsRepository::new();
        repo.expect_register()
            .returning(|params| Ok(registered_tenant(params)));
        repo.expect_delete().times(1).returning(|_| Ok(()));

        let mut schema = MockSchemaManager::new();
        schema.expect_create().returning(|_| {
            Err(crate::common::error::RepositoryError::Custom(
                "permission denied".to_string(),
            ))
        });
        schema.expect_drop().times(0);

        let mut driver = MockContainerDriver::new();
        driver.expect_create_and_start().times(0);
        driver.expect_stop().times(0);

        let service = service(
            cold_config(),
            repo,
            schema,
            driver,
            MockWarmPool::new(),
        );
        let failure = service.deploy(&request()).await.unwrap_err();
        assert!(matches!(failure.error, DeployError::SchemaFailed(_)));
        assert_eq!(failure.compensation.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_warm_claim_skips_container_start() {
        let config = Arc::new(AppConfigBuilder::default().build().unwrap());
        let captured_id: Arc<std::sync::Mutex<Option<Uuid>>> =
            Arc::new(std::sync::Mutex::new(None));

        let mut repo = MockTenantsRepository::new();
        let capture = captured_id.clone();
        repo.expect_register().returning(move |params| {
            *capture.lock().unwrap() = Some(params.id);
            Ok(registered_tenant(params))
        });
        repo.expect_bind_container()
            .times(1)
            .withf(|_, container| container == "booking-bot-pool-2")
            .returning(|id, container| {
                let mut tenant = registered_tenant(&RegisterTenant {
                    id,
                    bot_token: format!("100:{}", "A".repeat(35)),
                    bot_username: None,
                    owner_contact_id: 42,
                    display_name: "Minta Ügyfél".to_string(),
                    container_name: container.to_string(),
                    schema_name: "client_a1b2c3d4".to_string(),
                    status: SubscriptionStatus::Active,
                    plan: SubscriptionPlan::Monthly,
                    partition_limit: Some(128),
                });
                tenant.container_running = true;
                Ok(tenant)
            });

        let mut schema = MockSchemaManager::new();
        schema.expect_create().returning(|_| Ok(()));

        let mut driver = MockContainerDriver::new();
        driver.expect_create_and_start().times(0);

        let mut warm_pool = MockWarmPool::new();
        warm_pool
            .expect_find_free()
            .returning(|| Ok(Some("booking-bot-pool-2".to_string())));
        warm_pool.expect_claim().times(1).returning(|_| Ok(true));
        warm_pool
            .expect_activate()
            .times(1)
            .withf(|_, record, ttl| record.admin_telegram_id == 42 && *ttl == 300)
            .returning(|_, _, _| Ok(true));
        let slot_capture = captured_id.clone();
        warm_pool.expect_slot_state().returning(move |_| {
            Ok(Some(BotSlotState {
                status: "active".to_string(),
                client_id: *slot_capture.lock().unwrap(),
                activated_at: Some(Utc::now()),
                claimed_at: None,
            }))
        });

        let service = service(config, repo, schema, driver, warm_pool);
        let outcome = service.deploy(&request()).await.unwrap();
        assert!(outcome.warm_claimed);
        assert_eq!(outcome.container_name, "booking-bot-pool-2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_warm_timeout_reverts_claim_and_falls_back() {
        let config = Arc::new(AppConfigBuilder::default().build().unwrap());

        let mut repo = MockTenantsRepository::new();
        repo.expect_register()
            .returning(|params| Ok(registered_tenant(params)));
        repo.expect_mark_container().returning(|_, _| Ok(()));

        let mut schema = MockSchemaManager::new();
        schema.expect_create().returning(|_| Ok(()));

        let mut warm_pool = MockWarmPool::new();
        warm_pool
            .expect_find_free()
            .returning(|| Ok(Some("booking-bot-pool-1".to_string())));
        warm_pool.expect_claim().returning(|_| Ok(true));
        warm_pool.expect_activate().returning(|_, _, _| Ok(true));
        warm_pool.expect_slot_state().returning(|_| {
            Ok(Some(BotSlotState {
                status: "claimed".to_string(),
                client_id: None,
                activated_at: None,
                claimed_at: Some(Utc::now()),
            }))
        });
        warm_pool.expect_release().times(1).returning(|_| Ok(()));
        warm_pool
            .expect_clear_activation()
            .times(1)
            .returning(|_| Ok(()));

        let mut driver = MockContainerDriver::new();
        driver.expect_image_available().returning(|_| Ok(true));
        driver
            .expect_create_and_start()
            .times(1)
            .returning(|_| Ok("container-id".to_string()));
        driver
            .expect_wait_healthy()
            .returning(|_, _| Ok(HealthStatus::RunningHealthy));

        let service = service(config, repo, schema, driver, warm_pool);
        let outcome = service.deploy(&request()).await.unwrap();
        assert!(!outcome.warm_claimed);
    }

    #[tokio::test]
    async fn test_teardown_runs_every_step() {
        let tenant_id = Uuid::new_v4();
        let mut repo = MockTenantsRepository::new();
        repo.expect_get_by_id().returning(move |id| {
            Ok(registered_tenant(&RegisterTenant {
                id,
                bot_token: format!("100:{}", "A".repeat(35)),
                bot_username: None,
                owner_contact_id: 42,
                display_name: "Minta Ügyfél".to_string(),
                container_name: "booking-client-a1b2c3d4".to_string(),
                schema_name: "client_a1b2c3d4".to_string(),
                status: SubscriptionStatus::Active,
                plan: SubscriptionPlan::Monthly,
                partition_limit: Some(128),
            }))
        });
        repo.expect_delete().times(1).returning(|_| Ok(()));

        let mut schema = MockSchemaManager::new();
        schema.expect_drop().times(1).returning(|_| Ok(()));

        let mut driver = MockContainerDriver::new();
        driver.expect_stop().times(1).returning(|_, _| Ok(()));
        driver.expect_remove().times(1).returning(|_, _| Ok(()));

        let mut warm_pool = MockWarmPool::new();
        warm_pool.expect_forget().times(1).returning(|_| Ok(()));

        let service = service(
            cold_config(),
            repo,
            schema,
            driver,
            warm_pool,
        );
        let report = service.teardown(tenant_id).await.unwrap();
        assert!(report.steps.contains(&"tenant record removed".to_string()));
        assert!(report.steps.contains(&"schema dropped".to_string()));
    }
}
