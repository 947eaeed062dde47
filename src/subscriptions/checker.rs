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
use crate::subscriptions::SubscriptionsModule;
use crate::tenants::model::Tenant;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info, warn};

const STOP_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

#[derive(Debug, Default, PartialEq)]
pub struct SweepReport {
    pub suspended: u32,
    pub warned: u32,
    pub failed: u32,
    pub purged: u64,
}

/// Timer-driven subscription enforcement.
///
/// Each sweep suspends expired tenants (container stop first, registry
/// second), dispatches expiry warnings deduplicated per tenant and day,
/// and purges soft deleted rows past the retention window. Running the
/// sweep twice over a steady state changes nothing.
pub struct SubscriptionChecker {
    module: Arc<dyn SubscriptionsModule>,
    shutdown: watch::Receiver<bool>,
}

impl SubscriptionChecker {
    pub fn new(module: Arc<dyn SubscriptionsModule>, shutdown: watch::Receiver<bool>) -> Self {
        Self { module, shutdown }
    }

    pub async fn run(mut self) {
        let interval =
            Duration::from_secs(self.module.config().subscriptions().check_interval_secs);
        info!("Subscription checker started (interval {:?})", interval);
        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(interval) => {
                    match sweep(self.module.clone()).await {
                        Ok(report) => info!(
                            "Subscription sweep: {} suspended, {} warned, {} failed, {} purged",
                            report.suspended, report.warned, report.failed, report.purged
                        ),
                        Err(e) => error!("Subscription sweep failed: {e}"),
                    }
                }
            }
        }
        info!("Subscription checker stopped");
    }
}

/// One enforcement pass. Per-tenant failures are counted, never fatal
/// for the rest of the sweep.
pub async fn sweep(module: Arc<dyn SubscriptionsModule>) -> Result<SweepReport, SweepError> {
    let mut report = SweepReport::default();
    let subscriptions_config = module.config().subscriptions().clone();

    let expired = module.tenants_repo().expiring(0).await?;
    if !expired.is_empty() {
        info!("Found {} expired subscription(s)", expired.len());
    }
    for tenant in expired {
        match suspend_expired(module.clone(), &tenant).await {
            Ok(()) => report.suspended += 1,
            Err(e) => {
                error!("Could not suspend expired tenant {}: {e}", tenant.id);
                report.failed += 1;
            }
        }
    }

    let window_secs = subscriptions_config.warning_window_days * 86_400;
    let now = Utc::now();
    for tenant in module.tenants_repo().expiring(window_secs).await? {
        // Already-expired rows show up in the window query too; they were
        // handled above.
        if tenant.expires_at <= now {
            continue;
        }
        if module.mark_warned_today(tenant.id).await? {
            let text = format!(
                "📢 *Az előfizetése hamarosan lejár!*\n\n\
                 🏢 *{}*\n\
                 📅 Lejárat: {}\n\n\
                 Kérjük, időben hosszabbítsa meg, hogy a botja folyamatosan üzemeljen.",
                tenant.display_name,
                tenant.expires_at.format("%Y-%m-%d %H:%M"),
            );
            if let Err(e) = module.send_message(tenant.owner_contact_id, &text).await {
                warn!("Expiry warning failed for tenant {}: {e}", tenant.id);
            } else {
                report.warned += 1;
            }
        }
    }

    report.purged = module
        .tenants_repo()
        .purge_deleted(subscriptions_config.purge_after_days)
        .await?;

    Ok(report)
}

async fn suspend_expired(
    module: Arc<dyn SubscriptionsModule>,
    tenant: &Tenant,
) -> Result<(), SweepError> {
    match module
        .container_driver()
        .stop(&tenant.container_name, STOP_GRACE)
        .await
    {
        Ok(()) | Err(ContainerError::NotFound(_)) => {}
        Err(e) => return Err(e.into()),
    }

    let reason = format!("expired at {}", tenant.expires_at.to_rfc3339());
    module.tenants_repo().suspend(tenant.id, &reason).await?;
    module
        .tenants_repo()
        .record_event(
            tenant.id,
            "expired",
            json!({ "expires_at": tenant.expires_at }),
        )
        .await?;

    let text = format!(
        "⚠️ *Az előfizetése lejárt!*\n\n\
         🏢 *{}*\n\
         A botját leállítottuk. Az újraindításhoz hosszabbítsa meg az előfizetését.",
        tenant.display_name,
    );
    if let Err(e) = module.send_message(tenant.owner_contact_id, &text).await {
        warn!("Expiry notification failed for tenant {}: {e}", tenant.id);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::AppConfigBuilder;
    use crate::docker::MockContainerDriver;
    use crate::subscriptions::tests::MockSubscriptionsModule;
    use crate::tenants::repository::MockTenantsRepository;
    use chrono::Duration as ChronoDuration;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn expired_tenant() -> Tenant {
        let now = Utc::now();
        Tenant {
            id: Uuid::new_v4(),
            bot_token: format!("100:{}", "A".repeat(35)),
            bot_username: None,
            owner_contact_id: 42,
            display_name: "Lejárt Ügyfél".to_string(),
            cache_partition: 1,
            container_name: "booking-client-deadbeef".to_string(),
            schema_name: "client_deadbeef".to_string(),
            subscription_status: "active".to_string(),
            subscription_plan: "monthly".to_string(),
            started_at: now - ChronoDuration::days(31),
            expires_at: now - ChronoDuration::hours(1),
            container_running: true,
            created_at: now - ChronoDuration::days(31),
            updated_at: now,
            deleted_at: None,
        }
    }

    fn module_with(
        repo: MockTenantsRepository,
        driver: MockContainerDriver,
    ) -> MockSubscriptionsModule {
        let repo = Arc::new(repo);
        let driver = Arc::new(driver);
        let config = Arc::new(AppConfigBuilder::default().build().unwrap());

        let mut module = MockSubscriptionsModule::new();
        module.expect_config().returning(move || config.clone());
        module
            .expect_tenants_repo()
            .returning(move || repo.clone());
        module
            .expect_container_driver()
            .returning(move || driver.clone());
        module
    }

    #[tokio::test]
    async fn test_expired_tenant_is_stopped_suspended_and_notified() {
        let tenant = expired_tenant();
        let tenant_id = tenant.id;

        let mut repo = MockTenantsRepository::new();
        let expired = tenant.clone();
        let mut first = true;
        repo.expect_expiring().times(2).returning(move |within| {
            if within == 0 && first {
                first = false;
                Ok(vec![expired.clone()])
            } else {
                Ok(vec![])
            }
        });
        let suspended = {
            let mut t = tenant.clone();
            t.subscription_status = "suspended".to_string();
            t.container_running = false;
            t
        };
        repo.expect_suspend()
            .times(1)
            .withf(move |id, reason| *id == tenant_id && reason.starts_with("expired at"))
            .returning(move |_, _| Ok(suspended.clone()));
        repo.expect_record_event()
            .times(1)
            .withf(move |id, kind, _| *id == tenant_id && kind == "expired")
            .returning(|_, _, _| Ok(()));
        repo.expect_purge_deleted().times(1).returning(|_| Ok(0));

        let mut driver = MockContainerDriver::new();
        driver
            .expect_stop()
            .times(1)
            .withf(|name, _| name == "booking-client-deadbeef")
            .returning(|_, _| Ok(()));

        let mut module = module_with(repo, driver);
        module
            .expect_send_message()
            .times(1)
            .withf(|chat_id, text| *chat_id == 42 && text.contains("lejárt"))
            .returning(|_, _| Ok(()));

        let report = sweep(Arc::new(module)).await.unwrap();
        assert_eq!(report.suspended, 1);
        assert_eq!(report.failed, 0);
    }

    #[tokio::test]
    async fn test_sweep_is_idempotent_on_steady_state() {
        let mut repo = MockTenantsRepository::new();
        repo.expect_expiring().returning(|_| Ok(vec![]));
        repo.expect_suspend().times(0);
        repo.expect_purge_deleted().returning(|_| Ok(0));

        let mut driver = MockContainerDriver::new();
        driver.expect_stop().times(0);

        let mut module = module_with(repo, driver);
        module.expect_send_message().times(0);

        let report = sweep(Arc::new(module)).await.unwrap();
        assert_eq!(report, SweepReport::default());
    }

    #[tokio::test]
    async fn test_expiring_soon_is_warned_once_per_day() {
        let mut soon = expired_tenant();
        soon.expires_at = Utc::now() + ChronoDuration::days(2);
        let soon_id = soon.id;

        let mut repo = MockTenantsRepository::new();
        let windowed = soon.clone();
        repo.expect_expiring().returning(move |within| {
            if within == 0 {
                Ok(vec![])
            } else {
                Ok(vec![windowed.clone()])
            }
        });
        repo.expect_purge_deleted().returning(|_| Ok(0));

        let mut module = module_with(repo, MockContainerDriver::new());
        // First sweep wins the dedup key, second one loses it.
        let mut fresh = true;
        module
            .expect_mark_warned_today()
            .times(2)
            .withf(move |id| *id == soon_id)
            .returning(move |_| {
                let was_fresh = fresh;
                fresh = false;
                Ok(was_fresh)
            });
        module
            .expect_send_message()
            .times(1)
            .withf(|_, text| text.contains("hamarosan lejár"))
            .returning(|_, _| Ok(()));

        let module = Arc::new(module);
        let first = sweep(module.clone()).await.unwrap();
        assert_eq!(first.warned, 1);
        let second = sweep(module).await.unwrap();
        assert_eq!(second.warned, 0);
    }

    #[tokio::test]
    async fn test_stop_failure_counts_as_failed_not_suspended() {
        let tenant = expired_tenant();

        let mut repo = MockTenantsRepository::new();
        let expired = tenant.clone();
        repo.expect_expiring().returning(move |within| {
            if within == 0 {
                Ok(vec![expired.clone()])
            } else {
                Ok(vec![])
            }
        });
        repo.expect_suspend().times(0);
        repo.expect_purge_deleted().returning(|_| Ok(0));

        let mut driver = MockContainerDriver::new();
        driver
            .expect_stop()
            .returning(|_, _| Err(ContainerError::Command("daemon busy".to_string())));

        let mut module = module_with(repo, driver);
        module.expect_send_message().times(0);

        let report = sweep(Arc::new(module)).await.unwrap();
        assert_eq!(report.suspended, 0);
        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn test_purge_counts_are_reported() {
        let mut repo = MockTenantsRepository::new();
        repo.expect_expiring().returning(|_| Ok(vec![]));
        repo.expect_purge_deleted()
            .times(1)
            .withf(|days| *days == 365)
            .returning(|_| Ok(2));

        let module = module_with(repo, MockContainerDriver::new());
        let report = sweep(Arc::new(module)).await.unwrap();
        assert_eq!(report.purged, 2);
    }
}
