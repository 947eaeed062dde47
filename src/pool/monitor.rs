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
use crate::app::config::AppConfig;
use crate::common::error::BuilderError;
use crate::docker::{
    ContainerError, ContainerSpec, ContainerSpecBuilder, LABEL_MANAGED_BY, LABEL_PURPOSE,
    MANAGED_BY_CONTROL_PLANE, PURPOSE_WARM_POOL,
};
use crate::pool::PoolModule;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum PoolMonitorError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    #[error("Spec error: {0}")]
    Builder(#[from] BuilderError),
}

/// How many pool containers to launch given the current inventory.
///
/// Scale-down is deliberately absent; idle bots are cheap and shrinking
/// the pool is a manual operation.
pub fn decide_scale(waiting: u32, total: u32, min_free: u32, max_total: u32, batch: u32) -> u32 {
    if waiting < min_free && total < max_total {
        batch.min(max_total - total)
    } else {
        0
    }
}

fn pool_container_spec(
    config: &AppConfig,
    pool_id: u32,
    container_name: &str,
) -> Result<ContainerSpec, BuilderError> {
    ContainerSpecBuilder::new()
        .name(container_name.to_string())
        .image(config.docker().image_tag.clone())
        .command(vec!["python".to_string(), "main_pool.py".to_string()])
        .network(config.docker().network.clone())
        .env("BOT_POOL_ID", pool_id.to_string())
        .env("CLIENT_ID", "waiting".to_string())
        .env("DATABASE_URL", config.database().url())
        .env("REDIS_HOST", config.cache().host.clone())
        .env("REDIS_PORT", config.cache().port.to_string())
        .env("REDIS_DB", config.cache().db.to_string())
        .label(LABEL_MANAGED_BY, MANAGED_BY_CONTROL_PLANE.to_string())
        .label(LABEL_PURPOSE, PURPOSE_WARM_POOL.to_string())
        .log_rotation(
            config.docker().log_max_size.clone(),
            config.docker().log_max_files,
        )
        .build()
}

/// Periodic autoscaler keeping `min_free` idle bots ready.
pub struct PoolMonitor {
    module: Arc<dyn PoolModule>,
    shutdown: watch::Receiver<bool>,
}

impl PoolMonitor {
    pub fn new(module: Arc<dyn PoolModule>, shutdown: watch::Receiver<bool>) -> Self {
        Self { module, shutdown }
    }

    pub async fn run(mut self) {
        let pool_config = self.module.config().pool().clone();
        if !pool_config.enabled {
            info!("Pool monitor disabled by configuration");
            return;
        }
        info!(
            "Pool monitor started: min_free={} max_total={} batch={} interval={}s",
            pool_config.min_free,
            pool_config.max_total,
            pool_config.scale_batch,
            pool_config.check_interval_secs
        );
        let interval = Duration::from_secs(pool_config.check_interval_secs);
        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(interval) => {
                    if let Err(e) = check_and_scale(self.module.clone()).await {
                        error!("Pool monitor sweep failed: {e}");
                    }
                }
            }
        }
        info!("Pool monitor stopped");
    }
}

/// One autoscaler sweep: read the inventory, launch the shortfall.
pub async fn check_and_scale(module: Arc<dyn PoolModule>) -> Result<u32, PoolMonitorError> {
    let config = module.config();
    let pool_config = config.pool();
    let status = module.warm_pool().status().await?;
    info!(
        "Pool status: {} free / {} active / {} total",
        status.waiting, status.active, status.total
    );

    let to_add = decide_scale(
        status.waiting,
        status.total,
        pool_config.min_free,
        pool_config.max_total,
        pool_config.scale_batch,
    );
    if to_add == 0 {
        return Ok(0);
    }
    warn!(
        "Low free bot count: {} < {}; scaling up by {to_add}",
        status.waiting, pool_config.min_free
    );

    for offset in 1..=to_add {
        let pool_id = status.total + offset;
        let container_name = format!("{}{}", pool_config.container_prefix, pool_id);
        let spec = pool_container_spec(&config, pool_id, &container_name)?;

        module.container_driver().create_and_start(&spec).await?;
        module.warm_pool().init_slot(&container_name).await?;
        module.warm_pool().register_slots(1).await?;
        info!("Pool container launched: {container_name}");
    }
    Ok(to_add)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::AppConfigBuilder;
    use crate::docker::MockContainerDriver;
    use crate::pool::manager::{MockWarmPool, PoolStatus};
    use crate::pool::tests::MockPoolModule;
    use pretty_assertions::assert_eq;

    fn pool_status(waiting: u32, active: u32, total: u32) -> PoolStatus {
        PoolStatus {
            total,
            waiting,
            claimed: 0,
            active,
            unknown: total.saturating_sub(waiting + active),
            bots: Vec::new(),
        }
    }

    #[test]
    fn test_decide_scale_healthy_pool() {
        assert_eq!(decide_scale(5, 10, 3, 100, 5), 0);
        assert_eq!(decide_scale(3, 10, 3, 100, 5), 0);
    }

    #[test]
    fn test_decide_scale_low_pool() {
        assert_eq!(decide_scale(1, 10, 3, 100, 5), 5);
        assert_eq!(decide_scale(0, 0, 3, 100, 5), 5);
    }

    #[test]
    fn test_decide_scale_respects_ceiling() {
        assert_eq!(decide_scale(1, 98, 3, 100, 5), 2);
        assert_eq!(decide_scale(1, 100, 3, 100, 5), 0);
    }

    fn module_with(
        warm_pool: MockWarmPool,
        driver: MockContainerDriver,
    ) -> Arc<MockPoolModule> {
        let warm_pool = Arc::new(warm_pool);
        let driver = Arc::new(driver);
        let config = Arc::new(AppConfigBuilder::default().build().unwrap());

        let mut module = MockPoolModule::new();
        module.expect_config().returning(move || config.clone());
        module
            .expect_warm_pool()
            .returning(move || warm_pool.clone());
        module
            .expect_container_driver()
            .returning(move || driver.clone());
        Arc::new(module)
    }

    #[tokio::test]
    async fn test_sweep_launches_shortfall() {
        let mut warm_pool = MockWarmPool::new();
        warm_pool
            .expect_status()
            .returning(|| Ok(pool_status(1, 4, 5)));
        warm_pool
            .expect_init_slot()
            .times(5)
            .withf(|name| name.starts_with("booking-bot-pool-"))
            .returning(|_| Ok(()));
        warm_pool
            .expect_register_slots()
            .times(5)
            .returning(|_| Ok(6));

        let mut driver = MockContainerDriver::new();
        driver
            .expect_create_and_start()
            .times(5)
            .withf(|spec| {
                spec.command == vec!["python".to_string(), "main_pool.py".to_string()]
                    && spec
                        .labels
                        .contains(&("purpose".to_string(), "warm_pool".to_string()))
            })
            .returning(|spec| Ok(format!("id-{}", spec.name)));

        let module = module_with(warm_pool, driver);
        assert_eq!(check_and_scale(module).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_sweep_idle_when_pool_is_healthy() {
        let mut warm_pool = MockWarmPool::new();
        warm_pool
            .expect_status()
            .returning(|| Ok(pool_status(4, 6, 10)));
        warm_pool.expect_init_slot().times(0);

        let mut driver = MockContainerDriver::new();
        driver.expect_create_and_start().times(0);

        let module = module_with(warm_pool, driver);
        assert_eq!(check_and_scale(module).await.unwrap(), 0);
    }
}
