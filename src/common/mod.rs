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
use crate::app::cache::RedisManager;
use crate::app::config::AppConfig;
use crate::app::database::{DatabaseMigrator, PgPoolManager, PoolProvider};
use crate::common::notify::{NotifyError, TelegramNotifier};
use crate::deploy::queue::{DeployQueue, RedisDeployQueue};
use crate::deploy::schema::{PgSchemaManager, SchemaManager};
use crate::deploy::service::{DeployService, Deployer};
use crate::docker::{ContainerDriver, DockerCli};
use crate::pool::manager::{BotPoolManager, WarmPool};
use async_trait::async_trait;
use std::sync::Arc;

pub(crate) mod dto;
pub(crate) mod error;
pub(crate) mod notify;
pub(crate) mod services;
pub(crate) mod types;

pub trait ConfigProvider: Send + Sync {
    fn config(&self) -> Arc<AppConfig>;
}

/// Outbound notification capability shared by every module that talks to
/// tenant owners or to the platform admin.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), NotifyError>;
    async fn send_admin(&self, text: &str) -> Result<(), NotifyError>;
}

/// Shared dependency bag of the whole control plane.
///
/// Every module trait (`TenantsModule`, `DeployModule`, ...) is
/// implemented on this type, so handlers and background tasks receive one
/// `Arc` and pick the capabilities they need. Nothing in the crate
/// reaches for module-level state.
pub struct AppState<P, N>
where
    P: Send + Sync,
    N: Send + Sync,
{
    pub config: Arc<AppConfig>,
    pub pool_manager: Arc<P>,
    pub cache: Arc<RedisManager>,
    pub container_driver: Arc<dyn ContainerDriver>,
    pub schema_manager: Arc<dyn SchemaManager>,
    pub warm_pool: Arc<dyn WarmPool>,
    pub deploy_queue: Arc<dyn DeployQueue>,
    pub deployer: Arc<dyn Deployer>,
    pub notifier: Arc<N>,
}

pub type DefaultAppState = AppState<PgPoolManager, TelegramNotifier>;

impl DefaultAppState {
    fn init_config() -> anyhow::Result<AppConfig> {
        Ok(AppConfig::from_env()?)
    }

    pub async fn new() -> anyhow::Result<DefaultAppState> {
        let config = Arc::new(Self::init_config()?);
        let pool_manager = Arc::new(PgPoolManager::new(config.database()).await?);
        let cache = Arc::new(RedisManager::new(config.cache()).await?);
        let container_driver: Arc<dyn ContainerDriver> =
            Arc::new(DockerCli::new(config.docker()));
        let schema_manager: Arc<dyn SchemaManager> =
            Arc::new(PgSchemaManager::new(pool_manager.pool()));
        let warm_pool: Arc<dyn WarmPool> = Arc::new(BotPoolManager::new(
            cache.clone(),
            config.pool().container_prefix.clone(),
        ));
        let deploy_queue: Arc<dyn DeployQueue> = Arc::new(RedisDeployQueue::new(cache.clone()));
        let deployer: Arc<dyn Deployer> = Arc::new(DeployService::new(
            config.clone(),
            pool_manager.clone(),
            schema_manager.clone(),
            container_driver.clone(),
            warm_pool.clone(),
        ));
        let notifier = Arc::new(TelegramNotifier::new(config.notifier())?);

        Ok(Self {
            config,
            pool_manager,
            cache,
            container_driver,
            schema_manager,
            warm_pool,
            deploy_queue,
            deployer,
            notifier,
        })
    }

    pub async fn migrate_control_db(&self) -> anyhow::Result<()> {
        Ok(self.pool_manager.migrate_control_db().await?)
    }
}

impl<P, N> ConfigProvider for AppState<P, N>
where
    P: Send + Sync,
    N: Send + Sync,
{
    fn config(&self) -> Arc<AppConfig> {
        self.config.clone()
    }
}

#[async_trait]
impl<P> Notifier for AppState<P, TelegramNotifier>
where
    P: Send + Sync,
{
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), NotifyError> {
        self.notifier.send_message(chat_id, text).await
    }
    async fn send_admin(&self, text: &str) -> Result<(), NotifyError> {
        self.notifier.send_admin(text).await
    }
}
