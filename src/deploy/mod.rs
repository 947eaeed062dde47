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
use crate::common::{ConfigProvider, DefaultAppState, Notifier};
use crate::deploy::queue::DeployQueue;
use crate::deploy::schema::SchemaManager;
use crate::deploy::service::Deployer;
use crate::docker::ContainerDriver;
use crate::pool::manager::WarmPool;
use crate::tenants::repository::TenantsRepository;
use std::sync::Arc;

pub(crate) mod dto;
pub(crate) mod error;
mod handler;
pub(crate) mod queue;
pub(crate) mod routes;
pub(crate) mod schema;
pub(crate) mod service;
pub(crate) mod worker;

pub trait DeployModule: ConfigProvider + Notifier + Send + Sync {
    fn tenants_repo(&self) -> Arc<dyn TenantsRepository>;
    fn schema_manager(&self) -> Arc<dyn SchemaManager>;
    fn container_driver(&self) -> Arc<dyn ContainerDriver>;
    fn warm_pool(&self) -> Arc<dyn WarmPool>;
    fn deploy_queue(&self) -> Arc<dyn DeployQueue>;
    fn deployer(&self) -> Arc<dyn Deployer>;
}

impl DeployModule for DefaultAppState {
    fn tenants_repo(&self) -> Arc<dyn TenantsRepository> {
        self.pool_manager.clone()
    }
    fn schema_manager(&self) -> Arc<dyn SchemaManager> {
        self.schema_manager.clone()
    }
    fn container_driver(&self) -> Arc<dyn ContainerDriver> {
        self.container_driver.clone()
    }
    fn warm_pool(&self) -> Arc<dyn WarmPool> {
        self.warm_pool.clone()
    }
    fn deploy_queue(&self) -> Arc<dyn DeployQueue> {
        self.deploy_queue.clone()
    }
    fn deployer(&self) -> Arc<dyn Deployer> {
        self.deployer.clone()
    }
}
