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
use crate::deploy::service::Deployer;
use crate::docker::ContainerDriver;
use crate::tenants::repository::TenantsRepository;
use std::sync::Arc;

pub(crate) mod dto;
mod handler;
pub(crate) mod model;
pub(crate) mod repository;
pub(crate) mod routes;
pub(crate) mod service;
pub(crate) mod types;

pub trait TenantsModule: ConfigProvider + Notifier + Send + Sync {
    fn tenants_repo(&self) -> Arc<dyn TenantsRepository>;
    fn container_driver(&self) -> Arc<dyn ContainerDriver>;
    fn deployer(&self) -> Arc<dyn Deployer>;
}

impl TenantsModule for DefaultAppState {
    fn tenants_repo(&self) -> Arc<dyn TenantsRepository> {
        self.pool_manager.clone()
    }
    fn container_driver(&self) -> Arc<dyn ContainerDriver> {
        self.container_driver.clone()
    }
    fn deployer(&self) -> Arc<dyn Deployer> {
        self.deployer.clone()
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::app::config::AppConfig;
    use crate::common::notify::NotifyError;
    use async_trait::async_trait;
    use mockall::mock;

    mock!(
        pub TenantsModule {}
        impl ConfigProvider for TenantsModule {
            fn config(&self) -> Arc<AppConfig>;
        }
        #[async_trait]
        impl Notifier for TenantsModule {
            async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), NotifyError>;
            async fn send_admin(&self, text: &str) -> Result<(), NotifyError>;
        }
        impl TenantsModule for TenantsModule {
            fn tenants_repo(&self) -> Arc<dyn TenantsRepository>;
            fn container_driver(&self) -> Arc<dyn ContainerDriver>;
            fn deployer(&self) -> Arc<dyn Deployer>;
        }
    );
}
