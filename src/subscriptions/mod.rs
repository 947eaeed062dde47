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
use crate::common::{ConfigProvider, DefaultAppState, Notifier};
use crate::docker::ContainerDriver;
use crate::tenants::repository::TenantsRepository;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub(crate) mod checker;

#[async_trait]
pub trait SubscriptionsModule: ConfigProvider + Notifier + Send + Sync {
    fn tenants_repo(&self) -> Arc<dyn TenantsRepository>;
    fn container_driver(&self) -> Arc<dyn ContainerDriver>;
    /// Claims the per-tenant/per-day expiry warning slot; `false` means a
    /// warning already went out today.
    async fn mark_warned_today(&self, tenant_id: Uuid) -> Result<bool, CacheError>;
}

#[async_trait]
impl SubscriptionsModule for DefaultAppState {
    fn tenants_repo(&self) -> Arc<dyn TenantsRepository> {
        self.pool_manager.clone()
    }
    fn container_driver(&self) -> Arc<dyn ContainerDriver> {
        self.container_driver.clone()
    }
    async fn mark_warned_today(&self, tenant_id: Uuid) -> Result<bool, CacheError> {
        let key = format!(
            "expiry_warned:{}:{}",
            tenant_id,
            Utc::now().format("%Y-%m-%d")
        );
        self.cache.set_nx_ex(&key, "1", 172_800).await
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::app::config::AppConfig;
    use crate::common::notify::NotifyError;
    use mockall::mock;

    mock!(
        pub SubscriptionsModule {}
        impl ConfigProvider for SubscriptionsModule {
            fn config(&self) -> Arc<AppConfig>;
        }
        #[async_trait]
        impl Notifier for SubscriptionsModule {
            async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), NotifyError>;
            async fn send_admin(&self, text: &str) -> Result<(), NotifyError>;
        }
        #[async_trait]
        impl SubscriptionsModule for SubscriptionsModule {
            fn tenants_repo(&self) -> Arc<dyn TenantsRepository>;
            fn container_driver(&self) -> Arc<dyn ContainerDriver>;
            async fn mark_warned_today(&self, tenant_id: Uuid) -> Result<bool, CacheError>;
        }
    );
}
