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
use crate::common::{ConfigProvider, DefaultAppState};
use crate::docker::ContainerDriver;
use crate::pool::manager::WarmPool;
use std::sync::Arc;

mod handler;
pub(crate) mod manager;
pub(crate) mod monitor;
pub(crate) mod routes;

pub trait PoolModule: ConfigProvider + Send + Sync {
    fn warm_pool(&self) -> Arc<dyn WarmPool>;
    fn container_driver(&self) -> Arc<dyn ContainerDriver>;
}

impl PoolModule for DefaultAppState {
    fn warm_pool(&self) -> Arc<dyn WarmPool> {
        self.warm_pool.clone()
    }
    fn container_driver(&self) -> Arc<dyn ContainerDriver> {
        self.container_driver.clone()
    }
}
