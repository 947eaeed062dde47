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
pub(crate) mod driver;
pub(crate) mod spec;

pub use driver::{
    ContainerDriver, ContainerError, ContainerResult, ContainerState, ContainerStats, DockerCli,
    HealthStatus,
};
#[cfg(test)]
pub use driver::MockContainerDriver;
pub use spec::{
    ContainerSpec, ContainerSpecBuilder, LABEL_MANAGED_BY, LABEL_PURPOSE, LABEL_SCHEMA,
    LABEL_TENANT_ID, MANAGED_BY_CONTROL_PLANE, PURPOSE_TENANT_BOT, PURPOSE_WARM_POOL,
};
