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
use crate::app::config::DatabaseConfig;
use crate::common::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::str::FromStr;
use std::time::Duration;

/// Provides access to the PostgreSQL connection pool of the shared
/// instance.
///
/// Every repository in the crate is implemented on top of this trait's
/// concrete implementor, so handing a `PgPoolManager` to a module is all
/// the wiring its repositories need.
pub trait PoolProvider: Send + Sync {
    fn pool(&self) -> PgPool;
}

/// Owns the connection pool of the shared PostgreSQL instance.
///
/// The same pool serves the `master_bot` control schema and the templated
/// per-tenant schema DDL; statements carry a 60 second server side
/// timeout so a stuck query cannot wedge a provisioning job forever.
pub struct PgPoolManager {
    pool: PgPool,
}

impl PgPoolManager {
    pub async fn new(config: &DatabaseConfig) -> Result<PgPoolManager, RepositoryError> {
        let options = PgConnectOptions::from_str(&config.url())?
            .options([("statement_timeout", "60000")]);
        let pool = PgPoolOptions::new()
            .max_connections(config.max_pool_size())
            .acquire_timeout(Duration::from_secs(3))
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }
}

impl PoolProvider for PgPoolManager {
    fn pool(&self) -> PgPool {
        self.pool.clone()
    }
}

/// Runs the embedded control plane migrations.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DatabaseMigrator: Send + Sync {
    async fn migrate_control_db(&self) -> RepositoryResult<()>;
}

#[async_trait]
impl DatabaseMigrator for PgPoolManager {
    async fn migrate_control_db(&self) -> RepositoryResult<()> {
        Ok(sqlx::migrate!("./migrations").run(&self.pool).await?)
    }
}
