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
use crate::common::error::RepositoryError;
use crate::common::types::value_object::ValueObjectable;
use crate::common::types::{SchemaName, ValueObject};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use sqlx::PgPool;
use tracing::info;

/// Creates and drops per-tenant database schemas.
///
/// The per-tenant DDL is a fixed template, not an incremental migration
/// chain: `create` must succeed even over a partially existing schema, so
/// the schema, every table, and every index use `IF NOT EXISTS`. A schema
/// therefore either ends up complete or is dropped as a whole.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SchemaManager: Send + Sync {
    async fn create(&self, schema: &ValueObject<SchemaName>) -> Result<(), RepositoryError>;
    async fn drop(&self, schema: &ValueObject<SchemaName>) -> Result<(), RepositoryError>;
    async fn exists(&self, schema: &ValueObject<SchemaName>) -> Result<bool, RepositoryError>;
}

/// The booking-domain tables every tenant schema carries.
///
/// Identifiers cannot be bound as parameters in DDL, which is why the
/// interface only accepts validated [`SchemaName`] values.
fn table_statements(schema: &str) -> Vec<String> {
    vec![
        format!(
            "CREATE TABLE IF NOT EXISTS {schema}.users (
                user_id BIGINT PRIMARY KEY,
                username TEXT,
                first_name TEXT,
                last_name TEXT,
                phone TEXT,
                first_seen TIMESTAMP DEFAULT NOW(),
                created_at TIMESTAMP DEFAULT NOW()
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {schema}.services (
                id SERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                duration_minutes INTEGER NOT NULL DEFAULT 60,
                price TEXT,
                is_active BOOLEAN DEFAULT TRUE,
                created_at TIMESTAMP DEFAULT NOW()
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {schema}.bookings (
                id SERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL,
                username TEXT,
                date TEXT NOT NULL,
                time TEXT NOT NULL,
                service_id INTEGER REFERENCES {schema}.services(id),
                duration_minutes INTEGER DEFAULT 60,
                status TEXT DEFAULT 'active',
                created_at TIMESTAMP DEFAULT NOW(),
                updated_at TIMESTAMP DEFAULT NOW(),
                CONSTRAINT bookings_date_time_unique UNIQUE (date, time)
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {schema}.admins (
                user_id BIGINT PRIMARY KEY,
                username TEXT,
                role TEXT DEFAULT 'moderator',
                added_by BIGINT,
                added_at TIMESTAMP DEFAULT NOW()
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {schema}.blocked_slots (
                id SERIAL PRIMARY KEY,
                date TEXT NOT NULL,
                time TEXT NOT NULL,
                reason TEXT,
                blocked_by BIGINT NOT NULL,
                blocked_at TIMESTAMP DEFAULT NOW(),
                CONSTRAINT blocked_slots_date_time_unique UNIQUE (date, time)
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {schema}.feedback (
                id SERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL,
                booking_id INTEGER,
                rating INTEGER NOT NULL CHECK (rating >= 1 AND rating <= 5),
                comment TEXT,
                timestamp TIMESTAMP DEFAULT NOW()
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {schema}.audit_log (
                id SERIAL PRIMARY KEY,
                admin_id BIGINT NOT NULL,
                action TEXT NOT NULL,
                target_id TEXT,
                details TEXT,
                timestamp TIMESTAMP DEFAULT NOW()
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {schema}.booking_history (
                id SERIAL PRIMARY KEY,
                booking_id INTEGER NOT NULL,
                changed_by BIGINT NOT NULL,
                changed_by_type TEXT NOT NULL,
                action TEXT NOT NULL,
                old_date TEXT,
                old_time TEXT,
                new_date TEXT,
                new_time TEXT,
                old_service_id INTEGER,
                new_service_id INTEGER,
                reason TEXT,
                changed_at TIMESTAMP DEFAULT NOW()
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {schema}.settings (
                key TEXT PRIMARY KEY,
                value TEXT,
                description TEXT,
                updated_at TIMESTAMP DEFAULT NOW()
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {schema}.text_templates (
                id SERIAL PRIMARY KEY,
                key TEXT NOT NULL UNIQUE,
                text TEXT NOT NULL,
                description TEXT,
                updated_at TIMESTAMP DEFAULT NOW()
            )"
        ),
    ]
}

fn index_statements(schema: &str) -> Vec<String> {
    vec![
        format!("CREATE INDEX IF NOT EXISTS idx_bookings_date ON {schema}.bookings(date, time)"),
        format!("CREATE INDEX IF NOT EXISTS idx_bookings_user ON {schema}.bookings(user_id)"),
        format!("CREATE INDEX IF NOT EXISTS idx_bookings_service ON {schema}.bookings(service_id)"),
        format!("CREATE INDEX IF NOT EXISTS idx_bookings_status ON {schema}.bookings(status)"),
        format!("CREATE INDEX IF NOT EXISTS idx_blocked_date ON {schema}.blocked_slots(date, time)"),
        format!("CREATE INDEX IF NOT EXISTS idx_feedback_user ON {schema}.feedback(user_id)"),
        format!(
            "CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON {schema}.audit_log(timestamp)"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS idx_booking_history_booking \
                 ON {schema}.booking_history(booking_id)"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS idx_booking_history_changed_at \
                 ON {schema}.booking_history(changed_at)"
        ),
    ]
}

pub struct PgSchemaManager {
    pool: PgPool,
}

impl PgSchemaManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SchemaManager for PgSchemaManager {
    async fn create(&self, schema: &ValueObject<SchemaName>) -> Result<(), RepositoryError> {
        let name = schema.extract().get_value();
        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {name}"))
            .execute(&self.pool)
            .await?;
        for statement in table_statements(name) {
            sqlx::query(&statement).execute(&self.pool).await?;
        }
        for statement in index_statements(name) {
            sqlx::query(&statement).execute(&self.pool).await?;
        }
        info!("Tenant schema materialized: {name}");
        Ok(())
    }

    async fn drop(&self, schema: &ValueObject<SchemaName>) -> Result<(), RepositoryError> {
        let name = schema.extract().get_value();
        sqlx::query(&format!("DROP SCHEMA IF EXISTS {name} CASCADE"))
            .execute(&self.pool)
            .await?;
        info!("Tenant schema dropped: {name}");
        Ok(())
    }

    async fn exists(&self, schema: &ValueObject<SchemaName>) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                 SELECT 1 FROM information_schema.schemata WHERE schema_name = $1
             )",
        )
        .bind(schema.extract().get_value())
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}
