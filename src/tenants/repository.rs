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
use crate::app::database::{PgPoolManager, PoolProvider};
use crate::common::error::RepositoryError;
use crate::tenants::dto::{PaymentInput, RegistryStats, TenantFilter};
use crate::tenants::model::{AuditEvent, Payment, Tenant};
use crate::tenants::types::{SubscriptionPlan, SubscriptionStatus};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
#[cfg(test)]
use mockall::automock;
use serde_json::json;
use sqlx::PgConnection;
use uuid::Uuid;

/// Parameters of an atomic tenant registration.
///
/// The cache partition is not part of the input: the registration
/// statement itself computes the smallest free ordinal and reserves it in
/// the same `INSERT`, so two concurrent registrations can never observe
/// the same free slot. `partition_limit` caps the ordinal space
/// (ordinal mode); `None` bounds the search by `count(*) + 1`, which
/// always contains a free ordinal (key-prefix mode, no ceiling).
#[derive(Debug, Clone)]
pub struct RegisterTenant {
    pub id: Uuid,
    pub bot_token: String,
    pub bot_username: Option<String>,
    pub owner_contact_id: i64,
    pub display_name: String,
    pub container_name: String,
    pub schema_name: String,
    pub status: SubscriptionStatus,
    pub plan: SubscriptionPlan,
    pub partition_limit: Option<i32>,
}

/// The authoritative persistent store of tenants.
///
/// Every method runs as a single transaction, and each lifecycle audit
/// event is written in the same transaction as the state change that
/// produced it. State transitions are validated against the subscription
/// state machine before the row is touched.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TenantsRepository: Send + Sync + 'static {
    /// Registers a tenant and reserves its cache partition atomically.
    ///
    /// # Errors
    /// - `RepositoryError::OutOfCapacity` when no ordinal in the
    ///   configured range is free.
    /// - A unique violation on `bot_token` or, under a rare race, on
    ///   `cache_partition`; callers distinguish the two by constraint
    ///   name and retry the latter.
    async fn register(&self, params: &RegisterTenant) -> Result<Tenant, RepositoryError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Tenant, RepositoryError>;

    async fn list(&self, filter: &TenantFilter) -> Result<Vec<Tenant>, RepositoryError>;

    /// Updates the control plane's view of the container state and writes
    /// the matching `container_started` / `container_stopped` audit event.
    async fn mark_container(&self, id: Uuid, running: bool) -> Result<(), RepositoryError>;

    /// Rebinds the tenant to another container (warm pool claim) and
    /// marks it running.
    async fn bind_container(
        &self,
        id: Uuid,
        container_name: &str,
    ) -> Result<Tenant, RepositoryError>;

    /// `{trial, active} → suspended`; clears `container_running`. The
    /// caller is responsible for the actual container stop.
    async fn suspend(&self, id: Uuid, reason: &str) -> Result<Tenant, RepositoryError>;

    /// `suspended → active`; extends the expiry from
    /// `max(now, expires_at)` by the given number of days.
    async fn reactivate(&self, id: Uuid, extend_by_days: i64) -> Result<Tenant, RepositoryError>;

    /// Extends the expiry without a state change, by the same rule as
    /// `reactivate`.
    async fn extend(&self, id: Uuid, extend_by_days: i64) -> Result<Tenant, RepositoryError>;

    /// Soft deletes the tenant after recording the `deleted` audit event.
    /// The token binding and the cache partition are released
    /// immediately; the row itself survives until `purge_deleted`.
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;

    /// Active tenants whose `expires_at` is within `within_secs` from
    /// now (zero means already expired).
    async fn expiring(&self, within_secs: i64) -> Result<Vec<Tenant>, RepositoryError>;

    async fn record_payment(
        &self,
        id: Uuid,
        payment: &PaymentInput,
    ) -> Result<(), RepositoryError>;

    async fn payments(&self, id: Uuid) -> Result<Vec<Payment>, RepositoryError>;

    /// Appends a non-transitional audit event (e.g. `expired`).
    async fn record_event(
        &self,
        tenant_id: Uuid,
        kind: &str,
        details: serde_json::Value,
    ) -> Result<(), RepositoryError>;

    async fn audit_events(&self, tenant_id: Uuid) -> Result<Vec<AuditEvent>, RepositoryError>;

    async fn stats(&self, partition_limit: Option<i32>) -> Result<RegistryStats, RepositoryError>;

    /// Hard deletes soft deleted rows older than the retention window and
    /// returns how many were purged. Their audit rows survive with a
    /// NULL tenant reference.
    async fn purge_deleted(&self, older_than_days: i64) -> Result<u64, RepositoryError>;
}

async fn insert_audit(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    kind: &str,
    details: serde_json::Value,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO master_bot.audit_log (tenant_id, event_kind, details, actor)
             VALUES ($1, $2, $3, $4)",
    )
    .bind(tenant_id)
    .bind(kind)
    .bind(details)
    .bind("control_plane")
    .execute(conn)
    .await?;
    Ok(())
}

async fn fetch_live_for_update(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Tenant, RepositoryError> {
    sqlx::query_as::<_, Tenant>(
        "SELECT * FROM master_bot.tenants WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or(RepositoryError::TenantNotFound)
}

fn parse_status(tenant: &Tenant) -> Result<SubscriptionStatus, RepositoryError> {
    tenant.status().map_err(RepositoryError::Custom)
}

fn check_transition(
    from: SubscriptionStatus,
    to: SubscriptionStatus,
) -> Result<(), RepositoryError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(RepositoryError::InvalidTransition {
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
        })
    }
}

#[async_trait]
impl TenantsRepository for PgPoolManager {
    async fn register(&self, params: &RegisterTenant) -> Result<Tenant, RepositoryError> {
        let mut tx = self.pool().begin().await?;

        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            WITH bound AS (
                SELECT COALESCE(
                    $10::INT,
                    (SELECT COUNT(*)::INT + 1 FROM master_bot.tenants)
                ) AS n
            ),
            free AS (
                SELECT s.ordinal
                FROM bound, generate_series(0, bound.n - 1) AS s(ordinal)
                WHERE s.ordinal NOT IN (
                    SELECT cache_partition FROM master_bot.tenants
                    WHERE cache_partition IS NOT NULL
                )
                ORDER BY s.ordinal
                LIMIT 1
            )
            INSERT INTO master_bot.tenants (
                id, bot_token, bot_username, owner_contact_id, display_name,
                cache_partition, container_name, schema_name,
                subscription_status, subscription_plan, started_at, expires_at
            )
            SELECT $1, $2, $3, $4, $5, free.ordinal, $6, $7, $8, $9,
                   NOW(), NOW() + make_interval(days => $11::INT)
            FROM free
            RETURNING *
            "#,
        )
        .bind(params.id)
        .bind(&params.bot_token)
        .bind(&params.bot_username)
        .bind(params.owner_contact_id)
        .bind(&params.display_name)
        .bind(&params.container_name)
        .bind(&params.schema_name)
        .bind(params.status.as_str())
        .bind(params.plan.as_str())
        .bind(params.partition_limit)
        .bind(params.plan.duration_days() as i32)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::OutOfCapacity)?;

        insert_audit(
            &mut tx,
            tenant.id,
            "created",
            json!({
                "display_name": tenant.display_name,
                "cache_partition": tenant.cache_partition,
                "container_name": tenant.container_name,
                "schema_name": tenant.schema_name,
                "plan": tenant.subscription_plan,
            }),
        )
        .await?;

        tx.commit().await?;
        Ok(tenant)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Tenant, RepositoryError> {
        sqlx::query_as::<_, Tenant>(
            "SELECT * FROM master_bot.tenants WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool())
        .await?
        .ok_or(RepositoryError::TenantNotFound)
    }

    async fn list(&self, filter: &TenantFilter) -> Result<Vec<Tenant>, RepositoryError> {
        Ok(sqlx::query_as::<_, Tenant>(
            r#"
            SELECT * FROM master_bot.tenants
            WHERE deleted_at IS NULL
              AND ($1::TEXT IS NULL OR subscription_status = $1)
              AND ($2::BIGINT IS NULL OR owner_contact_id = $2)
              AND ($3::BIGINT IS NULL
                   OR expires_at < NOW() + make_interval(days => CAST($3 AS INT)))
            ORDER BY created_at DESC
            "#,
        )
        .bind(&filter.status)
        .bind(filter.owner)
        .bind(filter.expiring_within_days)
        .fetch_all(&self.pool())
        .await?)
    }

    async fn mark_container(&self, id: Uuid, running: bool) -> Result<(), RepositoryError> {
        let mut tx = self.pool().begin().await?;
        let tenant = fetch_live_for_update(&mut tx, id).await?;

        sqlx::query(
            "UPDATE master_bot.tenants
                 SET container_running = $2, updated_at = NOW()
                 WHERE id = $1",
        )
        .bind(id)
        .bind(running)
        .execute(&mut *tx)
        .await?;

        let kind = if running {
            "container_started"
        } else {
            "container_stopped"
        };
        insert_audit(
            &mut tx,
            id,
            kind,
            json!({ "container_name": tenant.container_name }),
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn bind_container(
        &self,
        id: Uuid,
        container_name: &str,
    ) -> Result<Tenant, RepositoryError> {
        let mut tx = self.pool().begin().await?;
        fetch_live_for_update(&mut tx, id).await?;

        let tenant = sqlx::query_as::<_, Tenant>(
            "UPDATE master_bot.tenants
                 SET container_name = $2, container_running = TRUE, updated_at = NOW()
                 WHERE id = $1
                 RETURNING *",
        )
        .bind(id)
        .bind(container_name)
        .fetch_one(&mut *tx)
        .await?;

        insert_audit(
            &mut tx,
            id,
            "container_started",
            json!({ "container_name": container_name, "warm_claim": true }),
        )
        .await?;

        tx.commit().await?;
        Ok(tenant)
    }

    async fn suspend(&self, id: Uuid, reason: &str) -> Result<Tenant, RepositoryError> {
        let mut tx = self.pool().begin().await?;
        let current = fetch_live_for_update(&mut tx, id).await?;
        check_transition(parse_status(&current)?, SubscriptionStatus::Suspended)?;

        let tenant = sqlx::query_as::<_, Tenant>(
            "UPDATE master_bot.tenants
                 SET subscription_status = 'suspended',
                     container_running = FALSE,
                     updated_at = NOW()
                 WHERE id = $1
                 RETURNING *",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        insert_audit(&mut tx, id, "suspended", json!({ "reason": reason })).await?;

        tx.commit().await?;
        Ok(tenant)
    }

    async fn reactivate(&self, id: Uuid, extend_by_days: i64) -> Result<Tenant, RepositoryError> {
        let mut tx = self.pool().begin().await?;
        let current = fetch_live_for_update(&mut tx, id).await?;
        check_transition(parse_status(&current)?, SubscriptionStatus::Active)?;

        let tenant = sqlx::query_as::<_, Tenant>(
            "UPDATE master_bot.tenants
                 SET subscription_status = 'active',
                     expires_at = GREATEST(expires_at, NOW())
                         + make_interval(days => CAST($2 AS INT)),
                     updated_at = NOW()
                 WHERE id = $1
                 RETURNING *",
        )
        .bind(id)
        .bind(extend_by_days)
        .fetch_one(&mut *tx)
        .await?;

        insert_audit(
            &mut tx,
            id,
            "reactivated",
            json!({ "extended_by_days": extend_by_days }),
        )
        .await?;

        tx.commit().await?;
        Ok(tenant)
    }

    async fn extend(&self, id: Uuid, extend_by_days: i64) -> Result<Tenant, RepositoryError> {
        let mut tx = self.pool().begin().await?;
        fetch_live_for_update(&mut tx, id).await?;

        let tenant = sqlx::query_as::<_, Tenant>(
            "UPDATE master_bot.tenants
                 SET expires_at = GREATEST(expires_at, NOW())
                         + make_interval(days => CAST($2 AS INT)),
                     updated_at = NOW()
                 WHERE id = $1
                 RETURNING *",
        )
        .bind(id)
        .bind(extend_by_days)
        .fetch_one(&mut *tx)
        .await?;

        insert_audit(
            &mut tx,
            id,
            "extended",
            json!({ "extended_by_days": extend_by_days }),
        )
        .await?;

        tx.commit().await?;
        Ok(tenant)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let mut tx = self.pool().begin().await?;
        let tenant = fetch_live_for_update(&mut tx, id).await?;

        insert_audit(
            &mut tx,
            id,
            "deleted",
            json!({
                "container_name": tenant.container_name,
                "cache_partition": tenant.cache_partition,
                "schema_name": tenant.schema_name,
            }),
        )
        .await?;

        // Releasing the unique columns frees both slots immediately while
        // the row itself stays for the audit retention window.
        sqlx::query(
            "UPDATE master_bot.tenants
                 SET deleted_at = NOW(),
                     bot_token = NULL,
                     cache_partition = NULL,
                     container_running = FALSE,
                     updated_at = NOW()
                 WHERE id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn expiring(&self, within_secs: i64) -> Result<Vec<Tenant>, RepositoryError> {
        Ok(sqlx::query_as::<_, Tenant>(
            "SELECT * FROM master_bot.tenants
                 WHERE deleted_at IS NULL
                   AND subscription_status = 'active'
                   AND expires_at < NOW()
                       + make_interval(secs => CAST($1 AS DOUBLE PRECISION))
                 ORDER BY expires_at",
        )
        .bind(within_secs)
        .fetch_all(&self.pool())
        .await?)
    }

    async fn record_payment(
        &self,
        id: Uuid,
        payment: &PaymentInput,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO master_bot.payments (
                     tenant_id, amount, currency, payment_method, transaction_id, notes
                 ) VALUES ($1, $2, COALESCE($3, 'HUF'), COALESCE($4, 'manual'), $5, $6)",
        )
        .bind(id)
        .bind(&payment.amount)
        .bind(&payment.currency)
        .bind(&payment.payment_method)
        .bind(&payment.transaction_id)
        .bind(&payment.notes)
        .execute(&self.pool())
        .await?;
        Ok(())
    }

    async fn payments(&self, id: Uuid) -> Result<Vec<Payment>, RepositoryError> {
        Ok(sqlx::query_as::<_, Payment>(
            "SELECT * FROM master_bot.payments WHERE tenant_id = $1 ORDER BY paid_at DESC",
        )
        .bind(id)
        .fetch_all(&self.pool())
        .await?)
    }

    async fn record_event(
        &self,
        tenant_id: Uuid,
        kind: &str,
        details: serde_json::Value,
    ) -> Result<(), RepositoryError> {
        let mut conn = self.pool().acquire().await?;
        insert_audit(&mut conn, tenant_id, kind, details).await?;
        Ok(())
    }

    async fn audit_events(&self, tenant_id: Uuid) -> Result<Vec<AuditEvent>, RepositoryError> {
        Ok(sqlx::query_as::<_, AuditEvent>(
            "SELECT * FROM master_bot.audit_log
                 WHERE tenant_id = $1
                 ORDER BY created_at, id",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool())
        .await?)
    }

    async fn stats(&self, partition_limit: Option<i32>) -> Result<RegistryStats, RepositoryError> {
        let counts: Vec<(String, i64)> = sqlx::query_as(
            "SELECT subscription_status, COUNT(*)
                 FROM master_bot.tenants
                 WHERE deleted_at IS NULL
                 GROUP BY subscription_status",
        )
        .fetch_all(&self.pool())
        .await?;

        let used_partitions: i64 = sqlx::query_scalar(
            "SELECT COUNT(cache_partition) FROM master_bot.tenants
                 WHERE cache_partition IS NOT NULL",
        )
        .fetch_one(&self.pool())
        .await?;

        let monthly_revenue: Option<BigDecimal> = sqlx::query_scalar(
            "SELECT SUM(amount) FROM master_bot.payments
                 WHERE paid_at >= NOW() - INTERVAL '30 days'
                   AND payment_status = 'completed'",
        )
        .fetch_one(&self.pool())
        .await?;

        let count_for = |status: &str| {
            counts
                .iter()
                .find(|(s, _)| s == status)
                .map(|(_, c)| *c)
                .unwrap_or(0)
        };

        Ok(RegistryStats {
            total_tenants: counts.iter().map(|(_, c)| c).sum(),
            trial_tenants: count_for("trial"),
            active_tenants: count_for("active"),
            suspended_tenants: count_for("suspended"),
            cancelled_tenants: count_for("cancelled"),
            free_cache_partitions: partition_limit
                .map(|limit| (limit as i64 - used_partitions).max(0)),
            monthly_revenue: monthly_revenue.unwrap_or_else(|| BigDecimal::from(0)),
        })
    }

    async fn purge_deleted(&self, older_than_days: i64) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM master_bot.tenants
                 WHERE deleted_at IS NOT NULL
                   AND deleted_at < NOW() - make_interval(days => CAST($1 AS INT))",
        )
        .bind(older_than_days)
        .execute(&self.pool())
        .await?;
        Ok(result.rows_affected())
    }
}
