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
use crate::tenants::types::{SubscriptionPlan, SubscriptionStatus};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// One paying customer's isolated bot instance and data, as recorded in
/// `master_bot.tenants`.
///
/// Every repository query returning this type filters
/// `deleted_at IS NULL`, so `bot_token` and `cache_partition` are always
/// populated here even though the columns are nullable for soft deleted
/// rows.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Tenant {
    pub id: Uuid,
    pub bot_token: String,
    pub bot_username: Option<String>,
    pub owner_contact_id: i64,
    pub display_name: String,
    pub cache_partition: i32,
    pub container_name: String,
    pub schema_name: String,
    pub subscription_status: String,
    pub subscription_plan: String,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub container_running: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Tenant {
    pub fn status(&self) -> Result<SubscriptionStatus, String> {
        self.subscription_status.parse()
    }

    #[allow(dead_code)]
    pub fn plan(&self) -> Result<SubscriptionPlan, String> {
        self.subscription_plan.parse()
    }
}

/// Append-only payment ledger entry in `master_bot.payments`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Payment {
    pub id: i64,
    pub tenant_id: Uuid,
    pub amount: BigDecimal,
    pub currency: String,
    pub payment_method: String,
    pub payment_status: String,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
    pub paid_at: DateTime<Utc>,
}

/// Append-only lifecycle event in `master_bot.audit_log`.
///
/// `tenant_id` is nullable because audit rows outlive a purged tenant;
/// ordering within a tenant is `(created_at, id)`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AuditEvent {
    pub id: i64,
    pub tenant_id: Option<Uuid>,
    pub event_kind: String,
    pub details: serde_json::Value,
    pub actor: Option<String>,
    pub created_at: DateTime<Utc>,
}
