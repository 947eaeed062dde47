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
use crate::tenants::model::Tenant;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Filters accepted by `GET /api/tenants`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TenantFilter {
    pub status: Option<String>,
    pub owner: Option<i64>,
    pub expiring_within_days: Option<i64>,
}

/// Tenant representation returned by the admin API. The bot token is a
/// credential and never leaves the control plane.
#[derive(Debug, Clone, Serialize)]
pub struct PublicTenant {
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
}

impl From<Tenant> for PublicTenant {
    fn from(value: Tenant) -> Self {
        Self {
            id: value.id,
            bot_token: "[REDACTED]".to_string(),
            bot_username: value.bot_username,
            owner_contact_id: value.owner_contact_id,
            display_name: value.display_name,
            cache_partition: value.cache_partition,
            container_name: value.container_name,
            schema_name: value.schema_name,
            subscription_status: value.subscription_status,
            subscription_plan: value.subscription_plan,
            started_at: value.started_at,
            expires_at: value.expires_at,
            container_running: value.container_running,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuspendRequest {
    pub reason: Option<String>,
}

/// Ledger entry attached to an extension; only the expiry extension is
/// authoritative, the payment row is bookkeeping.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentInput {
    pub amount: BigDecimal,
    pub currency: Option<String>,
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtendRequest {
    pub days: i64,
    pub payment: Option<PaymentInput>,
}

/// Aggregated registry statistics for the admin dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct RegistryStats {
    pub total_tenants: i64,
    pub trial_tenants: i64,
    pub active_tenants: i64,
    pub suspended_tenants: i64,
    pub cancelled_tenants: i64,
    pub free_cache_partitions: Option<i64>,
    pub monthly_revenue: BigDecimal,
}
