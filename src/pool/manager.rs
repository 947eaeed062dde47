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
use crate::app::cache::{CacheError, RedisManager};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

const STATUS_KEY_PREFIX: &str = "bot_status:";
const CONFIG_KEY_PREFIX: &str = "bot_config:";
const POOL_SIZE_SUFFIX: &str = "bot_pool_size";

pub const STATUS_WAITING: &str = "waiting";
pub const STATUS_CLAIMED: &str = "claimed";
pub const STATUS_ACTIVE: &str = "active";

/// Slot entry as written by the bot process (or by the claim CAS).
///
/// Freshly started pool bots write the bare string `waiting`; after
/// binding they write a JSON object. Both forms must parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotSlotState {
    pub status: String,
    #[serde(default)]
    pub client_id: Option<Uuid>,
    #[serde(default)]
    pub activated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub claimed_at: Option<DateTime<Utc>>,
}

pub(crate) fn parse_slot_state(raw: &str) -> BotSlotState {
    serde_json::from_str::<BotSlotState>(raw).unwrap_or_else(|_| BotSlotState {
        status: raw.trim().to_string(),
        client_id: None,
        activated_at: None,
        claimed_at: None,
    })
}

/// The short-lived record by which the control plane hands a bot token
/// and identity to a waiting pool bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationRecord {
    pub bot_token: String,
    pub admin_telegram_id: i64,
    pub client_id: Uuid,
    pub company_name: String,
    pub pg_schema: String,
    pub cache_partition: i32,
    pub redis_key_prefix: Option<String>,
    pub activated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BotSlotInfo {
    pub pool_id: u32,
    pub container_name: String,
    pub status: String,
    pub client_id: Option<Uuid>,
    pub activated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolStatus {
    pub total: u32,
    pub waiting: u32,
    pub claimed: u32,
    pub active: u32,
    pub unknown: u32,
    pub bots: Vec<BotSlotInfo>,
}

/// Inventory of pre-started idle bot containers.
///
/// The manager owns only the `waiting ⇄ claimed` transitions; the bot
/// process itself writes `waiting` on startup and `active` after
/// consuming its activation record. All mutual exclusion is delegated to
/// atomic cache primitives, never to application locks.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WarmPool: Send + Sync {
    /// First slot whose status is `waiting`, if any. Contention between
    /// concurrent callers is resolved by [`WarmPool::claim`], not here.
    async fn find_free(&self) -> Result<Option<String>, CacheError>;

    /// `waiting → claimed` compare-and-swap; `false` means someone else
    /// won the slot.
    async fn claim(&self, container_name: &str) -> Result<bool, CacheError>;

    /// `claimed → waiting`, reverting a claim whose activation never
    /// completed.
    async fn release(&self, container_name: &str) -> Result<(), CacheError>;

    /// Writes the activation record with a TTL; `false` means another
    /// activation is already in flight for the slot.
    async fn activate(
        &self,
        container_name: &str,
        record: &ActivationRecord,
        ttl_secs: u64,
    ) -> Result<bool, CacheError>;

    async fn clear_activation(&self, container_name: &str) -> Result<(), CacheError>;

    async fn slot_state(&self, container_name: &str) -> Result<Option<BotSlotState>, CacheError>;

    async fn status(&self) -> Result<PoolStatus, CacheError>;

    /// Initializes a freshly launched pool container's slot entry as
    /// `waiting`.
    async fn init_slot(&self, container_name: &str) -> Result<(), CacheError>;

    async fn registered_slots(&self) -> Result<u32, CacheError>;

    /// Grows the registered slot count and returns the new total.
    async fn register_slots(&self, count: u32) -> Result<u32, CacheError>;

    /// Drops all cache entries of a slot whose container is gone.
    async fn forget(&self, container_name: &str) -> Result<(), CacheError>;
}

pub struct BotPoolManager {
    cache: Arc<RedisManager>,
    container_prefix: String,
}

impl BotPoolManager {
    pub fn new(cache: Arc<RedisManager>, container_prefix: String) -> Self {
        Self {
            cache,
            container_prefix,
        }
    }

    pub fn container_name(&self, pool_id: u32) -> String {
        format!("{}{}", self.container_prefix, pool_id)
    }

    fn status_key(container_name: &str) -> String {
        format!("{STATUS_KEY_PREFIX}{container_name}")
    }

    fn config_key(container_name: &str) -> String {
        format!("{CONFIG_KEY_PREFIX}{container_name}")
    }
}

#[async_trait]
impl WarmPool for BotPoolManager {
    async fn find_free(&self) -> Result<Option<String>, CacheError> {
        let total = self.registered_slots().await?;
        for pool_id in 1..=total {
            let container_name = self.container_name(pool_id);
            if let Some(state) = self.slot_state(&container_name).await?
                && state.status == STATUS_WAITING
            {
                info!("Found free pool bot: {container_name}");
                return Ok(Some(container_name));
            }
        }
        warn!("No free pool bot available");
        Ok(None)
    }

    async fn claim(&self, container_name: &str) -> Result<bool, CacheError> {
        let replacement = json!({
            "status": STATUS_CLAIMED,
            "claimed_at": Utc::now(),
        })
        .to_string();
        self.cache
            .compare_and_swap_status(
                &Self::status_key(container_name),
                STATUS_WAITING,
                &replacement,
            )
            .await
    }

    async fn release(&self, container_name: &str) -> Result<(), CacheError> {
        let swapped = self
            .cache
            .compare_and_swap_status(
                &Self::status_key(container_name),
                STATUS_CLAIMED,
                STATUS_WAITING,
            )
            .await?;
        if !swapped {
            warn!("Could not revert claim on {container_name}; slot moved on");
        }
        Ok(())
    }

    async fn activate(
        &self,
        container_name: &str,
        record: &ActivationRecord,
        ttl_secs: u64,
    ) -> Result<bool, CacheError> {
        let payload = serde_json::to_string(record)?;
        let stored = self
            .cache
            .set_nx_ex(&Self::config_key(container_name), &payload, ttl_secs)
            .await?;
        if stored {
            info!("Activation record written for {container_name}");
        } else {
            warn!("Activation already in flight for {container_name}");
        }
        Ok(stored)
    }

    async fn clear_activation(&self, container_name: &str) -> Result<(), CacheError> {
        self.cache.delete(&Self::config_key(container_name)).await
    }

    async fn slot_state(&self, container_name: &str) -> Result<Option<BotSlotState>, CacheError> {
        let raw = self
            .cache
            .get_string(&Self::status_key(container_name))
            .await?;
        Ok(raw.map(|value| parse_slot_state(&value)))
    }

    async fn status(&self) -> Result<PoolStatus, CacheError> {
        let total = self.registered_slots().await?;
        let mut status = PoolStatus {
            total,
            waiting: 0,
            claimed: 0,
            active: 0,
            unknown: 0,
            bots: Vec::with_capacity(total as usize),
        };
        for pool_id in 1..=total {
            let container_name = self.container_name(pool_id);
            let state = self.slot_state(&container_name).await?;
            let (label, client_id, activated_at) = match &state {
                Some(s) => (s.status.clone(), s.client_id, s.activated_at),
                None => ("unknown".to_string(), None, None),
            };
            match label.as_str() {
                STATUS_WAITING => status.waiting += 1,
                STATUS_CLAIMED => status.claimed += 1,
                STATUS_ACTIVE => status.active += 1,
                _ => status.unknown += 1,
            }
            status.bots.push(BotSlotInfo {
                pool_id,
                container_name,
                status: label,
                client_id,
                activated_at,
            });
        }
        Ok(status)
    }

    async fn init_slot(&self, container_name: &str) -> Result<(), CacheError> {
        self.cache
            .set_string(&Self::status_key(container_name), STATUS_WAITING)
            .await
    }

    async fn registered_slots(&self) -> Result<u32, CacheError> {
        let raw = self
            .cache
            .get_string(&self.cache.prefixed(POOL_SIZE_SUFFIX))
            .await?;
        Ok(raw.and_then(|v| v.parse().ok()).unwrap_or(0))
    }

    async fn register_slots(&self, count: u32) -> Result<u32, CacheError> {
        let total = self
            .cache
            .incr_by(&self.cache.prefixed(POOL_SIZE_SUFFIX), count as i64)
            .await?;
        Ok(total as u32)
    }

    async fn forget(&self, container_name: &str) -> Result<(), CacheError> {
        self.cache.delete(&Self::status_key(container_name)).await?;
        self.cache.delete(&Self::config_key(container_name)).await
    }
}
