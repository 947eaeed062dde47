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
use crate::deploy::dto::{DeployResultRecord, DeployTask};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

const QUEUE_SUFFIX: &str = "deploy_queue";
const RESULTS_SUFFIX: &str = "deploy_results";
/// Result records survive for a day so a front-end can poll at leisure.
const RESULT_TTL_SECS: u64 = 86_400;

/// The distributed deploy queue plus its durable result store.
///
/// Delivery is at-least-once: a pop removes the message, so the consumer
/// persists a `running` result record before acting and a crash between
/// pop and completion is detectable as a `running` record that never
/// completes.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DeployQueue: Send + Sync {
    /// Appends the task to the head of the FIFO.
    async fn enqueue(&self, task: &DeployTask) -> Result<(), CacheError>;

    /// Pops from the tail, waiting at most `timeout_secs`. A message that
    /// fails to parse is dropped with an error log rather than poisoning
    /// the queue.
    async fn pop(&self, timeout_secs: u64) -> Result<Option<DeployTask>, CacheError>;

    /// Returns a popped but unprocessed task so the next pop sees it
    /// first (shutdown between pop and execution).
    async fn push_back(&self, task: &DeployTask) -> Result<(), CacheError>;

    async fn save_result(&self, record: &DeployResultRecord) -> Result<(), CacheError>;

    async fn get_result(&self, job_id: Uuid) -> Result<Option<DeployResultRecord>, CacheError>;

    async fn queue_len(&self) -> Result<i64, CacheError>;
}

pub struct RedisDeployQueue {
    cache: Arc<RedisManager>,
}

impl RedisDeployQueue {
    pub fn new(cache: Arc<RedisManager>) -> Self {
        Self { cache }
    }

    fn queue_key(&self) -> String {
        self.cache.prefixed(QUEUE_SUFFIX)
    }

    fn result_key(&self, job_id: Uuid) -> String {
        self.cache.prefixed(&format!("{RESULTS_SUFFIX}:{job_id}"))
    }
}

#[async_trait]
impl DeployQueue for RedisDeployQueue {
    async fn enqueue(&self, task: &DeployTask) -> Result<(), CacheError> {
        let payload = serde_json::to_string(task)?;
        self.cache.lpush(&self.queue_key(), &payload).await?;
        info!("Deploy task queued: {}", task.job_id);
        Ok(())
    }

    async fn pop(&self, timeout_secs: u64) -> Result<Option<DeployTask>, CacheError> {
        let Some(payload) = self.cache.brpop(&self.queue_key(), timeout_secs).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<DeployTask>(&payload) {
            Ok(task) => Ok(Some(task)),
            Err(e) => {
                error!("Discarding malformed deploy task: {e}");
                Ok(None)
            }
        }
    }

    async fn push_back(&self, task: &DeployTask) -> Result<(), CacheError> {
        let payload = serde_json::to_string(task)?;
        self.cache.rpush(&self.queue_key(), &payload).await?;
        Ok(())
    }

    async fn save_result(&self, record: &DeployResultRecord) -> Result<(), CacheError> {
        let payload = serde_json::to_string(record)?;
        self.cache
            .set_string_ex(&self.result_key(record.job_id), &payload, RESULT_TTL_SECS)
            .await?;
        Ok(())
    }

    async fn get_result(&self, job_id: Uuid) -> Result<Option<DeployResultRecord>, CacheError> {
        let Some(payload) = self.cache.get_string(&self.result_key(job_id)).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&payload)?))
    }

    async fn queue_len(&self) -> Result<i64, CacheError> {
        self.cache.llen(&self.queue_key()).await
    }
}
