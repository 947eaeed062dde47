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
use crate::app::config::CacheConfig;
use redis::aio::ConnectionManager;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Transitions a slot entry from an expected status to a replacement
/// value in one atomic step. The entry may be either a bare status string
/// or a JSON object carrying a `status` field; both forms occur because
/// the bot image writes the bare form on first startup.
const CAS_STATUS_SCRIPT: &str = r#"
local cur = redis.call('GET', KEYS[1])
if not cur then return 0 end
local status = cur
local ok, decoded = pcall(cjson.decode, cur)
if ok and type(decoded) == 'table' and decoded['status'] then
    status = decoded['status']
end
if status == ARGV[1] then
    redis.call('SET', KEYS[1], ARGV[2])
    return 1
end
return 0
"#;

/// Thin wrapper around the shared Redis connection.
///
/// All control plane key spaces (deploy queue, deploy results, warm pool
/// state, expiry warning dedup) live behind this type; tenant key spaces
/// are never touched from here.
pub struct RedisManager {
    conn: ConnectionManager,
    key_prefix: String,
}

impl RedisManager {
    pub async fn new(config: &CacheConfig) -> CacheResult<RedisManager> {
        let client = redis::Client::open(config.url())?;
        let conn = ConnectionManager::new(client).await?;
        info!("Connected to Redis: {}:{}/{}", config.host, config.port, config.db);
        Ok(Self {
            conn,
            key_prefix: config.key_prefix.clone(),
        })
    }

    /// Applies the control plane key prefix (`master_bot:` by default).
    pub fn prefixed(&self, suffix: &str) -> String {
        format!("{}{}", self.key_prefix, suffix)
    }

    pub async fn get_string(&self, key: &str) -> CacheResult<Option<String>> {
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut self.conn.clone())
            .await?;
        Ok(value)
    }

    pub async fn set_string(&self, key: &str, value: &str) -> CacheResult<()> {
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .query_async::<_, ()>(&mut self.conn.clone())
            .await?;
        Ok(())
    }

    pub async fn set_string_ex(&self, key: &str, value: &str, ttl_secs: u64) -> CacheResult<()> {
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_secs)
            .query_async::<_, ()>(&mut self.conn.clone())
            .await?;
        Ok(())
    }

    /// `SET key value NX EX ttl`; returns whether the key was set.
    pub async fn set_nx_ex(&self, key: &str, value: &str, ttl_secs: u64) -> CacheResult<bool> {
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs)
            .query_async(&mut self.conn.clone())
            .await?;
        Ok(reply.is_some())
    }

    pub async fn delete(&self, key: &str) -> CacheResult<()> {
        redis::cmd("DEL")
            .arg(key)
            .query_async::<_, ()>(&mut self.conn.clone())
            .await?;
        Ok(())
    }

    pub async fn lpush(&self, key: &str, value: &str) -> CacheResult<()> {
        redis::cmd("LPUSH")
            .arg(key)
            .arg(value)
            .query_async::<_, ()>(&mut self.conn.clone())
            .await?;
        Ok(())
    }

    /// Tail insert; used to hand a popped message back so the next pop
    /// receives it first.
    pub async fn rpush(&self, key: &str, value: &str) -> CacheResult<()> {
        redis::cmd("RPUSH")
            .arg(key)
            .arg(value)
            .query_async::<_, ()>(&mut self.conn.clone())
            .await?;
        Ok(())
    }

    /// Blocking pop from the tail with a bounded wait so the caller stays
    /// responsive to shutdown.
    pub async fn brpop(&self, key: &str, timeout_secs: u64) -> CacheResult<Option<String>> {
        let reply: Option<(String, String)> = redis::cmd("BRPOP")
            .arg(key)
            .arg(timeout_secs)
            .query_async(&mut self.conn.clone())
            .await?;
        Ok(reply.map(|(_queue, value)| value))
    }

    pub async fn incr_by(&self, key: &str, amount: i64) -> CacheResult<i64> {
        let value: i64 = redis::cmd("INCRBY")
            .arg(key)
            .arg(amount)
            .query_async(&mut self.conn.clone())
            .await?;
        Ok(value)
    }

    pub async fn llen(&self, key: &str) -> CacheResult<i64> {
        let len: i64 = redis::cmd("LLEN")
            .arg(key)
            .query_async(&mut self.conn.clone())
            .await?;
        Ok(len)
    }

    /// Atomic status transition on a slot entry; returns `false` when the
    /// entry is missing or no longer carries the expected status.
    pub async fn compare_and_swap_status(
        &self,
        key: &str,
        expected_status: &str,
        replacement: &str,
    ) -> CacheResult<bool> {
        let swapped: i32 = redis::Script::new(CAS_STATUS_SCRIPT)
            .key(key)
            .arg(expected_status)
            .arg(replacement)
            .invoke_async(&mut self.conn.clone())
            .await?;
        Ok(swapped == 1)
    }
}
