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
use crate::app::config::NotifierConfig;
use crate::common::Notifier;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Telegram API error: {0}")]
    Api(String),
}

#[derive(Debug, Deserialize)]
struct TelegramApiResponse {
    ok: bool,
    description: Option<String>,
}

/// Outbound notification channel over the Telegram Bot API.
///
/// Both tenant owner notifications (deploy results, expiry warnings) and
/// internal admin alerts go through this transport. Sending is always
/// best-effort from the caller's perspective: a failed notification is
/// surfaced as an error but must never roll back the operation that
/// produced it.
pub struct TelegramNotifier {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
    admin_chat_id: i64,
}

impl TelegramNotifier {
    pub fn new(config: &NotifierConfig) -> Result<TelegramNotifier, NotifyError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            api_base: config.api_base().to_string(),
            bot_token: config.bot_token().to_string(),
            admin_chat_id: config.admin_chat_id(),
        })
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), NotifyError> {
        let response = self
            .http
            .post(self.send_message_url())
            .json(&json!({
                "chat_id": chat_id,
                "text": text,
                "parse_mode": "Markdown",
            }))
            .send()
            .await?;

        let body: TelegramApiResponse = response.json().await?;
        if body.ok {
            Ok(())
        } else {
            Err(NotifyError::Api(
                body.description
                    .unwrap_or_else(|| "unknown Telegram API failure".to_string()),
            ))
        }
    }

    async fn send_admin(&self, text: &str) -> Result<(), NotifyError> {
        self.send_message(self.admin_chat_id, text).await
    }
}
