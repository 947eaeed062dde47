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
use crate::common::types::value_object::ValueObjectable;
use regex::Regex;
use std::fmt::Display;

/// A Telegram bot API token in the `<numeric id>:<secret>` shape.
///
/// The token is the credential the tenant container runs with, so a
/// malformed value must be rejected before it reaches the registry or a
/// container spec.
#[derive(Debug, PartialEq, Clone)]
pub struct BotToken(pub String);

impl ValueObjectable for BotToken {
    type DataType = String;

    fn validate(&self) -> Result<(), String> {
        match Regex::new(r"^[0-9]{1,12}:[A-Za-z0-9_-]{30,64}$") {
            Ok(re) => match re.is_match(&self.0) {
                true => Ok(()),
                false => Err("Érvénytelen bot token!".to_string()),
            },
            Err(_) => Err("Érvénytelen bot token!".to_string()),
        }
    }

    fn get_value(&self) -> &Self::DataType {
        &self.0
    }
}

impl Display for BotToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
