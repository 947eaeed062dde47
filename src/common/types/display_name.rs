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
use std::fmt::Display;

/// Human readable tenant name, at most 200 characters of arbitrary UTF-8.
#[derive(Debug, PartialEq, Clone)]
pub struct DisplayName(pub String);

impl ValueObjectable for DisplayName {
    type DataType = String;

    fn validate(&self) -> Result<(), String> {
        let trimmed = self.0.trim();
        if trimmed.is_empty() || self.0.chars().count() > 200 {
            Err("Érvénytelen megjelenítendő név!".to_string())
        } else {
            Ok(())
        }
    }

    fn get_value(&self) -> &Self::DataType {
        &self.0
    }
}

impl Display for DisplayName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::value_object::ValueObject;

    #[test]
    fn test_valid_name() {
        assert!(ValueObject::new(DisplayName("Fodrászat Buda".to_string())).is_ok());
    }

    #[test]
    fn test_empty_name() {
        assert!(ValueObject::new(DisplayName("   ".to_string())).is_err());
    }

    #[test]
    fn test_too_long_name() {
        assert!(ValueObject::new(DisplayName("x".repeat(201))).is_err());
        assert!(ValueObject::new(DisplayName("x".repeat(200))).is_ok());
    }
}
