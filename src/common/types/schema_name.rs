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

/// Per-tenant PostgreSQL schema identifier.
///
/// Schema DDL cannot use bound parameters, so every identifier that is
/// interpolated into a `CREATE SCHEMA` / `DROP SCHEMA` statement must pass
/// through this type first.
///
/// # Security
///
/// Always wrap schema identifiers in this type before building DDL to
/// prevent SQL injection!
#[derive(Debug, PartialEq, Clone)]
pub struct SchemaName(pub String);

impl ValueObjectable for SchemaName {
    type DataType = String;

    /// A valid schema identifier starts with a lowercase letter and
    /// continues with at least six more characters of `[a-z0-9_]`, up to
    /// the PostgreSQL identifier limit.
    fn validate(&self) -> Result<(), String> {
        match Regex::new(r"^[a-z][a-z0-9_]{6,62}$") {
            Ok(re) => match re.is_match(&self.0) {
                true => Ok(()),
                false => Err("Hibás séma azonosító!".to_string()),
            },
            Err(_) => Err("Hibás séma azonosító!".to_string()),
        }
    }

    fn get_value(&self) -> &Self::DataType {
        &self.0
    }
}

impl Display for SchemaName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::value_object::ValueObject;

    #[test]
    fn test_valid_schema_name() {
        assert!(ValueObject::new(SchemaName("client_a1b2c3d4".to_string())).is_ok());
    }

    #[test]
    fn test_rejects_quotes_and_spaces() {
        assert!(ValueObject::new(SchemaName("client_a; DROP".to_string())).is_err());
        assert!(ValueObject::new(SchemaName("client\"x".to_string())).is_err());
    }

    #[test]
    fn test_rejects_leading_digit_and_uppercase() {
        assert!(ValueObject::new(SchemaName("1client_abc".to_string())).is_err());
        assert!(ValueObject::new(SchemaName("Client_abc".to_string())).is_err());
    }

    #[test]
    fn test_rejects_too_short() {
        assert!(ValueObject::new(SchemaName("client".to_string())).is_err());
    }
}
