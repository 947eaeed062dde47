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
use serde::{Serialize, Serializer};
use std::fmt::Display;

/// A trait representing a container for validated value object data.
///
/// Implementors carry a single piece of raw data (`DataType`) together with
/// the validation rule that decides whether the raw data is acceptable for
/// the domain. Construction of a [`ValueObject`] always runs `validate`.
pub trait ValueObjectable: Display {
    type DataType;

    /// Validates the contained data.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: If the validation is successful.
    /// - `Err(String)`: If the validation fails, containing an error message.
    fn validate(&self) -> Result<(), String>;

    /// Retrieves a reference to the data associated with the current instance.
    fn get_value(&self) -> &Self::DataType;
}

/// A generic wrapper that can only be constructed from data that passed its
/// own validation rule.
///
/// It is used to enforce type safety for domain concepts where primitive
/// types alone would not provide adequate constraint (bot tokens, schema
/// identifiers and similar values that end up in SQL or container specs).
#[derive(Debug, Clone, PartialEq)]
pub struct ValueObject<DataType>(DataType);

impl<DataType> ValueObject<DataType>
where
    DataType: ValueObjectable,
{
    /// Creates a new `ValueObject` instance from the provided `data`.
    ///
    /// # Returns
    /// - `Ok(ValueObject<DataType>)` - If the provided `data` successfully passes validation.
    /// - `Err(String)` - If the `data` validation fails.
    pub fn new(data: DataType) -> Result<ValueObject<DataType>, String> {
        data.validate()?;
        Ok(ValueObject(data))
    }
}

impl<DataType> ValueObject<DataType> {
    /// Retrieves a reference to the inner data stored within the wrapper.
    pub fn extract(&self) -> &DataType {
        &self.0
    }
}

impl<DataType> Display for ValueObject<DataType>
where
    DataType: Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<DataType> Serialize for ValueObject<DataType>
where
    DataType: Display,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&self.0)
    }
}
