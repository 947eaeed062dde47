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
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Advisory billing plan; the control plane enforces only the expiry
/// timestamp derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionPlan {
    Monthly,
    Quarterly,
    Yearly,
}

impl SubscriptionPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionPlan::Monthly => "monthly",
            SubscriptionPlan::Quarterly => "quarterly",
            SubscriptionPlan::Yearly => "yearly",
        }
    }

    pub fn duration_days(&self) -> i64 {
        match self {
            SubscriptionPlan::Monthly => 30,
            SubscriptionPlan::Quarterly => 90,
            SubscriptionPlan::Yearly => 365,
        }
    }
}

impl FromStr for SubscriptionPlan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(SubscriptionPlan::Monthly),
            "quarterly" => Ok(SubscriptionPlan::Quarterly),
            "yearly" => Ok(SubscriptionPlan::Yearly),
            other => Err(format!("Ismeretlen előfizetési csomag: {other}")),
        }
    }
}

impl Display for SubscriptionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_durations() {
        assert_eq!(SubscriptionPlan::Monthly.duration_days(), 30);
        assert_eq!(SubscriptionPlan::Quarterly.duration_days(), 90);
        assert_eq!(SubscriptionPlan::Yearly.duration_days(), 365);
    }

    #[test]
    fn test_round_trip_from_str() {
        for plan in [
            SubscriptionPlan::Monthly,
            SubscriptionPlan::Quarterly,
            SubscriptionPlan::Yearly,
        ] {
            assert_eq!(plan.as_str().parse::<SubscriptionPlan>(), Ok(plan));
        }
        assert!("weekly".parse::<SubscriptionPlan>().is_err());
    }
}
