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
use crate::common::types::{BotToken, DisplayName, ValueObject};
use crate::deploy::error::{DeployError, DeployFailure};
use crate::tenants::types::{SubscriptionPlan, SubscriptionStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wire format version of [`DeployTask`]; unknown fields and unknown
/// versions are rejected rather than guessed at.
pub const TASK_VERSION: u8 = 1;

/// Raw provisioning input as submitted by a front-end, either through the
/// admin API or wrapped in a queued [`DeployTask`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTenantRequest {
    pub bot_token: String,
    pub owner_contact_id: i64,
    pub display_name: Option<String>,
    pub plan: Option<String>,
    pub bot_username: Option<String>,
    pub submitted_by: Option<i64>,
}

/// One queued unit of provisioning work.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeployTask {
    pub version: u8,
    pub job_id: Uuid,
    pub bot_token: String,
    pub owner_contact_id: i64,
    pub display_name: Option<String>,
    pub plan: Option<String>,
    pub bot_username: Option<String>,
    pub submitted_by: Option<i64>,
    pub requested_at: DateTime<Utc>,
}

impl DeployTask {
    pub fn from_request(request: CreateTenantRequest) -> Self {
        Self {
            version: TASK_VERSION,
            job_id: Uuid::new_v4(),
            bot_token: request.bot_token,
            owner_contact_id: request.owner_contact_id,
            display_name: request.display_name,
            plan: request.plan,
            bot_username: request.bot_username,
            submitted_by: request.submitted_by,
            requested_at: Utc::now(),
        }
    }
}

/// Validated provisioning input. Construction is the only validation
/// point; everything downstream may trust these fields.
#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub bot_token: ValueObject<BotToken>,
    pub bot_username: Option<String>,
    pub owner_contact_id: i64,
    pub display_name: ValueObject<DisplayName>,
    pub plan: SubscriptionPlan,
    pub status: SubscriptionStatus,
}

fn validate_parts(
    bot_token: String,
    bot_username: Option<String>,
    owner_contact_id: i64,
    display_name: Option<String>,
    plan: Option<String>,
) -> Result<DeployRequest, String> {
    if owner_contact_id <= 0 {
        return Err("Érvénytelen tulajdonos azonosító!".to_string());
    }
    let plan = match plan {
        Some(raw) => raw.parse::<SubscriptionPlan>()?,
        None => SubscriptionPlan::Monthly,
    };
    let display_name = display_name.unwrap_or_else(|| "Új ügyfél".to_string());
    Ok(DeployRequest {
        bot_token: ValueObject::new(BotToken(bot_token))?,
        bot_username,
        owner_contact_id,
        display_name: ValueObject::new(DisplayName(display_name))?,
        plan,
        status: SubscriptionStatus::Active,
    })
}

impl TryFrom<CreateTenantRequest> for DeployRequest {
    type Error = String;

    fn try_from(value: CreateTenantRequest) -> Result<Self, Self::Error> {
        validate_parts(
            value.bot_token,
            value.bot_username,
            value.owner_contact_id,
            value.display_name,
            value.plan,
        )
    }
}

impl TryFrom<DeployTask> for DeployRequest {
    type Error = String;

    fn try_from(value: DeployTask) -> Result<Self, Self::Error> {
        if value.version != TASK_VERSION {
            return Err(format!("Nem támogatott feladat verzió: {}", value.version));
        }
        validate_parts(
            value.bot_token,
            value.bot_username,
            value.owner_contact_id,
            value.display_name,
            value.plan,
        )
    }
}

/// Everything a successful provisioning hands back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct DeployOutcome {
    pub tenant_id: Uuid,
    pub container_name: String,
    pub schema_name: String,
    pub cache_partition: i32,
    pub warm_claimed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Durable result record stored under `deploy_results:<job_id>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployResultRecord {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub success: bool,
    pub tenant_id: Option<Uuid>,
    pub container_name: Option<String>,
    pub schema_name: Option<String>,
    pub cache_partition: Option<i32>,
    pub error: Option<String>,
    pub error_kind: Option<String>,
    #[serde(default)]
    pub compensation: Vec<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl DeployResultRecord {
    pub fn pending(job_id: Uuid) -> Self {
        Self {
            job_id,
            status: JobStatus::Pending,
            success: false,
            tenant_id: None,
            container_name: None,
            schema_name: None,
            cache_partition: None,
            error: None,
            error_kind: None,
            compensation: Vec::new(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn running(job_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            status: JobStatus::Running,
            started_at: Some(started_at),
            ..Self::pending(job_id)
        }
    }

    pub fn completed(
        job_id: Uuid,
        outcome: &DeployOutcome,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            status: JobStatus::Completed,
            success: true,
            tenant_id: Some(outcome.tenant_id),
            container_name: Some(outcome.container_name.clone()),
            schema_name: Some(outcome.schema_name.clone()),
            cache_partition: Some(outcome.cache_partition),
            started_at: Some(started_at),
            completed_at: Some(Utc::now()),
            ..Self::pending(job_id)
        }
    }

    pub fn failed(job_id: Uuid, failure: &DeployFailure, started_at: DateTime<Utc>) -> Self {
        Self {
            status: JobStatus::Failed,
            error: Some(failure.error.to_string()),
            error_kind: Some(failure.error.kind().to_string()),
            compensation: failure.compensation.clone(),
            started_at: Some(started_at),
            completed_at: Some(Utc::now()),
            ..Self::pending(job_id)
        }
    }

    pub fn invalid(job_id: Uuid, message: String, started_at: DateTime<Utc>) -> Self {
        Self::failed(
            job_id,
            &DeployFailure::clean(DeployError::InvalidInput(message)),
            started_at,
        )
    }
}

/// Steps performed (or attempted) by a full teardown.
#[derive(Debug, Clone, Serialize)]
pub struct TeardownReport {
    pub tenant_id: Uuid,
    pub steps: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn valid_request() -> CreateTenantRequest {
        CreateTenantRequest {
            bot_token: format!("100:{}", "A".repeat(35)),
            owner_contact_id: 42,
            display_name: Some("Minta Ügyfél".to_string()),
            plan: Some("quarterly".to_string()),
            bot_username: None,
            submitted_by: Some(7),
        }
    }

    #[test]
    fn test_task_round_trip() {
        let task = DeployTask::from_request(valid_request());
        let json = serde_json::to_string(&task).unwrap();
        let parsed: DeployTask = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.job_id, task.job_id);
        assert_eq!(parsed.version, TASK_VERSION);
        assert_eq!(parsed.owner_contact_id, 42);
    }

    #[test]
    fn test_task_rejects_unknown_fields() {
        let task = DeployTask::from_request(valid_request());
        let mut value = serde_json::to_value(&task).unwrap();
        value["surprise"] = serde_json::json!(true);
        assert!(serde_json::from_value::<DeployTask>(value).is_err());
    }

    #[test]
    fn test_request_rejects_unknown_version() {
        let mut task = DeployTask::from_request(valid_request());
        task.version = 99;
        assert!(DeployRequest::try_from(task).is_err());
    }

    #[test]
    fn test_request_validation() {
        let request = DeployRequest::try_from(valid_request()).unwrap();
        assert_eq!(request.plan, SubscriptionPlan::Quarterly);
        assert_eq!(request.status, SubscriptionStatus::Active);

        let mut bad_owner = valid_request();
        bad_owner.owner_contact_id = 0;
        assert!(DeployRequest::try_from(bad_owner).is_err());

        let mut bad_token = valid_request();
        bad_token.bot_token = "not-a-token".to_string();
        assert!(DeployRequest::try_from(bad_token).is_err());

        let mut bad_plan = valid_request();
        bad_plan.plan = Some("weekly".to_string());
        assert!(DeployRequest::try_from(bad_plan).is_err());
    }

    #[test]
    fn test_default_plan_and_name() {
        let mut request = valid_request();
        request.plan = None;
        request.display_name = None;
        let validated = DeployRequest::try_from(request).unwrap();
        assert_eq!(validated.plan, SubscriptionPlan::Monthly);
        assert_eq!(validated.display_name.to_string(), "Új ügyfél");
    }

    #[test]
    fn test_result_record_serde() {
        let record = DeployResultRecord::running(Uuid::new_v4(), Utc::now());
        let json = serde_json::to_string(&record).unwrap();
        let parsed: DeployResultRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.status, JobStatus::Running);
        assert!(!parsed.success);
    }
}
