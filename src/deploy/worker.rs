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
use crate::common::services::retry_with_backoff;
use crate::deploy::DeployModule;
use crate::deploy::dto::{DeployRequest, DeployResultRecord, DeployTask};
use crate::deploy::error::DeployFailure;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Consumes the deploy queue and executes provisioning jobs.
///
/// Container starts are mostly I/O wait, so several jobs run
/// concurrently under a semaphore. The queue pop is bounded (5 s by
/// default) so the loop notices shutdown promptly; a task popped right
/// as shutdown lands is handed back to the queue instead of being
/// dropped, preserving at-least-once delivery. In-flight jobs are always
/// drained to completion so their compensation can run.
pub struct DeployWorker {
    module: Arc<dyn DeployModule>,
    shutdown: watch::Receiver<bool>,
}

impl DeployWorker {
    pub fn new(module: Arc<dyn DeployModule>, shutdown: watch::Receiver<bool>) -> Self {
        Self { module, shutdown }
    }

    pub async fn run(self) {
        let worker_config = self.module.config().worker().clone();
        info!(
            "Deploy worker started (concurrency {}, pop timeout {}s)",
            worker_config.concurrency, worker_config.queue_pop_timeout_secs
        );

        let semaphore = Arc::new(Semaphore::new(worker_config.concurrency as usize));
        let mut tasks: JoinSet<()> = JoinSet::new();

        loop {
            if *self.shutdown.borrow() {
                break;
            }
            while tasks.try_join_next().is_some() {}

            match self
                .module
                .deploy_queue()
                .pop(worker_config.queue_pop_timeout_secs)
                .await
            {
                Ok(Some(task)) => {
                    if *self.shutdown.borrow() {
                        if let Err(e) = self.module.deploy_queue().push_back(&task).await {
                            error!("Could not return task {} to the queue: {e}", task.job_id);
                        }
                        break;
                    }
                    let Ok(permit) = semaphore.clone().acquire_owned().await else {
                        break;
                    };
                    let module = self.module.clone();
                    tasks.spawn(async move {
                        process_task(module, task).await;
                        drop(permit);
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    error!("Queue pop failed: {e}");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }

        if !tasks.is_empty() {
            info!("Deploy worker draining {} in-flight job(s)", tasks.len());
        }
        while tasks.join_next().await.is_some() {}
        info!("Deploy worker stopped");
    }
}

/// Runs one queued job to its durable conclusion: running marker, deploy
/// with transient retries, result record, owner notification.
pub(crate) async fn process_task(module: Arc<dyn DeployModule>, task: DeployTask) {
    let started_at = Utc::now();
    info!("Processing deploy task {}", task.job_id);

    // The running marker makes a crash between pop and completion
    // detectable: a `running` record that never completes.
    if let Err(e) = module
        .deploy_queue()
        .save_result(&DeployResultRecord::running(task.job_id, started_at))
        .await
    {
        error!("Could not persist running marker for {}: {e}", task.job_id);
    }

    let request = match DeployRequest::try_from(task.clone()) {
        Ok(request) => request,
        Err(message) => {
            warn!("Rejecting malformed deploy task {}: {message}", task.job_id);
            let record = DeployResultRecord::invalid(task.job_id, message, started_at);
            finish(module, &task, record).await;
            return;
        }
    };

    let worker_config = module.config().worker().clone();
    let deployer = module.deployer();
    let result = retry_with_backoff(
        worker_config.max_attempts,
        Duration::from_secs(worker_config.backoff_initial_secs),
        || {
            let deployer = deployer.clone();
            let request = request.clone();
            async move { deployer.deploy(&request).await }
        },
        |failure: &DeployFailure| failure.error.is_transient(),
    )
    .await;

    let record = match result {
        Ok(outcome) => {
            info!("Deploy task {} completed: {}", task.job_id, outcome.tenant_id);
            DeployResultRecord::completed(task.job_id, &outcome, started_at)
        }
        Err(failure) => {
            error!("Deploy task {} failed: {failure}", task.job_id);
            DeployResultRecord::failed(task.job_id, &failure, started_at)
        }
    };
    finish(module, &task, record).await;
}

async fn finish(module: Arc<dyn DeployModule>, task: &DeployTask, record: DeployResultRecord) {
    if let Err(e) = module.deploy_queue().save_result(&record).await {
        error!("Could not store result for {}: {e}", task.job_id);
    }
    notify_owner(module, task, &record).await;
}

fn success_text(task: &DeployTask, record: &DeployResultRecord) -> String {
    format!(
        "✅ *A bot sikeresen elindult!*\n\n\
         🏢 Ügyfél: *{}*\n\
         🐳 Konténer: `{}`\n\
         💾 Cache partíció: *{}*\n\n\
         A botja mostantól 24/7 üzemel. Keresse meg a Telegramban és \
         indítsa a /start paranccsal.",
        task.display_name.as_deref().unwrap_or("Új ügyfél"),
        record.container_name.as_deref().unwrap_or("-"),
        record
            .cache_partition
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string()),
    )
}

fn failure_reason(record: &DeployResultRecord) -> String {
    match record.error_kind.as_deref() {
        Some("already_exists") => "Ez a bot token már regisztrálva van a platformon.".to_string(),
        Some("out_of_capacity") => {
            "Jelenleg nincs szabad kapacitás, kérjük próbálja később.".to_string()
        }
        Some("invalid_input") => record
            .error
            .clone()
            .unwrap_or_else(|| "Érvénytelen kérés.".to_string()),
        _ => "A telepítés technikai hiba miatt nem sikerült, a csapatunk értesítést kapott."
            .to_string(),
    }
}

fn failure_text(task: &DeployTask, record: &DeployResultRecord) -> String {
    format!(
        "❌ *A bot telepítése nem sikerült*\n\n\
         🏢 Ügyfél: *{}*\n\
         Ok: {}",
        task.display_name.as_deref().unwrap_or("Új ügyfél"),
        failure_reason(record),
    )
}

/// Owner notification is best-effort with a single retry; its failure
/// never affects the stored job result.
async fn notify_owner(
    module: Arc<dyn DeployModule>,
    task: &DeployTask,
    record: &DeployResultRecord,
) {
    let text = if record.success {
        success_text(task, record)
    } else {
        failure_text(task, record)
    };
    for attempt in 1..=2 {
        match module.send_message(task.owner_contact_id, &text).await {
            Ok(()) => {
                info!("Result notification sent for job {}", task.job_id);
                return;
            }
            Err(e) => warn!(
                "Notification attempt {attempt} failed for job {}: {e}",
                task.job_id
            ),
        }
    }
    error!("Giving up on owner notification for job {}", task.job_id);
}
