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
use crate::app::config::AppConfig;
use crate::common::DefaultAppState;
use crate::deploy::worker::DeployWorker;
use crate::pool::monitor::PoolMonitor;
use crate::subscriptions::checker::SubscriptionChecker;
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

pub fn init_subscriber() {
    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_max_level(Level::INFO) //TODO: make configurable
            .finish(),
    )
    .expect("setting default subscriber failed");
}

pub async fn init_default_app() -> Result<(Arc<AppConfig>, Router, Arc<DefaultAppState>)> {
    let app_state = Arc::new(DefaultAppState::new().await?);
    app_state.migrate_control_db().await?;
    app_state
        .container_driver
        .ensure_network(&app_state.config.docker().network)
        .await?;

    let router = Router::new().nest(
        "/api",
        Router::new()
            .merge(crate::tenants::routes::routes(app_state.clone()))
            .merge(crate::deploy::routes::routes(app_state.clone()))
            .merge(crate::pool::routes::routes(app_state.clone()))
            .layer(TraceLayer::new_for_http()),
    );

    Ok((app_state.config.clone(), router, app_state))
}

/// Launches the long-running tasks: deploy worker, pool autoscaler, and
/// subscription checker. Each observes the shared shutdown channel and
/// drains cleanly.
pub fn spawn_background_tasks(
    app_state: Arc<DefaultAppState>,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    vec![
        tokio::spawn(DeployWorker::new(app_state.clone(), shutdown.clone()).run()),
        tokio::spawn(PoolMonitor::new(app_state.clone(), shutdown.clone()).run()),
        tokio::spawn(SubscriptionChecker::new(app_state, shutdown).run()),
    ]
}
