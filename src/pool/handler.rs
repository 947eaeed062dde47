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
use crate::common::dto::{EmptyType, GeneralError, HandlerResult, SuccessResponseBuilder};
use crate::common::error::FriendlyError;
use crate::pool::PoolModule;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use std::sync::Arc;

pub async fn status(State(module): State<Arc<dyn PoolModule>>) -> HandlerResult {
    match module.warm_pool().status().await {
        Ok(status) => match SuccessResponseBuilder::<EmptyType, _>::new()
            .status_code(StatusCode::OK)
            .data(status)
            .build()
        {
            Ok(r) => Ok(r.into_response()),
            Err(e) => Err(FriendlyError::internal(
                file!(),
                GeneralError {
                    message: e.to_string(),
                },
            )
            .into_response()),
        },
        Err(e) => Err(FriendlyError::internal(
            file!(),
            GeneralError {
                message: e.to_string(),
            },
        )
        .into_response()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::AppConfigBuilder;
    use crate::pool::manager::{MockWarmPool, PoolStatus};
    use crate::pool::routes;
    use crate::pool::tests::MockPoolModule;
    use axum::Router;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_status_reports_counts() {
        let mut warm_pool = MockWarmPool::new();
        warm_pool.expect_status().returning(|| {
            Ok(PoolStatus {
                total: 3,
                waiting: 2,
                claimed: 0,
                active: 1,
                unknown: 0,
                bots: Vec::new(),
            })
        });

        let warm_pool = Arc::new(warm_pool);
        let config = Arc::new(AppConfigBuilder::default().build().unwrap());
        let mut module = MockPoolModule::new();
        module.expect_config().returning(move || config.clone());
        module
            .expect_warm_pool()
            .returning(move || warm_pool.clone());

        let app = Router::new().nest("/api", routes::routes(Arc::new(module)));
        let request = Request::builder()
            .method("GET")
            .uri("/api/pool/status")
            .header("Authorization", "Bearer test_api_token")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["data"]["waiting"], 2);
        assert_eq!(parsed["data"]["total"], 3);
    }
}
