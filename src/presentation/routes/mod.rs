// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::presentation::handlers::{sync_handler, webhook_handler};
use axum::{
    routing::{get, post},
    Router,
};

/// 创建应用路由
///
/// # 返回值
///
/// 返回配置好的路由
pub fn routes() -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/v1/version", get(version));

    let api_routes = Router::new()
        .route(
            "/v1/webhooks/{slug}",
            post(webhook_handler::receive_webhook),
        )
        .route("/v1/sync", post(sync_handler::trigger_sync_all))
        .route("/v1/sync/logs", get(sync_handler::list_sync_logs))
        .route("/v1/sync/{slug}", post(sync_handler::trigger_sync_platform));

    Router::new().merge(public_routes).merge(api_routes)
}

/// 健康检查端点
///
/// # 返回值
///
/// 返回"OK"字符串
pub async fn health_check() -> &'static str {
    "OK"
}

/// 版本信息端点
///
/// # 返回值
///
/// 返回应用版本号
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
