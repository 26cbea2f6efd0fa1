// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::repositories::platform_repository::PlatformRepository;
use crate::domain::repositories::sync_log_repository::SyncLogRepository;
use crate::presentation::errors::AppError;
use crate::workers::sync_worker::SyncCommand;
use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;

/// 对账日志查询参数
#[derive(Debug, Deserialize)]
pub struct SyncLogQuery {
    /// 平台slug过滤
    pub platform: Option<String>,
    /// 返回条数上限
    pub limit: Option<u64>,
}

/// 触发全平台对账
///
/// POST /v1/sync，即发即忘，对账在后台执行。
pub async fn trigger_sync_all(
    Extension(trigger): Extension<mpsc::Sender<SyncCommand>>,
) -> Result<impl IntoResponse, AppError> {
    trigger.send(SyncCommand::All).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "status": "sync scheduled" })),
    ))
}

/// 触发单平台对账
///
/// POST /v1/sync/{slug}
pub async fn trigger_sync_platform(
    Extension(platform_repo): Extension<Arc<dyn PlatformRepository>>,
    Extension(trigger): Extension<mpsc::Sender<SyncCommand>>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if platform_repo.find_by_slug(&slug).await?.is_none() {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("unknown platform: {}", slug) })),
        ));
    }

    trigger.send(SyncCommand::Platform(slug.clone())).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "status": "sync scheduled", "platform": slug })),
    ))
}

/// 读取最近的对账日志
///
/// GET /v1/sync/logs?platform={slug}&limit={n}
pub async fn list_sync_logs(
    Extension(platform_repo): Extension<Arc<dyn PlatformRepository>>,
    Extension(sync_log_repo): Extension<Arc<dyn SyncLogRepository>>,
    Query(query): Query<SyncLogQuery>,
) -> Result<impl IntoResponse, AppError> {
    let platform_id = match query.platform {
        Some(slug) => match platform_repo.find_by_slug(&slug).await? {
            Some(platform) => Some(platform.id),
            None => {
                return Ok((
                    StatusCode::NOT_FOUND,
                    Json(json!({ "error": format!("unknown platform: {}", slug) })),
                ));
            }
        },
        None => None,
    };

    let limit = query.limit.unwrap_or(50).min(500);
    let logs = sync_log_repo.list_recent(platform_id, limit).await?;

    Ok((StatusCode::OK, Json(json!({ "logs": logs }))))
}
