// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::models::platform::CredentialType;
use crate::domain::models::webhook_event::WebhookEvent;
use crate::domain::repositories::platform_repository::PlatformRepository;
use crate::presentation::errors::AppError;
use crate::queue::event_queue::{EnqueueOutcome, EventQueue};
use axum::{
    body::Bytes,
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use hmac::{Hmac, Mac};
use metrics::counter;
use serde_json::json;
use sha2::Sha256;
use std::sync::Arc;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

/// 各平台投递签名所在的请求头
fn signature_header(slug: &str) -> &'static str {
    match slug {
        "stripe" => "stripe-signature",
        "hotmart" => "x-hotmart-hottok",
        "kiwify" => "x-kiwify-signature",
        _ => "x-webhook-signature",
    }
}

/// 从原始负载中取出平台侧事件ID与事件类型
///
/// 三个平台的信封形状各不相同；任何一项缺失都视为畸形投递。
/// kiwify不提供独立的事件ID，同一订单会陆续投递多个生命周期事件
/// （order_approved之后还有order_refunded等），因此去重键用
/// 订单ID拼接事件类型合成，避免后续事件被当作重复投递吞掉。
fn extract_envelope(slug: &str, payload: &serde_json::Value) -> Option<(String, String)> {
    let (id_key, type_key) = match slug {
        "stripe" => ("id", "type"),
        "hotmart" => ("id", "event"),
        "kiwify" => ("order_id", "webhook_event_type"),
        _ => return None,
    };

    let native_id = payload.get(id_key)?.as_str()?.to_string();
    let event_type = payload.get(type_key)?.as_str()?.to_string();
    let external_event_id = if slug == "kiwify" {
        format!("{}:{}", native_id, event_type)
    } else {
        native_id
    };
    Some((external_event_id, event_type))
}

/// 校验投递签名（对原始请求体的HMAC-SHA256十六进制摘要）
fn verify_signature(secret: &str, body: &[u8], provided: &str) -> bool {
    let Ok(expected) = hex::decode(provided.trim()) else {
        return false;
    };

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Webhook投递入口
///
/// POST /v1/webhooks/{slug}
///
/// 平台配置了webhook_secret凭证时校验签名；按
/// (platform_id, external_event_id) 去重；新事件以pending状态
/// 入库并返回202，重复投递返回200与既有事件ID。
pub async fn receive_webhook(
    Extension(platform_repo): Extension<Arc<dyn PlatformRepository>>,
    Extension(queue): Extension<Arc<dyn EventQueue>>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let Some(platform) = platform_repo.find_by_slug(&slug).await? else {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("unknown platform: {}", slug) })),
        ));
    };

    if !platform.enabled {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("platform disabled: {}", slug) })),
        ));
    }

    let signature = headers
        .get(signature_header(&slug))
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let credentials = platform_repo.list_credentials(platform.id).await?;
    let webhook_secret = credentials
        .iter()
        .find(|c| c.credential_type == CredentialType::WebhookSecret)
        .map(|c| c.secret.as_str());

    if let Some(secret) = webhook_secret {
        if !verify_signature(secret, &body, &signature) {
            counter!("paysync_webhook_rejected_total", "platform" => slug.clone()).increment(1);
            warn!(platform = %slug, "Webhook delivery rejected: signature mismatch");
            return Ok((
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "invalid signature" })),
            ));
        }
    }

    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            return Ok((
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("invalid JSON payload: {}", e) })),
            ));
        }
    };

    let Some((external_event_id, event_type)) = extract_envelope(&slug, &payload) else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "payload is missing event id or event type" })),
        ));
    };

    let event = WebhookEvent::new(
        platform.id,
        external_event_id,
        event_type,
        payload,
        signature,
    );

    match queue.enqueue(event).await? {
        EnqueueOutcome::Created(created) => {
            counter!("paysync_webhook_received_total", "platform" => slug.clone()).increment(1);
            debug!(platform = %slug, event_id = %created.id, "Webhook delivery accepted");
            Ok((
                StatusCode::ACCEPTED,
                Json(json!({ "id": created.id, "status": "accepted" })),
            ))
        }
        EnqueueOutcome::Duplicate(existing) => {
            counter!("paysync_webhook_duplicate_total", "platform" => slug.clone()).increment(1);
            debug!(platform = %slug, event_id = %existing.id, "Webhook delivery deduplicated");
            Ok((
                StatusCode::OK,
                Json(json!({ "id": existing.id, "status": "duplicate" })),
            ))
        }
    }
}
