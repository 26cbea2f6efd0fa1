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

//! 事件工作器
//!
//! 轮询到期的pending事件，逐个执行状态机：
//! pending → processing → {processed | pending(重试) | failed(终态)}。
//! 处理失败走指数退避重试，重试耗尽后进入终态failed，
//! 只有对账注入的新合成事件才能让同一业务记录重新进入管道。

use crate::domain::models::webhook_event::WebhookEvent;
use crate::domain::repositories::platform_repository::PlatformRepository;
use crate::domain::services::metrics_notifier::MetricsNotifier;
use crate::domain::services::persistence_service::PersistenceService;
use crate::handlers::registry::HandlerRegistry;
use crate::handlers::synthetic::SyntheticHandler;
use crate::handlers::{EventHandler, HandlerError};
use crate::queue::event_queue::EventQueue;
use crate::utils::retry_policy::RetryPolicy;
use chrono::Utc;
use futures::StreamExt;
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// 单个事件的处理结局，决定状态机走向
enum Disposition {
    Processed,
    Retryable(String),
    Fatal(String),
}

#[derive(Clone)]
pub struct EventWorker {
    queue: Arc<dyn EventQueue>,
    registry: Arc<HandlerRegistry>,
    persistence: Arc<PersistenceService>,
    platform_repo: Arc<dyn PlatformRepository>,
    notifier: Arc<dyn MetricsNotifier>,
    retry_policy: RetryPolicy,
    batch_size: u64,
    poll_interval: Duration,
    concurrency: usize,
}

impl EventWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        queue: Arc<dyn EventQueue>,
        registry: Arc<HandlerRegistry>,
        persistence: Arc<PersistenceService>,
        platform_repo: Arc<dyn PlatformRepository>,
        notifier: Arc<dyn MetricsNotifier>,
        retry_policy: RetryPolicy,
        batch_size: u64,
        poll_interval: Duration,
        concurrency: usize,
    ) -> Self {
        Self {
            queue,
            registry,
            persistence,
            platform_repo,
            notifier,
            retry_policy,
            batch_size,
            poll_interval,
            concurrency,
        }
    }

    /// 运行事件处理循环
    pub async fn run(&self) {
        info!("Event worker started");
        loop {
            if let Err(e) = self.process_due_events().await {
                error!("Error processing webhook events: {}", e);
            }
            sleep(self.poll_interval).await;
        }
    }

    /// 领取并处理一批到期事件
    pub async fn process_due_events(&self) -> anyhow::Result<()> {
        let events = self.queue.claim_due(self.batch_size).await?;
        if events.is_empty() {
            return Ok(());
        }
        info!("Processing {} pending webhook events", events.len());

        let worker = self;
        futures::stream::iter(events)
            .for_each_concurrent(self.concurrency, |event| async move {
                if let Err(e) = worker.process_event(event).await {
                    error!("Failed to settle webhook event: {}", e);
                }
            })
            .await;

        Ok(())
    }

    /// 处理单个事件并落下状态迁移
    pub async fn process_event(&self, event: WebhookEvent) -> anyhow::Result<()> {
        counter!("paysync_event_attempts_total").increment(1);
        let start = std::time::Instant::now();
        let platform_id = event.platform_id;

        let disposition = self.execute(&event).await;
        histogram!("paysync_event_duration_seconds").record(start.elapsed().as_secs_f64());

        match disposition {
            Disposition::Processed => {
                let event = self.queue.complete(event).await?;
                counter!("paysync_event_processed_total").increment(1);
                info!(event_id = %event.id, "Webhook event processed");

                // 指标重算是尽力而为的，失败不回滚事件状态
                if let Err(e) = self
                    .notifier
                    .recalculate(platform_id, Utc::now().date_naive())
                    .await
                {
                    warn!(event_id = %event.id, error = %e, "Metrics recalculation signal failed");
                }
            }
            Disposition::Retryable(message) => {
                // retry_count在reschedule里递增，这里按递增后的次数算退避；
                // 重试预算以事件行自带的max_retries为准
                let attempt = event.retry_count as u32 + 1;
                if event.retry_count < event.max_retries {
                    let next = self.retry_policy.next_retry_time(attempt, Utc::now());
                    let event = self.queue.reschedule(event, message, next).await?;
                    counter!("paysync_event_retries_total").increment(1);
                    warn!(
                        event_id = %event.id,
                        retry_count = event.retry_count,
                        next_retry_at = %next,
                        "Webhook event rescheduled"
                    );
                } else {
                    let message = format!("{message} (retries exhausted after {attempt_count} attempts)",
                        attempt_count = event.retry_count);
                    let event = self.queue.fail(event, message).await?;
                    counter!("paysync_event_failed_total", "reason" => "retries_exhausted")
                        .increment(1);
                    error!(event_id = %event.id, "Webhook event failed terminally");
                }
            }
            Disposition::Fatal(message) => {
                let event = self.queue.fail(event, message).await?;
                counter!("paysync_event_failed_total", "reason" => "fatal").increment(1);
                error!(event_id = %event.id, "Webhook event failed terminally");
            }
        }

        Ok(())
    }

    async fn execute(&self, event: &WebhookEvent) -> Disposition {
        let platform = match self.platform_repo.find_by_id(event.platform_id).await {
            Ok(Some(platform)) => platform,
            // 平台缺失属于配置错误，重试无意义
            Ok(None) => {
                return Disposition::Fatal(format!(
                    "platform {} not found",
                    event.platform_id
                ))
            }
            Err(e) => return Disposition::Retryable(e.to_string()),
        };

        // 合成事件载荷已是规范化片段，按签名标记直通合成处理器，
        // 避免与平台原生事件类型（如stripe的customer.created）撞键
        let handler: Arc<dyn EventHandler> = if event.is_synthetic() {
            Arc::new(SyntheticHandler)
        } else {
            match self.registry.resolve(&platform.slug, &event.event_type) {
                Ok(handler) => handler,
                Err(e @ HandlerError::UnmappedEvent { .. }) => {
                    return Disposition::Fatal(e.to_string())
                }
                Err(e) => return Disposition::Retryable(e.to_string()),
            }
        };

        let fragment = match handler.translate(&event.payload) {
            Ok(fragment) => fragment,
            Err(e) if e.is_fatal() => return Disposition::Fatal(e.to_string()),
            Err(e) => return Disposition::Retryable(e.to_string()),
        };

        match self.persistence.persist(event.platform_id, &fragment).await {
            Ok(_) => Disposition::Processed,
            Err(e) => Disposition::Retryable(e.to_string()),
        }
    }
}

#[cfg(test)]
#[path = "event_worker_test.rs"]
mod tests;
