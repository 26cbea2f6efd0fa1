// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::webhook_event::{WebhookEvent, WebhookEventStatus};
use crate::domain::repositories::webhook_event_repository::{
    RepositoryError, WebhookEventRepository,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// 队列错误类型
#[derive(Error, Debug)]
pub enum QueueError {
    /// 仓库错误
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// 入队结果
///
/// 同一平台下重复的外部事件ID不会产生第二行，入队方据此
/// 区分首次接收（202）与重复投递（200）。
#[derive(Debug)]
pub enum EnqueueOutcome {
    /// 新建的事件行
    Created(WebhookEvent),
    /// 已存在的事件行
    Duplicate(WebhookEvent),
}

/// 事件队列特质
///
/// 事件行本身就是队列载体：pending且next_retry_at到期的行
/// 即为可领取的工作。状态迁移由工作器决定，队列只负责落库。
#[async_trait]
pub trait EventQueue: Send + Sync {
    /// 入队事件，按 (platform_id, external_event_id) 去重
    async fn enqueue(&self, event: WebhookEvent) -> Result<EnqueueOutcome, QueueError>;

    /// 领取一批到期事件并标记为processing
    async fn claim_due(&self, limit: u64) -> Result<Vec<WebhookEvent>, QueueError>;

    /// 事件处理成功，置为processed
    async fn complete(&self, event: WebhookEvent) -> Result<WebhookEvent, QueueError>;

    /// 事件重试：回到pending并设置下一次尝试时间
    async fn reschedule(
        &self,
        event: WebhookEvent,
        error_message: String,
        next_retry_at: DateTime<Utc>,
    ) -> Result<WebhookEvent, QueueError>;

    /// 事件终态失败，不再重试
    async fn fail(
        &self,
        event: WebhookEvent,
        error_message: String,
    ) -> Result<WebhookEvent, QueueError>;
}

/// PostgreSQL事件队列实现
///
/// 重试预算在入队时盖到事件行上，此后工作器只看行内的max_retries。
pub struct PostgresEventQueue<R: WebhookEventRepository> {
    repository: Arc<R>,
    max_retries: i32,
}

impl<R: WebhookEventRepository> PostgresEventQueue<R> {
    /// 创建新的PostgreSQL事件队列实例
    pub fn new(repository: Arc<R>, max_retries: i32) -> Self {
        Self {
            repository,
            max_retries,
        }
    }
}

#[async_trait]
impl<R: WebhookEventRepository> EventQueue for PostgresEventQueue<R> {
    async fn enqueue(&self, mut event: WebhookEvent) -> Result<EnqueueOutcome, QueueError> {
        if let Some(existing) = self
            .repository
            .find_by_external(event.platform_id, &event.external_event_id)
            .await?
        {
            return Ok(EnqueueOutcome::Duplicate(existing));
        }
        event.max_retries = self.max_retries;
        let created = self.repository.create(&event).await?;
        Ok(EnqueueOutcome::Created(created))
    }

    async fn claim_due(&self, limit: u64) -> Result<Vec<WebhookEvent>, QueueError> {
        let due = self.repository.find_due(limit).await?;
        let mut claimed = Vec::with_capacity(due.len());
        for mut event in due {
            event.status = WebhookEventStatus::Processing;
            claimed.push(self.repository.update(&event).await?);
        }
        Ok(claimed)
    }

    async fn complete(&self, mut event: WebhookEvent) -> Result<WebhookEvent, QueueError> {
        event.status = WebhookEventStatus::Processed;
        event.processed_at = Some(Utc::now());
        event.error_message = None;
        event.next_retry_at = None;
        Ok(self.repository.update(&event).await?)
    }

    async fn reschedule(
        &self,
        mut event: WebhookEvent,
        error_message: String,
        next_retry_at: DateTime<Utc>,
    ) -> Result<WebhookEvent, QueueError> {
        event.status = WebhookEventStatus::Pending;
        event.retry_count += 1;
        event.error_message = Some(error_message);
        event.next_retry_at = Some(next_retry_at);
        Ok(self.repository.update(&event).await?)
    }

    async fn fail(
        &self,
        mut event: WebhookEvent,
        error_message: String,
    ) -> Result<WebhookEvent, QueueError> {
        event.status = WebhookEventStatus::Failed;
        event.error_message = Some(error_message);
        event.next_retry_at = None;
        Ok(self.repository.update(&event).await?)
    }
}

#[async_trait]
impl<T: EventQueue + ?Sized> EventQueue for Arc<T> {
    async fn enqueue(&self, event: WebhookEvent) -> Result<EnqueueOutcome, QueueError> {
        (**self).enqueue(event).await
    }

    async fn claim_due(&self, limit: u64) -> Result<Vec<WebhookEvent>, QueueError> {
        (**self).claim_due(limit).await
    }

    async fn complete(&self, event: WebhookEvent) -> Result<WebhookEvent, QueueError> {
        (**self).complete(event).await
    }

    async fn reschedule(
        &self,
        event: WebhookEvent,
        error_message: String,
        next_retry_at: DateTime<Utc>,
    ) -> Result<WebhookEvent, QueueError> {
        (**self).reschedule(event, error_message, next_retry_at).await
    }

    async fn fail(
        &self,
        event: WebhookEvent,
        error_message: String,
    ) -> Result<WebhookEvent, QueueError> {
        (**self).fail(event, error_message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct MockEventRepo {
        events: Mutex<Vec<WebhookEvent>>,
    }

    #[async_trait]
    impl WebhookEventRepository for MockEventRepo {
        async fn create(&self, event: &WebhookEvent) -> Result<WebhookEvent, RepositoryError> {
            self.events.lock().unwrap().push(event.clone());
            Ok(event.clone())
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<WebhookEvent>, RepositoryError> {
            Ok(self
                .events
                .lock()
                .unwrap()
                .iter()
                .find(|e| e.id == id)
                .cloned())
        }

        async fn find_by_external(
            &self,
            platform_id: Uuid,
            external_event_id: &str,
        ) -> Result<Option<WebhookEvent>, RepositoryError> {
            Ok(self
                .events
                .lock()
                .unwrap()
                .iter()
                .find(|e| e.platform_id == platform_id && e.external_event_id == external_event_id)
                .cloned())
        }

        async fn find_due(&self, limit: u64) -> Result<Vec<WebhookEvent>, RepositoryError> {
            let now = Utc::now();
            Ok(self
                .events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| {
                    e.status == WebhookEventStatus::Pending
                        && e.next_retry_at.is_none_or(|at| at <= now)
                })
                .take(limit as usize)
                .cloned()
                .collect())
        }

        async fn update(&self, event: &WebhookEvent) -> Result<WebhookEvent, RepositoryError> {
            let mut events = self.events.lock().unwrap();
            match events.iter_mut().find(|e| e.id == event.id) {
                Some(slot) => {
                    *slot = event.clone();
                    Ok(event.clone())
                }
                None => Err(RepositoryError::NotFound),
            }
        }
    }

    fn event(platform_id: Uuid, external_id: &str) -> WebhookEvent {
        WebhookEvent::new(
            platform_id,
            external_id.to_string(),
            "charge.succeeded".to_string(),
            json!({"id": external_id}),
            "sig".to_string(),
        )
    }

    #[tokio::test]
    async fn test_enqueue_deduplicates_by_external_id() {
        let queue = PostgresEventQueue::new(Arc::new(MockEventRepo::default()), 5);
        let platform_id = Uuid::new_v4();

        let first = queue.enqueue(event(platform_id, "evt-1")).await.unwrap();
        assert!(matches!(first, EnqueueOutcome::Created(_)));

        let second = queue.enqueue(event(platform_id, "evt-1")).await.unwrap();
        assert!(matches!(second, EnqueueOutcome::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_enqueue_stamps_retry_budget() {
        let queue = PostgresEventQueue::new(Arc::new(MockEventRepo::default()), 3);

        let outcome = queue.enqueue(event(Uuid::new_v4(), "evt-1")).await.unwrap();
        let EnqueueOutcome::Created(created) = outcome else {
            panic!("expected a created event");
        };
        assert_eq!(created.max_retries, 3);
    }

    #[tokio::test]
    async fn test_claim_marks_processing() {
        let repo = Arc::new(MockEventRepo::default());
        let queue = PostgresEventQueue::new(repo.clone(), 5);
        let platform_id = Uuid::new_v4();
        queue.enqueue(event(platform_id, "evt-1")).await.unwrap();

        let claimed = queue.claim_due(10).await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].status, WebhookEventStatus::Processing);

        // 已领取的事件不会被再次领走
        assert!(queue.claim_due(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reschedule_returns_event_to_pending() {
        let queue = PostgresEventQueue::new(Arc::new(MockEventRepo::default()), 5);
        let platform_id = Uuid::new_v4();
        queue.enqueue(event(platform_id, "evt-1")).await.unwrap();
        let claimed = queue.claim_due(1).await.unwrap().remove(0);

        let next = Utc::now() + chrono::Duration::seconds(60);
        let rescheduled = queue
            .reschedule(claimed, "boom".to_string(), next)
            .await
            .unwrap();
        assert_eq!(rescheduled.status, WebhookEventStatus::Pending);
        assert_eq!(rescheduled.retry_count, 1);
        assert_eq!(rescheduled.next_retry_at, Some(next));

        // 未到期，不可领取
        assert!(queue.claim_due(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fail_is_terminal() {
        let queue = PostgresEventQueue::new(Arc::new(MockEventRepo::default()), 5);
        let platform_id = Uuid::new_v4();
        queue.enqueue(event(platform_id, "evt-1")).await.unwrap();
        let claimed = queue.claim_due(1).await.unwrap().remove(0);

        let failed = queue
            .fail(claimed, "retries exhausted".to_string())
            .await
            .unwrap();
        assert_eq!(failed.status, WebhookEventStatus::Failed);
        assert!(queue.claim_due(1).await.unwrap().is_empty());
    }
}
