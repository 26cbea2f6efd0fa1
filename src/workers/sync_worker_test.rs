use crate::domain::models::canonical::{
    BillingPeriod, CanonicalCustomer, CanonicalSubscription, CanonicalTransaction,
    SubscriptionStatus, TransactionStatus,
};
use crate::domain::models::platform::{Platform, PlatformCredential};
use crate::domain::models::sync_log::{SyncLog, SyncStatus};
use crate::domain::models::webhook_event::WebhookEvent;
use crate::domain::repositories::customer_repository::{CustomerRecord, CustomerRepository};
use crate::domain::repositories::platform_repository::PlatformRepository;
use crate::domain::repositories::subscription_repository::{
    SubscriptionRecord, SubscriptionRepository,
};
use crate::domain::repositories::sync_log_repository::SyncLogRepository;
use crate::domain::repositories::transaction_repository::{
    TransactionRecord, TransactionRepository,
};
use crate::domain::repositories::webhook_event_repository::RepositoryError;
use crate::providers::adapter::{FetchPage, FetchParams, ProviderAdapter, ProviderError};
use crate::providers::resolver::ProviderResolver;
use crate::queue::event_queue::{EnqueueOutcome, EventQueue, QueueError};
use crate::workers::sync_worker::SyncWorker;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

#[derive(Default)]
struct MockAdapter {
    subscriptions: Vec<CanonicalSubscription>,
    transactions: Vec<CanonicalTransaction>,
    customers: Vec<CanonicalCustomer>,
    fail_transactions: bool,
    calls: AtomicI64,
}

#[async_trait]
impl ProviderAdapter for MockAdapter {
    async fn fetch_subscriptions(
        &self,
        _params: &FetchParams,
    ) -> Result<FetchPage<CanonicalSubscription>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(FetchPage {
            records: self.subscriptions.clone(),
            next_cursor: None,
        })
    }

    async fn fetch_transactions(
        &self,
        _params: &FetchParams,
    ) -> Result<FetchPage<CanonicalTransaction>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_transactions {
            return Err(ProviderError::Api {
                status: 500,
                body: "upstream down".to_string(),
            });
        }
        Ok(FetchPage {
            records: self.transactions.clone(),
            next_cursor: None,
        })
    }

    async fn fetch_customers(
        &self,
        _params: &FetchParams,
    ) -> Result<FetchPage<CanonicalCustomer>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(FetchPage {
            records: self.customers.clone(),
            next_cursor: None,
        })
    }

    async fn test_connection(&self) -> bool {
        true
    }

    fn slug(&self) -> &'static str {
        "mock"
    }
}

struct StubPlatformRepo {
    platform: Platform,
}

#[async_trait]
impl PlatformRepository for StubPlatformRepo {
    async fn find_by_id(&self, _id: Uuid) -> Result<Option<Platform>, RepositoryError> {
        Ok(Some(self.platform.clone()))
    }

    async fn find_by_slug(&self, _slug: &str) -> Result<Option<Platform>, RepositoryError> {
        Ok(Some(self.platform.clone()))
    }

    async fn list_enabled(&self) -> Result<Vec<Platform>, RepositoryError> {
        Ok(vec![self.platform.clone()])
    }

    async fn list_credentials(
        &self,
        _platform_id: Uuid,
    ) -> Result<Vec<PlatformCredential>, RepositoryError> {
        Ok(Vec::new())
    }
}

#[derive(Default)]
struct CapturingQueue {
    enqueued: Mutex<Vec<WebhookEvent>>,
}

#[async_trait]
impl EventQueue for CapturingQueue {
    async fn enqueue(&self, event: WebhookEvent) -> Result<EnqueueOutcome, QueueError> {
        self.enqueued.lock().unwrap().push(event.clone());
        Ok(EnqueueOutcome::Created(event))
    }

    async fn claim_due(&self, _limit: u64) -> Result<Vec<WebhookEvent>, QueueError> {
        Ok(Vec::new())
    }

    async fn complete(&self, event: WebhookEvent) -> Result<WebhookEvent, QueueError> {
        Ok(event)
    }

    async fn reschedule(
        &self,
        event: WebhookEvent,
        _error_message: String,
        _next_retry_at: DateTime<Utc>,
    ) -> Result<WebhookEvent, QueueError> {
        Ok(event)
    }

    async fn fail(
        &self,
        event: WebhookEvent,
        _error_message: String,
    ) -> Result<WebhookEvent, QueueError> {
        Ok(event)
    }
}

#[derive(Default)]
struct InMemorySyncLogRepo {
    logs: Mutex<Vec<SyncLog>>,
}

#[async_trait]
impl SyncLogRepository for InMemorySyncLogRepo {
    async fn create(&self, log: &SyncLog) -> Result<SyncLog, RepositoryError> {
        self.logs.lock().unwrap().push(log.clone());
        Ok(log.clone())
    }

    async fn update(&self, log: &SyncLog) -> Result<SyncLog, RepositoryError> {
        let mut logs = self.logs.lock().unwrap();
        match logs.iter_mut().find(|l| l.id == log.id) {
            Some(slot) => {
                *slot = log.clone();
                Ok(log.clone())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn list_recent(
        &self,
        _platform_id: Option<Uuid>,
        limit: u64,
    ) -> Result<Vec<SyncLog>, RepositoryError> {
        Ok(self
            .logs
            .lock()
            .unwrap()
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct InMemorySubscriptionRepo {
    existing: Vec<SubscriptionRecord>,
    // 查找这些外部ID时直接报错，用于单条隔离
    failing_external_ids: Vec<String>,
    drift_updates: Mutex<Vec<Uuid>>,
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepo {
    async fn find_by_external(
        &self,
        _platform_id: Uuid,
        external_id: &str,
    ) -> Result<Option<SubscriptionRecord>, RepositoryError> {
        if self.failing_external_ids.iter().any(|id| id == external_id) {
            return Err(RepositoryError::NotFound);
        }
        Ok(self
            .existing
            .iter()
            .find(|s| s.external_id == external_id)
            .cloned())
    }

    async fn upsert(
        &self,
        _platform_id: Uuid,
        _customer_id: Uuid,
        _product_id: Option<Uuid>,
        _subscription: &CanonicalSubscription,
    ) -> Result<SubscriptionRecord, RepositoryError> {
        unreachable!("sync path never upserts subscriptions directly")
    }

    async fn update_drift(
        &self,
        id: Uuid,
        _status: SubscriptionStatus,
        _amount: i64,
        _current_period_end: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError> {
        self.drift_updates.lock().unwrap().push(id);
        Ok(())
    }
}

#[derive(Default)]
struct InMemoryTransactionRepo {
    existing: Vec<TransactionRecord>,
}

#[async_trait]
impl TransactionRepository for InMemoryTransactionRepo {
    async fn find_by_external(
        &self,
        _platform_id: Uuid,
        external_id: &str,
    ) -> Result<Option<TransactionRecord>, RepositoryError> {
        Ok(self
            .existing
            .iter()
            .find(|t| t.external_id == external_id)
            .cloned())
    }

    async fn insert(
        &self,
        _platform_id: Uuid,
        _customer_id: Uuid,
        _order_id: Option<Uuid>,
        _transaction: &CanonicalTransaction,
    ) -> Result<TransactionRecord, RepositoryError> {
        unreachable!("sync path never inserts transactions directly")
    }

    async fn link_subscription(
        &self,
        _transaction_id: Uuid,
        _subscription_id: Uuid,
    ) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn update_drift(
        &self,
        _id: Uuid,
        _status: TransactionStatus,
        _amount: i64,
    ) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[derive(Default)]
struct InMemoryCustomerRepo {
    existing: Vec<CustomerRecord>,
    contact_updates: Mutex<Vec<Uuid>>,
}

#[async_trait]
impl CustomerRepository for InMemoryCustomerRepo {
    async fn find_by_external(
        &self,
        _platform_id: Uuid,
        external_id: &str,
    ) -> Result<Option<CustomerRecord>, RepositoryError> {
        Ok(self
            .existing
            .iter()
            .find(|c| c.external_id == external_id)
            .cloned())
    }

    async fn upsert(
        &self,
        _platform_id: Uuid,
        _customer: &CanonicalCustomer,
    ) -> Result<CustomerRecord, RepositoryError> {
        unreachable!("sync path never upserts customers directly")
    }

    async fn increment_lifetime_spend(
        &self,
        _id: Uuid,
        _amount: i64,
    ) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn update_contact(
        &self,
        id: Uuid,
        _name: Option<String>,
        _email: Option<String>,
    ) -> Result<(), RepositoryError> {
        self.contact_updates.lock().unwrap().push(id);
        Ok(())
    }
}

fn platform(webhook_only: bool) -> Platform {
    Platform {
        id: Uuid::new_v4(),
        name: "Mock".to_string(),
        slug: "mock".to_string(),
        enabled: true,
        webhook_only,
        base_currency: "USD".to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn subscription(external_id: &str, amount: i64) -> CanonicalSubscription {
    CanonicalSubscription {
        external_id: external_id.to_string(),
        external_customer_id: "cus_1".to_string(),
        external_product_id: None,
        external_price_id: None,
        product_name: None,
        status: SubscriptionStatus::Active,
        trial_start: None,
        trial_end: None,
        amount,
        currency: "USD".to_string(),
        billing_period: BillingPeriod::Month,
        billing_interval: 1,
        started_at: None,
        current_period_start: None,
        current_period_end: None,
        next_billing_at: None,
        canceled_at: None,
        metadata: None,
    }
}

fn subscription_record(external_id: &str, amount: i64) -> SubscriptionRecord {
    SubscriptionRecord {
        id: Uuid::new_v4(),
        external_id: external_id.to_string(),
        customer_id: Uuid::new_v4(),
        status: SubscriptionStatus::Active,
        trial_active: false,
        amount,
        current_period_end: None,
    }
}

struct Fixture {
    queue: Arc<CapturingQueue>,
    sync_log_repo: Arc<InMemorySyncLogRepo>,
    subscription_repo: Arc<InMemorySubscriptionRepo>,
    customer_repo: Arc<InMemoryCustomerRepo>,
    worker: SyncWorker,
}

fn fixture(
    platform: &Platform,
    subscription_repo: InMemorySubscriptionRepo,
    transaction_repo: InMemoryTransactionRepo,
    customer_repo: InMemoryCustomerRepo,
) -> Fixture {
    let platform_repo = Arc::new(StubPlatformRepo {
        platform: platform.clone(),
    });
    let queue = Arc::new(CapturingQueue::default());
    let sync_log_repo = Arc::new(InMemorySyncLogRepo::default());
    let subscription_repo = Arc::new(subscription_repo);
    let customer_repo = Arc::new(customer_repo);
    let worker = SyncWorker::new(
        platform_repo.clone(),
        Arc::new(ProviderResolver::new(platform_repo)),
        queue.clone(),
        sync_log_repo.clone(),
        customer_repo.clone(),
        subscription_repo.clone(),
        Arc::new(transaction_repo),
        Duration::from_secs(6 * 3600),
        1000,
        10,
    );
    Fixture {
        queue,
        sync_log_repo,
        subscription_repo,
        customer_repo,
        worker,
    }
}

#[tokio::test]
async fn test_missing_records_become_synthetic_events() {
    let platform = platform(false);
    // 平台侧3条订阅，本地只有1条
    let adapter = Arc::new(MockAdapter {
        subscriptions: vec![
            subscription("sub-1", 1000),
            subscription("sub-2", 1000),
            subscription("sub-3", 1000),
        ],
        ..Default::default()
    });
    let f = fixture(
        &platform,
        InMemorySubscriptionRepo {
            existing: vec![subscription_record("sub-1", 1000)],
            ..Default::default()
        },
        InMemoryTransactionRepo::default(),
        InMemoryCustomerRepo::default(),
    );

    f.worker
        .sync_platform_with_adapter(&platform, adapter)
        .await
        .unwrap();

    let enqueued = f.queue.enqueued.lock().unwrap();
    assert_eq!(enqueued.len(), 2);
    assert!(enqueued.iter().all(|e| e.event_type == "subscription.created"));
    assert!(enqueued.iter().all(|e| e.is_synthetic()));

    let logs = f.sync_log_repo.logs.lock().unwrap();
    assert_eq!(logs.len(), 3);
    let sub_log = &logs[0];
    assert_eq!(sub_log.status, SyncStatus::Completed);
    assert_eq!(sub_log.missing_records_found, 2);
    assert_eq!(sub_log.records_failed, 0);
}

#[tokio::test]
async fn test_drifted_subscription_gets_field_level_update() {
    let platform = platform(false);
    let adapter = Arc::new(MockAdapter {
        subscriptions: vec![subscription("sub-1", 4990)],
        ..Default::default()
    });
    let f = fixture(
        &platform,
        InMemorySubscriptionRepo {
            existing: vec![subscription_record("sub-1", 2990)],
            ..Default::default()
        },
        InMemoryTransactionRepo::default(),
        InMemoryCustomerRepo::default(),
    );

    f.worker
        .sync_platform_with_adapter(&platform, adapter)
        .await
        .unwrap();

    assert_eq!(f.subscription_repo.drift_updates.lock().unwrap().len(), 1);
    assert!(f.queue.enqueued.lock().unwrap().is_empty());
    let logs = f.sync_log_repo.logs.lock().unwrap();
    assert_eq!(logs[0].records_synced, 1);
}

#[tokio::test]
async fn test_identical_records_cause_no_writes() {
    let platform = platform(false);
    let adapter = Arc::new(MockAdapter {
        subscriptions: vec![subscription("sub-1", 2990)],
        ..Default::default()
    });
    let f = fixture(
        &platform,
        InMemorySubscriptionRepo {
            existing: vec![subscription_record("sub-1", 2990)],
            ..Default::default()
        },
        InMemoryTransactionRepo::default(),
        InMemoryCustomerRepo::default(),
    );

    f.worker
        .sync_platform_with_adapter(&platform, adapter)
        .await
        .unwrap();

    assert!(f.subscription_repo.drift_updates.lock().unwrap().is_empty());
    let logs = f.sync_log_repo.logs.lock().unwrap();
    assert_eq!(logs[0].records_synced, 0);
}

#[tokio::test]
async fn test_webhook_only_platform_is_fully_skipped() {
    let platform = platform(true);
    let f = fixture(
        &platform,
        InMemorySubscriptionRepo::default(),
        InMemoryTransactionRepo::default(),
        InMemoryCustomerRepo::default(),
    );

    f.worker.sync_platform(&platform).await.unwrap();

    assert!(f.sync_log_repo.logs.lock().unwrap().is_empty());
    assert!(f.queue.enqueued.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_per_record_failure_is_isolated() {
    let platform = platform(false);
    let adapter = Arc::new(MockAdapter {
        subscriptions: vec![subscription("sub-bad", 1000), subscription("sub-2", 1000)],
        ..Default::default()
    });
    let f = fixture(
        &platform,
        InMemorySubscriptionRepo {
            failing_external_ids: vec!["sub-bad".to_string()],
            ..Default::default()
        },
        InMemoryTransactionRepo::default(),
        InMemoryCustomerRepo::default(),
    );

    f.worker
        .sync_platform_with_adapter(&platform, adapter)
        .await
        .unwrap();

    let logs = f.sync_log_repo.logs.lock().unwrap();
    assert_eq!(logs[0].status, SyncStatus::Completed);
    assert_eq!(logs[0].records_failed, 1);
    assert_eq!(logs[0].missing_records_found, 1);
}

#[tokio::test]
async fn test_batch_failure_closes_log_failed_and_stops_remaining_types() {
    let platform = platform(false);
    let adapter = Arc::new(MockAdapter {
        fail_transactions: true,
        ..Default::default()
    });
    let f = fixture(
        &platform,
        InMemorySubscriptionRepo::default(),
        InMemoryTransactionRepo::default(),
        InMemoryCustomerRepo::default(),
    );

    let result = f.worker.sync_platform_with_adapter(&platform, adapter).await;
    assert!(result.is_err());

    let logs = f.sync_log_repo.logs.lock().unwrap();
    // 订阅完成，交易失败，客户对账从未开始
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].status, SyncStatus::Completed);
    assert_eq!(logs[1].status, SyncStatus::Failed);
    assert!(logs[1].error_details.as_deref().unwrap().contains("upstream down"));
}

#[tokio::test]
async fn test_customer_contact_drift_updates() {
    let platform = platform(false);
    let customer_id = Uuid::new_v4();
    let adapter = Arc::new(MockAdapter {
        customers: vec![CanonicalCustomer {
            external_id: "cus_1".to_string(),
            name: Some("New Name".to_string()),
            email: Some("new@example.com".to_string()),
            document: None,
            phone: None,
            street: None,
            city: None,
            state: None,
            country: None,
            postal_code: None,
            created_at: None,
            metadata: None,
        }],
        ..Default::default()
    });
    let f = fixture(
        &platform,
        InMemorySubscriptionRepo::default(),
        InMemoryTransactionRepo::default(),
        InMemoryCustomerRepo {
            existing: vec![CustomerRecord {
                id: customer_id,
                external_id: "cus_1".to_string(),
                name: Some("Old Name".to_string()),
                email: Some("old@example.com".to_string()),
                lifetime_spend: 0,
            }],
            ..Default::default()
        },
    );

    f.worker
        .sync_platform_with_adapter(&platform, adapter)
        .await
        .unwrap();

    assert_eq!(
        *f.customer_repo.contact_updates.lock().unwrap(),
        vec![customer_id]
    );
}
