use crate::domain::models::affiliate::AffiliateTier;
use crate::domain::models::canonical::{
    CanonicalAffiliate, CanonicalCustomer, CanonicalOrder, CanonicalSubscription,
    CanonicalTransaction, SubscriptionStatus, TransactionStatus,
};
use crate::domain::models::platform::{Platform, PlatformCredential};
use crate::domain::models::webhook_event::{WebhookEvent, WebhookEventStatus};
use crate::domain::repositories::affiliate_repository::{AffiliateRecord, AffiliateRepository};
use crate::domain::repositories::customer_repository::{CustomerRecord, CustomerRepository};
use crate::domain::repositories::order_repository::OrderRepository;
use crate::domain::repositories::platform_repository::PlatformRepository;
use crate::domain::repositories::product_repository::ProductRepository;
use crate::domain::repositories::subscription_repository::{
    SubscriptionRecord, SubscriptionRepository,
};
use crate::domain::repositories::transaction_repository::{
    TransactionRecord, TransactionRepository,
};
use crate::domain::repositories::webhook_event_repository::RepositoryError;
use crate::domain::services::metrics_notifier::MetricsNotifier;
use crate::domain::services::persistence_service::PersistenceService;
use crate::handlers::registry::HandlerRegistry;
use crate::handlers::{EventHandler, HandlerError};
use crate::queue::event_queue::{EnqueueOutcome, EventQueue, QueueError};
use crate::utils::retry_policy::RetryPolicy;
use crate::workers::event_worker::EventWorker;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::json;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

// 记录状态迁移的内存队列
#[derive(Default)]
struct RecordingQueue {
    completed: Mutex<Vec<WebhookEvent>>,
    rescheduled: Mutex<Vec<(WebhookEvent, String, DateTime<Utc>)>>,
    failed: Mutex<Vec<(WebhookEvent, String)>>,
}

#[async_trait]
impl EventQueue for RecordingQueue {
    async fn enqueue(&self, event: WebhookEvent) -> Result<EnqueueOutcome, QueueError> {
        Ok(EnqueueOutcome::Created(event))
    }

    async fn claim_due(&self, _limit: u64) -> Result<Vec<WebhookEvent>, QueueError> {
        Ok(Vec::new())
    }

    async fn complete(&self, mut event: WebhookEvent) -> Result<WebhookEvent, QueueError> {
        event.status = WebhookEventStatus::Processed;
        self.completed.lock().unwrap().push(event.clone());
        Ok(event)
    }

    async fn reschedule(
        &self,
        mut event: WebhookEvent,
        error_message: String,
        next_retry_at: DateTime<Utc>,
    ) -> Result<WebhookEvent, QueueError> {
        event.status = WebhookEventStatus::Pending;
        event.retry_count += 1;
        self.rescheduled
            .lock()
            .unwrap()
            .push((event.clone(), error_message, next_retry_at));
        Ok(event)
    }

    async fn fail(
        &self,
        mut event: WebhookEvent,
        error_message: String,
    ) -> Result<WebhookEvent, QueueError> {
        event.status = WebhookEventStatus::Failed;
        self.failed
            .lock()
            .unwrap()
            .push((event.clone(), error_message));
        Ok(event)
    }
}

struct StubPlatformRepo {
    platform: Option<Platform>,
}

#[async_trait]
impl PlatformRepository for StubPlatformRepo {
    async fn find_by_id(&self, _id: Uuid) -> Result<Option<Platform>, RepositoryError> {
        Ok(self.platform.clone())
    }

    async fn find_by_slug(&self, _slug: &str) -> Result<Option<Platform>, RepositoryError> {
        Ok(self.platform.clone())
    }

    async fn list_enabled(&self) -> Result<Vec<Platform>, RepositoryError> {
        Ok(self.platform.clone().into_iter().collect())
    }

    async fn list_credentials(
        &self,
        _platform_id: Uuid,
    ) -> Result<Vec<PlatformCredential>, RepositoryError> {
        Ok(Vec::new())
    }
}

#[derive(Default)]
struct StubCustomerRepo;

#[async_trait]
impl CustomerRepository for StubCustomerRepo {
    async fn find_by_external(
        &self,
        _platform_id: Uuid,
        _external_id: &str,
    ) -> Result<Option<CustomerRecord>, RepositoryError> {
        Ok(None)
    }

    async fn upsert(
        &self,
        _platform_id: Uuid,
        customer: &CanonicalCustomer,
    ) -> Result<CustomerRecord, RepositoryError> {
        Ok(CustomerRecord {
            id: Uuid::new_v4(),
            external_id: customer.external_id.clone(),
            name: None,
            email: None,
            lifetime_spend: 0,
        })
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
        _id: Uuid,
        _name: Option<String>,
        _email: Option<String>,
    ) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[derive(Default)]
struct StubAffiliateRepo;

#[async_trait]
impl AffiliateRepository for StubAffiliateRepo {
    async fn upsert(
        &self,
        _platform_id: Uuid,
        affiliate: &CanonicalAffiliate,
    ) -> Result<AffiliateRecord, RepositoryError> {
        Ok(AffiliateRecord {
            id: Uuid::new_v4(),
            external_id: affiliate.external_id.clone(),
            total_sales: 0,
            total_revenue: 0,
            tier: AffiliateTier::Bronze,
        })
    }

    async fn update_performance(
        &self,
        _id: Uuid,
        _total_sales: i64,
        _total_revenue: i64,
        _tier: AffiliateTier,
    ) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[derive(Default)]
struct StubSubscriptionRepo;

#[async_trait]
impl SubscriptionRepository for StubSubscriptionRepo {
    async fn find_by_external(
        &self,
        _platform_id: Uuid,
        _external_id: &str,
    ) -> Result<Option<SubscriptionRecord>, RepositoryError> {
        Ok(None)
    }

    async fn upsert(
        &self,
        _platform_id: Uuid,
        customer_id: Uuid,
        _product_id: Option<Uuid>,
        subscription: &CanonicalSubscription,
    ) -> Result<SubscriptionRecord, RepositoryError> {
        Ok(SubscriptionRecord {
            id: Uuid::new_v4(),
            external_id: subscription.external_id.clone(),
            customer_id,
            status: subscription.status,
            trial_active: false,
            amount: subscription.amount,
            current_period_end: None,
        })
    }

    async fn update_drift(
        &self,
        _id: Uuid,
        _status: SubscriptionStatus,
        _amount: i64,
        _current_period_end: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[derive(Default)]
struct StubTransactionRepo {
    fail_inserts: bool,
}

#[async_trait]
impl TransactionRepository for StubTransactionRepo {
    async fn find_by_external(
        &self,
        _platform_id: Uuid,
        _external_id: &str,
    ) -> Result<Option<TransactionRecord>, RepositoryError> {
        Ok(None)
    }

    async fn insert(
        &self,
        _platform_id: Uuid,
        customer_id: Uuid,
        _order_id: Option<Uuid>,
        transaction: &CanonicalTransaction,
    ) -> Result<TransactionRecord, RepositoryError> {
        if self.fail_inserts {
            return Err(RepositoryError::NotFound);
        }
        Ok(TransactionRecord {
            id: Uuid::new_v4(),
            external_id: transaction.external_id.clone(),
            customer_id,
            status: transaction.status,
            amount: transaction.amount,
        })
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
struct StubProductRepo;

#[async_trait]
impl ProductRepository for StubProductRepo {
    async fn find_or_create(
        &self,
        _platform_id: Uuid,
        _external_id: &str,
        _name: &str,
    ) -> Result<Uuid, RepositoryError> {
        Ok(Uuid::new_v4())
    }
}

#[derive(Default)]
struct StubOrderRepo;

#[async_trait]
impl OrderRepository for StubOrderRepo {
    async fn find_by_external(
        &self,
        _platform_id: Uuid,
        _external_id: &str,
    ) -> Result<Option<Uuid>, RepositoryError> {
        Ok(None)
    }

    async fn create(
        &self,
        _platform_id: Uuid,
        _customer_id: Option<Uuid>,
        _order: &CanonicalOrder,
    ) -> Result<Uuid, RepositoryError> {
        Ok(Uuid::new_v4())
    }
}

#[derive(Default)]
struct CountingNotifier {
    signals: AtomicI64,
}

#[async_trait]
impl MetricsNotifier for CountingNotifier {
    async fn recalculate(&self, _platform_id: Uuid, _date: NaiveDate) -> anyhow::Result<()> {
        self.signals.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// 永远失败的处理器，用于重试与耗尽路径
struct AlwaysFailingHandler;

impl EventHandler for AlwaysFailingHandler {
    fn translate(&self, _payload: &serde_json::Value) -> Result<
        crate::domain::models::canonical::CanonicalFragment,
        HandlerError,
    > {
        Err(HandlerError::MalformedPayload("always fails".to_string()))
    }
}

struct Fixture {
    queue: Arc<RecordingQueue>,
    notifier: Arc<CountingNotifier>,
    worker: EventWorker,
    platform_id: Uuid,
}

fn fixture(platform: Option<Platform>, registry: HandlerRegistry) -> Fixture {
    let platform_id = platform.as_ref().map(|p| p.id).unwrap_or_else(Uuid::new_v4);
    let queue = Arc::new(RecordingQueue::default());
    let notifier = Arc::new(CountingNotifier::default());
    let persistence = Arc::new(PersistenceService::new(
        Arc::new(StubCustomerRepo),
        Arc::new(StubAffiliateRepo),
        Arc::new(StubSubscriptionRepo),
        Arc::new(StubTransactionRepo::default()),
        Arc::new(StubProductRepo),
        Arc::new(StubOrderRepo),
    ));
    let retry_policy = RetryPolicy {
        enable_jitter: false,
        ..RetryPolicy::standard()
    };
    let worker = EventWorker::new(
        queue.clone(),
        Arc::new(registry),
        persistence,
        Arc::new(StubPlatformRepo { platform }),
        notifier.clone(),
        retry_policy,
        50,
        Duration::from_secs(5),
        4,
    );
    Fixture {
        queue,
        notifier,
        worker,
        platform_id,
    }
}

fn stripe_platform() -> Platform {
    Platform {
        id: Uuid::new_v4(),
        name: "Stripe".to_string(),
        slug: "stripe".to_string(),
        enabled: true,
        webhook_only: false,
        base_currency: "USD".to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn charge_event(platform_id: Uuid) -> WebhookEvent {
    WebhookEvent::new(
        platform_id,
        "evt_1".to_string(),
        "charge.succeeded".to_string(),
        json!({
            "type": "charge.succeeded",
            "data": {"object": {
                "id": "ch_1",
                "customer": "cus_1",
                "amount": 2990,
                "currency": "usd",
                "status": "succeeded",
                "paid": true
            }}
        }),
        "sig".to_string(),
    )
}

#[tokio::test]
async fn test_successful_event_is_completed_and_signals_metrics() {
    let platform = stripe_platform();
    let f = fixture(Some(platform.clone()), HandlerRegistry::with_builtin_handlers());

    f.worker.process_event(charge_event(platform.id)).await.unwrap();

    let completed = f.queue.completed.lock().unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].status, WebhookEventStatus::Processed);
    assert_eq!(f.notifier.signals.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_synthetic_event_bypasses_registry() {
    let platform = stripe_platform();
    // 原生charge.succeeded被替换为必败处理器，合成事件不应受影响
    let mut registry = HandlerRegistry::with_builtin_handlers();
    registry.register("stripe", "customer.created", Arc::new(AlwaysFailingHandler));
    let f = fixture(Some(platform.clone()), registry);

    let event = WebhookEvent::synthetic(
        platform.id,
        "customer.created".to_string(),
        json!({
            "customer": {
                "external_id": "cus_sync_1",
                "name": null, "email": null, "document": null, "phone": null,
                "street": null, "city": null, "state": null, "country": null,
                "postal_code": null, "created_at": null, "metadata": null
            },
            "affiliate": null,
            "subscription": null,
            "transaction": null,
            "order": null
        }),
    );
    f.worker.process_event(event).await.unwrap();

    assert_eq!(f.queue.completed.lock().unwrap().len(), 1);
    assert!(f.queue.failed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_failing_handler_reschedules_with_backoff() {
    let platform = stripe_platform();
    let mut registry = HandlerRegistry::with_builtin_handlers();
    registry.register("stripe", "charge.succeeded", Arc::new(AlwaysFailingHandler));
    let f = fixture(Some(platform.clone()), registry);

    let before = Utc::now();
    f.worker.process_event(charge_event(platform.id)).await.unwrap();

    let rescheduled = f.queue.rescheduled.lock().unwrap();
    assert_eq!(rescheduled.len(), 1);
    let (event, message, next_retry_at) = &rescheduled[0];
    assert_eq!(event.retry_count, 1);
    assert!(message.contains("always fails"));
    // 首次失败按 base * 2^1 = 60s 退避
    let delay = (*next_retry_at - before).num_seconds();
    assert!((55..=65).contains(&delay), "unexpected delay {delay}s");
    assert!(f.queue.failed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_exhausted_retries_fail_terminally() {
    let platform = stripe_platform();
    let mut registry = HandlerRegistry::with_builtin_handlers();
    registry.register("stripe", "charge.succeeded", Arc::new(AlwaysFailingHandler));
    let f = fixture(Some(platform.clone()), registry);

    let mut event = charge_event(platform.id);
    event.retry_count = event.max_retries;
    f.worker.process_event(event).await.unwrap();

    assert!(f.queue.rescheduled.lock().unwrap().is_empty());
    let failed = f.queue.failed.lock().unwrap();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].1.contains("retries exhausted"));
}

#[tokio::test]
async fn test_retry_budget_comes_from_the_event_row() {
    let platform = stripe_platform();
    let mut registry = HandlerRegistry::with_builtin_handlers();
    registry.register("stripe", "charge.succeeded", Arc::new(AlwaysFailingHandler));
    let f = fixture(Some(platform.clone()), registry);

    // 事件行自带的预算大于默认值，第7次失败仍应重排而非终态
    let mut event = charge_event(platform.id);
    event.max_retries = 8;
    event.retry_count = 6;
    f.worker.process_event(event).await.unwrap();

    assert_eq!(f.queue.rescheduled.lock().unwrap().len(), 1);
    assert!(f.queue.failed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unmapped_event_type_is_fatal() {
    let platform = stripe_platform();
    let f = fixture(Some(platform.clone()), HandlerRegistry::with_builtin_handlers());

    let mut event = charge_event(platform.id);
    event.event_type = "payout.created".to_string();
    f.worker.process_event(event).await.unwrap();

    assert!(f.queue.rescheduled.lock().unwrap().is_empty());
    let failed = f.queue.failed.lock().unwrap();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].1.contains("no handler registered"));
}

#[tokio::test]
async fn test_missing_platform_is_fatal() {
    let f = fixture(None, HandlerRegistry::with_builtin_handlers());

    f.worker.process_event(charge_event(f.platform_id)).await.unwrap();

    assert!(f.queue.rescheduled.lock().unwrap().is_empty());
    let failed = f.queue.failed.lock().unwrap();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].1.contains("not found"));
}
