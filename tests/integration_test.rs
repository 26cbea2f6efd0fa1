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

//! 仓库与持久化例程的集成测试
//!
//! 基于内存SQLite跑真实迁移与真实仓库实现，验证入队去重、
//! 规范化片段落库和重试调度在真实SQL路径上的行为。

use chrono::{Duration, Utc};
use migration::{Migrator, MigratorTrait};
use paysyncrs::domain::models::affiliate::AffiliateTier;
use paysyncrs::domain::models::canonical::{
    BillingPeriod, CanonicalAffiliate, CanonicalCustomer, CanonicalFragment, CanonicalOrder,
    CanonicalSubscription, CanonicalTransaction, PaymentMethod, SubscriptionStatus,
    TransactionStatus, TransactionType,
};
use paysyncrs::domain::models::webhook_event::{WebhookEvent, WebhookEventStatus};
use paysyncrs::domain::repositories::affiliate_repository::AffiliateRepository;
use paysyncrs::domain::repositories::customer_repository::CustomerRepository;
use paysyncrs::domain::repositories::order_repository::OrderRepository;
use paysyncrs::domain::repositories::subscription_repository::SubscriptionRepository;
use paysyncrs::domain::repositories::transaction_repository::TransactionRepository;
use paysyncrs::domain::services::persistence_service::PersistenceService;
use paysyncrs::infrastructure::database::entities::platform as platform_entity;
use paysyncrs::infrastructure::repositories::affiliate_repo_impl::AffiliateRepositoryImpl;
use paysyncrs::infrastructure::repositories::customer_repo_impl::CustomerRepositoryImpl;
use paysyncrs::infrastructure::repositories::order_repo_impl::OrderRepositoryImpl;
use paysyncrs::infrastructure::repositories::product_repo_impl::ProductRepositoryImpl;
use paysyncrs::infrastructure::repositories::subscription_repo_impl::SubscriptionRepositoryImpl;
use paysyncrs::infrastructure::repositories::transaction_repo_impl::TransactionRepositoryImpl;
use paysyncrs::infrastructure::repositories::webhook_event_repo_impl::WebhookEventRepositoryImpl;
use paysyncrs::queue::event_queue::{EnqueueOutcome, EventQueue, PostgresEventQueue};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

async fn setup_db() -> Arc<DatabaseConnection> {
    // A pooled in-memory sqlite gives every connection its own database,
    // so the pool is pinned to a single connection.
    let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
    opt.max_connections(1);
    let db = Database::connect(opt).await.expect("in-memory sqlite");
    Migrator::up(&db, None).await.expect("migrations");
    Arc::new(db)
}

async fn seed_platform(db: &DatabaseConnection) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now();
    platform_entity::ActiveModel {
        id: Set(id),
        name: Set("Stripe".to_string()),
        slug: Set("stripe".to_string()),
        enabled: Set(true),
        webhook_only: Set(false),
        base_currency: Set("USD".to_string()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(db)
    .await
    .expect("seed platform");
    id
}

fn sample_fragment() -> CanonicalFragment {
    CanonicalFragment {
        customer: Some(CanonicalCustomer {
            external_id: "cus_1".to_string(),
            name: Some("Ana Souza".to_string()),
            email: Some("ana@example.com".to_string()),
            document: None,
            phone: None,
            street: None,
            city: None,
            state: None,
            country: Some("BR".to_string()),
            postal_code: None,
            created_at: None,
            metadata: None,
        }),
        affiliate: Some(CanonicalAffiliate {
            external_id: "aff_1".to_string(),
            name: Some("Parceiro".to_string()),
            email: None,
        }),
        subscription: Some(CanonicalSubscription {
            external_id: "sub_1".to_string(),
            external_customer_id: "cus_1".to_string(),
            external_product_id: Some("prod_1".to_string()),
            external_price_id: None,
            product_name: Some("Pro Plan".to_string()),
            status: SubscriptionStatus::Active,
            trial_start: None,
            trial_end: None,
            amount: 4_990,
            currency: "USD".to_string(),
            billing_period: BillingPeriod::Month,
            billing_interval: 1,
            started_at: Some(Utc::now()),
            current_period_start: None,
            current_period_end: Some(Utc::now() + Duration::days(30)),
            next_billing_at: None,
            canceled_at: None,
            metadata: None,
        }),
        transaction: Some(CanonicalTransaction {
            external_id: "txn_1".to_string(),
            external_customer_id: Some("cus_1".to_string()),
            external_subscription_id: Some("sub_1".to_string()),
            external_invoice_id: None,
            txn_type: TransactionType::SubscriptionPayment,
            status: TransactionStatus::Succeeded,
            amount: 4_990,
            currency: "USD".to_string(),
            payment_method: PaymentMethod::CreditCard,
            created_at: Some(Utc::now()),
            paid_at: Some(Utc::now()),
            refunded_at: None,
        }),
        order: Some(CanonicalOrder {
            external_id: "order_1".to_string(),
            total_amount: 4_990,
            currency: "USD".to_string(),
            status: Some("paid".to_string()),
        }),
    }
}

fn persistence_service(db: Arc<DatabaseConnection>) -> PersistenceService {
    PersistenceService::new(
        Arc::new(CustomerRepositoryImpl::new(db.clone())),
        Arc::new(AffiliateRepositoryImpl::new(db.clone())),
        Arc::new(SubscriptionRepositoryImpl::new(db.clone())),
        Arc::new(TransactionRepositoryImpl::new(db.clone())),
        Arc::new(ProductRepositoryImpl::new(db.clone())),
        Arc::new(OrderRepositoryImpl::new(db)),
    )
}

#[tokio::test]
async fn test_event_queue_dedup_and_lifecycle() {
    let db = setup_db().await;
    let platform_id = seed_platform(db.as_ref()).await;

    let repo = Arc::new(WebhookEventRepositoryImpl::new(db.clone()));
    let queue = PostgresEventQueue::new(repo, 5);

    let event = WebhookEvent::new(
        platform_id,
        "evt_1".to_string(),
        "charge.succeeded".to_string(),
        json!({"id": "evt_1", "type": "charge.succeeded"}),
        "sig".to_string(),
    );

    let first = queue.enqueue(event.clone()).await.unwrap();
    assert!(matches!(first, EnqueueOutcome::Created(_)));

    let redelivery = WebhookEvent::new(
        platform_id,
        "evt_1".to_string(),
        "charge.succeeded".to_string(),
        json!({"id": "evt_1", "type": "charge.succeeded"}),
        "sig".to_string(),
    );
    let second = queue.enqueue(redelivery).await.unwrap();
    assert!(matches!(second, EnqueueOutcome::Duplicate(_)));

    let claimed = queue.claim_due(10).await.unwrap();
    assert_eq!(claimed.len(), 1);
    assert_eq!(claimed[0].status, WebhookEventStatus::Processing);

    // Processing events are not claimable again
    assert!(queue.claim_due(10).await.unwrap().is_empty());

    let completed = queue.complete(claimed.into_iter().next().unwrap()).await.unwrap();
    assert_eq!(completed.status, WebhookEventStatus::Processed);
    assert!(completed.processed_at.is_some());
}

#[tokio::test]
async fn test_rescheduled_event_not_due_until_retry_time() {
    let db = setup_db().await;
    let platform_id = seed_platform(db.as_ref()).await;

    let repo = Arc::new(WebhookEventRepositoryImpl::new(db.clone()));
    let queue = PostgresEventQueue::new(repo, 5);

    let event = WebhookEvent::new(
        platform_id,
        "evt_retry".to_string(),
        "charge.failed".to_string(),
        json!({"id": "evt_retry"}),
        "sig".to_string(),
    );
    queue.enqueue(event).await.unwrap();

    let claimed = queue.claim_due(10).await.unwrap().remove(0);
    let rescheduled = queue
        .reschedule(
            claimed,
            "upstream timeout".to_string(),
            Utc::now() + Duration::minutes(5),
        )
        .await
        .unwrap();

    assert_eq!(rescheduled.status, WebhookEventStatus::Pending);
    assert_eq!(rescheduled.retry_count, 1);
    assert_eq!(
        rescheduled.error_message.as_deref(),
        Some("upstream timeout")
    );

    // next_retry_at is in the future, so nothing is due yet
    assert!(queue.claim_due(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_persist_fragment_end_to_end() {
    let db = setup_db().await;
    let platform_id = seed_platform(db.as_ref()).await;
    let service = persistence_service(db.clone());

    let outcome = service
        .persist(platform_id, &sample_fragment())
        .await
        .unwrap();
    assert!(outcome.transaction_inserted);
    assert!(!outcome.duplicate_transaction);
    let customer_id = outcome.customer_id.expect("customer persisted");

    let customer_repo = CustomerRepositoryImpl::new(db.clone());
    let customer = customer_repo
        .find_by_external(platform_id, "cus_1")
        .await
        .unwrap()
        .expect("customer row");
    assert_eq!(customer.id, customer_id);
    assert_eq!(customer.lifetime_spend, 4_990);

    let subscription_repo = SubscriptionRepositoryImpl::new(db.clone());
    let subscription = subscription_repo
        .find_by_external(platform_id, "sub_1")
        .await
        .unwrap()
        .expect("subscription row");
    assert_eq!(subscription.customer_id, customer_id);
    assert_eq!(subscription.status, SubscriptionStatus::Active);
    assert_eq!(subscription.amount, 4_990);

    let transaction_repo = TransactionRepositoryImpl::new(db.clone());
    let transaction = transaction_repo
        .find_by_external(platform_id, "txn_1")
        .await
        .unwrap()
        .expect("transaction row");
    assert_eq!(transaction.status, TransactionStatus::Succeeded);

    let affiliate_repo = AffiliateRepositoryImpl::new(db.clone());
    let affiliate = affiliate_repo
        .upsert(
            platform_id,
            &CanonicalAffiliate {
                external_id: "aff_1".to_string(),
                name: Some("Parceiro".to_string()),
                email: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(affiliate.total_sales, 1);
    assert_eq!(affiliate.total_revenue, 4_990);
    assert_eq!(affiliate.tier, AffiliateTier::Bronze);

    let order_repo = OrderRepositoryImpl::new(db.clone());
    let order_id = order_repo
        .find_by_external(platform_id, "order_1")
        .await
        .unwrap();
    assert!(order_id.is_some());
}

#[tokio::test]
async fn test_duplicate_transaction_suppressed_on_redelivery() {
    let db = setup_db().await;
    let platform_id = seed_platform(db.as_ref()).await;
    let service = persistence_service(db.clone());

    let fragment = sample_fragment();
    service.persist(platform_id, &fragment).await.unwrap();
    let second = service.persist(platform_id, &fragment).await.unwrap();

    assert!(!second.transaction_inserted);
    assert!(second.duplicate_transaction);

    // Side effects must not double-count
    let customer_repo = CustomerRepositoryImpl::new(db.clone());
    let customer = customer_repo
        .find_by_external(platform_id, "cus_1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(customer.lifetime_spend, 4_990);
}
