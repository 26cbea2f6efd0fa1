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

use axum::Extension;
use paysyncrs::config::settings::Settings;
use paysyncrs::domain::repositories::customer_repository::CustomerRepository;
use paysyncrs::domain::repositories::platform_repository::PlatformRepository;
use paysyncrs::domain::repositories::subscription_repository::SubscriptionRepository;
use paysyncrs::domain::repositories::sync_log_repository::SyncLogRepository;
use paysyncrs::domain::repositories::transaction_repository::TransactionRepository;
use paysyncrs::domain::services::metrics_notifier::{CounterMetricsNotifier, MetricsNotifier};
use paysyncrs::domain::services::persistence_service::PersistenceService;
use paysyncrs::handlers::registry::HandlerRegistry;
use paysyncrs::infrastructure::database::connection;
use paysyncrs::infrastructure::observability::metrics::init_metrics;
use paysyncrs::infrastructure::repositories::affiliate_repo_impl::AffiliateRepositoryImpl;
use paysyncrs::infrastructure::repositories::customer_repo_impl::CustomerRepositoryImpl;
use paysyncrs::infrastructure::repositories::order_repo_impl::OrderRepositoryImpl;
use paysyncrs::infrastructure::repositories::platform_repo_impl::PlatformRepositoryImpl;
use paysyncrs::infrastructure::repositories::product_repo_impl::ProductRepositoryImpl;
use paysyncrs::infrastructure::repositories::subscription_repo_impl::SubscriptionRepositoryImpl;
use paysyncrs::infrastructure::repositories::sync_log_repo_impl::SyncLogRepositoryImpl;
use paysyncrs::infrastructure::repositories::transaction_repo_impl::TransactionRepositoryImpl;
use paysyncrs::infrastructure::repositories::webhook_event_repo_impl::WebhookEventRepositoryImpl;
use paysyncrs::presentation::routes;
use paysyncrs::providers::resolver::ProviderResolver;
use paysyncrs::queue::event_queue::{EventQueue, PostgresEventQueue};
use paysyncrs::utils::retry_policy::RetryPolicy;
use paysyncrs::utils::telemetry;
use paysyncrs::workers::event_worker::EventWorker;
use paysyncrs::workers::manager::WorkerManager;
use paysyncrs::workers::sync_worker::SyncWorker;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use migration::{Migrator, MigratorTrait};

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting paysyncrs...");

    // 2. Load configuration
    let settings = Arc::new(Settings::new()?);
    info!("Configuration loaded");

    // Initialize Prometheus Metrics
    init_metrics(settings.metrics.listen_addr.parse()?);

    // 3. Connect to database
    let db = connection::create_pool(&settings.database).await?;
    let db = Arc::new(db);
    info!("Database connection established");

    // Run database migrations
    info!("Running database migrations...");
    Migrator::up(db.as_ref(), None).await?;
    info!("Database migrations applied");

    // 4. Initialize repositories
    let platform_repo: Arc<dyn PlatformRepository> =
        Arc::new(PlatformRepositoryImpl::new(db.clone()));
    let event_repo = Arc::new(WebhookEventRepositoryImpl::new(db.clone()));
    let sync_log_repo: Arc<dyn SyncLogRepository> =
        Arc::new(SyncLogRepositoryImpl::new(db.clone()));
    let customer_repo: Arc<dyn CustomerRepository> =
        Arc::new(CustomerRepositoryImpl::new(db.clone()));
    let subscription_repo: Arc<dyn SubscriptionRepository> =
        Arc::new(SubscriptionRepositoryImpl::new(db.clone()));
    let transaction_repo: Arc<dyn TransactionRepository> =
        Arc::new(TransactionRepositoryImpl::new(db.clone()));
    let affiliate_repo = Arc::new(AffiliateRepositoryImpl::new(db.clone()));
    let product_repo = Arc::new(ProductRepositoryImpl::new(db.clone()));
    let order_repo = Arc::new(OrderRepositoryImpl::new(db.clone()));

    // 5. Initialize queue and services
    let queue: Arc<dyn EventQueue> = Arc::new(PostgresEventQueue::new(
        event_repo.clone(),
        settings.retry.max_retries as i32,
    ));
    let registry = Arc::new(HandlerRegistry::with_builtin_handlers());
    let persistence = Arc::new(PersistenceService::new(
        customer_repo.clone(),
        affiliate_repo.clone(),
        subscription_repo.clone(),
        transaction_repo.clone(),
        product_repo.clone(),
        order_repo.clone(),
    ));
    let notifier: Arc<dyn MetricsNotifier> = Arc::new(CounterMetricsNotifier);
    let resolver = Arc::new(ProviderResolver::new(platform_repo.clone()));

    let retry_policy = RetryPolicy {
        base_delay: Duration::from_secs(settings.retry.base_delay_secs),
        cap_delay: Duration::from_secs(settings.retry.cap_delay_secs),
        ..RetryPolicy::standard()
    };

    // 6. Start workers
    let event_worker = EventWorker::new(
        queue.clone(),
        registry,
        persistence,
        platform_repo.clone(),
        notifier,
        retry_policy,
        settings.workers.event_batch_size,
        Duration::from_secs(settings.workers.poll_interval_secs),
        settings.workers.event_concurrency,
    );

    let sync_worker = Arc::new(SyncWorker::new(
        platform_repo.clone(),
        resolver,
        queue.clone(),
        sync_log_repo.clone(),
        customer_repo.clone(),
        subscription_repo.clone(),
        transaction_repo.clone(),
        Duration::from_secs(settings.sync.interval_hours * 3600),
        settings.sync.page_size,
        settings.sync.missing_threshold,
    ));

    let mut worker_manager = WorkerManager::new(event_worker, sync_worker);
    let sync_trigger = worker_manager.sync_trigger();
    worker_manager
        .start_workers(settings.workers.event_worker_count)
        .await;

    // 7. Start HTTP server
    let app = routes::routes()
        .layer(Extension(platform_repo))
        .layer(Extension(queue))
        .layer(Extension(sync_log_repo))
        .layer(Extension(sync_trigger))
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Unable to listen for shutdown signal: {}", err);
            }
            info!("Shutdown signal received");
        })
        .await?;

    worker_manager.shutdown();

    Ok(())
}
