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

//! 对账调度器
//!
//! 按固定周期（默认6小时）以及HTTP触发的按需命令，对每个启用且
//! 非webhook-only的平台拉取最近24小时的平台侧状态，与本地比对：
//! 本地缺失的记录合成补录事件送回事件管道，存在但漂移的记录做
//! 字段级修正。单条记录的失败被隔离计数，整批失败才让对账日志
//! 收尾为failed，并放弃该平台剩余的对账类型。

use crate::domain::models::canonical::{
    CanonicalCustomer, CanonicalFragment, CanonicalSubscription, CanonicalTransaction,
    SubscriptionStatus,
};
use crate::domain::models::platform::Platform;
use crate::domain::models::sync_log::{SyncLog, SyncType};
use crate::domain::models::webhook_event::WebhookEvent;
use crate::domain::repositories::customer_repository::CustomerRepository;
use crate::domain::repositories::platform_repository::PlatformRepository;
use crate::domain::repositories::subscription_repository::SubscriptionRepository;
use crate::domain::repositories::sync_log_repository::SyncLogRepository;
use crate::domain::repositories::transaction_repository::TransactionRepository;
use crate::providers::adapter::{FetchParams, ProviderAdapter};
use crate::providers::resolver::ProviderResolver;
use crate::queue::event_queue::EventQueue;
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// 按需对账命令
#[derive(Debug)]
pub enum SyncCommand {
    /// 对所有启用平台执行一轮对账
    All,
    /// 只对指定slug的平台执行对账
    Platform(String),
}

pub struct SyncWorker {
    platform_repo: Arc<dyn PlatformRepository>,
    resolver: Arc<ProviderResolver>,
    queue: Arc<dyn EventQueue>,
    sync_log_repo: Arc<dyn SyncLogRepository>,
    customer_repo: Arc<dyn CustomerRepository>,
    subscription_repo: Arc<dyn SubscriptionRepository>,
    transaction_repo: Arc<dyn TransactionRepository>,
    interval: Duration,
    page_size: u32,
    missing_threshold: i32,
}

impl SyncWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        platform_repo: Arc<dyn PlatformRepository>,
        resolver: Arc<ProviderResolver>,
        queue: Arc<dyn EventQueue>,
        sync_log_repo: Arc<dyn SyncLogRepository>,
        customer_repo: Arc<dyn CustomerRepository>,
        subscription_repo: Arc<dyn SubscriptionRepository>,
        transaction_repo: Arc<dyn TransactionRepository>,
        interval: Duration,
        page_size: u32,
        missing_threshold: i32,
    ) -> Self {
        Self {
            platform_repo,
            resolver,
            queue,
            sync_log_repo,
            customer_repo,
            subscription_repo,
            transaction_repo,
            interval,
            page_size,
            missing_threshold,
        }
    }

    /// 运行对账循环：周期触发与按需触发共用同一条执行路径
    pub async fn run(&self, mut trigger: mpsc::Receiver<SyncCommand>) {
        info!("Sync worker started, interval {:?}", self.interval);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sync_all().await;
                }
                Some(command) = trigger.recv() => match command {
                    SyncCommand::All => self.sync_all().await,
                    SyncCommand::Platform(slug) => {
                        if let Err(e) = self.sync_platform_by_slug(&slug).await {
                            error!(slug = %slug, error = %e, "On-demand sync failed");
                        }
                    }
                },
            }
        }
    }

    /// 对所有启用平台执行一轮对账，平台之间互不影响
    pub async fn sync_all(&self) {
        let platforms = match self.platform_repo.list_enabled().await {
            Ok(platforms) => platforms,
            Err(e) => {
                error!("Failed to list platforms for sync: {}", e);
                return;
            }
        };

        for platform in platforms {
            if let Err(e) = self.sync_platform(&platform).await {
                error!(slug = %platform.slug, error = %e, "Platform sync aborted");
            }
        }
    }

    async fn sync_platform_by_slug(&self, slug: &str) -> anyhow::Result<()> {
        let platform = self
            .platform_repo
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| anyhow::anyhow!("platform '{slug}' not found"))?;
        self.sync_platform(&platform).await
    }

    /// 对单个平台执行全部对账类型
    ///
    /// webhook-only平台完全跳过：不构造适配器，也不写对账日志。
    pub async fn sync_platform(&self, platform: &Platform) -> anyhow::Result<()> {
        if platform.webhook_only {
            debug!(slug = %platform.slug, "Platform is webhook-only, skipping sync");
            return Ok(());
        }
        let adapter = self.resolver.resolve(platform).await?;
        self.sync_platform_with_adapter(platform, adapter).await
    }

    /// 以给定适配器执行全部对账类型，批级失败放弃剩余类型
    pub async fn sync_platform_with_adapter(
        &self,
        platform: &Platform,
        adapter: Arc<dyn ProviderAdapter>,
    ) -> anyhow::Result<()> {
        info!(slug = %platform.slug, "Starting platform sync");
        for sync_type in SyncType::ALL {
            self.sync_one(platform, adapter.as_ref(), sync_type).await?;
        }
        Ok(())
    }

    async fn sync_one(
        &self,
        platform: &Platform,
        adapter: &dyn ProviderAdapter,
        sync_type: SyncType,
    ) -> anyhow::Result<()> {
        let mut log = self
            .sync_log_repo
            .create(&SyncLog::start(platform.id, sync_type))
            .await?;
        counter!("paysync_sync_runs_total", "sync_type" => sync_type.to_string()).increment(1);

        let result = match sync_type {
            SyncType::Subscriptions => {
                self.reconcile_subscriptions(platform, adapter, &mut log).await
            }
            SyncType::Transactions => {
                self.reconcile_transactions(platform, adapter, &mut log).await
            }
            SyncType::Customers => self.reconcile_customers(platform, adapter, &mut log).await,
        };

        match &result {
            Ok(()) => {
                if log.missing_records_found > self.missing_threshold {
                    counter!("paysync_sync_missing_alerts_total").increment(1);
                    warn!(
                        slug = %platform.slug,
                        sync_type = %sync_type,
                        missing = log.missing_records_found,
                        threshold = self.missing_threshold,
                        "Missing records exceed threshold"
                    );
                }
                log.complete();
                info!(
                    slug = %platform.slug,
                    sync_type = %sync_type,
                    synced = log.records_synced,
                    missing = log.missing_records_found,
                    failed = log.records_failed,
                    "Sync batch completed"
                );
            }
            Err(e) => {
                log.fail(e.to_string());
                error!(slug = %platform.slug, sync_type = %sync_type, error = %e, "Sync batch failed");
            }
        }
        self.sync_log_repo.update(&log).await?;
        result
    }

    async fn reconcile_subscriptions(
        &self,
        platform: &Platform,
        adapter: &dyn ProviderAdapter,
        log: &mut SyncLog,
    ) -> anyhow::Result<()> {
        let mut params = FetchParams::last_day(self.page_size);
        loop {
            let page = adapter.fetch_subscriptions(&params).await?;
            for record in &page.records {
                if record.external_id.is_empty() {
                    continue;
                }
                if let Err(e) = self.reconcile_subscription(platform, record, log).await {
                    log.records_failed += 1;
                    warn!(
                        slug = %platform.slug,
                        external_id = %record.external_id,
                        error = %e,
                        "Subscription reconciliation failed for record"
                    );
                }
            }
            match page.next_cursor {
                Some(cursor) => params = params.with_cursor(Some(cursor)),
                None => return Ok(()),
            }
        }
    }

    async fn reconcile_subscription(
        &self,
        platform: &Platform,
        record: &CanonicalSubscription,
        log: &mut SyncLog,
    ) -> anyhow::Result<()> {
        match self
            .subscription_repo
            .find_by_external(platform.id, &record.external_id)
            .await?
        {
            None => {
                let fragment = CanonicalFragment {
                    customer: stub_customer(&record.external_customer_id),
                    subscription: Some(record.clone()),
                    ..Default::default()
                };
                self.enqueue_synthetic(platform, "subscription.created", &fragment)
                    .await?;
                log.missing_records_found += 1;
            }
            Some(existing) => {
                let trial_active = record.status == SubscriptionStatus::TrialActive;
                let drifted = existing.status != record.status
                    || existing.trial_active != trial_active
                    || existing.amount != record.amount
                    || existing.current_period_end != record.current_period_end;
                if drifted {
                    self.subscription_repo
                        .update_drift(
                            existing.id,
                            record.status,
                            record.amount,
                            record.current_period_end,
                        )
                        .await?;
                    log.records_synced += 1;
                }
            }
        }
        Ok(())
    }

    async fn reconcile_transactions(
        &self,
        platform: &Platform,
        adapter: &dyn ProviderAdapter,
        log: &mut SyncLog,
    ) -> anyhow::Result<()> {
        let mut params = FetchParams::last_day(self.page_size);
        loop {
            let page = adapter.fetch_transactions(&params).await?;
            for record in &page.records {
                if record.external_id.is_empty() {
                    continue;
                }
                if let Err(e) = self.reconcile_transaction(platform, record, log).await {
                    log.records_failed += 1;
                    warn!(
                        slug = %platform.slug,
                        external_id = %record.external_id,
                        error = %e,
                        "Transaction reconciliation failed for record"
                    );
                }
            }
            match page.next_cursor {
                Some(cursor) => params = params.with_cursor(Some(cursor)),
                None => return Ok(()),
            }
        }
    }

    async fn reconcile_transaction(
        &self,
        platform: &Platform,
        record: &CanonicalTransaction,
        log: &mut SyncLog,
    ) -> anyhow::Result<()> {
        match self
            .transaction_repo
            .find_by_external(platform.id, &record.external_id)
            .await?
        {
            None => {
                let fragment = CanonicalFragment {
                    customer: record
                        .external_customer_id
                        .as_deref()
                        .and_then(|id| stub_customer(id)),
                    transaction: Some(record.clone()),
                    ..Default::default()
                };
                self.enqueue_synthetic(platform, "transaction.created", &fragment)
                    .await?;
                log.missing_records_found += 1;
            }
            Some(existing) => {
                if existing.status != record.status || existing.amount != record.amount {
                    self.transaction_repo
                        .update_drift(existing.id, record.status, record.amount)
                        .await?;
                    log.records_synced += 1;
                }
            }
        }
        Ok(())
    }

    async fn reconcile_customers(
        &self,
        platform: &Platform,
        adapter: &dyn ProviderAdapter,
        log: &mut SyncLog,
    ) -> anyhow::Result<()> {
        let mut params = FetchParams::last_day(self.page_size);
        loop {
            let page = adapter.fetch_customers(&params).await?;
            for record in &page.records {
                if record.external_id.is_empty() {
                    continue;
                }
                if let Err(e) = self.reconcile_customer(platform, record, log).await {
                    log.records_failed += 1;
                    warn!(
                        slug = %platform.slug,
                        external_id = %record.external_id,
                        error = %e,
                        "Customer reconciliation failed for record"
                    );
                }
            }
            match page.next_cursor {
                Some(cursor) => params = params.with_cursor(Some(cursor)),
                None => return Ok(()),
            }
        }
    }

    async fn reconcile_customer(
        &self,
        platform: &Platform,
        record: &CanonicalCustomer,
        log: &mut SyncLog,
    ) -> anyhow::Result<()> {
        match self
            .customer_repo
            .find_by_external(platform.id, &record.external_id)
            .await?
        {
            None => {
                let fragment = CanonicalFragment {
                    customer: Some(record.clone()),
                    ..Default::default()
                };
                self.enqueue_synthetic(platform, "customer.created", &fragment)
                    .await?;
                log.missing_records_found += 1;
            }
            Some(existing) => {
                if existing.name != record.name || existing.email != record.email {
                    self.customer_repo
                        .update_contact(existing.id, record.name.clone(), record.email.clone())
                        .await?;
                    log.records_synced += 1;
                }
            }
        }
        Ok(())
    }

    async fn enqueue_synthetic(
        &self,
        platform: &Platform,
        event_type: &str,
        fragment: &CanonicalFragment,
    ) -> anyhow::Result<()> {
        let payload = serde_json::to_value(fragment)?;
        let event = WebhookEvent::synthetic(platform.id, event_type.to_string(), payload);
        self.queue.enqueue(event).await?;
        counter!("paysync_sync_synthetic_events_total").increment(1);
        Ok(())
    }
}

fn stub_customer(external_id: &str) -> Option<CanonicalCustomer> {
    if external_id.is_empty() {
        return None;
    }
    Some(CanonicalCustomer {
        external_id: external_id.to_string(),
        name: None,
        email: None,
        document: None,
        phone: None,
        street: None,
        city: None,
        state: None,
        country: None,
        postal_code: None,
        created_at: None,
        metadata: None,
    })
}

#[cfg(test)]
#[path = "sync_worker_test.rs"]
mod tests;
