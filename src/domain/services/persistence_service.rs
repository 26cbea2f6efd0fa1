// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 规范化持久化例程
//!
//! 按固定顺序落库：客户 → 联盟伙伴 → 订阅 → 交易 → 副作用 → 订单。
//! 顺序不可调换，后面的步骤依赖前面产出的内部ID。
//! 各步骤之间没有跨步事务，幂等性靠 (platform_id, external_id)
//! 唯一键upsert保证；同一片段重放不会重复计收入。

use crate::domain::models::affiliate::AffiliateTier;
use crate::domain::models::canonical::CanonicalFragment;
use crate::domain::repositories::affiliate_repository::{AffiliateRecord, AffiliateRepository};
use crate::domain::repositories::customer_repository::{CustomerRecord, CustomerRepository};
use crate::domain::repositories::order_repository::OrderRepository;
use crate::domain::repositories::product_repository::ProductRepository;
use crate::domain::repositories::subscription_repository::{
    SubscriptionRecord, SubscriptionRepository,
};
use crate::domain::repositories::transaction_repository::TransactionRepository;
use crate::domain::repositories::webhook_event_repository::RepositoryError;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// 一次持久化调用的结果摘要
#[derive(Debug, Default)]
pub struct PersistenceOutcome {
    /// 解析出的内部客户ID
    pub customer_id: Option<Uuid>,
    /// 本次是否插入了交易
    pub transaction_inserted: bool,
    /// 交易因重复投递被压制
    pub duplicate_transaction: bool,
}

pub struct PersistenceService {
    customer_repo: Arc<dyn CustomerRepository>,
    affiliate_repo: Arc<dyn AffiliateRepository>,
    subscription_repo: Arc<dyn SubscriptionRepository>,
    transaction_repo: Arc<dyn TransactionRepository>,
    product_repo: Arc<dyn ProductRepository>,
    order_repo: Arc<dyn OrderRepository>,
}

impl PersistenceService {
    pub fn new(
        customer_repo: Arc<dyn CustomerRepository>,
        affiliate_repo: Arc<dyn AffiliateRepository>,
        subscription_repo: Arc<dyn SubscriptionRepository>,
        transaction_repo: Arc<dyn TransactionRepository>,
        product_repo: Arc<dyn ProductRepository>,
        order_repo: Arc<dyn OrderRepository>,
    ) -> Self {
        Self {
            customer_repo,
            affiliate_repo,
            subscription_repo,
            transaction_repo,
            product_repo,
            order_repo,
        }
    }

    /// 持久化一个规范化片段
    pub async fn persist(
        &self,
        platform_id: Uuid,
        fragment: &CanonicalFragment,
    ) -> Result<PersistenceOutcome, RepositoryError> {
        let mut outcome = PersistenceOutcome::default();

        // 1. 客户：没有可用外部ID时整体跳过，这是定义好的no-op
        let customer = self.persist_customer(platform_id, fragment).await?;
        outcome.customer_id = customer.as_ref().map(|c| c.id);

        // 2. 联盟伙伴：归因是尽力而为的，失败不阻断后续步骤
        let affiliate = self.persist_affiliate(platform_id, fragment).await;

        // 3. 订阅：需要已解析的客户，懒创建产品
        let subscription = match (&fragment.subscription, &customer) {
            (Some(sub), Some(cust)) => {
                let product_id = self.resolve_product(platform_id, fragment).await?;
                Some(
                    self.subscription_repo
                        .upsert(platform_id, cust.id, product_id, sub)
                        .await?,
                )
            }
            (Some(sub), None) => {
                warn!(
                    external_id = %sub.external_id,
                    "Subscription fragment without resolvable customer, skipping"
                );
                None
            }
            _ => None,
        };

        // 4+5. 交易与副作用
        self.persist_transaction(platform_id, fragment, &customer, &affiliate, &subscription, &mut outcome)
            .await?;

        // 6. 订单：仅在片段带订单数据且尚无既有订单时创建
        if let Some(order) = &fragment.order {
            let existing = self
                .order_repo
                .find_by_external(platform_id, &order.external_id)
                .await?;
            if existing.is_none() {
                self.order_repo
                    .create(platform_id, outcome.customer_id, order)
                    .await?;
            }
        }

        Ok(outcome)
    }

    async fn persist_customer(
        &self,
        platform_id: Uuid,
        fragment: &CanonicalFragment,
    ) -> Result<Option<CustomerRecord>, RepositoryError> {
        match (fragment.external_customer_id(), &fragment.customer) {
            (Some(_), Some(customer)) => Ok(Some(
                self.customer_repo.upsert(platform_id, customer).await?,
            )),
            _ => Ok(None),
        }
    }

    async fn persist_affiliate(
        &self,
        platform_id: Uuid,
        fragment: &CanonicalFragment,
    ) -> Option<AffiliateRecord> {
        let affiliate = fragment.affiliate.as_ref()?;
        if affiliate.external_id.is_empty() {
            return None;
        }
        match self.affiliate_repo.upsert(platform_id, affiliate).await {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(
                    external_id = %affiliate.external_id,
                    error = %e,
                    "Affiliate upsert failed, attribution skipped"
                );
                None
            }
        }
    }

    async fn resolve_product(
        &self,
        platform_id: Uuid,
        fragment: &CanonicalFragment,
    ) -> Result<Option<Uuid>, RepositoryError> {
        let sub = match &fragment.subscription {
            Some(sub) => sub,
            None => return Ok(None),
        };
        let external_id = match &sub.external_product_id {
            Some(id) if !id.is_empty() => id,
            _ => return Ok(None),
        };
        let name = sub.product_name.as_deref().unwrap_or(external_id);
        let id = self
            .product_repo
            .find_or_create(platform_id, external_id, name)
            .await?;
        Ok(Some(id))
    }

    async fn persist_transaction(
        &self,
        platform_id: Uuid,
        fragment: &CanonicalFragment,
        customer: &Option<CustomerRecord>,
        affiliate: &Option<AffiliateRecord>,
        subscription: &Option<SubscriptionRecord>,
        outcome: &mut PersistenceOutcome,
    ) -> Result<(), RepositoryError> {
        let transaction = match &fragment.transaction {
            Some(txn) => txn,
            None => return Ok(()),
        };
        let customer = match customer {
            Some(c) => c,
            None => {
                warn!(
                    external_id = %transaction.external_id,
                    "Transaction fragment without resolvable customer, skipping"
                );
                return Ok(());
            }
        };

        // 重复投递压制：同一平台下相同外部交易ID只落一次
        if !transaction.external_id.is_empty() {
            if let Some(existing) = self
                .transaction_repo
                .find_by_external(platform_id, &transaction.external_id)
                .await?
            {
                debug!(
                    external_id = %transaction.external_id,
                    transaction_id = %existing.id,
                    "Duplicate transaction delivery suppressed"
                );
                outcome.duplicate_transaction = true;
                return Ok(());
            }
        }

        let order_id = match &fragment.order {
            Some(order) => {
                self.order_repo
                    .find_by_external(platform_id, &order.external_id)
                    .await?
            }
            None => None,
        };

        let record = self
            .transaction_repo
            .insert(platform_id, customer.id, order_id, transaction)
            .await?;
        outcome.transaction_inserted = true;

        // 分摊关联：优先用本次upsert的订阅，否则按外部订阅ID解析
        let linked_subscription = match subscription {
            Some(sub) => Some(sub.id),
            None => match &transaction.external_subscription_id {
                Some(ext) if !ext.is_empty() => self
                    .subscription_repo
                    .find_by_external(platform_id, ext)
                    .await?
                    .map(|s| s.id),
                _ => None,
            },
        };
        if let Some(subscription_id) = linked_subscription {
            self.transaction_repo
                .link_subscription(record.id, subscription_id)
                .await?;
        }

        // 副作用只计成功且非退款的交易
        if transaction.counts_as_revenue() {
            self.customer_repo
                .increment_lifetime_spend(customer.id, transaction.amount)
                .await?;

            if let Some(affiliate) = affiliate {
                let total_sales = affiliate.total_sales + 1;
                let total_revenue = affiliate.total_revenue + transaction.amount;
                let tier = AffiliateTier::from_revenue(total_revenue);
                if let Err(e) = self
                    .affiliate_repo
                    .update_performance(affiliate.id, total_sales, total_revenue, tier)
                    .await
                {
                    warn!(
                        affiliate_id = %affiliate.id,
                        error = %e,
                        "Affiliate performance update failed"
                    );
                }
            }
        }

        Ok(())
    }
}
