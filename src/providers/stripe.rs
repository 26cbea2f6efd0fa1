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

use crate::domain::models::canonical::{
    BillingPeriod, CanonicalCustomer, CanonicalSubscription, CanonicalTransaction, PaymentMethod,
    SubscriptionStatus, TransactionStatus, TransactionType,
};
use crate::providers::adapter::{FetchPage, FetchParams, ProviderAdapter, ProviderError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

const DEFAULT_BASE_URL: &str = "https://api.stripe.com";

/// Stripe平台适配器
///
/// Stripe的金额本身就是最小货币单位，直接透传。
/// 分页使用 starting_after 游标。
pub struct StripeAdapter {
    client: Client,
    base_url: String,
    secret_key: String,
}

impl StripeAdapter {
    /// 创建新的Stripe适配器实例
    ///
    /// # 参数
    ///
    /// * `secret_key` - api_secret_key 凭证
    pub fn new(secret_key: String) -> Self {
        Self::with_base_url(secret_key, DEFAULT_BASE_URL.to_string())
    }

    /// 使用自定义API地址创建（测试用）
    pub fn with_base_url(secret_key: String, base_url: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            base_url,
            secret_key,
        }
    }

    async fn get_list<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        params: &FetchParams,
    ) -> Result<StripeList<T>, ProviderError> {
        let mut query: Vec<(String, String)> = Vec::new();
        if let Some(limit) = params.limit {
            // Stripe caps page size at 100
            query.push(("limit".into(), limit.min(100).to_string()));
        }
        if let Some(start) = params.start_date {
            query.push(("created[gte]".into(), start.timestamp().to_string()));
        }
        if let Some(end) = params.end_date {
            query.push(("created[lte]".into(), end.timestamp().to_string()));
        }
        if let Some(cursor) = &params.cursor {
            query.push(("starting_after".into(), cursor.clone()));
        }

        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.secret_key)
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        response
            .json::<StripeList<T>>()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl ProviderAdapter for StripeAdapter {
    async fn fetch_subscriptions(
        &self,
        params: &FetchParams,
    ) -> Result<FetchPage<CanonicalSubscription>, ProviderError> {
        let list: StripeList<StripeSubscription> =
            self.get_list("/v1/subscriptions", params).await?;
        let next_cursor = list.next_cursor();
        let records = list.data.into_iter().map(normalize_subscription).collect();
        Ok(FetchPage {
            records,
            next_cursor,
        })
    }

    async fn fetch_transactions(
        &self,
        params: &FetchParams,
    ) -> Result<FetchPage<CanonicalTransaction>, ProviderError> {
        let list: StripeList<StripeCharge> = self.get_list("/v1/charges", params).await?;
        let next_cursor = list.next_cursor();
        let records = list.data.into_iter().map(normalize_charge).collect();
        Ok(FetchPage {
            records,
            next_cursor,
        })
    }

    async fn fetch_customers(
        &self,
        params: &FetchParams,
    ) -> Result<FetchPage<CanonicalCustomer>, ProviderError> {
        let list: StripeList<StripeCustomer> = self.get_list("/v1/customers", params).await?;
        let next_cursor = list.next_cursor();
        let records = list.data.into_iter().map(normalize_customer).collect();
        Ok(FetchPage {
            records,
            next_cursor,
        })
    }

    async fn test_connection(&self) -> bool {
        let result = self
            .client
            .get(format!("{}/v1/account", self.base_url))
            .bearer_auth(&self.secret_key)
            .send()
            .await;
        match result {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!("Stripe connection test failed: {}", e);
                false
            }
        }
    }

    fn slug(&self) -> &'static str {
        "stripe"
    }
}

#[derive(Debug, Deserialize)]
struct StripeList<T> {
    data: Vec<T>,
    #[serde(default)]
    has_more: bool,
}

impl<T: HasId> StripeList<T> {
    fn next_cursor(&self) -> Option<String> {
        if self.has_more {
            self.data.last().map(|r| r.id().to_string())
        } else {
            None
        }
    }
}

trait HasId {
    fn id(&self) -> &str;
}

#[derive(Debug, Deserialize)]
pub(crate) struct StripeSubscription {
    id: String,
    customer: String,
    status: String,
    #[serde(default)]
    items: StripeSubscriptionItems,
    trial_start: Option<i64>,
    trial_end: Option<i64>,
    start_date: Option<i64>,
    current_period_start: Option<i64>,
    current_period_end: Option<i64>,
    canceled_at: Option<i64>,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

impl HasId for StripeSubscription {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Default, Deserialize)]
struct StripeSubscriptionItems {
    #[serde(default)]
    data: Vec<StripeSubscriptionItem>,
}

#[derive(Debug, Deserialize)]
struct StripeSubscriptionItem {
    price: StripePrice,
}

#[derive(Debug, Deserialize)]
struct StripePrice {
    id: String,
    product: Option<String>,
    unit_amount: Option<i64>,
    currency: String,
    recurring: Option<StripeRecurring>,
}

#[derive(Debug, Deserialize)]
struct StripeRecurring {
    interval: String,
    #[serde(default = "default_interval_count")]
    interval_count: i32,
}

fn default_interval_count() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub(crate) struct StripeCharge {
    id: String,
    customer: Option<String>,
    invoice: Option<String>,
    amount: i64,
    currency: String,
    status: String,
    #[serde(default)]
    refunded: bool,
    payment_method_details: Option<StripePaymentMethodDetails>,
    created: Option<i64>,
    #[serde(default)]
    paid: bool,
}

impl HasId for StripeCharge {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Deserialize)]
struct StripePaymentMethodDetails {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StripeCustomer {
    id: String,
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    address: Option<StripeAddress>,
    created: Option<i64>,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

impl HasId for StripeCustomer {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Deserialize)]
struct StripeAddress {
    line1: Option<String>,
    city: Option<String>,
    state: Option<String>,
    country: Option<String>,
    postal_code: Option<String>,
}

fn ts(seconds: Option<i64>) -> Option<DateTime<Utc>> {
    seconds.and_then(|s| DateTime::<Utc>::from_timestamp(s, 0))
}

/// Stripe订阅状态 → 规范状态
///
/// 未知状态落到canceled，对账在词汇不完整时也要能推进。
pub(crate) fn map_subscription_status(status: &str) -> SubscriptionStatus {
    match status {
        "trialing" => SubscriptionStatus::TrialActive,
        "active" => SubscriptionStatus::Active,
        "past_due" | "unpaid" => SubscriptionStatus::PastDue,
        "canceled" => SubscriptionStatus::Canceled,
        "incomplete_expired" => SubscriptionStatus::Expired,
        "paused" => SubscriptionStatus::Paused,
        other => {
            warn!("Unknown Stripe subscription status '{}', mapping to canceled", other);
            SubscriptionStatus::Canceled
        }
    }
}

pub(crate) fn map_charge_status(status: &str, refunded: bool) -> TransactionStatus {
    if refunded {
        return TransactionStatus::Refunded;
    }
    match status {
        "succeeded" => TransactionStatus::Succeeded,
        "pending" => TransactionStatus::Pending,
        "failed" => TransactionStatus::Failed,
        other => {
            warn!("Unknown Stripe charge status '{}', mapping to pending", other);
            TransactionStatus::Pending
        }
    }
}

pub(crate) fn map_interval(interval: &str) -> BillingPeriod {
    match interval {
        "day" => BillingPeriod::Day,
        "week" => BillingPeriod::Week,
        "month" => BillingPeriod::Month,
        "year" => BillingPeriod::Year,
        _ => BillingPeriod::Month,
    }
}

pub(crate) fn map_payment_method(kind: Option<&str>) -> PaymentMethod {
    match kind {
        Some("card") => PaymentMethod::CreditCard,
        Some("paypal") => PaymentMethod::Paypal,
        Some("boleto") => PaymentMethod::Boleto,
        Some("pix") => PaymentMethod::Pix,
        _ => PaymentMethod::Other,
    }
}

pub(crate) fn normalize_subscription(sub: StripeSubscription) -> CanonicalSubscription {
    let price = sub.items.data.first().map(|item| &item.price);
    let recurring = price.and_then(|p| p.recurring.as_ref());

    CanonicalSubscription {
        external_id: sub.id,
        external_customer_id: sub.customer,
        external_product_id: price.and_then(|p| p.product.clone()),
        external_price_id: price.map(|p| p.id.clone()),
        product_name: None,
        status: map_subscription_status(&sub.status),
        trial_start: ts(sub.trial_start),
        trial_end: ts(sub.trial_end),
        // unit_amount is already in minor units
        amount: price.and_then(|p| p.unit_amount).unwrap_or(0),
        currency: price
            .map(|p| p.currency.to_uppercase())
            .unwrap_or_else(|| "USD".to_string()),
        billing_period: recurring
            .map(|r| map_interval(&r.interval))
            .unwrap_or(BillingPeriod::Month),
        billing_interval: recurring.map(|r| r.interval_count).unwrap_or(1),
        started_at: ts(sub.start_date),
        current_period_start: ts(sub.current_period_start),
        current_period_end: ts(sub.current_period_end),
        next_billing_at: ts(sub.current_period_end),
        canceled_at: ts(sub.canceled_at),
        metadata: sub.metadata,
    }
}

pub(crate) fn normalize_charge(charge: StripeCharge) -> CanonicalTransaction {
    let status = map_charge_status(&charge.status, charge.refunded);
    let txn_type = if charge.refunded {
        TransactionType::Refund
    } else if charge.invoice.is_some() {
        TransactionType::SubscriptionPayment
    } else {
        TransactionType::OneTimePayment
    };
    let created = ts(charge.created);

    CanonicalTransaction {
        external_id: charge.id,
        external_customer_id: charge.customer,
        external_subscription_id: None,
        external_invoice_id: charge.invoice,
        txn_type,
        status,
        // charge amounts are already in minor units
        amount: charge.amount,
        currency: charge.currency.to_uppercase(),
        payment_method: map_payment_method(
            charge.payment_method_details.as_ref().map(|d| d.kind.as_str()),
        ),
        created_at: created,
        paid_at: if charge.paid { created } else { None },
        refunded_at: if charge.refunded { created } else { None },
    }
}

pub(crate) fn normalize_customer(customer: StripeCustomer) -> CanonicalCustomer {
    let address = customer.address;
    CanonicalCustomer {
        external_id: customer.id,
        name: customer.name,
        email: customer.email,
        document: None,
        phone: customer.phone,
        street: address.as_ref().and_then(|a| a.line1.clone()),
        city: address.as_ref().and_then(|a| a.city.clone()),
        state: address.as_ref().and_then(|a| a.state.clone()),
        country: address.as_ref().and_then(|a| a.country.clone()),
        postal_code: address.as_ref().and_then(|a| a.postal_code.clone()),
        created_at: ts(customer.created),
        metadata: customer.metadata,
    }
}
