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
use crate::utils::money::major_to_minor;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::warn;

const DEFAULT_BASE_URL: &str = "https://developers.hotmart.com";

/// Hotmart平台适配器
///
/// Hotmart的API返回十进制主单位金额，这里乘以100四舍五入
/// 换算为最小货币单位。认证走OAuth client_credentials，
/// 令牌在适配器内缓存直至过期。分页使用page_token。
pub struct HotmartAdapter {
    client: Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    basic_token: String,
    token_cache: RwLock<Option<CachedToken>>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl HotmartAdapter {
    /// 创建新的Hotmart适配器实例
    pub fn new(client_id: String, client_secret: String, basic_token: String) -> Self {
        Self::with_base_url(
            client_id,
            client_secret,
            basic_token,
            DEFAULT_BASE_URL.to_string(),
        )
    }

    /// 使用自定义API地址创建（测试用）
    pub fn with_base_url(
        client_id: String,
        client_secret: String,
        basic_token: String,
        base_url: String,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            base_url,
            client_id,
            client_secret,
            basic_token,
            token_cache: RwLock::new(None),
        }
    }

    /// 获取访问令牌，命中缓存则直接复用
    async fn access_token(&self) -> Result<String, ProviderError> {
        {
            let cache = self.token_cache.read().await;
            if let Some(token) = cache.as_ref() {
                if token.expires_at > Utc::now() + chrono::Duration::seconds(60) {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let response = self
            .client
            .post(format!("{}/security/oauth/token", self.base_url))
            .header("Authorization", format!("Basic {}", self.basic_token))
            .query(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let token: HotmartToken = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let cached = CachedToken {
            access_token: token.access_token.clone(),
            expires_at: Utc::now() + chrono::Duration::seconds(token.expires_in),
        };
        *self.token_cache.write().await = Some(cached);
        Ok(token.access_token)
    }

    async fn get_page<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        params: &FetchParams,
    ) -> Result<HotmartPage<T>, ProviderError> {
        let token = self.access_token().await?;

        let mut query: Vec<(String, String)> = Vec::new();
        if let Some(limit) = params.limit {
            // Hotmart caps max_results at 500
            query.push(("max_results".into(), limit.min(500).to_string()));
        }
        if let Some(start) = params.start_date {
            query.push(("start_date".into(), start.timestamp_millis().to_string()));
        }
        if let Some(end) = params.end_date {
            query.push(("end_date".into(), end.timestamp_millis().to_string()));
        }
        if let Some(cursor) = &params.cursor {
            query.push(("page_token".into(), cursor.clone()));
        }

        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
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
            .json::<HotmartPage<T>>()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl ProviderAdapter for HotmartAdapter {
    async fn fetch_subscriptions(
        &self,
        params: &FetchParams,
    ) -> Result<FetchPage<CanonicalSubscription>, ProviderError> {
        let page: HotmartPage<HotmartSubscription> = self
            .get_page("/payments/api/v1/subscriptions", params)
            .await?;
        Ok(FetchPage {
            next_cursor: page.page_info.and_then(|p| p.next_page_token),
            records: page.items.into_iter().map(normalize_subscription).collect(),
        })
    }

    async fn fetch_transactions(
        &self,
        params: &FetchParams,
    ) -> Result<FetchPage<CanonicalTransaction>, ProviderError> {
        let page: HotmartPage<HotmartSale> = self
            .get_page("/payments/api/v1/sales/history", params)
            .await?;
        Ok(FetchPage {
            next_cursor: page.page_info.and_then(|p| p.next_page_token),
            records: page.items.into_iter().map(normalize_sale).collect(),
        })
    }

    async fn fetch_customers(
        &self,
        params: &FetchParams,
    ) -> Result<FetchPage<CanonicalCustomer>, ProviderError> {
        let page: HotmartPage<HotmartSaleUser> = self
            .get_page("/payments/api/v1/sales/users", params)
            .await?;
        Ok(FetchPage {
            next_cursor: page.page_info.and_then(|p| p.next_page_token),
            records: page
                .items
                .into_iter()
                .filter_map(normalize_sale_user)
                .collect(),
        })
    }

    async fn test_connection(&self) -> bool {
        match self.access_token().await {
            Ok(_) => true,
            Err(e) => {
                warn!("Hotmart connection test failed: {}", e);
                false
            }
        }
    }

    fn slug(&self) -> &'static str {
        "hotmart"
    }
}

#[derive(Debug, Deserialize)]
struct HotmartToken {
    access_token: String,
    #[serde(default = "default_expiry")]
    expires_in: i64,
}

fn default_expiry() -> i64 {
    1800
}

#[derive(Debug, Deserialize)]
struct HotmartPage<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    page_info: Option<HotmartPageInfo>,
}

#[derive(Debug, Deserialize)]
struct HotmartPageInfo {
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HotmartSubscription {
    subscriber_code: String,
    status: String,
    subscriber: Option<HotmartSubscriber>,
    product: Option<HotmartProduct>,
    plan: Option<HotmartPlan>,
    accession_date: Option<i64>,
    date_next_charge: Option<i64>,
    end_accession_date: Option<i64>,
    trial: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct HotmartSubscriber {
    code: Option<String>,
    name: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HotmartProduct {
    id: Option<i64>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HotmartPlan {
    name: Option<String>,
    recurrency_period: Option<i32>,
    // decimal major units
    price: Option<f64>,
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HotmartSale {
    transaction: String,
    status: Option<String>,
    buyer: Option<HotmartSubscriber>,
    subscription: Option<HotmartSaleSubscription>,
    purchase: Option<HotmartPurchase>,
}

#[derive(Debug, Deserialize)]
struct HotmartSaleSubscription {
    subscriber_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HotmartPurchase {
    // decimal major units
    price: Option<HotmartPrice>,
    payment: Option<HotmartPayment>,
    order_date: Option<i64>,
    approved_date: Option<i64>,
    #[serde(rename = "recurrency_number")]
    recurrency_number: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct HotmartPrice {
    value: Option<f64>,
    currency_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HotmartPayment {
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HotmartSaleUser {
    user: Option<HotmartUser>,
}

#[derive(Debug, Deserialize)]
struct HotmartUser {
    ucode: Option<String>,
    name: Option<String>,
    email: Option<String>,
    documents: Option<Vec<HotmartDocument>>,
    phone: Option<HotmartPhone>,
    address: Option<HotmartAddress>,
}

#[derive(Debug, Deserialize)]
struct HotmartDocument {
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HotmartPhone {
    phone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HotmartAddress {
    address: Option<String>,
    city: Option<String>,
    state: Option<String>,
    country: Option<String>,
    zip_code: Option<String>,
}

fn ts_millis(millis: Option<i64>) -> Option<DateTime<Utc>> {
    millis.and_then(DateTime::<Utc>::from_timestamp_millis)
}

/// Hotmart订阅状态 → 规范状态，未知值落到canceled
pub(crate) fn map_subscription_status(status: &str, trial: bool) -> SubscriptionStatus {
    if trial {
        return SubscriptionStatus::TrialActive;
    }
    match status {
        "ACTIVE" | "STARTED" => SubscriptionStatus::Active,
        "DELAYED" | "OVERDUE" => SubscriptionStatus::PastDue,
        "CANCELLED_BY_CUSTOMER" | "CANCELLED_BY_SELLER" | "CANCELLED_BY_ADMIN" => {
            SubscriptionStatus::Canceled
        }
        "INACTIVE" => SubscriptionStatus::Expired,
        other => {
            warn!("Unknown Hotmart subscription status '{}', mapping to canceled", other);
            SubscriptionStatus::Canceled
        }
    }
}

/// Hotmart销售状态 → 规范交易状态，未知值落到pending
pub(crate) fn map_sale_status(status: &str) -> (TransactionStatus, TransactionType) {
    match status {
        "APPROVED" | "COMPLETE" => (TransactionStatus::Succeeded, TransactionType::OneTimePayment),
        "REFUNDED" | "CHARGEBACK" => (TransactionStatus::Refunded, TransactionType::Refund),
        "CANCELLED" | "EXPIRED" | "NO_FUNDS" => {
            (TransactionStatus::Failed, TransactionType::OneTimePayment)
        }
        "STARTED" | "PRINTED_BILLET" | "WAITING_PAYMENT" | "UNDER_ANALISYS" => {
            (TransactionStatus::Pending, TransactionType::OneTimePayment)
        }
        other => {
            warn!("Unknown Hotmart sale status '{}', mapping to pending", other);
            (TransactionStatus::Pending, TransactionType::OneTimePayment)
        }
    }
}

pub(crate) fn map_payment_type(kind: Option<&str>) -> PaymentMethod {
    match kind {
        Some("CREDIT_CARD") => PaymentMethod::CreditCard,
        Some("DEBIT_CARD") => PaymentMethod::DebitCard,
        Some("PIX") => PaymentMethod::Pix,
        Some("BILLET") => PaymentMethod::Boleto,
        Some("PAYPAL") | Some("PAYPAL_INTERNACIONAL") => PaymentMethod::Paypal,
        _ => PaymentMethod::Other,
    }
}

fn normalize_subscription(sub: HotmartSubscription) -> CanonicalSubscription {
    let trial = sub.trial.unwrap_or(false);
    let plan = sub.plan.as_ref();

    CanonicalSubscription {
        external_id: sub.subscriber_code.clone(),
        external_customer_id: sub
            .subscriber
            .as_ref()
            .and_then(|s| s.code.clone())
            .or_else(|| sub.subscriber.as_ref().and_then(|s| s.email.clone()))
            .unwrap_or_default(),
        external_product_id: sub.product.as_ref().and_then(|p| p.id.map(|id| id.to_string())),
        external_price_id: None,
        product_name: sub
            .product
            .as_ref()
            .and_then(|p| p.name.clone())
            .or_else(|| plan.and_then(|p| p.name.clone())),
        status: map_subscription_status(&sub.status, trial),
        trial_start: if trial { ts_millis(sub.accession_date) } else { None },
        trial_end: None,
        amount: plan.and_then(|p| p.price).map(major_to_minor).unwrap_or(0),
        currency: plan
            .and_then(|p| p.currency.clone())
            .unwrap_or_else(|| "BRL".to_string()),
        billing_period: BillingPeriod::Month,
        billing_interval: plan.and_then(|p| p.recurrency_period).unwrap_or(1),
        started_at: ts_millis(sub.accession_date),
        current_period_start: ts_millis(sub.accession_date),
        current_period_end: ts_millis(sub.date_next_charge),
        next_billing_at: ts_millis(sub.date_next_charge),
        canceled_at: ts_millis(sub.end_accession_date),
        metadata: None,
    }
}

fn normalize_sale(sale: HotmartSale) -> CanonicalTransaction {
    let (status, mut txn_type) = map_sale_status(sale.status.as_deref().unwrap_or(""));
    let purchase = sale.purchase.as_ref();
    let is_recurring = purchase
        .and_then(|p| p.recurrency_number)
        .map(|n| n > 0)
        .unwrap_or(false)
        || sale
            .subscription
            .as_ref()
            .and_then(|s| s.subscriber_code.as_ref())
            .is_some();
    if is_recurring && txn_type != TransactionType::Refund {
        txn_type = TransactionType::SubscriptionPayment;
    }

    CanonicalTransaction {
        external_id: sale.transaction,
        external_customer_id: sale
            .buyer
            .as_ref()
            .and_then(|b| b.code.clone().or_else(|| b.email.clone())),
        external_subscription_id: sale
            .subscription
            .and_then(|s| s.subscriber_code),
        external_invoice_id: None,
        txn_type,
        status,
        // decimal major units from the API, converted exactly once here
        amount: purchase
            .and_then(|p| p.price.as_ref())
            .and_then(|p| p.value)
            .map(major_to_minor)
            .unwrap_or(0),
        currency: purchase
            .and_then(|p| p.price.as_ref())
            .and_then(|p| p.currency_code.clone())
            .unwrap_or_else(|| "BRL".to_string()),
        payment_method: map_payment_type(
            purchase
                .and_then(|p| p.payment.as_ref())
                .and_then(|p| p.kind.as_deref()),
        ),
        created_at: ts_millis(purchase.and_then(|p| p.order_date)),
        paid_at: ts_millis(purchase.and_then(|p| p.approved_date)),
        refunded_at: None,
    }
}

fn normalize_sale_user(entry: HotmartSaleUser) -> Option<CanonicalCustomer> {
    let user = entry.user?;
    let external_id = user.ucode.or_else(|| user.email.clone())?;
    let address = user.address;

    Some(CanonicalCustomer {
        external_id,
        name: user.name,
        email: user.email,
        document: user
            .documents
            .and_then(|docs| docs.into_iter().find_map(|d| d.value)),
        phone: user.phone.and_then(|p| p.phone_number),
        street: address.as_ref().and_then(|a| a.address.clone()),
        city: address.as_ref().and_then(|a| a.city.clone()),
        state: address.as_ref().and_then(|a| a.state.clone()),
        country: address.as_ref().and_then(|a| a.country.clone()),
        postal_code: address.as_ref().and_then(|a| a.zip_code.clone()),
        created_at: None,
        metadata: None,
    })
}
