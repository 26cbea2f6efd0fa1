// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

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

const DEFAULT_BASE_URL: &str = "https://public-api.kiwify.com";

/// Kiwify平台适配器
///
/// Kiwify的金额已经是最小货币单位（分），直接透传。
/// 平台不提供客户列表API，fetch_customers恒返回空页，
/// 调用方必须把空结果当作有效数据而不是错误。
pub struct KiwifyAdapter {
    client: Client,
    base_url: String,
    api_key: String,
}

impl KiwifyAdapter {
    /// 创建新的Kiwify适配器实例
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    /// 使用自定义API地址创建（测试用）
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            base_url,
            api_key,
        }
    }

    async fn get_page<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        params: &FetchParams,
    ) -> Result<KiwifyPage<T>, ProviderError> {
        let mut query: Vec<(String, String)> = Vec::new();
        if let Some(limit) = params.limit {
            query.push(("page_size".into(), limit.min(100).to_string()));
        }
        if let Some(start) = params.start_date {
            query.push(("start_date".into(), start.to_rfc3339()));
        }
        if let Some(end) = params.end_date {
            query.push(("end_date".into(), end.to_rfc3339()));
        }
        // cursor carries the page number for Kiwify
        let page_number = params
            .cursor
            .as_deref()
            .and_then(|c| c.parse::<u32>().ok())
            .unwrap_or(1);
        query.push(("page_number".into(), page_number.to_string()));

        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Bearer {}", self.api_key))
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

        let mut page: KiwifyPage<T> = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        page.current_page = page_number;
        Ok(page)
    }
}

#[async_trait]
impl ProviderAdapter for KiwifyAdapter {
    async fn fetch_subscriptions(
        &self,
        params: &FetchParams,
    ) -> Result<FetchPage<CanonicalSubscription>, ProviderError> {
        let page: KiwifyPage<KiwifySubscription> =
            self.get_page("/v1/subscriptions", params).await?;
        Ok(FetchPage {
            next_cursor: page.next_cursor(),
            records: page.data.into_iter().map(normalize_subscription).collect(),
        })
    }

    async fn fetch_transactions(
        &self,
        params: &FetchParams,
    ) -> Result<FetchPage<CanonicalTransaction>, ProviderError> {
        let page: KiwifyPage<KiwifySale> = self.get_page("/v1/sales", params).await?;
        Ok(FetchPage {
            next_cursor: page.next_cursor(),
            records: page.data.into_iter().map(normalize_sale).collect(),
        })
    }

    async fn fetch_customers(
        &self,
        _params: &FetchParams,
    ) -> Result<FetchPage<CanonicalCustomer>, ProviderError> {
        // Kiwify exposes no customer listing API; an empty page is a
        // valid result for callers, not an error.
        Ok(FetchPage::empty())
    }

    async fn test_connection(&self) -> bool {
        let result = self
            .client
            .get(format!("{}/v1/products", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await;
        match result {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!("Kiwify connection test failed: {}", e);
                false
            }
        }
    }

    fn slug(&self) -> &'static str {
        "kiwify"
    }
}

#[derive(Debug, Deserialize)]
struct KiwifyPage<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
    #[serde(default)]
    total_pages: u32,
    #[serde(skip)]
    current_page: u32,
}

impl<T> KiwifyPage<T> {
    fn next_cursor(&self) -> Option<String> {
        if self.current_page < self.total_pages {
            Some((self.current_page + 1).to_string())
        } else {
            None
        }
    }
}

#[derive(Debug, Deserialize)]
struct KiwifySubscription {
    id: String,
    status: Option<String>,
    customer: Option<KiwifyCustomer>,
    product: Option<KiwifyProduct>,
    plan: Option<KiwifyPlan>,
    start_date: Option<DateTime<Utc>>,
    next_payment: Option<DateTime<Utc>>,
    canceled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct KiwifyCustomer {
    id: Option<String>,
    name: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KiwifyProduct {
    id: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KiwifyPlan {
    frequency: Option<String>,
    // already minor units
    price: Option<i64>,
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KiwifySale {
    id: String,
    status: Option<String>,
    customer: Option<KiwifyCustomer>,
    subscription_id: Option<String>,
    payment_method: Option<String>,
    // already minor units
    net_amount: Option<i64>,
    currency: Option<String>,
    created_at: Option<DateTime<Utc>>,
    approved_date: Option<DateTime<Utc>>,
    refunded_at: Option<DateTime<Utc>>,
}

/// Kiwify订阅状态 → 规范状态，未知值落到canceled
pub(crate) fn map_subscription_status(status: &str) -> SubscriptionStatus {
    match status {
        "trial" => SubscriptionStatus::TrialActive,
        "active" => SubscriptionStatus::Active,
        "waiting_payment" | "late" => SubscriptionStatus::PastDue,
        "canceled" => SubscriptionStatus::Canceled,
        "expired" => SubscriptionStatus::Expired,
        "paused" => SubscriptionStatus::Paused,
        other => {
            warn!("Unknown Kiwify subscription status '{}', mapping to canceled", other);
            SubscriptionStatus::Canceled
        }
    }
}

/// Kiwify销售状态 → 规范交易状态，未知值落到pending
pub(crate) fn map_sale_status(status: &str) -> TransactionStatus {
    match status {
        "paid" | "approved" => TransactionStatus::Succeeded,
        "waiting_payment" | "processing" => TransactionStatus::Pending,
        "refused" | "chargedback" => TransactionStatus::Failed,
        "refunded" => TransactionStatus::Refunded,
        other => {
            warn!("Unknown Kiwify sale status '{}', mapping to pending", other);
            TransactionStatus::Pending
        }
    }
}

pub(crate) fn map_frequency(frequency: Option<&str>) -> BillingPeriod {
    match frequency {
        Some("daily") => BillingPeriod::Day,
        Some("weekly") => BillingPeriod::Week,
        Some("monthly") => BillingPeriod::Month,
        Some("yearly") | Some("annually") => BillingPeriod::Year,
        _ => BillingPeriod::Month,
    }
}

pub(crate) fn map_payment_method(method: Option<&str>) -> PaymentMethod {
    match method {
        Some("credit_card") => PaymentMethod::CreditCard,
        Some("debit_card") => PaymentMethod::DebitCard,
        Some("pix") => PaymentMethod::Pix,
        Some("boleto") => PaymentMethod::Boleto,
        _ => PaymentMethod::Other,
    }
}

fn normalize_subscription(sub: KiwifySubscription) -> CanonicalSubscription {
    let status = map_subscription_status(sub.status.as_deref().unwrap_or(""));
    let plan = sub.plan.as_ref();

    CanonicalSubscription {
        external_id: sub.id,
        external_customer_id: sub
            .customer
            .as_ref()
            .and_then(|c| c.id.clone().or_else(|| c.email.clone()))
            .unwrap_or_default(),
        external_product_id: sub.product.as_ref().and_then(|p| p.id.clone()),
        external_price_id: None,
        product_name: sub.product.as_ref().and_then(|p| p.name.clone()),
        status,
        trial_start: None,
        trial_end: None,
        amount: plan.and_then(|p| p.price).unwrap_or(0),
        currency: plan
            .and_then(|p| p.currency.clone())
            .unwrap_or_else(|| "BRL".to_string()),
        billing_period: map_frequency(plan.and_then(|p| p.frequency.as_deref())),
        billing_interval: 1,
        started_at: sub.start_date,
        current_period_start: sub.start_date,
        current_period_end: sub.next_payment,
        next_billing_at: sub.next_payment,
        canceled_at: sub.canceled_at,
        metadata: None,
    }
}

fn normalize_sale(sale: KiwifySale) -> CanonicalTransaction {
    let status = map_sale_status(sale.status.as_deref().unwrap_or(""));
    let txn_type = if status == TransactionStatus::Refunded {
        TransactionType::Refund
    } else if sale.subscription_id.is_some() {
        TransactionType::SubscriptionPayment
    } else {
        TransactionType::OneTimePayment
    };

    CanonicalTransaction {
        external_id: sale.id,
        external_customer_id: sale
            .customer
            .as_ref()
            .and_then(|c| c.id.clone().or_else(|| c.email.clone())),
        external_subscription_id: sale.subscription_id,
        external_invoice_id: None,
        txn_type,
        status,
        // net_amount is already in minor units
        amount: sale.net_amount.unwrap_or(0),
        currency: sale.currency.unwrap_or_else(|| "BRL".to_string()),
        payment_method: map_payment_method(sale.payment_method.as_deref()),
        created_at: sale.created_at,
        paid_at: sale.approved_date,
        refunded_at: sale.refunded_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(server: &MockServer) -> KiwifyAdapter {
        KiwifyAdapter::with_base_url("kw_key".to_string(), server.uri())
    }

    #[test]
    fn test_unknown_status_maps_conservatively() {
        assert_eq!(
            map_subscription_status("brand_new"),
            SubscriptionStatus::Canceled
        );
        assert_eq!(map_sale_status("brand_new"), TransactionStatus::Pending);
    }

    #[tokio::test]
    async fn test_fetch_customers_is_an_empty_valid_page() {
        let server = MockServer::start().await;
        let page = adapter(&server)
            .fetch_customers(&FetchParams::last_day(1000))
            .await
            .unwrap();
        assert!(page.records.is_empty());
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_fetch_sales_minor_units_and_page_cursor() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/sales"))
            .and(query_param("page_number", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{
                    "id": "kw_1",
                    "status": "paid",
                    "customer": {"id": "c1", "name": "Bia", "email": "bia@x.com"},
                    "subscription_id": "ks_1",
                    "payment_method": "pix",
                    "net_amount": 2990,
                    "currency": "BRL",
                    "created_at": "2026-08-01T10:00:00Z",
                    "approved_date": "2026-08-01T10:01:00Z"
                }],
                "total_pages": 3
            })))
            .mount(&server)
            .await;

        let page = adapter(&server)
            .fetch_transactions(&FetchParams::last_day(1000))
            .await
            .unwrap();

        assert_eq!(page.records[0].amount, 2990);
        assert_eq!(
            page.records[0].txn_type,
            TransactionType::SubscriptionPayment
        );
        assert_eq!(page.next_cursor.as_deref(), Some("2"));
    }
}
