// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! Hotmart原生事件处理器
//!
//! Hotmart的Webhook信封是`{"event": ..., "data": {...}}`，data下的
//! purchase/buyer/subscription与REST API的销售历史响应并不同构，
//! 处理器自带一套载荷结构，仅复用适配器侧的状态映射。
//! 金额为十进制主单位，在这里换算成最小货币单位。

use crate::domain::models::canonical::{
    BillingPeriod, CanonicalAffiliate, CanonicalCustomer, CanonicalFragment, CanonicalOrder,
    CanonicalSubscription, CanonicalTransaction, SubscriptionStatus, TransactionType,
};
use crate::handlers::{EventHandler, HandlerError};
use crate::providers::hotmart::{map_payment_type, map_sale_status, map_subscription_status};
use crate::utils::money::major_to_minor;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct WebhookData {
    purchase: Option<WebhookPurchase>,
    buyer: Option<WebhookBuyer>,
    subscription: Option<WebhookSubscription>,
    #[serde(default)]
    affiliates: Vec<WebhookAffiliate>,
    product: Option<WebhookProduct>,
}

#[derive(Debug, Deserialize)]
struct WebhookPurchase {
    transaction: String,
    status: Option<String>,
    order_date: Option<i64>,
    approved_date: Option<i64>,
    price: Option<WebhookPrice>,
    payment: Option<WebhookPayment>,
}

#[derive(Debug, Deserialize)]
struct WebhookPrice {
    // decimal major units
    value: Option<f64>,
    currency_value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WebhookPayment {
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WebhookBuyer {
    code: Option<String>,
    name: Option<String>,
    email: Option<String>,
    document: Option<String>,
    checkout_phone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WebhookSubscription {
    subscriber: Option<WebhookSubscriber>,
    plan: Option<WebhookPlan>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WebhookSubscriber {
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WebhookPlan {
    name: Option<String>,
    // decimal major units
    price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WebhookAffiliate {
    affiliate_code: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WebhookProduct {
    id: Option<i64>,
    name: Option<String>,
}

fn parse_data(payload: &Value) -> Result<WebhookData, HandlerError> {
    let data = payload
        .get("data")
        .cloned()
        .ok_or_else(|| HandlerError::MalformedPayload("missing data".to_string()))?;
    Ok(serde_json::from_value(data)?)
}

fn ts_millis(millis: Option<i64>) -> Option<DateTime<Utc>> {
    millis.and_then(DateTime::<Utc>::from_timestamp_millis)
}

fn buyer_to_customer(buyer: &WebhookBuyer) -> CanonicalCustomer {
    // 买家没有稳定code时退回邮箱作为外部ID
    let external_id = buyer
        .code
        .clone()
        .or_else(|| buyer.email.clone())
        .unwrap_or_default();
    CanonicalCustomer {
        external_id,
        name: buyer.name.clone(),
        email: buyer.email.clone(),
        document: buyer.document.clone(),
        phone: buyer.checkout_phone.clone(),
        street: None,
        city: None,
        state: None,
        country: None,
        postal_code: None,
        created_at: None,
        metadata: None,
    }
}

fn first_affiliate(affiliates: &[WebhookAffiliate]) -> Option<CanonicalAffiliate> {
    affiliates
        .iter()
        .find(|a| a.affiliate_code.as_deref().is_some_and(|c| !c.is_empty()))
        .map(|a| CanonicalAffiliate {
            external_id: a.affiliate_code.clone().unwrap_or_default(),
            name: a.name.clone(),
            email: None,
        })
}

/// PURCHASE_APPROVED / PURCHASE_COMPLETE / PURCHASE_REFUNDED / PURCHASE_CHARGEBACK
pub struct PurchaseHandler;

impl EventHandler for PurchaseHandler {
    fn translate(&self, payload: &Value) -> Result<CanonicalFragment, HandlerError> {
        let data = parse_data(payload)?;
        let purchase = data
            .purchase
            .ok_or_else(|| HandlerError::MalformedPayload("missing data.purchase".to_string()))?;

        let (status, mut txn_type) = map_sale_status(purchase.status.as_deref().unwrap_or(""));
        let subscriber_code = data
            .subscription
            .as_ref()
            .and_then(|s| s.subscriber.as_ref())
            .and_then(|s| s.code.clone());
        if subscriber_code.is_some() && txn_type == TransactionType::OneTimePayment {
            txn_type = TransactionType::SubscriptionPayment;
        }

        let amount = major_to_minor(
            purchase
                .price
                .as_ref()
                .and_then(|p| p.value)
                .unwrap_or(0.0),
        );
        let currency = purchase
            .price
            .as_ref()
            .and_then(|p| p.currency_value.clone())
            .unwrap_or_else(|| "BRL".to_string());

        let order_date = ts_millis(purchase.order_date);
        let approved_date = ts_millis(purchase.approved_date);

        let customer = data.buyer.as_ref().map(buyer_to_customer);
        let transaction = CanonicalTransaction {
            external_id: purchase.transaction.clone(),
            external_customer_id: customer.as_ref().map(|c| c.external_id.clone()),
            external_subscription_id: subscriber_code,
            external_invoice_id: None,
            txn_type,
            status,
            amount,
            currency: currency.clone(),
            payment_method: map_payment_type(
                purchase.payment.as_ref().and_then(|p| p.kind.as_deref()),
            ),
            created_at: order_date,
            paid_at: approved_date,
            refunded_at: None,
        };
        let order = CanonicalOrder {
            external_id: purchase.transaction,
            total_amount: amount,
            currency,
            status: purchase.status,
        };

        Ok(CanonicalFragment {
            customer,
            affiliate: first_affiliate(&data.affiliates),
            subscription: None,
            transaction: Some(transaction),
            order: Some(order),
        })
    }
}

/// SUBSCRIPTION_CANCELLATION / SWITCH_PLAN
pub struct SubscriptionHandler;

impl EventHandler for SubscriptionHandler {
    fn translate(&self, payload: &Value) -> Result<CanonicalFragment, HandlerError> {
        let data = parse_data(payload)?;
        let subscription = data
            .subscription
            .ok_or_else(|| HandlerError::MalformedPayload("missing data.subscription".to_string()))?;
        let subscriber_code = subscription
            .subscriber
            .as_ref()
            .and_then(|s| s.code.clone())
            .ok_or_else(|| {
                HandlerError::MalformedPayload("missing subscription.subscriber.code".to_string())
            })?;

        let status = subscription
            .status
            .as_deref()
            .map(|s| map_subscription_status(s, false))
            .unwrap_or(SubscriptionStatus::Canceled);
        let customer = data.buyer.as_ref().map(buyer_to_customer);
        let plan = subscription.plan.as_ref();
        let now = Utc::now();

        let canonical = CanonicalSubscription {
            external_id: subscriber_code,
            external_customer_id: customer
                .as_ref()
                .map(|c| c.external_id.clone())
                .unwrap_or_default(),
            external_product_id: data.product.as_ref().and_then(|p| p.id).map(|id| id.to_string()),
            external_price_id: None,
            product_name: data
                .product
                .as_ref()
                .and_then(|p| p.name.clone())
                .or_else(|| plan.and_then(|p| p.name.clone())),
            status,
            trial_start: None,
            trial_end: None,
            amount: major_to_minor(plan.and_then(|p| p.price).unwrap_or(0.0)),
            currency: "BRL".to_string(),
            billing_period: BillingPeriod::Month,
            billing_interval: 1,
            started_at: None,
            current_period_start: None,
            current_period_end: None,
            next_billing_at: None,
            canceled_at: if status == SubscriptionStatus::Canceled {
                Some(now)
            } else {
                None
            },
            metadata: None,
        };

        Ok(CanonicalFragment {
            customer,
            subscription: Some(canonical),
            ..Default::default()
        })
    }
}
