// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! Kiwify原生事件处理器
//!
//! Kiwify的Webhook载荷是扁平的订单结构，嵌套节点用首字母大写的
//! 键（`Customer`、`Product`、`Subscription`），与REST API响应不同构。
//! 金额已经是最小货币单位，不做换算。

use crate::domain::models::canonical::{
    CanonicalCustomer, CanonicalFragment, CanonicalOrder, CanonicalSubscription,
    CanonicalTransaction, TransactionStatus, TransactionType,
};
use crate::handlers::{EventHandler, HandlerError};
use crate::providers::kiwify::{map_frequency, map_payment_method, map_subscription_status};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct WebhookOrder {
    order_id: String,
    order_status: Option<String>,
    payment_method: Option<String>,
    created_at: Option<DateTime<Utc>>,
    approved_date: Option<DateTime<Utc>>,
    refunded_at: Option<DateTime<Utc>>,
    #[serde(rename = "Customer")]
    customer: Option<WebhookCustomer>,
    #[serde(rename = "Product")]
    product: Option<WebhookProduct>,
    #[serde(rename = "Subscription")]
    subscription: Option<WebhookSubscription>,
    #[serde(rename = "Commissions")]
    commissions: Option<WebhookCommissions>,
}

#[derive(Debug, Deserialize)]
struct WebhookCustomer {
    id: Option<String>,
    full_name: Option<String>,
    email: Option<String>,
    #[serde(rename = "CPF")]
    cpf: Option<String>,
    mobile: Option<String>,
    city: Option<String>,
    state: Option<String>,
    country: Option<String>,
    zipcode: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WebhookProduct {
    product_id: Option<String>,
    product_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WebhookSubscription {
    id: Option<String>,
    status: Option<String>,
    plan: Option<WebhookPlan>,
    start_date: Option<DateTime<Utc>>,
    next_payment: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct WebhookPlan {
    frequency: Option<String>,
    // already minor units
    price: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WebhookCommissions {
    // already minor units
    charge_amount: Option<i64>,
    currency: Option<String>,
}

fn parse_order(payload: &Value) -> Result<WebhookOrder, HandlerError> {
    Ok(serde_json::from_value(payload.clone())?)
}

fn customer_record(customer: &WebhookCustomer) -> CanonicalCustomer {
    CanonicalCustomer {
        external_id: customer
            .id
            .clone()
            .or_else(|| customer.email.clone())
            .unwrap_or_default(),
        name: customer.full_name.clone(),
        email: customer.email.clone(),
        document: customer.cpf.clone(),
        phone: customer.mobile.clone(),
        street: None,
        city: customer.city.clone(),
        state: customer.state.clone(),
        country: customer.country.clone(),
        postal_code: customer.zipcode.clone(),
        created_at: None,
        metadata: None,
    }
}

fn order_status_to_txn(status: &str) -> (TransactionStatus, TransactionType) {
    match status {
        "paid" | "approved" => (TransactionStatus::Succeeded, TransactionType::OneTimePayment),
        "refunded" | "chargedback" => (TransactionStatus::Refunded, TransactionType::Refund),
        "refused" => (TransactionStatus::Failed, TransactionType::OneTimePayment),
        _ => (TransactionStatus::Pending, TransactionType::OneTimePayment),
    }
}

/// order_approved / order_refunded / order_rejected / pix_created
pub struct OrderHandler;

impl EventHandler for OrderHandler {
    fn translate(&self, payload: &Value) -> Result<CanonicalFragment, HandlerError> {
        let order = parse_order(payload)?;
        let (status, mut txn_type) =
            order_status_to_txn(order.order_status.as_deref().unwrap_or(""));
        let subscription_id = order.subscription.as_ref().and_then(|s| s.id.clone());
        if subscription_id.is_some() && txn_type == TransactionType::OneTimePayment {
            txn_type = TransactionType::SubscriptionPayment;
        }

        let amount = order
            .commissions
            .as_ref()
            .and_then(|c| c.charge_amount)
            .unwrap_or(0);
        let currency = order
            .commissions
            .as_ref()
            .and_then(|c| c.currency.clone())
            .unwrap_or_else(|| "BRL".to_string());

        let customer = order.customer.as_ref().map(customer_record);
        let transaction = CanonicalTransaction {
            external_id: order.order_id.clone(),
            external_customer_id: customer.as_ref().map(|c| c.external_id.clone()),
            external_subscription_id: subscription_id,
            external_invoice_id: None,
            txn_type,
            status,
            amount,
            currency: currency.clone(),
            payment_method: map_payment_method(order.payment_method.as_deref()),
            created_at: order.created_at,
            paid_at: order.approved_date,
            refunded_at: order.refunded_at,
        };
        let canonical_order = CanonicalOrder {
            external_id: order.order_id,
            total_amount: amount,
            currency,
            status: order.order_status,
        };

        Ok(CanonicalFragment {
            customer,
            affiliate: None,
            subscription: None,
            transaction: Some(transaction),
            order: Some(canonical_order),
        })
    }
}

/// subscription_canceled / subscription_late / subscription_renewed
pub struct SubscriptionHandler;

impl EventHandler for SubscriptionHandler {
    fn translate(&self, payload: &Value) -> Result<CanonicalFragment, HandlerError> {
        let order = parse_order(payload)?;
        let subscription = order
            .subscription
            .ok_or_else(|| HandlerError::MalformedPayload("missing Subscription".to_string()))?;
        let external_id = subscription
            .id
            .ok_or_else(|| HandlerError::MalformedPayload("missing Subscription.id".to_string()))?;

        let customer = order.customer.as_ref().map(customer_record);
        let plan = subscription.plan.as_ref();
        let status = map_subscription_status(subscription.status.as_deref().unwrap_or(""));

        let canonical = CanonicalSubscription {
            external_id,
            external_customer_id: customer
                .as_ref()
                .map(|c| c.external_id.clone())
                .unwrap_or_default(),
            external_product_id: order.product.as_ref().and_then(|p| p.product_id.clone()),
            external_price_id: None,
            product_name: order.product.as_ref().and_then(|p| p.product_name.clone()),
            status,
            trial_start: None,
            trial_end: None,
            amount: plan.and_then(|p| p.price).unwrap_or(0),
            currency: order
                .commissions
                .as_ref()
                .and_then(|c| c.currency.clone())
                .unwrap_or_else(|| "BRL".to_string()),
            billing_period: map_frequency(plan.and_then(|p| p.frequency.as_deref())),
            billing_interval: 1,
            started_at: subscription.start_date,
            current_period_start: subscription.start_date,
            current_period_end: subscription.next_payment,
            next_billing_at: subscription.next_payment,
            canceled_at: if status == crate::domain::models::canonical::SubscriptionStatus::Canceled
            {
                Some(Utc::now())
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_approved_order_keeps_minor_units() {
        let payload = json!({
            "order_id": "kw-100",
            "order_status": "paid",
            "payment_method": "pix",
            "Customer": {
                "full_name": "Cliente",
                "email": "cliente@example.com",
                "CPF": "111.222.333-44"
            },
            "Commissions": {"charge_amount": 4990, "currency": "BRL"}
        });

        let fragment = OrderHandler.translate(&payload).unwrap();
        assert_eq!(fragment.external_customer_id(), Some("cliente@example.com"));
        let txn = fragment.transaction.unwrap();
        assert_eq!(txn.amount, 4990);
        assert_eq!(txn.status, TransactionStatus::Succeeded);
    }

    #[test]
    fn test_subscription_cancellation_sets_canceled_at() {
        let payload = json!({
            "order_id": "kw-101",
            "Subscription": {
                "id": "sub-kw-1",
                "status": "canceled",
                "plan": {"frequency": "monthly", "price": 4990}
            }
        });

        let fragment = SubscriptionHandler.translate(&payload).unwrap();
        let sub = fragment.subscription.unwrap();
        assert_eq!(sub.external_id, "sub-kw-1");
        assert!(sub.canceled_at.is_some());
    }

    #[test]
    fn test_order_without_subscription_is_one_time() {
        let payload = json!({"order_id": "kw-102", "order_status": "paid"});
        let txn = OrderHandler.translate(&payload).unwrap().transaction.unwrap();
        assert_eq!(txn.txn_type, TransactionType::OneTimePayment);
    }
}
