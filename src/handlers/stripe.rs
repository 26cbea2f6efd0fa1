// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! Stripe原生事件处理器
//!
//! Stripe的Webhook信封是`{"type": ..., "data": {"object": {...}}}`，
//! 其中object与REST API返回的资源同构，直接复用适配器侧的
//! 反序列化与规范化函数。

use crate::domain::models::canonical::{CanonicalCustomer, CanonicalFragment};
use crate::handlers::{EventHandler, HandlerError};
use crate::providers::stripe::{
    normalize_charge, normalize_customer, normalize_subscription, StripeCharge, StripeCustomer,
    StripeSubscription,
};
use serde_json::Value;

fn event_object(payload: &Value) -> Result<Value, HandlerError> {
    payload
        .get("data")
        .and_then(|d| d.get("object"))
        .cloned()
        .ok_or_else(|| HandlerError::MalformedPayload("missing data.object".to_string()))
}

/// 仅含外部ID的客户占位记录，用于建立归属关系
fn customer_stub(external_id: &str) -> CanonicalCustomer {
    CanonicalCustomer {
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
    }
}

/// customer.subscription.created / updated / deleted
pub struct SubscriptionHandler;

impl EventHandler for SubscriptionHandler {
    fn translate(&self, payload: &Value) -> Result<CanonicalFragment, HandlerError> {
        let sub: StripeSubscription = serde_json::from_value(event_object(payload)?)?;
        let subscription = normalize_subscription(sub);
        Ok(CanonicalFragment {
            customer: Some(customer_stub(&subscription.external_customer_id)),
            subscription: Some(subscription),
            ..Default::default()
        })
    }
}

/// charge.succeeded / charge.failed / charge.refunded
pub struct ChargeHandler;

impl EventHandler for ChargeHandler {
    fn translate(&self, payload: &Value) -> Result<CanonicalFragment, HandlerError> {
        let charge: StripeCharge = serde_json::from_value(event_object(payload)?)?;
        let transaction = normalize_charge(charge);
        let customer = transaction
            .external_customer_id
            .as_deref()
            .map(customer_stub);
        Ok(CanonicalFragment {
            customer,
            transaction: Some(transaction),
            ..Default::default()
        })
    }
}

/// customer.created / customer.updated
pub struct CustomerHandler;

impl EventHandler for CustomerHandler {
    fn translate(&self, payload: &Value) -> Result<CanonicalFragment, HandlerError> {
        let customer: StripeCustomer = serde_json::from_value(event_object(payload)?)?;
        Ok(CanonicalFragment {
            customer: Some(normalize_customer(customer)),
            ..Default::default()
        })
    }
}
