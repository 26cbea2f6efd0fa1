// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 处理器注册表
//!
//! 启动时一次性构建(平台slug, 事件类型) → 处理器的查找表，
//! 运行期只查表，不做类型判断。未接入的组合是终态错误。
//! 合成事件不走注册表，由事件工作器按签名标记直通合成处理器。

use crate::handlers::{hotmart, kiwify, stripe, EventHandler, HandlerError};
use std::collections::HashMap;
use std::sync::Arc;

pub struct HandlerRegistry {
    handlers: HashMap<(String, String), Arc<dyn EventHandler>>,
}

impl HandlerRegistry {
    /// 构建内置平台的完整注册表
    pub fn with_builtin_handlers() -> Self {
        let mut registry = Self {
            handlers: HashMap::new(),
        };

        let stripe_subscription: Arc<dyn EventHandler> = Arc::new(stripe::SubscriptionHandler);
        for event in [
            "customer.subscription.created",
            "customer.subscription.updated",
            "customer.subscription.deleted",
        ] {
            registry.register("stripe", event, Arc::clone(&stripe_subscription));
        }
        let stripe_charge: Arc<dyn EventHandler> = Arc::new(stripe::ChargeHandler);
        for event in ["charge.succeeded", "charge.failed", "charge.refunded"] {
            registry.register("stripe", event, Arc::clone(&stripe_charge));
        }
        let stripe_customer: Arc<dyn EventHandler> = Arc::new(stripe::CustomerHandler);
        for event in ["customer.created", "customer.updated"] {
            registry.register("stripe", event, Arc::clone(&stripe_customer));
        }

        let hotmart_purchase: Arc<dyn EventHandler> = Arc::new(hotmart::PurchaseHandler);
        for event in [
            "PURCHASE_APPROVED",
            "PURCHASE_COMPLETE",
            "PURCHASE_REFUNDED",
            "PURCHASE_CHARGEBACK",
        ] {
            registry.register("hotmart", event, Arc::clone(&hotmart_purchase));
        }
        let hotmart_subscription: Arc<dyn EventHandler> = Arc::new(hotmart::SubscriptionHandler);
        for event in ["SUBSCRIPTION_CANCELLATION", "SWITCH_PLAN"] {
            registry.register("hotmart", event, Arc::clone(&hotmart_subscription));
        }

        let kiwify_order: Arc<dyn EventHandler> = Arc::new(kiwify::OrderHandler);
        for event in [
            "order_approved",
            "order_refunded",
            "order_rejected",
            "pix_created",
        ] {
            registry.register("kiwify", event, Arc::clone(&kiwify_order));
        }
        let kiwify_subscription: Arc<dyn EventHandler> = Arc::new(kiwify::SubscriptionHandler);
        for event in [
            "subscription_canceled",
            "subscription_late",
            "subscription_renewed",
        ] {
            registry.register("kiwify", event, Arc::clone(&kiwify_subscription));
        }

        registry
    }

    /// 注册处理器，重复注册以后者为准
    pub fn register(&mut self, slug: &str, event_type: &str, handler: Arc<dyn EventHandler>) {
        self.handlers
            .insert((slug.to_string(), event_type.to_string()), handler);
    }

    /// 查找处理器
    pub fn resolve(
        &self,
        slug: &str,
        event_type: &str,
    ) -> Result<Arc<dyn EventHandler>, HandlerError> {
        self.handlers
            .get(&(slug.to_string(), event_type.to_string()))
            .cloned()
            .ok_or_else(|| HandlerError::UnmappedEvent {
                slug: slug.to_string(),
                event_type: event_type.to_string(),
            })
    }

    /// 已接入的组合数
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_resolves_native_keys() {
        let registry = HandlerRegistry::with_builtin_handlers();
        assert!(registry.resolve("stripe", "charge.succeeded").is_ok());
        assert!(registry.resolve("stripe", "customer.created").is_ok());
        assert!(registry.resolve("hotmart", "PURCHASE_APPROVED").is_ok());
        assert!(registry.resolve("kiwify", "order_approved").is_ok());
    }

    #[test]
    fn test_unknown_combination_is_fatal() {
        let registry = HandlerRegistry::with_builtin_handlers();
        let Err(err) = registry.resolve("stripe", "payout.created") else {
            panic!("unmapped event type must not resolve");
        };
        assert!(err.is_fatal());
        assert!(matches!(err, HandlerError::UnmappedEvent { .. }));
    }
}
