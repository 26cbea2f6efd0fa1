// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 规范化支付模型
//!
//! 所有平台适配器和Webhook处理器都把平台原生对象翻译成这里的
//! 平台无关形状。金额一律为整数最小货币单位，不允许浮点金额
//! 越过适配器边界。规范化记录由适配器或处理器创建后立即被
//! 持久化例程消费，自身从不被修改。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 规范化订阅状态枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// 试用期内
    TrialActive,
    /// 正常生效
    Active,
    /// 逾期未付
    PastDue,
    /// 已取消
    Canceled,
    /// 已过期
    Expired,
    /// 已暂停
    Paused,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::TrialActive => "trial_active",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Paused => "paused",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trial_active" => Ok(SubscriptionStatus::TrialActive),
            "active" => Ok(SubscriptionStatus::Active),
            "past_due" => Ok(SubscriptionStatus::PastDue),
            "canceled" => Ok(SubscriptionStatus::Canceled),
            "expired" => Ok(SubscriptionStatus::Expired),
            "paused" => Ok(SubscriptionStatus::Paused),
            _ => Err(()),
        }
    }
}

/// 计费周期枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingPeriod {
    Day,
    Week,
    Month,
    Year,
}

impl BillingPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingPeriod::Day => "day",
            BillingPeriod::Week => "week",
            BillingPeriod::Month => "month",
            BillingPeriod::Year => "year",
        }
    }
}

/// 规范化交易类型枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// 订阅扣款
    SubscriptionPayment,
    /// 一次性支付
    OneTimePayment,
    /// 退款
    Refund,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::SubscriptionPayment => "subscription_payment",
            TransactionType::OneTimePayment => "one_time_payment",
            TransactionType::Refund => "refund",
        }
    }
}

/// 规范化交易状态枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Succeeded,
    Failed,
    Refunded,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Succeeded => "succeeded",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Refunded => "refunded",
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "succeeded" => Ok(TransactionStatus::Succeeded),
            "failed" => Ok(TransactionStatus::Failed),
            "refunded" => Ok(TransactionStatus::Refunded),
            _ => Err(()),
        }
    }
}

/// 支付方式枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    Pix,
    Boleto,
    Paypal,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::DebitCard => "debit_card",
            PaymentMethod::Pix => "pix",
            PaymentMethod::Boleto => "boleto",
            PaymentMethod::Paypal => "paypal",
            PaymentMethod::Other => "other",
        }
    }
}

/// 规范化订阅
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalSubscription {
    /// 平台侧订阅ID
    pub external_id: String,
    /// 平台侧客户ID
    pub external_customer_id: String,
    /// 平台侧产品ID
    pub external_product_id: Option<String>,
    /// 平台侧价格ID
    pub external_price_id: Option<String>,
    /// 产品名称（懒创建产品记录时使用）
    pub product_name: Option<String>,
    /// 订阅状态
    pub status: SubscriptionStatus,
    /// 试用开始时间
    pub trial_start: Option<DateTime<Utc>>,
    /// 试用结束时间
    pub trial_end: Option<DateTime<Utc>>,
    /// 周期金额（最小货币单位）
    pub amount: i64,
    /// 货币代码
    pub currency: String,
    /// 计费周期
    pub billing_period: BillingPeriod,
    /// 周期间隔数
    pub billing_interval: i32,
    /// 订阅开始时间
    pub started_at: Option<DateTime<Utc>>,
    /// 当前周期开始
    pub current_period_start: Option<DateTime<Utc>>,
    /// 当前周期结束
    pub current_period_end: Option<DateTime<Utc>>,
    /// 下次扣款时间
    pub next_billing_at: Option<DateTime<Utc>>,
    /// 取消时间
    pub canceled_at: Option<DateTime<Utc>>,
    /// 自由格式元数据
    pub metadata: Option<serde_json::Value>,
}

/// 规范化交易
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalTransaction {
    /// 平台侧交易ID
    pub external_id: String,
    /// 平台侧客户ID
    pub external_customer_id: Option<String>,
    /// 平台侧订阅ID
    pub external_subscription_id: Option<String>,
    /// 平台侧发票ID
    pub external_invoice_id: Option<String>,
    /// 交易类型
    pub txn_type: TransactionType,
    /// 交易状态
    pub status: TransactionStatus,
    /// 金额（最小货币单位）
    pub amount: i64,
    /// 货币代码
    pub currency: String,
    /// 支付方式
    pub payment_method: PaymentMethod,
    /// 平台侧创建时间
    pub created_at: Option<DateTime<Utc>>,
    /// 支付完成时间
    pub paid_at: Option<DateTime<Utc>>,
    /// 退款时间
    pub refunded_at: Option<DateTime<Utc>>,
}

impl CanonicalTransaction {
    /// 交易是否应计入收入侧副作用
    ///
    /// 只有成功且非退款的交易才累加客户终身消费和联盟伙伴业绩。
    pub fn counts_as_revenue(&self) -> bool {
        self.status == TransactionStatus::Succeeded && self.txn_type != TransactionType::Refund
    }
}

/// 规范化客户
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalCustomer {
    /// 平台侧客户ID
    pub external_id: String,
    /// 姓名
    pub name: Option<String>,
    /// 邮箱
    pub email: Option<String>,
    /// 证件/税务标识
    pub document: Option<String>,
    /// 电话
    pub phone: Option<String>,
    /// 街道地址
    pub street: Option<String>,
    /// 城市
    pub city: Option<String>,
    /// 州/省
    pub state: Option<String>,
    /// 国家
    pub country: Option<String>,
    /// 邮编
    pub postal_code: Option<String>,
    /// 平台侧创建时间
    pub created_at: Option<DateTime<Utc>>,
    /// 自由格式元数据
    pub metadata: Option<serde_json::Value>,
}

/// 规范化联盟伙伴
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalAffiliate {
    /// 平台侧联盟伙伴ID
    pub external_id: String,
    /// 姓名
    pub name: Option<String>,
    /// 邮箱
    pub email: Option<String>,
}

/// 规范化订单
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalOrder {
    /// 平台侧订单ID
    pub external_id: String,
    /// 订单总额（最小货币单位）
    pub total_amount: i64,
    /// 货币代码
    pub currency: String,
    /// 订单状态（平台原生文案，仅作记录）
    pub status: Option<String>,
}

/// 规范化片段
///
/// 一次Webhook投递翻译出的所有规范化记录。处理器产出片段，
/// 持久化例程按固定顺序消费：客户 → 联盟伙伴 → 订阅 → 交易 →
/// 副作用 → 订单。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanonicalFragment {
    /// 客户记录
    pub customer: Option<CanonicalCustomer>,
    /// 联盟伙伴记录（归因是尽力而为的）
    pub affiliate: Option<CanonicalAffiliate>,
    /// 订阅记录
    pub subscription: Option<CanonicalSubscription>,
    /// 交易记录
    pub transaction: Option<CanonicalTransaction>,
    /// 订单记录
    pub order: Option<CanonicalOrder>,
}

impl CanonicalFragment {
    /// 片段中可用的平台侧客户ID
    ///
    /// 客户记录缺失或外部ID为空串都视为不可用。
    pub fn external_customer_id(&self) -> Option<&str> {
        self.customer
            .as_ref()
            .map(|c| c.external_id.as_str())
            .filter(|id| !id.is_empty())
    }
}
