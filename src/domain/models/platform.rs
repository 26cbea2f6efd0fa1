// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// 支付平台实体
///
/// 表示一个已接入的外部支付平台。平台通过slug寻址，
/// 凭证单独存放在platform_credentials中。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Platform {
    /// 平台唯一标识符
    pub id: Uuid,
    /// 平台显示名称
    pub name: String,
    /// 平台标识串，用于适配器路由（stripe/hotmart/kiwify）
    pub slug: String,
    /// 是否启用
    pub enabled: bool,
    /// 是否仅走Webhook（对账调度器完全跳过此类平台）
    pub webhook_only: bool,
    /// 平台结算基准货币
    pub base_currency: String,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

/// 平台凭证类型
///
/// 每个平台要求的凭证组合不同，缺失必需凭证属于致命的
/// 未配置错误，不做重试。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialType {
    /// API密钥（Stripe: api_secret_key）
    ApiSecretKey,
    /// OAuth客户端ID（Hotmart）
    ClientId,
    /// OAuth客户端密钥（Hotmart）
    ClientSecret,
    /// Basic认证令牌（Hotmart）
    BasicToken,
    /// 普通API Key（Kiwify）
    ApiKey,
    /// Webhook签名密钥（入口HMAC校验，可选）
    WebhookSecret,
}

impl CredentialType {
    /// 凭证类型的存储标识
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialType::ApiSecretKey => "api_secret_key",
            CredentialType::ClientId => "client_id",
            CredentialType::ClientSecret => "client_secret",
            CredentialType::BasicToken => "basic_token",
            CredentialType::ApiKey => "api_key",
            CredentialType::WebhookSecret => "webhook_secret",
        }
    }
}

impl FromStr for CredentialType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "api_secret_key" => Ok(CredentialType::ApiSecretKey),
            "client_id" => Ok(CredentialType::ClientId),
            "client_secret" => Ok(CredentialType::ClientSecret),
            "basic_token" => Ok(CredentialType::BasicToken),
            "api_key" => Ok(CredentialType::ApiKey),
            "webhook_secret" => Ok(CredentialType::WebhookSecret),
            _ => Err(()),
        }
    }
}

/// 已解密的平台凭证
///
/// 凭证的加密与解密属于外部关注点，仓库边界返回的已经是明文。
#[derive(Debug, Clone)]
pub struct PlatformCredential {
    /// 凭证唯一标识符
    pub id: Uuid,
    /// 所属平台ID
    pub platform_id: Uuid,
    /// 凭证类型
    pub credential_type: CredentialType,
    /// 凭证内容（明文）
    pub secret: String,
}
