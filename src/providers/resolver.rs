// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::platform::{CredentialType, Platform};
use crate::domain::repositories::platform_repository::PlatformRepository;
use crate::providers::adapter::{ProviderAdapter, ProviderError};
use crate::providers::hotmart::HotmartAdapter;
use crate::providers::kiwify::KiwifyAdapter;
use crate::providers::stripe::StripeAdapter;
use std::collections::HashMap;
use std::sync::Arc;

/// 平台解析器
///
/// 给定平台，加载其解密后的凭证并构造对应的适配器实例。
/// 缺失必需凭证或slug未接入都是致命的未配置错误，不重试。
pub struct ProviderResolver {
    platform_repo: Arc<dyn PlatformRepository>,
}

impl ProviderResolver {
    /// 创建新的平台解析器实例
    pub fn new(platform_repo: Arc<dyn PlatformRepository>) -> Self {
        Self { platform_repo }
    }

    /// 根据slug解析适配器
    pub async fn resolve_slug(&self, slug: &str) -> Result<Arc<dyn ProviderAdapter>, ProviderError> {
        let platform = self
            .platform_repo
            .find_by_slug(slug)
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?
            .ok_or_else(|| ProviderError::NotConfigured(format!("unknown platform '{slug}'")))?;
        self.resolve(&platform).await
    }

    /// 为平台构造适配器
    pub async fn resolve(
        &self,
        platform: &Platform,
    ) -> Result<Arc<dyn ProviderAdapter>, ProviderError> {
        let credentials = self
            .platform_repo
            .list_credentials(platform.id)
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let secrets: HashMap<CredentialType, String> = credentials
            .into_iter()
            .map(|c| (c.credential_type, c.secret))
            .collect();

        let require = |kind: CredentialType| -> Result<String, ProviderError> {
            secrets.get(&kind).cloned().ok_or_else(|| {
                ProviderError::NotConfigured(format!(
                    "platform '{}' is missing credential '{}'",
                    platform.slug,
                    kind.as_str()
                ))
            })
        };

        match platform.slug.as_str() {
            "stripe" => Ok(Arc::new(StripeAdapter::new(require(
                CredentialType::ApiSecretKey,
            )?))),
            "hotmart" => Ok(Arc::new(HotmartAdapter::new(
                require(CredentialType::ClientId)?,
                require(CredentialType::ClientSecret)?,
                require(CredentialType::BasicToken)?,
            ))),
            "kiwify" => Ok(Arc::new(KiwifyAdapter::new(require(
                CredentialType::ApiKey,
            )?))),
            other => Err(ProviderError::NotConfigured(format!(
                "no adapter registered for platform '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::platform::PlatformCredential;
    use crate::domain::repositories::webhook_event_repository::RepositoryError;
    use async_trait::async_trait;
    use chrono::Utc;
    use uuid::Uuid;

    struct MockPlatformRepo {
        platform: Platform,
        credentials: Vec<PlatformCredential>,
    }

    #[async_trait]
    impl PlatformRepository for MockPlatformRepo {
        async fn find_by_id(&self, _id: Uuid) -> Result<Option<Platform>, RepositoryError> {
            Ok(Some(self.platform.clone()))
        }

        async fn find_by_slug(&self, slug: &str) -> Result<Option<Platform>, RepositoryError> {
            if slug == self.platform.slug {
                Ok(Some(self.platform.clone()))
            } else {
                Ok(None)
            }
        }

        async fn list_enabled(&self) -> Result<Vec<Platform>, RepositoryError> {
            Ok(vec![self.platform.clone()])
        }

        async fn list_credentials(
            &self,
            _platform_id: Uuid,
        ) -> Result<Vec<PlatformCredential>, RepositoryError> {
            Ok(self.credentials.clone())
        }
    }

    fn platform(slug: &str) -> Platform {
        Platform {
            id: Uuid::new_v4(),
            name: slug.to_string(),
            slug: slug.to_string(),
            enabled: true,
            webhook_only: false,
            base_currency: "USD".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn credential(platform_id: Uuid, kind: CredentialType) -> PlatformCredential {
        PlatformCredential {
            id: Uuid::new_v4(),
            platform_id,
            credential_type: kind,
            secret: "secret".to_string(),
        }
    }

    #[tokio::test]
    async fn test_resolves_stripe_adapter() {
        let p = platform("stripe");
        let repo = MockPlatformRepo {
            credentials: vec![credential(p.id, CredentialType::ApiSecretKey)],
            platform: p,
        };
        let resolver = ProviderResolver::new(Arc::new(repo));
        let adapter = resolver.resolve_slug("stripe").await.unwrap();
        assert_eq!(adapter.slug(), "stripe");
    }

    #[tokio::test]
    async fn test_missing_credential_is_not_configured() {
        let p = platform("hotmart");
        let repo = MockPlatformRepo {
            credentials: vec![credential(p.id, CredentialType::ClientId)],
            platform: p.clone(),
        };
        let resolver = ProviderResolver::new(Arc::new(repo));
        let Err(err) = resolver.resolve(&p).await else {
            panic!("incomplete credentials must not resolve");
        };
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_unknown_slug_is_not_configured() {
        let p = platform("stripe");
        let repo = MockPlatformRepo {
            credentials: vec![],
            platform: p,
        };
        let resolver = ProviderResolver::new(Arc::new(repo));
        let Err(err) = resolver.resolve_slug("paypal").await else {
            panic!("unknown slug must not resolve");
        };
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }
}
