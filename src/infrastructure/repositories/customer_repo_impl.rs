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

use crate::domain::models::canonical::CanonicalCustomer;
use crate::domain::repositories::customer_repository::{CustomerRecord, CustomerRepository};
use crate::domain::repositories::webhook_event_repository::RepositoryError;
use crate::infrastructure::database::entities::customer as customer_entity;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set,
};
use std::sync::Arc;
use uuid::Uuid;

/// 客户仓库实现
///
/// upsert以 (platform_id, external_id) 为键：已存在则更新画像
/// 字段，不触碰lifetime_spend；消费累计走专用的原子自增。
#[derive(Clone)]
pub struct CustomerRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl CustomerRepositoryImpl {
    /// 创建新的客户仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<customer_entity::Model> for CustomerRecord {
    fn from(model: customer_entity::Model) -> Self {
        Self {
            id: model.id,
            external_id: model.external_id,
            name: model.name,
            email: model.email,
            lifetime_spend: model.lifetime_spend,
        }
    }
}

#[async_trait]
impl CustomerRepository for CustomerRepositoryImpl {
    async fn find_by_external(
        &self,
        platform_id: Uuid,
        external_id: &str,
    ) -> Result<Option<CustomerRecord>, RepositoryError> {
        let model = customer_entity::Entity::find()
            .filter(customer_entity::Column::PlatformId.eq(platform_id))
            .filter(customer_entity::Column::ExternalId.eq(external_id))
            .one(self.db.as_ref())
            .await?;

        Ok(model.map(Into::into))
    }

    async fn upsert(
        &self,
        platform_id: Uuid,
        customer: &CanonicalCustomer,
    ) -> Result<CustomerRecord, RepositoryError> {
        let existing = customer_entity::Entity::find()
            .filter(customer_entity::Column::PlatformId.eq(platform_id))
            .filter(customer_entity::Column::ExternalId.eq(customer.external_id.as_str()))
            .one(self.db.as_ref())
            .await?;

        if let Some(model) = existing {
            let mut active: customer_entity::ActiveModel = model.into();
            active.name = Set(customer.name.clone());
            active.email = Set(customer.email.clone());
            active.document = Set(customer.document.clone());
            active.phone = Set(customer.phone.clone());
            active.street = Set(customer.street.clone());
            active.city = Set(customer.city.clone());
            active.state = Set(customer.state.clone());
            active.country = Set(customer.country.clone());
            active.postal_code = Set(customer.postal_code.clone());
            active.external_created_at = Set(customer.created_at.map(Into::into));
            active.metadata = Set(customer.metadata.clone());
            active.updated_at = Set(Utc::now().into());

            let updated = active.update(self.db.as_ref()).await?;
            return Ok(updated.into());
        }

        let now = Utc::now();
        let active = customer_entity::ActiveModel {
            id: Set(Uuid::new_v4()),
            platform_id: Set(platform_id),
            external_id: Set(customer.external_id.clone()),
            name: Set(customer.name.clone()),
            email: Set(customer.email.clone()),
            document: Set(customer.document.clone()),
            phone: Set(customer.phone.clone()),
            street: Set(customer.street.clone()),
            city: Set(customer.city.clone()),
            state: Set(customer.state.clone()),
            country: Set(customer.country.clone()),
            postal_code: Set(customer.postal_code.clone()),
            lifetime_spend: Set(0),
            external_created_at: Set(customer.created_at.map(Into::into)),
            metadata: Set(customer.metadata.clone()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let inserted = active.insert(self.db.as_ref()).await?;
        Ok(inserted.into())
    }

    async fn increment_lifetime_spend(
        &self,
        id: Uuid,
        amount: i64,
    ) -> Result<(), RepositoryError> {
        customer_entity::Entity::update_many()
            .col_expr(
                customer_entity::Column::LifetimeSpend,
                Expr::col(customer_entity::Column::LifetimeSpend).add(amount),
            )
            .col_expr(
                customer_entity::Column::UpdatedAt,
                Expr::value(chrono::DateTime::<chrono::FixedOffset>::from(Utc::now())),
            )
            .filter(customer_entity::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await?;

        Ok(())
    }

    async fn update_contact(
        &self,
        id: Uuid,
        name: Option<String>,
        email: Option<String>,
    ) -> Result<(), RepositoryError> {
        let model = customer_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let mut active: customer_entity::ActiveModel = model.into();
        active.name = Set(name);
        active.email = Set(email);
        active.updated_at = Set(Utc::now().into());
        active.update(self.db.as_ref()).await?;

        Ok(())
    }
}
