// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub platform_id: Uuid,
    pub customer_id: Uuid,
    pub order_id: Option<Uuid>,
    pub external_id: String,
    pub external_customer_id: Option<String>,
    pub external_subscription_id: Option<String>,
    pub external_invoice_id: Option<String>,
    pub txn_type: String,
    pub status: String,
    pub amount: i64,
    pub currency: String,
    pub payment_method: String,
    pub external_created_at: Option<ChronoDateTimeWithTimeZone>,
    pub paid_at: Option<ChronoDateTimeWithTimeZone>,
    pub refunded_at: Option<ChronoDateTimeWithTimeZone>,
    pub created_at: ChronoDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
