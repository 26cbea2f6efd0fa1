// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "subscriptions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub platform_id: Uuid,
    pub customer_id: Uuid,
    pub product_id: Option<Uuid>,
    pub external_id: String,
    pub external_customer_id: String,
    pub external_product_id: Option<String>,
    pub external_price_id: Option<String>,
    pub status: String,
    pub trial_start: Option<ChronoDateTimeWithTimeZone>,
    pub trial_end: Option<ChronoDateTimeWithTimeZone>,
    pub amount: i64,
    pub currency: String,
    pub billing_period: String,
    pub billing_interval: i32,
    pub started_at: Option<ChronoDateTimeWithTimeZone>,
    pub current_period_start: Option<ChronoDateTimeWithTimeZone>,
    pub current_period_end: Option<ChronoDateTimeWithTimeZone>,
    pub next_billing_at: Option<ChronoDateTimeWithTimeZone>,
    pub canceled_at: Option<ChronoDateTimeWithTimeZone>,
    pub metadata: Option<Json>,
    pub created_at: ChronoDateTimeWithTimeZone,
    pub updated_at: ChronoDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
