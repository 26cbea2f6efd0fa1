// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod affiliate_repo_impl;
pub mod customer_repo_impl;
pub mod order_repo_impl;
pub mod platform_repo_impl;
pub mod product_repo_impl;
pub mod subscription_repo_impl;
pub mod sync_log_repo_impl;
pub mod transaction_repo_impl;
pub mod webhook_event_repo_impl;
