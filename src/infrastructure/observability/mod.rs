// Copyright (c) 2025 Kirky.X
//
// Licensed under MIT License. See LICENSE file for details.

pub mod metrics;
