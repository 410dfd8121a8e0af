// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod metrics;
pub mod models;
pub mod schema;
pub mod services;
pub mod store;
pub mod validation;

#[macro_use]
extern crate diesel;
