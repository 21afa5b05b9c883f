// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook ingestion server for provider delivery events.
//!
//! The provider calls back asynchronously with delivery facts (delivered,
//! bounced, deferred, spam, ...). This crate persists each event
//! idempotently and reconciles it into the matching message row through the
//! shared transition engine. The endpoint always answers success once
//! payloads are processed — even when individual payloads were dropped — to
//! prevent upstream retry storms.

pub mod auth;
pub mod handlers;
pub mod server;

pub use auth::AuthConfig;
pub use server::{router, start_server, ServerConfig, WebhookState};
