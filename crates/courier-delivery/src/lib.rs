// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Enqueue service and dispatcher loop for the Courier message queue.
//!
//! [`QueueService`] is the write-side entry point other services use to
//! queue messages. [`Dispatcher`] is the background loop that claims
//! eligible messages under a lease, pushes them through the configured
//! delivery provider, and applies outcomes via the transition engine.

pub mod dispatcher;
pub mod service;

pub use dispatcher::Dispatcher;
pub use service::QueueService;
