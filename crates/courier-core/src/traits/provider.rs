// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery provider capability trait.

use async_trait::async_trait;

use crate::types::{SendOutcome, SendRequest};

/// A backend able to send one fully-resolved message through a concrete
/// transport.
///
/// Implementations perform network I/O only — no persistence. Errors never
/// propagate past this boundary: every failure mode is returned as a
/// [`SendOutcome::Failure`] with a retryability classification.
/// Cancellation is cooperative; dropping the `send` future aborts the
/// in-flight transmission.
#[async_trait]
pub trait DeliveryProvider: Send + Sync + 'static {
    /// Short name of this backend, for logs.
    fn name(&self) -> &str;

    /// Attempt to deliver one message.
    async fn send(&self, request: &SendRequest) -> SendOutcome;
}
