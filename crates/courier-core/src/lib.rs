// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Courier message queue.
//!
//! This crate holds the domain types shared across the workspace: the
//! delivery status machine, the backoff schedule, the status-transition
//! engine driven by send outcomes and provider delivery events, the tag
//! catalog, and the [`DeliveryProvider`] capability trait that concrete
//! transports implement.

pub mod backoff;
pub mod error;
pub mod tags;
pub mod traits;
pub mod transition;
pub mod types;

pub use error::CourierError;
pub use traits::DeliveryProvider;
pub use types::{
    Attachment, DeliveryEvent, DeliveryStatus, Message, MessageContent, SendOutcome, SendRequest,
};
