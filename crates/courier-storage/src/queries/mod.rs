// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for messages, attachments, and delivery events.

pub mod events;
pub mod messages;
