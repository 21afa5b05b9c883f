// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tag catalog and normalization.
//!
//! Messages carry two independent tag lists: context tags supplied by
//! deployment configuration, and use-case tags resolved from the flag set a
//! caller passes when enqueueing. Both are stored normalized: trimmed,
//! empty entries dropped, case-insensitively deduplicated with the first
//! spelling preserved.

use std::collections::HashSet;

use strum::{Display, EnumString};

/// Caller-facing use-case flags, resolved to stable string labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum UseCaseTag {
    // Auth / security
    AuthResetPassword,
    AuthConfirmEmail,
    AuthPasswordChanged,

    // Access / invitations
    AccessInviteUser,

    // Billing / payments
    BillingInvoiceSent,
    BillingReceiptSent,
    BillingPaymentReminder,
    BillingPaymentFailed,

    // Rental / contracts
    RentalRentReceiptSent,
    RentalContractSent,
    RentalContractUpdated,
    RentalSignatureReminder,

    // Inventory reports
    InventoryReportSent,
    InventoryReportSignatureReminder,
    InventoryReportUpdated,

    // Generic notifications
    NotificationWelcome,
    NotificationSystem,
}

/// Resolve a caller's flag set to its normalized label list.
pub fn resolve_use_case_tags(tags: &[UseCaseTag]) -> Vec<String> {
    normalize_tags(tags.iter().map(ToString::to_string))
}

/// Normalize a tag sequence: trim, drop empties, dedupe case-insensitively.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if tag.is_empty() {
            continue;
        }
        if seen.insert(tag.to_lowercase()) {
            out.push(tag.to_string());
        }
    }
    out
}

/// Merge context and use-case tags into the single list sent to providers.
pub fn merge_tags(context: &[String], use_case: &[String]) -> Vec<String> {
    normalize_tags(context.iter().chain(use_case))
}

/// Parse a comma-separated tag column into a normalized list.
pub fn parse_csv(csv: &str) -> Vec<String> {
    normalize_tags(csv.split(','))
}

/// Join a tag list back into its storage form.
pub fn join_csv(tags: &[String]) -> String {
    tags.join(",")
}
