// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `courier enqueue` command implementation.
//!
//! Operator-facing way to queue one message without going through a calling
//! service: either inline content (`--subject`/`--html`/`--text`) or a
//! provider template (`--template-id`/`--params`). Prints the generated
//! message id on success.

use clap::Args;
use courier_config::model::CourierConfig;
use courier_core::tags::UseCaseTag;
use courier_core::CourierError;
use courier_delivery::QueueService;
use courier_storage::Database;

/// Arguments for `courier enqueue`.
#[derive(Args, Debug)]
pub struct EnqueueArgs {
    /// Recipient address.
    #[arg(long)]
    pub to: String,

    /// Recipient display name.
    #[arg(long)]
    pub to_name: Option<String>,

    /// Subject line (inline mode).
    #[arg(long)]
    pub subject: Option<String>,

    /// HTML body (inline mode).
    #[arg(long)]
    pub html: Option<String>,

    /// Plain-text body (inline mode).
    #[arg(long)]
    pub text: Option<String>,

    /// Provider-side template id (template mode).
    #[arg(long)]
    pub template_id: Option<i64>,

    /// Template parameters as a JSON object (template mode).
    #[arg(long)]
    pub params: Option<String>,

    /// Use-case tag, repeatable (e.g. --tag billing-invoice-sent).
    #[arg(long = "tag")]
    pub tags: Vec<UseCaseTag>,
}

/// Runs the `courier enqueue` command.
pub async fn run_enqueue(config: CourierConfig, args: EnqueueArgs) -> Result<(), CourierError> {
    let db = Database::open(&config.storage.database_path).await?;
    let service = QueueService::new(db.clone(), config.provider.context_tags.clone());

    let id = match args.template_id {
        Some(template_id) => {
            let params = match &args.params {
                Some(raw) => serde_json::from_str(raw)
                    .map_err(|e| CourierError::Config(format!("--params is not valid JSON: {e}")))?,
                None => serde_json::json!({}),
            };
            service
                .queue_template(
                    &args.to,
                    args.to_name.as_deref(),
                    template_id,
                    &params,
                    vec![],
                    &args.tags,
                )
                .await?
        }
        None => {
            let subject = args.subject.as_deref().ok_or_else(|| {
                CourierError::Config("--subject is required for inline messages".to_string())
            })?;
            service
                .queue_inline(
                    &args.to,
                    args.to_name.as_deref(),
                    subject,
                    args.html.as_deref(),
                    args.text.as_deref(),
                    vec![],
                    &args.tags,
                )
                .await?
        }
    };

    db.close().await?;
    println!("{id}");
    Ok(())
}
