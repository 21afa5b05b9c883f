// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMTP relay delivery backend.
//!
//! Connects to the configured relay per send, optionally with STARTTLS and
//! credential authentication, and submits a multipart message. SMTP gives
//! no provider-assigned message id; the fixed sentinel `smtp-ok` is used
//! instead. Every transport or protocol error is classified retryable —
//! no finer classification is attempted.

use async_trait::async_trait;
use courier_config::model::ProviderConfig;
use courier_core::{DeliveryProvider, SendOutcome, SendRequest};
use lettre::address::Address;
use lettre::message::header::ContentType;
use lettre::message::{Attachment as MessageAttachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::{debug, warn};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Delivery backend submitting through an SMTP relay.
pub struct SmtpProvider {
    config: ProviderConfig,
}

impl SmtpProvider {
    pub fn new(config: ProviderConfig) -> Self {
        Self { config }
    }

    fn build_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, BoxError> {
        let mut builder = if self.config.smtp_use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.config.smtp_host)
        };
        builder = builder.port(self.config.smtp_port);
        if !self.config.smtp_username.is_empty() {
            builder = builder.credentials(Credentials::new(
                self.config.smtp_username.clone(),
                self.config.smtp_password.clone(),
            ));
        }
        Ok(builder.build())
    }

    fn build_message(&self, request: &SendRequest) -> Result<lettre::Message, BoxError> {
        let from = Mailbox::new(
            Some(self.config.sender_name.clone()),
            self.config.sender_email.parse::<Address>()?,
        );
        let to = Mailbox::new(
            request.to_name.clone(),
            request.to_email.parse::<Address>()?,
        );
        let builder = lettre::Message::builder()
            .from(from)
            .to(to)
            .subject(request.subject.clone());

        let mut alternative = MultiPart::alternative().build();
        if let Some(text) = &request.text_body {
            alternative = alternative.singlepart(SinglePart::plain(text.clone()));
        }
        if let Some(html) = &request.html_body {
            alternative = alternative.singlepart(SinglePart::html(html.clone()));
        }
        if request.text_body.is_none() && request.html_body.is_none() {
            alternative = alternative.singlepart(SinglePart::plain(String::new()));
        }

        let body = if request.attachments.is_empty() {
            alternative
        } else {
            let mut mixed = MultiPart::mixed().multipart(alternative);
            for attachment in &request.attachments {
                let content_type = ContentType::parse(&attachment.content_type)?;
                mixed = mixed.singlepart(
                    MessageAttachment::new(attachment.file_name.clone())
                        .body(attachment.content.clone(), content_type),
                );
            }
            mixed
        };

        Ok(builder.multipart(body)?)
    }

    async fn deliver(&self, request: &SendRequest) -> Result<(), BoxError> {
        let message = self.build_message(request)?;
        let transport = self.build_transport()?;
        transport.send(message).await?;
        Ok(())
    }
}

#[async_trait]
impl DeliveryProvider for SmtpProvider {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn send(&self, request: &SendRequest) -> SendOutcome {
        if !self.config.enable_sending {
            debug!(to = %request.to_email, "sending disabled, skipping relay submission");
            return SendOutcome::ok(Some("disabled".to_string()));
        }

        if self.config.smtp_host.trim().is_empty() {
            return SendOutcome::fail("smtp relay host is missing", false);
        }

        match self.deliver(request).await {
            Ok(()) => {
                debug!(to = %request.to_email, "smtp send accepted by relay");
                SendOutcome::ok(Some("smtp-ok".to_string()))
            }
            Err(e) => {
                warn!(to = %request.to_email, error = %e, "smtp send failed");
                SendOutcome::fail(format!("smtp send error: {e}"), true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::types::Attachment;

    fn test_config() -> ProviderConfig {
        ProviderConfig {
            mode: "smtp".to_string(),
            sender_name: "Courier".to_string(),
            sender_email: "no-reply@example.com".to_string(),
            smtp_host: "relay.example.com".to_string(),
            ..ProviderConfig::default()
        }
    }

    fn test_request() -> SendRequest {
        SendRequest {
            to_email: "tenant@example.com".to_string(),
            to_name: Some("Tenant".to_string()),
            subject: "Welcome".to_string(),
            html_body: Some("<p>welcome</p>".to_string()),
            text_body: Some("welcome".to_string()),
            template_id: None,
            template_params: None,
            attachments: vec![],
            tags: vec![],
        }
    }

    #[tokio::test]
    async fn missing_relay_host_is_a_permanent_failure() {
        let mut config = test_config();
        config.smtp_host = String::new();
        let provider = SmtpProvider::new(config);

        let outcome = provider.send(&test_request()).await;
        assert_eq!(outcome, SendOutcome::fail("smtp relay host is missing", false));
    }

    #[tokio::test]
    async fn disabled_sending_short_circuits_to_success() {
        let mut config = test_config();
        config.enable_sending = false;
        let provider = SmtpProvider::new(config);

        let outcome = provider.send(&test_request()).await;
        assert_eq!(outcome, SendOutcome::ok(Some("disabled".to_string())));
    }

    #[tokio::test]
    async fn invalid_recipient_address_is_a_retryable_failure() {
        let provider = SmtpProvider::new(test_config());
        let mut request = test_request();
        request.to_email = "not an address".to_string();

        match provider.send(&request).await {
            SendOutcome::Failure { retryable, error } => {
                assert!(retryable);
                assert!(error.starts_with("smtp send error:"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn message_builds_as_multipart_with_attachments() {
        let provider = SmtpProvider::new(test_config());
        let mut request = test_request();
        request.attachments.push(Attachment {
            file_name: "receipt.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            content: vec![0x25, 0x50],
        });

        let message = provider.build_message(&request).unwrap();
        let formatted = String::from_utf8_lossy(&message.formatted()).to_string();
        assert!(formatted.contains("multipart/mixed"));
        assert!(formatted.contains("multipart/alternative"));
        assert!(formatted.contains("receipt.pdf"));
        assert!(formatted.contains("application/pdf"));
        assert!(formatted.contains("Subject: Welcome"));
    }

    #[test]
    fn bad_attachment_content_type_fails_message_build() {
        let provider = SmtpProvider::new(test_config());
        let mut request = test_request();
        request.attachments.push(Attachment {
            file_name: "x".to_string(),
            content_type: "not a content type".to_string(),
            content: vec![1],
        });
        assert!(provider.build_message(&request).is_err());
    }
}
