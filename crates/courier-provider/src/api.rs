// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP API delivery backend.
//!
//! Speaks the Brevo-compatible transactional wire format: a JSON POST to
//! `/v3/smtp/email` authenticated by an `api-key` header. The `tags` field
//! is omitted entirely when empty (the API rejects an empty-but-present
//! list), attachments are base64-encoded, and sandbox deployments mark
//! every send with an `X-Sib-Sandbox: drop` header.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use courier_config::model::ProviderConfig;
use courier_core::{CourierError, DeliveryProvider, SendOutcome, SendRequest};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Serialize)]
struct ApiParty<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    email: &'a str,
}

#[derive(Serialize)]
struct ApiAttachment {
    name: String,
    content: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiSendPayload<'a> {
    sender: ApiParty<'a>,
    to: Vec<ApiParty<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    html_content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text_content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    template_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<&'a serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attachment: Option<Vec<ApiAttachment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    headers: Option<HashMap<&'static str, &'static str>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSendResponse {
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    message_ids: Option<Vec<String>>,
}

/// Delivery backend for the provider's transactional HTTP API.
pub struct HttpApiProvider {
    client: reqwest::Client,
    config: ProviderConfig,
    base_url: String,
}

impl HttpApiProvider {
    /// Build the reqwest client with the configured request timeout.
    pub fn new(config: ProviderConfig) -> Result<Self, CourierError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_seconds))
            .build()
            .map_err(|e| CourierError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        let base_url = config.api_base_url.trim_end_matches('/').to_string();
        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    #[cfg(test)]
    fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn build_payload<'a>(&'a self, request: &'a SendRequest) -> ApiSendPayload<'a> {
        let sender = ApiParty {
            name: Some(self.config.sender_name.as_str()),
            email: self.config.sender_email.as_str(),
        };
        let to = vec![ApiParty {
            name: request.to_name.as_deref(),
            email: request.to_email.as_str(),
        }];
        let tags = (!request.tags.is_empty()).then_some(request.tags.as_slice());
        let headers = self
            .config
            .sandbox
            .then(|| HashMap::from([("X-Sib-Sandbox", "drop")]));

        match request.template_id {
            Some(template_id) => ApiSendPayload {
                sender,
                to,
                subject: None,
                html_content: None,
                text_content: None,
                template_id: Some(template_id),
                params: request.template_params.as_ref(),
                tags,
                attachment: None,
                headers,
            },
            None => ApiSendPayload {
                sender,
                to,
                subject: Some(request.subject.as_str()),
                html_content: request.html_body.as_deref(),
                text_content: request.text_body.as_deref(),
                template_id: None,
                params: None,
                tags,
                attachment: (!request.attachments.is_empty()).then(|| {
                    request
                        .attachments
                        .iter()
                        .map(|a| ApiAttachment {
                            name: a.file_name.clone(),
                            content: BASE64.encode(&a.content),
                        })
                        .collect()
                }),
                headers,
            },
        }
    }
}

#[async_trait]
impl DeliveryProvider for HttpApiProvider {
    fn name(&self) -> &str {
        "api"
    }

    async fn send(&self, request: &SendRequest) -> SendOutcome {
        if !self.config.enable_sending {
            debug!(to = %request.to_email, "sending disabled, skipping network call");
            return SendOutcome::ok(Some("disabled".to_string()));
        }

        let Some(api_key) = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
        else {
            return SendOutcome::fail("api key is missing", false);
        };

        let payload = self.build_payload(request);
        let url = format!("{}/v3/smtp/email", self.base_url);

        let response = match self
            .client
            .post(&url)
            .header("api-key", api_key)
            .header("accept", "application/json")
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!(to = %request.to_email, "api request timed out");
                return SendOutcome::fail(format!("api timeout: {e}"), true);
            }
            Err(e) => {
                warn!(to = %request.to_email, error = %e, "api transport error");
                return SendOutcome::fail(format!("api transport error: {e}"), true);
            }
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.is_success() {
            let id = serde_json::from_str::<ApiSendResponse>(&body)
                .ok()
                .and_then(|dto| {
                    dto.message_id
                        .or_else(|| dto.message_ids.and_then(|ids| ids.into_iter().next()))
                });
            debug!(to = %request.to_email, provider_message_id = ?id, "api send accepted");
            return SendOutcome::ok(id);
        }

        // Transient statuses retry on the backoff schedule; every other 4xx
        // is a payload error that will never succeed.
        let retryable = matches!(status.as_u16(), 408 | 429 | 500 | 502 | 503 | 504);
        warn!(to = %request.to_email, status = status.as_u16(), retryable, "api send failed");
        SendOutcome::fail(format!("api error {}: {}", status.as_u16(), body), retryable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::types::Attachment;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> ProviderConfig {
        ProviderConfig {
            api_key: Some("test-api-key".to_string()),
            sender_name: "Courier".to_string(),
            sender_email: "no-reply@example.com".to_string(),
            ..ProviderConfig::default()
        }
    }

    fn test_provider(server: &MockServer, config: ProviderConfig) -> HttpApiProvider {
        HttpApiProvider::new(config).unwrap().with_base_url(&server.uri())
    }

    fn test_request() -> SendRequest {
        SendRequest {
            to_email: "tenant@example.com".to_string(),
            to_name: Some("Tenant".to_string()),
            subject: "Welcome".to_string(),
            html_body: Some("<p>welcome</p>".to_string()),
            text_body: None,
            template_id: None,
            template_params: None,
            attachments: vec![],
            tags: vec![],
        }
    }

    async fn mount_ok(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path("/v3/smtp/email"))
            .and(header("api-key", "test-api-key"))
            .respond_with(ResponseTemplate::new(201).set_body_json(body))
            .mount(server)
            .await;
    }

    async fn sent_body(server: &MockServer) -> serde_json::Value {
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        serde_json::from_slice(&requests[0].body).unwrap()
    }

    #[tokio::test]
    async fn success_extracts_message_id() {
        let server = MockServer::start().await;
        mount_ok(&server, serde_json::json!({"messageId": "abc123"})).await;

        let outcome = test_provider(&server, test_config()).send(&test_request()).await;
        assert_eq!(outcome, SendOutcome::ok(Some("abc123".to_string())));
    }

    #[tokio::test]
    async fn success_falls_back_to_first_of_message_ids() {
        let server = MockServer::start().await;
        mount_ok(&server, serde_json::json!({"messageIds": ["first", "second"]})).await;

        let outcome = test_provider(&server, test_config()).send(&test_request()).await;
        assert_eq!(outcome, SendOutcome::ok(Some("first".to_string())));
    }

    #[tokio::test]
    async fn success_with_unrecognized_body_still_succeeds() {
        let server = MockServer::start().await;
        mount_ok(&server, serde_json::json!({"accepted": true})).await;

        let outcome = test_provider(&server, test_config()).send(&test_request()).await;
        assert_eq!(outcome, SendOutcome::ok(None));
    }

    #[tokio::test]
    async fn empty_tags_field_is_omitted_and_attachments_are_base64() {
        let server = MockServer::start().await;
        mount_ok(&server, serde_json::json!({"messageId": "x"})).await;

        let mut request = test_request();
        request.attachments.push(Attachment {
            file_name: "contract.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            content: b"pdf-bytes".to_vec(),
        });
        test_provider(&server, test_config()).send(&request).await;

        let body = sent_body(&server).await;
        let obj = body.as_object().unwrap();
        assert!(!obj.contains_key("tags"), "empty tags must be omitted");
        assert!(!obj.contains_key("headers"), "no sandbox header by default");
        assert_eq!(body["subject"], "Welcome");
        assert_eq!(body["htmlContent"], "<p>welcome</p>");
        assert_eq!(body["attachment"][0]["name"], "contract.pdf");
        assert_eq!(body["attachment"][0]["content"], BASE64.encode(b"pdf-bytes"));
    }

    #[tokio::test]
    async fn tags_and_sandbox_header_are_included_when_set() {
        let server = MockServer::start().await;
        mount_ok(&server, serde_json::json!({"messageId": "x"})).await;

        let mut config = test_config();
        config.sandbox = true;
        let mut request = test_request();
        request.tags = vec!["prod".to_string(), "billing-invoice-sent".to_string()];
        test_provider(&server, config).send(&request).await;

        let body = sent_body(&server).await;
        assert_eq!(body["tags"], serde_json::json!(["prod", "billing-invoice-sent"]));
        assert_eq!(body["headers"]["X-Sib-Sandbox"], "drop");
    }

    #[tokio::test]
    async fn template_payload_carries_id_and_params_only() {
        let server = MockServer::start().await;
        mount_ok(&server, serde_json::json!({"messageId": "x"})).await;

        let mut request = test_request();
        request.template_id = Some(42);
        request.template_params = Some(serde_json::json!({"name": "Ada"}));
        request.attachments.push(Attachment {
            file_name: "ignored.txt".to_string(),
            content_type: "text/plain".to_string(),
            content: vec![1],
        });
        test_provider(&server, test_config()).send(&request).await;

        let body = sent_body(&server).await;
        let obj = body.as_object().unwrap();
        assert_eq!(body["templateId"], 42);
        assert_eq!(body["params"]["name"], "Ada");
        assert!(!obj.contains_key("subject"));
        assert!(!obj.contains_key("htmlContent"));
        assert!(!obj.contains_key("attachment"));
    }

    #[tokio::test]
    async fn transient_statuses_are_retryable() {
        for status in [429u16, 408, 500, 502, 503, 504] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/v3/smtp/email"))
                .respond_with(ResponseTemplate::new(status))
                .mount(&server)
                .await;

            let outcome = test_provider(&server, test_config()).send(&test_request()).await;
            assert_eq!(
                outcome,
                SendOutcome::Failure {
                    error: format!("api error {status}: "),
                    retryable: true
                },
                "status {status}"
            );
        }
    }

    #[tokio::test]
    async fn payload_errors_are_permanent() {
        for status in [400u16, 401, 403, 404, 422] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/v3/smtp/email"))
                .respond_with(ResponseTemplate::new(status).set_body_string("bad payload"))
                .mount(&server)
                .await;

            let outcome = test_provider(&server, test_config()).send(&test_request()).await;
            match outcome {
                SendOutcome::Failure { retryable, error } => {
                    assert!(!retryable, "status {status} must not retry");
                    assert!(error.contains(&status.to_string()));
                }
                other => panic!("expected failure for {status}, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn missing_api_key_fails_before_any_request() {
        let server = MockServer::start().await;
        let mut config = test_config();
        config.api_key = None;

        let outcome = test_provider(&server, config).send(&test_request()).await;
        assert_eq!(outcome, SendOutcome::fail("api key is missing", false));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn disabled_sending_short_circuits_to_success() {
        let server = MockServer::start().await;
        let mut config = test_config();
        config.enable_sending = false;

        let outcome = test_provider(&server, config).send(&test_request()).await;
        assert_eq!(outcome, SendOutcome::ok(Some("disabled".to_string())));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
