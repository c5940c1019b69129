use crate::models::{DispatchResult, NotificationContent};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Base for the versioned send endpoint; the project path is appended per send.
pub const V1_BASE_URL: &str = "https://fcm.googleapis.com";

/// Fixed legacy send endpoint, used with a static server key.
pub const LEGACY_SEND_URL: &str = "https://fcm.googleapis.com/fcm/send";

/// Auth scheme for one invocation. Selected once by the orchestrator and
/// threaded into every send; there is no per-recipient mixing.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthContext {
    Bearer {
        access_token: String,
        project_id: String,
    },
    Legacy {
        server_key: String,
    },
}

#[derive(Error, Debug, Clone)]
pub enum FcmError {
    #[error("FCM v1 error: {0}")]
    V1Rejected(Value),
    #[error("FCM API error: {0}")]
    LegacyRejected(Value),
    #[error("FCM request error: {0}")]
    Request(String),
}

impl From<reqwest::Error> for FcmError {
    fn from(err: reqwest::Error) -> Self {
        FcmError::Request(err.to_string())
    }
}

// Define the trait for sending FCM messages
#[async_trait]
pub trait FcmSend: Send + Sync {
    async fn send_single(
        &self,
        token: &str,
        content: &NotificationContent,
        auth: &AuthContext,
    ) -> std::result::Result<Value, FcmError>;
}

// Tokens come from request data, so the cut must land on a char boundary.
fn token_prefix(token: &str) -> &str {
    match token.char_indices().nth(8) {
        Some((idx, _)) => &token[..idx],
        None => token,
    }
}

/// Message body for the versioned API.
pub fn build_v1_body(token: &str, content: &NotificationContent) -> Value {
    json!({
        "message": {
            "token": token,
            "notification": { "title": content.title, "body": content.body },
            "data": content.data,
            "android": { "priority": "HIGH" },
            "apns": { "headers": { "apns-priority": "10" } },
        }
    })
}

/// Message body for the legacy API.
pub fn build_legacy_body(token: &str, content: &NotificationContent) -> Value {
    json!({
        "to": token,
        "notification": { "title": content.title, "body": content.body },
        "data": content.data,
        "priority": "high",
        "content_available": true,
    })
}

/// Real sender over HTTP. Base URLs are overridable so tests can point at a
/// local mock server.
pub struct HttpFcmSender {
    client: reqwest::Client,
    v1_base: String,
    legacy_url: String,
}

impl HttpFcmSender {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_urls(client, V1_BASE_URL, LEGACY_SEND_URL)
    }

    pub fn with_base_urls(client: reqwest::Client, v1_base: &str, legacy_url: &str) -> Self {
        Self {
            client,
            v1_base: v1_base.to_string(),
            legacy_url: legacy_url.to_string(),
        }
    }
}

#[async_trait]
impl FcmSend for HttpFcmSender {
    async fn send_single(
        &self,
        token: &str,
        content: &NotificationContent,
        auth: &AuthContext,
    ) -> std::result::Result<Value, FcmError> {
        match auth {
            AuthContext::Bearer {
                access_token,
                project_id,
            } => {
                let url = format!("{}/v1/projects/{}/messages:send", self.v1_base, project_id);
                let resp = self
                    .client
                    .post(&url)
                    .bearer_auth(access_token)
                    .json(&build_v1_body(token, content))
                    .send()
                    .await?;

                let status = resp.status();
                let body: Value = resp.json().await?;
                if !status.is_success() {
                    tracing::warn!(
                        "FCM v1 send rejected for token prefix {}: {}",
                        token_prefix(token),
                        body
                    );
                    return Err(FcmError::V1Rejected(body));
                }
                tracing::debug!("FCM v1 send ok for token prefix {}", token_prefix(token));
                Ok(body)
            }
            AuthContext::Legacy { server_key } => {
                let resp = self
                    .client
                    .post(&self.legacy_url)
                    .header("Authorization", format!("key={}", server_key))
                    .json(&build_legacy_body(token, content))
                    .send()
                    .await?;

                let status = resp.status();
                let body: Value = resp.json().await?;
                if !status.is_success() {
                    tracing::warn!(
                        "FCM legacy send rejected for token prefix {}: {}",
                        token_prefix(token),
                        body
                    );
                    return Err(FcmError::LegacyRejected(body));
                }
                tracing::debug!(
                    "FCM legacy send ok for token prefix {}",
                    token_prefix(token)
                );
                Ok(body)
            }
        }
    }
}

// The public FcmClient holds a trait object so tests can inject a mock.
pub struct FcmClient {
    sender: Box<dyn FcmSend>,
}

impl FcmClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            sender: Box::new(HttpFcmSender::new(client)),
        }
    }

    pub fn new_with_impl(sender: Box<dyn FcmSend>) -> Self {
        Self { sender }
    }

    pub async fn send_single(
        &self,
        token: &str,
        content: &NotificationContent,
        auth: &AuthContext,
    ) -> std::result::Result<Value, FcmError> {
        self.sender.send_single(token, content, auth).await
    }

    /// Sends to each token strictly in order, one suspend per recipient.
    ///
    /// With `isolate_failures` a failed send is recorded as `ok:false` and the
    /// loop continues; without it the first failure aborts the whole batch.
    /// Every attempted recipient yields exactly one result either way.
    pub async fn send_to_each(
        &self,
        tokens: &[String],
        content: &NotificationContent,
        auth: &AuthContext,
        isolate_failures: bool,
    ) -> std::result::Result<Vec<DispatchResult>, FcmError> {
        let mut results = Vec::with_capacity(tokens.len());
        for token in tokens {
            match self.sender.send_single(token, content, auth).await {
                Ok(value) => results.push(DispatchResult::success(token, value)),
                Err(e) if isolate_failures => {
                    results.push(DispatchResult::failure(token, e.to_string()))
                }
                Err(e) => return Err(e),
            }
        }
        Ok(results)
    }
}

// Mock FCM sender for tests; records sends and simulates per-token errors.
#[derive(Clone, Default)]
pub struct MockFcmSender {
    sent_messages: Arc<Mutex<Vec<(String, NotificationContent, AuthContext)>>>,
    error_tokens: Arc<Mutex<HashMap<String, FcmError>>>,
    response: Arc<Mutex<Value>>,
}

impl MockFcmSender {
    pub fn new() -> Self {
        Self {
            sent_messages: Arc::new(Mutex::new(Vec::new())),
            error_tokens: Arc::new(Mutex::new(HashMap::new())),
            response: Arc::new(Mutex::new(json!({"name": "projects/mock/messages/1"}))),
        }
    }

    pub fn get_sent_messages(&self) -> Vec<(String, NotificationContent, AuthContext)> {
        self.sent_messages.lock().unwrap().clone()
    }

    pub fn set_error_for_token(&self, token: &str, error: FcmError) {
        self.error_tokens
            .lock()
            .unwrap()
            .insert(token.to_string(), error);
    }

    pub fn set_response(&self, response: Value) {
        *self.response.lock().unwrap() = response;
    }
}

#[async_trait]
impl FcmSend for MockFcmSender {
    async fn send_single(
        &self,
        token: &str,
        content: &NotificationContent,
        auth: &AuthContext,
    ) -> std::result::Result<Value, FcmError> {
        if let Some(error) = self.error_tokens.lock().unwrap().get(token) {
            return Err(error.clone());
        }
        self.sent_messages
            .lock()
            .unwrap()
            .push((token.to_string(), content.clone(), auth.clone()));
        Ok(self.response.lock().unwrap().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content() -> NotificationContent {
        NotificationContent {
            title: "Test Title".to_string(),
            body: "Test Body".to_string(),
            data: serde_json::Map::new(),
        }
    }

    fn legacy_auth() -> AuthContext {
        AuthContext::Legacy {
            server_key: "server-key".to_string(),
        }
    }

    #[test]
    fn token_prefix_respects_char_boundaries() {
        assert_eq!(token_prefix("abcdefghij"), "abcdefgh");
        assert_eq!(token_prefix("short"), "short");
        assert_eq!(token_prefix(""), "");
        // 3-byte chars: byte 8 falls inside the third one
        assert_eq!(token_prefix("あいう"), "あいう");
        assert_eq!(token_prefix("あいうえおかきくけこ"), "あいうえおかきく");
    }

    #[test]
    fn v1_body_shape() {
        let body = build_v1_body("tok1", &content());
        assert_eq!(body["message"]["token"], "tok1");
        assert_eq!(body["message"]["notification"]["title"], "Test Title");
        assert_eq!(body["message"]["notification"]["body"], "Test Body");
        assert_eq!(body["message"]["data"], json!({}));
        assert_eq!(body["message"]["android"]["priority"], "HIGH");
        assert_eq!(body["message"]["apns"]["headers"]["apns-priority"], "10");
    }

    #[test]
    fn legacy_body_shape() {
        let mut c = content();
        c.data.insert("k".to_string(), json!("v"));
        let body = build_legacy_body("tok1", &c);
        assert_eq!(body["to"], "tok1");
        assert_eq!(body["priority"], "high");
        assert_eq!(body["content_available"], json!(true));
        assert_eq!(body["data"]["k"], "v");
    }

    #[tokio::test]
    async fn mock_records_single_send() {
        let mock = MockFcmSender::new();
        let client = FcmClient::new_with_impl(Box::new(mock.clone()));

        let result = client
            .send_single("test_token_1", &content(), &legacy_auth())
            .await;
        assert!(result.is_ok());

        let sent = mock.get_sent_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "test_token_1");
        assert_eq!(sent[0].1, content());
        assert_eq!(sent[0].2, legacy_auth());
    }

    #[tokio::test]
    async fn batch_isolates_failures_and_keeps_order() {
        let mock = MockFcmSender::new();
        mock.set_error_for_token("token2", FcmError::V1Rejected(json!({"error": "UNREGISTERED"})));
        let client = FcmClient::new_with_impl(Box::new(mock.clone()));

        let tokens: Vec<String> = ["token1", "token2", "token3"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let results = client
            .send_to_each(&tokens, &content(), &legacy_auth(), true)
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].token, "token1");
        assert!(results[0].ok);
        assert_eq!(results[1].token, "token2");
        assert!(!results[1].ok);
        assert!(results[1].error.as_deref().unwrap().contains("UNREGISTERED"));
        assert_eq!(results[2].token, "token3");
        assert!(results[2].ok);

        // only the successful sends were recorded
        assert_eq!(mock.get_sent_messages().len(), 2);
    }

    #[tokio::test]
    async fn batch_without_isolation_aborts_on_first_failure() {
        let mock = MockFcmSender::new();
        mock.set_error_for_token("token1", FcmError::LegacyRejected(json!({"error": 1})));
        let client = FcmClient::new_with_impl(Box::new(mock.clone()));

        let tokens: Vec<String> = ["token1", "token2"].iter().map(|s| s.to_string()).collect();
        let err = client
            .send_to_each(&tokens, &content(), &legacy_auth(), false)
            .await
            .unwrap_err();

        assert!(matches!(err, FcmError::LegacyRejected(_)));
        assert!(mock.get_sent_messages().is_empty());
    }
}
