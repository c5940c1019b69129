use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Inbound request body for the send endpoint. Exactly one of `token` or the
/// `tenant_url`/`tenant_anon_key` pair must be usable for dispatch.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct NotificationRequest {
    pub token: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub data: Option<Map<String, Value>>,
    pub tenant_url: Option<String>,
    pub tenant_anon_key: Option<String>,
}

/// What gets delivered to a device: required title/body plus an arbitrary
/// data map (empty when the request carried none).
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

/// Outcome of one dispatch attempt. Every attempted recipient yields exactly
/// one of these, in resolver order.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct DispatchResult {
    pub token: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DispatchResult {
    pub fn success(token: &str, result: Value) -> Self {
        Self {
            token: token.to_string(),
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(token: &str, error: String) -> Self {
        Self {
            token: token.to_string(),
            ok: false,
            result: None,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_result_omits_error_field() {
        let r = DispatchResult::success("tok1", json!({"name": "projects/p/messages/1"}));
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["ok"], json!(true));
        assert!(v.get("error").is_none());
        assert_eq!(v["result"]["name"], json!("projects/p/messages/1"));
    }

    #[test]
    fn failure_result_omits_result_field() {
        let r = DispatchResult::failure("tok1", "FCM v1 error: {}".to_string());
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["ok"], json!(false));
        assert!(v.get("result").is_none());
        assert_eq!(v["error"], json!("FCM v1 error: {}"));
    }

    #[test]
    fn request_deserializes_with_only_required_fields() {
        let req: NotificationRequest =
            serde_json::from_str(r#"{"title": "Hi", "body": "There"}"#).unwrap();
        assert_eq!(req.title.as_deref(), Some("Hi"));
        assert!(req.token.is_none());
        assert!(req.data.is_none());
    }
}
