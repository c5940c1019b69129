use crate::error::{Result, ServiceError};
use crate::models::NotificationRequest;
use reqwest::header;
use serde_json::Value;

/// Where one invocation's notifications go: a single explicit device token,
/// or every token registered in a tenant's store.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Single(String),
    Tenant { url: String, anon_key: String },
}

impl Target {
    /// An explicit token wins; otherwise both tenant fields are required.
    pub fn from_request(req: &NotificationRequest) -> Result<Self> {
        if let Some(token) = req.token.as_deref().filter(|t| !t.is_empty()) {
            return Ok(Target::Single(token.to_string()));
        }
        match (
            req.tenant_url.as_deref().filter(|u| !u.is_empty()),
            req.tenant_anon_key.as_deref().filter(|k| !k.is_empty()),
        ) {
            (Some(url), Some(anon_key)) => Ok(Target::Tenant {
                url: url.to_string(),
                anon_key: anon_key.to_string(),
            }),
            _ => Err(ServiceError::Validation(
                "Missing target: provide token or tenant_url+tenant_anon_key".to_string(),
            )),
        }
    }
}

pub fn device_tokens_url(tenant_url: &str) -> String {
    let base = tenant_url.strip_suffix('/').unwrap_or(tenant_url);
    format!("{}/rest/v1/device_tokens?select=fcm_token", base)
}

/// Token value of one store row: `fcm_token` with a fallback to `token`.
/// Rows with neither (or an empty value) yield None and are skipped.
pub fn row_token(row: &Value) -> Option<String> {
    for key in ["fcm_token", "token"] {
        if let Some(value) = row.get(key).and_then(Value::as_str) {
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// One read of the tenant's token store: how many rows it returned, and the
/// usable tokens extracted from them. An empty store and a store whose rows
/// all lack tokens both yield no recipients, but only the former gets the
/// informational note in the response.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSnapshot {
    pub tokens: Vec<String>,
    pub row_count: usize,
}

impl StoreSnapshot {
    pub fn store_was_empty(&self) -> bool {
        self.row_count == 0
    }
}

/// Fetches the tenant's device tokens. A non-success response aborts before
/// any dispatch; an empty or non-array body is an empty recipient set, not an
/// error.
pub async fn fetch_device_tokens(
    client: &reqwest::Client,
    tenant_url: &str,
    anon_key: &str,
) -> Result<StoreSnapshot> {
    let url = device_tokens_url(tenant_url);
    let resp = client
        .get(&url)
        .header("apikey", anon_key)
        .header(header::ACCEPT, "application/json")
        .bearer_auth(anon_key)
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        tracing::error!("Tenant token fetch failed: {} {}", status, body);
        return Err(ServiceError::TenantFetch {
            status: status.as_u16(),
            body,
        });
    }

    let body: Value = resp.json().await?;
    let rows = body.as_array().map(Vec::as_slice).unwrap_or_default();
    let tokens: Vec<String> = rows.iter().filter_map(row_token).collect();

    tracing::debug!(
        "Resolved {} device token(s) from {} tenant store row(s)",
        tokens.len(),
        rows.len()
    );
    Ok(StoreSnapshot {
        tokens,
        row_count: rows.len(),
    })
}
