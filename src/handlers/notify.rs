use crate::error::{Result, ServiceError};
use crate::fcm_sender::AuthContext;
use crate::google_auth::{self, ServiceCredential};
use crate::models::{NotificationContent, NotificationRequest};
use crate::state::AppState;
use crate::tenant::{self, Target};
use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

/// Orchestrates one dispatch: validate, mint auth once, resolve recipients,
/// send sequentially, aggregate per-recipient results.
pub async fn send_notification(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NotificationRequest>,
) -> Result<Json<Value>> {
    let title = req.title.as_deref().filter(|t| !t.is_empty());
    let body = req.body.as_deref().filter(|b| !b.is_empty());
    let (title, body) = match (title, body) {
        (Some(t), Some(b)) => (t, b),
        _ => {
            return Err(ServiceError::Validation(
                "Missing required parameters: title/body".to_string(),
            ))
        }
    };

    // Auth mode is fixed for the whole invocation: one bearer token minted up
    // front when a service account is configured, the legacy key otherwise.
    // An exchange failure is fatal here; it never falls back to the key.
    let firebase = &state.settings.firebase;
    let auth = match (&firebase.service_account, &firebase.server_key) {
        (Some(raw), _) => {
            let credential = ServiceCredential::from_json(raw)?;
            let bearer =
                google_auth::exchange_for_bearer(&state.http, &state.token_url, &credential)
                    .await?;
            AuthContext::Bearer {
                access_token: bearer.access_token,
                project_id: bearer.project_id,
            }
        }
        (None, Some(key)) => AuthContext::Legacy {
            server_key: key.clone(),
        },
        (None, None) => {
            return Err(ServiceError::Configuration(
                "FIREBASE_SERVER_KEY or FIREBASE_SERVICE_ACCOUNT missing".to_string(),
            ))
        }
    };

    let content = NotificationContent {
        title: title.to_string(),
        body: body.to_string(),
        data: req.data.clone().unwrap_or_default(),
    };

    match Target::from_request(&req)? {
        Target::Single(token) => {
            // Single-target dispatch failures propagate as a request-level
            // error, unlike batch mode where each recipient is isolated.
            let results = state
                .fcm
                .send_to_each(std::slice::from_ref(&token), &content, &auth, false)
                .await
                .map_err(ServiceError::Fcm)?;
            let provider_response = results
                .into_iter()
                .next()
                .and_then(|r| r.result)
                .unwrap_or(Value::Null);
            Ok(Json(json!({ "success": true, "results": [provider_response] })))
        }
        Target::Tenant { url, anon_key } => {
            let snapshot = tenant::fetch_device_tokens(&state.http, &url, &anon_key).await?;
            // The note marks an empty store; rows that exist but carry no
            // usable token just produce an empty result list.
            if snapshot.store_was_empty() {
                return Ok(Json(json!({
                    "success": true,
                    "results": [],
                    "note": "No device tokens found",
                })));
            }

            tracing::debug!(
                "Dispatching to {} tenant device token(s)",
                snapshot.tokens.len()
            );
            let results = state
                .fcm
                .send_to_each(&snapshot.tokens, &content, &auth, true)
                .await
                .map_err(ServiceError::Fcm)?;
            Ok(Json(json!({ "success": true, "results": results })))
        }
    }
}
