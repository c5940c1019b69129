use crate::{config::Settings, fcm_sender::FcmClient, google_auth};

/// Shared application state. Configuration is immutable for the process
/// lifetime; each invocation owns its own bearer token and result list.
pub struct AppState {
    pub settings: Settings,
    pub http: reqwest::Client,
    pub fcm: FcmClient,
    pub token_url: String,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        // One client for token exchange and tenant fetches; the FCM sender
        // shares it. No timeouts: a hung upstream hangs the invocation.
        let http = reqwest::Client::new();
        let fcm = FcmClient::new(http.clone());
        Self {
            settings,
            http,
            fcm,
            token_url: google_auth::TOKEN_URL.to_string(),
        }
    }
}
