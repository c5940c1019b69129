use base64::Engine;
use serde::Deserialize;

// Re-export config crate error if needed, or use custom error
pub use config::ConfigError;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default = "default_server_settings")]
    pub server: ServerSettings,
    #[serde(default)]
    pub firebase: FirebaseSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

/// Push credentials for the process. At least one of the two fields must be
/// set for dispatch to work; `service_account` holds the raw service-account
/// JSON and takes precedence over the legacy `server_key`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct FirebaseSettings {
    pub server_key: Option<String>,
    pub service_account: Option<String>,
}

fn default_server_settings() -> ServerSettings {
    ServerSettings {
        listen_addr: default_listen_addr(),
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = config::Config::builder()
            .add_source(config::File::with_name("config/settings").required(false))
            // Eg. `FCM_RELAY__SERVER__LISTEN_ADDR=0.0.0.0:9000` would override `server.listen_addr`
            .add_source(config::Environment::with_prefix("FCM_RELAY").separator("__"))
            .build()?;

        let mut settings: Settings = s.try_deserialize()?;
        settings.apply_env_credentials();
        Ok(settings)
    }

    /// Bare `FIREBASE_*` env vars override the settings file, matching how the
    /// credentials are supplied in serverless deployments. The `_BASE64`
    /// variant exists for environments that cannot carry multi-line secrets.
    fn apply_env_credentials(&mut self) {
        if let Ok(key) = std::env::var("FIREBASE_SERVER_KEY") {
            if !key.is_empty() {
                self.firebase.server_key = Some(key);
            }
        }
        if let Ok(sa) = std::env::var("FIREBASE_SERVICE_ACCOUNT") {
            if !sa.is_empty() {
                self.firebase.service_account = Some(sa);
            }
        }
        if self.firebase.service_account.is_none() {
            if let Ok(encoded) = std::env::var("FIREBASE_SERVICE_ACCOUNT_BASE64") {
                if !encoded.is_empty() {
                    match base64::engine::general_purpose::STANDARD.decode(&encoded) {
                        Ok(bytes) => match String::from_utf8(bytes) {
                            Ok(json) => self.firebase.service_account = Some(json),
                            Err(e) => {
                                tracing::error!(
                                    "FIREBASE_SERVICE_ACCOUNT_BASE64 is not valid UTF-8: {}",
                                    e
                                );
                            }
                        },
                        Err(e) => {
                            tracing::error!(
                                "Failed to decode FIREBASE_SERVICE_ACCOUNT_BASE64: {}",
                                e
                            );
                        }
                    }
                }
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.firebase.server_key.is_some() || self.firebase.service_account.is_some()
    }
}
