use crate::config::ServiceAccountConfig;
use crate::utils::AppError;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Refresh this long before the upstream expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

// Claims for the JWT-bearer grant
#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: i64,
}

/// Service-account credential that trades a signed assertion for an access token.
pub struct ServiceAccount {
    http: reqwest::Client,
    config: ServiceAccountConfig,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccount {
    pub fn new(http: reqwest::Client, config: ServiceAccountConfig) -> Self {
        Self {
            http,
            config,
            cached: Mutex::new(None),
        }
    }

    /// Current access token, fetching a new one when the cached token is near expiry.
    pub async fn access_token(&self) -> Result<String, AppError> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now().timestamp();

        if let Some(token) = cached.as_ref() {
            if token.expires_at - EXPIRY_MARGIN_SECS > now {
                return Ok(token.access_token.clone());
            }
        }

        log::debug!("🔑 Requesting service account token for {}", self.config.email);

        let assertion = build_assertion(&self.config, now)?;
        let response = self
            .http
            .post(GOOGLE_TOKEN_URL)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::UpstreamFailure(format!("Failed to request access token: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            log::error!("❌ Token endpoint returned {}: {}", status, body);
            return Err(AppError::UpstreamFailure(format!(
                "Service account token request failed: {}",
                status
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::UpstreamFailure(format!("Failed to parse token response: {}", e)))?;

        *cached = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at: now + token.expires_in,
        });

        Ok(token.access_token)
    }
}

fn build_assertion(config: &ServiceAccountConfig, now: i64) -> Result<String, AppError> {
    let claims = AssertionClaims {
        iss: config.email.clone(),
        scope: SHEETS_SCOPE.to_string(),
        aud: GOOGLE_TOKEN_URL.to_string(),
        iat: now,
        exp: now + Duration::hours(1).num_seconds(),
    };

    let key = EncodingKey::from_rsa_pem(config.private_key.as_bytes()).map_err(|e| {
        AppError::ConfigurationMissing(format!("GOOGLE_PRIVATE_KEY is not a valid RSA key: {}", e))
    })?;

    encode(&Header::new(Algorithm::RS256), &claims, &key)
        .map_err(|e| AppError::ConfigurationMissing(format!("Failed to sign assertion: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_key_reports_configuration() {
        let config = ServiceAccountConfig {
            email: "svc@project.iam.gserviceaccount.com".to_string(),
            private_key: "not a key".to_string(),
        };
        let err = build_assertion(&config, 1_700_000_000).unwrap_err();
        assert!(matches!(err, AppError::ConfigurationMissing(_)));
    }

    #[tokio::test]
    async fn test_cached_token_is_reused() {
        let account = ServiceAccount::new(
            reqwest::Client::new(),
            ServiceAccountConfig {
                email: "svc@x".to_string(),
                private_key: "unused".to_string(),
            },
        );
        *account.cached.lock().await = Some(CachedToken {
            access_token: "cached-token".to_string(),
            expires_at: Utc::now().timestamp() + 600,
        });

        // No network call: the cached token is still valid
        assert_eq!(account.access_token().await.unwrap(), "cached-token");
    }
}
