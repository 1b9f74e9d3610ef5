use crate::config::{AppConfig, AuthMode, OAuthClientConfig};
use crate::models::{Collection, SessionUser};
use crate::sheets::{Credential, SheetsProvider, GOOGLE_TOKEN_URL, SHEETS_SCOPE};
use crate::store::RowStore;
use crate::utils::AppError;
use async_trait::async_trait;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "user_session";
pub const OAUTH_COOKIE: &str = "google_tokens";
/// Holds the `state` sent to Google until the callback comes back.
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";
pub const OAUTH_STATE_MAX_AGE_SECS: i64 = 600;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

// Request/Response structures
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    pub user: SessionUser,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    pub is_authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
    /// Dashboard tabs the user may add data to. Advisory unless roles are enforced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AuthUrlResponse {
    pub url: String,
}

/// The caller behind a request, as resolved by the gate.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user: Option<SessionUser>,
    pub credential: Credential,
}

impl Principal {
    /// Server-side role check on writes. Principals without a session identity
    /// (OAuth, bootstrap) act with the spreadsheet's own permissions.
    pub fn ensure_can_write(&self, sheet: &str, enforce: bool) -> Result<(), AppError> {
        if !enforce {
            return Ok(());
        }
        match &self.user {
            Some(user) if !user.role().can_write(Collection::from_name(sheet)) => {
                Err(AppError::Forbidden(format!(
                    "Role {} cannot modify {}",
                    user.role, sheet
                )))
            }
            _ => Ok(()),
        }
    }
}

/// One of the two interchangeable login strategies sharing the route table.
#[async_trait]
pub trait AuthGate: Send + Sync {
    fn mode(&self) -> AuthMode;

    /// Cookie carrying the session marker or the OAuth tokens.
    fn cookie_name(&self) -> &'static str;

    /// Checks email/password; returns the user and the marker to set as cookie.
    async fn login(&self, request: &LoginRequest) -> Result<(SessionUser, String), AppError>;

    /// Google consent URL carrying `state`, which the callback must echo.
    fn authorization_url(&self, state: &str) -> Result<String, AppError>;

    /// Exchanges an authorization code; returns the cookie value.
    async fn handle_callback(&self, code: &str) -> Result<String, AppError>;

    fn status(&self, cookie: Option<&str>) -> AuthStatus;

    /// Resolves the cookie to a principal, or `Unauthorized`.
    fn identify(&self, cookie: Option<&str>) -> Result<Principal, AppError>;

    /// Credential for schema/seed calls made before anyone can log in.
    fn bootstrap_credential(&self) -> Option<Credential>;
}

pub fn build_gate(config: &AppConfig, provider: Arc<SheetsProvider>) -> Arc<dyn AuthGate> {
    match config.auth_mode {
        AuthMode::Session => Arc::new(SessionAuth::new(provider, &config.session_secret)),
        AuthMode::OAuth => Arc::new(OAuthAuth::new(config.oauth.clone())),
    }
}

// ==================== OAuth state ====================

pub fn new_oauth_state() -> String {
    Uuid::new_v4().simple().to_string()
}

/// The callback's `state` must equal the one stored in the browser when the
/// consent URL was issued.
pub fn verify_oauth_state(expected: Option<&str>, received: Option<&str>) -> Result<(), AppError> {
    match (expected, received) {
        (Some(expected), Some(received)) if !expected.is_empty() && expected == received => Ok(()),
        (None, _) => Err(AppError::InvalidRequest("OAuth state cookie missing".to_string())),
        _ => Err(AppError::InvalidRequest("OAuth state mismatch".to_string())),
    }
}

// ==================== Session marker ====================

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    email: String,
    role: String,
    name: String,
    iat: i64,
}

/// Signs the identity into the cookie value. No expiry: the marker lives as
/// long as the browser keeps the cookie.
pub fn issue_marker(user: &SessionUser, secret: &str) -> Result<String, AppError> {
    let claims = SessionClaims {
        email: user.email.clone(),
        role: user.role.clone(),
        name: user.name.clone(),
        iat: Utc::now().timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|e| AppError::UpstreamFailure(format!("Failed to issue session: {}", e)))
}

pub fn read_marker(marker: &str, secret: &str) -> Option<SessionUser> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();

    decode::<SessionClaims>(marker, &DecodingKey::from_secret(secret.as_ref()), &validation)
        .map(|data| SessionUser {
            email: data.claims.email,
            role: data.claims.role,
            name: data.claims.name,
        })
        .ok()
}

// ==================== Session variant ====================

pub struct SessionAuth {
    provider: Arc<SheetsProvider>,
    secret: String,
}

impl SessionAuth {
    pub fn new(provider: Arc<SheetsProvider>, secret: &str) -> Self {
        Self {
            provider,
            secret: secret.to_string(),
        }
    }
}

/// Exact match on both email and password; header row excluded.
pub fn find_user(rows: &[Vec<String>], email: &str, password: &str) -> Option<SessionUser> {
    let cell = |row: &Vec<String>, i: usize| row.get(i).cloned().unwrap_or_default();

    rows.iter()
        .skip(1)
        .find(|row| {
            row.first().map(String::as_str) == Some(email)
                && row.get(1).map(String::as_str) == Some(password)
        })
        .map(|row| SessionUser {
            email: cell(row, 0),
            role: cell(row, 2),
            name: cell(row, 3),
        })
}

#[async_trait]
impl AuthGate for SessionAuth {
    fn mode(&self) -> AuthMode {
        AuthMode::Session
    }

    fn cookie_name(&self) -> &'static str {
        SESSION_COOKIE
    }

    async fn login(&self, request: &LoginRequest) -> Result<(SessionUser, String), AppError> {
        let backend = self.provider.backend(&Credential::ServiceAccount)?;
        let rows = RowStore::new(backend)
            .read_rows(Collection::Users.name())
            .await?;

        let user = find_user(&rows, &request.email, &request.password)
            .ok_or_else(|| AppError::InvalidCredentials("Email atau Password salah".to_string()))?;

        let marker = issue_marker(&user, &self.secret)?;
        Ok((user, marker))
    }

    fn authorization_url(&self, _state: &str) -> Result<String, AppError> {
        Err(AppError::InvalidRequest(
            "OAuth login is not enabled (AUTH_MODE=session)".to_string(),
        ))
    }

    async fn handle_callback(&self, _code: &str) -> Result<String, AppError> {
        Err(AppError::InvalidRequest(
            "OAuth login is not enabled (AUTH_MODE=session)".to_string(),
        ))
    }

    fn status(&self, cookie: Option<&str>) -> AuthStatus {
        match cookie.and_then(|c| read_marker(c, &self.secret)) {
            Some(user) => {
                let permissions = user
                    .role()
                    .writable_tabs()
                    .into_iter()
                    .map(String::from)
                    .collect();
                AuthStatus {
                    is_authenticated: true,
                    user: Some(user),
                    permissions: Some(permissions),
                }
            }
            None => AuthStatus {
                is_authenticated: false,
                user: None,
                permissions: None,
            },
        }
    }

    fn identify(&self, cookie: Option<&str>) -> Result<Principal, AppError> {
        let cookie = cookie.ok_or_else(|| AppError::Unauthorized("Not logged in".to_string()))?;
        let user = read_marker(cookie, &self.secret)
            .ok_or_else(|| AppError::Unauthorized("Invalid session".to_string()))?;

        Ok(Principal {
            user: Some(user),
            credential: Credential::ServiceAccount,
        })
    }

    fn bootstrap_credential(&self) -> Option<Credential> {
        Some(Credential::ServiceAccount)
    }
}

// ==================== OAuth variant ====================

pub struct OAuthAuth {
    config: OAuthClientConfig,
    http: reqwest::Client,
}

impl OAuthAuth {
    pub fn new(config: OAuthClientConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn client_id(&self) -> Result<&str, AppError> {
        self.config
            .client_id
            .as_deref()
            .ok_or_else(|| AppError::ConfigurationMissing("GOOGLE_CLIENT_ID not configured".to_string()))
    }
}

/// Token cookie holds the provider's token response verbatim, base64url-encoded.
pub fn encode_token_cookie(tokens: &serde_json::Value) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(tokens.to_string())
}

pub fn access_token_from_cookie(cookie: &str) -> Option<String> {
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(cookie)
        .ok()?;
    let tokens: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    tokens["access_token"].as_str().map(String::from)
}

#[async_trait]
impl AuthGate for OAuthAuth {
    fn mode(&self) -> AuthMode {
        AuthMode::OAuth
    }

    fn cookie_name(&self) -> &'static str {
        OAUTH_COOKIE
    }

    async fn login(&self, _request: &LoginRequest) -> Result<(SessionUser, String), AppError> {
        Err(AppError::InvalidRequest(
            "Password login is not enabled (AUTH_MODE=oauth)".to_string(),
        ))
    }

    fn authorization_url(&self, state: &str) -> Result<String, AppError> {
        let client_id = self.client_id()?;

        let params = vec![
            ("client_id", client_id),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", SHEETS_SCOPE),
            ("state", state),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ];

        let query_string = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        Ok(format!("{}?{}", GOOGLE_AUTH_URL, query_string))
    }

    async fn handle_callback(&self, code: &str) -> Result<String, AppError> {
        let client_id = self.client_id()?;
        let client_secret = self.config.client_secret.as_deref().ok_or_else(|| {
            AppError::ConfigurationMissing("GOOGLE_CLIENT_SECRET not configured".to_string())
        })?;

        // Exchange code for tokens
        let token_response = self
            .http
            .post(GOOGLE_TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::UpstreamFailure(format!("Failed to exchange code: {}", e)))?;

        if !token_response.status().is_success() {
            log::warn!("⚠️  Token exchange returned {}", token_response.status());
            return Err(AppError::UpstreamFailure(
                "Failed to exchange authorization code".to_string(),
            ));
        }

        let tokens: serde_json::Value = token_response
            .json()
            .await
            .map_err(|e| AppError::UpstreamFailure(format!("Failed to parse token response: {}", e)))?;

        if tokens["access_token"].as_str().is_none() {
            return Err(AppError::UpstreamFailure(
                "No access token in response".to_string(),
            ));
        }

        Ok(encode_token_cookie(&tokens))
    }

    fn status(&self, cookie: Option<&str>) -> AuthStatus {
        // Presence only; the token is not checked against the provider
        AuthStatus {
            is_authenticated: cookie.map(|c| !c.is_empty()).unwrap_or(false),
            user: None,
            permissions: None,
        }
    }

    fn identify(&self, cookie: Option<&str>) -> Result<Principal, AppError> {
        let cookie = cookie.ok_or_else(|| AppError::Unauthorized("Not connected to Google".to_string()))?;
        let token = access_token_from_cookie(cookie)
            .ok_or_else(|| AppError::Unauthorized("Invalid token cookie".to_string()))?;

        Ok(Principal {
            user: None,
            credential: Credential::UserToken(token),
        })
    }

    fn bootstrap_credential(&self) -> Option<Credential> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::record_service::RecordService;
    use crate::sheets::MemorySheets;

    const SECRET: &str = "test-secret";

    async fn seeded_gate() -> SessionAuth {
        let memory = Arc::new(MemorySheets::new());
        RecordService::new(RowStore::new(memory.clone()), AuthMode::Session)
            .seed_demo_data("masked".to_string())
            .await
            .unwrap();
        SessionAuth::new(Arc::new(SheetsProvider::memory("sheet", memory)), SECRET)
    }

    fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_login_member() {
        let gate = seeded_gate().await;
        let (user, marker) = gate
            .login(&login_request("budi@email.com", "budi123"))
            .await
            .unwrap();

        assert_eq!(user.role, "Anggota");
        assert_eq!(user.name, "Budi Santoso");
        assert_eq!(read_marker(&marker, SECRET), Some(user));
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let gate = seeded_gate().await;
        let err = gate
            .login(&login_request("budi@email.com", "salah"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials(_)));
    }

    #[test]
    fn test_header_row_is_not_a_user() {
        let rows = vec![vec![
            "Email".to_string(),
            "Password".to_string(),
            "Role".to_string(),
            "Name".to_string(),
        ]];
        assert!(find_user(&rows, "Email", "Password").is_none());
    }

    #[test]
    fn test_short_user_row_fills_blanks() {
        let rows = vec![
            vec!["Email".to_string()],
            vec!["x@y.z".to_string(), "pw".to_string(), "Admin".to_string()],
        ];
        let user = find_user(&rows, "x@y.z", "pw").unwrap();
        assert_eq!(user.role, "Admin");
        assert_eq!(user.name, "");
    }

    #[tokio::test]
    async fn test_status_and_identify() {
        let gate = seeded_gate().await;
        let (_, marker) = gate
            .login(&login_request("staff@koperasi.com", "staff123"))
            .await
            .unwrap();

        let status = gate.status(Some(&marker));
        assert!(status.is_authenticated);
        assert_eq!(
            status.permissions,
            Some(vec!["transactions".to_string(), "inventory".to_string()])
        );

        let principal = gate.identify(Some(&marker)).unwrap();
        assert_eq!(principal.credential, Credential::ServiceAccount);
        assert!(principal.ensure_can_write("Inventory", true).is_ok());
        assert!(matches!(
            principal.ensure_can_write("Members", true),
            Err(AppError::Forbidden(_))
        ));
        assert!(principal.ensure_can_write("Members", false).is_ok());
    }

    #[tokio::test]
    async fn test_tampered_or_missing_marker() {
        let gate = seeded_gate().await;
        assert!(!gate.status(None).is_authenticated);
        assert!(!gate.status(Some("not-a-marker")).is_authenticated);

        let forged = issue_marker(
            &SessionUser {
                email: "x@y.z".into(),
                role: "Admin".into(),
                name: "X".into(),
            },
            "other-secret",
        )
        .unwrap();
        assert!(matches!(gate.identify(Some(&forged)), Err(AppError::Unauthorized(_))));
        assert!(matches!(gate.identify(None), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_oauth_url_contains_client_and_scope() {
        let gate = OAuthAuth::new(OAuthClientConfig {
            client_id: Some("client-123".to_string()),
            client_secret: None,
            redirect_uri: "http://localhost:3000/auth/callback".to_string(),
        });
        let url = gate.authorization_url("st4te").unwrap();
        assert!(url.starts_with(GOOGLE_AUTH_URL));
        assert!(url.contains("state=st4te"));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fauth%2Fcallback"));
        assert!(url.contains(&format!("scope={}", urlencoding::encode(SHEETS_SCOPE))));
    }

    #[test]
    fn test_oauth_without_client_id() {
        let gate = OAuthAuth::new(OAuthClientConfig {
            client_id: None,
            client_secret: None,
            redirect_uri: "http://localhost".to_string(),
        });
        assert!(matches!(
            gate.authorization_url("st4te"),
            Err(AppError::ConfigurationMissing(_))
        ));
    }

    #[test]
    fn test_oauth_state_must_match_cookie() {
        let state = new_oauth_state();
        assert!(verify_oauth_state(Some(&state), Some(&state)).is_ok());
        assert!(matches!(
            verify_oauth_state(Some(&state), Some("other")),
            Err(AppError::InvalidRequest(_))
        ));
        assert!(matches!(
            verify_oauth_state(None, Some(&state)),
            Err(AppError::InvalidRequest(_))
        ));
        assert!(verify_oauth_state(Some(&state), None).is_err());
        assert!(verify_oauth_state(Some(""), Some("")).is_err());
        assert_ne!(new_oauth_state(), state);
    }

    #[test]
    fn test_oauth_cookie_roundtrip_and_status() {
        let gate = OAuthAuth::new(OAuthClientConfig {
            client_id: None,
            client_secret: None,
            redirect_uri: "http://localhost".to_string(),
        });
        let cookie = encode_token_cookie(&serde_json::json!({
            "access_token": "ya29.abc",
            "refresh_token": "1//xyz",
            "expires_in": 3599
        }));

        assert!(gate.status(Some(&cookie)).is_authenticated);
        // Existence is enough for status, but identify needs a usable token
        assert!(gate.status(Some("garbage")).is_authenticated);
        assert!(gate.identify(Some("garbage")).is_err());

        let principal = gate.identify(Some(&cookie)).unwrap();
        assert_eq!(principal.credential, Credential::UserToken("ya29.abc".to_string()));
        assert!(principal.ensure_can_write("Members", true).is_ok());
        assert!(gate.bootstrap_credential().is_none());
    }
}
