use actix_web::cookie::{Cookie, SameSite};
use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use serde::Deserialize;

use crate::services::auth_service::{
    new_oauth_state, verify_oauth_state, AuthGate, AuthStatus, AuthUrlResponse, LoginRequest,
    LoginResponse, OAUTH_STATE_COOKIE, OAUTH_STATE_MAX_AGE_SECS,
};
use crate::utils::AppError;

fn auth_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build(name, value)
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .finish()
}

fn state_cookie(value: String) -> Cookie<'static> {
    let mut cookie = auth_cookie(OAUTH_STATE_COOKIE, value);
    cookie.set_max_age(actix_web::cookie::time::Duration::seconds(OAUTH_STATE_MAX_AGE_SECS));
    cookie
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = auth_cookie(name, String::new());
    cookie.make_removal();
    cookie
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful, session cookie set", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Service account not configured or spreadsheet unreachable")
    )
)]
pub async fn login(
    gate: web::Data<dyn AuthGate>,
    request: web::Json<LoginRequest>,
) -> HttpResponse {
    log::info!("🔐 POST /auth/login - email: {}", request.email);

    match gate.login(&request).await {
        Ok((user, marker)) => {
            log::info!("✅ Login successful: {} ({})", user.email, user.role);
            HttpResponse::Ok()
                .cookie(auth_cookie(gate.cookie_name(), marker))
                .json(LoginResponse { success: true, user })
        }
        Err(e @ AppError::InvalidCredentials(_)) | Err(e @ AppError::InvalidRequest(_)) => {
            log::warn!("❌ Login failed: {} - {}", request.email, e);
            e.error_response()
        }
        Err(e) => {
            log::error!("❌ Login error: {} - {}", request.email, e);
            let message = match e {
                AppError::ConfigurationMissing(_) => {
                    "Konfigurasi Google Service Account belum lengkap di panel Secrets."
                }
                _ => "Gagal melakukan login",
            };
            HttpResponse::InternalServerError().json(serde_json::json!({
                "success": false,
                "error": message
            }))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/auth/status",
    tag = "Auth",
    responses(
        (status = 200, description = "Whether the auth cookie is present and usable", body = AuthStatus)
    )
)]
pub async fn status(req: HttpRequest, gate: web::Data<dyn AuthGate>) -> HttpResponse {
    let cookie = req.cookie(gate.cookie_name());
    let status = gate.status(cookie.as_ref().map(|c| c.value()));
    log::debug!("👤 GET /auth/status - authenticated: {}", status.is_authenticated);
    HttpResponse::Ok().json(status)
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    responses(
        (status = 200, description = "Auth cookie cleared")
    )
)]
pub async fn logout(gate: web::Data<dyn AuthGate>) -> HttpResponse {
    log::info!("👋 POST /auth/logout");

    HttpResponse::Ok()
        .cookie(removal_cookie(gate.cookie_name()))
        .json(serde_json::json!({ "success": true }))
}

#[utoipa::path(
    get,
    path = "/api/auth/url",
    tag = "Auth",
    responses(
        (status = 200, description = "Google authorization URL; the `oauth_state` cookie is set alongside", body = AuthUrlResponse),
        (status = 400, description = "OAuth not enabled in this deployment")
    )
)]
pub async fn auth_url(gate: web::Data<dyn AuthGate>) -> HttpResponse {
    log::info!("🔐 GET /auth/url - Generating OAuth URL");

    let state = new_oauth_state();
    match gate.authorization_url(&state) {
        Ok(url) => HttpResponse::Ok()
            .cookie(state_cookie(state))
            .json(AuthUrlResponse { url }),
        Err(e) => {
            log::error!("❌ Failed to generate OAuth URL: {}", e);
            e.error_response()
        }
    }
}

#[derive(Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

fn callback_page(status: actix_web::http::StatusCode, body: &str) -> HttpResponse {
    HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(format!("<html><body>{}</body></html>", body))
}

const CALLBACK_SUCCESS: &str = r#"<script>
  if (window.opener) {
    window.opener.postMessage({ type: 'OAUTH_AUTH_SUCCESS' }, '*');
    window.close();
  } else {
    window.location.href = '/';
  }
</script>
<p>Authentication successful. This window should close automatically.</p>"#;

pub async fn callback(
    req: HttpRequest,
    gate: web::Data<dyn AuthGate>,
    query: web::Query<CallbackQuery>,
) -> HttpResponse {
    log::info!("🔐 GET /auth/callback - Processing Google OAuth");

    if let Some(error) = &query.error {
        log::error!("❌ OAuth error: {}", error);
        return callback_page(
            actix_web::http::StatusCode::BAD_REQUEST,
            "<p>Authentication was cancelled or denied.</p>",
        );
    }

    let expected = req.cookie(OAUTH_STATE_COOKIE);
    if let Err(e) = verify_oauth_state(expected.as_ref().map(|c| c.value()), query.state.as_deref()) {
        log::warn!("⚠️  Rejected OAuth callback: {}", e);
        let mut res = callback_page(
            actix_web::http::StatusCode::BAD_REQUEST,
            "<p>Login session expired or did not start here. Please try again.</p>",
        );
        let _ = res.add_cookie(&removal_cookie(OAUTH_STATE_COOKIE));
        return res;
    }

    let code = match &query.code {
        Some(c) => c,
        None => {
            log::error!("❌ No authorization code provided");
            return callback_page(
                actix_web::http::StatusCode::BAD_REQUEST,
                "<p>Missing authorization code.</p>",
            );
        }
    };

    match gate.handle_callback(code).await {
        Ok(cookie_value) => {
            log::info!("✅ Google OAuth successful");
            HttpResponse::Ok()
                .content_type("text/html; charset=utf-8")
                .cookie(auth_cookie(gate.cookie_name(), cookie_value))
                .cookie(removal_cookie(OAUTH_STATE_COOKIE))
                .body(format!("<html><body>{}</body></html>", CALLBACK_SUCCESS))
        }
        Err(e) => {
            log::error!("❌ Google OAuth failed: {}", e);
            callback_page(e.status_code(), "<p>Authentication failed.</p>")
        }
    }
}
