//!
//! folio HTTP server
//! -----------------
//! Axum-based HTTP surface for the folio portfolio/client portal.
//!
//! Responsibilities:
//! - Stateless session cookie (HMAC-signed token) set on login, cleared on logout.
//! - Route guard middleware enforcing the admin/client policy ahead of dispatch.
//! - Login/logout endpoints backed by the identity and security modules.
//! - Admin user-management endpoints (the guard has already required ADMIN).
//! - Liveness and session-introspection endpoints.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use crate::error::AppError;
use crate::identity::{
    self, AuthProvider, GuardDecision, LocalAuthProvider, LoginRequest, Role, SessionClaims,
    TokenCodec,
};
use crate::security::{NewUser, User, UserStore};

const SESSION_COOKIE: &str = "folio_session";

/// Resolved server configuration. Built from the environment in the
/// binaries and handed in whole; library code never reads env vars.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
    pub data_root: String,
    pub session_secret: String,
    pub session_ttl_secs: u64,
    pub default_admin_email: String,
    pub default_admin_password: String,
    pub secure_cookies: bool,
}

fn env_u16(name: &str) -> Option<u16> {
    std::env::var(name).ok().and_then(|v| v.parse::<u16>().ok())
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.parse::<u64>().ok())
}

fn env_bool(name: &str) -> Option<bool> {
    match std::env::var(name) {
        Ok(v) => match v.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        },
        Err(_) => None,
    }
}

impl ServerConfig {
    /// Missing or empty FOLIO_SESSION_SECRET is a fatal startup error; the
    /// server must never run with token verification silently disabled.
    pub fn from_env() -> anyhow::Result<Self> {
        let secret = std::env::var("FOLIO_SESSION_SECRET").unwrap_or_default();
        if secret.trim().is_empty() {
            anyhow::bail!("FOLIO_SESSION_SECRET must be set; refusing to start without a signing secret");
        }
        Ok(Self {
            http_port: env_u16("FOLIO_HTTP_PORT").unwrap_or(7878),
            data_root: std::env::var("FOLIO_DATA_ROOT").unwrap_or_else(|_| "data".to_string()),
            session_secret: secret,
            session_ttl_secs: env_u64("FOLIO_SESSION_TTL_SECS").unwrap_or(identity::SESSION_TTL_SECS),
            default_admin_email: std::env::var("FOLIO_ADMIN_EMAIL")
                .unwrap_or_else(|_| "admin@folio.local".to_string()),
            default_admin_password: std::env::var("FOLIO_ADMIN_PASSWORD").unwrap_or_default(),
            secure_cookies: env_bool("FOLIO_SECURE_COOKIES").unwrap_or(true),
        })
    }
}

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: UserStore,
    pub codec: Arc<TokenCodec>,
    pub auth: Arc<LocalAuthProvider>,
    pub secure_cookies: bool,
}

/// Start the folio HTTP server: open the user catalog, seed the default
/// admin on first run, and mount all routes behind the guard middleware.
pub async fn run_with_config(cfg: ServerConfig) -> anyhow::Result<()> {
    std::fs::create_dir_all(&cfg.data_root)
        .with_context(|| format!("Failed to create or access data root: {}", cfg.data_root))?;

    let store = UserStore::open(&cfg.data_root, &cfg.default_admin_email)
        .with_context(|| format!("While opening user catalog under: {}", cfg.data_root))?;
    let seed_password = if cfg.default_admin_password.is_empty() {
        warn!("FOLIO_ADMIN_PASSWORD not set; seeding default admin with the fallback password");
        "folio-admin".to_string()
    } else {
        cfg.default_admin_password.clone()
    };
    store
        .ensure_default_admin(&seed_password)
        .context("While seeding the default admin account")?;

    let codec = Arc::new(TokenCodec::new(&cfg.session_secret, cfg.session_ttl_secs)?);
    let auth = Arc::new(LocalAuthProvider::new(store.clone()));
    let state = AppState { store, codec, auth, secure_cookies: cfg.secure_cookies };

    let app = router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", cfg.http_port).parse()?;
    info!("Starting folio on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the full route table. Separated from `run_with_config` so tests can
/// drive the router directly.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "folio ok" }))
        .route("/api/health", get(health))
        .route("/api/auth/status", get(auth_status))
        .route("/admin/login", get(login_page).post(login))
        .route("/logout", post(logout))
        .route("/admin/dashboard", get(admin_dashboard))
        .route("/admin/users", get(list_users).post(create_user))
        .route("/admin/users/{id}/role", post(set_user_role))
        .route("/admin/users/{id}/delete", post(delete_user))
        .route("/client/dashboard", get(client_dashboard))
        .layer(middleware::from_fn_with_state(state.clone(), route_guard))
        .with_state(state)
}

// --- session cookie plumbing ---

fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie = headers.get("cookie").or_else(|| headers.get("Cookie"))?;
    let s = cookie.to_str().ok()?;
    for part in s.split(';') {
        let p = part.trim();
        if let Some(eq) = p.find('=') {
            let (k, v) = p.split_at(eq);
            if k == name { return Some(v[1..].to_string()); }
        }
    }
    None
}

fn session_from_headers(state: &AppState, headers: &HeaderMap) -> Option<SessionClaims> {
    let token = parse_cookie(headers, SESSION_COOKIE)?;
    state.codec.verify(&token)
}

fn set_session_cookie(token: &str, secure: bool) -> HeaderValue {
    let secure_attr = if secure { " Secure;" } else { "" };
    HeaderValue::from_str(&format!(
        "{}={}; HttpOnly;{} SameSite=Strict; Path=/",
        SESSION_COOKIE, token, secure_attr
    ))
    .unwrap()
}

fn clear_session_cookie(secure: bool) -> HeaderValue {
    let secure_attr = if secure { " Secure;" } else { "" };
    HeaderValue::from_str(&format!(
        "{}=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly;{} SameSite=Strict; Path=/",
        SESSION_COOKIE, secure_attr
    ))
    .unwrap()
}

/// Guard middleware: decode the cookie (no store lookup) and apply the route
/// policy before any handler runs.
async fn route_guard(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let session = session_from_headers(&state, req.headers());
    match identity::decide(&path, session.as_ref()) {
        GuardDecision::Allow => next.run(req).await,
        GuardDecision::Redirect(to) => Redirect::to(&to).into_response(),
    }
}

// --- public endpoints ---

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn auth_status(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match session_from_headers(&state, &headers) {
        Some(claims) => Json(json!({
            "isAuthenticated": true,
            "userId": claims.sub,
            "role": claims.role,
        }))
        .into_response(),
        None => AppError::auth("unauthenticated", "authentication required").into_response(),
    }
}

// --- login / logout ---

#[derive(Debug, Deserialize)]
struct LoginPageQuery {
    #[serde(rename = "callbackUrl")]
    callback_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    email: String,
    password: String,
    #[serde(rename = "callbackUrl")]
    callback_url: Option<String>,
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn render_login_page(callback_url: Option<&str>, message: Option<&str>) -> String {
    let hidden = match callback_url {
        Some(cb) => format!(
            "<input type=\"hidden\" name=\"callbackUrl\" value=\"{}\">",
            escape_attr(cb)
        ),
        None => String::new(),
    };
    let banner = match message {
        Some(msg) => format!("<p class=\"error\">{}</p>", escape_attr(msg)),
        None => String::new(),
    };
    format!(
        "<!doctype html><html><head><title>folio login</title></head><body>\
         <h1>Sign in</h1>{banner}\
         <form method=\"post\" action=\"/admin/login\">\
         <label>Email <input type=\"email\" name=\"email\" required></label>\
         <label>Password <input type=\"password\" name=\"password\" required></label>\
         {hidden}\
         <button type=\"submit\">Sign in</button>\
         </form></body></html>"
    )
}

async fn login_page(Query(q): Query<LoginPageQuery>) -> Html<String> {
    Html(render_login_page(q.callback_url.as_deref(), None))
}

/// A same-site callback path wins; anything else falls back to the
/// role-appropriate dashboard.
fn resolve_login_target(callback_url: Option<&str>, role: Role) -> String {
    match callback_url {
        Some(cb) if cb.starts_with('/') && !cb.starts_with("//") => cb.to_string(),
        _ => match role {
            Role::Admin => identity::ADMIN_HOME.to_string(),
            Role::Client => identity::CLIENT_HOME.to_string(),
        },
    }
}

async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    let req = LoginRequest { email: form.email, password: form.password };
    match state.auth.authenticate(&req) {
        Ok(Some(user)) => {
            let token = match state.codec.mint(&user.user_id, user.role) {
                Ok(t) => t,
                Err(e) => {
                    error!("token mint failed: {e}");
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Html(render_login_page(
                            form.callback_url.as_deref(),
                            Some("something went wrong, please try again"),
                        )),
                    )
                        .into_response();
                }
            };
            let target = resolve_login_target(form.callback_url.as_deref(), user.role);
            let mut headers = HeaderMap::new();
            headers.insert("Set-Cookie", set_session_cookie(&token, state.secure_cookies));
            (headers, Redirect::to(&target)).into_response()
        }
        // One generic message regardless of which field was wrong
        Ok(None) => (
            StatusCode::UNAUTHORIZED,
            Html(render_login_page(
                form.callback_url.as_deref(),
                Some("invalid email or password"),
            )),
        )
            .into_response(),
        Err(e) => {
            error!("login failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(render_login_page(
                    form.callback_url.as_deref(),
                    Some("something went wrong, please try again"),
                )),
            )
                .into_response()
        }
    }
}

async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    headers.insert("Set-Cookie", clear_session_cookie(state.secure_cookies));
    (headers, Redirect::to(identity::LOGIN_PATH))
}

// --- guarded pages (placeholders; rendering is not this crate's concern) ---

async fn admin_dashboard() -> Html<&'static str> {
    Html("<!doctype html><html><body><h1>Admin dashboard</h1></body></html>")
}

async fn client_dashboard() -> Html<&'static str> {
    Html("<!doctype html><html><body><h1>Client dashboard</h1></body></html>")
}

// --- admin user management ---

#[derive(Debug, Serialize)]
struct UserSummary {
    id: String,
    email: String,
    #[serde(rename = "displayName")]
    display_name: String,
    role: Role,
    company: Option<String>,
    #[serde(rename = "logoUrl")]
    logo_url: Option<String>,
}

impl From<User> for UserSummary {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            display_name: u.display_name,
            role: u.role,
            company: u.company,
            logo_url: u.logo_url,
        }
    }
}

async fn list_users(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let users: Vec<UserSummary> = state.store.list()?.into_iter().map(Into::into).collect();
    Ok(Json(json!({"status": "ok", "users": users})))
}

#[derive(Debug, Deserialize)]
struct CreateUserPayload {
    email: String,
    password: String,
    #[serde(rename = "displayName", default)]
    display_name: Option<String>,
    #[serde(default)]
    role: Option<Role>,
    #[serde(default)]
    company: Option<String>,
    #[serde(rename = "logoUrl", default)]
    logo_url: Option<String>,
}

async fn create_user(
    State(state): State<AppState>,
    Json(p): Json<CreateUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    if p.email.trim().is_empty() || p.password.is_empty() {
        return Err(AppError::user("missing_fields", "email and password are required"));
    }
    let user = state.store.add_user(NewUser {
        email: p.email,
        password: p.password,
        display_name: p.display_name.unwrap_or_default(),
        role: p.role.unwrap_or_default(),
        company: p.company,
        logo_url: p.logo_url,
    })?;
    info!("user created: {}", user.email);
    Ok((StatusCode::CREATED, Json(json!({"status": "ok", "user": UserSummary::from(user)}))))
}

#[derive(Debug, Deserialize)]
struct SetRolePayload {
    role: Role,
}

async fn set_user_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(p): Json<SetRolePayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.store.update_role(&id, p.role)?;
    Ok(Json(json!({"status": "ok"})))
}

async fn delete_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    // The guard has authenticated the caller already; re-derive the claims
    // for the self-deletion check.
    let claims = session_from_headers(&state, &headers)
        .ok_or_else(|| AppError::auth("unauthenticated", "authentication required"))?;
    state.store.delete_user(&claims.sub, &id)?;
    Ok(Json(json!({"status": "ok"})))
}
