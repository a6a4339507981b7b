//! Route guard: the allow/redirect decision applied ahead of route dispatch.
//! Pure over `(pathname, decoded session)`; never touches the user store.

use super::role::Role;
use super::token::SessionClaims;

pub const LOGIN_PATH: &str = "/admin/login";
pub const ADMIN_PREFIX: &str = "/admin";
pub const CLIENT_PREFIX: &str = "/client";
pub const ADMIN_HOME: &str = "/admin/dashboard";
pub const CLIENT_HOME: &str = "/client/dashboard";

/// Every guard branch resolves to one of these; the guard never errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(String),
}

/// Login redirect preserving the originally requested path, so the login
/// flow can return the user to it afterwards.
pub fn login_redirect(original: &str) -> String {
    format!("{}?callbackUrl={}", LOGIN_PATH, urlencoding::encode(original))
}

fn under(path: &str, prefix: &str) -> bool {
    path == prefix || (path.starts_with(prefix) && path.as_bytes().get(prefix.len()) == Some(&b'/'))
}

/// The route policy decision table. A missing, malformed or expired token
/// reaches this function as `None`; the three are indistinguishable here.
pub fn decide(path: &str, session: Option<&SessionClaims>) -> GuardDecision {
    // The login page is carved out of the admin prefix: public when logged
    // out, bounced to the caller's own dashboard when logged in.
    if path == LOGIN_PATH {
        return match session {
            None => GuardDecision::Allow,
            Some(claims) => match claims.role {
                Role::Admin => GuardDecision::Redirect(ADMIN_HOME.to_string()),
                Role::Client => GuardDecision::Redirect(CLIENT_HOME.to_string()),
            },
        };
    }

    if under(path, ADMIN_PREFIX) {
        return match session {
            None => GuardDecision::Redirect(login_redirect(path)),
            Some(claims) => match claims.role {
                Role::Admin => GuardDecision::Allow,
                // Wrong role: silent downgrade, no error surfaced
                Role::Client => GuardDecision::Redirect(CLIENT_HOME.to_string()),
            },
        };
    }

    if under(path, CLIENT_PREFIX) {
        return match session {
            None => GuardDecision::Redirect(login_redirect(path)),
            Some(claims) => match claims.role {
                Role::Admin | Role::Client => GuardDecision::Allow,
            },
        };
    }

    GuardDecision::Allow
}
