use anyhow::Result;
use once_cell::sync::Lazy;

use crate::security::{self, UserStore};
use crate::tprintln;

use super::role::Role;

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Result of a successful credential check: just enough for the token codec
/// to mint a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub role: Role,
}

pub trait AuthProvider: Send + Sync {
    /// Returns `Ok(None)` for bad credentials of either kind; only
    /// infrastructure faults surface as errors.
    fn authenticate(&self, req: &LoginRequest) -> Result<Option<AuthenticatedUser>>;
}

// PHC hash of a throwaway password. Verified against when the email lookup
// misses, keeping unknown-email latency in line with wrong-password.
static DUMMY_PHC: Lazy<String> =
    Lazy::new(|| security::hash_password("folio-dummy-credential").expect("static dummy hash"));

pub struct LocalAuthProvider {
    store: UserStore,
}

impl LocalAuthProvider {
    pub fn new(store: UserStore) -> Self { Self { store } }
}

impl AuthProvider for LocalAuthProvider {
    fn authenticate(&self, req: &LoginRequest) -> Result<Option<AuthenticatedUser>> {
        match self.store.find_by_email(&req.email)? {
            Some(user) => {
                if security::verify_password(&user.password_hash, &req.password) {
                    tprintln!("auth.login email={} ok", req.email);
                    Ok(Some(AuthenticatedUser { user_id: user.id, role: user.role }))
                } else {
                    tprintln!("auth.login email={} rejected", req.email);
                    Ok(None)
                }
            }
            None => {
                let _ = security::verify_password(&DUMMY_PHC, &req.password);
                tprintln!("auth.login email={} rejected", req.email);
                Ok(None)
            }
        }
    }
}
