use hmac::{digest::KeyInit, Hmac};
use jwt::{SignWithKey, VerifyWithKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use anyhow::{anyhow, Result};

use super::role::Role;

/// Default session lifetime: 24 hours.
pub const SESSION_TTL_SECS: u64 = 24 * 3600;

/// Claims embedded in every session token: the user id, the role the token
/// was minted with, and the issue/expiry timestamps. Nothing else is carried;
/// the route guard decides from these claims alone, without a store lookup,
/// so they are trusted until `exp` even if the user record changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub sub: String,
    pub role: Role,
    pub iat: u64,
    pub exp: u64,
}

/// Mints and verifies signed, stateless session tokens (HMAC-SHA256).
/// Constructed once at startup from the configured secret and TTL.
pub struct TokenCodec {
    key: Hmac<Sha256>,
    ttl_secs: u64,
}

impl TokenCodec {
    pub fn new(secret: &str, ttl_secs: u64) -> Result<Self> {
        if secret.is_empty() {
            return Err(anyhow!("session signing secret must not be empty"));
        }
        let key = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .map_err(|e| anyhow!("invalid signing key: {}", e))?;
        Ok(Self { key, ttl_secs })
    }

    /// Sign a token for the given user and role, expiring `ttl_secs` from now.
    pub fn mint(&self, user_id: &str, role: Role) -> Result<String> {
        let now = Self::now();
        let claims = SessionClaims {
            sub: user_id.to_string(),
            role,
            iat: now,
            exp: now + self.ttl_secs,
        };
        claims
            .sign_with_key(&self.key)
            .map_err(|e| anyhow!("token signing failed: {}", e))
    }

    /// Decode and check a token. Returns `None` on any failure: malformed
    /// input, bad signature or expiry. Callers cannot tell these apart; each
    /// means "no session".
    pub fn verify(&self, token: &str) -> Option<SessionClaims> {
        let claims: SessionClaims = token.verify_with_key(&self.key).ok()?;
        if claims.exp <= Self::now() {
            return None;
        }
        Some(claims)
    }

    fn now() -> u64 {
        chrono::Utc::now().timestamp().max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::new("unit-test-secret", 60).unwrap()
    }

    #[test]
    fn mint_then_verify_round_trips_claims() {
        let c = codec();
        let token = c.mint("user-1", Role::Admin).unwrap();
        let claims = c.verify(&token).expect("fresh token should verify");
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.role, Role::Admin);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_token_fails_verification() {
        let c = TokenCodec::new("unit-test-secret", 0).unwrap();
        let token = c.mint("user-1", Role::Client).unwrap();
        assert!(c.verify(&token).is_none(), "zero-ttl token must be expired");
    }

    #[test]
    fn malformed_tokens_fail_without_panicking() {
        let c = codec();
        assert!(c.verify("").is_none());
        assert!(c.verify("not-a-token").is_none());
        assert!(c.verify("a.b.c").is_none());
        assert!(c.verify("\u{1F980}").is_none());
    }

    #[test]
    fn token_signed_with_other_key_is_rejected() {
        let minter = TokenCodec::new("secret-a", 60).unwrap();
        let verifier = TokenCodec::new("secret-b", 60).unwrap();
        let token = minter.mint("user-1", Role::Client).unwrap();
        assert!(verifier.verify(&token).is_none());
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(TokenCodec::new("", 60).is_err());
    }
}
