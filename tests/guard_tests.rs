//! Route-guard decision table tests: every policy row from the access-control
//! design, plus the token-failure paths that must collapse to "no session".

use folio::identity::{
    decide, login_redirect, GuardDecision, Role, SessionClaims, TokenCodec, ADMIN_HOME, CLIENT_HOME,
};

fn session(role: Role) -> SessionClaims {
    SessionClaims { sub: "user-1".into(), role, iat: 0, exp: u64::MAX }
}

#[test]
fn login_page_without_session_renders() {
    assert_eq!(decide("/admin/login", None), GuardDecision::Allow);
}

#[test]
fn login_page_with_admin_session_bounces_to_admin_dashboard() {
    let s = session(Role::Admin);
    assert_eq!(
        decide("/admin/login", Some(&s)),
        GuardDecision::Redirect(ADMIN_HOME.to_string())
    );
}

#[test]
fn login_page_with_client_session_bounces_to_client_dashboard() {
    let s = session(Role::Client);
    assert_eq!(
        decide("/admin/login", Some(&s)),
        GuardDecision::Redirect(CLIENT_HOME.to_string())
    );
}

#[test]
fn admin_page_without_session_redirects_to_login_with_callback() {
    assert_eq!(
        decide("/admin/dashboard", None),
        GuardDecision::Redirect("/admin/login?callbackUrl=%2Fadmin%2Fdashboard".to_string())
    );
}

#[test]
fn admin_page_with_client_session_silently_downgrades() {
    let s = session(Role::Client);
    assert_eq!(
        decide("/admin/posts/new", Some(&s)),
        GuardDecision::Redirect(CLIENT_HOME.to_string())
    );
}

#[test]
fn admin_page_with_admin_session_is_allowed() {
    let s = session(Role::Admin);
    assert_eq!(decide("/admin/posts/new", Some(&s)), GuardDecision::Allow);
}

#[test]
fn client_page_without_session_redirects_to_login_with_callback() {
    assert_eq!(
        decide("/client/apps", None),
        GuardDecision::Redirect(login_redirect("/client/apps"))
    );
}

#[test]
fn client_page_allows_either_authenticated_role() {
    let admin = session(Role::Admin);
    let client = session(Role::Client);
    assert_eq!(decide("/client/dashboard", Some(&admin)), GuardDecision::Allow);
    assert_eq!(decide("/client/dashboard", Some(&client)), GuardDecision::Allow);
}

#[test]
fn unprotected_paths_pass_through() {
    assert_eq!(decide("/", None), GuardDecision::Allow);
    assert_eq!(decide("/blog/some-post", None), GuardDecision::Allow);
    assert_eq!(decide("/api/health", None), GuardDecision::Allow);
}

#[test]
fn expired_token_is_no_session_to_the_guard() {
    let codec = TokenCodec::new("guard-test-secret", 0).unwrap();
    let token = codec.mint("user-1", Role::Admin).unwrap();
    let claims = codec.verify(&token);
    assert!(claims.is_none(), "zero-ttl token must fail verification");
    assert_eq!(
        decide("/admin/dashboard", claims.as_ref()),
        GuardDecision::Redirect("/admin/login?callbackUrl=%2Fadmin%2Fdashboard".to_string())
    );
}

#[test]
fn forged_token_is_no_session_to_the_guard() {
    let codec = TokenCodec::new("guard-test-secret", 3600).unwrap();
    let forged = TokenCodec::new("other-secret", 3600)
        .unwrap()
        .mint("user-1", Role::Admin)
        .unwrap();
    let claims = codec.verify(&forged);
    assert!(claims.is_none(), "foreign signature must fail verification");
    assert_eq!(
        decide("/admin/dashboard", claims.as_ref()),
        GuardDecision::Redirect("/admin/login?callbackUrl=%2Fadmin%2Fdashboard".to_string())
    );
}
