//! Default-admin policy tests: the distinguished admin identity cannot be
//! demoted, deleted or duplicated, and nobody else can be promoted to it.

use anyhow::Result;
use tempfile::{tempdir, TempDir};

use folio::error::AppError;
use folio::identity::Role;
use folio::security::{NewUser, User, UserStore};

const ADMIN_EMAIL: &str = "admin@folio.local";

fn new_client(email: &str) -> NewUser {
    NewUser {
        email: email.into(),
        password: "pw-client".into(),
        display_name: "Client".into(),
        role: Role::Client,
        company: None,
        logo_url: None,
    }
}

fn seeded_store() -> Result<(TempDir, UserStore, User, User)> {
    let tmp = tempdir()?;
    let store = UserStore::open(tmp.path(), ADMIN_EMAIL)?;
    store.ensure_default_admin("hunter2")?;
    let admin = store.find_by_email(ADMIN_EMAIL)?.expect("seeded admin");
    let client = store.add_user(new_client("bob@example.com"))?;
    Ok((tmp, store, admin, client))
}

#[test]
fn seed_creates_the_default_admin_once() -> Result<()> {
    let (_tmp, store, admin, _client) = seeded_store()?;
    assert_eq!(admin.role, Role::Admin);
    // Re-running the seed must not reset anything
    store.ensure_default_admin("different")?;
    let again = store.find_by_email(ADMIN_EMAIL)?.unwrap();
    assert_eq!(again.id, admin.id);
    assert_eq!(again.password_hash, admin.password_hash);
    Ok(())
}

#[test]
fn default_admin_cannot_be_demoted() -> Result<()> {
    let (_tmp, store, admin, _client) = seeded_store()?;
    let err = store.update_role(&admin.id, Role::Client).unwrap_err();
    assert!(matches!(err, AppError::Forbidden { .. }), "got {err}");
    assert_eq!(store.find_by_id(&admin.id)?.unwrap().role, Role::Admin);
    Ok(())
}

#[test]
fn no_other_account_can_be_promoted_to_admin() -> Result<()> {
    let (_tmp, store, _admin, client) = seeded_store()?;
    let err = store.update_role(&client.id, Role::Admin).unwrap_err();
    assert!(matches!(err, AppError::Forbidden { .. }), "got {err}");
    assert_eq!(store.find_by_id(&client.id)?.unwrap().role, Role::Client);
    Ok(())
}

#[test]
fn adding_a_second_admin_account_is_rejected() -> Result<()> {
    let (_tmp, store, _admin, _client) = seeded_store()?;
    let mut nu = new_client("mallory@example.com");
    nu.role = Role::Admin;
    let err = store.add_user(nu).unwrap_err();
    assert!(matches!(err, AppError::Forbidden { .. }), "got {err}");
    Ok(())
}

#[test]
fn reassigning_an_existing_role_is_a_no_op_success() -> Result<()> {
    let (_tmp, store, admin, client) = seeded_store()?;
    store.update_role(&client.id, Role::Client)?;
    store.update_role(&admin.id, Role::Admin)?;
    Ok(())
}

#[test]
fn duplicate_email_is_a_conflict() -> Result<()> {
    let (_tmp, store, _admin, _client) = seeded_store()?;
    let err = store.add_user(new_client("bob@example.com")).unwrap_err();
    assert!(matches!(err, AppError::Conflict { .. }), "got {err}");
    Ok(())
}

#[test]
fn self_deletion_is_rejected() -> Result<()> {
    let (_tmp, store, _admin, client) = seeded_store()?;
    let err = store.delete_user(&client.id, &client.id).unwrap_err();
    assert!(matches!(err, AppError::Forbidden { .. }), "got {err}");
    assert!(store.find_by_id(&client.id)?.is_some());
    Ok(())
}

#[test]
fn default_admin_cannot_be_deleted() -> Result<()> {
    let (_tmp, store, admin, client) = seeded_store()?;
    let err = store.delete_user(&client.id, &admin.id).unwrap_err();
    assert!(matches!(err, AppError::Forbidden { .. }), "got {err}");
    assert!(store.find_by_id(&admin.id)?.is_some());
    Ok(())
}

#[test]
fn admin_can_delete_other_accounts() -> Result<()> {
    let (_tmp, store, admin, client) = seeded_store()?;
    store.delete_user(&admin.id, &client.id)?;
    assert!(store.find_by_id(&client.id)?.is_none());
    Ok(())
}

#[test]
fn profile_and_password_updates_apply() -> Result<()> {
    let (_tmp, store, _admin, client) = seeded_store()?;
    store.update_profile(&client.id, Some("Bob".into()), Some("Acme".into()), None)?;
    let u = store.find_by_id(&client.id)?.unwrap();
    assert_eq!(u.display_name, "Bob");
    assert_eq!(u.company.as_deref(), Some("Acme"));
    assert!(u.logo_url.is_none());

    store.update_password(&client.id, "new-pass")?;
    let u = store.find_by_id(&client.id)?.unwrap();
    assert!(folio::security::verify_password(&u.password_hash, "new-pass"));
    assert!(!folio::security::verify_password(&u.password_hash, "pw-client"));
    Ok(())
}
