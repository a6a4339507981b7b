//! User catalog and password hashing.
//! Accounts live in a single users.parquet under the data root; mutations
//! rewrite the whole frame under a write lock. The default-admin identity is
//! enforced here: it is the only account allowed to hold ADMIN, and it can
//! be neither demoted nor deleted.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use chrono::Utc;
use parking_lot::RwLock;
use password_hash::{PasswordHash, SaltString};
use polars::prelude::*;

use crate::error::{AppError, AppResult};
use crate::identity::Role;

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub role: Role,
    pub company: Option<String>,
    pub logo_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub role: Role,
    pub company: Option<String>,
    pub logo_url: Option<String>,
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes)
        .map_err(|e| AppError::internal("salt", e.to_string().as_str()))?;
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AppError::internal("salt_b64", e.to_string().as_str()))?;
    let argon2 = Argon2::default();
    let phc = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::internal("hash", e.to_string().as_str()))?
        .to_string();
    Ok(phc)
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        let argon2 = Argon2::default();
        argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    } else { false }
}

fn users_path(root: &Path) -> PathBuf { root.join("users.parquet") }

fn str_at(df: &DataFrame, col: &str, i: usize) -> AppResult<String> {
    let v = df.column(col)?.get(i)?;
    Ok(match v {
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        _ => String::new(),
    })
}

fn opt_str(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

/// Handle on the users.parquet catalog. Cheap to clone; all clones share one
/// lock, so concurrent mutations serialize on the file.
#[derive(Clone)]
pub struct UserStore {
    root: PathBuf,
    default_admin_email: String,
    lock: Arc<RwLock<()>>,
}

impl UserStore {
    pub fn open(root: impl AsRef<Path>, default_admin_email: &str) -> AppResult<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            default_admin_email: default_admin_email.to_string(),
            lock: Arc::new(RwLock::new(())),
        })
    }

    pub fn default_admin_email(&self) -> &str { &self.default_admin_email }

    fn load(&self) -> AppResult<Vec<User>> {
        let path = users_path(&self.root);
        if !path.exists() { return Ok(Vec::new()); }
        let file = std::fs::File::open(&path)?;
        let df = ParquetReader::new(file).finish()?;
        let mut out = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let role = Role::parse(&str_at(&df, "role", i)?).unwrap_or_default();
            out.push(User {
                id: str_at(&df, "id", i)?,
                email: str_at(&df, "email", i)?,
                password_hash: str_at(&df, "password_hash", i)?,
                display_name: str_at(&df, "display_name", i)?,
                role,
                company: opt_str(str_at(&df, "company", i)?),
                logo_url: opt_str(str_at(&df, "logo_url", i)?),
                created_at: df.column("created_at")?.i64()?.get(i).unwrap_or(0),
                updated_at: df.column("updated_at")?.i64()?.get(i).unwrap_or(0),
            });
        }
        Ok(out)
    }

    fn save(&self, users: &[User]) -> AppResult<()> {
        let path = users_path(&self.root);
        if let Some(dir) = path.parent() { std::fs::create_dir_all(dir).ok(); }
        let mut df = DataFrame::new(vec![
            Series::new("id".into(), users.iter().map(|u| u.id.clone()).collect::<Vec<_>>()).into(),
            Series::new("email".into(), users.iter().map(|u| u.email.clone()).collect::<Vec<_>>()).into(),
            Series::new("password_hash".into(), users.iter().map(|u| u.password_hash.clone()).collect::<Vec<_>>()).into(),
            Series::new("display_name".into(), users.iter().map(|u| u.display_name.clone()).collect::<Vec<_>>()).into(),
            Series::new("role".into(), users.iter().map(|u| u.role.as_str().to_string()).collect::<Vec<_>>()).into(),
            Series::new("company".into(), users.iter().map(|u| u.company.clone().unwrap_or_default()).collect::<Vec<_>>()).into(),
            Series::new("logo_url".into(), users.iter().map(|u| u.logo_url.clone().unwrap_or_default()).collect::<Vec<_>>()).into(),
            Series::new("created_at".into(), users.iter().map(|u| u.created_at).collect::<Vec<_>>()).into(),
            Series::new("updated_at".into(), users.iter().map(|u| u.updated_at).collect::<Vec<_>>()).into(),
        ])?;
        let mut f = std::fs::File::create(&path)?;
        ParquetWriter::new(&mut f).finish(&mut df)?;
        Ok(())
    }

    /// First-run seed: create the catalog with the default admin account.
    /// A catalog that already exists is left untouched.
    pub fn ensure_default_admin(&self, initial_password: &str) -> AppResult<()> {
        let _g = self.lock.write();
        if users_path(&self.root).exists() { return Ok(()); }
        let now = Utc::now().timestamp_millis();
        let admin = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: self.default_admin_email.clone(),
            password_hash: hash_password(initial_password)?,
            display_name: "Administrator".to_string(),
            role: Role::Admin,
            company: None,
            logo_url: None,
            created_at: now,
            updated_at: now,
        };
        self.save(&[admin])
    }

    /// Exact, case-sensitive email match.
    pub fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let _g = self.lock.read();
        Ok(self.load()?.into_iter().find(|u| u.email == email))
    }

    pub fn find_by_id(&self, id: &str) -> AppResult<Option<User>> {
        let _g = self.lock.read();
        Ok(self.load()?.into_iter().find(|u| u.id == id))
    }

    pub fn list(&self) -> AppResult<Vec<User>> {
        let _g = self.lock.read();
        self.load()
    }

    pub fn add_user(&self, nu: NewUser) -> AppResult<User> {
        let _g = self.lock.write();
        let mut users = self.load()?;
        if users.iter().any(|u| u.email == nu.email) {
            return Err(AppError::conflict("email_exists", "email already registered"));
        }
        match nu.role {
            Role::Admin if nu.email != self.default_admin_email => {
                return Err(AppError::forbidden(
                    "admin_reserved",
                    "only the default admin account may hold the ADMIN role",
                ));
            }
            Role::Admin | Role::Client => {}
        }
        let now = Utc::now().timestamp_millis();
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: nu.email,
            password_hash: hash_password(&nu.password)?,
            display_name: nu.display_name,
            role: nu.role,
            company: nu.company,
            logo_url: nu.logo_url,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        self.save(&users)?;
        Ok(user)
    }

    pub fn update_role(&self, target_id: &str, role: Role) -> AppResult<()> {
        let _g = self.lock.write();
        let mut users = self.load()?;
        let Some(user) = users.iter_mut().find(|u| u.id == target_id) else {
            return Err(AppError::not_found("user_not_found", "no such user"));
        };
        let is_default_admin = user.email == self.default_admin_email;
        match role {
            Role::Client if is_default_admin => {
                return Err(AppError::forbidden("admin_immutable", "the default admin cannot be demoted"));
            }
            Role::Admin if !is_default_admin => {
                return Err(AppError::forbidden(
                    "admin_reserved",
                    "only the default admin account may hold the ADMIN role",
                ));
            }
            Role::Admin | Role::Client => {}
        }
        user.role = role;
        user.updated_at = Utc::now().timestamp_millis();
        self.save(&users)
    }

    pub fn update_password(&self, target_id: &str, new_password: &str) -> AppResult<()> {
        let _g = self.lock.write();
        let mut users = self.load()?;
        let Some(user) = users.iter_mut().find(|u| u.id == target_id) else {
            return Err(AppError::not_found("user_not_found", "no such user"));
        };
        user.password_hash = hash_password(new_password)?;
        user.updated_at = Utc::now().timestamp_millis();
        self.save(&users)
    }

    /// Partial profile update; `None` keeps the current value.
    pub fn update_profile(
        &self,
        target_id: &str,
        display_name: Option<String>,
        company: Option<String>,
        logo_url: Option<String>,
    ) -> AppResult<()> {
        let _g = self.lock.write();
        let mut users = self.load()?;
        let Some(user) = users.iter_mut().find(|u| u.id == target_id) else {
            return Err(AppError::not_found("user_not_found", "no such user"));
        };
        if let Some(name) = display_name { user.display_name = name; }
        if let Some(c) = company { user.company = Some(c); }
        if let Some(l) = logo_url { user.logo_url = Some(l); }
        user.updated_at = Utc::now().timestamp_millis();
        self.save(&users)
    }

    pub fn delete_user(&self, caller_id: &str, target_id: &str) -> AppResult<()> {
        if caller_id == target_id {
            return Err(AppError::forbidden("self_delete", "cannot delete your own account"));
        }
        let _g = self.lock.write();
        let mut users = self.load()?;
        let Some(idx) = users.iter().position(|u| u.id == target_id) else {
            return Err(AppError::not_found("user_not_found", "no such user"));
        };
        if users[idx].email == self.default_admin_email {
            return Err(AppError::forbidden("admin_undeletable", "the default admin cannot be deleted"));
        }
        users.remove(idx);
        self.save(&users)
    }
}
