//!
//! folio maintenance CLI
//! ---------------------
//! Operator tool for the user catalog: seed or add accounts, rotate
//! passwords and roles, and generate a session signing secret. Works
//! directly on the data root; the server does not need to be running.

use anyhow::{anyhow, Result};
use base64::Engine;
use std::env;

use folio::identity::Role;
use folio::security::{NewUser, UserStore};

fn parse_arg(args: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        i += 1;
    }
    None
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn usage() {
    println!(
        "folio admin\n\nUSAGE:\n  folio_admin <command> [options]\n\nCOMMANDS:\n  \
         add-user      --email E --password P [--name N] [--role ADMIN|CLIENT] [--company C]\n  \
         set-password  --email E --password P\n  \
         set-role      --email E --role ADMIN|CLIENT\n  \
         list\n  \
         gen-secret\n\nOPTIONS:\n  \
         --data-root PATH    Data root folder (env: FOLIO_DATA_ROOT, default data)\n  \
         --admin-email E     Default admin email (env: FOLIO_ADMIN_EMAIL, default admin@folio.local)\n"
    );
}

fn open_store(args: &[String]) -> Result<UserStore> {
    let data_root = parse_arg(args, "--data-root")
        .or_else(|| env::var("FOLIO_DATA_ROOT").ok())
        .unwrap_or_else(|| "data".to_string());
    let admin_email = parse_arg(args, "--admin-email")
        .or_else(|| env::var("FOLIO_ADMIN_EMAIL").ok())
        .unwrap_or_else(|| "admin@folio.local".to_string());
    Ok(UserStore::open(&data_root, &admin_email)?)
}

fn require(args: &[String], flag: &str) -> Result<String> {
    parse_arg(args, flag).ok_or_else(|| anyhow!("missing required option: {}", flag))
}

fn parse_role(s: &str) -> Result<Role> {
    Role::parse(s).ok_or_else(|| anyhow!("invalid role '{}': expected ADMIN or CLIENT", s))
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() || has_flag(&args, "--help") || has_flag(&args, "-h") {
        usage();
        return Ok(());
    }

    match args[0].as_str() {
        "add-user" => {
            let store = open_store(&args)?;
            let role = match parse_arg(&args, "--role") {
                Some(r) => parse_role(&r)?,
                None => Role::Client,
            };
            let user = store.add_user(NewUser {
                email: require(&args, "--email")?,
                password: require(&args, "--password")?,
                display_name: parse_arg(&args, "--name").unwrap_or_default(),
                role,
                company: parse_arg(&args, "--company"),
                logo_url: None,
            })?;
            println!("created {} ({}) role={}", user.email, user.id, user.role);
        }
        "set-password" => {
            let store = open_store(&args)?;
            let email = require(&args, "--email")?;
            let user = store
                .find_by_email(&email)?
                .ok_or_else(|| anyhow!("no user with email {}", email))?;
            store.update_password(&user.id, &require(&args, "--password")?)?;
            println!("password updated for {}", email);
        }
        "set-role" => {
            let store = open_store(&args)?;
            let email = require(&args, "--email")?;
            let user = store
                .find_by_email(&email)?
                .ok_or_else(|| anyhow!("no user with email {}", email))?;
            store.update_role(&user.id, parse_role(&require(&args, "--role")?)?)?;
            println!("role updated for {}", email);
        }
        "list" => {
            let store = open_store(&args)?;
            let users = store.list()?;
            if users.is_empty() {
                println!("no users under this data root");
            }
            for u in users {
                println!("{}  {}  {}  {}", u.id, u.role, u.email, u.display_name);
            }
        }
        "gen-secret" => {
            // 256-bit random secret, base64url without padding
            let mut buf = [0u8; 32];
            getrandom::getrandom(&mut buf).map_err(|e| anyhow!(e.to_string()))?;
            println!("{}", base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf));
        }
        other => {
            usage();
            return Err(anyhow!("unknown command: {}", other));
        }
    }
    Ok(())
}
