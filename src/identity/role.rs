use serde::{Deserialize, Serialize};

/// Closed set of account roles. Every guard branch matches exhaustively on
/// this enum so a new role forces a review of the whole decision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Client,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Client => "CLIENT",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "ADMIN" => Some(Role::Admin),
            "CLIENT" => Some(Role::Client),
            _ => None,
        }
    }
}

impl Default for Role {
    // Records with no stored role are treated as CLIENT
    fn default() -> Self { Role::Client }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
