//! Users and roles
//!
//! Roles are a closed set. Every authorization decision is an exhaustive
//! `match` on `Role`, so adding a role forces each check site to be revisited.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::UnknownLabel;

/// Operator roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Driver,
    #[serde(rename = "Load Support")]
    LoadSupport,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Driver => "Driver",
            Role::LoadSupport => "Load Support",
        }
    }

    pub fn is_admin(&self) -> bool {
        match self {
            Role::Admin => true,
            Role::Driver | Role::LoadSupport => false,
        }
    }

    pub fn can_check_out(&self) -> bool {
        match self {
            Role::Admin | Role::Driver => true,
            Role::LoadSupport => false,
        }
    }

    /// Plain check-in closes the caller's own trip; admins use force check-in.
    pub fn can_check_in(&self) -> bool {
        match self {
            Role::Driver => true,
            Role::Admin | Role::LoadSupport => false,
        }
    }

    pub fn can_swap(&self) -> bool {
        match self {
            Role::Admin | Role::Driver => true,
            Role::LoadSupport => false,
        }
    }

    pub fn can_update_location(&self) -> bool {
        match self {
            Role::Admin | Role::LoadSupport => true,
            Role::Driver => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Admin" => Ok(Role::Admin),
            "Driver" => Ok(Role::Driver),
            "Load Support" => Ok(Role::LoadSupport),
            other => Err(UnknownLabel::new("role", other)),
        }
    }
}

/// User registry row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub carrier: String,
}

/// A user without credentials, for listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub username: String,
    pub role: Role,
    pub carrier: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            role: user.role,
            carrier: user.carrier.clone(),
        }
    }
}

/// Snapshot of the user registry with case-insensitive lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserDirectory {
    pub users: Vec<User>,
}

impl UserDirectory {
    pub fn new(users: Vec<User>) -> Self {
        Self { users }
    }

    pub fn find(&self, username: &str) -> Option<&User> {
        self.users
            .iter()
            .find(|user| user.username.eq_ignore_ascii_case(username.trim()))
    }

    pub fn contains(&self, username: &str) -> bool {
        self.find(username).is_some()
    }

    pub fn summaries(&self) -> Vec<UserSummary> {
        self.users
            .iter()
            .filter(|user| !user.username.is_empty())
            .map(UserSummary::from)
            .collect()
    }

    pub fn carrier_of(&self, username: &str) -> Option<&str> {
        self.find(username).map(|user| user.carrier.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str, role: Role) -> User {
        User {
            username: name.to_string(),
            password_hash: "x".to_string(),
            role,
            carrier: "ACME".to_string(),
        }
    }

    #[test]
    fn test_role_labels() {
        assert_eq!("Load Support".parse::<Role>(), Ok(Role::LoadSupport));
        assert_eq!(serde_json::to_string(&Role::LoadSupport).unwrap(), "\"Load Support\"");
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_capabilities() {
        assert!(Role::Driver.can_check_out());
        assert!(Role::Driver.can_check_in());
        assert!(!Role::Driver.can_update_location());
        assert!(!Role::LoadSupport.can_check_out());
        assert!(Role::LoadSupport.can_update_location());
        assert!(Role::Admin.can_swap());
        assert!(!Role::Admin.can_check_in());
        assert!(Role::Admin.is_admin());
    }

    #[test]
    fn test_directory_lookup_is_case_insensitive() {
        let directory = UserDirectory::new(vec![user("JSmith", Role::Driver), user("boss", Role::Admin)]);
        assert_eq!(directory.find("jsmith").map(|u| u.role), Some(Role::Driver));
        assert_eq!(directory.find(" BOSS ").map(|u| u.role), Some(Role::Admin));
        assert!(!directory.contains("nobody"));
        assert_eq!(directory.carrier_of("jsmith"), Some("ACME"));
    }
}
