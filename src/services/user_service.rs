//! User administration
//!
//! Admin-only account management, including CSV bulk import with per-line
//! error reporting.

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use super::password::PasswordHasher;
use super::projection_service::ProjectionService;
use crate::cache::CacheKey;
use crate::models::{Identity, Role, User, UserSummary};
use crate::repositories::Repositories;
use crate::utils::errors::{bad_request_error, conflict_error, not_found_error, AppError, AppResult};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub role: Role,
    pub carrier: String,
}

/// A bulk import line that was skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("Line {line}: {reason}")]
pub struct MalformedBulkRow {
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BulkCreateReport {
    pub created: usize,
    pub errors: Vec<MalformedBulkRow>,
}

impl BulkCreateReport {
    pub fn message(&self) -> String {
        let mut message = format!(
            "Batch process complete. Successfully created {} users.",
            self.created
        );
        if let Some(first) = self.errors.first() {
            message.push_str(&format!(
                " Skipped {} rows due to errors. First error: {}",
                self.errors.len(),
                first
            ));
        }
        message
    }
}

#[derive(Clone)]
pub struct UserService {
    repos: Repositories,
    projections: ProjectionService,
    hasher: Arc<dyn PasswordHasher>,
}

impl UserService {
    pub fn new(repos: Repositories, projections: ProjectionService, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self {
            repos,
            projections,
            hasher,
        }
    }

    fn require_admin(identity: &Identity) -> AppResult<()> {
        if identity.role.is_admin() {
            Ok(())
        } else {
            Err(AppError::PermissionDenied)
        }
    }

    async fn invalidate(&self) {
        self.projections
            .cache()
            .invalidate(&[CacheKey::UserDirectory])
            .await;
    }

    pub async fn list_users(&self, identity: &Identity) -> AppResult<Vec<UserSummary>> {
        Self::require_admin(identity)?;
        Ok(self.projections.user_directory().await?.summaries())
    }

    pub async fn add_user(&self, identity: &Identity, new_user: NewUser) -> AppResult<String> {
        Self::require_admin(identity)?;
        let username = new_user.username.trim().to_string();
        if username.is_empty() || new_user.password.is_empty() {
            return Err(bad_request_error("Username and password are required."));
        }
        if self.projections.user_directory().await?.contains(&username) {
            return Err(conflict_error("User", "username", &username));
        }

        let user = User {
            username: username.clone(),
            password_hash: self.hasher.hash(&new_user.password)?,
            role: new_user.role,
            carrier: new_user.carrier.trim().to_string(),
        };
        self.repos.users.insert_users(vec![user]).await?;
        self.invalidate().await;

        info!("👤 {} created user {}", identity.username, username);
        Ok(format!("User \"{}\" created successfully.", username))
    }

    pub async fn edit_user(
        &self,
        identity: &Identity,
        username: &str,
        role: Role,
        carrier: &str,
    ) -> AppResult<String> {
        Self::require_admin(identity)?;
        if !self.repos.users.update_profile(username, role, carrier.trim()).await? {
            return Err(not_found_error("User", username));
        }
        self.invalidate().await;
        info!("👤 {} updated user {}", identity.username, username);
        Ok(format!("User \"{}\" updated successfully.", username))
    }

    pub async fn reset_password(
        &self,
        identity: &Identity,
        username: &str,
        new_password: &str,
    ) -> AppResult<String> {
        Self::require_admin(identity)?;
        if new_password.is_empty() {
            return Err(bad_request_error("A new password is required."));
        }
        let hash = self.hasher.hash(new_password)?;
        if !self.repos.users.set_password_hash(username, &hash).await? {
            return Err(not_found_error("User", username));
        }
        self.invalidate().await;
        info!("🔐 {} reset the password of {}", identity.username, username);
        Ok(format!("Password reset for user \"{}\".", username))
    }

    pub async fn delete_user(&self, identity: &Identity, username: &str) -> AppResult<String> {
        Self::require_admin(identity)?;
        if !self.repos.users.delete_user(username).await? {
            return Err(not_found_error("User", username));
        }
        self.invalidate().await;
        info!("🗑️ {} deleted user {}", identity.username, username);
        Ok(format!("User \"{}\" has been deleted.", username))
    }

    /// Import `username,password,role,carrier` lines. Valid rows are
    /// inserted together; invalid ones are reported and skipped.
    pub async fn bulk_create(&self, identity: &Identity, csv: &str) -> AppResult<BulkCreateReport> {
        Self::require_admin(identity)?;
        let directory = self.projections.user_directory().await?;

        let mut report = BulkCreateReport::default();
        let mut accepted: Vec<User> = Vec::new();

        for (index, line) in csv.split('\n').enumerate() {
            let line_number = index + 1;
            let parsed = match parse_bulk_line(line) {
                Some(parsed) => parsed,
                None => continue,
            };
            let row = match parsed {
                Ok(row) => row,
                Err(reason) => {
                    report.errors.push(MalformedBulkRow { line: line_number, reason });
                    continue;
                }
            };

            let duplicate = directory.contains(&row.username)
                || accepted
                    .iter()
                    .any(|u| u.username.eq_ignore_ascii_case(&row.username));
            if duplicate {
                report.errors.push(MalformedBulkRow {
                    line: line_number,
                    reason: format!("Username \"{}\" already exists.", row.username),
                });
                continue;
            }

            accepted.push(User {
                password_hash: self.hasher.hash(&row.password)?,
                username: row.username,
                role: row.role,
                carrier: row.carrier,
            });
        }

        if !accepted.is_empty() {
            report.created = accepted.len();
            self.repos.users.insert_users(accepted).await?;
            self.invalidate().await;
        }

        if !report.errors.is_empty() {
            warn!("⚠️ Bulk import skipped {} rows", report.errors.len());
        }
        info!("👥 {} bulk-created {} users", identity.username, report.created);
        Ok(report)
    }
}

/// `None` for blank lines.
fn parse_bulk_line(line: &str) -> Option<Result<NewUser, String>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != 4 {
        return Some(Err(format!(
            "Incorrect number of fields. Expected 4, got {}.",
            fields.len()
        )));
    }
    let (username, password, role, carrier) = (fields[0], fields[1], fields[2], fields[3]);
    if username.is_empty() || password.is_empty() || role.is_empty() {
        return Some(Err("Username, password, and role are required.".to_string()));
    }
    let role = match role.parse::<Role>() {
        Ok(role) => role,
        Err(_) => {
            return Some(Err(format!(
                "Invalid role \"{}\". Must be Admin, Driver, or Load Support.",
                role
            )))
        }
    };
    Some(Ok(NewUser {
        username: username.to_string(),
        password: password.to_string(),
        role,
        carrier: carrier.to_string(),
    }))
}
