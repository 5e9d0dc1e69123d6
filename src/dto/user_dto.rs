use serde::Deserialize;
use validator::Validate;

use crate::models::Role;
use crate::services::NewUser;
use crate::utils::validation::validate_not_blank;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 50), custom = "validate_not_blank")]
    pub username: String,

    #[validate(length(min = 1))]
    pub password: String,

    pub role: Role,

    #[serde(default)]
    pub carrier: String,
}

impl From<CreateUserRequest> for NewUser {
    fn from(request: CreateUserRequest) -> Self {
        Self {
            username: request.username,
            password: request.password,
            role: request.role,
            carrier: request.carrier,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct EditUserRequest {
    pub role: Role,

    #[serde(default)]
    #[validate(length(max = 100))]
    pub carrier: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1))]
    pub new_password: String,
}

/// Lines of `username,password,role,carrier`.
#[derive(Debug, Deserialize, Validate)]
pub struct BulkCreateRequest {
    #[validate(length(min = 1))]
    pub csv_data: String,
}
