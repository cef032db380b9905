use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Deserialize, Debug, ToSchema, Validate)]
pub struct RegisterForm {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 5, message = "The length of password should be greater than 5"))]
    pub password: String,
}

#[derive(Deserialize, Debug, ToSchema, Validate)]
pub struct LoginForm {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug, ToSchema, Validate)]
pub struct PasswordResetForm {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 5, message = "The length of password should be greater than 5"))]
    pub password: String,
}

/// Returned to API clients instead of the browser redirect.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CsrfResponse {
    pub csrf_token: String,
}
