use axum::{
    extract::rejection::FormRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::{
    gateway::GatewayError,
    response::{ApiResponse, Meta},
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    OutOfStock(String),

    #[error("Order already delivered")]
    AlreadyDelivered,

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn forbidden() -> Self {
        AppError::Forbidden("Forbidden".into())
    }

    pub fn not_found(what: &str) -> Self {
        AppError::NotFound(format!("{what} not found"))
    }

    /// Expected business outcomes, as opposed to infrastructure failures.
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_)
        )
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::AlreadyDelivered => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) | AppError::OutOfStock(_) => StatusCode::CONFLICT,
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Text safe to show to the caller. Infrastructure details stay in the logs.
    pub fn public_message(&self) -> String {
        if self.is_rejection() {
            self.to_string()
        } else {
            "Internal Server Error".to_string()
        }
    }

    pub(crate) fn log(&self) {
        match self {
            AppError::DbError(err) => tracing::error!(error = %err, "database failure"),
            AppError::OrmError(err) => tracing::error!(error = %err, "orm failure"),
            AppError::Internal(err) => tracing::error!(error = ?err, "internal failure"),
            other => tracing::debug!(rejection = %other, "request rejected"),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields = errors.field_errors();
        let mut names: Vec<_> = fields.keys().collect();
        names.sort();
        let message = names
            .first()
            .and_then(|name| fields.get(*name))
            .and_then(|errs| errs.first())
            .map(|err| match &err.message {
                Some(message) => message.to_string(),
                None => format!("Invalid {}", err.code),
            })
            .unwrap_or_else(|| "Invalid input".to_string());
        AppError::Validation(message)
    }
}

/// Malformed form bodies are the caller's mistake, reported like any other bad input.
impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        tracing::debug!(detail = %rejection.body_text(), "form body rejected");
        AppError::Validation("Invalid form input".into())
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::UnknownIntent(_) => AppError::NotFound("Payment intent not found".into()),
            GatewayError::Rejected(reason) => {
                AppError::Validation(format!("Payment was rejected: {reason}"))
            }
            GatewayError::Transport(err) => AppError::Internal(err.into()),
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.status();
        let message = self.public_message();

        let body = ApiResponse {
            message: message.clone(),
            data: Some(ErrorData { error: message }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_keep_their_message() {
        let err = AppError::Conflict("Product already in a bag".into());
        assert!(err.is_rejection());
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.public_message(), "Product already in a bag");
    }

    #[test]
    fn infrastructure_failures_hide_details() {
        let err = AppError::Internal(anyhow::anyhow!("connection refused on 10.0.0.3"));
        assert!(!err.is_rejection());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Internal Server Error");
    }

    #[test]
    fn validation_errors_surface_the_first_field_message() {
        use validator::Validate;

        let form = crate::dto::auth::RegisterForm {
            email: "not-an-email".into(),
            password: "abc".into(),
        };
        let err: AppError = form.validate().unwrap_err().into();
        match err {
            AppError::Validation(message) => assert_eq!(message, "Invalid email address"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn already_delivered_is_a_bad_request() {
        assert_eq!(AppError::AlreadyDelivered.status(), StatusCode::BAD_REQUEST);
        assert!(AppError::AlreadyDelivered.to_string().contains("already delivered"));
    }
}
