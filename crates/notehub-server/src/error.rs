use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use notehub_store::StoreError;

use crate::quota::minutes_left;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("User not found")]
    UserNotFound,

    #[error("Channel not found")]
    ChannelNotFound,

    #[error("File not found: {0}")]
    BlobNotFound(String),

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("You are already a member of this channel")]
    AlreadyMember,

    #[error("Invalid security password")]
    InvalidSecurityPass,

    #[error("Incorrect password.")]
    InvalidCredentials,

    #[error("Only admin can remove users")]
    Forbidden,

    #[error("Cannot remove the last admin of a channel")]
    LastAdmin,

    #[error("No file uploaded")]
    MissingFile,

    #[error("File too large. Maximum {}MB.", .max / (1024 * 1024))]
    FileTooLarge { max: usize },

    #[error("{}", quota_message(.retry_after))]
    QuotaExceeded { retry_after: Option<Duration> },

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Could not allocate a unique channel code")]
    CodespaceExhausted,

    #[error("Blob storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Store(#[from] StoreError),
}

fn quota_message(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(wait) => format!(
            "Storage rate limit exceeded. Try again in {} minutes.",
            minutes_left(*wait)
        ),
        None => "Storage rate limit exceeded. Try again later.".to_string(),
    }
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            ServerError::UserNotFound
            | ServerError::ChannelNotFound
            | ServerError::BlobNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::DuplicateEmail
            | ServerError::AlreadyMember
            | ServerError::InvalidSecurityPass
            | ServerError::LastAdmin
            | ServerError::MissingFile
            | ServerError::FileTooLarge { .. }
            | ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ServerError::Forbidden => StatusCode::FORBIDDEN,
            ServerError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            ServerError::CodespaceExhausted
            | ServerError::Storage(_)
            | ServerError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ServerError::Storage(_) => {
                tracing::error!(error = %self, "Blob store failure");
                "Failed to upload file.".to_string()
            }
            ServerError::Store(_) => {
                tracing::error!(error = %self, "Request failed");
                "Internal server error".to_string()
            }
            ServerError::CodespaceExhausted => {
                tracing::error!(error = %self, "Channel code space exhausted");
                self.to_string()
            }
            _ => self.to_string(),
        };

        let body = serde_json::json!({
            "message": message,
        });

        let mut response = (status, axum::Json(body)).into_response();
        if let ServerError::QuotaExceeded {
            retry_after: Some(wait),
        } = &self
        {
            let secs = wait.as_secs().max(1);
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ServerError::UserNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ServerError::DuplicateEmail.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ServerError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ServerError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ServerError::QuotaExceeded { retry_after: None }.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ServerError::Store(StoreError::NotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn store_conflict_is_server_failure() {
        let err = ServerError::from(StoreError::Conflict {
            resource: "channel",
            field: "code",
            value: "AbCdEfGh12".into(),
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn messages() {
        assert_eq!(
            ServerError::FileTooLarge { max: 10 * 1024 * 1024 }.to_string(),
            "File too large. Maximum 10MB."
        );
        assert_eq!(
            ServerError::QuotaExceeded {
                retry_after: Some(Duration::from_secs(61))
            }
            .to_string(),
            "Storage rate limit exceeded. Try again in 2 minutes."
        );
    }

    #[test]
    fn quota_response_carries_retry_after() {
        let response = ServerError::QuotaExceeded {
            retry_after: Some(Duration::from_secs(90)),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "90");
    }
}
