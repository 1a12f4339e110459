//! Error handling for the hosted backend.
//!
//! Converts HTTP-level failures (status codes, JSON error bodies, transport
//! errors) into `DeskError` values with a readable message.

use std::fmt;

use serde::Deserialize;

use crate::error::DeskError;

/// Error returned by the hosted backend's HTTP API.
#[derive(Debug)]
pub struct ApiError {
    /// HTTP status code, if available
    pub status: Option<reqwest::StatusCode>,
    /// Human-readable error message
    pub message: String,
    /// Machine-readable error code from the auth endpoint (`invalid_grant`, ...)
    pub code: Option<String>,
}

/// The error body shapes used by the auth and row endpoints.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
    hint: Option<String>,
}

impl ErrorBody {
    fn best_message(&self) -> Option<String> {
        let base = self
            .error_description
            .clone()
            .or_else(|| self.message.clone())
            .or_else(|| self.msg.clone())
            .or_else(|| self.error.clone())?;
        match &self.hint {
            Some(hint) if !hint.is_empty() => Some(format!("{base} ({hint})")),
            _ => Some(base),
        }
    }
}

impl ApiError {
    /// Build an error from a non-success response status and its raw body.
    pub fn from_body(status: reqwest::StatusCode, body: &str) -> Self {
        let parsed = serde_json::from_str::<ErrorBody>(body).ok();
        let code = parsed.as_ref().and_then(|b| b.error.clone());
        let message = parsed
            .as_ref()
            .and_then(ErrorBody::best_message)
            .unwrap_or_else(|| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("Unknown error")
                        .to_string()
                } else {
                    trimmed.to_string()
                }
            });
        Self {
            status: Some(status),
            message,
            code,
        }
    }

    /// 404 for a missing relation, 406 when a single-row read matched nothing
    pub fn is_not_found(&self) -> bool {
        self.status
            .is_some_and(|s| s.as_u16() == 404 || s.as_u16() == 406)
    }

    /// 401/403, or the token endpoint rejecting the credentials (400 `invalid_grant`)
    pub fn is_unauthorized(&self) -> bool {
        self.status
            .is_some_and(|s| s.as_u16() == 401 || s.as_u16() == 403)
            || self.code.as_deref() == Some("invalid_grant")
    }

    pub fn to_desk_error(&self) -> DeskError {
        if self.is_unauthorized() {
            return DeskError::Auth(self.message.clone());
        }
        match self.status {
            Some(status) => DeskError::Api(format!("{} ({})", self.message, status.as_u16())),
            None => DeskError::Api(self.message.clone()),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<ApiError> for DeskError {
    fn from(error: ApiError) -> Self {
        error.to_desk_error()
    }
}

/// Classify a transport error: connection and timeout failures become `Network`.
pub fn transport_error(error: reqwest::Error) -> DeskError {
    if error.is_connect() || error.is_timeout() {
        DeskError::Network(error.to_string())
    } else {
        DeskError::Http(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_auth_error_description_wins() {
        let err = ApiError::from_body(
            StatusCode::BAD_REQUEST,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        assert_eq!(err.message, "Invalid login credentials");
        assert_eq!(err.code.as_deref(), Some("invalid_grant"));
        let desk_error = err.to_desk_error();
        assert!(matches!(desk_error, DeskError::Auth(ref m) if m == "Invalid login credentials"));
        assert_eq!(
            desk_error.to_string(),
            "authentication error: Invalid login credentials"
        );
    }

    #[test]
    fn test_row_error_includes_hint() {
        let err = ApiError::from_body(
            StatusCode::CONFLICT,
            r#"{"message":"insert violates foreign key","hint":"check ticket_id"}"#,
        );
        assert_eq!(err.message, "insert violates foreign key (check ticket_id)");
    }

    #[test]
    fn test_unauthorized_maps_to_auth() {
        let err = ApiError::from_body(StatusCode::UNAUTHORIZED, r#"{"msg":"JWT expired"}"#);
        assert!(err.is_unauthorized());
        assert!(matches!(err.to_desk_error(), DeskError::Auth(m) if m == "JWT expired"));
    }

    #[test]
    fn test_empty_body_falls_back_to_reason() {
        let err = ApiError::from_body(StatusCode::SERVICE_UNAVAILABLE, "");
        assert_eq!(err.message, "Service Unavailable");
    }

    #[test]
    fn test_not_acceptable_is_not_found() {
        let err = ApiError::from_body(StatusCode::NOT_ACCEPTABLE, r#"{"message":"JSON object requested, multiple (or no) rows returned"}"#);
        assert!(err.is_not_found());
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn test_other_bad_request_stays_api_error() {
        let err = ApiError::from_body(
            StatusCode::BAD_REQUEST,
            r#"{"code":"22P02","message":"invalid input value for enum ticket_status"}"#,
        );
        assert!(err.code.is_none());
        assert!(matches!(err.to_desk_error(), DeskError::Api(m) if m.ends_with("(400)")));
    }

    #[test]
    fn test_plain_text_body() {
        let err = ApiError::from_body(StatusCode::BAD_GATEWAY, "upstream down\n");
        assert_eq!(err.message, "upstream down");
    }
}
