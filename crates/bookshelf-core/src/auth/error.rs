use thiserror::Error;

use super::session::SessionError;
use crate::api::ApiError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Email and password required")]
    MissingCredentials,

    #[error("Login rejected with status {status}")]
    Rejected {
        status: u16,
        /// Server-provided `error` message, if the body carried one
        message: Option<String>,
    },

    #[error("Login response did not contain a usable session: {0}")]
    InvalidSession(#[from] SessionError),

    #[error("Login was superseded by a logout issued while it was in flight")]
    Superseded,

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl AuthError {
    /// Message suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            AuthError::MissingCredentials => self.to_string(),
            AuthError::Rejected {
                message: Some(message),
                ..
            } => message.clone(),
            AuthError::Rejected { status: 401, .. } | AuthError::Rejected { status: 403, .. } => {
                "Invalid email or password".to_string()
            }
            AuthError::Rejected { status, .. } => format!("Login failed (status {})", status),
            AuthError::Api(ApiError::NetworkError(e)) if e.is_timeout() => {
                "Connection timed out. Please try again.".to_string()
            }
            AuthError::Api(ApiError::NetworkError(_)) => {
                "Unable to connect to server. Check your internet connection.".to_string()
            }
            AuthError::Superseded => "Logged out while the login was in progress".to_string(),
            other => format!("Login failed: {}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_surfaces_server_message_verbatim() {
        let err = AuthError::Rejected {
            status: 409,
            message: Some("E-mail já cadastrado".to_string()),
        };
        assert_eq!(err.user_message(), "E-mail já cadastrado");
    }

    #[test]
    fn test_user_message_for_unauthorized() {
        let err = AuthError::Rejected {
            status: 401,
            message: None,
        };
        assert_eq!(err.user_message(), "Invalid email or password");
    }

    #[test]
    fn test_user_message_for_server_error() {
        let err = AuthError::Api(ApiError::ServerError("boom".to_string()));
        assert!(err.user_message().starts_with("Login failed:"));
    }
}
