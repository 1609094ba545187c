use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session token is missing or empty")]
    MissingToken,
}

/// User record returned by the auth service.
///
/// Fields the client does not interpret are kept in `extra` so the record
/// survives a save/load cycle unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub token: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An authenticated user. The bearer token is read from the identity record,
/// so the two can never diverge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Identity", into = "Identity")]
pub struct UserSession {
    identity: Identity,
}

impl UserSession {
    pub fn new(identity: Identity) -> Result<Self, SessionError> {
        if identity.token.trim().is_empty() {
            return Err(SessionError::MissingToken);
        }
        Ok(Self { identity })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Bearer token for authenticated requests
    pub fn token(&self) -> &str {
        &self.identity.token
    }

    /// Display name used in notifications
    pub fn display_name(&self) -> &str {
        if self.identity.name.is_empty() {
            self.identity.email.as_deref().unwrap_or_default()
        } else {
            &self.identity.name
        }
    }
}

impl TryFrom<Identity> for UserSession {
    type Error = SessionError;

    fn try_from(identity: Identity) -> Result<Self, Self::Error> {
        Self::new(identity)
    }
}

impl From<UserSession> for Identity {
    fn from(session: UserSession) -> Self {
        session.identity
    }
}

/// In-memory session state owned by the `AuthManager`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    /// Startup, before the persisted session has been read
    #[default]
    Loading,
    Anonymous,
    Authenticated(UserSession),
}

impl SessionState {
    pub fn session(&self) -> Option<&UserSession> {
        match self {
            SessionState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.session().map(UserSession::token)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Loading)
    }
}
