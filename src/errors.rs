use thiserror::Error;

/// Failure to turn a connect-time credential into an [`Identity`](crate::auth::Identity).
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing credential")]
    MissingCredential,

    #[error("no JWT secret configured")]
    SecretNotConfigured,

    #[error("credential expired")]
    Expired,

    #[error("credential signature verification failed")]
    InvalidSignature,

    #[error("malformed credential: {0}")]
    Malformed(String),

    #[error("credential carries no user id claim")]
    MissingUserId,
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            _ => AuthError::Malformed(e.to_string()),
        }
    }
}

/// A client event that cannot be applied. The event is dropped, the connection stays up.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("object-edit without objectId")]
    MissingObjectId,

    #[error("comment text is empty")]
    EmptyComment,

    #[error("connection {0} is not a member of the room")]
    NotJoined(String),
}

/// Unexpected failure while mutating or broadcasting.
#[derive(Debug, Error)]
pub enum InternalError {
    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum CollabError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Internal(#[from] InternalError),
}
