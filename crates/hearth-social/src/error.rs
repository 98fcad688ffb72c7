use thiserror::Error;

use hearth_db::StoreError;

#[derive(Debug, Error)]
pub enum SocialError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("storage failure: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for SocialError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(msg) => SocialError::Conflict(msg),
            other => SocialError::Storage(other),
        }
    }
}

pub type SocialResult<T> = Result<T, SocialError>;
