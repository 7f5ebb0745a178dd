use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Login or password did not match any account.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Credentials matched an account whose status is inactive.
    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Storage(err.to_string())
    }
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(err: validator::ValidationErrors) -> Self {
        CoreError::Validation(err.to_string())
    }
}

impl CoreError {
    /// True for the two login rejections, which callers usually show inline on the form.
    pub fn is_login_rejection(&self) -> bool {
        matches!(self, CoreError::InvalidCredentials | CoreError::AccountDisabled)
    }
}
