use thiserror::Error;

/// Failure taxonomy shared by every [`EntityHelper`](crate::EntityHelper) implementation.
///
/// Zero-row matches are never errors: they are reported as an absent value or a
/// zero row count.
#[derive(Debug, Error)]
pub enum Error {
    /// Backend or connectivity failure, the caller may retry.
    #[error("Persistence failure: {0:#}")]
    PersistenceFailure(anyhow::Error),

    /// Uniqueness or key conflict.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Malformed condition, ordering or find options.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Malformed entity value or key shape.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Wrap a message as a backend failure.
    pub fn msg(message: impl Into<String>) -> Self {
        Error::PersistenceFailure(anyhow::Error::msg(message.into()))
    }

    pub fn invalid_query(message: impl Into<String>) -> Self {
        Error::InvalidQuery(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Error::InvalidInput(message.into())
    }

    /// Only backend failures are worth a retry, the other kinds reproduce.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::PersistenceFailure(..))
    }

    /// Prepend context to a backend failure, other kinds are returned unchanged.
    pub fn context(self, context: impl Into<String>) -> Self {
        match self {
            Error::PersistenceFailure(e) => Error::PersistenceFailure(e.context(context.into())),
            other => other,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        Error::PersistenceFailure(value)
    }
}

/// Log the error at `error` level and evaluate to it.
#[macro_export]
macro_rules! logged {
    ($error:expr) => {{
        let error = $error;
        log::error!("{}", error);
        error
    }};
}
