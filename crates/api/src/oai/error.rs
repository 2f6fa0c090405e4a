use axum::http::StatusCode;
use thiserror::Error;

/// An OAI-PMH protocol error, rendered as `<error code="...">` in the
/// response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OaiError {
    #[error("{0}")]
    BadArgument(String),

    #[error("Bad OAI verb")]
    BadVerb,

    #[error("Unknown metadata prefix")]
    CannotDisseminateFormat,

    #[error("No record with that id could be found")]
    IdDoesNotExist,

    #[error("No records match the criteria given")]
    NoRecordsMatch,

    #[error("Could not connect to metadata database")]
    Internal,

    #[error("An error occurred when querying the database")]
    Database,
}

impl OaiError {
    pub fn bad_argument(message: impl Into<String>) -> Self {
        Self::BadArgument(message.into())
    }

    /// The OAI-PMH error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadArgument(_) => "badArgument",
            Self::BadVerb => "badVerb",
            Self::CannotDisseminateFormat => "cannotDisseminateFormat",
            Self::IdDoesNotExist => "idDoesNotExist",
            Self::NoRecordsMatch => "noRecordsMatch",
            Self::Internal => "internalError",
            Self::Database => "databaseError",
        }
    }

    /// HTTP status sent with the error document. Browsers still render the
    /// XML body for non-200 responses.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Internal | Self::Database => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IdDoesNotExist | Self::NoRecordsMatch => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}
