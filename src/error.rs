use argon2::Error as Argon2Error;
use csv::Error as CsvError;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use mongodb::error::Error as DbError;
use rocket::{
    http::{Status, StatusClass},
    response::{self, status::Custom, Responder},
    serde::json::Json,
    Request,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::RequestId;
use crate::model::api::{
    admin::CredentialsError, form::FormSpecError, response::ResponseSpecError,
};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{1}")]
    Status(Status, String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    EmptyResult(String),
    #[error("Invalid form: {0}")]
    InvalidForm(#[from] FormSpecError),
    #[error("Invalid response: {0}")]
    InvalidResponse(#[from] ResponseSpecError),
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(#[from] CredentialsError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    #[error(transparent)]
    Csv(#[from] CsvError),
}

impl Error {
    /// Create a NotFound error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// The HTTP status this error is reported as.
    pub fn status(&self) -> Status {
        match self {
            Self::Status(status, _) => *status,
            Self::NotFound(_) | Self::EmptyResult(_) => Status::NotFound,
            Self::InvalidCredentials(CredentialsError::Hash(_)) => Status::InternalServerError,
            Self::InvalidForm(_) | Self::InvalidResponse(_) | Self::InvalidCredentials(_) => {
                Status::BadRequest
            }
            Self::Db(_) | Self::Argon2(_) | Self::Csv(_) => Status::InternalServerError,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::BadRequest,
            },
        }
    }
}

/// The JSON body sent with every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        let id = RequestId::of(req);
        match status.class() {
            StatusClass::ServerError => error!("  req{id} failed: {self}"),
            _ => warn!("  req{id} rejected: {self}"),
        }
        // Don't leak internal details to the client.
        let message = if status.class() == StatusClass::ServerError {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        Custom(status, Json(ErrorBody { message })).respond_to(req)
    }
}
