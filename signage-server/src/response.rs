use axum::{
    http::header::CONTENT_TYPE,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt::Display;
use tracing::{error, warn};

use crate::pairing::PairingError;

#[derive(Debug)]
pub struct ServerResponse<T: Serialize> {
    pub body: Option<T>,
    pub status_code: StatusCode,
}

#[derive(Debug)]
pub struct ServerResponseBuilder<T: Serialize> {
    pub body: Option<T>,
    pub status_code: Option<StatusCode>,
}

impl<T> ServerResponseBuilder<T>
where
    T: Serialize,
{
    pub fn body(mut self, body: T) -> Self {
        self.body = Some(body);
        self
    }

    pub fn status_code(mut self, status_code: StatusCode) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn ok(mut self) -> Self {
        self.status_code = Some(StatusCode::OK);
        self
    }

    pub fn build(self) -> ServerResponse<T> {
        ServerResponse {
            body: self.body,
            status_code: self.status_code.unwrap_or(StatusCode::OK),
        }
    }

    pub fn new() -> Self {
        Self {
            body: None,
            status_code: None,
        }
    }
}

impl<T: Serialize> ServerResponse<T> {
    pub fn builder() -> ServerResponseBuilder<T> {
        ServerResponseBuilder::new()
    }
}

impl<T: Serialize> IntoResponse for ServerResponse<T> {
    fn into_response(self) -> Response {
        let body = match self.body {
            Some(body) => body,
            None => return self.status_code.into_response(),
        };

        let bytes = match serde_json::to_vec(&body) {
            Ok(b) => b,
            Err(err) => {
                tracing::error!("Error serializing response body: {:?}", err);
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };

        (
            self.status_code,
            [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            bytes,
        )
            .into_response()
    }
}

#[derive(Debug)]
pub enum ServerError {
    InternalError(String),
    Unauthorized(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
}

impl Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerError::InternalError(message) => write!(f, "Internal Error: {}", message),
            ServerError::Unauthorized(message) => write!(f, "Unauthorized: {}", message),
            ServerError::BadRequest(message) => write!(f, "Bad Request: {}", message),
            ServerError::NotFound(message) => write!(f, "Not Found: {}", message),
            ServerError::Conflict(message) => write!(f, "Conflict: {}", message),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<PairingError> for ServerError {
    fn from(err: PairingError) -> Self {
        match err {
            PairingError::InvalidInput(_) => ServerError::BadRequest(err.to_string()),
            PairingError::NotFound(_) => ServerError::NotFound(err.to_string()),
            PairingError::Conflict(_) => ServerError::Conflict(err.to_string()),
            PairingError::CodeSpaceExhausted | PairingError::Internal(_) => {
                ServerError::InternalError(err.to_string())
            }
        }
    }
}

impl ServerError {
    pub fn internal_error(message: &str) -> Self {
        ServerError::InternalError(message.to_string())
    }

    pub fn bad_request(message: &str) -> Self {
        ServerError::BadRequest(message.to_string())
    }

    pub fn unauthorized(message: &str) -> Self {
        ServerError::Unauthorized(message.to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    fn message(&self) -> &str {
        match self {
            ServerError::InternalError(message)
            | ServerError::Unauthorized(message)
            | ServerError::BadRequest(message)
            | ServerError::NotFound(message)
            | ServerError::Conflict(message) => message,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            message: String,
        }

        let status = self.status_code();
        if status.is_server_error() {
            error!("Returning error response {} {}", status, self.message());
        } else {
            warn!("Returning error response {} {}", status, self.message());
        }

        ServerResponse::<ErrorResponse>::builder()
            .body(ErrorResponse {
                message: self.message().to_owned(),
            })
            .status_code(status)
            .build()
            .into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
pub type ServerAppResult<T> = Result<ServerResponse<T>, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairing_errors_map_to_status_codes() {
        let cases = [
            (PairingError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (PairingError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (PairingError::Conflict("x".into()), StatusCode::CONFLICT),
        ];
        for (err, status) in cases {
            assert_eq!(ServerError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_error_response_is_json() {
        let response =
            ServerError::from(PairingError::NotFound("ABC234".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_empty_body_uses_status_only() {
        let response = ServerResponse::<()>::builder().ok().build().into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(CONTENT_TYPE).is_none());
    }
}
