use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::borrow::Cow;

/// Stable classification of every failure the service surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    Internal,
}

impl ErrorKind {
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Only internal failures may succeed when the same request is sent again.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Internal)
    }
}

#[derive(Debug)]
pub enum AppError {
    InternalServerError(anyhow::Error),
    ResponseStatusError(ErrorKind, Cow<'static, str>),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct AppErrorResponse {
            status: u16,
            kind: ErrorKind,
            message: Cow<'static, str>,
        }

        match self {
            AppError::InternalServerError(err) => {
                tracing::error!(error = ?err, "request failed with an internal error");
                AppError::from(ErrorKind::Internal, "Internal Server Error").into_response()
            }
            AppError::ResponseStatusError(kind, s) => {
                let code = kind.status_code();
                (
                    code,
                    Json(AppErrorResponse {
                        status: code.as_u16(),
                        kind,
                        message: s,
                    }),
                )
                    .into_response()
            }
        }
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(e: E) -> AppError {
        AppError::InternalServerError(e.into())
    }
}

impl AppError {
    pub fn from(kind: ErrorKind, s: impl Into<Cow<'static, str>>) -> AppError {
        AppError::ResponseStatusError(kind, s.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InternalServerError(_) => ErrorKind::Internal,
            AppError::ResponseStatusError(kind, _) => *kind,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::InternalServerError(_) => "Internal Server Error",
            AppError::ResponseStatusError(_, s) => s,
        }
    }
}
