use axum::{http::StatusCode, response::{IntoResponse, Response}};

use crate::error::{NotifyError, RequestError};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(err) = self.0.downcast_ref::<NotifyError>() {
            tracing::error!("{err}: {:?}", self.0.root_cause());
            return (StatusCode::BAD_REQUEST, "could not get notifications").into_response();
        }

        if let Some(err) = self.0.downcast_ref::<RequestError>() {
            let status = match err {
                RequestError::Unauthenticated => StatusCode::UNAUTHORIZED,
                RequestError::NotFound(_) | RequestError::DevLoginDisabled => StatusCode::NOT_FOUND,
                RequestError::NotMember => StatusCode::FORBIDDEN,
            };
            tracing::debug!("{err}");
            return (status, err.to_string()).into_response();
        }

        tracing::error!("{}\n\n{}", self.0, self.0.backtrace());
        (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string()).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
