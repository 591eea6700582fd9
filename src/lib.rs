pub mod directory;
pub mod groups;

use std::sync::Arc;

use axum::{extract::FromRef, http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;

use crate::directory::GroupDirectory;
use crate::groups::{topic::TopicStore, GroupRegistry};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub directory: Arc<GroupDirectory>,
    pub registry: Arc<GroupRegistry>,
    pub topic: TopicStore,
}

pub type AppResult<T> = Result<T, AppError>;

/// Unexpected failure on a request path. Everything the relay can recover
/// from is a [`Decline`] instead.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{}\n\n{}", self.0, self.0.backtrace()),
        )
            .into_response()
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

/// A recovered negative outcome: reported to the caller with a reason,
/// never raised as a fatal error, and never mutating any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Decline {
    #[error("Invalid user ID")]
    InvalidUser,
    #[error("Not permitted")]
    NotPermitted,
    #[error("Message not found")]
    NotFound,
}

impl IntoResponse for Decline {
    fn into_response(self) -> Response {
        let status = match self {
            Decline::InvalidUser => StatusCode::BAD_REQUEST,
            Decline::NotPermitted => StatusCode::FORBIDDEN,
            Decline::NotFound => StatusCode::NOT_FOUND,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
