use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::typed_header::TypedHeaderRejection;
use extract::Json;
use murmur_db::client::DbClient;
use murmur_service::{FailureKind, SocialError, SocialService};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

mod auth;
mod extract;
mod routes;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, Debug, FromRef)]
pub struct ServerState {
    pub service: SocialService<DbClient>,
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Query rejected: {0}")]
    QueryRejection(#[from] QueryRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Authorization header was missing or invalid: {0}")]
    InvalidAuthorizationHeader(TypedHeaderRejection),
    #[error(transparent)]
    Social(#[from] SocialError),
}

impl ServerError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ServerError::UnknownRoute(_) | ServerError::PathRejection(_) => FailureKind::NotFound,
            ServerError::InvalidAuthorizationHeader(rejection) if rejection.is_missing() => {
                FailureKind::Unauthorized
            }
            ServerError::QueryRejection(_)
            | ServerError::JsonRejection(_)
            | ServerError::InvalidAuthorizationHeader(_) => FailureKind::BadRequest,
            ServerError::JsonResponse(_) => FailureKind::Internal,
            ServerError::Social(err) => err.kind(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            FailureKind::BadRequest => StatusCode::BAD_REQUEST,
            FailureKind::NotFound => StatusCode::NOT_FOUND,
            FailureKind::Conflict => StatusCode::CONFLICT,
            FailureKind::Unauthorized => StatusCode::UNAUTHORIZED,
            FailureKind::Forbidden => StatusCode::FORBIDDEN,
            FailureKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Internal failures never expose their cause.
    fn message(&self) -> String {
        match self.kind() {
            FailureKind::Internal => "Internal error".to_owned(),
            _ => self.to_string(),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct ErrorResponse {
    status: u16,
    kind: FailureKind,
    message: String,
}

impl From<&ServerError> for ErrorResponse {
    fn from(err: &ServerError) -> Self {
        Self {
            status: err.status().as_u16(),
            kind: err.kind(),
            message: err.message(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = ?self, %status, "Replying with error");

        (status, Json(ErrorResponse::from(&self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use crate::server::{ErrorResponse, ServerError};
    use axum::http::{StatusCode, Uri};
    use murmur_db::store::DbError;
    use murmur_service::{FailureKind, SocialError};

    #[test]
    fn social_failures_map_to_statuses() {
        let cases = [
            (SocialError::SelfFollow, StatusCode::BAD_REQUEST),
            (SocialError::NotLiked, StatusCode::NOT_FOUND),
            (SocialError::AlreadyLiked, StatusCode::CONFLICT),
            (SocialError::InvalidToken, StatusCode::UNAUTHORIZED),
            (SocialError::NotPostAuthor, StatusCode::FORBIDDEN),
        ];

        for (err, status) in cases {
            assert_eq!(ServerError::Social(err).status(), status);
        }
    }

    #[test]
    fn error_bodies_carry_kind_and_message() {
        let body = ErrorResponse::from(&ServerError::Social(SocialError::AlreadyLiked));

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "status": 409,
                "kind": "Conflict",
                "message": "Post already liked",
            })
        );
    }

    #[test]
    fn internal_errors_are_opaque() {
        let err = ServerError::Social(SocialError::Db(DbError::ConstraintViolation(
            "posts_created_by_fkey".to_owned(),
        )));
        let body = ErrorResponse::from(&err);

        assert_eq!(body.kind, FailureKind::Internal);
        assert_eq!(body.status, 500);
        assert_eq!(body.message, "Internal error");
    }

    #[test]
    fn unknown_routes_are_not_found() {
        let err = ServerError::UnknownRoute(Uri::from_static("/nowhere"));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
