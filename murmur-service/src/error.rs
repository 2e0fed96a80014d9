use murmur_common::model::{
    ModelValidationError,
    auth::{AuthTokenHashError, PasswordHashError},
    ledger::RelationKind,
};
use murmur_db::store::DbError;
use serde::Serialize;
use std::fmt::{Display, Formatter};
use thiserror::Error;

pub type Result<T, E = SocialError> = std::result::Result<T, E>;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
pub enum FailureKind {
    BadRequest,
    NotFound,
    Conflict,
    Unauthorized,
    Forbidden,
    Internal,
}

impl FailureKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::BadRequest => "BadRequest",
            FailureKind::NotFound => "NotFound",
            FailureKind::Conflict => "Conflict",
            FailureKind::Unauthorized => "Unauthorized",
            FailureKind::Forbidden => "Forbidden",
            FailureKind::Internal => "Internal",
        }
    }
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed social action. The display message is stable and safe to hand to clients;
/// internal variants keep their cause as the error source only.
#[derive(Debug, Error)]
pub enum SocialError {
    #[error(transparent)]
    Validation(#[from] ModelValidationError),
    #[error("Cannot follow yourself")]
    SelfFollow,
    #[error("Cannot unfollow yourself")]
    SelfUnfollow,
    #[error("Post not found")]
    PostNotFound,
    #[error("Person not found")]
    PersonNotFound,
    #[error("Post not liked yet")]
    NotLiked,
    #[error("Post not favourited yet")]
    NotFavourited,
    #[error("Not following this person")]
    NotFollowing,
    #[error("Post already liked")]
    AlreadyLiked,
    #[error("Post already favourited")]
    AlreadyFavourited,
    #[error("Already following this person")]
    AlreadyFollowing,
    #[error("Email is already registered")]
    EmailTaken,
    #[error("Wrong password")]
    WrongPassword,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Only the author can delete a post")]
    NotPostAuthor,
    #[error("Internal error")]
    Db(#[from] DbError),
    #[error("Internal error")]
    PasswordHash(#[from] PasswordHashError),
    #[error("Internal error")]
    TokenHash(#[from] AuthTokenHashError),
    #[error("Internal error")]
    UnexpectedEntry(RelationKind),
}

impl SocialError {
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            SocialError::Validation(_) | SocialError::SelfFollow | SocialError::SelfUnfollow => {
                FailureKind::BadRequest
            }
            SocialError::PostNotFound
            | SocialError::PersonNotFound
            | SocialError::NotLiked
            | SocialError::NotFavourited
            | SocialError::NotFollowing => FailureKind::NotFound,
            SocialError::AlreadyLiked
            | SocialError::AlreadyFavourited
            | SocialError::AlreadyFollowing
            | SocialError::EmailTaken => FailureKind::Conflict,
            SocialError::WrongPassword | SocialError::InvalidToken => FailureKind::Unauthorized,
            SocialError::NotPostAuthor => FailureKind::Forbidden,
            SocialError::Db(_)
            | SocialError::PasswordHash(_)
            | SocialError::TokenHash(_)
            | SocialError::UnexpectedEntry(_) => FailureKind::Internal,
        }
    }

    pub(crate) fn already_present(kind: RelationKind) -> Self {
        match kind {
            RelationKind::Like => SocialError::AlreadyLiked,
            RelationKind::Favourite => SocialError::AlreadyFavourited,
            RelationKind::Follow => SocialError::AlreadyFollowing,
        }
    }

    pub(crate) fn not_present(kind: RelationKind) -> Self {
        match kind {
            RelationKind::Like => SocialError::NotLiked,
            RelationKind::Favourite => SocialError::NotFavourited,
            RelationKind::Follow => SocialError::NotFollowing,
        }
    }
}

pub(crate) fn invalid(err: impl Into<ModelValidationError>) -> SocialError {
    SocialError::Validation(err.into())
}

#[cfg(test)]
mod tests {
    use crate::error::{FailureKind, SocialError};
    use murmur_common::model::{ledger::RelationKind, post::PostContent};
    use murmur_db::store::DbError;

    #[test]
    fn internal_failures_hide_their_cause() {
        let err = SocialError::from(DbError::UniqueViolation("secret_index".to_owned()));

        assert_eq!(err.kind(), FailureKind::Internal);
        assert_eq!(err.to_string(), "Internal error");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn kinds_and_messages_are_stable() {
        assert_eq!(
            SocialError::already_present(RelationKind::Like).kind(),
            FailureKind::Conflict
        );
        assert_eq!(
            SocialError::not_present(RelationKind::Follow).to_string(),
            "Not following this person"
        );
        assert_eq!(SocialError::SelfFollow.kind(), FailureKind::BadRequest);
        assert_eq!(SocialError::NotPostAuthor.kind().as_str(), "Forbidden");

        let validation = crate::error::invalid(PostContent::new("").unwrap_err());
        assert_eq!(validation.kind(), FailureKind::BadRequest);
    }
}
