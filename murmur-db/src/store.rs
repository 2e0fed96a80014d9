//! Storage contracts the social service is written against.
//!
//! Uniqueness of emails and ledger pairs is authoritative here, not in the callers: every
//! implementation rejects a duplicate insert with [`DbError::UniqueViolation`] even when a
//! concurrent caller passed its own existence check first.

use async_trait::async_trait;
use murmur_common::{
    model::{
        Id, ModelValidationError, PublicId,
        auth::{AuthTokenHash, Authentication},
        ledger::{LedgerEntry, LedgerKey, RelationKind},
        page::{Page, PageRequest},
        person::{Email, FollowCounts, NewPerson, Person, PersonMarker, PersonSummary},
        post::{NewPost, Post, PostMarker, PostView},
    },
    snowflake::SnowflakeTimestampFromDateTimeError,
};
use thiserror::Error;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

pub const PERSONS_EMAIL_CONSTRAINT: &str = "persons_email_key";
pub const LIKES_PAIR_CONSTRAINT: &str = "likes_pair_key";
pub const FAVOURITES_PAIR_CONSTRAINT: &str = "favourites_pair_key";
pub const FOLLOWS_PAIR_CONSTRAINT: &str = "follows_pair_key";
pub const FOLLOWS_NOT_SELF_CONSTRAINT: &str = "follows_not_self_check";

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("The database returned a negative count: {0}")]
    InvalidCount(i64),
    #[error("Unique constraint {0} was violated")]
    UniqueViolation(String),
    #[error("Constraint {0} was violated")]
    ConstraintViolation(String),
    #[error("Could not generate a snowflake: {0}")]
    Snowflake(#[from] SnowflakeTimestampFromDateTimeError),
    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl DbError {
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DbError::UniqueViolation(_))
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            let constraint = db_err.constraint().unwrap_or("unknown").to_owned();

            if db_err.is_unique_violation() {
                return DbError::UniqueViolation(constraint);
            }
            if db_err.is_check_violation() || db_err.is_foreign_key_violation() {
                return DbError::ConstraintViolation(constraint);
            }
        }

        DbError::Sqlx(err)
    }
}

#[must_use]
pub fn pair_constraint(kind: RelationKind) -> &'static str {
    match kind {
        RelationKind::Like => LIKES_PAIR_CONSTRAINT,
        RelationKind::Favourite => FAVOURITES_PAIR_CONSTRAINT,
        RelationKind::Follow => FOLLOWS_PAIR_CONSTRAINT,
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub enum DeletedFilter {
    #[default]
    Exclude,
    Include,
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Soft-deleted persons are returned too; callers decide what a deleted record means.
    async fn fetch_person(&self, person_id: Id<PersonMarker>) -> Result<Option<Person>>;

    async fn fetch_person_by_uuid(&self, uuid: PublicId<PersonMarker>)
    -> Result<Option<Person>>;

    async fn fetch_person_by_email(&self, email: &Email) -> Result<Option<Person>>;

    async fn insert_person(&self, person: &NewPerson) -> Result<Person>;

    /// Non-deleted persons other than `excluded`, ordered by id ascending.
    async fn fetch_people(
        &self,
        excluded: Id<PersonMarker>,
        page: PageRequest,
    ) -> Result<Page<PersonSummary>>;
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn fetch_post_by_uuid(
        &self,
        uuid: PublicId<PostMarker>,
        deleted: DeletedFilter,
    ) -> Result<Option<Post>>;

    async fn insert_post(&self, post: &NewPost) -> Result<Post>;

    /// Returns the number of posts that went from live to deleted.
    async fn soft_delete_post(&self, post_id: Id<PostMarker>) -> Result<u64>;

    /// The post joined with its author and interaction counts, seen by `viewer`.
    async fn fetch_post_view(
        &self,
        post_id: Id<PostMarker>,
        viewer: Id<PersonMarker>,
    ) -> Result<Option<PostView>>;

    /// Live posts by `viewer` and everyone `viewer` follows, newest first.
    async fn fetch_feed(
        &self,
        viewer: Id<PersonMarker>,
        page: PageRequest,
    ) -> Result<Page<PostView>>;

    /// Live posts by `author`, newest first.
    async fn fetch_person_posts(
        &self,
        author: Id<PersonMarker>,
        viewer: Id<PersonMarker>,
        page: PageRequest,
    ) -> Result<Page<PostView>>;
}

#[async_trait]
pub trait InteractionLedger: Send + Sync {
    async fn find_entry(&self, key: LedgerKey) -> Result<Option<LedgerEntry>>;

    async fn insert_entry(&self, key: LedgerKey) -> Result<LedgerEntry>;

    /// Returns the number of deleted rows, 0 or 1.
    async fn delete_entry(&self, key: LedgerKey) -> Result<u64>;

    async fn follow_counts(&self, person: Id<PersonMarker>) -> Result<FollowCounts>;
}

#[async_trait]
pub trait AuthStore: Send + Sync {
    async fn insert_authentication(&self, authentication: &Authentication) -> Result<()>;

    async fn fetch_authentication(
        &self,
        token_hash: &AuthTokenHash,
    ) -> Result<Option<Authentication>>;
}

/// Everything the social service needs from storage.
pub trait Store: IdentityStore + ContentStore + InteractionLedger + AuthStore {}

impl<T> Store for T where T: IdentityStore + ContentStore + InteractionLedger + AuthStore {}

pub(crate) fn count_to_u64(count: i64) -> Result<u64> {
    u64::try_from(count).map_err(|_| DbError::InvalidCount(count))
}
