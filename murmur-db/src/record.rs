use crate::store::{DbError, count_to_u64};
use murmur_common::model::{
    Id, ModelValidationError,
    auth::{Authentication, PasswordDigest},
    ledger::{Favourite, Follow, Like},
    person::{Email, Person, PersonName},
    post::{Author, Post, PostContent, PostView},
};
use sqlx::FromRow;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

pub(crate) fn db_id<Marker>(id: Id<Marker>) -> i64 {
    u64::from(id).cast_signed()
}

pub(crate) fn model_id<Marker>(snowflake: i64) -> Id<Marker> {
    snowflake.cast_unsigned().into()
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct PersonRecord {
    pub person_snowflake: i64,
    pub uuid: Uuid,
    pub name: String,
    pub email: String,
    pub password_digest: String,
    pub is_deleted: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct PostRecord {
    pub post_snowflake: i64,
    pub uuid: Uuid,
    pub created_by: i64,
    pub content: String,
    pub created_at: OffsetDateTime,
    pub is_deleted: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct PostViewRecord {
    pub post_uuid: Uuid,
    pub content: String,
    pub created_at: OffsetDateTime,
    pub author_uuid: Uuid,
    pub author_name: String,
    pub like_count: i64,
    pub favourite_count: i64,
    pub liked: bool,
    pub favourited: bool,
}

/// A like or favourite row, selected with the id column aliased to `entry_snowflake`.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct InteractionRecord {
    pub entry_snowflake: i64,
    pub post_snowflake: i64,
    pub actor_snowflake: i64,
    pub created_at: OffsetDateTime,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct FollowRecord {
    pub follow_snowflake: i64,
    pub follower_snowflake: i64,
    pub followed_snowflake: i64,
    pub created_by: i64,
    pub updated_by: i64,
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct AuthenticationRecord {
    pub person_snowflake: i64,
    pub token_hash: Vec<u8>,
    pub created_at: OffsetDateTime,
    pub expires_after_seconds: Option<i64>,
}

impl TryFrom<PersonRecord> for Person {
    type Error = ModelValidationError;

    fn try_from(value: PersonRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model_id(value.person_snowflake),
            uuid: value.uuid.into(),
            name: PersonName::new(&value.name)?,
            email: Email::new(&value.email)?,
            password_digest: PasswordDigest::from_stored(value.password_digest),
            is_deleted: value.is_deleted,
        })
    }
}

impl TryFrom<PostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: PostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model_id(value.post_snowflake),
            uuid: value.uuid.into(),
            created_by: model_id(value.created_by),
            content: PostContent::new(&value.content)?,
            created_at: value.created_at,
            is_deleted: value.is_deleted,
        })
    }
}

impl TryFrom<PostViewRecord> for PostView {
    type Error = DbError;

    fn try_from(value: PostViewRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            uuid: value.post_uuid.into(),
            author: Author {
                uuid: value.author_uuid.into(),
                name: PersonName::new(&value.author_name).map_err(ModelValidationError::from)?,
            },
            content: PostContent::new(&value.content).map_err(ModelValidationError::from)?,
            created_at: value.created_at,
            like_count: count_to_u64(value.like_count)?,
            favourite_count: count_to_u64(value.favourite_count)?,
            liked: value.liked,
            favourited: value.favourited,
        })
    }
}

impl From<InteractionRecord> for Like {
    fn from(value: InteractionRecord) -> Self {
        Self {
            id: model_id(value.entry_snowflake),
            post_id: model_id(value.post_snowflake),
            actor_id: model_id(value.actor_snowflake),
            created_at: value.created_at,
        }
    }
}

impl From<InteractionRecord> for Favourite {
    fn from(value: InteractionRecord) -> Self {
        Self {
            id: model_id(value.entry_snowflake),
            post_id: model_id(value.post_snowflake),
            actor_id: model_id(value.actor_snowflake),
            created_at: value.created_at,
        }
    }
}

impl From<FollowRecord> for Follow {
    fn from(value: FollowRecord) -> Self {
        Self {
            id: model_id(value.follow_snowflake),
            follower_id: model_id(value.follower_snowflake),
            followed_id: model_id(value.followed_snowflake),
            created_by: model_id(value.created_by),
            updated_by: model_id(value.updated_by),
            created_at: value.created_at,
        }
    }
}

impl TryFrom<AuthenticationRecord> for Authentication {
    type Error = ModelValidationError;

    fn try_from(value: AuthenticationRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            person: model_id(value.person_snowflake),
            token_hash: value.token_hash.into_boxed_slice().try_into()?,
            created_at: value.created_at,
            expires_after: value
                .expires_after_seconds
                .map(|seconds| Duration::seconds(seconds).try_into())
                .transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::record::{PersonRecord, PostViewRecord, db_id, model_id};
    use crate::store::DbError;
    use murmur_common::model::{Id, person::Person, post::PostView};
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[test]
    fn ids_survive_the_signed_column() {
        let id: Id<()> = Id::from(u64::MAX - 7);
        assert_eq!(model_id::<()>(db_id(id)), id);
    }

    #[test]
    fn invalid_person_rows_are_rejected() {
        let record = PersonRecord {
            person_snowflake: 1,
            uuid: Uuid::new_v4(),
            name: "Ada".to_owned(),
            email: "not an email".to_owned(),
            password_digest: String::new(),
            is_deleted: false,
        };

        assert!(Person::try_from(record).is_err());
    }

    #[test]
    fn negative_counts_are_rejected() {
        let record = PostViewRecord {
            post_uuid: Uuid::new_v4(),
            content: "hello".to_owned(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            author_uuid: Uuid::new_v4(),
            author_name: "Ada".to_owned(),
            like_count: -1,
            favourite_count: 0,
            liked: false,
            favourited: false,
        };

        assert!(matches!(
            PostView::try_from(record),
            Err(DbError::InvalidCount(-1))
        ));
    }
}
