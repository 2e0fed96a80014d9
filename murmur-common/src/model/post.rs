use crate::model::{
    Id, PublicId,
    person::{PersonMarker, PersonName},
};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;
use time::OffsetDateTime;

pub const POST_CONTENT_MAX_LEN: usize = 500;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub uuid: PublicId<PostMarker>,
    pub created_by: Id<PersonMarker>,
    pub content: PostContent,
    pub created_at: OffsetDateTime,
    pub is_deleted: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct NewPost {
    pub created_by: Id<PersonMarker>,
    pub content: PostContent,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct Author {
    pub uuid: PublicId<PersonMarker>,
    pub name: PersonName,
}

/// A post as seen by one viewer, with its interaction counts.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct PostView {
    pub uuid: PublicId<PostMarker>,
    pub author: Author,
    pub content: PostContent,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub like_count: u64,
    pub favourite_count: u64,
    pub liked: bool,
    pub favourited: bool,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct PostContent(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The post content must be between 1 and {POST_CONTENT_MAX_LEN} characters")]
pub struct InvalidPostContentError;

impl PostContent {
    pub fn new(content: &str) -> Result<Self, InvalidPostContentError> {
        let trimmed = content.trim();
        if trimmed.is_empty() || trimmed.chars().count() > POST_CONTENT_MAX_LEN {
            return Err(InvalidPostContentError);
        }

        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for PostContent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        PostContent::new(&inner)
            .map_err(|_| Error::invalid_value(Unexpected::Str(&inner), &"PostContent"))
    }
}
