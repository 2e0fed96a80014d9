//! The interaction ledger: likes, favourites and follows.
//!
//! Every relation is keyed by an (actor, target) pair and holds at most one row per pair.

use crate::model::{Id, PublicId, person::PersonMarker, post::PostMarker};
use serde::Serialize;
use std::fmt::{Display, Formatter};
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct LikeMarker;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct FavouriteMarker;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct FollowMarker;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct Like {
    pub id: Id<LikeMarker>,
    pub post_id: Id<PostMarker>,
    pub actor_id: Id<PersonMarker>,
    pub created_at: OffsetDateTime,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct Favourite {
    pub id: Id<FavouriteMarker>,
    pub post_id: Id<PostMarker>,
    pub actor_id: Id<PersonMarker>,
    pub created_at: OffsetDateTime,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct Follow {
    pub id: Id<FollowMarker>,
    pub follower_id: Id<PersonMarker>,
    pub followed_id: Id<PersonMarker>,
    pub created_by: Id<PersonMarker>,
    pub updated_by: Id<PersonMarker>,
    pub created_at: OffsetDateTime,
}

/// A follow as exposed to clients.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct FollowView {
    pub follower: PublicId<PersonMarker>,
    pub followed: PublicId<PersonMarker>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum RelationKind {
    Like,
    Favourite,
    Follow,
}

impl RelationKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RelationKind::Like => "like",
            RelationKind::Favourite => "favourite",
            RelationKind::Follow => "follow",
        }
    }
}

impl Display for RelationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies at most one ledger row: the relation plus its (actor, target) pair.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum LedgerKey {
    Like {
        post_id: Id<PostMarker>,
        actor_id: Id<PersonMarker>,
    },
    Favourite {
        post_id: Id<PostMarker>,
        actor_id: Id<PersonMarker>,
    },
    Follow {
        follower_id: Id<PersonMarker>,
        followed_id: Id<PersonMarker>,
    },
}

impl LedgerKey {
    #[must_use]
    pub fn kind(self) -> RelationKind {
        match self {
            LedgerKey::Like { .. } => RelationKind::Like,
            LedgerKey::Favourite { .. } => RelationKind::Favourite,
            LedgerKey::Follow { .. } => RelationKind::Follow,
        }
    }

    #[must_use]
    pub fn actor_id(self) -> Id<PersonMarker> {
        match self {
            LedgerKey::Like { actor_id, .. } | LedgerKey::Favourite { actor_id, .. } => actor_id,
            LedgerKey::Follow { follower_id, .. } => follower_id,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum LedgerEntry {
    Like(Like),
    Favourite(Favourite),
    Follow(Follow),
}

impl LedgerEntry {
    /// Builds the row `key` describes. Follows are created and last updated by their follower.
    #[must_use]
    pub fn from_key(key: LedgerKey, entry_snowflake: u64, created_at: OffsetDateTime) -> Self {
        match key {
            LedgerKey::Like { post_id, actor_id } => LedgerEntry::Like(Like {
                id: entry_snowflake.into(),
                post_id,
                actor_id,
                created_at,
            }),
            LedgerKey::Favourite { post_id, actor_id } => LedgerEntry::Favourite(Favourite {
                id: entry_snowflake.into(),
                post_id,
                actor_id,
                created_at,
            }),
            LedgerKey::Follow {
                follower_id,
                followed_id,
            } => LedgerEntry::Follow(Follow {
                id: entry_snowflake.into(),
                follower_id,
                followed_id,
                created_by: follower_id,
                updated_by: follower_id,
                created_at,
            }),
        }
    }

    #[must_use]
    pub fn key(&self) -> LedgerKey {
        match *self {
            LedgerEntry::Like(Like {
                post_id, actor_id, ..
            }) => LedgerKey::Like { post_id, actor_id },
            LedgerEntry::Favourite(Favourite {
                post_id, actor_id, ..
            }) => LedgerKey::Favourite { post_id, actor_id },
            LedgerEntry::Follow(Follow {
                follower_id,
                followed_id,
                ..
            }) => LedgerKey::Follow {
                follower_id,
                followed_id,
            },
        }
    }

    #[must_use]
    pub fn into_like(self) -> Option<Like> {
        match self {
            LedgerEntry::Like(like) => Some(like),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_favourite(self) -> Option<Favourite> {
        match self {
            LedgerEntry::Favourite(favourite) => Some(favourite),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_follow(self) -> Option<Follow> {
        match self {
            LedgerEntry::Follow(follow) => Some(follow),
            _ => None,
        }
    }
}
