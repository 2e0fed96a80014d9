//! Likes, favourites and follows.
//!
//! Each (actor, target) pair moves between absent and present; adding a present pair and
//! removing an absent one both fail. The store's unique index has the final word when two
//! adds race past the existence check.

use crate::{Result, SocialError, SocialService};
use murmur_common::model::{
    PublicId,
    ledger::{Favourite, Follow, LedgerEntry, LedgerKey, Like},
    person::{Actor, PersonMarker},
    post::PostMarker,
};
use murmur_db::store::Store;
use tracing::{info, warn};

impl<S: Store> SocialService<S> {
    pub async fn add_like(&self, actor: &Actor, post: PublicId<PostMarker>) -> Result<Like> {
        let post = self.live_post(post).await?;
        let key = LedgerKey::Like {
            post_id: post.id,
            actor_id: actor.id,
        };

        self.add_entry(key)
            .await?
            .into_like()
            .ok_or(SocialError::UnexpectedEntry(key.kind()))
    }

    pub async fn remove_like(&self, actor: &Actor, post: PublicId<PostMarker>) -> Result<()> {
        let post = self.live_post(post).await?;

        self.remove_entry(LedgerKey::Like {
            post_id: post.id,
            actor_id: actor.id,
        })
        .await
    }

    pub async fn add_favourite(
        &self,
        actor: &Actor,
        post: PublicId<PostMarker>,
    ) -> Result<Favourite> {
        let post = self.live_post(post).await?;
        let key = LedgerKey::Favourite {
            post_id: post.id,
            actor_id: actor.id,
        };

        self.add_entry(key)
            .await?
            .into_favourite()
            .ok_or(SocialError::UnexpectedEntry(key.kind()))
    }

    pub async fn remove_favourite(&self, actor: &Actor, post: PublicId<PostMarker>) -> Result<()> {
        let post = self.live_post(post).await?;

        self.remove_entry(LedgerKey::Favourite {
            post_id: post.id,
            actor_id: actor.id,
        })
        .await
    }

    pub async fn follow_person(
        &self,
        actor: &Actor,
        target: PublicId<PersonMarker>,
    ) -> Result<Follow> {
        if target == actor.uuid {
            return Err(SocialError::SelfFollow);
        }

        let target = self.live_person(target).await?;
        let key = LedgerKey::Follow {
            follower_id: actor.id,
            followed_id: target.id,
        };

        self.add_entry(key)
            .await?
            .into_follow()
            .ok_or(SocialError::UnexpectedEntry(key.kind()))
    }

    pub async fn unfollow_person(
        &self,
        actor: &Actor,
        target: PublicId<PersonMarker>,
    ) -> Result<()> {
        if target == actor.uuid {
            return Err(SocialError::SelfUnfollow);
        }

        let target = self.live_person(target).await?;

        self.remove_entry(LedgerKey::Follow {
            follower_id: actor.id,
            followed_id: target.id,
        })
        .await
    }

    async fn add_entry(&self, key: LedgerKey) -> Result<LedgerEntry> {
        if self.store.find_entry(key).await?.is_some() {
            return Err(SocialError::already_present(key.kind()));
        }

        match self.store.insert_entry(key).await {
            Ok(entry) => {
                info!(kind = %key.kind(), actor = %key.actor_id(), "Added ledger entry");
                Ok(entry)
            }
            Err(err) if err.is_unique_violation() => {
                warn!(kind = %key.kind(), actor = %key.actor_id(), "Lost an insert race");
                Err(SocialError::already_present(key.kind()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn remove_entry(&self, key: LedgerKey) -> Result<()> {
        if self.store.find_entry(key).await?.is_none() {
            return Err(SocialError::not_present(key.kind()));
        }

        if self.store.delete_entry(key).await? == 0 {
            return Err(SocialError::not_present(key.kind()));
        }

        info!(kind = %key.kind(), actor = %key.actor_id(), "Removed ledger entry");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{FailureKind, SocialError, SocialService};
    use murmur_common::model::{PublicId, person::Actor};
    use murmur_db::memory::MemoryStore;
    use std::sync::Arc;

    async fn register(service: &SocialService<MemoryStore>, name: &str) -> Actor {
        let session = service
            .register_person(name, &format!("{name}@example.org"), "hunter22".to_owned())
            .await
            .unwrap();
        service.authenticate(session.token.get()).await.unwrap()
    }

    #[tokio::test]
    async fn like_then_unlike_restores_the_post() {
        let service = SocialService::new(Arc::new(MemoryStore::default()), None);
        let ada = register(&service, "ada").await;
        let grace = register(&service, "grace").await;
        let post = service.create_post(&ada, "hello").await.unwrap();

        let like = service.add_like(&grace, post.uuid).await.unwrap();
        assert_eq!((like.post_id, like.actor_id), (post.id, grace.id));
        assert_eq!(
            service.fetch_post(&grace, post.uuid).await.unwrap().like_count,
            1
        );

        let again = service.add_like(&grace, post.uuid).await.unwrap_err();
        assert!(matches!(again, SocialError::AlreadyLiked));

        service.remove_like(&grace, post.uuid).await.unwrap();
        let view = service.fetch_post(&grace, post.uuid).await.unwrap();
        assert_eq!((view.like_count, view.liked), (0, false));

        let twice = service.remove_like(&grace, post.uuid).await.unwrap_err();
        assert!(matches!(twice, SocialError::NotLiked));
        assert_eq!(twice.kind(), FailureKind::NotFound);
    }

    #[tokio::test]
    async fn favourites_are_independent_of_likes() {
        let service = SocialService::new(Arc::new(MemoryStore::default()), None);
        let ada = register(&service, "ada").await;
        let post = service.create_post(&ada, "hello").await.unwrap();

        service.add_like(&ada, post.uuid).await.unwrap();
        service.add_favourite(&ada, post.uuid).await.unwrap();

        let view = service.fetch_post(&ada, post.uuid).await.unwrap();
        assert_eq!((view.like_count, view.favourite_count), (1, 1));
        assert!(view.liked && view.favourited);

        let err = service.remove_favourite(&ada, PublicId::generate()).await.unwrap_err();
        assert!(matches!(err, SocialError::PostNotFound));

        service.remove_favourite(&ada, post.uuid).await.unwrap();
        let err = service.remove_favourite(&ada, post.uuid).await.unwrap_err();
        assert!(matches!(err, SocialError::NotFavourited));
        assert_eq!(
            service.fetch_post(&ada, post.uuid).await.unwrap().like_count,
            1
        );
    }

    #[tokio::test]
    async fn follows_record_the_follower() {
        let service = SocialService::new(Arc::new(MemoryStore::default()), None);
        let ada = register(&service, "ada").await;
        let grace = register(&service, "grace").await;

        let follow = service.follow_person(&ada, grace.uuid).await.unwrap();
        assert_eq!((follow.follower_id, follow.followed_id), (ada.id, grace.id));
        assert_eq!((follow.created_by, follow.updated_by), (ada.id, ada.id));

        let again = service.follow_person(&ada, grace.uuid).await.unwrap_err();
        assert_eq!(again.kind(), FailureKind::Conflict);

        service.unfollow_person(&ada, grace.uuid).await.unwrap();
        let twice = service.unfollow_person(&ada, grace.uuid).await.unwrap_err();
        assert!(matches!(twice, SocialError::NotFollowing));
    }

    #[tokio::test]
    async fn self_follows_are_rejected() {
        let service = SocialService::new(Arc::new(MemoryStore::default()), None);
        let ada = register(&service, "ada").await;

        let follow = service.follow_person(&ada, ada.uuid).await.unwrap_err();
        assert!(matches!(follow, SocialError::SelfFollow));
        let unfollow = service.unfollow_person(&ada, ada.uuid).await.unwrap_err();
        assert_eq!(unfollow.kind(), FailureKind::BadRequest);
    }
}
