//! The store's unique indexes decide when the service's own existence checks see nothing.

use async_trait::async_trait;
use murmur_common::model::{
    Id, PublicId,
    auth::{AuthTokenHash, Authentication},
    ledger::{LedgerEntry, LedgerKey},
    page::{Page, PageRequest},
    person::{Actor, Email, FollowCounts, NewPerson, Person, PersonMarker, PersonSummary},
    post::{NewPost, Post, PostMarker, PostView},
};
use murmur_db::{
    memory::MemoryStore,
    store::{AuthStore, ContentStore, DeletedFilter, IdentityStore, InteractionLedger, Result},
};
use murmur_service::{FailureKind, SocialError, SocialService};
use std::sync::Arc;

/// Answers every existence lookup with nothing, as if a concurrent writer had not committed yet.
#[derive(Debug, Default)]
struct StaleReads(MemoryStore);

#[async_trait]
impl IdentityStore for StaleReads {
    async fn fetch_person(&self, person_id: Id<PersonMarker>) -> Result<Option<Person>> {
        self.0.fetch_person(person_id).await
    }

    async fn fetch_person_by_uuid(
        &self,
        uuid: PublicId<PersonMarker>,
    ) -> Result<Option<Person>> {
        self.0.fetch_person_by_uuid(uuid).await
    }

    async fn fetch_person_by_email(&self, _email: &Email) -> Result<Option<Person>> {
        Ok(None)
    }

    async fn insert_person(&self, person: &NewPerson) -> Result<Person> {
        self.0.insert_person(person).await
    }

    async fn fetch_people(
        &self,
        excluded: Id<PersonMarker>,
        page: PageRequest,
    ) -> Result<Page<PersonSummary>> {
        self.0.fetch_people(excluded, page).await
    }
}

#[async_trait]
impl ContentStore for StaleReads {
    async fn fetch_post_by_uuid(
        &self,
        uuid: PublicId<PostMarker>,
        deleted: DeletedFilter,
    ) -> Result<Option<Post>> {
        self.0.fetch_post_by_uuid(uuid, deleted).await
    }

    async fn insert_post(&self, post: &NewPost) -> Result<Post> {
        self.0.insert_post(post).await
    }

    async fn soft_delete_post(&self, post_id: Id<PostMarker>) -> Result<u64> {
        self.0.soft_delete_post(post_id).await
    }

    async fn fetch_post_view(
        &self,
        post_id: Id<PostMarker>,
        viewer: Id<PersonMarker>,
    ) -> Result<Option<PostView>> {
        self.0.fetch_post_view(post_id, viewer).await
    }

    async fn fetch_feed(
        &self,
        viewer: Id<PersonMarker>,
        page: PageRequest,
    ) -> Result<Page<PostView>> {
        self.0.fetch_feed(viewer, page).await
    }

    async fn fetch_person_posts(
        &self,
        author: Id<PersonMarker>,
        viewer: Id<PersonMarker>,
        page: PageRequest,
    ) -> Result<Page<PostView>> {
        self.0.fetch_person_posts(author, viewer, page).await
    }
}

#[async_trait]
impl InteractionLedger for StaleReads {
    async fn find_entry(&self, _key: LedgerKey) -> Result<Option<LedgerEntry>> {
        Ok(None)
    }

    async fn insert_entry(&self, key: LedgerKey) -> Result<LedgerEntry> {
        self.0.insert_entry(key).await
    }

    async fn delete_entry(&self, key: LedgerKey) -> Result<u64> {
        self.0.delete_entry(key).await
    }

    async fn follow_counts(&self, person: Id<PersonMarker>) -> Result<FollowCounts> {
        self.0.follow_counts(person).await
    }
}

#[async_trait]
impl AuthStore for StaleReads {
    async fn insert_authentication(&self, authentication: &Authentication) -> Result<()> {
        self.0.insert_authentication(authentication).await
    }

    async fn fetch_authentication(
        &self,
        token_hash: &AuthTokenHash,
    ) -> Result<Option<Authentication>> {
        self.0.fetch_authentication(token_hash).await
    }
}

fn service() -> SocialService<StaleReads> {
    SocialService::new(Arc::new(StaleReads::default()), None)
}

async fn register(service: &SocialService<StaleReads>, name: &str) -> Actor {
    let session = service
        .register_person(name, &format!("{name}@example.org"), "hunter22".to_owned())
        .await
        .unwrap();
    service.authenticate(session.token.get()).await.unwrap()
}

#[tokio::test]
async fn duplicate_registration_hits_the_email_index() {
    let service = service();
    register(&service, "ada").await;

    let err = service
        .register_person("Ada Again", "ada@example.org", "hunter23".to_owned())
        .await
        .unwrap_err();
    assert!(matches!(err, SocialError::EmailTaken));
    assert_eq!(err.kind(), FailureKind::Conflict);
}

#[tokio::test]
async fn duplicate_interactions_hit_the_pair_indexes() {
    let service = service();
    let ada = register(&service, "ada").await;
    let grace = register(&service, "grace").await;
    let post = service.create_post(&ada, "hello").await.unwrap();

    service.add_like(&grace, post.uuid).await.unwrap();
    let like = service.add_like(&grace, post.uuid).await.unwrap_err();
    assert!(matches!(like, SocialError::AlreadyLiked));
    assert_eq!(like.kind(), FailureKind::Conflict);

    service.add_favourite(&grace, post.uuid).await.unwrap();
    let favourite = service.add_favourite(&grace, post.uuid).await.unwrap_err();
    assert_eq!(favourite.kind(), FailureKind::Conflict);

    service.follow_person(&grace, ada.uuid).await.unwrap();
    let follow = service.follow_person(&grace, ada.uuid).await.unwrap_err();
    assert_eq!(follow.kind(), FailureKind::Conflict);

    let view = service.fetch_post(&grace, post.uuid).await.unwrap();
    assert_eq!((view.like_count, view.favourite_count), (1, 1));
}
