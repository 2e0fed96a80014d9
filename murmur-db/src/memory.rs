//! A process-local [`Store`](crate::store::Store) with the same constraint semantics as the
//! Postgres schema. Every operation runs under one lock, so a check and the insert that follows
//! it are atomic.

use crate::store::{
    AuthStore, ContentStore, DbError, DeletedFilter, FOLLOWS_NOT_SELF_CONSTRAINT, IdentityStore,
    InteractionLedger, PERSONS_EMAIL_CONSTRAINT, Result, pair_constraint,
};
use async_trait::async_trait;
use murmur_common::model::{
    Id, MurmurSnowflakeGenerator, PublicId,
    auth::{AuthTokenHash, Authentication},
    ledger::{LedgerEntry, LedgerKey},
    page::{Page, PageRequest},
    person::{Email, FollowCounts, NewPerson, Person, PersonMarker, PersonSummary},
    post::{Author, NewPost, Post, PostMarker, PostView},
};
use std::collections::{BTreeMap, HashMap};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::debug;

const POSTS_AUTHOR_CONSTRAINT: &str = "posts_created_by_fkey";
const LEDGER_TARGET_CONSTRAINT: &str = "ledger_target_fkey";

#[derive(Debug, Default)]
struct MemoryState {
    snowflake_generator: MurmurSnowflakeGenerator,
    persons: BTreeMap<Id<PersonMarker>, Person>,
    posts: BTreeMap<Id<PostMarker>, Post>,
    ledger: BTreeMap<LedgerKey, LedgerEntry>,
    authentications: HashMap<AuthTokenHash, Authentication>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryState {
    fn next_snowflake(&mut self, at: OffsetDateTime) -> Result<u64> {
        Ok(self.snowflake_generator.generate_at(at.to_utc())?.get())
    }

    fn post_view(&self, post: &Post, viewer: Id<PersonMarker>) -> Option<PostView> {
        let author = self.persons.get(&post.created_by)?;

        let mut view = PostView {
            uuid: post.uuid,
            author: Author {
                uuid: author.uuid,
                name: author.name.clone(),
            },
            content: post.content.clone(),
            created_at: post.created_at,
            like_count: 0,
            favourite_count: 0,
            liked: false,
            favourited: false,
        };

        for key in self.ledger.keys() {
            match *key {
                LedgerKey::Like { post_id, actor_id } if post_id == post.id => {
                    view.like_count += 1;
                    view.liked |= actor_id == viewer;
                }
                LedgerKey::Favourite { post_id, actor_id } if post_id == post.id => {
                    view.favourite_count += 1;
                    view.favourited |= actor_id == viewer;
                }
                _ => {}
            }
        }

        Some(view)
    }

    fn is_following(&self, follower_id: Id<PersonMarker>, followed_id: Id<PersonMarker>) -> bool {
        self.ledger.contains_key(&LedgerKey::Follow {
            follower_id,
            followed_id,
        })
    }

    /// Newest first, the same order snowflakes give in storage.
    fn post_views_page(
        &self,
        viewer: Id<PersonMarker>,
        page: PageRequest,
        include: impl Fn(&Post) -> bool,
    ) -> Page<PostView> {
        let matching: Vec<&Post> = self
            .posts
            .values()
            .rev()
            .filter(|post| !post.is_deleted && include(post))
            .collect();

        let results = matching
            .iter()
            .skip(to_usize(page.offset()))
            .take(to_usize(u64::from(page.limit())))
            .filter_map(|post| self.post_view(post, viewer))
            .collect();

        Page {
            results,
            total: matching.len() as u64,
        }
    }

    fn check_ledger_key(&self, key: LedgerKey) -> Result<()> {
        let targets_exist = match key {
            LedgerKey::Like { post_id, actor_id } | LedgerKey::Favourite { post_id, actor_id } => {
                self.posts.contains_key(&post_id) && self.persons.contains_key(&actor_id)
            }
            LedgerKey::Follow {
                follower_id,
                followed_id,
            } => {
                if follower_id == followed_id {
                    return Err(DbError::ConstraintViolation(
                        FOLLOWS_NOT_SELF_CONSTRAINT.to_owned(),
                    ));
                }
                self.persons.contains_key(&follower_id) && self.persons.contains_key(&followed_id)
            }
        };

        if !targets_exist {
            return Err(DbError::ConstraintViolation(
                LEDGER_TARGET_CONSTRAINT.to_owned(),
            ));
        }
        if self.ledger.contains_key(&key) {
            return Err(DbError::UniqueViolation(
                pair_constraint(key.kind()).to_owned(),
            ));
        }

        Ok(())
    }
}

fn to_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn fetch_person(&self, person_id: Id<PersonMarker>) -> Result<Option<Person>> {
        let state = self.state.lock().await;
        Ok(state.persons.get(&person_id).cloned())
    }

    async fn fetch_person_by_uuid(
        &self,
        uuid: PublicId<PersonMarker>,
    ) -> Result<Option<Person>> {
        let state = self.state.lock().await;
        Ok(state
            .persons
            .values()
            .find(|person| person.uuid == uuid)
            .cloned())
    }

    async fn fetch_person_by_email(&self, email: &Email) -> Result<Option<Person>> {
        let state = self.state.lock().await;
        Ok(state
            .persons
            .values()
            .find(|person| person.email == *email)
            .cloned())
    }

    async fn insert_person(&self, person: &NewPerson) -> Result<Person> {
        let mut state = self.state.lock().await;

        if state
            .persons
            .values()
            .any(|existing| existing.email == person.email)
        {
            return Err(DbError::UniqueViolation(
                PERSONS_EMAIL_CONSTRAINT.to_owned(),
            ));
        }

        let person = Person {
            id: state.next_snowflake(OffsetDateTime::now_utc())?.into(),
            uuid: PublicId::generate(),
            name: person.name.clone(),
            email: person.email.clone(),
            password_digest: person.password_digest.clone(),
            is_deleted: false,
        };
        state.persons.insert(person.id, person.clone());

        debug!(person = %person.id, "Inserted person");
        Ok(person)
    }

    async fn fetch_people(
        &self,
        excluded: Id<PersonMarker>,
        page: PageRequest,
    ) -> Result<Page<PersonSummary>> {
        let state = self.state.lock().await;

        let matching: Vec<&Person> = state
            .persons
            .values()
            .filter(|person| !person.is_deleted && person.id != excluded)
            .collect();

        let results = matching
            .iter()
            .skip(to_usize(page.offset()))
            .take(to_usize(u64::from(page.limit())))
            .map(|person| PersonSummary::from(*person))
            .collect();

        Ok(Page {
            results,
            total: matching.len() as u64,
        })
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn fetch_post_by_uuid(
        &self,
        uuid: PublicId<PostMarker>,
        deleted: DeletedFilter,
    ) -> Result<Option<Post>> {
        let state = self.state.lock().await;
        Ok(state
            .posts
            .values()
            .find(|post| {
                post.uuid == uuid && (deleted == DeletedFilter::Include || !post.is_deleted)
            })
            .cloned())
    }

    async fn insert_post(&self, post: &NewPost) -> Result<Post> {
        let mut state = self.state.lock().await;

        if !state.persons.contains_key(&post.created_by) {
            return Err(DbError::ConstraintViolation(
                POSTS_AUTHOR_CONSTRAINT.to_owned(),
            ));
        }

        let created_at = OffsetDateTime::now_utc();
        let post = Post {
            id: state.next_snowflake(created_at)?.into(),
            uuid: PublicId::generate(),
            created_by: post.created_by,
            content: post.content.clone(),
            created_at,
            is_deleted: false,
        };
        state.posts.insert(post.id, post.clone());

        debug!(post = %post.id, author = %post.created_by, "Inserted post");
        Ok(post)
    }

    async fn soft_delete_post(&self, post_id: Id<PostMarker>) -> Result<u64> {
        let mut state = self.state.lock().await;

        match state.posts.get_mut(&post_id) {
            Some(post) if !post.is_deleted => {
                post.is_deleted = true;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn fetch_post_view(
        &self,
        post_id: Id<PostMarker>,
        viewer: Id<PersonMarker>,
    ) -> Result<Option<PostView>> {
        let state = self.state.lock().await;
        Ok(state
            .posts
            .get(&post_id)
            .filter(|post| !post.is_deleted)
            .and_then(|post| state.post_view(post, viewer)))
    }

    async fn fetch_feed(
        &self,
        viewer: Id<PersonMarker>,
        page: PageRequest,
    ) -> Result<Page<PostView>> {
        let state = self.state.lock().await;
        Ok(state.post_views_page(viewer, page, |post| {
            post.created_by == viewer || state.is_following(viewer, post.created_by)
        }))
    }

    async fn fetch_person_posts(
        &self,
        author: Id<PersonMarker>,
        viewer: Id<PersonMarker>,
        page: PageRequest,
    ) -> Result<Page<PostView>> {
        let state = self.state.lock().await;
        Ok(state.post_views_page(viewer, page, |post| post.created_by == author))
    }
}

#[async_trait]
impl InteractionLedger for MemoryStore {
    async fn find_entry(&self, key: LedgerKey) -> Result<Option<LedgerEntry>> {
        let state = self.state.lock().await;
        Ok(state.ledger.get(&key).copied())
    }

    async fn insert_entry(&self, key: LedgerKey) -> Result<LedgerEntry> {
        let mut state = self.state.lock().await;
        state.check_ledger_key(key)?;

        let created_at = OffsetDateTime::now_utc();
        let entry = LedgerEntry::from_key(key, state.next_snowflake(created_at)?, created_at);
        state.ledger.insert(key, entry);

        debug!(kind = %key.kind(), actor = %key.actor_id(), "Inserted ledger entry");
        Ok(entry)
    }

    async fn delete_entry(&self, key: LedgerKey) -> Result<u64> {
        let mut state = self.state.lock().await;
        let deleted = u64::from(state.ledger.remove(&key).is_some());

        debug!(kind = %key.kind(), actor = %key.actor_id(), deleted, "Deleted ledger entry");
        Ok(deleted)
    }

    async fn follow_counts(&self, person: Id<PersonMarker>) -> Result<FollowCounts> {
        let state = self.state.lock().await;

        let mut counts = FollowCounts::default();
        for key in state.ledger.keys() {
            if let LedgerKey::Follow {
                follower_id,
                followed_id,
            } = *key
            {
                if followed_id == person {
                    counts.followers += 1;
                }
                if follower_id == person {
                    counts.following += 1;
                }
            }
        }

        Ok(counts)
    }
}

#[async_trait]
impl AuthStore for MemoryStore {
    async fn insert_authentication(&self, authentication: &Authentication) -> Result<()> {
        let mut state = self.state.lock().await;
        state
            .authentications
            .insert(authentication.token_hash.clone(), authentication.clone());

        Ok(())
    }

    async fn fetch_authentication(
        &self,
        token_hash: &AuthTokenHash,
    ) -> Result<Option<Authentication>> {
        let state = self.state.lock().await;
        Ok(state.authentications.get(token_hash).cloned())
    }
}
