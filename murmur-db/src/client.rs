use crate::{
    record::{
        AuthenticationRecord, FollowRecord, InteractionRecord, PersonRecord, PostRecord,
        PostViewRecord, db_id,
    },
    store::{
        AuthStore, ContentStore, DeletedFilter, IdentityStore, InteractionLedger, Result,
        count_to_u64,
    },
};
use async_trait::async_trait;
use murmur_common::{
    model::{
        Id, MurmurSnowflake, MurmurSnowflakeGenerator, PublicId,
        auth::{AuthTokenHash, Authentication},
        ledger::{LedgerEntry, LedgerKey},
        page::{Page, PageRequest},
        person::{Email, FollowCounts, NewPerson, Person, PersonMarker, PersonSummary},
        post::{NewPost, Post, PostMarker, PostView},
    },
    snowflake::{ProcessId, WorkerId},
};
use sqlx::{PgPool, migrate::MigrateError, query, query_as, query_scalar};
use std::sync::{Mutex, PoisonError};
use time::OffsetDateTime;
use tracing::debug;

const PERSON_COLUMNS: &str = "person_snowflake, uuid, name, email, password_digest, is_deleted";

macro_rules! select_person {
    ($condition:literal) => {
        concat!(
            "SELECT person_snowflake, uuid, name, email, password_digest, is_deleted
            FROM persons.persons
            WHERE ",
            $condition
        )
    };
}

/// Selects [`PostViewRecord`] columns as seen by the viewer bound to `$1`.
macro_rules! select_post_view {
    ($($tail:tt)+) => {
        concat!(
            "SELECT
                posts.uuid AS post_uuid,
                posts.content,
                posts.created_at,
                persons.uuid AS author_uuid,
                persons.name AS author_name,
                (
                    SELECT COUNT(*) FROM ledger.likes
                    WHERE likes.post_snowflake = posts.post_snowflake
                ) AS like_count,
                (
                    SELECT COUNT(*) FROM ledger.favourites
                    WHERE favourites.post_snowflake = posts.post_snowflake
                ) AS favourite_count,
                EXISTS (
                    SELECT 1 FROM ledger.likes
                    WHERE likes.post_snowflake = posts.post_snowflake
                        AND likes.actor_snowflake = $1
                ) AS liked,
                EXISTS (
                    SELECT 1 FROM ledger.favourites
                    WHERE favourites.post_snowflake = posts.post_snowflake
                        AND favourites.actor_snowflake = $1
                ) AS favourited
            FROM
                posts.posts
                JOIN persons.persons ON persons.person_snowflake = posts.created_by
            ",
            $($tail)+
        )
    };
}

/// Posts by the person bound to `$1` or by anyone they follow.
macro_rules! feed_condition {
    () => {
        "
        NOT posts.is_deleted
        AND (
            posts.created_by = $1
            OR posts.created_by IN (
                SELECT followed_snowflake FROM ledger.follows WHERE follower_snowflake = $1
            )
        )"
    };
}

struct InteractionStatements {
    select: &'static str,
    insert: &'static str,
    delete: &'static str,
}

macro_rules! interaction_statements {
    ($table:literal, $id_column:literal) => {
        InteractionStatements {
            select: concat!(
                "SELECT ", $id_column, " AS entry_snowflake, post_snowflake, actor_snowflake, created_at
                FROM ledger.", $table, "
                WHERE post_snowflake = $1 AND actor_snowflake = $2"
            ),
            insert: concat!(
                "INSERT INTO ledger.", $table,
                " (", $id_column, ", post_snowflake, actor_snowflake, created_at)
                VALUES ($1, $2, $3, $4)
                RETURNING ", $id_column, " AS entry_snowflake, post_snowflake, actor_snowflake, created_at"
            ),
            delete: concat!(
                "DELETE FROM ledger.", $table,
                " WHERE post_snowflake = $1 AND actor_snowflake = $2"
            ),
        }
    };
}

const LIKE_STATEMENTS: InteractionStatements = interaction_statements!("likes", "like_snowflake");
const FAVOURITE_STATEMENTS: InteractionStatements =
    interaction_statements!("favourites", "favourite_snowflake");

const FOLLOW_COLUMNS: &str =
    "follow_snowflake, follower_snowflake, followed_snowflake, created_by, updated_by, created_at";

#[derive(Debug)]
pub struct DbClient {
    pool: PgPool,
    snowflake_generator: Mutex<MurmurSnowflakeGenerator>,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool, worker_id: WorkerId, process_id: ProcessId) -> Self {
        let snowflake_generator = Mutex::new(MurmurSnowflakeGenerator::new(worker_id, process_id));

        Self {
            pool,
            snowflake_generator,
        }
    }

    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    fn next_snowflake(&self, at: OffsetDateTime) -> Result<MurmurSnowflake> {
        let mut generator = self
            .snowflake_generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        Ok(generator.generate_at(at.to_utc())?)
    }

    async fn fetch_post_views(
        &self,
        viewer: Id<PersonMarker>,
        filter: PostViewFilter,
        page: PageRequest,
    ) -> Result<Page<PostView>> {
        let limit = i64::from(page.limit());
        let offset = page.offset().cast_signed();

        let (records, total) = match filter {
            PostViewFilter::Feed => {
                let records = query_as::<_, PostViewRecord>(select_post_view!(
                    "WHERE ",
                    feed_condition!(),
                    "
                    ORDER BY posts.post_snowflake DESC
                    LIMIT $2 OFFSET $3"
                ))
                .bind(db_id(viewer))
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;

                let total = query_scalar::<_, i64>(concat!(
                    "SELECT COUNT(*) FROM posts.posts WHERE ",
                    feed_condition!()
                ))
                .bind(db_id(viewer))
                .fetch_one(&self.pool)
                .await?;

                (records, total)
            }
            PostViewFilter::Author(author) => {
                let records = query_as::<_, PostViewRecord>(select_post_view!(
                    "WHERE NOT posts.is_deleted AND posts.created_by = $2
                    ORDER BY posts.post_snowflake DESC
                    LIMIT $3 OFFSET $4"
                ))
                .bind(db_id(viewer))
                .bind(db_id(author))
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;

                let total = query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM posts.posts WHERE NOT is_deleted AND created_by = $1",
                )
                .bind(db_id(author))
                .fetch_one(&self.pool)
                .await?;

                (records, total)
            }
        };

        let results = records
            .into_iter()
            .map(PostView::try_from)
            .collect::<Result<_>>()?;

        Ok(Page {
            results,
            total: count_to_u64(total)?,
        })
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum PostViewFilter {
    Feed,
    Author(Id<PersonMarker>),
}

#[async_trait]
impl IdentityStore for DbClient {
    async fn fetch_person(&self, person_id: Id<PersonMarker>) -> Result<Option<Person>> {
        let record = query_as::<_, PersonRecord>(select_person!("person_snowflake = $1"))
            .bind(db_id(person_id))
            .fetch_optional(&self.pool)
            .await?;

        let person = record.map(Person::try_from).transpose()?;
        Ok(person)
    }

    async fn fetch_person_by_uuid(
        &self,
        uuid: PublicId<PersonMarker>,
    ) -> Result<Option<Person>> {
        let record = query_as::<_, PersonRecord>(select_person!("uuid = $1"))
            .bind(uuid.get())
            .fetch_optional(&self.pool)
            .await?;

        let person = record.map(Person::try_from).transpose()?;
        Ok(person)
    }

    async fn fetch_person_by_email(&self, email: &Email) -> Result<Option<Person>> {
        let record = query_as::<_, PersonRecord>(select_person!("email = $1"))
            .bind(email.get())
            .fetch_optional(&self.pool)
            .await?;

        let person = record.map(Person::try_from).transpose()?;
        Ok(person)
    }

    async fn insert_person(&self, person: &NewPerson) -> Result<Person> {
        let person_snowflake = self.next_snowflake(OffsetDateTime::now_utc())?;

        let record = query_as::<_, PersonRecord>(&format!(
            "INSERT INTO persons.persons (person_snowflake, uuid, name, email, password_digest)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {PERSON_COLUMNS}"
        ))
        .bind(person_snowflake.get().cast_signed())
        .bind(PublicId::<PersonMarker>::generate().get())
        .bind(person.name.get())
        .bind(person.email.get())
        .bind(person.password_digest.get())
        .fetch_one(&self.pool)
        .await?;

        debug!(person = %person_snowflake, "Inserted person");
        Ok(Person::try_from(record)?)
    }

    async fn fetch_people(
        &self,
        excluded: Id<PersonMarker>,
        page: PageRequest,
    ) -> Result<Page<PersonSummary>> {
        let records = query_as::<_, PersonRecord>(select_person!(
            "NOT is_deleted AND person_snowflake <> $1
            ORDER BY person_snowflake
            LIMIT $2 OFFSET $3"
        ))
        .bind(db_id(excluded))
        .bind(i64::from(page.limit()))
        .bind(page.offset().cast_signed())
        .fetch_all(&self.pool)
        .await?;

        let total = query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM persons.persons WHERE NOT is_deleted AND person_snowflake <> $1",
        )
        .bind(db_id(excluded))
        .fetch_one(&self.pool)
        .await?;

        let results = records
            .into_iter()
            .map(|record| Person::try_from(record).map(|person| PersonSummary::from(&person)))
            .collect::<Result<_, _>>()?;

        Ok(Page {
            results,
            total: count_to_u64(total)?,
        })
    }
}

#[async_trait]
impl ContentStore for DbClient {
    async fn fetch_post_by_uuid(
        &self,
        uuid: PublicId<PostMarker>,
        deleted: DeletedFilter,
    ) -> Result<Option<Post>> {
        let record = query_as::<_, PostRecord>(
            "SELECT post_snowflake, uuid, created_by, content, created_at, is_deleted
            FROM posts.posts
            WHERE uuid = $1 AND ($2 OR NOT is_deleted)",
        )
        .bind(uuid.get())
        .bind(deleted == DeletedFilter::Include)
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    async fn insert_post(&self, post: &NewPost) -> Result<Post> {
        let created_at = OffsetDateTime::now_utc();
        let post_snowflake = self.next_snowflake(created_at)?;

        let record = query_as::<_, PostRecord>(
            "INSERT INTO posts.posts (post_snowflake, uuid, created_by, content, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING post_snowflake, uuid, created_by, content, created_at, is_deleted",
        )
        .bind(post_snowflake.get().cast_signed())
        .bind(PublicId::<PostMarker>::generate().get())
        .bind(db_id(post.created_by))
        .bind(post.content.get())
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;

        debug!(post = %post_snowflake, author = %post.created_by, "Inserted post");
        Ok(Post::try_from(record)?)
    }

    async fn soft_delete_post(&self, post_id: Id<PostMarker>) -> Result<u64> {
        let result = query(
            "UPDATE posts.posts SET is_deleted = TRUE WHERE post_snowflake = $1 AND NOT is_deleted",
        )
        .bind(db_id(post_id))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn fetch_post_view(
        &self,
        post_id: Id<PostMarker>,
        viewer: Id<PersonMarker>,
    ) -> Result<Option<PostView>> {
        let record = query_as::<_, PostViewRecord>(select_post_view!(
            "WHERE posts.post_snowflake = $2 AND NOT posts.is_deleted"
        ))
        .bind(db_id(viewer))
        .bind(db_id(post_id))
        .fetch_optional(&self.pool)
        .await?;

        record.map(PostView::try_from).transpose()
    }

    async fn fetch_feed(
        &self,
        viewer: Id<PersonMarker>,
        page: PageRequest,
    ) -> Result<Page<PostView>> {
        self.fetch_post_views(viewer, PostViewFilter::Feed, page)
            .await
    }

    async fn fetch_person_posts(
        &self,
        author: Id<PersonMarker>,
        viewer: Id<PersonMarker>,
        page: PageRequest,
    ) -> Result<Page<PostView>> {
        self.fetch_post_views(viewer, PostViewFilter::Author(author), page)
            .await
    }
}

#[async_trait]
impl InteractionLedger for DbClient {
    async fn find_entry(&self, key: LedgerKey) -> Result<Option<LedgerEntry>> {
        let entry = match key {
            LedgerKey::Like { post_id, actor_id } => {
                query_as::<_, InteractionRecord>(LIKE_STATEMENTS.select)
                    .bind(db_id(post_id))
                    .bind(db_id(actor_id))
                    .fetch_optional(&self.pool)
                    .await?
                    .map(|record| LedgerEntry::Like(record.into()))
            }
            LedgerKey::Favourite { post_id, actor_id } => {
                query_as::<_, InteractionRecord>(FAVOURITE_STATEMENTS.select)
                    .bind(db_id(post_id))
                    .bind(db_id(actor_id))
                    .fetch_optional(&self.pool)
                    .await?
                    .map(|record| LedgerEntry::Favourite(record.into()))
            }
            LedgerKey::Follow {
                follower_id,
                followed_id,
            } => query_as::<_, FollowRecord>(&format!(
                "SELECT {FOLLOW_COLUMNS}
                FROM ledger.follows
                WHERE follower_snowflake = $1 AND followed_snowflake = $2"
            ))
            .bind(db_id(follower_id))
            .bind(db_id(followed_id))
            .fetch_optional(&self.pool)
            .await?
            .map(|record| LedgerEntry::Follow(record.into())),
        };

        Ok(entry)
    }

    async fn insert_entry(&self, key: LedgerKey) -> Result<LedgerEntry> {
        let created_at = OffsetDateTime::now_utc();
        let entry_snowflake = self.next_snowflake(created_at)?.get().cast_signed();

        let entry = match key {
            LedgerKey::Like { post_id, actor_id } => {
                let record = query_as::<_, InteractionRecord>(LIKE_STATEMENTS.insert)
                    .bind(entry_snowflake)
                    .bind(db_id(post_id))
                    .bind(db_id(actor_id))
                    .bind(created_at)
                    .fetch_one(&self.pool)
                    .await?;
                LedgerEntry::Like(record.into())
            }
            LedgerKey::Favourite { post_id, actor_id } => {
                let record = query_as::<_, InteractionRecord>(FAVOURITE_STATEMENTS.insert)
                    .bind(entry_snowflake)
                    .bind(db_id(post_id))
                    .bind(db_id(actor_id))
                    .bind(created_at)
                    .fetch_one(&self.pool)
                    .await?;
                LedgerEntry::Favourite(record.into())
            }
            LedgerKey::Follow {
                follower_id,
                followed_id,
            } => {
                let record = query_as::<_, FollowRecord>(&format!(
                    "INSERT INTO ledger.follows ({FOLLOW_COLUMNS})
                    VALUES ($1, $2, $3, $2, $2, $4)
                    RETURNING {FOLLOW_COLUMNS}"
                ))
                .bind(entry_snowflake)
                .bind(db_id(follower_id))
                .bind(db_id(followed_id))
                .bind(created_at)
                .fetch_one(&self.pool)
                .await?;
                LedgerEntry::Follow(record.into())
            }
        };

        debug!(kind = %key.kind(), actor = %key.actor_id(), "Inserted ledger entry");
        Ok(entry)
    }

    async fn delete_entry(&self, key: LedgerKey) -> Result<u64> {
        let (statement, actor, target) = match key {
            LedgerKey::Like { post_id, actor_id } => {
                (LIKE_STATEMENTS.delete, actor_id, u64::from(post_id))
            }
            LedgerKey::Favourite { post_id, actor_id } => {
                (FAVOURITE_STATEMENTS.delete, actor_id, u64::from(post_id))
            }
            LedgerKey::Follow {
                follower_id,
                followed_id,
            } => (
                "DELETE FROM ledger.follows WHERE followed_snowflake = $1 AND follower_snowflake = $2",
                follower_id,
                u64::from(followed_id),
            ),
        };

        let result = query(statement)
            .bind(target.cast_signed())
            .bind(db_id(actor))
            .execute(&self.pool)
            .await?;

        debug!(
            kind = %key.kind(),
            actor = %actor,
            deleted = result.rows_affected(),
            "Deleted ledger entry"
        );
        Ok(result.rows_affected())
    }

    async fn follow_counts(&self, person: Id<PersonMarker>) -> Result<FollowCounts> {
        let (followers, following) = query_as::<_, (i64, i64)>(
            "SELECT
                (SELECT COUNT(*) FROM ledger.follows WHERE followed_snowflake = $1),
                (SELECT COUNT(*) FROM ledger.follows WHERE follower_snowflake = $1)",
        )
        .bind(db_id(person))
        .fetch_one(&self.pool)
        .await?;

        Ok(FollowCounts {
            followers: count_to_u64(followers)?,
            following: count_to_u64(following)?,
        })
    }
}

#[async_trait]
impl AuthStore for DbClient {
    async fn insert_authentication(&self, authentication: &Authentication) -> Result<()> {
        query(
            "INSERT INTO auth.authentications
                (token_hash, person_snowflake, created_at, expires_after_seconds)
            VALUES ($1, $2, $3, $4)",
        )
        .bind(&authentication.token_hash.0[..])
        .bind(db_id(authentication.person))
        .bind(authentication.created_at)
        .bind(
            authentication
                .expires_after
                .map(|expires_after| expires_after.ceil_seconds()),
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch_authentication(
        &self,
        token_hash: &AuthTokenHash,
    ) -> Result<Option<Authentication>> {
        let record = query_as::<_, AuthenticationRecord>(
            "SELECT person_snowflake, token_hash, created_at, expires_after_seconds
            FROM auth.authentications
            WHERE token_hash = $1",
        )
        .bind(&token_hash.0[..])
        .fetch_optional(&self.pool)
        .await?;

        let authentication = record.map(Authentication::try_from).transpose()?;
        Ok(authentication)
    }
}
