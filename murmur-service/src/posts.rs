use crate::{Result, SocialError, SocialService, error::invalid};
use murmur_common::model::{
    PublicId,
    page::{Page, PageRequest},
    person::{Actor, PersonMarker},
    post::{NewPost, Post, PostContent, PostMarker, PostView},
};
use murmur_db::store::{DeletedFilter, Store};
use tracing::info;

impl<S: Store> SocialService<S> {
    pub async fn create_post(&self, actor: &Actor, content: &str) -> Result<Post> {
        let new_post = NewPost {
            created_by: actor.id,
            content: PostContent::new(content).map_err(invalid)?,
        };

        let post = self.store.insert_post(&new_post).await?;

        info!(post = %post.uuid, author = %actor.uuid, "Created post");
        Ok(post)
    }

    /// The post with its counts, as `actor` sees it.
    pub async fn fetch_post(&self, actor: &Actor, uuid: PublicId<PostMarker>) -> Result<PostView> {
        let post = self.live_post(uuid).await?;

        self.store
            .fetch_post_view(post.id, actor.id)
            .await?
            .ok_or(SocialError::PostNotFound)
    }

    /// Posts by `actor` and by everyone `actor` follows, newest first.
    pub async fn get_post_feed(&self, actor: &Actor, page: PageRequest) -> Result<Page<PostView>> {
        Ok(self.store.fetch_feed(actor.id, page).await?)
    }

    pub async fn get_person_posts(
        &self,
        actor: &Actor,
        person: PublicId<PersonMarker>,
        page: PageRequest,
    ) -> Result<Page<PostView>> {
        let author = self.live_person(person).await?;

        Ok(self
            .store
            .fetch_person_posts(author.id, actor.id, page)
            .await?)
    }

    pub async fn delete_post(&self, actor: &Actor, uuid: PublicId<PostMarker>) -> Result<()> {
        let post = self.live_post(uuid).await?;

        if post.created_by != actor.id {
            return Err(SocialError::NotPostAuthor);
        }

        if self.store.soft_delete_post(post.id).await? == 0 {
            return Err(SocialError::PostNotFound);
        }

        info!(post = %post.uuid, "Deleted post");
        Ok(())
    }

    pub(crate) async fn live_post(&self, uuid: PublicId<PostMarker>) -> Result<Post> {
        self.store
            .fetch_post_by_uuid(uuid, DeletedFilter::Exclude)
            .await?
            .ok_or(SocialError::PostNotFound)
    }
}
