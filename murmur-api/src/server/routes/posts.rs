use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedActor,
    extract::{Json, PageQuery, Query},
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use murmur_common::model::{
    PublicId,
    page::Page,
    post::{PostMarker, PostView},
};
use murmur_db::client::DbClient;
use murmur_service::SocialService;
use serde::Deserialize;

type Service = SocialService<DbClient>;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(create_post)
        .typed_get(get_post_feed)
        .typed_get(get_post)
        .typed_delete(delete_post)
        .typed_post(like_post)
        .typed_post(unlike_post)
        .typed_post(favourite_post)
        .typed_post(unfavourite_post)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/create", rejection(ServerError))]
struct CreatePostPath();

#[derive(Deserialize)]
struct CreatePostRequest {
    content: String,
}

async fn create_post(
    CreatePostPath(): CreatePostPath,
    State(service): State<Service>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(request): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostView>)> {
    let post = service.create_post(&actor, &request.content).await?;
    let view = service.fetch_post(&actor, post.uuid).await?;

    Ok((StatusCode::CREATED, Json(view)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/feed", rejection(ServerError))]
struct FeedPath();

async fn get_post_feed(
    FeedPath(): FeedPath,
    State(service): State<Service>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<PostView>>> {
    let feed = service.get_post_feed(&actor, page.try_into()?).await?;

    Ok(Json(feed))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{uuid}", rejection(ServerError))]
struct PostPath {
    uuid: PublicId<PostMarker>,
}

async fn get_post(
    PostPath { uuid }: PostPath,
    State(service): State<Service>,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> Result<Json<PostView>> {
    Ok(Json(service.fetch_post(&actor, uuid).await?))
}

async fn delete_post(
    PostPath { uuid }: PostPath,
    State(service): State<Service>,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> Result<StatusCode> {
    service.delete_post(&actor, uuid).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/like/{uuid}", rejection(ServerError))]
struct LikePath {
    uuid: PublicId<PostMarker>,
}

async fn like_post(
    LikePath { uuid }: LikePath,
    State(service): State<Service>,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> Result<Json<PostView>> {
    service.add_like(&actor, uuid).await?;

    Ok(Json(service.fetch_post(&actor, uuid).await?))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/unlike/{uuid}", rejection(ServerError))]
struct UnlikePath {
    uuid: PublicId<PostMarker>,
}

async fn unlike_post(
    UnlikePath { uuid }: UnlikePath,
    State(service): State<Service>,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> Result<Json<PostView>> {
    service.remove_like(&actor, uuid).await?;

    Ok(Json(service.fetch_post(&actor, uuid).await?))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/favourite/{uuid}", rejection(ServerError))]
struct FavouritePath {
    uuid: PublicId<PostMarker>,
}

async fn favourite_post(
    FavouritePath { uuid }: FavouritePath,
    State(service): State<Service>,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> Result<Json<PostView>> {
    service.add_favourite(&actor, uuid).await?;

    Ok(Json(service.fetch_post(&actor, uuid).await?))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/unfavourite/{uuid}", rejection(ServerError))]
struct UnfavouritePath {
    uuid: PublicId<PostMarker>,
}

async fn unfavourite_post(
    UnfavouritePath { uuid }: UnfavouritePath,
    State(service): State<Service>,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> Result<Json<PostView>> {
    service.remove_favourite(&actor, uuid).await?;

    Ok(Json(service.fetch_post(&actor, uuid).await?))
}
