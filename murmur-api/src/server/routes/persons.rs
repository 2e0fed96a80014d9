use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedActor,
    extract::{Json, PageQuery, Query},
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use murmur_common::model::{
    PublicId,
    ledger::FollowView,
    page::Page,
    person::{PersonMarker, PersonProfile, PersonSummary},
    post::PostView,
};
use murmur_db::client::DbClient;
use murmur_service::{SocialService, auth::Session};
use serde::Deserialize;

type Service = SocialService<DbClient>;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(register_person)
        .typed_post(login_person)
        .typed_get(get_own_profile)
        .typed_get(get_people)
        .typed_get(get_person_profile)
        .typed_get(get_person_posts)
        .typed_post(follow_person)
        .typed_post(unfollow_person)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/persons", rejection(ServerError))]
struct PersonsPath();

#[derive(Deserialize)]
struct RegisterRequest {
    name: String,
    email: String,
    password: String,
}

async fn register_person(
    PersonsPath(): PersonsPath,
    State(service): State<Service>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Session>)> {
    let session = service
        .register_person(&request.name, &request.email, request.password)
        .await?;

    Ok((StatusCode::CREATED, Json(session)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/persons/auth", rejection(ServerError))]
struct LoginPath();

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

async fn login_person(
    LoginPath(): LoginPath,
    State(service): State<Service>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Session>> {
    let session = service
        .login_person(&request.email, request.password)
        .await?;

    Ok(Json(session))
}

async fn get_own_profile(
    PersonsPath(): PersonsPath,
    State(service): State<Service>,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> Result<Json<PersonProfile>> {
    Ok(Json(service.get_own_profile(&actor).await?))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/persons/people", rejection(ServerError))]
struct PeoplePath();

async fn get_people(
    PeoplePath(): PeoplePath,
    State(service): State<Service>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<PersonSummary>>> {
    let people = service.get_people(&actor, page.try_into()?).await?;

    Ok(Json(people))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/persons/{uuid}", rejection(ServerError))]
struct PersonPath {
    uuid: PublicId<PersonMarker>,
}

async fn get_person_profile(
    PersonPath { uuid }: PersonPath,
    State(service): State<Service>,
) -> Result<Json<PersonProfile>> {
    Ok(Json(service.get_person_profile(uuid).await?))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/persons/{uuid}/posts", rejection(ServerError))]
struct PersonPostsPath {
    uuid: PublicId<PersonMarker>,
}

async fn get_person_posts(
    PersonPostsPath { uuid }: PersonPostsPath,
    State(service): State<Service>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<PostView>>> {
    let posts = service
        .get_person_posts(&actor, uuid, page.try_into()?)
        .await?;

    Ok(Json(posts))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/persons/follow/{uuid}", rejection(ServerError))]
struct FollowPath {
    uuid: PublicId<PersonMarker>,
}

async fn follow_person(
    FollowPath { uuid }: FollowPath,
    State(service): State<Service>,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> Result<(StatusCode, Json<FollowView>)> {
    let follow = service.follow_person(&actor, uuid).await?;

    let view = FollowView {
        follower: actor.uuid,
        followed: uuid,
        created_at: follow.created_at,
    };
    Ok((StatusCode::CREATED, Json(view)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/persons/unfollow/{uuid}", rejection(ServerError))]
struct UnfollowPath {
    uuid: PublicId<PersonMarker>,
}

async fn unfollow_person(
    UnfollowPath { uuid }: UnfollowPath,
    State(service): State<Service>,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> Result<Json<PersonProfile>> {
    service.unfollow_person(&actor, uuid).await?;

    Ok(Json(service.get_person_profile(uuid).await?))
}
