use crate::server::ServerError;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use murmur_common::model::person::Actor;
use murmur_db::client::DbClient;
use murmur_service::SocialService;

type AuthorizationHeader = TypedHeader<Authorization<Bearer>>;

/// The person behind the request's bearer token.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct AuthenticatedActor(pub Actor);

impl<S> FromRequestParts<S> for AuthenticatedActor
where
    SocialService<DbClient>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = AuthorizationHeader::from_request_parts(parts, state)
            .await
            .map_err(ServerError::InvalidAuthorizationHeader)?;

        let actor = SocialService::<DbClient>::from_ref(state)
            .authenticate(header.token())
            .await?;

        Ok(Self(actor))
    }
}
