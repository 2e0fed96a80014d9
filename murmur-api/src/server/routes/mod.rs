use crate::server::ServerRouter;

mod persons;
mod posts;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .merge(persons::routes())
        .merge(posts::routes())
}
