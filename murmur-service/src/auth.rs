use crate::{Result, SocialError, SocialService, error::invalid};
use murmur_common::model::{
    auth::{AuthToken, Authentication, IssuedToken, Password},
    person::{Actor, Email, NewPerson, Person, PersonName, PersonSummary},
};
use murmur_db::store::Store;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

/// A person together with a freshly issued token.
#[derive(Clone, Debug, Serialize)]
pub struct Session {
    pub person: PersonSummary,
    pub token: IssuedToken,
}

impl<S: Store> SocialService<S> {
    pub async fn register_person(
        &self,
        name: &str,
        email: &str,
        password: String,
    ) -> Result<Session> {
        let name = PersonName::new(name).map_err(invalid)?;
        let email = Email::new(email).map_err(invalid)?;
        let password = Password::new(password).map_err(invalid)?;

        if self.store.fetch_person_by_email(&email).await?.is_some() {
            return Err(SocialError::EmailTaken);
        }

        let new_person = NewPerson {
            name,
            email,
            password_digest: password.digest()?,
        };
        let person = match self.store.insert_person(&new_person).await {
            Ok(person) => person,
            Err(err) if err.is_unique_violation() => {
                warn!(%err, "Lost a registration race on the email index");
                return Err(SocialError::EmailTaken);
            }
            Err(err) => return Err(err.into()),
        };

        info!(person = %person.uuid, "Registered person");
        self.open_session(&person).await
    }

    pub async fn login_person(&self, email: &str, password: String) -> Result<Session> {
        let email = Email::new(email).map_err(invalid)?;
        let password = Password::new(password).map_err(invalid)?;

        let person = self
            .store
            .fetch_person_by_email(&email)
            .await?
            .filter(|person| !person.is_deleted)
            .ok_or(SocialError::PersonNotFound)?;

        if !person.password_digest.verify(&password)? {
            debug!(person = %person.uuid, "Rejected login with a wrong password");
            return Err(SocialError::WrongPassword);
        }

        self.open_session(&person).await
    }

    /// Resolves a bearer token to the person it was issued to.
    pub async fn authenticate(&self, token: &str) -> Result<Actor> {
        let token: AuthToken = token.parse().map_err(|err| {
            debug!(%err, "Rejected a malformed token");
            SocialError::InvalidToken
        })?;

        let authentication = self
            .store
            .fetch_authentication(&token.hash()?)
            .await?
            .ok_or(SocialError::InvalidToken)?;

        if authentication.is_expired_at(OffsetDateTime::now_utc()) {
            debug!(person = %token.person, "Rejected an expired token");
            return Err(SocialError::InvalidToken);
        }

        let person = self
            .store
            .fetch_person(authentication.person)
            .await?
            .filter(|person| !person.is_deleted && person.uuid == token.person)
            .ok_or(SocialError::InvalidToken)?;

        Ok(Actor::from(&person))
    }

    async fn open_session(&self, person: &Person) -> Result<Session> {
        let token = AuthToken::generate_random(person.uuid);

        let authentication = Authentication {
            person: person.id,
            token_hash: token.hash()?,
            created_at: OffsetDateTime::now_utc(),
            expires_after: self.token_lifetime,
        };
        self.store.insert_authentication(&authentication).await?;

        Ok(Session {
            person: PersonSummary::from(person),
            token: IssuedToken::from(&token),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{FailureKind, SocialError, SocialService};
    use murmur_common::util::PositiveDuration;
    use murmur_db::memory::MemoryStore;
    use std::sync::Arc;
    use time::Duration;

    fn service() -> SocialService<MemoryStore> {
        SocialService::new(Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn registered_tokens_authenticate() {
        let service = service();

        let session = service
            .register_person("Ada", "Ada@Example.org", "hunter22".to_owned())
            .await
            .unwrap();
        assert_eq!(session.person.email.get(), "ada@example.org");

        let actor = service.authenticate(session.token.get()).await.unwrap();
        assert_eq!(actor.uuid, session.person.uuid);
    }

    #[tokio::test]
    async fn duplicate_emails_conflict() {
        let service = service();
        service
            .register_person("Ada", "ada@example.org", "hunter22".to_owned())
            .await
            .unwrap();

        let err = service
            .register_person("Ada Again", " ADA@example.org", "hunter23".to_owned())
            .await
            .unwrap_err();
        assert!(matches!(err, SocialError::EmailTaken));
        assert_eq!(err.kind(), FailureKind::Conflict);
    }

    #[tokio::test]
    async fn login_checks_the_password() {
        let service = service();
        service
            .register_person("Ada", "ada@example.org", "hunter22".to_owned())
            .await
            .unwrap();

        let session = service
            .login_person("ada@example.org", "hunter22".to_owned())
            .await
            .unwrap();
        assert!(service.authenticate(session.token.get()).await.is_ok());

        let wrong = service
            .login_person("ada@example.org", "hunter23".to_owned())
            .await
            .unwrap_err();
        assert_eq!(wrong.kind(), FailureKind::Unauthorized);

        let unknown = service
            .login_person("grace@example.org", "hunter22".to_owned())
            .await
            .unwrap_err();
        assert_eq!(unknown.kind(), FailureKind::NotFound);
    }

    #[tokio::test]
    async fn invalid_registrations_are_bad_requests() {
        let service = service();

        for (name, email, password) in [
            ("", "ada@example.org", "hunter22"),
            ("Ada", "ada.example.org", "hunter22"),
            ("Ada", "ada@example.org", ""),
        ] {
            let err = service
                .register_person(name, email, password.to_owned())
                .await
                .unwrap_err();
            assert_eq!(err.kind(), FailureKind::BadRequest);
        }
    }

    #[tokio::test]
    async fn unknown_and_malformed_tokens_are_rejected() {
        let service = service();

        for token in [
            "garbage",
            "67e55044-10b1-426f-9247-bb680e5fe0c8:AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA:AAAAAAAAAAAAAAAAAAAAAAAA",
        ] {
            let err = service.authenticate(token).await.unwrap_err();
            assert!(matches!(err, SocialError::InvalidToken), "{token}: {err:?}");
        }
    }

    #[tokio::test]
    async fn expired_tokens_are_rejected() {
        let lifetime = PositiveDuration::new(Duration::nanoseconds(1));
        let service = SocialService::new(Arc::new(MemoryStore::default()), lifetime);

        let session = service
            .register_person("Ada", "ada@example.org", "hunter22".to_owned())
            .await
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));

        let err = service.authenticate(session.token.get()).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Unauthorized);
    }

    #[tokio::test]
    async fn lifetimes_past_the_calendar_never_expire() {
        let lifetime = PositiveDuration::new(Duration::seconds(1_000_000_000_000));
        let service = SocialService::new(Arc::new(MemoryStore::default()), lifetime);

        let session = service
            .register_person("Ada", "ada@example.org", "hunter22".to_owned())
            .await
            .unwrap();

        let actor = service.authenticate(session.token.get()).await.unwrap();
        assert_eq!(actor.uuid, session.person.uuid);
    }
}
