use crate::{Result, SocialError, SocialService};
use murmur_common::model::{
    PublicId,
    page::{Page, PageRequest},
    person::{Actor, Person, PersonMarker, PersonProfile, PersonSummary},
};
use murmur_db::store::Store;

impl<S: Store> SocialService<S> {
    /// Everyone but `actor`, ordered by registration.
    pub async fn get_people(
        &self,
        actor: &Actor,
        page: PageRequest,
    ) -> Result<Page<PersonSummary>> {
        Ok(self.store.fetch_people(actor.id, page).await?)
    }

    pub async fn get_person_profile(&self, uuid: PublicId<PersonMarker>) -> Result<PersonProfile> {
        let person = self.live_person(uuid).await?;
        self.profile(&person).await
    }

    pub async fn get_own_profile(&self, actor: &Actor) -> Result<PersonProfile> {
        let person = self
            .store
            .fetch_person(actor.id)
            .await?
            .ok_or(SocialError::PersonNotFound)?;

        self.profile(&person).await
    }

    pub(crate) async fn live_person(&self, uuid: PublicId<PersonMarker>) -> Result<Person> {
        self.store
            .fetch_person_by_uuid(uuid)
            .await?
            .filter(|person| !person.is_deleted)
            .ok_or(SocialError::PersonNotFound)
    }

    async fn profile(&self, person: &Person) -> Result<PersonProfile> {
        let follow_counts = self.store.follow_counts(person.id).await?;

        Ok(PersonProfile {
            person: PersonSummary::from(person),
            follow_counts,
        })
    }
}
