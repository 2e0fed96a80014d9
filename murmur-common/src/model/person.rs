use crate::model::{Id, PublicId, auth::PasswordDigest};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;

pub const PERSON_NAME_MAX_LEN: usize = 100;
pub const EMAIL_MAX_LEN: usize = 254;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PersonMarker;

/// A stored person record.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Person {
    pub id: Id<PersonMarker>,
    pub uuid: PublicId<PersonMarker>,
    pub name: PersonName,
    pub email: Email,
    pub password_digest: PasswordDigest,
    pub is_deleted: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct NewPerson {
    pub name: PersonName,
    pub email: Email,
    pub password_digest: PasswordDigest,
}

/// The authenticated person performing an action.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Actor {
    pub id: Id<PersonMarker>,
    pub uuid: PublicId<PersonMarker>,
    pub email: Email,
}

impl From<&Person> for Actor {
    fn from(person: &Person) -> Self {
        Self {
            id: person.id,
            uuid: person.uuid,
            email: person.email.clone(),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct PersonSummary {
    pub uuid: PublicId<PersonMarker>,
    pub name: PersonName,
    pub email: Email,
}

impl From<&Person> for PersonSummary {
    fn from(person: &Person) -> Self {
        Self {
            uuid: person.uuid,
            name: person.name.clone(),
            email: person.email.clone(),
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
pub struct FollowCounts {
    pub followers: u64,
    pub following: u64,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct PersonProfile {
    #[serde(flatten)]
    pub person: PersonSummary,
    #[serde(flatten)]
    pub follow_counts: FollowCounts,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct PersonName(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The person name is invalid: {0:?}")]
pub struct InvalidPersonNameError(String);

impl PersonName {
    pub fn new(name: &str) -> Result<Self, InvalidPersonNameError> {
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed.chars().count() > PERSON_NAME_MAX_LEN {
            return Err(InvalidPersonNameError(name.to_owned()));
        }

        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for PersonName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        PersonName::new(&inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"PersonName"))
    }
}

/// A trimmed, lower-cased email address. Uniqueness is compared on this form.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct Email(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The email address is invalid: {0:?}")]
pub struct InvalidEmailError(String);

impl Email {
    pub fn new(email: &str) -> Result<Self, InvalidEmailError> {
        let normalized = email.trim().to_lowercase();

        let well_formed = match normalized.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && !domain.is_empty() && !domain.contains('@')
            }
            None => false,
        };

        if !well_formed || normalized.len() > EMAIL_MAX_LEN {
            return Err(InvalidEmailError(email.to_owned()));
        }

        Ok(Self(normalized))
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Email {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        Email::new(&inner).map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"Email"))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::person::{Email, PERSON_NAME_MAX_LEN, PersonName};

    #[test]
    fn person_name_is_trimmed_and_bounded() {
        assert_eq!(PersonName::new("  Ada ").unwrap().get(), "Ada");
        assert!(PersonName::new("   ").is_err());
        assert!(PersonName::new(&"a".repeat(PERSON_NAME_MAX_LEN)).is_ok());
        assert!(PersonName::new(&"a".repeat(PERSON_NAME_MAX_LEN + 1)).is_err());
    }

    #[test]
    fn email_is_normalized() {
        assert_eq!(
            Email::new(" Ada@Example.ORG ").unwrap(),
            Email::new("ada@example.org").unwrap()
        );

        for invalid in ["", "ada", "@example.org", "ada@", "ada@ex@ample.org"] {
            assert!(Email::new(invalid).is_err(), "{invalid:?} was accepted");
        }
    }

    #[test]
    fn email_deserialization_validates() {
        assert!(serde_json::from_str::<Email>("\"ada@example.org\"").is_ok());
        assert!(serde_json::from_str::<Email>("\"not-an-email\"").is_err());
    }
}
