use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use evax_core::{BirthId, CitizenId, DomainError, DomainResult, Entity};

use crate::contact::{normalize_email, require_text};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl core::str::FromStr for Gender {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            v if v.eq_ignore_ascii_case("male") => Ok(Gender::Male),
            v if v.eq_ignore_ascii_case("female") => Ok(Gender::Female),
            other => Err(DomainError::validation(format!(
                "gender must be Male or Female (got {other:?})"
            ))),
        }
    }
}

/// Structured postal address; every part is optional and stored trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub house_or_holding_no: String,
    #[serde(default)]
    pub village_or_neighborhood: String,
    #[serde(default)]
    pub upazila_or_municipality: String,
    #[serde(default)]
    pub district_or_city_corporation: String,
    #[serde(default)]
    pub union_or_zone: String,
    #[serde(default)]
    pub ward_no: String,
}

impl Address {
    fn trimmed(self) -> Self {
        Self {
            house_or_holding_no: self.house_or_holding_no.trim().to_string(),
            village_or_neighborhood: self.village_or_neighborhood.trim().to_string(),
            upazila_or_municipality: self.upazila_or_municipality.trim().to_string(),
            district_or_city_corporation: self.district_or_city_corporation.trim().to_string(),
            union_or_zone: self.union_or_zone.trim().to_string(),
            ward_no: self.ward_no.trim().to_string(),
        }
    }
}

/// Registration details supplied by a citizen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitizenProfile {
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub date_of_birth: NaiveDate,
    pub father_name: String,
    pub mother_name: String,
    pub gender: Gender,
    pub birth_id: BirthId,
    pub national_id: Option<String>,
    #[serde(default)]
    pub address: Address,
}

impl CitizenProfile {
    /// Trim and validate every required text field; lower-case the email.
    pub fn normalized(self) -> DomainResult<Self> {
        let national_id = self
            .national_id
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        Ok(Self {
            full_name: require_text("full_name", &self.full_name)?,
            email: normalize_email(&self.email)?,
            phone_number: require_text("phone_number", &self.phone_number)?,
            date_of_birth: self.date_of_birth,
            father_name: require_text("father_name", &self.father_name)?,
            mother_name: require_text("mother_name", &self.mother_name)?,
            gender: self.gender,
            birth_id: self.birth_id,
            national_id,
            address: self.address.trimmed(),
        })
    }
}

/// Citizen account. Vaccine cards are keyed by `birth_id`, not by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citizen {
    id: CitizenId,
    #[serde(flatten)]
    profile: CitizenProfile,
    password_digest: String,
    #[serde(skip)]
    version: u64,
}

impl Citizen {
    pub fn register(
        id: CitizenId,
        profile: CitizenProfile,
        password_digest: String,
    ) -> DomainResult<Self> {
        Ok(Self {
            id,
            profile: profile.normalized()?,
            password_digest,
            version: 0,
        })
    }

    pub fn profile(&self) -> &CitizenProfile {
        &self.profile
    }

    pub fn birth_id(&self) -> &BirthId {
        &self.profile.birth_id
    }

    pub fn email(&self) -> &str {
        &self.profile.email
    }

    pub fn password_digest(&self) -> &str {
        &self.password_digest
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

impl Entity for Citizen {
    type Id = CitizenId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
