//! Account registry: administrators, staff and citizens, plus login.
//!
//! Registrations run under the `registry` lock so the uniqueness checks
//! (email, phone, birth id) and the following insert are not interleaved.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use evax_auth::{CredentialVerifier, Role, TokenIssuer};
use evax_core::{AdminId, AggregateRoot, BirthId, CitizenId, Entity, StaffId};
use evax_parties::{
    Admin, Citizen, CitizenProfile, ContactDetails, Staff, normalize_email, require_secret,
};
use evax_records::VaccineCard;

use crate::error::{ServiceError, ServiceResult};
use crate::locks::{KeyedLocks, card_key, registry_key};
use crate::store::{Document, DocumentStore, Repository};

/// An authenticated account and its freshly issued session token.
#[derive(Debug, Clone)]
pub struct Session<T> {
    pub account: T,
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct NewStaff {
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub password: String,
    pub address: Option<String>,
}

#[derive(Clone)]
pub struct AccountRegistry {
    admins: Repository<Admin>,
    staff: Repository<Staff>,
    citizens: Repository<Citizen>,
    cards: Repository<VaccineCard>,
    credentials: Arc<dyn CredentialVerifier>,
    tokens: Arc<dyn TokenIssuer>,
    locks: KeyedLocks,
}

impl AccountRegistry {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        credentials: Arc<dyn CredentialVerifier>,
        tokens: Arc<dyn TokenIssuer>,
        locks: KeyedLocks,
    ) -> Self {
        Self {
            admins: Repository::new(Arc::clone(&store)),
            staff: Repository::new(Arc::clone(&store)),
            citizens: Repository::new(Arc::clone(&store)),
            cards: Repository::new(store),
            credentials,
            tokens,
            locks,
        }
    }

    #[instrument(skip(self, new), fields(email = %new.email), err)]
    pub async fn register_admin(&self, new: NewAdmin) -> ServiceResult<Admin> {
        let contact = ContactDetails::new(&new.name, &new.email, &new.phone_number)?;
        let password = require_secret("password", &new.password)?;

        let _registry = self.locks.lock(registry_key()).await;
        ensure_unique(&self.admins, &contact, "admin").await?;

        let digest = self.credentials.hash(password)?;
        let mut admin = Admin::register(AdminId::new(), contact, digest);
        self.admins.save(&mut admin).await?;

        info!(admin_id = %admin.id(), "admin registered");
        Ok(admin)
    }

    #[instrument(skip(self, new), fields(email = %new.email), err)]
    pub async fn create_staff(&self, admin_id: &AdminId, new: NewStaff) -> ServiceResult<Staff> {
        let contact = ContactDetails::new(&new.name, &new.email, &new.phone_number)?;
        let password = require_secret("password", &new.password)?;
        let address = new
            .address
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());

        let _registry = self.locks.lock(registry_key()).await;
        let mut admin = self
            .admins
            .get(&admin_id.to_string())
            .await?
            .ok_or_else(|| ServiceError::not_found("admin not found"))?;
        ensure_unique(&self.staff, &contact, "staff").await?;

        let staff_id = StaffId::new();
        let digest = self.credentials.hash(password)?;
        let mut staff = Staff::register(staff_id, contact, address, digest);
        self.staff.save(&mut staff).await?;

        admin.add_staff(staff_id);
        self.admins.save(&mut admin).await?;

        info!(%admin_id, %staff_id, "staff created");
        Ok(staff)
    }

    /// Staff members created by `admin_id`, in creation order.
    pub async fn list_staff(&self, admin_id: &AdminId) -> ServiceResult<Vec<Staff>> {
        let admin = self
            .admins
            .get(&admin_id.to_string())
            .await?
            .ok_or_else(|| ServiceError::not_found("admin not found"))?;

        let mut members = Vec::with_capacity(admin.staff_ids().len());
        for staff_id in admin.staff_ids() {
            match self.staff.get(&staff_id.to_string()).await? {
                Some(staff) => members.push(staff),
                None => warn!(%admin_id, %staff_id, "admin lists a missing staff member"),
            }
        }
        Ok(members)
    }

    /// Register a citizen and make sure a vaccine card exists for the birth id.
    #[instrument(skip(self, profile, password), fields(birth_id = %profile.birth_id), err)]
    pub async fn register_citizen(
        &self,
        profile: CitizenProfile,
        password: &str,
    ) -> ServiceResult<(Citizen, VaccineCard)> {
        let password = require_secret("password", password)?;
        let profile = profile.normalized()?;
        let birth_id = profile.birth_id.clone();

        let _card = self.locks.lock(card_key(&birth_id)).await;
        let _registry = self.locks.lock(registry_key()).await;

        if self.citizens.find_by("email", &profile.email).await?.is_some() {
            return Err(ServiceError::conflict("a user with this email already exists"));
        }
        if self
            .citizens
            .find_by("birth_id", birth_id.as_str())
            .await?
            .is_some()
        {
            return Err(ServiceError::conflict("a user with this birth id already exists"));
        }

        let digest = self.credentials.hash(password)?;
        let mut citizen = Citizen::register(CitizenId::new(), profile, digest)?;
        self.citizens.save(&mut citizen).await?;

        let card = match self.cards.get(birth_id.as_str()).await? {
            Some(card) => card,
            None => {
                let mut card = VaccineCard::empty(birth_id.clone());
                self.cards.save(&mut card).await?;
                card
            }
        };

        info!(citizen_id = %citizen.id(), doses = card.dose_count(), "citizen registered");
        Ok((citizen, card))
    }

    #[instrument(skip(self, password), err)]
    pub async fn login_admin(&self, email: &str, password: &str) -> ServiceResult<Session<Admin>> {
        let (email, password) = login_fields(email, password)?;
        let admin = self
            .admins
            .find_by("email", &email)
            .await?
            .ok_or_else(|| ServiceError::not_found("admin not found"))?;
        self.check_password(password, admin.password_digest())?;

        let token = self.tokens.issue(*admin.id().as_uuid(), Role::Admin, Utc::now())?;
        info!(admin_id = %admin.id(), "admin logged in");
        Ok(Session { account: admin, token })
    }

    #[instrument(skip(self, password), err)]
    pub async fn login_staff(&self, email: &str, password: &str) -> ServiceResult<Session<Staff>> {
        let (email, password) = login_fields(email, password)?;
        let staff = self
            .staff
            .find_by("email", &email)
            .await?
            .ok_or_else(|| ServiceError::not_found("staff not found"))?;
        self.check_password(password, staff.password_digest())?;

        let token = self.tokens.issue(*staff.id().as_uuid(), Role::Staff, Utc::now())?;
        info!(staff_id = %staff.id(), "staff logged in");
        Ok(Session { account: staff, token })
    }

    #[instrument(skip(self, password), err)]
    pub async fn login_citizen(
        &self,
        email: &str,
        password: &str,
    ) -> ServiceResult<Session<Citizen>> {
        let (email, password) = login_fields(email, password)?;
        let citizen = self
            .citizens
            .find_by("email", &email)
            .await?
            .ok_or_else(|| ServiceError::not_found("user not found"))?;
        self.check_password(password, citizen.password_digest())?;

        let token = self.tokens.issue(*citizen.id().as_uuid(), Role::Citizen, Utc::now())?;
        info!(birth_id = %citizen.birth_id(), "citizen logged in");
        Ok(Session { account: citizen, token })
    }

    pub async fn citizen(&self, citizen_id: &CitizenId) -> ServiceResult<Citizen> {
        self.citizens
            .get(&citizen_id.to_string())
            .await?
            .ok_or_else(|| ServiceError::not_found("user not found"))
    }

    /// The citizen registered with `birth_id` and their card (empty if none).
    pub async fn citizen_by_birth_id(
        &self,
        birth_id: &BirthId,
    ) -> ServiceResult<(Citizen, VaccineCard)> {
        let citizen = self
            .citizens
            .find_by("birth_id", birth_id.as_str())
            .await?
            .ok_or_else(|| ServiceError::not_found("user not found"))?;
        let card = self
            .cards
            .get(birth_id.as_str())
            .await?
            .unwrap_or_else(|| VaccineCard::empty(birth_id.clone()));
        Ok((citizen, card))
    }

    fn check_password(&self, password: &str, digest: &str) -> ServiceResult<()> {
        if self.credentials.compare(password, digest) {
            Ok(())
        } else {
            Err(ServiceError::unauthorized("incorrect password"))
        }
    }
}

fn login_fields<'a>(email: &str, password: &'a str) -> ServiceResult<(String, &'a str)> {
    let email = normalize_email(email)?;
    let password = require_secret("password", password)?;
    Ok((email, password))
}

async fn ensure_unique<D: Document>(
    repo: &Repository<D>,
    contact: &ContactDetails,
    kind: &str,
) -> ServiceResult<()> {
    if repo.find_by("email", &contact.email).await?.is_some()
        || repo
            .find_by("phone_number", &contact.phone_number)
            .await?
            .is_some()
    {
        return Err(ServiceError::conflict(format!(
            "{kind} with this email or phone number already exists"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use evax_auth::{Argon2CredentialVerifier, Hs256Tokens, JwtValidator};
    use evax_parties::{Address, Gender};

    use crate::store::InMemoryDocumentStore;

    fn registry() -> (AccountRegistry, Arc<Hs256Tokens>) {
        let tokens = Arc::new(Hs256Tokens::new(b"registry-test", chrono::Duration::hours(1)));
        let registry = AccountRegistry::new(
            Arc::new(InMemoryDocumentStore::new()),
            Arc::new(Argon2CredentialVerifier::with_cost(8, 1).unwrap()),
            tokens.clone(),
            KeyedLocks::new(),
        );
        (registry, tokens)
    }

    fn new_admin(email: &str, phone: &str) -> NewAdmin {
        NewAdmin {
            name: "Admin".into(),
            email: email.into(),
            phone_number: phone.into(),
            password: "s3cret".into(),
        }
    }

    fn new_staff(email: &str, phone: &str) -> NewStaff {
        NewStaff {
            name: "Nurse".into(),
            email: email.into(),
            phone_number: phone.into(),
            password: "n0rse".into(),
            address: Some("  Ward 3 ".into()),
        }
    }

    fn profile(email: &str, birth_id: &str) -> CitizenProfile {
        CitizenProfile {
            full_name: "Ayesha Rahman".into(),
            email: email.into(),
            phone_number: "01900000000".into(),
            date_of_birth: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            father_name: "Karim Rahman".into(),
            mother_name: "Salma Rahman".into(),
            gender: Gender::Female,
            birth_id: BirthId::parse(birth_id).unwrap(),
            national_id: None,
            address: Address::default(),
        }
    }

    #[tokio::test]
    async fn admin_signup_and_login() {
        let (registry, tokens) = registry();
        let admin = registry
            .register_admin(new_admin("Boss@Clinic.org", "0170000000"))
            .await
            .unwrap();
        assert_eq!(admin.contact().email, "boss@clinic.org");
        assert_ne!(admin.password_digest(), "s3cret");

        let session = registry.login_admin("boss@clinic.org", "s3cret").await.unwrap();
        let claims = tokens.validate(&session.token, Utc::now()).unwrap();
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(&claims.sub, admin.id().as_uuid());
    }

    #[tokio::test]
    async fn duplicate_admin_email_or_phone_conflicts() {
        let (registry, _) = registry();
        registry.register_admin(new_admin("a@x.org", "1")).await.unwrap();

        let err = registry.register_admin(new_admin("A@x.org", "2")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        let err = registry.register_admin(new_admin("b@x.org", "1")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn login_failures_are_classified() {
        let (registry, _) = registry();
        registry.register_admin(new_admin("a@x.org", "1")).await.unwrap();

        let err = registry.login_admin("", "pw").await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        let err = registry.login_admin("a@x.org", " ").await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        let err = registry.login_admin("nobody@x.org", "pw").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        let err = registry.login_admin("a@x.org", "wrong").await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(ref m) if m == "incorrect password"));
    }

    #[tokio::test]
    async fn passwords_are_compared_verbatim() {
        let (registry, _) = registry();
        let mut admin = new_admin("a@x.org", "1");
        admin.password = " s3cret ".into();
        registry.register_admin(admin).await.unwrap();

        assert!(registry.login_admin("a@x.org", " s3cret ").await.is_ok());
        let err = registry.login_admin("a@x.org", "s3cret").await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn staff_are_created_under_their_admin() {
        let (registry, tokens) = registry();
        let admin = registry.register_admin(new_admin("a@x.org", "1")).await.unwrap();
        let admin_id = *admin.id();

        let staff = registry
            .create_staff(&admin_id, new_staff("n@x.org", "2"))
            .await
            .unwrap();
        assert_eq!(staff.address(), Some("Ward 3"));

        let err = registry
            .create_staff(&admin_id, new_staff("n@x.org", "3"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let err = registry
            .create_staff(&AdminId::new(), new_staff("m@x.org", "4"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let listed = registry.list_staff(&admin_id).await.unwrap();
        assert_eq!(listed, vec![staff]);

        let session = registry.login_staff("n@x.org", "n0rse").await.unwrap();
        assert_eq!(tokens.validate(&session.token, Utc::now()).unwrap().role, Role::Staff);
    }

    #[tokio::test]
    async fn citizen_signup_creates_card_and_rejects_duplicates() {
        let (registry, _) = registry();
        let (citizen, card) = registry
            .register_citizen(profile("mum@x.org", "2024000777"), "pw")
            .await
            .unwrap();
        assert_eq!(citizen.birth_id().as_str(), "2024000777");
        assert_eq!(card.revision(), 1);
        assert!(card.vaccines().is_empty());

        let err = registry
            .register_citizen(profile("MUM@x.org", "2024000778"), "pw")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        let err = registry
            .register_citizen(profile("dad@x.org", "2024000777"), "pw")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let err = registry
            .register_citizen(profile("dad@x.org", "2024000779"), "")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn citizen_lookup_by_birth_id() {
        let (registry, _) = registry();
        registry
            .register_citizen(profile("mum@x.org", "2024000777"), "pw")
            .await
            .unwrap();

        let (citizen, card) = registry
            .citizen_by_birth_id(&BirthId::parse("2024000777").unwrap())
            .await
            .unwrap();
        assert_eq!(citizen.email(), "mum@x.org");
        assert_eq!(card.birth_id().as_str(), "2024000777");

        let err = registry
            .citizen_by_birth_id(&BirthId::parse("2024000999").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let session = registry.login_citizen("mum@x.org", "pw").await.unwrap();
        assert_eq!(session.account, citizen);
    }
}
