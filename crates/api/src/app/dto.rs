use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use evax_core::{AdminId, AggregateRoot, BirthId, CitizenId, Entity, StaffId, VaccineName};
use evax_infra::{AdministerDose, FirstDose, NewAdmin, NewStaff, NextDose};
use evax_inventory::{Assignment, BatchSnapshot};
use evax_parties::{Address, Admin, Citizen, CitizenProfile, Gender, Staff};

use crate::app::errors::{ApiError, ApiResult};

/// `Json<T>` whose rejections use the API error envelope.
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => match rejection.status() {
                StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                    Err(ApiError::validation(rejection.body_text()))
                }
                status => Err(ApiError::Rejected(status, rejection.body_text())),
            },
        }
    }
}

/// Collects missing required fields so one response can name all of them.
#[derive(Debug, Default)]
pub struct Presence {
    missing: Vec<String>,
}

impl Presence {
    /// A required text field; blank counts as missing.
    pub fn text(&mut self, field: &str, value: Option<String>) -> String {
        match value.filter(|v| !v.trim().is_empty()) {
            Some(v) => v,
            None => {
                self.missing.push(field.to_string());
                String::new()
            }
        }
    }

    pub fn value<T: Default>(&mut self, field: &str, value: Option<T>) -> T {
        match value {
            Some(v) => v,
            None => {
                self.missing.push(field.to_string());
                T::default()
            }
        }
    }

    pub fn finish(self) -> ApiResult<()> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(ApiError::missing_fields(self.missing))
        }
    }
}

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct AdminSignupRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(alias = "phoneNumber")]
    pub phone_number: Option<String>,
    pub password: Option<String>,
}

impl AdminSignupRequest {
    pub fn into_new_admin(self) -> ApiResult<NewAdmin> {
        let mut p = Presence::default();
        let new = NewAdmin {
            name: p.text("name", self.name),
            email: p.text("email", self.email),
            phone_number: p.text("phone_number", self.phone_number),
            password: p.text("password", self.password),
        };
        p.finish()?;
        Ok(new)
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    pub fn into_credentials(self) -> ApiResult<(String, String)> {
        let mut p = Presence::default();
        let email = p.text("email", self.email);
        let password = p.text("password", self.password);
        p.finish()?;
        Ok((email, password))
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateStaffRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(alias = "phoneNumber")]
    pub phone_number: Option<String>,
    pub password: Option<String>,
    pub address: Option<String>,
}

impl CreateStaffRequest {
    pub fn into_new_staff(self) -> ApiResult<NewStaff> {
        let mut p = Presence::default();
        let new = NewStaff {
            name: p.text("name", self.name),
            email: p.text("email", self.email),
            phone_number: p.text("phone_number", self.phone_number),
            password: p.text("password", self.password),
            address: self.address,
        };
        p.finish()?;
        Ok(new)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStockRequest {
    #[serde(alias = "vaccineName")]
    pub vaccine_name: Option<String>,
    pub quantity: Option<i64>,
}

impl UpdateStockRequest {
    pub fn into_parts(self) -> ApiResult<(VaccineName, i64)> {
        let mut p = Presence::default();
        let name = p.text("vaccine_name", self.vaccine_name);
        let quantity = p.value("quantity", self.quantity);
        p.finish()?;
        Ok((VaccineName::parse(name)?, quantity))
    }
}

#[derive(Debug, Deserialize)]
pub struct AssignVaccineRequest {
    #[serde(alias = "staffId")]
    pub staff_id: Option<String>,
    #[serde(alias = "vaccineName")]
    pub vaccine_name: Option<String>,
    pub quantity: Option<i64>,
    #[serde(alias = "asOf")]
    pub as_of: Option<DateTime<Utc>>,
}

pub struct AssignVaccineInput {
    pub staff_id: StaffId,
    pub vaccine_name: VaccineName,
    pub quantity: i64,
    pub as_of: Option<DateTime<Utc>>,
}

impl AssignVaccineRequest {
    pub fn into_input(self) -> ApiResult<AssignVaccineInput> {
        let mut p = Presence::default();
        let staff_id = p.text("staff_id", self.staff_id);
        let name = p.text("vaccine_name", self.vaccine_name);
        let quantity = p.value("quantity", self.quantity);
        p.finish()?;
        Ok(AssignVaccineInput {
            staff_id: staff_id.parse()?,
            vaccine_name: VaccineName::parse(name)?,
            quantity,
            as_of: self.as_of,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    #[serde(alias = "staffId")]
    pub staff_id: Option<String>,
    #[serde(alias = "newQuantity", alias = "quantity")]
    pub new_quantity: Option<i64>,
}

impl UpdateQuantityRequest {
    /// For administrators, who name the staff member explicitly.
    pub fn into_staff_and_quantity(self) -> ApiResult<(StaffId, i64)> {
        let mut p = Presence::default();
        let staff_id = p.text("staff_id", self.staff_id);
        let quantity = p.value("new_quantity", self.new_quantity);
        p.finish()?;
        Ok((staff_id.parse()?, quantity))
    }

    pub fn into_quantity(self) -> ApiResult<i64> {
        let mut p = Presence::default();
        let quantity = p.value("new_quantity", self.new_quantity);
        p.finish()?;
        Ok(quantity)
    }
}

#[derive(Debug, Deserialize)]
pub struct AdministerRequest {
    #[serde(alias = "birthId")]
    pub birth_id: Option<String>,
    #[serde(alias = "vaccineName")]
    pub vaccine_name: Option<String>,
    #[serde(alias = "dateTaken")]
    pub date_taken: Option<NaiveDate>,
    pub place: Option<String>,
    #[serde(alias = "nextDoseDate")]
    pub next_dose_date: Option<NaiveDate>,
}

impl AdministerRequest {
    pub fn into_dose(self, staff_id: StaffId) -> ApiResult<AdministerDose> {
        let mut p = Presence::default();
        let birth_id = p.text("birth_id", self.birth_id);
        let name = p.text("vaccine_name", self.vaccine_name);
        let date_taken = p.value("date_taken", self.date_taken);
        let place = p.text("place", self.place);
        p.finish()?;
        Ok(AdministerDose {
            staff_id,
            birth_id: BirthId::parse(birth_id)?,
            vaccine_name: VaccineName::parse(name)?,
            date_taken,
            place,
            next_dose_date: self.next_dose_date,
        })
    }
}

/// Body carrying only a birth id (optional for citizens, who default to their own).
#[derive(Debug, Default, Deserialize)]
pub struct BirthIdRequest {
    #[serde(alias = "birthId")]
    pub birth_id: Option<String>,
}

impl BirthIdRequest {
    pub fn into_birth_id(self) -> ApiResult<BirthId> {
        let mut p = Presence::default();
        let birth_id = p.text("birth_id", self.birth_id);
        p.finish()?;
        Ok(BirthId::parse(birth_id)?)
    }
}

#[derive(Debug, Deserialize)]
pub struct CitizenSignupRequest {
    #[serde(alias = "fullName")]
    pub full_name: Option<String>,
    pub email: Option<String>,
    #[serde(alias = "phoneNumber")]
    pub phone_number: Option<String>,
    #[serde(alias = "dateOfBirth")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(alias = "fatherName")]
    pub father_name: Option<String>,
    #[serde(alias = "motherName")]
    pub mother_name: Option<String>,
    pub gender: Option<String>,
    #[serde(alias = "birthId")]
    pub birth_id: Option<String>,
    #[serde(alias = "nationalId", alias = "nid")]
    pub national_id: Option<String>,
    #[serde(default)]
    pub address: Address,
    pub password: Option<String>,
}

impl CitizenSignupRequest {
    pub fn into_profile(self) -> ApiResult<(CitizenProfile, String)> {
        let mut p = Presence::default();
        let full_name = p.text("full_name", self.full_name);
        let email = p.text("email", self.email);
        let phone_number = p.text("phone_number", self.phone_number);
        let date_of_birth = p.value("date_of_birth", self.date_of_birth);
        let father_name = p.text("father_name", self.father_name);
        let mother_name = p.text("mother_name", self.mother_name);
        let gender = p.text("gender", self.gender);
        let birth_id = p.text("birth_id", self.birth_id);
        let password = p.text("password", self.password);
        p.finish()?;

        let profile = CitizenProfile {
            full_name,
            email,
            phone_number,
            date_of_birth,
            father_name,
            mother_name,
            gender: gender.parse::<Gender>()?,
            birth_id: BirthId::parse(birth_id)?,
            national_id: self.national_id,
            address: self.address,
        };
        Ok((profile, password))
    }
}

#[derive(Debug, Deserialize)]
pub struct FirstDoseRequest {
    #[serde(alias = "birthId")]
    pub birth_id: Option<String>,
    #[serde(alias = "vaccineName")]
    pub vaccine_name: Option<String>,
    #[serde(alias = "dateTaken")]
    pub date_taken: Option<NaiveDate>,
    pub place: Option<String>,
}

impl FirstDoseRequest {
    pub fn into_dose(self, birth_id: BirthId) -> ApiResult<FirstDose> {
        let mut p = Presence::default();
        let name = p.text("vaccine_name", self.vaccine_name);
        let date_taken = p.value("date_taken", self.date_taken);
        let place = p.text("place", self.place);
        p.finish()?;
        Ok(FirstDose {
            birth_id,
            vaccine_name: VaccineName::parse(name)?,
            date_taken,
            place,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct NextDoseRequest {
    #[serde(alias = "birthId")]
    pub birth_id: Option<String>,
    #[serde(alias = "vaccineName")]
    pub vaccine_name: Option<String>,
    #[serde(alias = "nextDoseDate")]
    pub next_dose_date: Option<NaiveDate>,
    pub place: Option<String>,
}

impl NextDoseRequest {
    pub fn into_dose(self, birth_id: BirthId) -> ApiResult<NextDose> {
        let mut p = Presence::default();
        let name = p.text("vaccine_name", self.vaccine_name);
        let next_dose_date = p.value("next_dose_date", self.next_dose_date);
        let place = p.text("place", self.place);
        p.finish()?;
        Ok(NextDose {
            birth_id,
            vaccine_name: VaccineName::parse(name)?,
            next_dose_date,
            place,
        })
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct AdminView {
    pub id: AdminId,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub staff_ids: Vec<StaffId>,
}

impl From<&Admin> for AdminView {
    fn from(admin: &Admin) -> Self {
        Self {
            id: *admin.id(),
            name: admin.contact().name.clone(),
            email: admin.contact().email.clone(),
            phone_number: admin.contact().phone_number.clone(),
            staff_ids: admin.staff_ids().to_vec(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StaffView {
    pub id: StaffId,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub address: Option<String>,
    pub assignment: Option<Assignment>,
    pub last_batch: Option<BatchSnapshot>,
    pub vaccinated_users_count: u64,
}

impl From<&Staff> for StaffView {
    fn from(staff: &Staff) -> Self {
        Self {
            id: *staff.id(),
            name: staff.contact().name.clone(),
            email: staff.contact().email.clone(),
            phone_number: staff.contact().phone_number.clone(),
            address: staff.address().map(str::to_string),
            assignment: staff.assignment().cloned(),
            last_batch: staff.last_batch().cloned(),
            vaccinated_users_count: staff.vaccinated_users_count(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CitizenView {
    pub id: CitizenId,
    #[serde(flatten)]
    pub profile: CitizenProfile,
}

impl From<&Citizen> for CitizenView {
    fn from(citizen: &Citizen) -> Self {
        Self {
            id: *citizen.id(),
            profile: citizen.profile().clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionView<T> {
    pub token: String,
    #[serde(flatten)]
    pub account: T,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn presence_names_every_missing_field() {
        let req: AdministerRequest =
            serde_json::from_value(json!({ "vaccineName": "BCG", "place": "  " })).unwrap();
        let err = req.into_dose(StaffId::new()).unwrap_err();
        match err {
            ApiError::Validation { errors, .. } => {
                assert_eq!(errors, vec!["birth_id", "date_taken", "place"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn camel_case_aliases_are_accepted() {
        let req: UpdateQuantityRequest =
            serde_json::from_value(json!({ "staffId": StaffId::new(), "newQuantity": 3 })).unwrap();
        let (_, quantity) = req.into_staff_and_quantity().unwrap();
        assert_eq!(quantity, 3);
    }

    #[test]
    fn citizen_signup_parses_gender_and_birth_id() {
        let req: CitizenSignupRequest = serde_json::from_value(json!({
            "fullName": "Ayesha Rahman",
            "email": "mum@x.org",
            "phoneNumber": "01900000000",
            "dateOfBirth": "2024-01-15",
            "fatherName": "Karim",
            "motherName": "Salma",
            "gender": "female",
            "birthId": "2024000777",
            "password": "pw",
        }))
        .unwrap();
        let (profile, password) = req.into_profile().unwrap();
        assert_eq!(profile.gender, Gender::Female);
        assert_eq!(profile.birth_id.as_str(), "2024000777");
        assert_eq!(password, "pw");
    }

    #[test]
    fn staff_view_omits_password_digest() {
        let staff = Staff::register(
            StaffId::new(),
            evax_parties::ContactDetails::new("Nurse", "n@x.org", "1").unwrap(),
            None,
            "$argon2id$v=19$m=8,t=1,p=1$c2FsdA$aGFzaA".into(),
        );
        let body = serde_json::to_value(StaffView::from(&staff)).unwrap();
        assert!(body.get("password_digest").is_none());
        assert_eq!(body["email"], "n@x.org");
    }
}
