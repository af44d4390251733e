//! Inventory accounting: stock pool, staff assignments, administered doses.
//!
//! Every mutation is a read-modify-write against the document store, done
//! under the keyed locks (see [`crate::locks`]) and with an optimistic
//! revision check on each write. Operations that touch both a quantity and a
//! vaccine card write the quantity first; if the card write then fails, a
//! compensating command puts the quantity back.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, error, info, instrument, warn};

use evax_core::{AdminId, Aggregate, BirthId, Event, StaffId, VaccineName};
use evax_inventory::{
    Assignment, ReturnStock, StaffStats, StockCommand, StockPool, StockPoolId, WithdrawStock,
    TopUpStock,
};
use evax_parties::{
    Admin, AssignVaccine, RecordAdministration, ReturnDose, Staff, StaffCommand, UpdateRemaining,
};
use evax_records::{CardCommand, DoseRecord, RecordDose, ScheduleNextDose, VaccineCard};

use crate::error::{ServiceError, ServiceResult};
use crate::locks::{KeyedLocks, card_key, staff_key, stock_key};
use crate::store::{DocumentStore, Repository};

/// A dose given by a staff member from their current assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdministerDose {
    pub staff_id: StaffId,
    pub birth_id: BirthId,
    pub vaccine_name: VaccineName,
    pub date_taken: NaiveDate,
    pub place: String,
    pub next_dose_date: Option<NaiveDate>,
}

/// A citizen-scheduled first dose, drawn from the central stock pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirstDose {
    pub birth_id: BirthId,
    pub vaccine_name: VaccineName,
    pub date_taken: NaiveDate,
    pub place: String,
}

/// A follow-up dose for a vaccine already on the card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextDose {
    pub birth_id: BirthId,
    pub vaccine_name: VaccineName,
    pub next_dose_date: NaiveDate,
    pub place: String,
}

fn event_types<E: Event>(events: &[E]) -> Vec<&'static str> {
    events.iter().map(Event::event_type).collect()
}

#[derive(Clone)]
pub struct InventoryAccountingEngine {
    stock: Repository<StockPool>,
    staff: Repository<Staff>,
    cards: Repository<VaccineCard>,
    admins: Repository<Admin>,
    locks: KeyedLocks,
}

impl InventoryAccountingEngine {
    pub fn new(store: Arc<dyn DocumentStore>, locks: KeyedLocks) -> Self {
        Self {
            stock: Repository::new(Arc::clone(&store)),
            staff: Repository::new(Arc::clone(&store)),
            cards: Repository::new(Arc::clone(&store)),
            admins: Repository::new(store),
            locks,
        }
    }

    async fn load_pool(&self) -> ServiceResult<StockPool> {
        Ok(self
            .stock
            .get(StockPoolId::CENTRAL)
            .await?
            .unwrap_or_else(StockPool::central))
    }

    async fn load_staff(&self, staff_id: &StaffId) -> ServiceResult<Staff> {
        self.staff
            .get(&staff_id.to_string())
            .await?
            .ok_or_else(|| ServiceError::not_found("staff not found"))
    }

    async fn load_card(&self, birth_id: &BirthId) -> ServiceResult<Option<VaccineCard>> {
        Ok(self.cards.get(birth_id.as_str()).await?)
    }

    /// Add `quantity` doses of `vaccine_name` to the central pool.
    #[instrument(skip(self), fields(vaccine = %vaccine_name), err)]
    pub async fn top_up_stock(
        &self,
        admin_id: &AdminId,
        vaccine_name: VaccineName,
        quantity: i64,
    ) -> ServiceResult<StockPool> {
        if self.admins.get(&admin_id.to_string()).await?.is_none() {
            return Err(ServiceError::not_found("admin not found"));
        }

        let _stock = self.locks.lock(stock_key()).await;
        let mut pool = self.load_pool().await?;
        pool.execute(&StockCommand::TopUp(TopUpStock {
            vaccine_name: vaccine_name.clone(),
            quantity,
            occurred_at: Utc::now(),
        }))?;
        self.stock.save(&mut pool).await?;

        info!(
            %admin_id,
            quantity,
            total = pool.quantity_of(&vaccine_name).unwrap_or_default(),
            "stock topped up"
        );
        Ok(pool)
    }

    /// The central pool (empty when never topped up).
    pub async fn get_stock(&self) -> ServiceResult<StockPool> {
        self.load_pool().await
    }

    /// Replace the staff member's assignment, closing the current batch.
    #[instrument(skip(self), fields(vaccine = %vaccine_name), err)]
    pub async fn assign_to_staff(
        &self,
        staff_id: &StaffId,
        vaccine_name: VaccineName,
        quantity: i64,
        as_of: Option<DateTime<Utc>>,
    ) -> ServiceResult<Staff> {
        let _staff = self.locks.lock(staff_key(staff_id)).await;
        let mut staff = self.load_staff(staff_id).await?;

        staff.execute(&StaffCommand::AssignVaccine(AssignVaccine {
            staff_id: *staff_id,
            vaccine_name,
            quantity,
            assigned_at: as_of.unwrap_or_else(Utc::now),
        }))?;
        self.staff.save(&mut staff).await?;

        if let Some(closed) = staff.last_batch() {
            info!(
                %staff_id,
                closed_vaccine = %closed.vaccine_name,
                closed_wastage = closed.wastage_rate,
                quantity,
                "vaccine reassigned"
            );
        } else {
            info!(%staff_id, quantity, "vaccine assigned");
        }
        Ok(staff)
    }

    /// Record a dose given by a staff member and append it to the citizen's card.
    #[instrument(
        skip(self, dose),
        fields(staff_id = %dose.staff_id, birth_id = %dose.birth_id, vaccine = %dose.vaccine_name),
        err
    )]
    pub async fn administer_dose(&self, dose: AdministerDose) -> ServiceResult<VaccineCard> {
        let _staff = self.locks.lock(staff_key(&dose.staff_id)).await;
        let _card = self.locks.lock(card_key(&dose.birth_id)).await;

        let mut staff = self.load_staff(&dose.staff_id).await?;
        let mut card = self
            .load_card(&dose.birth_id)
            .await?
            .unwrap_or_else(|| VaccineCard::empty(dose.birth_id.clone()));

        let now = Utc::now();
        let staff_events = staff.handle(&StaffCommand::RecordAdministration(RecordAdministration {
            staff_id: dose.staff_id,
            vaccine_name: dose.vaccine_name.clone(),
            occurred_at: now,
        }))?;
        let card_events = card.handle(&CardCommand::RecordDose(RecordDose {
            birth_id: dose.birth_id.clone(),
            dose: DoseRecord {
                vaccine_name: dose.vaccine_name.clone(),
                date_taken: Some(dose.date_taken),
                place: Some(dose.place.clone()),
                next_dose_date: dose.next_dose_date,
                administered_by: Some(dose.staff_id),
            },
            occurred_at: now,
        }))?;

        for event in &staff_events {
            staff.apply(event);
        }
        self.staff.save(&mut staff).await?;
        debug!(events = ?event_types(&staff_events), "staff quantity written");

        for event in &card_events {
            card.apply(event);
        }
        if let Err(err) = self.cards.save(&mut card).await {
            self.return_dose(&mut staff, &dose.staff_id, &dose.vaccine_name).await;
            return Err(err.into());
        }

        info!(
            events = ?event_types(&card_events),
            remaining = staff.assignment().map(|a| a.remaining_quantity).unwrap_or_default(),
            vaccinated_users = staff.vaccinated_users_count(),
            "dose administered"
        );
        Ok(card)
    }

    async fn return_dose(&self, staff: &mut Staff, staff_id: &StaffId, vaccine_name: &VaccineName) {
        let result = staff.execute(&StaffCommand::ReturnDose(ReturnDose {
            staff_id: *staff_id,
            vaccine_name: vaccine_name.clone(),
            occurred_at: Utc::now(),
        }));
        let saved = match result {
            Ok(_) => self.staff.save(staff).await.map_err(ServiceError::from),
            Err(e) => Err(e.into()),
        };
        match saved {
            Ok(()) => warn!(%staff_id, "card write failed; dose returned to staff"),
            Err(e) => error!(
                %staff_id,
                error = %e,
                "card write failed and the dose could not be returned; staff quantity is off by one"
            ),
        }
    }

    /// Correct the remaining quantity of the staff member's assignment.
    #[instrument(skip(self), err)]
    pub async fn update_remaining_quantity(
        &self,
        staff_id: &StaffId,
        new_quantity: i64,
    ) -> ServiceResult<Assignment> {
        let _staff = self.locks.lock(staff_key(staff_id)).await;
        let mut staff = self.load_staff(staff_id).await?;

        staff.execute(&StaffCommand::UpdateRemaining(UpdateRemaining {
            staff_id: *staff_id,
            new_quantity,
            occurred_at: Utc::now(),
        }))?;
        self.staff.save(&mut staff).await?;

        staff
            .assignment()
            .cloned()
            .ok_or_else(|| ServiceError::conflict("no vaccine assignment found for this staff"))
    }

    pub async fn get_assigned_vaccine(&self, staff_id: &StaffId) -> ServiceResult<Option<Assignment>> {
        Ok(self.load_staff(staff_id).await?.assignment().cloned())
    }

    /// Draw one unit from the central pool and record the dose on the card.
    #[instrument(
        skip(self, dose),
        fields(birth_id = %dose.birth_id, vaccine = %dose.vaccine_name),
        err
    )]
    pub async fn schedule_first_dose(&self, dose: FirstDose) -> ServiceResult<VaccineCard> {
        let _stock = self.locks.lock(stock_key()).await;
        let _card = self.locks.lock(card_key(&dose.birth_id)).await;

        let mut pool = self.load_pool().await?;
        let mut card = self
            .load_card(&dose.birth_id)
            .await?
            .unwrap_or_else(|| VaccineCard::empty(dose.birth_id.clone()));

        let now = Utc::now();
        let stock_events = pool.handle(&StockCommand::Withdraw(WithdrawStock {
            vaccine_name: dose.vaccine_name.clone(),
            quantity: 1,
            occurred_at: now,
        }))?;
        let card_events = card.handle(&CardCommand::RecordDose(RecordDose {
            birth_id: dose.birth_id.clone(),
            dose: DoseRecord {
                vaccine_name: dose.vaccine_name.clone(),
                date_taken: Some(dose.date_taken),
                place: Some(dose.place.clone()),
                next_dose_date: None,
                administered_by: None,
            },
            occurred_at: now,
        }))?;

        for event in &stock_events {
            pool.apply(event);
        }
        self.stock.save(&mut pool).await?;
        debug!(events = ?event_types(&stock_events), "stock withdrawal written");

        for event in &card_events {
            card.apply(event);
        }
        if let Err(err) = self.cards.save(&mut card).await {
            self.return_stock(&mut pool, &dose.vaccine_name).await;
            return Err(err.into());
        }

        info!(
            remaining_stock = pool.quantity_of(&dose.vaccine_name).unwrap_or_default(),
            "first dose scheduled"
        );
        Ok(card)
    }

    async fn return_stock(&self, pool: &mut StockPool, vaccine_name: &VaccineName) {
        let result = pool.execute(&StockCommand::Return(ReturnStock {
            vaccine_name: vaccine_name.clone(),
            quantity: 1,
            occurred_at: Utc::now(),
        }));
        let saved = match result {
            Ok(_) => self.stock.save(pool).await.map_err(ServiceError::from),
            Err(e) => Err(e.into()),
        };
        match saved {
            Ok(()) => warn!(vaccine = %vaccine_name, "card write failed; unit returned to stock"),
            Err(e) => error!(
                vaccine = %vaccine_name,
                error = %e,
                "card write failed and the unit could not be returned; stock is off by one"
            ),
        }
    }

    /// Append a follow-up dose (date and place only) to an existing card entry.
    #[instrument(
        skip(self, dose),
        fields(birth_id = %dose.birth_id, vaccine = %dose.vaccine_name),
        err
    )]
    pub async fn schedule_next_dose(&self, dose: NextDose) -> ServiceResult<VaccineCard> {
        let _card = self.locks.lock(card_key(&dose.birth_id)).await;
        let mut card = self
            .load_card(&dose.birth_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("vaccine record not found"))?;

        card.execute(&CardCommand::ScheduleNextDose(ScheduleNextDose {
            birth_id: dose.birth_id.clone(),
            vaccine_name: dose.vaccine_name.clone(),
            next_dose_date: dose.next_dose_date,
            place: dose.place.clone(),
            occurred_at: Utc::now(),
        }))?;
        self.cards.save(&mut card).await?;

        info!("next dose scheduled");
        Ok(card)
    }

    /// The citizen's card, or an empty one when nothing has been recorded.
    pub async fn get_vaccine_card(&self, birth_id: &BirthId) -> ServiceResult<VaccineCard> {
        Ok(self
            .load_card(birth_id)
            .await?
            .unwrap_or_else(|| VaccineCard::empty(birth_id.clone())))
    }

    pub async fn compute_stats(&self, staff_id: &StaffId) -> ServiceResult<StaffStats> {
        Ok(self.load_staff(staff_id).await?.stats()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use serde_json::Value as JsonValue;

    use evax_core::ExpectedVersion;
    use evax_parties::ContactDetails;

    use crate::store::{Document, InMemoryDocumentStore, StoreError, StoredDocument};

    /// Delegates to an in-memory store, failing writes to one collection on demand.
    struct FailingStore {
        inner: InMemoryDocumentStore,
        fail_collection: &'static str,
        failing: AtomicBool,
    }

    #[async_trait]
    impl DocumentStore for FailingStore {
        async fn find_by_id(&self, c: &str, id: &str) -> Result<Option<StoredDocument>, StoreError> {
            self.inner.find_by_id(c, id).await
        }

        async fn find_one(
            &self,
            c: &str,
            field: &str,
            value: &JsonValue,
        ) -> Result<Option<StoredDocument>, StoreError> {
            self.inner.find_one(c, field, value).await
        }

        async fn list(&self, c: &str) -> Result<Vec<StoredDocument>, StoreError> {
            self.inner.list(c).await
        }

        async fn count(&self, c: &str) -> Result<u64, StoreError> {
            self.inner.count(c).await
        }

        async fn save(
            &self,
            c: &str,
            id: &str,
            body: JsonValue,
            expected: ExpectedVersion,
        ) -> Result<u64, StoreError> {
            if c == self.fail_collection && self.failing.load(Ordering::SeqCst) {
                return Err(StoreError::Backend("disk full".into()));
            }
            self.inner.save(c, id, body, expected).await
        }
    }

    fn name(raw: &str) -> VaccineName {
        VaccineName::parse(raw).unwrap()
    }

    fn birth(raw: &str) -> BirthId {
        BirthId::parse(raw).unwrap()
    }

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    struct Fixture {
        store: Arc<dyn DocumentStore>,
        engine: InventoryAccountingEngine,
        admin_id: AdminId,
        staff_id: StaffId,
    }

    async fn fixture_with(store: Arc<dyn DocumentStore>) -> Fixture {
        let engine = InventoryAccountingEngine::new(Arc::clone(&store), KeyedLocks::new());

        let admin_id = AdminId::new();
        let mut admin = Admin::register(
            admin_id,
            ContactDetails::new("Admin", "admin@evax.test", "0170000000").unwrap(),
            "digest".into(),
        );
        Repository::<Admin>::new(Arc::clone(&store)).save(&mut admin).await.unwrap();

        let staff_id = StaffId::new();
        let mut staff = Staff::register(
            staff_id,
            ContactDetails::new("Nurse", "nurse@evax.test", "0180000000").unwrap(),
            None,
            "digest".into(),
        );
        Repository::<Staff>::new(Arc::clone(&store)).save(&mut staff).await.unwrap();

        Fixture {
            store,
            engine,
            admin_id,
            staff_id,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(Arc::new(InMemoryDocumentStore::new())).await
    }

    fn administer(f: &Fixture, birth_id: &str) -> AdministerDose {
        AdministerDose {
            staff_id: f.staff_id,
            birth_id: birth(birth_id),
            vaccine_name: name("BCG"),
            date_taken: date(3, 1),
            place: "Ward 3".into(),
            next_dose_date: Some(date(4, 1)),
        }
    }

    #[tokio::test]
    async fn top_ups_accumulate() {
        let f = fixture().await;
        f.engine.top_up_stock(&f.admin_id, name("BCG"), 10).await.unwrap();
        let pool = f.engine.top_up_stock(&f.admin_id, name("BCG"), 5).await.unwrap();
        assert_eq!(pool.quantity_of(&name("BCG")), Some(15));
        assert_eq!(f.engine.get_stock().await.unwrap(), pool);
    }

    #[tokio::test]
    async fn top_up_requires_known_admin_and_positive_quantity() {
        let f = fixture().await;
        let err = f.engine.top_up_stock(&AdminId::new(), name("BCG"), 1).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let err = f.engine.top_up_stock(&f.admin_id, name("BCG"), 0).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(f.engine.get_stock().await.unwrap().entries().is_empty());
    }

    #[tokio::test]
    async fn assign_unknown_staff_is_not_found() {
        let f = fixture().await;
        let err = f
            .engine
            .assign_to_staff(&StaffId::new(), name("BCG"), 5, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn five_doses_then_conflict_without_new_record() {
        let f = fixture().await;
        f.engine.assign_to_staff(&f.staff_id, name("BCG"), 5, None).await.unwrap();
        for _ in 0..5 {
            f.engine.administer_dose(administer(&f, "2024000100")).await.unwrap();
        }

        let assignment = f.engine.get_assigned_vaccine(&f.staff_id).await.unwrap().unwrap();
        assert_eq!(assignment.remaining_quantity, 0);
        assert_eq!(assignment.wastage_rate, 100.0);

        let err = f.engine.administer_dose(administer(&f, "2024000100")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(ref m) if m == "no assigned vaccines left"));

        let card = f.engine.get_vaccine_card(&birth("2024000100")).await.unwrap();
        assert_eq!(card.doses_of(&name("BCG")).len(), 5);
        assert_eq!(card.doses_of(&name("BCG"))[0].administered_by, Some(f.staff_id));
    }

    #[tokio::test]
    async fn reassignment_resets_count_and_keeps_previous_quantity() {
        let f = fixture().await;
        f.engine.assign_to_staff(&f.staff_id, name("BCG"), 5, None).await.unwrap();
        f.engine.administer_dose(administer(&f, "2024000101")).await.unwrap();
        let staff = f
            .engine
            .assign_to_staff(&f.staff_id, name("OPV-0"), 8, None)
            .await
            .unwrap();

        assert_eq!(staff.vaccinated_users_count(), 0);
        let a = staff.assignment().unwrap();
        assert_eq!(a.previous_quantity, 5);
        assert_eq!(a.remaining_quantity, 8);
        assert_eq!(staff.last_batch().unwrap().wastage_rate, 20.0);
    }

    #[tokio::test]
    async fn update_remaining_and_stats() {
        let f = fixture().await;
        f.engine.assign_to_staff(&f.staff_id, name("BCG"), 5, None).await.unwrap();

        let a = f.engine.update_remaining_quantity(&f.staff_id, 3).await.unwrap();
        assert_eq!(a.remaining_quantity, 3);
        assert_eq!(a.wastage_rate, 40.0);

        let err = f.engine.update_remaining_quantity(&f.staff_id, 6).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        let unchanged = f.engine.get_assigned_vaccine(&f.staff_id).await.unwrap().unwrap();
        assert_eq!(unchanged, a);

        let stats = f.engine.compute_stats(&f.staff_id).await.unwrap();
        assert_eq!(stats.total_assigned, 5);
        assert_eq!(stats.remaining, 3);
        assert_eq!(stats.wastage_percentage, "40.00%");
    }

    #[tokio::test]
    async fn stats_without_assignment_conflict() {
        let f = fixture().await;
        let err = f.engine.compute_stats(&f.staff_id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn first_dose_draws_one_unit_and_creates_card() {
        let f = fixture().await;
        f.engine.top_up_stock(&f.admin_id, name("BCG"), 2).await.unwrap();

        let card = f
            .engine
            .schedule_first_dose(FirstDose {
                birth_id: birth("2024000200"),
                vaccine_name: name("BCG"),
                date_taken: date(3, 1),
                place: "Upazila Health Complex".into(),
            })
            .await
            .unwrap();

        assert_eq!(card.revision(), 1);
        assert_eq!(card.doses_of(&name("BCG")).len(), 1);
        assert_eq!(card.doses_of(&name("BCG"))[0].administered_by, None);
        assert_eq!(f.engine.get_stock().await.unwrap().quantity_of(&name("BCG")), Some(1));
    }

    #[tokio::test]
    async fn first_dose_without_stock_fails() {
        let f = fixture().await;
        let dose = FirstDose {
            birth_id: birth("2024000201"),
            vaccine_name: name("BCG"),
            date_taken: date(3, 1),
            place: "Clinic".into(),
        };
        let err = f.engine.schedule_first_dose(dose.clone()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        f.engine.top_up_stock(&f.admin_id, name("BCG"), 1).await.unwrap();
        f.engine.schedule_first_dose(dose.clone()).await.unwrap();
        let err = f.engine.schedule_first_dose(dose).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(ref m) if m == "vaccine out of stock"));
    }

    #[tokio::test]
    async fn next_dose_requires_existing_entry() {
        let f = fixture().await;
        let next = NextDose {
            birth_id: birth("2024000300"),
            vaccine_name: name("BCG"),
            next_dose_date: date(5, 1),
            place: "Clinic".into(),
        };
        let err = f.engine.schedule_next_dose(next.clone()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        f.engine.top_up_stock(&f.admin_id, name("BCG"), 1).await.unwrap();
        f.engine
            .schedule_first_dose(FirstDose {
                birth_id: birth("2024000300"),
                vaccine_name: name("BCG"),
                date_taken: date(3, 1),
                place: "Clinic".into(),
            })
            .await
            .unwrap();
        let card = f.engine.schedule_next_dose(next).await.unwrap();
        let doses = card.doses_of(&name("BCG"));
        assert_eq!(doses.len(), 2);
        assert_eq!(doses[1].next_dose_date, Some(date(5, 1)));
        assert_eq!(f.engine.get_stock().await.unwrap().quantity_of(&name("BCG")), Some(0));
    }

    #[tokio::test]
    async fn missing_card_reads_as_empty() {
        let f = fixture().await;
        let card = f.engine.get_vaccine_card(&birth("2099000000")).await.unwrap();
        assert!(card.vaccines().is_empty());
        assert_eq!(card.revision(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_doses_never_lose_a_decrement() {
        let f = fixture().await;
        f.engine.assign_to_staff(&f.staff_id, name("BCG"), 20, None).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..20 {
            let engine = f.engine.clone();
            let dose = administer(&f, &format!("20240004{i:02}"));
            handles.push(tokio::spawn(async move { engine.administer_dose(dose).await }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let a = f.engine.get_assigned_vaccine(&f.staff_id).await.unwrap().unwrap();
        assert_eq!(a.remaining_quantity, 0);
        let stats = f.engine.compute_stats(&f.staff_id).await.unwrap();
        assert_eq!(stats.vaccinated_users, 20);
    }

    #[tokio::test]
    async fn failed_card_write_returns_the_dose() {
        let failing = Arc::new(FailingStore {
            inner: InMemoryDocumentStore::new(),
            fail_collection: VaccineCard::COLLECTION,
            failing: AtomicBool::new(false),
        });
        let f = fixture_with(failing.clone()).await;
        f.engine.assign_to_staff(&f.staff_id, name("BCG"), 3, None).await.unwrap();

        failing.failing.store(true, Ordering::SeqCst);
        let err = f.engine.administer_dose(administer(&f, "2024000500")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Store(_)));

        let a = f.engine.get_assigned_vaccine(&f.staff_id).await.unwrap().unwrap();
        assert_eq!(a.remaining_quantity, 3);
        assert_eq!(a.wastage_rate, 0.0);
        assert_eq!(f.engine.compute_stats(&f.staff_id).await.unwrap().vaccinated_users, 0);
        assert_eq!(f.store.count(VaccineCard::COLLECTION).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_card_write_returns_the_stock_unit() {
        let failing = Arc::new(FailingStore {
            inner: InMemoryDocumentStore::new(),
            fail_collection: VaccineCard::COLLECTION,
            failing: AtomicBool::new(false),
        });
        let f = fixture_with(failing.clone()).await;
        f.engine.top_up_stock(&f.admin_id, name("BCG"), 1).await.unwrap();

        failing.failing.store(true, Ordering::SeqCst);
        let err = f
            .engine
            .schedule_first_dose(FirstDose {
                birth_id: birth("2024000600"),
                vaccine_name: name("BCG"),
                date_taken: date(3, 1),
                place: "Clinic".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Store(_)));
        assert_eq!(f.engine.get_stock().await.unwrap().quantity_of(&name("BCG")), Some(1));
    }
}
