#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, DurationRound, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use appointment_cell::{
    Actor, AppointmentPolicyConfig, AppointmentService, ExpirySweeper, LogNotifier, MemoryReservationStore,
    Slot, TimeRange,
};
use doctor_cell::{
    Doctor, DoctorService, DoctorSubscription, DurationTier, FeeDescriptor, FeeSchedule, MemoryDoctorDirectory,
    OnlineFeeSchedule, SubscriptionPlan, TierPrices,
};
use video_conferencing_cell::{UnmanagedRooms, VideoRoomProvider};
use wallet_cell::{LedgerService, MemoryWalletStore, Wallet};

pub struct Harness {
    pub service: Arc<AppointmentService>,
    pub sweeper: Arc<ExpirySweeper>,
    pub reservations: Arc<MemoryReservationStore>,
    pub wallets: Arc<MemoryWalletStore>,
    pub ledger: Arc<LedgerService>,
    pub directory: Arc<MemoryDoctorDirectory>,
    pub doctors: Arc<DoctorService>,
    pub patient: Actor,
    pub doctor: Actor,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_policies(AppointmentPolicyConfig::default()).await
    }

    pub async fn with_policies(policies: AppointmentPolicyConfig) -> Self {
        Self::build(policies, Arc::new(UnmanagedRooms::new("test-video-secret"))).await
    }

    pub async fn with_rooms(rooms: Arc<dyn VideoRoomProvider>) -> Self {
        Self::build(AppointmentPolicyConfig::default(), rooms).await
    }

    async fn build(policies: AppointmentPolicyConfig, rooms: Arc<dyn VideoRoomProvider>) -> Self {
        let reservations = Arc::new(MemoryReservationStore::new());
        let wallets = Arc::new(MemoryWalletStore::new());
        let ledger = Arc::new(LedgerService::new(wallets.clone()));
        let directory = Arc::new(MemoryDoctorDirectory::new());
        let doctors = Arc::new(DoctorService::new(directory.clone()));

        let service = Arc::new(AppointmentService::new(
            reservations.clone(),
            ledger.clone(),
            doctors.clone(),
            rooms,
            Arc::new(LogNotifier),
            policies,
        ));
        let sweeper = Arc::new(ExpirySweeper::new(service.clone(), doctors.clone()));

        let harness = Self {
            service,
            sweeper,
            reservations,
            wallets,
            ledger,
            directory,
            doctors,
            patient: Actor::patient(Uuid::new_v4()),
            doctor: Actor::doctor(Uuid::new_v4()),
        };

        harness.add_doctor(harness.doctor.id).await;
        harness.fund_patient(dec!(1000)).await;
        harness
    }

    pub async fn add_doctor(&self, doctor_id: Uuid) {
        self.add_unsubscribed_doctor(doctor_id).await;

        let now = Utc::now();
        let schedule = FeeSchedule {
            platform_fee: FeeDescriptor::flat(dec!(50)),
            ops_expense: FeeDescriptor::percentage(dec!(10)),
        };
        self.directory
            .put_subscription(DoctorSubscription {
                id: Uuid::new_v4(),
                doctor_id,
                plan: SubscriptionPlan {
                    id: Uuid::new_v4(),
                    name: "standard".to_string(),
                    online: OnlineFeeSchedule { min15: schedule, min30: schedule, min60: schedule },
                    clinic: schedule,
                    home_visit: schedule,
                    emergency: schedule,
                },
                start_date: now - Duration::days(30),
                end_date: None,
            })
            .await;
    }

    pub async fn add_unsubscribed_doctor(&self, doctor_id: Uuid) {
        let now = Utc::now();
        self.directory
            .put_doctor(Doctor {
                id: doctor_id,
                full_name: "Dr. Iyer".to_string(),
                online_prices: Some(TierPrices { min15: dec!(300), min30: dec!(500), min60: dec!(800) }),
                clinic_fee: Some(dec!(500)),
                home_visit_fixed_cost: Some(dec!(300)),
                emergency_fee: dec!(700),
                is_active: true,
                deactivate_at: None,
                created_at: now,
                updated_at: now,
            })
            .await;
    }

    pub async fn fund_patient(&self, balance: Decimal) {
        self.wallets
            .put(Wallet {
                balance,
                ..Wallet::new(self.patient.id)
            })
            .await;
    }

    pub async fn patient_wallet(&self) -> Wallet {
        self.ledger.wallet(self.patient.id).await.unwrap()
    }

    pub async fn doctor_wallet(&self) -> Option<Wallet> {
        self.ledger.wallet(self.doctor.id).await.ok()
    }
}

/// A slot starting `hours_ahead` hours from the next whole hour.
pub fn slot_in(hours_ahead: i64, minute: i64, duration: DurationTier) -> Slot {
    let base = Utc::now().duration_trunc(Duration::hours(1)).unwrap() + Duration::hours(hours_ahead);
    slot_at(base + Duration::minutes(minute), duration)
}

pub fn slot_at(start: DateTime<Utc>, duration: DurationTier) -> Slot {
    Slot {
        day: start.date_naive(),
        duration,
        time: TimeRange {
            start,
            end: start + Duration::minutes(duration.minutes()),
        },
    }
}
