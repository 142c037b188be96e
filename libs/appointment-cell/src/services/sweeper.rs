// libs/appointment-cell/src/services/sweeper.rs
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use doctor_cell::DoctorService;

use crate::models::{
    AppointmentError, Modality, Reservation, ReservationStatus, SweepCounts, SweepReport,
};
use crate::services::appointment::AppointmentService;
use crate::services::lifecycle::open_statuses;

/// Outcome of sweeping one modality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModalitySweep {
    pub counts: SweepCounts,
    pub failures: u32,
}

impl AppointmentService {
    /// Moves every due, still-open reservation of `modality` to its terminal
    /// status. A record that changed under the sweep is left for the next run.
    #[instrument(skip(self))]
    pub async fn sweep_expired(
        &self,
        modality: Modality,
        now: DateTime<Utc>,
    ) -> Result<ModalitySweep, AppointmentError> {
        let policy = self.policy(modality);
        let candidates = self
            .store
            .find_by_status(modality, None, open_statuses(modality))
            .await?;

        let mut sweep = ModalitySweep::default();
        for reservation in candidates.into_iter().filter(|r| policy.is_due(r, now)) {
            let id = reservation.id;
            match self.sweep_one(reservation, now).await {
                Ok(Some(status)) => sweep.counts.record(status),
                Ok(None) => {}
                Err(AppointmentError::StaleReservation(_)) => {
                    debug!("Reservation {} moved during sweep, skipping", id);
                }
                Err(e) => {
                    error!("Sweep of {} reservation {} failed: {}", modality, id, e);
                    sweep.failures += 1;
                }
            }
        }

        if !sweep.counts.is_empty() {
            info!(
                "Swept {}: {} expired, {} completed, {} unattended",
                modality,
                sweep.counts.expired_count,
                sweep.counts.completed_count,
                sweep.counts.unattended_count
            );
        }
        Ok(sweep)
    }

    async fn sweep_one(
        &self,
        reservation: Reservation,
        now: DateTime<Utc>,
    ) -> Result<Option<ReservationStatus>, AppointmentError> {
        if reservation.otp_used() {
            return Ok(None);
        }
        let Some(target) = self.policy(reservation.modality()).sweep_target(reservation.status) else {
            return Ok(None);
        };

        let swept = if target == ReservationStatus::Completed {
            let mut next = reservation.clone();
            next.status = ReservationStatus::Completed;
            self.settle(&reservation, next, now).await?
        } else {
            self.close_without_payment(&reservation, target, now).await?
        };
        Ok(Some(swept.status))
    }
}

/// Runs the per-modality sweeps and scheduled doctor deactivations, either
/// on demand or on a fixed interval.
pub struct ExpirySweeper {
    appointments: Arc<AppointmentService>,
    doctors: Arc<DoctorService>,
}

impl ExpirySweeper {
    pub fn new(appointments: Arc<AppointmentService>, doctors: Arc<DoctorService>) -> Self {
        Self { appointments, doctors }
    }

    pub async fn sweep_all(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        for modality in Modality::ALL {
            match self.appointments.sweep_expired(modality, now).await {
                Ok(sweep) => {
                    report.counts_mut(modality).merge(&sweep.counts);
                    report.total.merge(&sweep.counts);
                    report.failures += sweep.failures;
                }
                Err(e) => {
                    error!("Sweep of {} reservations failed: {}", modality, e);
                    report.failures += 1;
                }
            }
        }

        match self.doctors.apply_scheduled_deactivations(now).await {
            Ok(count) => report.doctors_deactivated = count,
            Err(e) => {
                error!("Scheduled doctor deactivation failed: {}", e);
                report.failures += 1;
            }
        }

        report
    }

    /// Sweeps forever. A tick that overruns delays the next one instead of
    /// bunching them.
    pub async fn run(self: Arc<Self>, every: Duration) {
        info!("Expiry sweeper running every {:?}", every);
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let report = self.sweep_all(Utc::now()).await;
            if report.failures > 0 {
                warn!("Sweep finished with {} failures", report.failures);
            }
            debug!("Sweep report: {:?}", report);
        }
    }
}
