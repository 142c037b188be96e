// libs/appointment-cell/src/services/otp.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{AppointmentError, OtpRecord, Reservation};
use crate::store::ReservationStore;

pub const OTP_LENGTH: usize = 6;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const MAX_WRITE_RETRIES: u32 = 5;

/// Six characters from A-Z0-9, each drawn from the OS CSPRNG.
pub fn generate_code() -> String {
    let mut rng = OsRng;
    (0..OTP_LENGTH)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Result of a checked attempt. `otp` already has the attempt counted.
#[derive(Debug, Clone, PartialEq)]
pub struct OtpAttempt {
    pub otp: OtpRecord,
    pub matched: bool,
}

impl OtpRecord {
    pub fn issue(now: DateTime<Utc>, expiry: Option<Duration>) -> Self {
        Self {
            code: generate_code(),
            generated_at: now,
            expires_at: expiry.map(|ttl| now + ttl),
            attempts: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            used: false,
        }
    }

    pub fn remaining_attempts(&self) -> u32 {
        self.max_attempts.saturating_sub(self.attempts)
    }

    /// Runs the gate checks in order. Errors here leave the record untouched;
    /// once the checks pass the attempt counts whether or not the code matches.
    pub fn attempt(&self, submitted: &str, now: DateTime<Utc>) -> Result<OtpAttempt, AppointmentError> {
        if self.used {
            return Err(AppointmentError::OtpUsed);
        }
        if self.attempts >= self.max_attempts {
            return Err(AppointmentError::MaxAttempts);
        }
        if self.expires_at.is_some_and(|expires_at| now > expires_at) {
            return Err(AppointmentError::OtpExpired);
        }

        let matched = submitted.trim().to_uppercase() == self.code.to_uppercase();
        Ok(OtpAttempt {
            otp: OtpRecord {
                attempts: self.attempts + 1,
                used: matched,
                ..self.clone()
            },
            matched,
        })
    }
}

/// A matching code together with the reservation it was checked against.
/// Nothing is persisted yet: the caller writes `otp` with the completion.
#[derive(Debug, Clone)]
pub struct OtpVerified {
    pub reservation: Reservation,
    pub otp: OtpRecord,
}

pub struct OtpGate {
    store: Arc<dyn ReservationStore>,
}

impl OtpGate {
    pub fn new(store: Arc<dyn ReservationStore>) -> Self {
        Self { store }
    }

    pub fn generate(&self, now: DateTime<Utc>, expiry: Option<Duration>) -> OtpRecord {
        OtpRecord::issue(now, expiry)
    }

    /// Validates `submitted` against the stored code. Mismatches are written
    /// back with a compare-and-swap so concurrent submissions each burn an attempt.
    pub async fn validate(
        &self,
        reservation_id: Uuid,
        submitted: &str,
        now: DateTime<Utc>,
    ) -> Result<OtpVerified, AppointmentError> {
        for attempt in 1..=MAX_WRITE_RETRIES {
            let current = self
                .store
                .get(reservation_id)
                .await?
                .ok_or(AppointmentError::NotFound(reservation_id))?;

            let otp = current.otp.as_ref().ok_or(AppointmentError::OtpMissing)?;
            let outcome = otp.attempt(submitted, now)?;

            if outcome.matched {
                debug!("OTP matched for reservation {}", reservation_id);
                return Ok(OtpVerified {
                    reservation: current,
                    otp: outcome.otp,
                });
            }

            let remaining_attempts = outcome.otp.remaining_attempts();
            let mut next = current.clone();
            next.otp = Some(outcome.otp);
            next.version = current.version + 1;
            next.updated_at = now;

            if self.store.compare_and_swap(current.version, &next).await? {
                info!(
                    "OTP mismatch for reservation {}, {} attempts remaining",
                    reservation_id, remaining_attempts
                );
                return Err(AppointmentError::OtpMismatch { remaining_attempts });
            }

            warn!(
                "OTP attempt on {} raced another write, retrying attempt {}/{}",
                reservation_id, attempt, MAX_WRITE_RETRIES
            );
            sleep(std::time::Duration::from_millis(5 * attempt as u64)).await;
        }

        Err(AppointmentError::StaleReservation(reservation_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_use_the_uppercase_alphabet() {
        for _ in 0..50 {
            let code = generate_code();
            assert_eq!(code.len(), OTP_LENGTH);
            assert!(code.bytes().all(|b| ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn match_is_case_insensitive_and_marks_used() {
        let now = Utc::now();
        let otp = OtpRecord {
            code: "AB12CD".to_string(),
            ..OtpRecord::issue(now, None)
        };

        let outcome = otp.attempt("ab12cd", now).unwrap();
        assert!(outcome.matched);
        assert!(outcome.otp.used);
        assert_eq!(outcome.otp.attempts, 1);

        assert_eq!(outcome.otp.attempt("AB12CD", now), Err(AppointmentError::OtpUsed));
    }

    #[test]
    fn third_mismatch_reports_zero_remaining_and_fourth_is_blocked() {
        let now = Utc::now();
        let mut otp = OtpRecord {
            code: "ZZZZZZ".to_string(),
            ..OtpRecord::issue(now, None)
        };

        for expected_remaining in [2, 1, 0] {
            let outcome = otp.attempt("AAAAAA", now).unwrap();
            assert!(!outcome.matched);
            otp = outcome.otp;
            assert_eq!(otp.remaining_attempts(), expected_remaining);
        }

        assert_eq!(otp.attempt("ZZZZZZ", now), Err(AppointmentError::MaxAttempts));
        assert_eq!(otp.attempts, 3);
    }

    #[test]
    fn expired_code_is_rejected_without_burning_an_attempt() {
        let issued = Utc::now() - Duration::hours(25);
        let otp = OtpRecord::issue(issued, Some(Duration::hours(24)));

        assert_eq!(otp.attempt(&otp.code.clone(), Utc::now()), Err(AppointmentError::OtpExpired));
        assert_eq!(otp.attempts, 0);
    }

    #[test]
    fn no_expiry_means_code_stays_valid() {
        let issued = Utc::now() - Duration::days(30);
        let otp = OtpRecord::issue(issued, None);
        assert!(otp.attempt(&otp.code.clone(), Utc::now()).unwrap().matched);
    }
}
