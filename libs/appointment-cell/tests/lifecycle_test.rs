mod common;

use assert_matches::assert_matches;
use chrono::Utc;
use rust_decimal_macros::dec;
use uuid::Uuid;

use appointment_cell::{
    Actor, AppointmentError, BookEmergencyRequest, BookHomeVisitRequest, BookSlotRequest, ModalityDetails,
    PaymentStatus, ReservationStatus,
};
use doctor_cell::{DoctorError, DurationTier};
use wallet_cell::LedgerError;

use common::{slot_in, Harness};

#[tokio::test]
async fn online_booking_freezes_and_rejection_releases() {
    let h = Harness::new().await;
    let now = Utc::now();

    let reservation = h
        .service
        .book_online(
            &h.patient,
            BookSlotRequest { doctor_id: h.doctor.id, slot: slot_in(24, 0, DurationTier::Min30) },
            now,
        )
        .await
        .unwrap();

    assert_eq!(reservation.status, ReservationStatus::Pending);
    assert_eq!(reservation.payment.amount_frozen, dec!(500));
    let wallet = h.patient_wallet().await;
    assert_eq!((wallet.balance, wallet.frozen), (dec!(1000), dec!(500)));

    let rejected = h.service.reject(&h.doctor, reservation.id, now).await.unwrap();

    assert_eq!(rejected.status, ReservationStatus::Rejected);
    assert_eq!(rejected.payment.amount_frozen, dec!(0));
    assert_eq!(rejected.payment.payment_status, PaymentStatus::Failed);
    let wallet = h.patient_wallet().await;
    assert_eq!((wallet.balance, wallet.frozen), (dec!(1000), dec!(0)));
}

#[tokio::test]
async fn overlapping_clinic_slot_is_refused() {
    let h = Harness::new().await;
    let now = Utc::now();

    h.service
        .book_clinic(
            &h.patient,
            BookSlotRequest { doctor_id: h.doctor.id, slot: slot_in(24, 0, DurationTier::Min30) },
            now,
        )
        .await
        .unwrap();

    let second = h
        .service
        .book_clinic(
            &h.patient,
            BookSlotRequest { doctor_id: h.doctor.id, slot: slot_in(24, 15, DurationTier::Min30) },
            now,
        )
        .await;

    assert_matches!(second, Err(AppointmentError::SlotUnavailable));
    assert_eq!(h.patient_wallet().await.frozen, dec!(500));
}

#[tokio::test]
async fn adjacent_slots_do_not_conflict() {
    let h = Harness::new().await;
    let now = Utc::now();
    h.fund_patient(dec!(2000)).await;

    for minute in [0, 30] {
        h.service
            .book_clinic(
                &h.patient,
                BookSlotRequest { doctor_id: h.doctor.id, slot: slot_in(24, minute, DurationTier::Min30) },
                now,
            )
            .await
            .unwrap();
    }
    assert_eq!(h.patient_wallet().await.frozen, dec!(1000));
}

#[tokio::test]
async fn home_visit_runs_quote_confirm_and_otp_completion() {
    let h = Harness::new().await;
    let now = Utc::now();
    h.fund_patient(dec!(400)).await;

    let booked = h
        .service
        .book_home_visit(
            &h.patient,
            BookHomeVisitRequest {
                doctor_id: h.doctor.id,
                slot: slot_in(48, 0, DurationTier::Min60),
                address: "4 Hill Street".to_string(),
            },
            now,
        )
        .await
        .unwrap();
    assert_eq!(booked.payment.gross_amount, dec!(300));
    assert_eq!(h.patient_wallet().await.frozen, dec!(0));

    let quoted = h
        .service
        .doctor_accept_home_visit(&h.doctor, booked.id, dec!(100), now)
        .await
        .unwrap();
    assert_eq!(quoted.status, ReservationStatus::DoctorAccepted);
    assert_eq!(quoted.payment.gross_amount, dec!(400));
    assert_matches!(quoted.details, ModalityDetails::HomeVisit { travel_cost: Some(cost), .. } if cost == dec!(100));

    let confirmed = h.service.patient_confirm(&h.patient, booked.id, now).await.unwrap();
    assert_eq!(confirmed.status, ReservationStatus::PatientConfirmed);
    assert_eq!(h.patient_wallet().await.frozen, dec!(400));

    let otp = h.service.reveal_otp(&h.patient, booked.id).await.unwrap();
    let completed = h
        .service
        .complete_with_otp(&h.doctor, booked.id, &otp.code, now)
        .await
        .unwrap();

    assert_eq!(completed.status, ReservationStatus::Completed);
    assert_eq!(completed.payment.payment_status, PaymentStatus::Completed);
    assert!(completed.payment.holds_invariant());
    assert!(completed.otp_used());

    let wallet = h.patient_wallet().await;
    assert_eq!((wallet.balance, wallet.frozen), (dec!(0), dec!(0)));
    // 400 - 50 flat - 10% ops
    assert_eq!(h.doctor_wallet().await.unwrap().balance, dec!(310));
}

#[tokio::test]
async fn home_visit_confirm_needs_funds_for_the_total() {
    let h = Harness::new().await;
    let now = Utc::now();
    h.fund_patient(dec!(350)).await;

    let booked = h
        .service
        .book_home_visit(
            &h.patient,
            BookHomeVisitRequest {
                doctor_id: h.doctor.id,
                slot: slot_in(48, 0, DurationTier::Min60),
                address: "4 Hill Street".to_string(),
            },
            now,
        )
        .await
        .unwrap();
    h.service
        .doctor_accept_home_visit(&h.doctor, booked.id, dec!(100), now)
        .await
        .unwrap();

    let result = h.service.patient_confirm(&h.patient, booked.id, now).await;

    assert_matches!(result, Err(AppointmentError::Ledger(LedgerError::InsufficientBalance { .. })));
    let stored = h.service.get(&h.patient, booked.id).await.unwrap();
    assert_eq!(stored.status, ReservationStatus::DoctorAccepted);
    assert!(stored.otp.is_none());
}

#[tokio::test]
async fn otp_burns_down_then_locks() {
    let h = Harness::new().await;
    let now = Utc::now();

    let booked = h
        .service
        .book_clinic(
            &h.patient,
            BookSlotRequest { doctor_id: h.doctor.id, slot: slot_in(24, 0, DurationTier::Min30) },
            now,
        )
        .await
        .unwrap();
    h.service.accept(&h.doctor, booked.id, now).await.unwrap();
    let code = h.service.reveal_otp(&h.patient, booked.id).await.unwrap().code;
    let wrong = if code == "AAAAAA" { "BBBBBB" } else { "AAAAAA" };

    for expected in [2, 1, 0] {
        let result = h.service.complete_with_otp(&h.doctor, booked.id, wrong, now).await;
        assert_matches!(result, Err(AppointmentError::OtpMismatch { remaining_attempts }) if remaining_attempts == expected);
    }

    let fourth = h.service.complete_with_otp(&h.doctor, booked.id, &code, now).await;
    assert_matches!(fourth, Err(AppointmentError::MaxAttempts));

    let stored = h.service.get(&h.doctor, booked.id).await.unwrap();
    assert_eq!(stored.status, ReservationStatus::Accepted);
    assert_eq!(stored.otp.unwrap().attempts, 3);
    assert_eq!(h.patient_wallet().await.frozen, dec!(500));
}

#[tokio::test]
async fn used_otp_cannot_be_replayed() {
    let h = Harness::new().await;
    let now = Utc::now();

    let booked = h
        .service
        .book_clinic(
            &h.patient,
            BookSlotRequest { doctor_id: h.doctor.id, slot: slot_in(24, 0, DurationTier::Min30) },
            now,
        )
        .await
        .unwrap();
    h.service.accept(&h.doctor, booked.id, now).await.unwrap();
    let code = h.service.reveal_otp(&h.patient, booked.id).await.unwrap().code;

    h.service.complete_with_otp(&h.doctor, booked.id, &code, now).await.unwrap();
    let replay = h.service.complete_with_otp(&h.doctor, booked.id, &code, now).await;

    assert_matches!(replay, Err(AppointmentError::OtpUsed));
    let wrong = h.service.complete_with_otp(&h.doctor, booked.id, "ZZZZZZ", now).await;
    assert_matches!(wrong, Err(AppointmentError::OtpUsed));
    assert_eq!(h.doctor_wallet().await.unwrap().balance, dec!(400));
}

#[tokio::test]
async fn doctor_joining_online_consultation_settles_it() {
    let h = Harness::new().await;
    let now = Utc::now();

    let booked = h
        .service
        .book_online(
            &h.patient,
            BookSlotRequest { doctor_id: h.doctor.id, slot: slot_in(2, 0, DurationTier::Min30) },
            now,
        )
        .await
        .unwrap();
    let accepted = h.service.accept(&h.doctor, booked.id, now).await.unwrap();
    assert!(accepted.room_name().is_some());

    let patient_join = h.service.join(&h.patient, booked.id, now).await.unwrap();
    assert_eq!(patient_join.reservation.status, ReservationStatus::Accepted);
    assert!(!patient_join.access_token.is_empty());

    let doctor_join = h.service.join(&h.doctor, booked.id, now).await.unwrap();
    assert_eq!(doctor_join.reservation.status, ReservationStatus::Completed);
    assert_eq!(doctor_join.room_name, patient_join.room_name);

    let wallet = h.patient_wallet().await;
    assert_eq!((wallet.balance, wallet.frozen), (dec!(500), dec!(0)));
    assert_eq!(h.doctor_wallet().await.unwrap().balance, dec!(400));
}

#[tokio::test]
async fn emergency_is_taken_by_first_responder_and_settled() {
    let h = Harness::new().await;
    let now = Utc::now();
    let second_doctor = Actor::doctor(Uuid::new_v4());
    h.add_doctor(second_doctor.id).await;

    let raised = h
        .service
        .book_emergency(
            &h.patient,
            BookEmergencyRequest { description: "chest pain".to_string(), doctor_id: None },
            now,
        )
        .await
        .unwrap();
    assert_eq!(raised.doctor_id, None);
    assert_eq!(h.patient_wallet().await.frozen, dec!(0));

    let responded = h.service.respond_emergency(&h.doctor, raised.id, now).await.unwrap();
    assert_eq!(responded.status, ReservationStatus::InProgress);
    assert_eq!(responded.doctor_id, Some(h.doctor.id));
    assert_eq!(h.patient_wallet().await.frozen, dec!(700));

    let late = h.service.respond_emergency(&second_doctor, raised.id, now).await;
    assert_matches!(late, Err(AppointmentError::Unauthorized(_)));

    let finalized = h.service.finalize_emergency(&h.doctor, raised.id, now).await.unwrap();
    assert_eq!(finalized.status, ReservationStatus::Completed);
    let wallet = h.patient_wallet().await;
    assert_eq!((wallet.balance, wallet.frozen), (dec!(300), dec!(0)));
    // 700 - 50 flat - 10% ops
    assert_eq!(h.doctor_wallet().await.unwrap().balance, dec!(580));
}

#[tokio::test]
async fn only_the_booking_patient_may_cancel() {
    let h = Harness::new().await;
    let now = Utc::now();
    let stranger = Actor::patient(Uuid::new_v4());

    let booked = h
        .service
        .book_clinic(
            &h.patient,
            BookSlotRequest { doctor_id: h.doctor.id, slot: slot_in(24, 0, DurationTier::Min30) },
            now,
        )
        .await
        .unwrap();
    h.service.accept(&h.doctor, booked.id, now).await.unwrap();

    assert_matches!(
        h.service.cancel(&stranger, booked.id, now).await,
        Err(AppointmentError::Unauthorized(_))
    );

    let cancelled = h.service.cancel(&h.patient, booked.id, now).await.unwrap();
    assert_eq!(cancelled.status, ReservationStatus::Cancelled);
    assert_eq!(h.patient_wallet().await.frozen, dec!(0));

    assert_matches!(
        h.service.cancel(&h.patient, booked.id, now).await,
        Err(AppointmentError::InvalidTransition { .. })
    );
}

#[tokio::test]
async fn completion_without_subscription_moves_no_money() {
    let h = Harness::new().await;
    let now = Utc::now();
    let bare = Actor::doctor(Uuid::new_v4());
    h.add_unsubscribed_doctor(bare.id).await;

    let booked = h
        .service
        .book_clinic(
            &h.patient,
            BookSlotRequest { doctor_id: bare.id, slot: slot_in(24, 0, DurationTier::Min30) },
            now,
        )
        .await
        .unwrap();
    h.service.accept(&bare, booked.id, now).await.unwrap();
    let code = h.service.reveal_otp(&h.patient, booked.id).await.unwrap().code;

    let result = h.service.complete_with_otp(&bare, booked.id, &code, now).await;

    assert_matches!(result, Err(AppointmentError::Doctor(DoctorError::SubscriptionNotFound(_))));
    let wallet = h.patient_wallet().await;
    assert_eq!((wallet.balance, wallet.frozen), (dec!(1000), dec!(500)));
    let stored = h.service.get(&h.patient, booked.id).await.unwrap();
    assert_eq!(stored.status, ReservationStatus::Accepted);
    assert!(!stored.otp_used());
}

#[tokio::test]
async fn doctors_cannot_book() {
    let h = Harness::new().await;

    let result = h
        .service
        .book_clinic(
            &h.doctor,
            BookSlotRequest { doctor_id: h.doctor.id, slot: slot_in(24, 0, DurationTier::Min30) },
            Utc::now(),
        )
        .await;

    assert_matches!(result, Err(AppointmentError::Unauthorized(_)));
}

#[tokio::test]
async fn unsubscribed_doctor_cannot_take_an_emergency() {
    let h = Harness::new().await;
    let now = Utc::now();
    let unsubscribed = Actor::doctor(Uuid::new_v4());
    h.add_unsubscribed_doctor(unsubscribed.id).await;

    let raised = h
        .service
        .book_emergency(
            &h.patient,
            BookEmergencyRequest { description: "asthma attack".to_string(), doctor_id: None },
            now,
        )
        .await
        .unwrap();

    let response = h.service.respond_emergency(&unsubscribed, raised.id, now).await;
    assert_matches!(response, Err(AppointmentError::Doctor(DoctorError::SubscriptionNotFound(_))));
    assert_eq!(h.patient_wallet().await.frozen, dec!(0));

    let still_open = h.service.get(&h.patient, raised.id).await.unwrap();
    assert_eq!(still_open.status, ReservationStatus::Pending);
    assert_eq!(still_open.doctor_id, None);

    // A subscribed doctor can still pick it up.
    let responded = h.service.respond_emergency(&h.doctor, raised.id, now).await.unwrap();
    assert_eq!(responded.status, ReservationStatus::InProgress);
}
