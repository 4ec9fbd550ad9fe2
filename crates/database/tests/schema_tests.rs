mod common;

use core_types::{BookingStatus, CoreError, NewBooking, NewReview};
use database::{
    BookingRepository, ConnectionManager, DbError, RatingSummary, ReviewRepository,
    RideRepository, UserRepository,
};
use rust_decimal_macros::dec;
use uuid::Uuid;

fn review(ride_id: Uuid, reviewer_id: Uuid, reviewee_id: Uuid, rating: i32) -> NewReview {
    NewReview {
        ride_id,
        reviewer_id,
        reviewee_id,
        rating,
        comment: Some("Smooth ride, on time.".to_string()),
    }
}

async fn try_booking(manager: &ConnectionManager, booking: NewBooking) -> Result<core_types::Booking, DbError> {
    manager
        .with_session(move |session| {
            Box::pin(async move { BookingRepository::create(session, &booking).await })
        })
        .await
}

async fn try_review(manager: &ConnectionManager, input: NewReview) -> Result<core_types::Review, DbError> {
    manager
        .with_session(move |session| {
            Box::pin(async move { ReviewRepository::create(session, &input).await })
        })
        .await
}

fn assert_check_violation(result: Result<impl std::fmt::Debug, DbError>, expected: &str) {
    match result {
        Err(DbError::CheckViolation { constraint }) => assert_eq!(constraint, expected),
        other => panic!("expected {expected} violation, got {other:?}"),
    }
}

#[tokio::test]
#[ignore = "needs TEST_DATABASE_URL"]
async fn test_booking_requires_at_least_one_seat() {
    let manager = common::test_manager().await;
    let trip = common::trip(&manager).await;

    for seats in [0, -1] {
        let result = try_booking(&manager, NewBooking::new(trip.ride.id, trip.passenger.id, seats)).await;
        assert_check_violation(result, "check_seats_reserved_positive");
    }

    let booking = try_booking(&manager, NewBooking::new(trip.ride.id, trip.passenger.id, 1))
        .await
        .unwrap();
    assert_eq!(booking.seats_reserved, 1);
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.amount_paid, dec!(0.00));
    manager.shutdown().await;
}

#[tokio::test]
#[ignore = "needs TEST_DATABASE_URL"]
async fn test_booking_amount_cannot_be_negative() {
    let manager = common::test_manager().await;
    let trip = common::trip(&manager).await;

    let result = try_booking(
        &manager,
        NewBooking::new(trip.ride.id, trip.passenger.id, 2).with_amount(dec!(-1.00)),
    )
    .await;
    assert_check_violation(result, "check_amount_positive");

    let paid = try_booking(
        &manager,
        NewBooking::new(trip.ride.id, trip.passenger.id, 2).with_amount(dec!(31.00)),
    )
    .await
    .unwrap();
    assert_eq!(paid.amount_paid, dec!(31.00));

    let result = manager
        .with_session(move |session| {
            Box::pin(async move { BookingRepository::record_payment(session, paid.id, dec!(-5.00)).await })
        })
        .await;
    assert_check_violation(result, "check_amount_positive");
    manager.shutdown().await;
}

#[tokio::test]
#[ignore = "needs TEST_DATABASE_URL"]
async fn test_store_rejects_unknown_booking_status() {
    let manager = common::test_manager().await;
    let trip = common::trip(&manager).await;

    let mut session = manager.acquire_session().await.unwrap();
    let result = sqlx::query(
        "INSERT INTO bookings (ride_id, passenger_id, seats_reserved, status) VALUES ($1, $2, 1, 'refunded')",
    )
    .bind(trip.ride.id)
    .bind(trip.passenger.id)
    .execute(&mut *session)
    .await
    .map_err(DbError::from);
    session.rollback().await.unwrap();

    assert_check_violation(result, "check_booking_status");
    manager.shutdown().await;
}

#[tokio::test]
#[ignore = "needs TEST_DATABASE_URL"]
async fn test_rating_must_be_between_one_and_five() {
    let manager = common::test_manager().await;
    let trip = common::trip(&manager).await;

    for rating in [6, 0] {
        let result = try_review(&manager, review(trip.ride.id, trip.passenger.id, trip.driver.id, rating)).await;
        assert_check_violation(result, "check_rating_range");
    }

    let created = try_review(&manager, review(trip.ride.id, trip.passenger.id, trip.driver.id, 5))
        .await
        .unwrap();
    assert_eq!(created.rating, 5);
    assert_eq!(created.comment.as_deref(), Some("Smooth ride, on time."));
    manager.shutdown().await;
}

#[tokio::test]
#[ignore = "needs TEST_DATABASE_URL"]
async fn test_one_review_per_reviewer_reviewee_and_ride() {
    let manager = common::test_manager().await;
    let trip = common::trip(&manager).await;

    try_review(&manager, review(trip.ride.id, trip.passenger.id, trip.driver.id, 4))
        .await
        .unwrap();

    let duplicate = try_review(&manager, review(trip.ride.id, trip.passenger.id, trip.driver.id, 2)).await;
    match duplicate {
        Err(DbError::UniqueViolation { constraint }) => {
            assert_eq!(constraint, "unique_review_per_ride_pair")
        }
        other => panic!("expected unique violation, got {other:?}"),
    }

    // The driver reviewing the passenger is a different pair.
    try_review(&manager, review(trip.ride.id, trip.driver.id, trip.passenger.id, 5))
        .await
        .unwrap();
    manager.shutdown().await;
}

#[tokio::test]
#[ignore = "needs TEST_DATABASE_URL"]
async fn test_booking_for_unknown_ride_violates_foreign_key() {
    let manager = common::test_manager().await;
    let passenger = common::create_user(&manager, "orphan").await;

    let result = try_booking(&manager, NewBooking::new(Uuid::new_v4(), passenger.id, 1)).await;
    let err = result.unwrap_err();
    assert!(matches!(err, DbError::ForeignKeyViolation { .. }), "got {err:?}");
    assert!(err.is_constraint_violation());
    manager.shutdown().await;
}

#[tokio::test]
#[ignore = "needs TEST_DATABASE_URL"]
async fn test_deleting_ride_removes_its_bookings_and_reviews() {
    let manager = common::test_manager().await;
    let trip = common::trip(&manager).await;
    let booking = try_booking(&manager, NewBooking::new(trip.ride.id, trip.passenger.id, 1))
        .await
        .unwrap();
    let written = try_review(&manager, review(trip.ride.id, trip.passenger.id, trip.driver.id, 5))
        .await
        .unwrap();

    let mut session = manager.acquire_session().await.unwrap();
    assert!(RideRepository::delete(&mut session, trip.ride.id).await.unwrap());
    assert!(BookingRepository::get(&mut session, booking.id).await.unwrap().is_none());
    assert!(ReviewRepository::get(&mut session, written.id).await.unwrap().is_none());
    assert!(UserRepository::get(&mut session, trip.passenger.id).await.unwrap().is_some());
    assert!(!RideRepository::delete(&mut session, trip.ride.id).await.unwrap());
    session.commit().await.unwrap();
    manager.shutdown().await;
}

#[tokio::test]
#[ignore = "needs TEST_DATABASE_URL"]
async fn test_deleting_user_removes_their_rides_and_bookings() {
    let manager = common::test_manager().await;
    let trip = common::trip(&manager).await;
    let booking = try_booking(&manager, NewBooking::new(trip.ride.id, trip.passenger.id, 1))
        .await
        .unwrap();
    let received = try_review(&manager, review(trip.ride.id, trip.driver.id, trip.passenger.id, 3))
        .await
        .unwrap();

    let mut session = manager.acquire_session().await.unwrap();
    assert!(UserRepository::delete(&mut session, trip.passenger.id).await.unwrap());
    assert!(BookingRepository::get(&mut session, booking.id).await.unwrap().is_none());
    assert!(ReviewRepository::get(&mut session, received.id).await.unwrap().is_none());
    assert!(RideRepository::get(&mut session, trip.ride.id).await.unwrap().is_some());

    assert!(UserRepository::delete(&mut session, trip.driver.id).await.unwrap());
    assert!(RideRepository::get(&mut session, trip.ride.id).await.unwrap().is_none());
    session.commit().await.unwrap();
    manager.shutdown().await;
}

#[tokio::test]
#[ignore = "needs TEST_DATABASE_URL"]
async fn test_relationships_are_loaded_explicitly() {
    let manager = common::test_manager().await;
    let trip = common::trip(&manager).await;
    let first = try_booking(&manager, NewBooking::new(trip.ride.id, trip.passenger.id, 1))
        .await
        .unwrap();
    let second = try_booking(&manager, NewBooking::new(trip.ride.id, trip.driver.id, 2))
        .await
        .unwrap();
    try_review(&manager, review(trip.ride.id, trip.passenger.id, trip.driver.id, 5))
        .await
        .unwrap();
    try_review(&manager, review(trip.ride.id, trip.driver.id, trip.passenger.id, 4))
        .await
        .unwrap();

    let mut session = manager.acquire_session().await.unwrap();
    let ride = BookingRepository::get_ride_for_booking(&mut session, first.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ride.id, trip.ride.id);
    assert_eq!(ride.price_share, dec!(15.50));
    assert!(BookingRepository::get_ride_for_booking(&mut session, Uuid::new_v4())
        .await
        .unwrap()
        .is_none());

    let on_ride = BookingRepository::list_for_ride(&mut session, trip.ride.id).await.unwrap();
    let ids: Vec<Uuid> = on_ride.iter().map(|b| b.id).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&first.id) && ids.contains(&second.id));

    let mine = BookingRepository::list_for_passenger(&mut session, trip.passenger.id)
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, first.id);

    let reviews = ReviewRepository::get_reviews_for_ride(&mut session, trip.ride.id)
        .await
        .unwrap();
    assert_eq!(reviews.len(), 2);
    assert!(reviews.iter().all(|r| r.ride_id == trip.ride.id));

    let written = ReviewRepository::list_written(&mut session, trip.passenger.id).await.unwrap();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].reviewee_id, trip.driver.id);
    let received = ReviewRepository::list_received(&mut session, trip.passenger.id).await.unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].reviewer_id, trip.driver.id);

    let passenger = BookingRepository::get_passenger_for_booking(&mut session, first.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(passenger.id, trip.passenger.id);
    assert_eq!(passenger.email, trip.passenger.email);

    let about_driver = &written[0];
    let reviewed_ride = ReviewRepository::get_ride_for_review(&mut session, about_driver.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reviewed_ride.id, trip.ride.id);
    let reviewer = ReviewRepository::get_reviewer(&mut session, about_driver.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reviewer.id, trip.passenger.id);
    let reviewee = ReviewRepository::get_reviewee(&mut session, about_driver.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reviewee.id, trip.driver.id);

    let unknown = Uuid::new_v4();
    assert!(BookingRepository::get_passenger_for_booking(&mut session, unknown).await.unwrap().is_none());
    assert!(ReviewRepository::get_ride_for_review(&mut session, unknown).await.unwrap().is_none());
    assert!(ReviewRepository::get_reviewer(&mut session, unknown).await.unwrap().is_none());
    assert!(ReviewRepository::get_reviewee(&mut session, unknown).await.unwrap().is_none());
    session.rollback().await.unwrap();
    manager.shutdown().await;
}

#[tokio::test]
#[ignore = "needs TEST_DATABASE_URL"]
async fn test_booking_status_follows_lifecycle() {
    let manager = common::test_manager().await;
    let trip = common::trip(&manager).await;
    let booking = try_booking(&manager, NewBooking::new(trip.ride.id, trip.passenger.id, 1))
        .await
        .unwrap();

    let mut session = manager.acquire_session().await.unwrap();
    let confirmed = BookingRepository::update_status(&mut session, booking.id, BookingStatus::Confirmed)
        .await
        .unwrap();
    assert_eq!(confirmed.status, BookingStatus::Confirmed);
    let completed = BookingRepository::update_status(&mut session, booking.id, BookingStatus::Completed)
        .await
        .unwrap();
    assert_eq!(completed.status, BookingStatus::Completed);
    session.commit().await.unwrap();

    let result = manager
        .with_session(move |session| {
            Box::pin(async move {
                BookingRepository::update_status(session, booking.id, BookingStatus::Pending).await
            })
        })
        .await;
    match result {
        Err(DbError::InvalidTransition(CoreError::InvalidTransition { from, to })) => {
            assert_eq!(from, BookingStatus::Completed);
            assert_eq!(to, BookingStatus::Pending);
        }
        other => panic!("expected invalid transition, got {other:?}"),
    }

    let missing = manager
        .with_session(|session| {
            Box::pin(async move {
                BookingRepository::update_status(session, Uuid::new_v4(), BookingStatus::Confirmed).await
            })
        })
        .await;
    assert!(matches!(missing, Err(DbError::NotFound)));
    manager.shutdown().await;
}

#[tokio::test]
#[ignore = "needs TEST_DATABASE_URL"]
async fn test_rating_summary_averages_received_reviews() {
    let manager = common::test_manager().await;
    let trip = common::trip(&manager).await;
    let second_passenger = common::create_user(&manager, "second").await;

    try_review(&manager, review(trip.ride.id, trip.passenger.id, trip.driver.id, 4))
        .await
        .unwrap();
    try_review(&manager, review(trip.ride.id, second_passenger.id, trip.driver.id, 5))
        .await
        .unwrap();

    let mut session = manager.acquire_session().await.unwrap();
    let summary = ReviewRepository::rating_summary(&mut session, trip.driver.id)
        .await
        .unwrap();
    assert_eq!(summary.count, 2);
    assert_eq!(summary.average, Some(dec!(4.50)));

    let empty = ReviewRepository::rating_summary(&mut session, trip.passenger.id)
        .await
        .unwrap();
    assert_eq!(empty, RatingSummary { count: 0, average: None });
    session.rollback().await.unwrap();
    manager.shutdown().await;
}
