//! Shared setup for tests that need a live PostgreSQL.
//!
//! These tests are ignored by default. Point `TEST_DATABASE_URL` at a
//! disposable database and run `cargo test -p database -- --ignored`.

#![allow(dead_code)]

use chrono::{Duration, Utc};
use configuration::DatabaseSettings;
use core_types::{NewRide, NewUser, Ride, User};
use database::{ConnectionManager, RideRepository, UserRepository};
use rust_decimal_macros::dec;
use uuid::Uuid;

pub fn test_settings() -> DatabaseSettings {
    let url = std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must point at a disposable database to run ignored tests");
    DatabaseSettings {
        pool_size: 4,
        max_overflow: 2,
        acquire_timeout_secs: 5,
        ..DatabaseSettings::with_url(url)
    }
}

/// An initialized, migrated manager on the test database.
pub async fn test_manager() -> ConnectionManager {
    manager_with(test_settings()).await
}

pub async fn manager_with(settings: DatabaseSettings) -> ConnectionManager {
    let manager = ConnectionManager::new(settings);
    manager.initialize().await.expect("initialize test database");
    manager.run_migrations().await.expect("migrate test database");
    manager
}

pub async fn create_user(manager: &ConnectionManager, label: &str) -> User {
    let new_user = NewUser {
        email: format!("{label}-{}@example.com", Uuid::new_v4()),
        full_name: label.to_string(),
    };
    let mut session = manager.acquire_session().await.unwrap();
    let user = UserRepository::create(&mut session, &new_user).await.unwrap();
    session.commit().await.unwrap();
    user
}

pub async fn create_ride(manager: &ConnectionManager, driver: &User) -> Ride {
    let new_ride = NewRide {
        driver_id: driver.id,
        origin: "Portland".to_string(),
        destination: "Seattle".to_string(),
        departure_time: Utc::now() + Duration::days(1),
        seats_total: 3,
        price_share: dec!(15.50),
    };
    let mut session = manager.acquire_session().await.unwrap();
    let ride = RideRepository::create(&mut session, &new_ride).await.unwrap();
    session.commit().await.unwrap();
    ride
}

/// A driver, a passenger and a ride offered by the driver.
pub struct Trip {
    pub driver: User,
    pub passenger: User,
    pub ride: Ride,
}

pub async fn trip(manager: &ConnectionManager) -> Trip {
    let driver = create_user(manager, "driver").await;
    let passenger = create_user(manager, "passenger").await;
    let ride = create_ride(manager, &driver).await;
    Trip { driver, passenger, ride }
}
