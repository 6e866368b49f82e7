//! Shared fixtures: a two-hall cinema on the in-memory store.
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;

use cinema_booking::config::{AppConfig, BookingConfig, Config, DatabaseConfig, RedisConfig};
use cinema_booking::models::{Hall, Movie, ScreeningType, Seat, User};
use cinema_booking::store::{MemoryStore, Store};

pub const CUSTOMER_ROLE: &str = "User";

/// 2025-03-14 at the given wall-clock time, UTC.
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, hour, minute, 0).unwrap()
}

pub struct Cinema {
    pub store: MemoryStore,
    pub hall1: Hall,
    pub hall2: Hall,
    pub hall1_seats: Vec<Seat>,
    pub hall2_seats: Vec<Seat>,
    /// 125 minutes.
    pub feature: Movie,
    /// 90 minutes.
    pub short: Movie,
    pub standard: ScreeningType,
}

impl Cinema {
    pub async fn new() -> Self {
        let store = MemoryStore::new();

        let hall1 = store.add_hall("Hall 1").await;
        let hall2 = store.add_hall("Hall 2").await;

        let mut hall1_seats = Vec::new();
        let mut hall2_seats = Vec::new();
        for n in 1..=10 {
            hall1_seats.push(store.add_seat(hall1.id, &format!("A{n}")).await);
            hall2_seats.push(store.add_seat(hall2.id, &format!("A{n}")).await);
        }

        let feature = store.add_movie("The Long Feature", 125).await;
        let short = store.add_movie("Short Story", 90).await;
        let standard = store.add_screening_type("2D", 9.5).await;

        Self {
            store,
            hall1,
            hall2,
            hall1_seats,
            hall2_seats,
            feature,
            short,
            standard,
        }
    }

    pub fn store(&self) -> &dyn Store {
        &self.store
    }

    pub async fn customer(&self) -> User {
        let first: String = FirstName().fake();
        let last: String = LastName().fake();
        self.store.add_user(&first, &last, &[CUSTOMER_ROLE]).await
    }

    pub async fn admin(&self) -> User {
        self.store.add_user("Ada", "Admin", &["Admin"]).await
    }
}

pub fn test_config() -> Config {
    Config {
        app: AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
            rust_log: "cinema_booking=debug".to_string(),
        },
        database: DatabaseConfig {
            url: String::new(),
            pool_size: 1,
        },
        redis: RedisConfig {
            url: None,
            seat_map_ttl_seconds: 60,
        },
        booking: BookingConfig {
            customer_role: CUSTOMER_ROLE.to_string(),
        },
    }
}
