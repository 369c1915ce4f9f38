// Ride Tracker
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Test utilities for the business layer.

use crate::db;
use crate::driver::Driver;
use crate::model::*;
use ride_tracker_core::clocks::Clock;
use ride_tracker_core::clocks::testutils::SettableClock;
use ride_tracker_core::db::sqlite::testutils::setup;
use ride_tracker_core::db::{Db, Executor};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use time::macros::datetime;

/// State of a running test.
pub(crate) struct TestContext {
    /// The database backing the driver.
    db: Arc<dyn Db + Send + Sync>,

    /// The clock injected into the driver.
    clock: Arc<SettableClock>,

    /// The driver under test.
    driver: Driver,
}

impl TestContext {
    /// Creates a driver backed by an in-memory database with the schema already in place.
    pub(crate) async fn setup() -> Self {
        let db: Arc<dyn Db + Send + Sync> = Arc::new(setup().await);
        db::init_schema(&mut db.ex().await.unwrap()).await.unwrap();
        let clock = Arc::new(SettableClock::new(datetime!(2023-07-01 08:00:00 UTC)));
        let driver = Driver::new(db.clone(), clock.clone());
        Self { db, clock, driver }
    }

    /// Obtains a direct executor against the database.
    pub(crate) async fn ex(&self) -> Executor {
        self.db.ex().await.unwrap()
    }

    /// Returns the current time of the fake clock.
    pub(crate) fn now(&self) -> OffsetDateTime {
        self.clock.now_utc()
    }

    /// Advances the fake clock by `delta`.
    pub(crate) fn advance(&self, delta: Duration) {
        self.clock.advance(delta)
    }

    /// Returns a new handle to the driver.
    pub(crate) fn driver(&self) -> Driver {
        self.driver.clone()
    }

    /// Inserts a ride directly into the database.
    pub(crate) async fn create_ride(&self, name: &str, duration: i32) -> Ride {
        let mut ex = self.ex().await;
        let id = db::create_ride(&mut ex, name, duration).await.unwrap();
        db::get_ride(&mut ex, id).await.unwrap()
    }
}
