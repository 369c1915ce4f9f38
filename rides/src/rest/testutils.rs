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

//! Test utilities for the REST API.

use crate::db;
use crate::driver::Driver;
use crate::model::*;
use crate::rest::app;
use axum::Router;
use ride_tracker_core::clocks::Clock;
use ride_tracker_core::clocks::testutils::SettableClock;
use ride_tracker_core::db::Db;
use ride_tracker_core::db::sqlite::testutils::setup;
use std::sync::Arc;
use time::OffsetDateTime;
use time::macros::datetime;

/// State of a running test.
pub(crate) struct TestContext {
    /// The database backing the app, for direct manipulation.
    db: Arc<dyn Db + Send + Sync>,

    /// The clock injected into the app.
    clock: Arc<SettableClock>,

    /// The app under test.
    app: Router,
}

impl TestContext {
    /// Builds an app over an empty in-memory database and a clock frozen at 2023-07-01 08:00.
    pub(crate) async fn setup() -> Self {
        let db: Arc<dyn Db + Send + Sync> = Arc::new(setup().await);
        db::init_schema(&mut db.ex().await.unwrap()).await.unwrap();
        let clock = Arc::new(SettableClock::new(datetime!(2023-07-01 08:00:00 UTC)));
        let driver = Driver::new(db.clone(), clock.clone());
        let app = app(driver);
        Self { db, clock, app }
    }

    /// Returns a handle to the app for one request.
    pub(crate) fn app(&self) -> Router {
        self.app.clone()
    }

    /// Consumes the context and returns the app, for the last request of a test.
    pub(crate) fn into_app(self) -> Router {
        self.app
    }

    /// Returns the time the injected clock reports.
    pub(crate) fn now(&self) -> OffsetDateTime {
        self.clock.now_utc()
    }

    /// Stores a ride bypassing the API and returns it as persisted.
    pub(crate) async fn create_ride(&self, name: &str, duration: i32) -> Ride {
        let mut ex = self.db.ex().await.unwrap();
        let id = db::create_ride(&mut ex, name, duration).await.unwrap();
        db::get_ride(&mut ex, id).await.unwrap()
    }

    /// Reads all rides bypassing the API.
    pub(crate) async fn get_rides(&self) -> Vec<Ride> {
        db::get_rides(&mut self.db.ex().await.unwrap()).await.unwrap()
    }

    /// Reads the `ride_date` of ride `id`, which the API never exposes.
    pub(crate) async fn get_ride_date(&self, id: RideId) -> Option<OffsetDateTime> {
        db::get_ride_date(&mut self.db.ex().await.unwrap(), id).await.unwrap()
    }
}
