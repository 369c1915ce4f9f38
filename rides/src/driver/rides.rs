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

//! Operations on all rides at once.

use crate::db;
use crate::driver::Driver;
use crate::model::*;
use log::debug;
use ride_tracker_core::driver::DriverResult;

impl Driver {
    /// Gets all existing rides.
    pub(crate) async fn list_rides(self) -> DriverResult<Vec<Ride>> {
        let rides = db::get_rides(&mut self.db.ex().await?).await?;
        Ok(rides)
    }

    /// Sets the date of every existing ride to the current time.
    pub(crate) async fn batch(self) -> DriverResult<()> {
        let now = self.clock.now_utc();

        let mut tx = self.db.begin().await?;
        let rides = db::get_rides(tx.ex()).await?;
        let dates = rides.iter().map(|ride| (now, *ride.id())).collect::<Vec<_>>();
        db::update_ride_dates(tx.ex(), &dates).await?;
        tx.commit().await?;

        debug!("Set date of {} rides to {}", dates.len(), now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::testutils::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_list_rides_empty() {
        let context = TestContext::setup().await;

        assert!(context.driver().list_rides().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_rides_ok() {
        let context = TestContext::setup().await;

        let ride1 = context.create_ride("First", 1).await;
        let ride2 = context.create_ride("Second", 2).await;

        assert_eq!(vec![ride1, ride2], context.driver().list_rides().await.unwrap());
    }

    #[tokio::test]
    async fn test_batch_empty() {
        let context = TestContext::setup().await;

        context.driver().batch().await.unwrap();

        assert!(context.driver().list_rides().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batch_sets_dates() {
        let context = TestContext::setup().await;

        let ride1 = context.create_ride("First", 1).await;
        let ride2 = context.create_ride("Second", 2).await;
        let mut ex = context.ex().await;
        assert_eq!(None, db::get_ride_date(&mut ex, *ride1.id()).await.unwrap());
        drop(ex);

        context.driver().batch().await.unwrap();
        let first_now = context.now();

        let mut ex = context.ex().await;
        assert_eq!(Some(first_now), db::get_ride_date(&mut ex, *ride1.id()).await.unwrap());
        assert_eq!(Some(first_now), db::get_ride_date(&mut ex, *ride2.id()).await.unwrap());
        drop(ex);

        context.advance(Duration::from_secs(60));
        context.driver().batch().await.unwrap();
        let second_now = context.now();
        assert_ne!(first_now, second_now);

        let mut ex = context.ex().await;
        assert_eq!(Some(second_now), db::get_ride_date(&mut ex, *ride1.id()).await.unwrap());
        assert_eq!(Some(second_now), db::get_ride_date(&mut ex, *ride2.id()).await.unwrap());

        assert_eq!(vec![ride1, ride2], db::get_rides(&mut ex).await.unwrap());
    }
}
