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

//! Operations on one ride.

use crate::db;
use crate::driver::Driver;
use crate::model::*;
use log::debug;
use ride_tracker_core::db::DbError;
use ride_tracker_core::driver::{DriverError, DriverResult};

impl Driver {
    /// Gets the ride identified by `id`.
    pub(crate) async fn get_ride(self, id: RideId) -> DriverResult<Ride> {
        match db::get_ride(&mut self.db.ex().await?, id).await {
            Ok(ride) => Ok(ride),
            Err(DbError::NotFound) => {
                Err(DriverError::NotFound(format!("Ride {} not found", id.as_i32())))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Creates a new ride and returns it as persisted, including its assigned identifier.
    pub(crate) async fn create_ride(self, new_ride: NewRide) -> DriverResult<Ride> {
        let mut tx = self.db.begin().await?;
        let id = db::create_ride(tx.ex(), new_ride.name(), *new_ride.duration()).await?;
        let ride = db::get_ride(tx.ex(), id).await?;
        tx.commit().await?;
        debug!("Created ride {}", id.as_i32());
        Ok(ride)
    }

    /// Overwrites an existing `ride` and returns it unchanged.
    ///
    /// The ride is not required to exist.
    pub(crate) async fn update_ride(self, ride: Ride) -> DriverResult<Ride> {
        db::update_ride(&mut self.db.ex().await?, &ride).await?;
        debug!("Updated ride {}", ride.id().as_i32());
        Ok(ride)
    }

    /// Deletes the ride identified by `id`, which is not required to exist.
    pub(crate) async fn delete_ride(self, id: RideId) -> DriverResult<()> {
        db::delete_ride(&mut self.db.ex().await?, id).await?;
        debug!("Deleted ride {}", id.as_i32());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::testutils::*;

    #[tokio::test]
    async fn test_get_ride_ok() {
        let context = TestContext::setup().await;

        context.create_ride("First", 1).await;
        let exp_ride = context.create_ride("Second", 2).await;

        let ride = context.driver().get_ride(*exp_ride.id()).await.unwrap();
        assert_eq!(exp_ride, ride);
    }

    #[tokio::test]
    async fn test_get_ride_not_found() {
        let context = TestContext::setup().await;

        assert_eq!(
            DriverError::NotFound("Ride 123 not found".to_owned()),
            context.driver().get_ride(RideId::new(123)).await.unwrap_err()
        );
    }

    #[tokio::test]
    async fn test_create_ride_round_trip() {
        let context = TestContext::setup().await;

        let ride = context
            .driver()
            .create_ride(NewRide::new("Mumbai tour".to_owned(), 500))
            .await
            .unwrap();
        assert_eq!("Mumbai tour", ride.name());
        assert_eq!(500, *ride.duration());

        let persisted = db::get_ride(&mut context.ex().await, *ride.id()).await.unwrap();
        assert_eq!(ride, persisted);
    }

    #[tokio::test]
    async fn test_create_ride_assigns_fresh_ids() {
        let context = TestContext::setup().await;

        let ride1 = context.driver().create_ride(NewRide::new("a".to_owned(), 1)).await.unwrap();
        let ride2 = context.driver().create_ride(NewRide::new("a".to_owned(), 1)).await.unwrap();
        assert_ne!(ride1.id(), ride2.id());
    }

    #[tokio::test]
    async fn test_update_ride_ok() {
        let context = TestContext::setup().await;

        let ride = context.create_ride("Old", 1).await;
        let new_ride = Ride::new(*ride.id(), "New".to_owned(), 2);

        let response = context.driver().update_ride(new_ride).await.unwrap();
        assert_eq!(Ride::new(*ride.id(), "New".to_owned(), 2), response);

        let persisted = db::get_ride(&mut context.ex().await, *ride.id()).await.unwrap();
        assert_eq!(response, persisted);
    }

    #[tokio::test]
    async fn test_update_ride_not_found() {
        let context = TestContext::setup().await;

        let ride = Ride::new(RideId::new(8), "Ghost".to_owned(), 3);
        let response = context.driver().update_ride(ride).await.unwrap();
        assert_eq!(Ride::new(RideId::new(8), "Ghost".to_owned(), 3), response);

        assert!(db::get_rides(&mut context.ex().await).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_ride_ok() {
        let context = TestContext::setup().await;

        let ride1 = context.create_ride("First", 1).await;
        let ride2 = context.create_ride("Second", 2).await;

        context.driver().delete_ride(*ride1.id()).await.unwrap();

        assert_eq!(vec![ride2], db::get_rides(&mut context.ex().await).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_ride_not_found() {
        let context = TestContext::setup().await;

        context.driver().delete_ride(RideId::new(5)).await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_update_and_delete() {
        let context = TestContext::setup().await;

        let ride = context.create_ride("Contended", 1).await;
        let id = *ride.id();

        let (update, delete) = tokio::join!(
            context.driver().update_ride(Ride::new(id, "Updated".to_owned(), 2)),
            context.driver().delete_ride(id),
        );
        update.unwrap();
        delete.unwrap();

        // Updates never bring back a deleted ride, so both orderings end without the ride.
        assert_eq!(
            DbError::NotFound,
            db::get_ride(&mut context.ex().await, id).await.unwrap_err()
        );
    }
}
