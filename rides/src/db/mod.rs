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

//! Database abstraction in terms of the operations needed by the server.

use crate::model::{Ride, RideId};
use futures::TryStreamExt;
#[cfg(feature = "postgres")]
use ride_tracker_core::db::postgres;
#[cfg(any(feature = "sqlite", test))]
use ride_tracker_core::db::sqlite::{self, unpack_timestamp};
use ride_tracker_core::db::{DbError, DbResult, Executor};
use sqlx::Row;
#[cfg(feature = "postgres")]
use sqlx::postgres::PgRow;
#[cfg(any(feature = "sqlite", test))]
use sqlx::sqlite::SqliteRow;
use time::OffsetDateTime;


/// Initializes the database schema.
pub async fn init_schema(ex: &mut Executor) -> DbResult<()> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => postgres::run_schema(ex, include_str!("postgres.sql")).await,

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => sqlite::run_schema(ex, include_str!("sqlite.sql")).await,

        #[allow(unused)]
        _ => unreachable!(),
    }
}

#[cfg(feature = "postgres")]
impl TryFrom<PgRow> for Ride {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let id: i32 = row.try_get("id").map_err(postgres::map_sqlx_error)?;
        let name: String = row.try_get("name").map_err(postgres::map_sqlx_error)?;
        let duration: i32 = row.try_get("duration").map_err(postgres::map_sqlx_error)?;

        Ok(Ride::new(RideId::new(id), name, duration))
    }
}

#[cfg(any(feature = "sqlite", test))]
impl TryFrom<SqliteRow> for Ride {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(sqlite::map_sqlx_error)?;
        let name: String = row.try_get("name").map_err(sqlite::map_sqlx_error)?;
        let duration: i32 = row.try_get("duration").map_err(sqlite::map_sqlx_error)?;

        Ok(Ride::new(RideId::from_i64(id)?, name, duration))
    }
}

/// Gets all existing rides sorted by their identifier.
pub(crate) async fn get_rides(ex: &mut Executor) -> DbResult<Vec<Ride>> {
    let query_str = "SELECT id, name, duration FROM ride ORDER BY id";
    let mut rides = vec![];
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let mut rows = sqlx::query(query_str).fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(postgres::map_sqlx_error)? {
                rides.push(Ride::try_from(row)?);
            }
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let mut rows = sqlx::query(query_str).fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(sqlite::map_sqlx_error)? {
                rides.push(Ride::try_from(row)?);
            }
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
    Ok(rides)
}

/// Gets the ride identified by `id`.
pub(crate) async fn get_ride(ex: &mut Executor, id: RideId) -> DbResult<Ride> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT id, name, duration FROM ride WHERE id = $1";
            let row = sqlx::query(query_str)
                .bind(id.as_i32())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            Ride::try_from(row)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT id, name, duration FROM ride WHERE id = ?";
            let row = sqlx::query(query_str)
                .bind(id.as_i32())
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            Ride::try_from(row)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Creates a new ride with `name` and `duration` and returns the identifier assigned to it.
pub(crate) async fn create_ride(ex: &mut Executor, name: &str, duration: i32) -> DbResult<RideId> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "INSERT INTO ride (name, duration) VALUES ($1, $2) RETURNING id";
            let row = sqlx::query(query_str)
                .bind(name)
                .bind(duration)
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            let id: i32 = row.try_get("id").map_err(postgres::map_sqlx_error)?;
            Ok(RideId::new(id))
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "INSERT INTO ride (name, duration) VALUES (?, ?)";
            let done = sqlx::query(query_str)
                .bind(name)
                .bind(duration)
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            Ok(RideId::from_i64(done.last_insert_rowid())?)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Overwrites the name and duration of the ride identified by `ride.id`.
///
/// Updating a ride that does not exist is not an error and leaves the database untouched.
pub(crate) async fn update_ride(ex: &mut Executor, ride: &Ride) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "UPDATE ride SET name = $1, duration = $2 WHERE id = $3";
            let done = sqlx::query(query_str)
                .bind(ride.name())
                .bind(*ride.duration())
                .bind(ride.id().as_i32())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "UPDATE ride SET name = ?, duration = ? WHERE id = ?";
            let done = sqlx::query(query_str)
                .bind(ride.name())
                .bind(*ride.duration())
                .bind(ride.id().as_i32())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    if rows_affected > 1 {
        return Err(DbError::BackendError("Update affected more than one row".to_owned()));
    }
    Ok(())
}

/// Deletes the ride identified by `id`.
///
/// Deleting a ride that does not exist is not an error.
pub(crate) async fn delete_ride(ex: &mut Executor, id: RideId) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let done = sqlx::query("DELETE FROM ride WHERE id = $1")
                .bind(id.as_i32())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let done = sqlx::query("DELETE FROM ride WHERE id = ?")
                .bind(id.as_i32())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    if rows_affected > 1 {
        return Err(DbError::BackendError("Deletion affected more than one row".to_owned()));
    }
    Ok(())
}

/// Sets the date of each ride in `dates`, given as `(date, id)` pairs.
///
/// All updates reuse the same statement on the same connection.  Identifiers that do not match any
/// ride are ignored.
pub(crate) async fn update_ride_dates(
    ex: &mut Executor,
    dates: &[(OffsetDateTime, RideId)],
) -> DbResult<()> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "UPDATE ride SET ride_date = $1 WHERE id = $2";
            for (date, id) in dates {
                sqlx::query(query_str)
                    .bind(*date)
                    .bind(id.as_i32())
                    .execute(ex.conn())
                    .await
                    .map_err(postgres::map_sqlx_error)?;
            }
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "UPDATE ride SET ride_date_secs = ?, ride_date_nsecs = ? WHERE id = ?";
            for (date, id) in dates {
                let (date_secs, date_nsecs) = unpack_timestamp(*date)?;
                sqlx::query(query_str)
                    .bind(date_secs)
                    .bind(date_nsecs)
                    .bind(id.as_i32())
                    .execute(ex.conn())
                    .await
                    .map_err(sqlite::map_sqlx_error)?;
            }
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
    Ok(())
}

/// Gets the date of the ride identified by `id`, if any has been set.
#[cfg(test)]
pub(crate) async fn get_ride_date(
    ex: &mut Executor,
    id: RideId,
) -> DbResult<Option<OffsetDateTime>> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT ride_date FROM ride WHERE id = $1";
            let row = sqlx::query(query_str)
                .bind(id.as_i32())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            let date: Option<OffsetDateTime> =
                row.try_get("ride_date").map_err(postgres::map_sqlx_error)?;
            Ok(date)
        }

        Executor::Sqlite(ex) => {
            let query_str = "SELECT ride_date_secs, ride_date_nsecs FROM ride WHERE id = ?";
            let row = sqlx::query(query_str)
                .bind(id.as_i32())
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            let date_secs: Option<i64> =
                row.try_get("ride_date_secs").map_err(sqlite::map_sqlx_error)?;
            let date_nsecs: Option<i64> =
                row.try_get("ride_date_nsecs").map_err(sqlite::map_sqlx_error)?;
            match (date_secs, date_nsecs) {
                (Some(secs), Some(nsecs)) => Ok(Some(sqlite::build_timestamp(secs, nsecs)?)),
                (None, None) => Ok(None),
                (_, _) => Err(DbError::DataIntegrityError(
                    "Inconsistent values for ride_date".to_owned(),
                )),
            }
        }
    }
}
