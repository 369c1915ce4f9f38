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

//! High-level data types.

use derive_getters::Getters;
use derive_more::Constructor;
use ride_tracker_core::model::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};

/// Identifier of a ride as assigned by the database.
///
/// The PostgreSQL backend stores these as 32-bit integers so that is the range we support.
#[derive(Clone, Copy, Constructor, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub(crate) struct RideId(i32);

impl RideId {
    /// Creates an identifier from an `i64` with range validation.
    pub(crate) fn from_i64(id: i64) -> ModelResult<RideId> {
        match i32::try_from(id) {
            Ok(id) => Ok(RideId(id)),
            Err(e) => Err(ModelError(format!("Ride id {} cannot be represented: {}", id, e))),
        }
    }

    /// Returns the identifier as an `i32`.
    pub(crate) fn as_i32(self) -> i32 {
        self.0
    }
}

/// A persisted ride.
#[derive(Constructor, Debug, Deserialize, Getters, PartialEq, Serialize)]
pub(crate) struct Ride {
    /// Identifier of the ride.  Immutable after creation.
    id: RideId,

    /// Free-form name of the ride.
    name: String,

    /// Duration of the ride.  Units are up to the client.
    duration: i32,
}

/// The contents of a ride that has not been persisted yet.
///
/// Requests to create rides may carry an `id` too, but it is ignored because the database assigns
/// identifiers.
#[derive(Constructor, Deserialize, Getters)]
#[cfg_attr(test, derive(Debug, PartialEq, Serialize))]
pub(crate) struct NewRide {
    /// Free-form name of the ride.
    name: String,

    /// Duration of the ride.
    duration: i32,
}
