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

//! Errors raised by the ride business logic.

use crate::db::DbError;

/// Failures of a driver operation.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum DriverError {
    /// The storage layer failed or returned data that could not be used.
    #[error("{0}")]
    BackendError(String),

    /// The addressed ride does not exist.
    #[error("{0}")]
    NotFound(String),
}

impl From<DbError> for DriverError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound => DriverError::NotFound(e.to_string()),
            DbError::BackendError(_) | DbError::DataIntegrityError(_) | DbError::Unavailable => {
                DriverError::BackendError(e.to_string())
            }
        }
    }
}

/// Result type for this module.
pub type DriverResult<T> = Result<T, DriverError>;
