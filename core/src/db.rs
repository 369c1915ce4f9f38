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

//! Storage access shared by the ride service.
//!
//! Production deployments talk to PostgreSQL.  SQLite backs the tests and local runs.  Queries are
//! written per backend because the dialects disagree on placeholders and column types, so callers
//! match on `Executor` to pick the right one.

use crate::model::ModelError;
use async_trait::async_trait;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

/// Storage errors.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DbError {
    /// Anything the backend reported that has no more specific variant.
    #[error("Database error: {0}")]
    BackendError(String),

    /// A stored row could not be turned into a domain value.
    #[error("Data integrity error: {0}")]
    DataIntegrityError(String),

    /// The addressed row does not exist.
    #[error("Entity not found")]
    NotFound,

    /// No connection could be obtained, for example when the server hit its connection limit.
    #[error("Unavailable")]
    Unavailable,
}

impl From<ModelError> for DbError {
    fn from(e: ModelError) -> Self {
        DbError::DataIntegrityError(e.to_string())
    }
}

/// Result type for this module.
pub type DbResult<T> = Result<T, DbError>;

/// Handle to run queries on, bound either to a pooled connection or to an open transaction.
pub enum Executor {
    /// PostgreSQL handle.
    #[cfg(feature = "postgres")]
    Postgres(postgres::PostgresExecutor),

    /// SQLite handle.
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite::SqliteExecutor),
}

/// An `Executor` that is known to hold a transaction.  Dropping it without `commit` rolls back.
pub struct TxExecutor(Executor);

impl TxExecutor {
    /// Gives access to the transaction's executor for running queries.
    pub fn ex(&mut self) -> &mut Executor {
        &mut self.0
    }

    /// Makes every change done through this transaction durable.
    pub async fn commit(self) -> DbResult<()> {
        match self.0 {
            #[cfg(feature = "postgres")]
            Executor::Postgres(e) => e.commit().await,

            #[cfg(feature = "sqlite")]
            Executor::Sqlite(e) => e.commit().await,
        }
    }
}

/// A connection pool to one of the supported backends.
#[async_trait]
pub trait Db {
    /// Takes a connection from the pool.  Each statement run on it commits on its own.
    async fn ex(&self) -> DbResult<Executor>;

    /// Opens a transaction.
    async fn begin(&self) -> DbResult<TxExecutor>;

    /// Waits for borrowed connections to come back and shuts the pool down.
    async fn close(&self);
}

/// Macros to run one test body against every backend.
#[cfg(any(test, feature = "testutils"))]
pub mod testutils {
    pub use paste::paste;

    /// Defines test `name` as a call to `module::name` with the database built by `setup`.
    ///
    /// An optional attribute such as `#[ignore]` is attached to the generated test.
    #[macro_export]
    macro_rules! generate_one_test [
        ( $name:ident, $setup:expr, $module:path $(, #[$extra:meta] )? ) => {
            #[tokio::test]
            $(#[$extra])?
            async fn $name() {
                $crate::db::testutils::paste! {
                    $module :: [< $name >]($setup).await;
                }
            }
        }
    ];

    pub use generate_one_test;

    /// Defines one test per `name`, all of them backed by the `Arc<dyn Db + Send + Sync>` that
    /// `setup` returns.
    #[macro_export]
    macro_rules! generate_tests [
        ( #[$extra:meta], $setup:expr, $module:path $(, $name:ident)+ ) => {
            $(
                $crate::db::testutils::generate_one_test!($name, $setup, $module, #[$extra]);
            )+
        };

        ( $setup:expr, $module:path $(, $name:ident)+ ) => {
            $(
                $crate::db::testutils::generate_one_test!($name, $setup, $module);
            )+
        };
    ];

    pub use generate_tests;
}
