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

//! SQLite backend, used by tests and local runs.

use crate::db::{Db, DbError, DbResult, Executor, TxExecutor};
use async_trait::async_trait;
use futures::TryStreamExt;
use log::warn;
use sqlx::Transaction;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{Sqlite, SqliteConnection, SqlitePool};
use time::OffsetDateTime;

/// Converts a `sqlx` error from an SQLite operation into a `DbError`.
pub fn map_sqlx_error(e: sqlx::Error) -> DbError {
    match e {
        sqlx::Error::RowNotFound => DbError::NotFound,
        sqlx::Error::ColumnNotFound(column) => {
            DbError::DataIntegrityError(format!("Missing column {}", column))
        }
        sqlx::Error::ColumnDecode { index, source } => {
            DbError::DataIntegrityError(format!("Bad value in column {}: {}", index, source))
        }
        e => DbError::BackendError(e.to_string()),
    }
}

/// Opens a pool against the SQLite database at `conn_str`, which may be `:memory:`.
pub async fn connect(conn_str: &str) -> DbResult<SqliteDb> {
    let pool = SqlitePool::connect(conn_str).await.map_err(map_sqlx_error)?;
    Ok(SqliteDb { pool })
}

/// Executor for SQLite queries.
#[derive(Debug)]
pub enum SqliteExecutor {
    /// Connection taken from the pool.  Every statement commits on its own.
    PoolExec(PoolConnection<Sqlite>),

    /// Open transaction.
    TxExec(Transaction<'static, Sqlite>),
}

impl SqliteExecutor {
    /// Returns the connection to run `sqlx` queries on.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        match self {
            SqliteExecutor::PoolExec(conn) => &mut **conn,
            SqliteExecutor::TxExec(tx) => &mut **tx,
        }
    }

    /// Commits the transaction behind this executor.  Panics on pool executors.
    pub(super) async fn commit(self) -> DbResult<()> {
        match self {
            SqliteExecutor::TxExec(tx) => tx.commit().await.map_err(map_sqlx_error),
            SqliteExecutor::PoolExec(_) => unreachable!("Pool executors have nothing to commit"),
        }
    }
}

/// An SQLite connection pool.
pub struct SqliteDb {
    /// The pool.  In-memory databases live as long as one of its connections stays open.
    pool: SqlitePool,
}

impl Drop for SqliteDb {
    fn drop(&mut self) {
        if !self.pool.is_closed() {
            warn!("SQLite pool dropped without close()");
        }
    }
}

#[async_trait]
impl Db for SqliteDb {
    async fn ex(&self) -> DbResult<Executor> {
        let conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        Ok(Executor::Sqlite(SqliteExecutor::PoolExec(conn)))
    }

    async fn begin(&self) -> DbResult<TxExecutor> {
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(TxExecutor(Executor::Sqlite(SqliteExecutor::TxExec(tx))))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Runs every statement in `schema` on `e`.
pub async fn run_schema(e: &mut SqliteExecutor, schema: &str) -> DbResult<()> {
    let mut results = sqlx::raw_sql(schema).execute_many(e.conn());
    while results.try_next().await.map_err(map_sqlx_error)?.is_some() {}
    Ok(())
}

/// Rebuilds a timestamp stored as whole seconds since the epoch plus a nanoseconds fraction.
///
/// SQLite has no timestamp type, so timestamps live in two `INTEGER` columns.  Only values at or
/// after the epoch are accepted because that keeps the columns comparable in SQL.
pub fn build_timestamp(secs: i64, nsecs: i64) -> DbResult<OffsetDateTime> {
    let invalid =
        |reason: String| DbError::DataIntegrityError(format!("Bad timestamp {}.{}: {}", secs, nsecs, reason));

    if secs < 0 {
        return Err(invalid("negative seconds".to_owned()));
    }
    let nsecs = match u32::try_from(nsecs) {
        Ok(nsecs) if nsecs < 1_000_000_000 => nsecs,
        _ => return Err(invalid("nanoseconds out of range".to_owned())),
    };
    OffsetDateTime::from_unix_timestamp(secs)
        .and_then(|ts| ts.replace_nanosecond(nsecs))
        .map_err(|e| invalid(e.to_string()))
}

/// Splits a timestamp into the seconds and nanoseconds pair that `build_timestamp` takes.
pub fn unpack_timestamp(ts: OffsetDateTime) -> DbResult<(i64, i64)> {
    let secs = ts.unix_timestamp();
    if secs < 0 {
        return Err(DbError::DataIntegrityError(format!(
            "Cannot store timestamp {} before the epoch",
            ts
        )));
    }
    Ok((secs, i64::from(ts.nanosecond())))
}

/// Test utilities for the SQLite backend.
#[cfg(any(feature = "testutils", test))]
pub mod testutils {
    use super::*;

    /// Opens a fresh in-memory database.  Panics on errors.
    pub async fn setup() -> SqliteDb {
        let _can_fail = env_logger::builder().is_test(true).try_init();
        connect(":memory:").await.unwrap()
    }
}
