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

//! PostgreSQL backend, used in production.

use crate::db::{Db, DbError, DbResult, Executor, TxExecutor};
use crate::env::{get_optional_var, get_required_var};
use async_trait::async_trait;
use derivative::Derivative;
use log::{info, warn};
use sqlx::Transaction;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{
    PgConnectOptions, PgConnection, PgDatabaseError, PgPool, PgPoolOptions, Postgres,
};
use std::time::Duration;

/// Number of times to retry obtaining a connection when `<prefix>_MAX_RETRIES` is not set.
const DEFAULT_MAX_RETRIES: u16 = 60;

/// Upper bound for the wait between two connection attempts.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

/// PostgreSQL error code raised when the server refuses new connections.
const TOO_MANY_CONNECTIONS: &str = "53300";

/// Converts a `sqlx` error from a PostgreSQL operation into a `DbError`.
pub fn map_sqlx_error(e: sqlx::Error) -> DbError {
    match e {
        sqlx::Error::RowNotFound => DbError::NotFound,
        sqlx::Error::PoolTimedOut => DbError::Unavailable,
        sqlx::Error::ColumnNotFound(column) => {
            DbError::DataIntegrityError(format!("Missing column {}", column))
        }
        sqlx::Error::ColumnDecode { index, source } => {
            DbError::DataIntegrityError(format!("Bad value in column {}: {}", index, source))
        }
        sqlx::Error::Database(e) => {
            let code = e.try_downcast_ref::<PgDatabaseError>().map(PgDatabaseError::code);
            if code == Some(TOO_MANY_CONNECTIONS) {
                DbError::Unavailable
            } else {
                DbError::BackendError(e.to_string())
            }
        }
        e => DbError::BackendError(e.to_string()),
    }
}

/// Connection settings for a PostgreSQL server.
#[derive(Derivative)]
#[derivative(Debug, Default)]
#[cfg_attr(test, derivative(PartialEq))]
pub struct PostgresOptions {
    /// Name or address of the server.
    pub host: String,

    /// TCP port of the server.
    pub port: u16,

    /// Database that holds the `ride` table.
    pub database: String,

    /// Role to log in as.
    pub username: String,

    /// Password for `username`.
    #[derivative(Debug = "ignore")]
    pub password: String,

    /// Connections that the pool keeps open even when idle.
    pub min_connections: Option<u32>,

    /// Cap on the connections that the pool opens.
    pub max_connections: Option<u32>,

    /// How many times to retry obtaining a connection while the server is unavailable.
    pub max_retries: u16,
}

impl PostgresOptions {
    /// Reads the settings from the `<prefix>_*` environment variables.
    ///
    /// `HOST`, `PORT`, `DATABASE`, `USERNAME` and `PASSWORD` must be present.  `MIN_CONNECTIONS`,
    /// `MAX_CONNECTIONS` and `MAX_RETRIES` may be omitted.
    pub fn from_env(prefix: &str) -> Result<PostgresOptions, String> {
        let max_retries = get_optional_var::<u16>(prefix, "MAX_RETRIES")?;
        Ok(PostgresOptions {
            host: get_required_var(prefix, "HOST")?,
            port: get_required_var(prefix, "PORT")?,
            database: get_required_var(prefix, "DATABASE")?,
            username: get_required_var(prefix, "USERNAME")?,
            password: get_required_var(prefix, "PASSWORD")?,
            min_connections: get_optional_var(prefix, "MIN_CONNECTIONS")?,
            max_connections: get_optional_var(prefix, "MAX_CONNECTIONS")?,
            max_retries: max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
        })
    }
}

/// Executor for PostgreSQL queries.
#[derive(Debug)]
pub enum PostgresExecutor {
    /// Connection taken from the pool.  Every statement commits on its own.
    PoolExec(PoolConnection<Postgres>),

    /// Open transaction.
    TxExec(Transaction<'static, Postgres>),
}

impl PostgresExecutor {
    /// Returns the connection to run `sqlx` queries on.
    pub fn conn(&mut self) -> &mut PgConnection {
        match self {
            PostgresExecutor::PoolExec(conn) => &mut **conn,
            PostgresExecutor::TxExec(tx) => &mut **tx,
        }
    }

    /// Commits the transaction behind this executor.  Panics on pool executors.
    pub(super) async fn commit(self) -> DbResult<()> {
        match self {
            PostgresExecutor::TxExec(tx) => tx.commit().await.map_err(map_sqlx_error),
            PostgresExecutor::PoolExec(_) => unreachable!("Pool executors have nothing to commit"),
        }
    }
}

/// Returns how long to wait before retrying after `attempt` failed attempts.
///
/// The wait grows linearly with the attempt number plus up to a second of random jitter so that
/// many clients do not retry in lockstep.
fn retry_delay(attempt: u16) -> Duration {
    let base = Duration::from_millis(100) * u32::from(attempt);
    let jitter = Duration::from_millis(u64::from(rand::random::<u16>() % 1000));
    (base + jitter).min(MAX_RETRY_DELAY)
}

/// A PostgreSQL connection pool.
pub struct PostgresDb {
    /// The pool.  Connections are opened on first use.
    pool: PgPool,

    /// How many times to retry obtaining a connection while the server is unavailable.
    max_retries: u16,
}

impl PostgresDb {
    /// Sets up a pool against the server described by `opts` without connecting to it yet.
    pub fn connect(opts: PostgresOptions) -> DbResult<Self> {
        let connect_options = PgConnectOptions::new()
            .host(&opts.host)
            .port(opts.port)
            .database(&opts.database)
            .username(&opts.username)
            .password(&opts.password);

        let mut pool_options = PgPoolOptions::new().acquire_timeout(Duration::from_secs(2));
        if let Some(min) = opts.min_connections {
            pool_options = pool_options.min_connections(min);
        }
        if let Some(max) = opts.max_connections {
            pool_options = pool_options.max_connections(max);
        }

        info!("Using PostgreSQL database {} at {}:{}", opts.database, opts.host, opts.port);
        let pool = pool_options.connect_lazy_with(connect_options);
        Ok(Self { pool, max_retries: opts.max_retries })
    }

    /// Runs `acquire` until it succeeds or until the server stays unavailable for longer than the
    /// configured number of retries.
    async fn with_retries<T, F, Fut>(&self, acquire: F) -> DbResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        let mut attempt = 0;
        loop {
            match acquire().await.map_err(map_sqlx_error) {
                Err(DbError::Unavailable) if attempt < self.max_retries => {
                    attempt += 1;
                    let delay = retry_delay(attempt);
                    warn!(
                        "Database unavailable; retry {} of {} in {}ms",
                        attempt,
                        self.max_retries,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }

    /// Returns a pool executor without wrapping it in an `Executor`.
    pub async fn typed_ex(&self) -> DbResult<PostgresExecutor> {
        let conn = self.with_retries(|| self.pool.acquire()).await?;
        Ok(PostgresExecutor::PoolExec(conn))
    }
}

impl Drop for PostgresDb {
    fn drop(&mut self) {
        if !self.pool.is_closed() {
            warn!("PostgreSQL pool dropped without close()");
        }
    }
}

#[async_trait]
impl Db for PostgresDb {
    async fn ex(&self) -> DbResult<Executor> {
        Ok(Executor::Postgres(self.typed_ex().await?))
    }

    async fn begin(&self) -> DbResult<TxExecutor> {
        let tx = self.with_retries(|| self.pool.begin()).await?;
        Ok(TxExecutor(Executor::Postgres(PostgresExecutor::TxExec(tx))))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Runs every statement in `schema` on `e`.
///
/// Statements are separated by semicolons, so `--` comments must not contain any.  They are
/// stripped before splitting.
pub async fn run_schema(e: &mut PostgresExecutor, schema: &str) -> DbResult<()> {
    let comment = regex::Regex::new(r"--[^\n]*")
        .map_err(|e| DbError::BackendError(format!("Bad comment pattern: {}", e)))?;
    let schema = comment.replace_all(schema, "");

    let statements = schema.split(';').map(str::trim).filter(|s| !s.is_empty());
    for statement in statements {
        sqlx::query(statement).execute(e.conn()).await.map_err(map_sqlx_error)?;
    }
    Ok(())
}

/// Test utilities for the PostgreSQL backend.
#[cfg(any(feature = "testutils", test))]
pub mod testutils {
    use super::*;

    /// Connects to the database described by the `PGSQL_TEST_*` variables.
    ///
    /// The pool holds exactly one connection whose `search_path` points at `pg_temp`, so every
    /// table that a test creates vanishes on disconnection.  Panics on errors.
    pub async fn setup() -> PostgresDb {
        let _can_fail = env_logger::builder().is_test(true).try_init();

        let mut opts = PostgresOptions::from_env("PGSQL_TEST").unwrap();
        opts.min_connections = Some(1);
        opts.max_connections = Some(1);
        let db = PostgresDb::connect(opts).unwrap();

        let mut ex = db.typed_ex().await.unwrap();
        sqlx::query("SET search_path TO pg_temp").execute(ex.conn()).await.unwrap();
        db
    }
}
