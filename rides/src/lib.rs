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

//! REST service to keep track of rides.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use log::{info, warn};
use ride_tracker_core::clocks::Clock;
use ride_tracker_core::db::Db;
use ride_tracker_core::env::get_optional_var;
use std::error::Error;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;

pub mod db;
mod driver;
use driver::Driver;
pub(crate) mod model;
mod rest;
use rest::app;

/// Port to listen on when none is configured.
const DEFAULT_PORT: u16 = 8080;

/// Options to configure the HTTP server.
#[derive(Debug, PartialEq)]
pub struct ServerOptions {
    /// Address to bind to.
    pub address: IpAddr,

    /// Port to listen on.
    pub port: u16,
}

impl ServerOptions {
    /// Initializes a set of options from environment variables whose name is prefixed with the
    /// given `prefix`.
    ///
    /// This will use the optional `<prefix>_ADDRESS` and `<prefix>_PORT` variables, which default
    /// to the loopback address and to port 8080 respectively.
    pub fn from_env(prefix: &str) -> Result<ServerOptions, String> {
        Ok(ServerOptions {
            address: get_optional_var::<IpAddr>(prefix, "ADDRESS")?
                .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            port: get_optional_var::<u16>(prefix, "PORT")?.unwrap_or(DEFAULT_PORT),
        })
    }

    /// Returns the socket address to bind the server to.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}

/// Waits until the process is asked to terminate.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C; graceful shutdown disabled: {}", e);
        futures::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

/// Instantiates all resources to serve the application on `bind_addr`.
///
/// The database is closed once the server stops serving requests.
///
/// While it'd be nice to push this responsibility to `main`, doing so would force us to expose many
/// crate-internal types to the public, which in turn would make dead code detection harder.
pub async fn serve(
    bind_addr: impl Into<SocketAddr>,
    db: Arc<dyn Db + Send + Sync>,
    clock: Arc<dyn Clock + Send + Sync>,
) -> Result<(), Box<dyn Error>> {
    let driver = Driver::new(db.clone(), clock);
    let app = app(driver);

    let bind_addr = bind_addr.into();
    let listener = TcpListener::bind(bind_addr).await?;
    info!("Listening on {}", bind_addr);
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    Ok(())
}
