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

//! Entry point to the REST server.

use crate::driver::Driver;
use axum::Router;

mod batch_get;
mod ride_delete;
mod ride_get;
mod rides_get;
mod rides_post;
mod rides_put;
mod test_get;
#[cfg(test)]
mod testutils;

/// Creates the router for the application.
pub(crate) fn app(driver: Driver) -> Router {
    use axum::routing::{delete, get};
    Router::new()
        .route(
            "/rides",
            get(rides_get::handler).post(rides_post::handler).put(rides_put::handler),
        )
        .route("/ride/:id", get(ride_get::handler))
        .route("/delete/:id", delete(ride_delete::handler))
        .route("/batch", get(batch_get::handler))
        .route("/test", get(test_get::handler))
        .with_state(driver)
}
