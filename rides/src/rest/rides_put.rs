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

//! API to overwrite an existing ride.

use crate::driver::Driver;
use crate::model::Ride;
use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use ride_tracker_core::rest::{JsonBody, RestError};

/// API handler.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    JsonBody(ride): JsonBody<Ride>,
) -> Result<impl IntoResponse, RestError> {
    let ride = driver.update_ride(ride).await?;
    Ok(Json(ride))
}

#[cfg(test)]
mod tests {
    use crate::model::*;
    use crate::rest::testutils::*;
    use axum::http;
    use ride_tracker_core::rest::testutils::*;
    use serde_json::json;

    fn route() -> (http::Method, String) {
        (http::Method::PUT, "/rides".to_owned())
    }

    #[tokio::test]
    async fn test_ok() {
        let context = TestContext::setup().await;

        let ride1 = context.create_ride("First", 1).await;
        let ride2 = context.create_ride("Second", 2).await;

        let new_ride = Ride::new(*ride1.id(), "Updated".to_owned(), 100);
        let response = OneShotBuilder::new(context.app(), route())
            .send_json(&new_ride)
            .await
            .expect_json::<Ride>()
            .await;
        assert_eq!(new_ride, response);

        assert_eq!(vec![new_ride, ride2], context.get_rides().await);
    }

    #[tokio::test]
    async fn test_missing_is_not_an_error() {
        let context = TestContext::setup().await;

        let ghost = Ride::new(RideId::new(42), "Ghost".to_owned(), 7);
        let response = OneShotBuilder::new(context.app(), route())
            .send_json(&ghost)
            .await
            .expect_json::<Ride>()
            .await;
        assert_eq!(ghost, response);

        assert!(context.get_rides().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_id() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.into_app(), route())
            .send_json(json!({"name": "No id", "duration": 1}))
            .await
            .expect_error(http::StatusCode::BAD_REQUEST, "missing field `id`")
            .await;
    }

    test_payload_must_be_json!(TestContext::setup().await.into_app(), route());
}
