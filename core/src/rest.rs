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

//! HTTP plumbing shared by the ride handlers.
//!
//! Failures never change the transport status: the server answers `200 OK` with an
//! `ErrorResponse` body whose `code` holds the status the failure stands for.  Handlers read their
//! inputs through `EmptyBody`, `JsonBody` and `PathParam` so that malformed requests end up as a
//! `RestError` too and follow the same rule.

use crate::driver::DriverError;
use async_trait::async_trait;
use axum::Json;
use axum::body::HttpBody;
use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::response::IntoResponse;
use http::StatusCode;
use http::request::Parts;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Failures reported to API clients.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum RestError {
    /// The backend failed, or the request hit the failure endpoint.
    #[error("{0}")]
    InternalError(String),

    /// The request could not be parsed.
    #[error("{0}")]
    InvalidRequest(String),

    /// The addressed ride does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A body was sent to an API that takes none.
    #[error("Content should be empty")]
    PayloadNotEmpty,
}

impl RestError {
    /// Status placed in the `code` field of the error body.
    pub fn code(&self) -> StatusCode {
        match self {
            RestError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RestError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RestError::NotFound(_) => StatusCode::NOT_FOUND,
            RestError::PayloadNotEmpty => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

impl From<DriverError> for RestError {
    fn from(e: DriverError) -> Self {
        match e {
            DriverError::BackendError(msg) => RestError::InternalError(msg),
            DriverError::NotFound(msg) => RestError::NotFound(msg),
        }
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> axum::response::Response {
        let code = self.code();
        let body = ErrorResponse { code: code.as_u16(), message: self.to_string() };
        if code.is_server_error() {
            warn!("Answering with error {}: {}", body.code, body.message);
        } else {
            debug!("Answering with error {}: {}", body.code, body.message);
        }
        (StatusCode::OK, Json(body)).into_response()
    }
}

/// Result type for this module.
pub type RestResult<T> = Result<T, RestError>;

/// JSON body sent back for every failed request.
#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorResponse {
    /// Numeric HTTP status of the failure.
    pub code: u16,

    /// Human readable description.
    pub message: String,
}

/// Extractor that rejects requests carrying a body.
pub struct EmptyBody {}

#[async_trait]
impl<S> FromRequest<S> for EmptyBody
where
    S: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        match req.into_body().is_end_stream() {
            true => Ok(EmptyBody {}),
            false => Err(RestError::PayloadNotEmpty),
        }
    }
}

/// `Json` extractor that rejects with `RestError::InvalidRequest`.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| JsonBody(value))
            .map_err(|e| RestError::InvalidRequest(e.body_text()))
    }
}

/// `Path` extractor that rejects with `RestError::InvalidRequest`.
pub struct PathParam<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for PathParam<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<T>::from_request_parts(parts, state)
            .await
            .map(|Path(value)| PathParam(value))
            .map_err(|e| RestError::InvalidRequest(e.body_text()))
    }
}

/// Helpers to drive a `Router` in tests without opening sockets.
#[cfg(feature = "testutils")]
pub mod testutils {
    use super::*;
    use axum::Router;
    use axum::body::Body;
    use axum::response::Response;
    use http::{HeaderName, HeaderValue, Method};
    use tower::util::ServiceExt;

    /// Largest response body the checks will read.
    const BODY_LIMIT: usize = 64 * 1024;

    /// A single request to send to a router.
    #[must_use]
    pub struct OneShotBuilder {
        /// Router under test.
        app: Router,

        /// Request being assembled.
        builder: http::request::Builder,
    }

    impl OneShotBuilder {
        /// Prepares a `method` request to `uri` for `app`.
        pub fn new<U: AsRef<str>>(app: Router, (method, uri): (Method, U)) -> Self {
            let builder = http::Request::builder().method(method).uri(uri.as_ref());
            Self { app, builder }
        }

        /// Adds a request header.
        pub fn with_header<K, V>(mut self, name: K, value: V) -> Self
        where
            HeaderName: TryFrom<K>,
            <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
            HeaderValue: TryFrom<V>,
            <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
        {
            self.builder = self.builder.header(name, value);
            self
        }

        /// Sends the request with `body`.
        async fn send(self, body: Body) -> ResponseChecker {
            let request = self.builder.body(body).unwrap();
            ResponseChecker::from(self.app.oneshot(request).await.unwrap())
        }

        /// Sends the request without a body.
        pub async fn send_empty(self) -> ResponseChecker {
            self.send(Body::empty()).await
        }

        /// Sends `text` as a `text/plain` body.
        pub async fn send_text<T: Into<String>>(mut self, text: T) -> ResponseChecker {
            self.builder =
                self.builder.header(http::header::CONTENT_TYPE, mime::TEXT_PLAIN.as_ref());
            self.send(Body::from(text.into())).await
        }

        /// Sends `value` serialized as a JSON body.
        pub async fn send_json<T: Serialize>(mut self, value: T) -> ResponseChecker {
            self.builder =
                self.builder.header(http::header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref());
            self.send(Body::from(serde_json::to_vec(&value).unwrap())).await
        }
    }

    /// Assertions over the response to a `OneShotBuilder` request.
    #[must_use]
    pub struct ResponseChecker {
        /// Response returned by the router.
        response: Response,

        /// Transport status the response must carry.  Defaults to 200.
        status: StatusCode,
    }

    impl From<Response> for ResponseChecker {
        fn from(response: Response) -> Self {
            Self { response, status: StatusCode::OK }
        }
    }

    impl ResponseChecker {
        /// Expects `status` as the transport status instead of 200.
        pub fn expect_status(mut self, status: StatusCode) -> Self {
            self.status = status;
            self
        }

        /// Checks the status and returns the body as a string.
        async fn body(self) -> String {
            assert_eq!(self.status, self.response.status());
            let bytes = axum::body::to_bytes(self.response.into_body(), BODY_LIMIT).await.unwrap();
            String::from_utf8(bytes.to_vec()).unwrap()
        }

        /// Expects no body.
        pub async fn expect_empty(self) {
            let body = self.body().await;
            assert!(body.is_empty(), "Expected no body but got {}", body);
        }

        /// Expects an `ErrorResponse` with `code` and a message matching the `message_re` regex.
        pub async fn expect_error(self, code: StatusCode, message_re: &str) {
            let body = self.body().await;
            let error: ErrorResponse = serde_json::from_str(&body)
                .unwrap_or_else(|e| panic!("Body {} is not an error: {}", body, e));
            assert_eq!(code.as_u16(), error.code, "Wrong code in {:?}", error);
            let re = regex::Regex::new(message_re).unwrap();
            assert!(re.is_match(&error.message), "{:?} does not match {}", error, message_re);
        }

        /// Expects a `T` as the JSON body and returns it.
        pub async fn expect_json<T: DeserializeOwned>(self) -> T {
            let body = self.body().await;
            if let Ok(error) = serde_json::from_str::<ErrorResponse>(&body) {
                panic!("Expected a successful response but got {:?}", error);
            }
            serde_json::from_str(&body)
                .unwrap_or_else(|e| panic!("Body {} cannot be decoded: {}", body, e))
        }
    }

    /// Defines `test_payload_must_be_json` for an API that takes a JSON body.
    #[macro_export]
    macro_rules! test_payload_must_be_json {
        ( $app:expr, $route:expr ) => {
            #[tokio::test]
            async fn test_payload_must_be_json() {
                $crate::rest::testutils::OneShotBuilder::new($app, $route)
                    .send_text("{\"name\": \"Loop\"}")
                    .await
                    .expect_error(axum::http::StatusCode::BAD_REQUEST, "Content-Type")
                    .await;

                $crate::rest::testutils::OneShotBuilder::new($app, $route)
                    .with_header(axum::http::header::CONTENT_TYPE, "application/json")
                    .send_text("name=Loop")
                    .await
                    .expect_error(axum::http::StatusCode::BAD_REQUEST, "expected")
                    .await;
            }
        };
    }

    pub use test_payload_must_be_json;

    /// Defines `test_payload_must_be_empty` for an API that takes no body.
    #[macro_export]
    macro_rules! test_payload_must_be_empty {
        ( $app:expr, $route:expr ) => {
            #[tokio::test]
            async fn test_payload_must_be_empty() {
                $crate::rest::testutils::OneShotBuilder::new($app, $route)
                    .send_text("{}")
                    .await
                    .expect_error(axum::http::StatusCode::PAYLOAD_TOO_LARGE, "should be empty")
                    .await;
            }
        };
    }

    pub use test_payload_must_be_empty;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        for (error, code) in [
            (RestError::InternalError("x".to_owned()), 500),
            (RestError::InvalidRequest("x".to_owned()), 400),
            (RestError::NotFound("x".to_owned()), 404),
            (RestError::PayloadNotEmpty, 413),
        ] {
            assert_eq!(code, error.code().as_u16(), "Wrong code for {:?}", error);
        }
    }

    #[test]
    fn test_from_driver_error_keeps_message() {
        assert_eq!(
            RestError::NotFound("Ride 3 not found".to_owned()),
            DriverError::NotFound("Ride 3 not found".to_owned()).into()
        );
        assert_eq!(
            RestError::InternalError("Database error: boom".to_owned()),
            DriverError::BackendError("Database error: boom".to_owned()).into()
        );
    }

    #[tokio::test]
    async fn test_error_is_sent_with_200() {
        for (error, code) in [
            (RestError::NotFound("Ride 3 not found".to_owned()), 404),
            (RestError::InternalError("Database error: boom".to_owned()), 500),
        ] {
            let message = error.to_string();
            let response = error.into_response();
            assert_eq!(StatusCode::OK, response.status());

            let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
            let body: ErrorResponse = serde_json::from_slice(&body).unwrap();
            assert_eq!(code, body.code);
            assert_eq!(message, body.message);
        }
    }
}
