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

//! Building blocks for the ride tracker service.
//!
//! Each module here backs one layer of the service, and errors climb the layers with `?`:
//!
//! 1.  `model`: `ModelError`, raised when a value does not fit a domain type such as a ride id.
//! 1.  `db`: backend-neutral pools and executors.  The service writes its queries once per backend.
//! 1.  `driver`: `DriverError`, the outcome of ride business operations.
//! 1.  `rest`: `RestError` and the extractors that turn every failure into the error body.
//!
//! `clocks` and `env` provide the injected time source and the environment-based configuration.

#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

pub mod clocks;
pub mod db;
pub mod driver;
pub mod env;
pub mod model;
pub mod rest;
